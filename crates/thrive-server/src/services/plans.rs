//! Smart plans: an ordered schedule of suggestions fitted into a time budget,
//! held in a TTL cache until the user executes or abandons it.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thrive_core::model::{Task, TaskPriority};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::metrics;

pub const MIN_PLAN_MINUTES: u32 = 15;
pub const MAX_PLAN_MINUTES: u32 = 720;

/// Used when a task has no estimate.
const DEFAULT_TASK_MINUTES: u32 = 30;
/// Tasks at least this long are followed by a break.
const BREAK_AFTER_MINUTES: u32 = 25;
const FOCUS_BLOCK_MINUTES: u32 = 45;

const BREAKS: &[(&str, &str)] = &[
    ("Stretch break", "Stand up and stretch your back, neck and wrists"),
    ("Hydrate", "Drink a glass of water"),
    ("Short walk", "Walk around for a few minutes, outside if you can"),
    ("Breathing exercise", "Take ten slow, deep breaths"),
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartPlanRequest {
    pub available_minutes: u32,
    #[serde(default)]
    pub include_breaks: Option<bool>,
    #[serde(default)]
    pub focus_areas: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// One of the user's pending tasks.
    Task,
    /// Wellness break between tasks.
    Break,
    /// Time reserved for a requested focus area with no matching task.
    FocusBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSuggestion {
    pub kind: SuggestionKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub minutes: u32,
    pub priority: TaskPriority,
    /// Set when the suggestion refers to an existing task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PlanSuggestion {
    pub fn is_new(&self) -> bool {
        self.task_id.is_none()
    }

    /// Task row for a suggestion that does not exist yet.
    pub fn to_task(&self, user_id: Uuid) -> Task {
        let mut task = Task::new(user_id, self.title.clone());
        task.description = self.description.clone();
        task.priority = self.priority;
        task.estimated_minutes = Some(self.minutes);
        task.tags = self.tags.clone();
        task
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartPlan {
    pub plan_id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub suggestions: Vec<PlanSuggestion>,
    pub total_minutes: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn matches_area(task: &Task, areas: &[String]) -> bool {
    areas.iter().any(|area| {
        let area = area.to_lowercase();
        task.title.to_lowercase().contains(&area)
            || task.tags.iter().any(|t| t.to_lowercase() == area)
    })
}

/// Most urgent first, then earliest due (undated last), then oldest.
pub(crate) fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    b.priority
        .rank()
        .cmp(&a.priority.rank())
        .then_with(|| match (a.due_at, b.due_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}

fn break_suggestion(index: usize, minutes: u32) -> PlanSuggestion {
    let (title, description) = BREAKS[index % BREAKS.len()];
    PlanSuggestion {
        kind: SuggestionKind::Break,
        title: title.to_string(),
        description: Some(description.to_string()),
        minutes,
        priority: TaskPriority::Low,
        task_id: None,
        tags: vec!["wellness".to_string()],
    }
}

/// Orders pending tasks by focus-area match, priority, due date and age,
/// then fits as many as possible into `available_minutes`. Tasks that do not
/// fit are skipped so smaller ones later in the order can still be used.
pub fn build_suggestions(tasks: &[Task], request: &SmartPlanRequest) -> Vec<PlanSuggestion> {
    let areas: Vec<String> = request
        .focus_areas
        .iter()
        .flatten()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    let include_breaks = request.include_breaks.unwrap_or(true);

    let mut ordered: Vec<&Task> = tasks.iter().filter(|t| !t.is_done()).collect();
    ordered.sort_by(|a, b| {
        let area_a = matches_area(a, &areas);
        let area_b = matches_area(b, &areas);
        area_b.cmp(&area_a).then_with(|| compare_tasks(a, b))
    });

    let mut remaining = request.available_minutes;
    let mut suggestions = Vec::new();
    let mut breaks = 0;

    for task in ordered {
        let minutes = task.estimated_minutes.unwrap_or(DEFAULT_TASK_MINUTES).max(5);
        if minutes > remaining {
            continue;
        }
        remaining -= minutes;
        suggestions.push(PlanSuggestion {
            kind: SuggestionKind::Task,
            title: task.title.clone(),
            description: task.description.clone(),
            minutes,
            priority: task.priority,
            task_id: Some(task.id),
            tags: task.tags.clone(),
        });

        if include_breaks && minutes >= BREAK_AFTER_MINUTES {
            let pause = if minutes >= 90 { 15 } else { 5 };
            if pause < remaining {
                remaining -= pause;
                suggestions.push(break_suggestion(breaks, pause));
                breaks += 1;
            }
        }
    }

    for area in &areas {
        if remaining < MIN_PLAN_MINUTES {
            break;
        }
        let needle = area.to_lowercase();
        let covered = suggestions.iter().any(|s| {
            s.kind == SuggestionKind::Task
                && (s.title.to_lowercase().contains(&needle)
                    || s.tags.iter().any(|t| t.to_lowercase() == needle))
        });
        if covered {
            continue;
        }
        let minutes = remaining.min(FOCUS_BLOCK_MINUTES);
        remaining -= minutes;
        suggestions.push(PlanSuggestion {
            kind: SuggestionKind::FocusBlock,
            title: format!("Focus block: {area}"),
            description: None,
            minutes,
            priority: TaskPriority::Medium,
            task_id: None,
            tags: vec![area.to_lowercase()],
        });
    }

    // a plan never ends on a break
    if suggestions.last().is_some_and(|s| s.kind == SuggestionKind::Break) {
        suggestions.pop();
    }
    suggestions
}

pub fn build_plan(user_id: Uuid, tasks: &[Task], request: &SmartPlanRequest) -> SmartPlan {
    let suggestions = build_suggestions(tasks, request);
    let total_minutes = suggestions.iter().map(|s| s.minutes).sum();
    SmartPlan {
        plan_id: Uuid::new_v4(),
        user_id,
        suggestions,
        total_minutes,
        created_at: OffsetDateTime::now_utc(),
    }
}

/// In-process TTL cache of smart plans keyed by plan id.
#[derive(Clone)]
pub struct PlanCache {
    cache: Cache<Uuid, Arc<SmartPlan>>,
    ttl_secs: u64,
}

impl PlanCache {
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub async fn insert(&self, plan: SmartPlan) -> Arc<SmartPlan> {
        let plan = Arc::new(plan);
        self.cache.insert(plan.plan_id, plan.clone()).await;
        plan
    }

    pub async fn get(&self, plan_id: Uuid) -> Option<Arc<SmartPlan>> {
        let found = self.cache.get(&plan_id).await;
        if found.is_some() {
            metrics::record_plan_cache_hit();
        } else {
            metrics::record_plan_cache_miss();
        }
        found
    }

    pub async fn remove(&self, plan_id: Uuid) -> Option<Arc<SmartPlan>> {
        self.cache.remove(&plan_id).await
    }
}
