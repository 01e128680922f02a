//! Badge catalog and unlock evaluation.
//!
//! Evaluation is a pure function of an [`ActivitySnapshot`] and the set of
//! badges a user already holds. Persisting unlocks (and making them unique per
//! user) is the storage layer's job.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::time::to_local;

/// Condition a user's activity has to meet for a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCriterion {
    TasksCompleted { count: u32 },
    StreakDays { days: u32 },
    /// Completions whose local hour is before `before_hour`.
    EarlyBird { count: u32, before_hour: u8 },
    /// Completions whose local hour is at or after `from_hour`.
    NightOwl { count: u32, from_hour: u8 },
    FocusMinutes { minutes: u64 },
}

impl BadgeCriterion {
    /// Current value and target for progress display.
    pub fn progress(&self, activity: &ActivitySnapshot) -> (u64, u64) {
        match *self {
            BadgeCriterion::TasksCompleted { count } => {
                (u64::from(activity.tasks_completed), u64::from(count))
            }
            BadgeCriterion::StreakDays { days } => {
                (u64::from(activity.current_streak), u64::from(days))
            }
            BadgeCriterion::EarlyBird { count, before_hour } => (
                u64::from(activity.completions_before(before_hour)),
                u64::from(count),
            ),
            BadgeCriterion::NightOwl { count, from_hour } => (
                u64::from(activity.completions_from(from_hour)),
                u64::from(count),
            ),
            BadgeCriterion::FocusMinutes { minutes } => (activity.focus_minutes, minutes),
        }
    }

    pub fn is_met(&self, activity: &ActivitySnapshot) -> bool {
        let (current, target) = self.progress(activity);
        current >= target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub criterion: BadgeCriterion,
}

/// A badge held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
    pub user_id: Uuid,
    pub badge_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub unlocked_at: OffsetDateTime,
}

impl UserBadge {
    pub fn new(user_id: Uuid, badge_id: impl Into<String>, unlocked_at: OffsetDateTime) -> Self {
        Self {
            user_id,
            badge_id: badge_id.into(),
            unlocked_at,
        }
    }
}

const CATALOG: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: "first-task",
        name: "First Step",
        description: "Complete your first task",
        icon: "🎯",
        criterion: BadgeCriterion::TasksCompleted { count: 1 },
    },
    BadgeDefinition {
        id: "task-starter",
        name: "Getting Things Done",
        description: "Complete 10 tasks",
        icon: "✅",
        criterion: BadgeCriterion::TasksCompleted { count: 10 },
    },
    BadgeDefinition {
        id: "task-master",
        name: "Task Master",
        description: "Complete 50 tasks",
        icon: "🏆",
        criterion: BadgeCriterion::TasksCompleted { count: 50 },
    },
    BadgeDefinition {
        id: "task-legend",
        name: "Legend",
        description: "Complete 100 tasks",
        icon: "👑",
        criterion: BadgeCriterion::TasksCompleted { count: 100 },
    },
    BadgeDefinition {
        id: "streak-3",
        name: "On a Roll",
        description: "Complete tasks 3 days in a row",
        icon: "🔥",
        criterion: BadgeCriterion::StreakDays { days: 3 },
    },
    BadgeDefinition {
        id: "streak-7",
        name: "Week Warrior",
        description: "Complete tasks 7 days in a row",
        icon: "⚡",
        criterion: BadgeCriterion::StreakDays { days: 7 },
    },
    BadgeDefinition {
        id: "streak-30",
        name: "Unstoppable",
        description: "Complete tasks 30 days in a row",
        icon: "🌟",
        criterion: BadgeCriterion::StreakDays { days: 30 },
    },
    BadgeDefinition {
        id: "early-bird",
        name: "Early Bird",
        description: "Complete 5 tasks before 8 AM",
        icon: "🌅",
        criterion: BadgeCriterion::EarlyBird { count: 5, before_hour: 8 },
    },
    BadgeDefinition {
        id: "night-owl",
        name: "Night Owl",
        description: "Complete 5 tasks after 10 PM",
        icon: "🦉",
        criterion: BadgeCriterion::NightOwl { count: 5, from_hour: 22 },
    },
    BadgeDefinition {
        id: "focus-60",
        name: "Focused",
        description: "Spend 60 minutes in focus sessions",
        icon: "🧘",
        criterion: BadgeCriterion::FocusMinutes { minutes: 60 },
    },
    BadgeDefinition {
        id: "focus-600",
        name: "Deep Diver",
        description: "Spend 10 hours in focus sessions",
        icon: "🌊",
        criterion: BadgeCriterion::FocusMinutes { minutes: 600 },
    },
];

/// All badges in evaluation order.
pub fn catalog() -> &'static [BadgeDefinition] {
    CATALOG
}

pub fn find_badge(id: &str) -> Option<&'static BadgeDefinition> {
    CATALOG.iter().find(|b| b.id == id)
}

/// Aggregated activity used to evaluate badge criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub tasks_completed: u32,
    pub current_streak: u32,
    /// Completions per local hour of day.
    pub completions_by_hour: [u32; 24],
    pub focus_minutes: u64,
}

impl ActivitySnapshot {
    /// Builds a snapshot from task completion timestamps.
    ///
    /// Hours and days are computed in the user's local time; `today` is the
    /// user's local date.
    pub fn from_completions(
        completions: &[OffsetDateTime],
        focus_minutes: u64,
        utc_offset_minutes: i32,
        today: Date,
    ) -> Self {
        let mut by_hour = [0_u32; 24];
        let mut days = BTreeSet::new();
        for at in completions {
            let local = to_local(*at, utc_offset_minutes);
            by_hour[usize::from(local.hour())] += 1;
            days.insert(local.date());
        }

        Self {
            tasks_completed: u32::try_from(completions.len()).unwrap_or(u32::MAX),
            current_streak: current_streak(&days, today),
            completions_by_hour: by_hour,
            focus_minutes,
        }
    }

    pub fn completions_before(&self, hour: u8) -> u32 {
        let end = usize::from(hour).min(24);
        self.completions_by_hour[..end].iter().sum()
    }

    pub fn completions_from(&self, hour: u8) -> u32 {
        let start = usize::from(hour).min(24);
        self.completions_by_hour[start..].iter().sum()
    }
}

/// Consecutive days with activity ending today, or yesterday when today has
/// nothing yet.
pub fn current_streak(active_days: &BTreeSet<Date>, today: Date) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut day = if active_days.contains(&today) {
        today
    } else if active_days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while active_days.contains(&day) {
        streak += 1;
        match day.previous_day() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Badges newly earned by `activity`, in catalog order, excluding the ones in
/// `already_unlocked`.
pub fn evaluate(
    activity: &ActivitySnapshot,
    already_unlocked: &HashSet<String>,
) -> Vec<&'static BadgeDefinition> {
    CATALOG
        .iter()
        .filter(|badge| !already_unlocked.contains(badge.id))
        .filter(|badge| badge.criterion.is_met(activity))
        .collect()
}
