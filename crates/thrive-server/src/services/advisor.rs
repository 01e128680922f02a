//! Task analysis: a remote AI gateway with a local heuristic fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use thrive_core::model::TaskPriority;
use time::OffsetDateTime;

use crate::metrics;

/// What the caller knows about a task before creating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Model,
    #[default]
    Heuristic,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Model => "model",
            AnalysisSource::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalysis {
    pub priority: TaskPriority,
    pub category: String,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub source: AnalysisSource,
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("AI gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI gateway returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("AI gateway returned an invalid analysis: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait TaskAdvisor: Send + Sync {
    async fn analyze(&self, draft: &TaskDraft, now: OffsetDateTime)
    -> Result<TaskAnalysis, AdvisorError>;
}

// =============================================================================
// Heuristic
// =============================================================================

const URGENT_WORDS: &[&str] = &["urgent", "asap", "immediately", "critical", "emergency"];
const HIGH_WORDS: &[&str] = &[
    "important", "deadline", "exam", "interview", "submit", "pay", "due",
];
const LOW_WORDS: &[&str] = &["someday", "maybe", "optional", "idea", "eventually"];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("work", &["meeting", "report", "email", "project", "client", "presentation", "deploy"]),
    ("study", &["study", "exam", "homework", "read", "assignment", "lecture", "course"]),
    ("health", &["gym", "run", "workout", "doctor", "exercise", "yoga", "meditate", "walk"]),
    ("finance", &["pay", "bill", "tax", "budget", "invoice", "bank"]),
    ("home", &["clean", "laundry", "groceries", "cook", "shopping", "repair"]),
    ("social", &["call", "birthday", "party", "friend", "family", "dinner"]),
];

/// Keyword and length based analysis. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAdvisor;

fn words(draft: &TaskDraft) -> Vec<String> {
    let text = match &draft.description {
        Some(d) => format!("{} {d}", draft.title),
        None => draft.title.clone(),
    };
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn mentions(words: &[String], keywords: &[&str]) -> bool {
    words.iter().any(|w| keywords.contains(&w.as_str()))
}

fn raise(priority: TaskPriority) -> TaskPriority {
    match priority {
        TaskPriority::Low => TaskPriority::Medium,
        TaskPriority::Medium => TaskPriority::High,
        TaskPriority::High | TaskPriority::Urgent => TaskPriority::Urgent,
    }
}

impl HeuristicAdvisor {
    pub fn analyze_now(&self, draft: &TaskDraft, now: OffsetDateTime) -> TaskAnalysis {
        let words = words(draft);

        let mut priority = if mentions(&words, URGENT_WORDS) {
            TaskPriority::Urgent
        } else if mentions(&words, HIGH_WORDS) {
            TaskPriority::High
        } else if mentions(&words, LOW_WORDS) {
            TaskPriority::Low
        } else {
            TaskPriority::Medium
        };

        let hours_left = draft.due_at.map(|due| (due - now).whole_hours());
        match hours_left {
            Some(h) if h < 24 => priority = raise(priority),
            Some(h) if h < 72 && priority == TaskPriority::Low => priority = TaskPriority::Medium,
            _ => {}
        }

        let category = CATEGORIES
            .iter()
            .find(|(_, keywords)| mentions(&words, keywords))
            .map(|(name, _)| *name)
            .unwrap_or("general");

        let raw = 10 + 5 * u32::try_from(words.len()).unwrap_or(u32::MAX / 10);
        let estimated_minutes = raw.clamp(15, 180).div_ceil(5) * 5;

        let mut suggestions = Vec::new();
        if estimated_minutes >= 60 {
            suggestions.push("Break this task into smaller steps".to_string());
        }
        if hours_left.is_some_and(|h| h < 24) {
            suggestions.push("Schedule a focus session for it today".to_string());
        }
        if category == "health" {
            suggestions.push("Log the activity in your health tracker afterwards".to_string());
        }

        let tags = if category == "general" {
            Vec::new()
        } else {
            vec![category.to_string()]
        };

        TaskAnalysis {
            priority,
            category: category.to_string(),
            estimated_minutes,
            tags,
            suggestions,
            source: AnalysisSource::Heuristic,
        }
    }
}

#[async_trait]
impl TaskAdvisor for HeuristicAdvisor {
    async fn analyze(
        &self,
        draft: &TaskDraft,
        now: OffsetDateTime,
    ) -> Result<TaskAnalysis, AdvisorError> {
        Ok(self.analyze_now(draft, now))
    }
}

// =============================================================================
// Remote gateway
// =============================================================================

/// Posts the draft as JSON to an AI gateway and reads back a [`TaskAnalysis`].
#[derive(Debug, Clone)]
pub struct HttpAdvisor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpAdvisor {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl TaskAdvisor for HttpAdvisor {
    async fn analyze(
        &self,
        draft: &TaskDraft,
        _now: OffsetDateTime,
    ) -> Result<TaskAnalysis, AdvisorError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(draft);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let mut analysis: TaskAnalysis = response
            .json()
            .await
            .map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;
        if analysis.estimated_minutes == 0 {
            return Err(AdvisorError::InvalidResponse(
                "estimatedMinutes must be > 0".into(),
            ));
        }
        analysis.source = AnalysisSource::Model;
        Ok(analysis)
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Tries the remote advisor when configured and falls back to the heuristic
/// on any error.
#[derive(Clone, Default)]
pub struct AdvisorChain {
    remote: Option<Arc<dyn TaskAdvisor>>,
    fallback: HeuristicAdvisor,
}

impl AdvisorChain {
    pub fn new(remote: Option<Arc<dyn TaskAdvisor>>) -> Self {
        Self {
            remote,
            fallback: HeuristicAdvisor,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

#[async_trait]
impl TaskAdvisor for AdvisorChain {
    async fn analyze(
        &self,
        draft: &TaskDraft,
        now: OffsetDateTime,
    ) -> Result<TaskAnalysis, AdvisorError> {
        let analysis = match &self.remote {
            Some(remote) => match remote.analyze(draft, now).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    tracing::warn!(error = %e, "AI analysis failed, using heuristic");
                    self.fallback.analyze_now(draft, now)
                }
            },
            None => self.fallback.analyze_now(draft, now),
        };
        metrics::record_ai_analysis(analysis.source.as_str());
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-03-10 12:00 UTC);

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: None,
            due_at: None,
        }
    }

    struct FailingAdvisor;

    #[async_trait]
    impl TaskAdvisor for FailingAdvisor {
        async fn analyze(
            &self,
            _draft: &TaskDraft,
            _now: OffsetDateTime,
        ) -> Result<TaskAnalysis, AdvisorError> {
            Err(AdvisorError::Upstream {
                status: 503,
                message: "overloaded".into(),
            })
        }
    }

    #[test]
    fn keywords_set_priority_and_category() {
        let a = HeuristicAdvisor.analyze_now(&draft("URGENT: fix client report"), NOW);
        assert_eq!(a.priority, TaskPriority::Urgent);
        assert_eq!(a.category, "work");
        assert_eq!(a.tags, vec!["work".to_string()]);

        let b = HeuristicAdvisor.analyze_now(&draft("maybe repaint the shed someday"), NOW);
        assert_eq!(b.priority, TaskPriority::Low);

        let c = HeuristicAdvisor.analyze_now(&draft("Water plants"), NOW);
        assert_eq!(c.priority, TaskPriority::Medium);
        assert_eq!(c.category, "general");
        assert!(c.tags.is_empty());
    }

    #[test]
    fn near_due_date_raises_priority() {
        let mut d = draft("Water plants");
        d.due_at = Some(NOW + time::Duration::hours(3));
        let a = HeuristicAdvisor.analyze_now(&d, NOW);
        assert_eq!(a.priority, TaskPriority::High);
        assert!(a.suggestions.iter().any(|s| s.contains("today")));

        d.due_at = Some(NOW + time::Duration::days(10));
        assert_eq!(HeuristicAdvisor.analyze_now(&d, NOW).priority, TaskPriority::Medium);
    }

    #[test]
    fn estimate_grows_with_length_and_is_bounded() {
        let short = HeuristicAdvisor.analyze_now(&draft("Call mom"), NOW);
        assert_eq!(short.estimated_minutes, 20);
        assert_eq!(short.estimated_minutes % 5, 0);

        let mut long = draft("Write");
        long.description = Some("word ".repeat(100));
        assert_eq!(HeuristicAdvisor.analyze_now(&long, NOW).estimated_minutes, 180);
    }

    #[tokio::test]
    async fn chain_falls_back_silently() {
        let chain = AdvisorChain::new(Some(Arc::new(FailingAdvisor)));
        let analysis = chain.analyze(&draft("Pay rent"), NOW).await.unwrap();
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
        assert_eq!(analysis.category, "finance");
    }

    #[tokio::test]
    async fn chain_without_remote_uses_heuristic() {
        let chain = AdvisorChain::default();
        assert!(!chain.has_remote());
        let analysis = chain.analyze(&draft("Pay rent"), NOW).await.unwrap();
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
    }
}
