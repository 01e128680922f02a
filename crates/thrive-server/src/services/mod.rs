//! Logic shared by several route modules.

pub mod achievements;
pub mod advisor;
pub mod notifications;
pub mod plans;
pub mod voice;

pub use achievements::AchievementService;
pub use advisor::{
    AdvisorChain, AdvisorError, AnalysisSource, HeuristicAdvisor, HttpAdvisor, TaskAdvisor,
    TaskAnalysis, TaskDraft,
};
pub use notifications::NotificationService;
pub use plans::{PlanCache, PlanSuggestion, SmartPlan, SmartPlanRequest, SuggestionKind};
pub use voice::{Transcript, TranscriptionClient, VoiceError};
