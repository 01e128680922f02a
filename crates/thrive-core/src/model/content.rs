use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::SubscriptionTier;

string_enum! {
    pub enum ContentKind ("kind") {
        Announcement => "announcement",
        Tip => "tip",
    }
}

/// Admin-curated announcement or tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedContent {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
    /// Language code the content is written in.
    pub language: String,
    /// Tiers that see this item; empty means everyone.
    #[serde(default)]
    pub target_tiers: Vec<SubscriptionTier>,
    #[serde(default)]
    pub priority: i32,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_from: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub valid_until: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ManagedContent {
    pub fn targets(&self, tier: SubscriptionTier) -> bool {
        self.target_tiers.is_empty() || self.target_tiers.contains(&tier)
    }

    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.active && self.valid_from <= now && self.valid_until.is_none_or(|until| now < until)
    }
}
