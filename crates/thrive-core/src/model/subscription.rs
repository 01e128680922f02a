use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    pub enum SubscriptionTier ("tier") {
        Free => "free",
        Premium => "premium",
        Student => "student",
    }
}

impl SubscriptionTier {
    /// Paid and verified-student tiers unlock the same feature set.
    pub fn is_paid_features(&self) -> bool {
        matches!(self, SubscriptionTier::Premium | SubscriptionTier::Student)
    }
}

string_enum! {
    pub enum SubscriptionStatus ("status") {
        Active => "active",
        Canceled => "canceled",
        PastDue => "past_due",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub current_period_end: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Subscription {
    pub fn new(user_id: Uuid, tier: SubscriptionTier) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user_id,
            tier,
            status: SubscriptionStatus::Active,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }
}
