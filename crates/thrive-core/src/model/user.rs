use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::SubscriptionTier;

string_enum! {
    pub enum UserRole ("role") {
        User => "user",
        Admin => "admin",
    }
}

string_enum! {
    pub enum Theme ("theme") {
        Light => "light",
        Dark => "dark",
        System => "system",
    }
}

/// Typed user preferences stored as a JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub theme: Theme,
    pub notifications_enabled: bool,
    pub daily_focus_goal_minutes: u32,
    /// `None` means "use the country's convention".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_starts_monday: Option<bool>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            notifications_enabled: true,
            daily_focus_goal_minutes: 120,
            week_starts_monday: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    /// Argon2 PHC string; absent for accounts created through OTP login.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub tier: SubscriptionTier,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a regular free-tier user. Email is normalized to lowercase.
    pub fn new(email: &str, display_name: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            display_name: display_name.into(),
            password_hash: None,
            role: UserRole::User,
            language: None,
            country: None,
            utc_offset_minutes: 0,
            tier: SubscriptionTier::Free,
            preferences: UserPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Name shown to other users; falls back to the email's local part.
    pub fn public_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.display_name
        }
    }
}

/// Lowercases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Pending one-time login code for an email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub email: String,
    /// SHA-256 hex digest of the code.
    pub code_hash: String,
    pub expires_at: OffsetDateTime,
    pub attempts: u32,
    pub last_sent_at: OffsetDateTime,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
