use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    pub enum VerificationStatus ("status") {
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_email: String,
    pub institution: String,
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
}

/// Accepts `.edu`, `.edu.xx` and `.ac.xx` domains.
pub fn is_academic_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let domain = domain.to_ascii_lowercase();
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) || parts.len() < 2 {
        return false;
    }
    let n = parts.len();
    if parts[n - 1] == "edu" {
        return true;
    }
    n >= 3 && parts[n - 1].len() == 2 && matches!(parts[n - 2], "edu" | "ac")
}
