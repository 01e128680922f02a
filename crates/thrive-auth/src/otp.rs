//! One-time login codes.
//!
//! A code is six digits, stored only as its SHA-256 hex digest, valid for a
//! fixed time and a limited number of verification attempts. Delivery goes
//! through [`OtpSender`].

use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};
use thrive_core::model::OtpChallenge;
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::error::AuthError;

pub const OTP_DIGITS: usize = 6;

pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:0width$}", width = OTP_DIGITS)
}

pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Lifetime, attempt and resend limits for OTP challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub ttl_secs: u64,
    pub max_attempts: u32,
    pub resend_cooldown_secs: u64,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_attempts: 5,
            resend_cooldown_secs: 60,
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

impl OtpPolicy {
    /// Fails with `RateLimited` while the previous code is inside its
    /// resend cooldown.
    pub fn check_resend(
        &self,
        existing: Option<&OtpChallenge>,
        now: OffsetDateTime,
    ) -> Result<(), AuthError> {
        let Some(existing) = existing else {
            return Ok(());
        };
        let next_allowed = existing.last_sent_at + secs(self.resend_cooldown_secs);
        if now < next_allowed {
            let wait = (next_allowed - now).whole_seconds().max(1);
            return Err(AuthError::rate_limited(format!(
                "A code was sent recently; retry in {wait} seconds"
            )));
        }
        Ok(())
    }

    /// Creates a fresh challenge. Returns the plaintext code and the record
    /// to persist.
    pub fn issue(&self, email: &str, now: OffsetDateTime) -> (String, OtpChallenge) {
        let code = generate_code();
        let challenge = OtpChallenge {
            email: email.to_string(),
            code_hash: hash_code(&code),
            expires_at: now + secs(self.ttl_secs),
            attempts: 0,
            last_sent_at: now,
        };
        (code, challenge)
    }

    /// Checks a submitted code against a challenge whose attempt counter has
    /// already been incremented for this submission.
    pub fn verify(
        &self,
        challenge: &OtpChallenge,
        code: &str,
        now: OffsetDateTime,
    ) -> Result<(), AuthError> {
        if challenge.attempts > self.max_attempts {
            return Err(AuthError::rate_limited(
                "Too many attempts; request a new code",
            ));
        }
        if challenge.is_expired(now) {
            return Err(AuthError::unauthorized("Code has expired"));
        }
        if hash_code(code) != challenge.code_hash {
            return Err(AuthError::unauthorized("Invalid code"));
        }
        Ok(())
    }
}

/// Delivers login codes to users.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, email: &str, code: &str) -> Result<(), AuthError>;
}

/// Logs that a code was issued without delivering it anywhere.
#[derive(Debug, Clone, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, email: &str, _code: &str) -> Result<(), AuthError> {
        info!(email = %email, "Login code issued");
        Ok(())
    }
}
