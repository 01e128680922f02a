//! Users, subscriptions, student verification, managed content and OTP
//! challenges.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::types::Json;
use thrive_core::model::{
    ManagedContent, OtpChallenge, StudentVerification, Subscription, User,
};
use thrive_storage::{
    ContentStorage, OtpStorage, StorageResult, StudentStorage, StudentVerificationFilter,
    SubscriptionStorage, UserStorage,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    CONTENT_COLUMNS, ContentRow, OtpRow, SUBSCRIPTION_COLUMNS, SubscriptionRow, USER_COLUMNS,
    UserRow, VERIFICATION_COLUMNS, VerificationRow, collect_rows, content_from_row, not_found,
    otp_from_row, subscription_from_row, to_db_int, to_db_limit, user_from_row,
    verification_from_row,
};
use crate::error::{conflict_error, db_error};
use crate::storage::PostgresStorage;

#[async_trait]
impl UserStorage for PostgresStorage {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create_user(&self, user: &User) -> StorageResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = query_as(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.password_hash.as_deref())
            .bind(user.role.as_str())
            .bind(user.language.as_deref())
            .bind(user.country.as_deref())
            .bind(user.utc_offset_minutes)
            .bind(user.tier.as_str())
            .bind(Json(&user.preferences))
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "User", &user.email))?;
        user_from_row(row)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(user_from_row).transpose()
    }

    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<UserRow> = query_as(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> StorageResult<User> {
        let sql = format!(
            "UPDATE users SET display_name = $2, password_hash = $3, role = $4, language = $5, \
             country = $6, utc_offset_minutes = $7, tier = $8, preferences = $9, updated_at = $10 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = query_as(&sql)
            .bind(user.id)
            .bind(&user.display_name)
            .bind(user.password_hash.as_deref())
            .bind(user.role.as_str())
            .bind(user.language.as_deref())
            .bind(user.country.as_deref())
            .bind(user.utc_offset_minutes)
            .bind(user.tier.as_str())
            .bind(Json(&user.preferences))
            .bind(user.updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        match row {
            Some(row) => user_from_row(row),
            None => Err(not_found("User", user.id)),
        }
    }

    #[instrument(skip(self))]
    async fn list_users(&self, limit: usize, offset: usize) -> StorageResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );
        let rows: Vec<UserRow> = query_as(&sql)
            .bind(to_db_limit(limit))
            .bind(to_db_limit(offset))
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, user_from_row)
    }
}

#[async_trait]
impl SubscriptionStorage for PostgresStorage {
    #[instrument(skip(self))]
    async fn get_subscription(&self, user_id: Uuid) -> StorageResult<Option<Subscription>> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1");
        let row: Option<SubscriptionRow> = query_as(&sql)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(subscription_from_row).transpose()
    }

    #[instrument(skip(self, subscription), fields(user_id = %subscription.user_id))]
    async fn upsert_subscription(&self, subscription: &Subscription) -> StorageResult<Subscription> {
        let sql = format!(
            "INSERT INTO subscriptions ({SUBSCRIPTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET tier = EXCLUDED.tier, status = EXCLUDED.status, \
             current_period_end = EXCLUDED.current_period_end, updated_at = EXCLUDED.updated_at \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let row: SubscriptionRow = query_as(&sql)
            .bind(subscription.user_id)
            .bind(subscription.tier.as_str())
            .bind(subscription.status.as_str())
            .bind(subscription.current_period_end)
            .bind(subscription.created_at)
            .bind(subscription.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(db_error)?;
        subscription_from_row(row)
    }
}

#[async_trait]
impl StudentStorage for PostgresStorage {
    #[instrument(skip(self, verification), fields(user_id = %verification.user_id))]
    async fn create_student_verification(
        &self,
        verification: &StudentVerification,
    ) -> StorageResult<StudentVerification> {
        let sql = format!(
            "INSERT INTO student_verifications ({VERIFICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {VERIFICATION_COLUMNS}"
        );
        let row: VerificationRow = query_as(&sql)
            .bind(verification.id)
            .bind(verification.user_id)
            .bind(&verification.school_email)
            .bind(&verification.institution)
            .bind(verification.status.as_str())
            .bind(verification.rejection_reason.as_deref())
            .bind(verification.reviewed_by)
            .bind(verification.submitted_at)
            .bind(verification.reviewed_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "StudentVerification", verification.user_id))?;
        verification_from_row(row)
    }

    #[instrument(skip(self))]
    async fn get_student_verification(
        &self,
        id: Uuid,
    ) -> StorageResult<Option<StudentVerification>> {
        let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM student_verifications WHERE id = $1");
        let row: Option<VerificationRow> = query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(verification_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn latest_student_verification(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Option<StudentVerification>> {
        let sql = format!(
            "SELECT {VERIFICATION_COLUMNS} FROM student_verifications WHERE user_id = $1 \
             ORDER BY submitted_at DESC LIMIT 1"
        );
        let row: Option<VerificationRow> = query_as(&sql)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(verification_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_student_verifications(
        &self,
        filter: &StudentVerificationFilter,
    ) -> StorageResult<Vec<StudentVerification>> {
        let sql = format!(
            "SELECT {VERIFICATION_COLUMNS} FROM student_verifications \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY submitted_at LIMIT $2"
        );
        let rows: Vec<VerificationRow> = query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(to_db_limit(filter.limit))
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, verification_from_row)
    }

    #[instrument(skip(self, verification), fields(id = %verification.id))]
    async fn update_student_verification(
        &self,
        verification: &StudentVerification,
    ) -> StorageResult<StudentVerification> {
        let sql = format!(
            "UPDATE student_verifications SET status = $2, rejection_reason = $3, \
             reviewed_by = $4, reviewed_at = $5 WHERE id = $1 RETURNING {VERIFICATION_COLUMNS}"
        );
        let row: Option<VerificationRow> = query_as(&sql)
            .bind(verification.id)
            .bind(verification.status.as_str())
            .bind(verification.rejection_reason.as_deref())
            .bind(verification.reviewed_by)
            .bind(verification.reviewed_at)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| conflict_error(e, "StudentVerification", verification.user_id))?;
        match row {
            Some(row) => verification_from_row(row),
            None => Err(not_found("StudentVerification", verification.id)),
        }
    }
}

#[async_trait]
impl ContentStorage for PostgresStorage {
    #[instrument(skip(self, content), fields(id = %content.id))]
    async fn create_content(&self, content: &ManagedContent) -> StorageResult<ManagedContent> {
        let tiers: Vec<&str> = content.target_tiers.iter().map(|t| t.as_str()).collect();
        let sql = format!(
            "INSERT INTO managed_content ({CONTENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {CONTENT_COLUMNS}"
        );
        let row: ContentRow = query_as(&sql)
            .bind(content.id)
            .bind(content.kind.as_str())
            .bind(&content.title)
            .bind(&content.body)
            .bind(&content.language)
            .bind(&tiers)
            .bind(content.priority)
            .bind(content.active)
            .bind(content.valid_from)
            .bind(content.valid_until)
            .bind(content.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "ManagedContent", content.id))?;
        content_from_row(row)
    }

    #[instrument(skip(self))]
    async fn list_content(&self) -> StorageResult<Vec<ManagedContent>> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM managed_content ORDER BY created_at DESC");
        let rows: Vec<ContentRow> = query_as(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, content_from_row)
    }

    #[instrument(skip(self))]
    async fn delete_content(&self, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM managed_content WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

const OTP_COLUMNS: &str = "email, code_hash, expires_at, attempts, last_sent_at";

#[async_trait]
impl OtpStorage for PostgresStorage {
    #[instrument(skip(self, challenge))]
    async fn put_otp(&self, challenge: &OtpChallenge) -> StorageResult<()> {
        query(
            "INSERT INTO otp_challenges (email, code_hash, expires_at, attempts, last_sent_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO UPDATE SET code_hash = EXCLUDED.code_hash, \
             expires_at = EXCLUDED.expires_at, attempts = EXCLUDED.attempts, \
             last_sent_at = EXCLUDED.last_sent_at",
        )
        .bind(&challenge.email)
        .bind(&challenge.code_hash)
        .bind(challenge.expires_at)
        .bind(to_db_int(challenge.attempts))
        .bind(challenge.last_sent_at)
        .execute(self.pool())
        .await
        .map_err(db_error)?;
        Ok(())
    }

    #[instrument(skip(self, email))]
    async fn get_otp(&self, email: &str) -> StorageResult<Option<OtpChallenge>> {
        let sql = format!("SELECT {OTP_COLUMNS} FROM otp_challenges WHERE email = $1");
        let row: Option<OtpRow> = query_as(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        Ok(row.map(otp_from_row))
    }

    #[instrument(skip(self, email))]
    async fn record_otp_attempt(&self, email: &str) -> StorageResult<Option<OtpChallenge>> {
        let sql = format!(
            "UPDATE otp_challenges SET attempts = attempts + 1 WHERE email = $1 \
             RETURNING {OTP_COLUMNS}"
        );
        let row: Option<OtpRow> = query_as(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        Ok(row.map(otp_from_row))
    }

    #[instrument(skip(self, email))]
    async fn delete_otp(&self, email: &str) -> StorageResult<()> {
        query("DELETE FROM otp_challenges WHERE email = $1")
            .bind(email)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
