//! Users, subscriptions, student verification, OTP challenges and managed content.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use thrive_core::model::{
    ManagedContent, OtpChallenge, StudentVerification, Subscription, User, VerificationStatus,
};
use thrive_storage::{
    ContentStorage, OtpStorage, StorageError, StorageResult, StudentStorage,
    StudentVerificationFilter, SubscriptionStorage, UserStorage,
};
use uuid::Uuid;

use crate::storage::{InMemoryStorage, collect_where};

#[async_trait]
impl UserStorage for InMemoryStorage {
    async fn create_user(&self, user: &User) -> StorageResult<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(StorageError::already_exists("User", &user.email)),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn update_user(&self, user: &User) -> StorageResult<User> {
        let mut existing = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StorageError::not_found("User", user.id))?;
        // Email is the login key and is never changed through an update.
        let email = existing.email.clone();
        *existing = user.clone();
        existing.email = email;
        Ok(existing.clone())
    }

    async fn list_users(&self, limit: usize, offset: usize) -> StorageResult<Vec<User>> {
        let mut users = collect_where(&self.users, |_| true);
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl SubscriptionStorage for InMemoryStorage {
    async fn get_subscription(&self, user_id: Uuid) -> StorageResult<Option<Subscription>> {
        Ok(self.subscriptions.get(&user_id).map(|s| s.clone()))
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> StorageResult<Subscription> {
        let stored = match self.subscriptions.entry(subscription.user_id) {
            Entry::Occupied(mut slot) => {
                let created_at = slot.get().created_at;
                let mut next = subscription.clone();
                next.created_at = created_at;
                slot.insert(next.clone());
                next
            }
            Entry::Vacant(slot) => slot.insert(subscription.clone()).clone(),
        };
        Ok(stored)
    }
}

fn is_open(status: VerificationStatus) -> bool {
    matches!(status, VerificationStatus::Pending | VerificationStatus::Verified)
}

#[async_trait]
impl StudentStorage for InMemoryStorage {
    async fn create_student_verification(
        &self,
        verification: &StudentVerification,
    ) -> StorageResult<StudentVerification> {
        if is_open(verification.status) {
            match self.open_verifications.entry(verification.user_id) {
                Entry::Occupied(_) => {
                    return Err(StorageError::already_exists(
                        "StudentVerification",
                        verification.user_id,
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(verification.id);
                }
            }
        }
        self.verifications
            .insert(verification.id, verification.clone());
        Ok(verification.clone())
    }

    async fn get_student_verification(
        &self,
        id: Uuid,
    ) -> StorageResult<Option<StudentVerification>> {
        Ok(self.verifications.get(&id).map(|v| v.clone()))
    }

    async fn latest_student_verification(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Option<StudentVerification>> {
        Ok(collect_where(&self.verifications, |v| v.user_id == user_id)
            .into_iter()
            .max_by_key(|v| v.submitted_at))
    }

    async fn list_student_verifications(
        &self,
        filter: &StudentVerificationFilter,
    ) -> StorageResult<Vec<StudentVerification>> {
        let mut items = collect_where(&self.verifications, |v| {
            filter.status.is_none_or(|s| v.status == s)
        });
        items.sort_by_key(|v| v.submitted_at);
        items.truncate(filter.limit);
        Ok(items)
    }

    async fn update_student_verification(
        &self,
        verification: &StudentVerification,
    ) -> StorageResult<StudentVerification> {
        {
            let mut existing = self
                .verifications
                .get_mut(&verification.id)
                .ok_or_else(|| StorageError::not_found("StudentVerification", verification.id))?;
            *existing = verification.clone();
        }
        if !is_open(verification.status) {
            self.open_verifications
                .remove_if(&verification.user_id, |_, id| *id == verification.id);
        }
        Ok(verification.clone())
    }
}

#[async_trait]
impl OtpStorage for InMemoryStorage {
    async fn put_otp(&self, challenge: &OtpChallenge) -> StorageResult<()> {
        self.otps.insert(challenge.email.clone(), challenge.clone());
        Ok(())
    }

    async fn get_otp(&self, email: &str) -> StorageResult<Option<OtpChallenge>> {
        Ok(self.otps.get(email).map(|c| c.clone()))
    }

    async fn record_otp_attempt(&self, email: &str) -> StorageResult<Option<OtpChallenge>> {
        Ok(self.otps.get_mut(email).map(|mut c| {
            c.attempts = c.attempts.saturating_add(1);
            c.clone()
        }))
    }

    async fn delete_otp(&self, email: &str) -> StorageResult<()> {
        self.otps.remove(email);
        Ok(())
    }
}

#[async_trait]
impl ContentStorage for InMemoryStorage {
    async fn create_content(&self, content: &ManagedContent) -> StorageResult<ManagedContent> {
        self.content.insert(content.id, content.clone());
        Ok(content.clone())
    }

    async fn list_content(&self) -> StorageResult<Vec<ManagedContent>> {
        let mut items = collect_where(&self.content, |_| true);
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn delete_content(&self, id: Uuid) -> StorageResult<bool> {
        Ok(self.content.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::now_utc;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let storage = InMemoryStorage::new();
        let user = User::new("ada@example.com", "Ada");
        storage.create_user(&user).await.unwrap();

        let again = User::new("ADA@example.com", "Imposter");
        let err = storage.create_user(&again).await.unwrap_err();
        assert!(err.is_already_exists());

        let found = storage
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn update_keeps_email() {
        let storage = InMemoryStorage::new();
        let user = storage
            .create_user(&User::new("ada@example.com", "Ada"))
            .await
            .unwrap();
        let mut changed = user.clone();
        changed.display_name = "Countess".into();
        changed.email = "other@example.com".into();
        let saved = storage.update_user(&changed).await.unwrap();
        assert_eq!(saved.display_name, "Countess");
        assert_eq!(saved.email, "ada@example.com");

        let ghost = User::new("ghost@example.com", "Ghost");
        assert!(storage.update_user(&ghost).await.unwrap_err().is_not_found());
    }

    fn verification(user_id: Uuid) -> StudentVerification {
        StudentVerification {
            id: Uuid::new_v4(),
            user_id,
            school_email: "ada@mit.edu".into(),
            institution: "MIT".into(),
            status: VerificationStatus::Pending,
            rejection_reason: None,
            reviewed_by: None,
            submitted_at: now_utc(),
            reviewed_at: None,
        }
    }

    #[tokio::test]
    async fn one_open_verification_per_user() {
        let storage = InMemoryStorage::new();
        let user = Uuid::new_v4();
        let first = storage
            .create_student_verification(&verification(user))
            .await
            .unwrap();
        assert!(
            storage
                .create_student_verification(&verification(user))
                .await
                .unwrap_err()
                .is_already_exists()
        );

        let mut rejected = first.clone();
        rejected.status = VerificationStatus::Rejected;
        storage.update_student_verification(&rejected).await.unwrap();

        storage
            .create_student_verification(&verification(user))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn otp_attempts_increment() {
        let storage = InMemoryStorage::new();
        let now = now_utc();
        storage
            .put_otp(&OtpChallenge {
                email: "ada@example.com".into(),
                code_hash: "x".into(),
                expires_at: now,
                attempts: 0,
                last_sent_at: now,
            })
            .await
            .unwrap();
        let updated = storage
            .record_otp_attempt("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.attempts, 1);
        assert!(storage.record_otp_attempt("nobody@example.com").await.unwrap().is_none());
        storage.delete_otp("ada@example.com").await.unwrap();
        assert!(storage.get_otp("ada@example.com").await.unwrap().is_none());
    }
}
