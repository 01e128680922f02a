use std::sync::atomic::AtomicBool;

use dashmap::DashMap;
use thrive_core::UserBadge;
use thrive_core::model::{
    CalendarEvent, FocusSession, Friendship, HealthLog, ManagedContent, Notification,
    OtpChallenge, StudentVerification, Subscription, Task, User,
};
use uuid::Uuid;

/// In-memory storage backend.
///
/// Secondary maps (`emails`, `active_focus`, `open_verifications`,
/// `friend_pairs`) enforce the same uniqueness rules the Postgres schema does
/// through unique indexes. They are always written through the `entry` API so
/// check-and-insert is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    pub(crate) users: DashMap<Uuid, User>,
    pub(crate) emails: DashMap<String, Uuid>,
    pub(crate) tasks: DashMap<Uuid, Task>,
    pub(crate) health_logs: DashMap<Uuid, HealthLog>,
    pub(crate) focus_sessions: DashMap<Uuid, FocusSession>,
    /// user id -> active session id
    pub(crate) active_focus: DashMap<Uuid, Uuid>,
    pub(crate) calendar_events: DashMap<Uuid, CalendarEvent>,
    pub(crate) badges: DashMap<(Uuid, String), UserBadge>,
    pub(crate) notifications: DashMap<Uuid, Notification>,
    pub(crate) subscriptions: DashMap<Uuid, Subscription>,
    pub(crate) verifications: DashMap<Uuid, StudentVerification>,
    /// user id -> pending or verified request id
    pub(crate) open_verifications: DashMap<Uuid, Uuid>,
    pub(crate) content: DashMap<Uuid, ManagedContent>,
    pub(crate) friendships: DashMap<Uuid, Friendship>,
    /// ordered user pair -> friendship id
    pub(crate) friend_pairs: DashMap<(Uuid, Uuid), Uuid>,
    pub(crate) otps: DashMap<String, OtpChallenge>,
    pub(crate) initialized: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Unordered pair key.
pub(crate) fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Clones the values matching `keep` out of a map.
pub(crate) fn collect_where<V: Clone>(
    map: &DashMap<Uuid, V>,
    keep: impl Fn(&V) -> bool,
) -> Vec<V> {
    map.iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect()
}
