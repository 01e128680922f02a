use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    pub enum FriendshipStatus ("status") {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub addressee_id: Uuid,
    pub status: FriendshipStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub responded_at: Option<OffsetDateTime>,
}

impl Friendship {
    pub fn request(requester_id: Uuid, addressee_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            addressee_id,
            status: FriendshipStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            responded_at: None,
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.addressee_id == user_id
    }

    /// The other side of the friendship from `user_id`'s point of view.
    pub fn other(&self, user_id: Uuid) -> Uuid {
        if self.requester_id == user_id {
            self.addressee_id
        } else {
            self.requester_id
        }
    }
}
