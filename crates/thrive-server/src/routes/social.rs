//! Friend requests and the weekly leaderboard.

use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{
    Friendship, FriendshipStatus, Notification, NotificationKind, User, normalize_email,
};
use thrive_core::now_utc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::tasks::Deleted;
use super::{IdPath, JsonBody};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/social/friends", post(add_friend).get(list_friends))
        .route("/api/social/friends/{id}/accept", post(accept_friend))
        .route("/api/social/friends/{id}/decline", post(decline_friend))
        .route("/api/social/friends/{id}", delete(remove_friend))
        .route("/api/social/leaderboard", get(leaderboard))
}

const LEADERBOARD_DAYS: i64 = 7;

/// A friendship seen from one side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendView {
    pub friendship_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub status: FriendshipStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub since: OffsetDateTime,
}

impl FriendView {
    fn new(friendship: &Friendship, other: &User) -> Self {
        Self {
            friendship_id: friendship.id,
            user_id: other.id,
            name: other.public_name().to_string(),
            status: friendship.status,
            since: friendship.responded_at.unwrap_or(friendship.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddFriendRequest {
    pub email: String,
}

async fn add_friend(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<AddFriendRequest>,
) -> ApiResult<FriendView> {
    let me = state.current_user(&auth).await?;
    let other = state
        .storage
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(|| ApiError::not_found("No user with that email"))?;
    if other.id == me.id {
        return Err(ApiError::bad_request("You cannot add yourself as a friend"));
    }

    let friendship = state
        .storage
        .create_friendship(&Friendship::request(me.id, other.id))
        .await
        .map_err(|e| {
            if e.is_already_exists() {
                ApiError::conflict("A friendship with this user already exists")
            } else {
                e.into()
            }
        })?;

    state
        .notifier
        .notify_best_effort(Notification::new(
            other.id,
            NotificationKind::Social,
            "New friend request",
            format!("{} wants to be your friend", me.public_name()),
            json!({ "friendshipId": friendship.id, "userId": me.id }),
        ))
        .await;
    Ok(ApiResponse::created(FriendView::new(&friendship, &other)))
}

#[derive(Debug, Default, Serialize)]
pub struct FriendList {
    pub friends: Vec<FriendView>,
    pub incoming: Vec<FriendView>,
    pub outgoing: Vec<FriendView>,
}

async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<FriendList> {
    let mut list = FriendList::default();
    for friendship in state.storage.list_friendships(auth.user_id).await? {
        let Some(other) = state.storage.get_user(friendship.other(auth.user_id)).await? else {
            continue;
        };
        let view = FriendView::new(&friendship, &other);
        match friendship.status {
            FriendshipStatus::Accepted => list.friends.push(view),
            FriendshipStatus::Pending if friendship.addressee_id == auth.user_id => {
                list.incoming.push(view)
            }
            FriendshipStatus::Pending => list.outgoing.push(view),
            FriendshipStatus::Declined => {}
        }
    }
    list.friends.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ApiResponse::ok(list))
}

/// Loads a friendship the caller is part of; others' rows are 404.
async fn own_friendship(state: &AppState, user_id: Uuid, id: Uuid) -> Result<Friendship, ApiError> {
    state
        .storage
        .get_friendship(id)
        .await?
        .filter(|f| f.involves(user_id))
        .ok_or_else(|| ApiError::not_found("Friend request not found"))
}

async fn respond(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    status: FriendshipStatus,
) -> Result<Friendship, ApiError> {
    let mut friendship = own_friendship(state, user_id, id).await?;
    if friendship.addressee_id != user_id {
        return Err(ApiError::forbidden(
            "Only the recipient can respond to a friend request",
        ));
    }
    if friendship.status != FriendshipStatus::Pending {
        return Err(ApiError::conflict(format!(
            "Friend request is already {}",
            friendship.status
        )));
    }
    friendship.status = status;
    friendship.responded_at = Some(now_utc());
    Ok(state.storage.update_friendship(&friendship).await?)
}

async fn accept_friend(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Friendship> {
    let friendship = respond(&state, auth.user_id, id, FriendshipStatus::Accepted).await?;
    let me = state.current_user(&auth).await?;
    state
        .notifier
        .notify_best_effort(Notification::new(
            friendship.requester_id,
            NotificationKind::Social,
            "Friend request accepted",
            format!("{} accepted your friend request", me.public_name()),
            json!({ "friendshipId": friendship.id, "userId": me.id }),
        ))
        .await;
    Ok(ApiResponse::ok(friendship))
}

async fn decline_friend(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Friendship> {
    let friendship = respond(&state, auth.user_id, id, FriendshipStatus::Declined).await?;
    Ok(ApiResponse::ok(friendship))
}

async fn remove_friend(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Deleted> {
    let friendship = own_friendship(&state, auth.user_id, id).await?;
    state.storage.delete_friendship(friendship.id).await?;
    Ok(ApiResponse::ok(Deleted { deleted: true, id }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub name: String,
    pub tasks_completed: u64,
    pub is_you: bool,
}

/// Most completions first; ties by name.
pub(crate) fn rank_entries(mut entries: Vec<(Uuid, String, u64)>, me: Uuid) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, name, tasks_completed))| LeaderboardEntry {
            rank: i + 1,
            user_id,
            name,
            tasks_completed,
            is_you: user_id == me,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub days: i64,
    pub entries: Vec<LeaderboardEntry>,
}

async fn leaderboard(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<Leaderboard> {
    let me = state.current_user(&auth).await?;
    let since = now_utc() - Duration::days(LEADERBOARD_DAYS);

    let mut members = vec![me];
    for friendship in state.storage.list_friendships(auth.user_id).await? {
        if friendship.status != FriendshipStatus::Accepted {
            continue;
        }
        if let Some(friend) = state.storage.get_user(friendship.other(auth.user_id)).await? {
            members.push(friend);
        }
    }

    let mut entries = Vec::with_capacity(members.len());
    for member in members {
        let count = state
            .storage
            .count_tasks_completed_since(member.id, since)
            .await?;
        entries.push((member.id, member.public_name().to_string(), count));
    }

    Ok(ApiResponse::ok(Leaderboard {
        days: LEADERBOARD_DAYS,
        entries: rank_entries(entries, auth.user_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_breaks_ties_by_name() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let ranked = rank_entries(
            vec![
                (a, "Zoe".into(), 3),
                (b, "Ada".into(), 3),
                (c, "Max".into(), 7),
            ],
            a,
        );
        let names: Vec<_> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Max", "Ada", "Zoe"]);
        assert_eq!(ranked[2].rank, 3);
        assert!(ranked[2].is_you);
        assert!(!ranked[0].is_you);
    }
}
