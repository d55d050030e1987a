//! Friend and group requests.
//!
//! Accepting or rejecting a request is an API call that needs the
//! `notification_seq` or `invitation_seq` carried here.

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::MilkyEvent;

/// Someone asked to become a friend.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "friend_request", type = "request")]
pub struct FriendRequest {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,

    pub data: FriendRequestData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestData {
    pub initiator_id: i64,
    #[serde(default)]
    pub initiator_uid: String,
    #[serde(default)]
    pub comment: String,
    /// Where the request came from, e.g. a group search.
    #[serde(default)]
    pub via: String,
}

/// Someone asked to join a group the bot manages.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "group_join_request", type = "request")]
pub struct GroupJoinRequest {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,

    pub data: GroupJoinRequestData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupJoinRequestData {
    pub group_id: i64,
    pub notification_seq: i64,
    /// Set for requests the platform flagged as risky.
    #[serde(default)]
    pub is_filtered: bool,
    pub initiator_id: i64,
    #[serde(default)]
    pub comment: String,
}

/// A member invited someone else into a group the bot manages.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "group_invited_join_request", type = "request")]
pub struct GroupInvitedJoinRequest {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,

    pub data: GroupInvitedJoinRequestData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInvitedJoinRequestData {
    pub group_id: i64,
    pub notification_seq: i64,
    pub initiator_id: i64,
    pub target_user_id: i64,
}

/// The bot was invited into a group.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "group_invitation", type = "request")]
pub struct GroupInvitation {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,

    pub data: GroupInvitationData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInvitationData {
    pub group_id: i64,
    pub invitation_seq: i64,
    pub initiator_id: i64,
}
