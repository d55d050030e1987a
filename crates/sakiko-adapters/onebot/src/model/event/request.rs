//! Request events.
//!
//! Both kinds carry a `flag` that is passed back when approving or rejecting
//! the request.

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::OneBotEvent;

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "request", type = "request")]
pub struct RequestEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: OneBotEvent,

    /// `friend` or `group`.
    pub request_type: String,
    pub user_id: i64,
    #[serde(default)]
    pub comment: String,
    pub flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "request.friend")]
pub struct FriendRequestEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: RequestEvent,
}

/// Join request (`add`) or invitation of the bot (`invite`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "request.group")]
pub struct GroupRequestEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: RequestEvent,

    pub sub_type: String,
    pub group_id: i64,
}
