//! Message events.
//!
//! ```text
//! OneBotEvent
//! └── MessageEvent { message_id, user_id, message, raw_message, sender, … }
//!     ├── PrivateMessageEvent { temp_source }
//!     └── GroupMessageEvent   { group_id, anonymous }
//! ```

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::OneBotEvent;
use crate::model::message::OneBotMessage;
use crate::model::types::{Anonymous, Sender};

/// Fields shared by every message event.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "message", type = "message")]
pub struct MessageEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: OneBotEvent,

    /// `private` or `group`.
    pub message_type: String,
    #[serde(default)]
    pub sub_type: String,
    pub message_id: i64,
    pub user_id: i64,
    #[event(message)]
    pub message: OneBotMessage,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub font: i32,
    #[serde(default)]
    pub sender: Sender,
}

impl MessageEvent {
    pub fn is_private(&self) -> bool {
        self.message_type == "private"
    }

    /// Returns `true` for private messages and for messages mentioning the
    /// receiving bot.
    pub fn to_me(&self) -> bool {
        self.is_private()
            || self.message.mentioned(&self.base.self_id.to_string(), false)
    }
}

/// Private message event.
///
/// `sub_type` is `friend`, `group` (temporary session) or `other`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "message.private")]
pub struct PrivateMessageEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MessageEvent,

    /// Source group of a temporary session.
    #[serde(default)]
    pub temp_source: Option<i64>,
}

/// Group message event.
///
/// `sub_type` is `normal`, `anonymous` or `notice`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "message.group")]
pub struct GroupMessageEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MessageEvent,

    pub group_id: i64,
    #[serde(default)]
    pub anonymous: Option<Anonymous>,
}
