//! Message events.

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::MilkyEvent;
use crate::model::message::IncomingMessage;

/// A message was received.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "message_receive", type = "message")]
pub struct MessageReceive {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,

    #[event(message)]
    pub data: IncomingMessage,
}

impl MessageReceive {
    /// Returns `true` for private messages and for messages mentioning the
    /// receiving bot.
    pub fn to_me(&self) -> bool {
        self.data.is_private() || self.data.mentioned(self.base.self_id, false)
    }
}

/// A message was recalled.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "message_recall", type = "notice")]
pub struct MessageRecall {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,

    pub data: MessageRecallData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecallData {
    /// `friend`, `group` or `temp`.
    pub message_scene: String,
    pub peer_id: i64,
    pub message_seq: i64,
    pub sender_id: i64,
    pub operator_id: i64,
    /// Text shown after the recall tip.
    #[serde(default)]
    pub display_suffix: String,
}

impl MessageRecall {
    /// Returns `true` when someone other than the sender recalled it.
    pub fn by_operator(&self) -> bool {
        self.data.operator_id != self.data.sender_id
    }
}
