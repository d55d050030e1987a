//! Milky events.
//!
//! Every event shares the envelope `{time, self_id, event_type, data}`. The
//! envelope is the root [`MilkyEvent`]; each concrete event embeds it through
//! `#[serde(flatten)]` and keeps its payload in a typed `data` field:
//!
//! ```text
//! GroupMute  ──Deref──▶  MilkyEvent
//!   data.group_id, …       time, self_id, event_type
//! ```
//!
//! Event names are `milky.{event_type}`, e.g. `milky.group_mute`.

pub mod message;
pub mod notice;
pub mod request;

use std::sync::Arc;

use sakiko_core::{AdapterError, AdapterResult, BoxedEvent, EventMeta};
use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

pub use message::*;
pub use notice::*;
pub use request::*;

/// The Milky event envelope.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[root_event(platform = "milky")]
pub struct MilkyEvent {
    #[serde(skip)]
    #[event(meta)]
    pub meta: EventMeta,

    /// Unix timestamp in seconds.
    pub time: i64,
    #[event(self_id)]
    pub self_id: i64,
    pub event_type: String,

    #[serde(skip)]
    #[event(raw_json)]
    raw: Option<Arc<str>>,
}

impl MilkyEvent {
    pub(crate) fn attach_raw(&mut self, raw: Arc<str>) {
        self.raw = Some(raw);
    }
}

/// The bot account went offline.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "bot_offline", type = "meta")]
pub struct BotOffline {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MilkyEvent,
    pub data: BotOfflineData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotOfflineData {
    pub reason: String,
}

/// Decodes an event envelope into its concrete event type.
///
/// Returns `Ok(None)` for frames without an `event_type` and for event
/// types this crate does not model.
pub fn parse_event(frame: &Value) -> AdapterResult<Option<BoxedEvent>> {
    let Some(event_type) = frame.get("event_type").and_then(Value::as_str) else {
        return Ok(None);
    };
    let raw: Arc<str> = Arc::from(frame.to_string());

    macro_rules! decode {
        ($ty:ty) => {{
            let mut event = <$ty>::deserialize(frame).map_err(|e| {
                AdapterError::parse(format!("malformed {}: {e}", stringify!($ty)))
            })?;
            event.attach_raw(raw);
            BoxedEvent::new(event)
        }};
    }

    let event = match event_type {
        "bot_offline" => decode!(BotOffline),
        "message_receive" => decode!(MessageReceive),
        "message_recall" => decode!(MessageRecall),
        "friend_request" => decode!(FriendRequest),
        "group_join_request" => decode!(GroupJoinRequest),
        "group_invited_join_request" => decode!(GroupInvitedJoinRequest),
        "group_invitation" => decode!(GroupInvitation),
        "friend_nudge" => decode!(FriendNudge),
        "friend_file_upload" => decode!(FriendFileUpload),
        "group_admin_change" => decode!(GroupAdminChange),
        "group_essence_message_change" => decode!(GroupEssenceMessageChange),
        "group_member_increase" => decode!(GroupMemberIncrease),
        "group_member_decrease" => decode!(GroupMemberDecrease),
        "group_name_change" => decode!(GroupNameChange),
        "group_message_reaction" => decode!(GroupMessageReaction),
        "group_mute" => decode!(GroupMute),
        "group_whole_mute" => decode!(GroupWholeMute),
        "group_nudge" => decode!(GroupNudge),
        "group_file_upload" => decode!(GroupFileUpload),
        other => {
            trace!(event_type = other, "Skipping unknown Milky event");
            return Ok(None);
        }
    };
    Ok(Some(event))
}
