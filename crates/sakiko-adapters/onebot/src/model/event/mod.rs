//! OneBot v11 events.
//!
//! Each child event embeds its parent through `#[serde(flatten)]`, and
//! `#[derive(BotEvent)]` generates `Deref`/`DerefMut` to it, so any event can
//! read all of its ancestors' fields:
//!
//! ```text
//! PrivateMessageEvent  ──Deref──▶  MessageEvent  ──Deref──▶  OneBotEvent
//!   temp_source                     message, user_id, …        time, self_id
//! ```
//!
//! # Event Hierarchy
//!
//! ```text
//! OneBotEvent { time, self_id, post_type }          ← onebot
//! ├── MessageEvent                                   ← onebot.message
//! │   ├── PrivateMessageEvent
//! │   └── GroupMessageEvent
//! ├── NoticeEvent                                    ← onebot.notice
//! │   ├── GroupUploadNotice, GroupAdminNotice, …
//! │   └── PokeNotice
//! ├── RequestEvent                                   ← onebot.request
//! │   ├── FriendRequestEvent
//! │   └── GroupRequestEvent
//! └── MetaEvent                                      ← onebot.meta
//!     ├── LifecycleEvent
//!     └── HeartbeatEvent
//! ```
//!
//! # Parsing
//!
//! [`parse_event`] inspects `post_type` and the per-type discriminator and
//! builds the most specific event type. A discriminator value without a
//! dedicated type produces the parent level instead.

pub mod message;
pub mod meta;
pub mod notice;
pub mod request;

use std::sync::Arc;

use sakiko_core::{AdapterError, AdapterResult, BoxedEvent, EventMeta};
use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use message::*;
pub use meta::*;
pub use notice::*;
pub use request::*;

/// The root OneBot v11 event.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[root_event(platform = "onebot")]
pub struct OneBotEvent {
    #[serde(skip)]
    #[event(meta)]
    pub meta: EventMeta,

    /// Unix timestamp in seconds.
    pub time: i64,
    #[event(self_id)]
    pub self_id: i64,
    /// `message`, `notice`, `request` or `meta_event`.
    pub post_type: String,

    #[serde(skip)]
    #[event(raw_json)]
    raw: Option<Arc<str>>,
}

impl OneBotEvent {
    /// Attaches the frame this event was decoded from.
    pub(crate) fn attach_raw(&mut self, raw: Arc<str>) {
        self.raw = Some(raw);
    }
}

/// Returns `true` for API responses, which share the socket with events.
pub fn is_api_response(frame: &Value) -> bool {
    frame.get("echo").is_some() || frame.get("retcode").is_some()
}

/// Returns `true` for the lifecycle `connect` meta event that opens a session.
pub fn is_connect_event(frame: &Value) -> bool {
    let field = |key: &str| frame.get(key).and_then(Value::as_str);
    field("post_type") == Some("meta_event")
        && field("meta_event_type") == Some("lifecycle")
        && field("sub_type") == Some("connect")
}

/// Decodes a frame into the most specific event type.
///
/// Returns `Ok(None)` for frames that are not events: API responses and
/// unknown `post_type` values.
pub fn parse_event(frame: &Value) -> AdapterResult<Option<BoxedEvent>> {
    decode_event(frame, Arc::from(frame.to_string()))
}

/// Like [`parse_event`], keeping `raw` as the event's raw JSON.
pub(crate) fn decode_event(frame: &Value, raw: Arc<str>) -> AdapterResult<Option<BoxedEvent>> {
    if is_api_response(frame) {
        return Ok(None);
    }
    let field = |key: &str| frame.get(key).and_then(Value::as_str).unwrap_or_default();

    macro_rules! decode {
        ($ty:ty) => {{
            let mut event = <$ty>::deserialize(frame).map_err(|e| {
                AdapterError::parse(format!("malformed {}: {e}", stringify!($ty)))
            })?;
            event.attach_raw(raw);
            BoxedEvent::new(event)
        }};
    }

    let event = match field("post_type") {
        "message" => match field("message_type") {
            "private" => decode!(PrivateMessageEvent),
            "group" => decode!(GroupMessageEvent),
            _ => decode!(MessageEvent),
        },
        "notice" => match field("notice_type") {
            "group_upload" => decode!(GroupUploadNotice),
            "group_admin" => decode!(GroupAdminNotice),
            "group_decrease" => decode!(GroupDecreaseNotice),
            "group_increase" => decode!(GroupIncreaseNotice),
            "group_ban" => decode!(GroupBanNotice),
            "friend_add" => decode!(FriendAddNotice),
            "group_recall" => decode!(GroupRecallNotice),
            "friend_recall" => decode!(FriendRecallNotice),
            "notify" if field("sub_type") == "poke" => decode!(PokeNotice),
            _ => decode!(NoticeEvent),
        },
        "request" => match field("request_type") {
            "friend" => decode!(FriendRequestEvent),
            "group" => decode!(GroupRequestEvent),
            _ => decode!(RequestEvent),
        },
        "meta_event" => match field("meta_event_type") {
            "lifecycle" => decode!(LifecycleEvent),
            "heartbeat" => decode!(HeartbeatEvent),
            _ => decode!(MetaEvent),
        },
        _ => return Ok(None),
    };
    Ok(Some(event))
}
