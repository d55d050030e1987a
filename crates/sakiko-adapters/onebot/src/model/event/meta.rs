//! Meta events.

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OneBotEvent;

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "meta", type = "meta")]
pub struct MetaEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: OneBotEvent,

    /// `lifecycle` or `heartbeat`.
    pub meta_event_type: String,
}

/// `sub_type` is `enable`, `disable` or `connect`.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "meta.lifecycle")]
pub struct LifecycleEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MetaEvent,

    pub sub_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "meta.heartbeat")]
pub struct HeartbeatEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: MetaEvent,

    /// Implementation-defined status object.
    #[serde(default)]
    pub status: Value,
    /// Milliseconds until the next heartbeat.
    #[serde(default)]
    pub interval: i64,
}
