//! Notice events.
//!
//! ```text
//! OneBotEvent
//! └── NoticeEvent { notice_type }
//!     ├── GroupUploadNotice, GroupAdminNotice
//!     ├── GroupDecreaseNotice, GroupIncreaseNotice, GroupBanNotice
//!     ├── FriendAddNotice
//!     ├── GroupRecallNotice, FriendRecallNotice
//!     └── PokeNotice          (notice_type = notify, sub_type = poke)
//! ```
//!
//! Notices with an unlisted `notice_type` are delivered as [`NoticeEvent`].

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::OneBotEvent;

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice", type = "notice")]
pub struct NoticeEvent {
    #[event(parent)]
    #[serde(flatten)]
    pub base: OneBotEvent,

    pub notice_type: String,
}

/// File uploaded to a group.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.group_upload")]
pub struct GroupUploadNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub group_id: i64,
    pub user_id: i64,
    pub file: UploadedFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: i64,
    #[serde(default)]
    pub busid: i64,
}

/// Group admin set (`set`) or unset (`unset`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.group_admin")]
pub struct GroupAdminNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub sub_type: String,
    pub group_id: i64,
    pub user_id: i64,
}

/// Member left (`leave`), was kicked (`kick`), or the bot was kicked (`kick_me`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.group_decrease")]
pub struct GroupDecreaseNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub sub_type: String,
    pub group_id: i64,
    #[serde(default)]
    pub operator_id: i64,
    pub user_id: i64,
}

/// Member joined through approval (`approve`) or invitation (`invite`).
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.group_increase")]
pub struct GroupIncreaseNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub sub_type: String,
    pub group_id: i64,
    #[serde(default)]
    pub operator_id: i64,
    pub user_id: i64,
}

/// Member muted (`ban`) or unmuted (`lift_ban`). `user_id` 0 means the whole group.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.group_ban")]
pub struct GroupBanNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub sub_type: String,
    pub group_id: i64,
    pub operator_id: i64,
    pub user_id: i64,
    /// Seconds.
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.friend_add")]
pub struct FriendAddNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.group_recall")]
pub struct GroupRecallNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub group_id: i64,
    pub user_id: i64,
    pub operator_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.friend_recall")]
pub struct FriendRecallNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    pub user_id: i64,
    pub message_id: i64,
}

/// Poke, in a group when `group_id` is present.
#[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
#[event(name = "notice.poke")]
pub struct PokeNotice {
    #[event(parent)]
    #[serde(flatten)]
    pub base: NoticeEvent,

    #[serde(default)]
    pub group_id: Option<i64>,
    pub user_id: i64,
    pub target_id: i64,
}

impl PokeNotice {
    /// Returns `true` if the receiving bot was poked.
    pub fn to_me(&self) -> bool {
        self.target_id == self.base.base.self_id
    }
}
