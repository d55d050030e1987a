//! Friend and group notices.

use sakiko_macros::BotEvent;
use serde::{Deserialize, Serialize};

use super::MilkyEvent;

/// Declares a notice event with its `data` payload type.
macro_rules! notice_event {
    ($(#[$doc:meta])* $name:ident, $wire:tt, $data:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Serialize, Deserialize, BotEvent)]
        #[event(name = $wire, type = "notice")]
        pub struct $name {
            #[event(parent)]
            #[serde(flatten)]
            pub base: MilkyEvent,

            pub data: $data,
        }
    };
}

// ============================================================================
// Friend notices
// ============================================================================

notice_event!(
    /// A friend nudged the bot, or the bot nudged a friend.
    FriendNudge,
    "friend_nudge",
    NudgeData
);

notice_event!(
    /// A friend sent a file.
    FriendFileUpload,
    "friend_file_upload",
    FriendFileUploadData
);

/// Shared by friend and group nudges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeData {
    /// Friend on the other side; unset for group nudges.
    pub user_id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub is_self_send: bool,
    pub is_self_receive: bool,
    /// Verb shown in the tip, e.g. "poked".
    pub display_action: String,
    pub display_suffix: String,
    pub display_action_img_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendFileUploadData {
    pub user_id: i64,
    pub file_id: String,
    pub file_name: String,
    pub file_size: i64,
    #[serde(default)]
    pub file_hash: String,
    /// The bot itself sent the file.
    #[serde(default)]
    pub is_self: bool,
}

// ============================================================================
// Group notices
// ============================================================================

notice_event!(
    /// A member was made or unmade an admin.
    GroupAdminChange,
    "group_admin_change",
    GroupAdminChangeData
);

notice_event!(
    /// A message was added to or removed from the group's essence list.
    GroupEssenceMessageChange,
    "group_essence_message_change",
    GroupEssenceMessageChangeData
);

notice_event!(GroupMemberIncrease, "group_member_increase", GroupMemberIncreaseData);
notice_event!(GroupMemberDecrease, "group_member_decrease", GroupMemberDecreaseData);
notice_event!(GroupNameChange, "group_name_change", GroupNameChangeData);

notice_event!(
    /// A member added or removed an emoji reaction on a message.
    GroupMessageReaction,
    "group_message_reaction",
    GroupMessageReactionData
);

notice_event!(
    /// A member was muted; a zero duration lifts the mute.
    GroupMute,
    "group_mute",
    GroupMuteData
);

notice_event!(GroupWholeMute, "group_whole_mute", GroupWholeMuteData);

notice_event!(
    /// A member nudged another member.
    GroupNudge,
    "group_nudge",
    NudgeData
);

notice_event!(GroupFileUpload, "group_file_upload", GroupFileUploadData);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupAdminChangeData {
    pub group_id: i64,
    pub user_id: i64,
    /// `true` when the member became an admin.
    pub is_set: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEssenceMessageChangeData {
    pub group_id: i64,
    pub message_seq: i64,
    pub is_set: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberIncreaseData {
    pub group_id: i64,
    pub user_id: i64,
    /// Admin who approved the join.
    #[serde(default)]
    pub operator_id: Option<i64>,
    #[serde(default)]
    pub invitor_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberDecreaseData {
    pub group_id: i64,
    pub user_id: i64,
    /// Admin who removed the member; unset when they left on their own.
    #[serde(default)]
    pub operator_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNameChangeData {
    pub group_id: i64,
    pub new_group_name: String,
    pub operator_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessageReactionData {
    pub group_id: i64,
    pub user_id: i64,
    pub message_seq: i64,
    pub face_id: String,
    /// `false` when the reaction was removed.
    #[serde(default = "default_true")]
    pub is_add: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMuteData {
    pub group_id: i64,
    pub user_id: i64,
    pub operator_id: i64,
    /// Seconds.
    pub duration: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWholeMuteData {
    pub group_id: i64,
    pub operator_id: i64,
    pub is_mute: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFileUploadData {
    pub group_id: i64,
    pub user_id: i64,
    pub file_id: String,
    pub file_name: String,
    pub file_size: i64,
}

fn default_true() -> bool {
    true
}

impl GroupMemberDecrease {
    /// The member left without being removed by an admin.
    pub fn is_leave(&self) -> bool {
        self.data
            .operator_id
            .is_none_or(|operator| operator == self.data.user_id)
    }
}

impl GroupMute {
    pub fn is_mute(&self) -> bool {
        self.data.duration > 0
    }
}

impl GroupNudge {
    /// The bot was the one nudged.
    pub fn to_me(&self) -> bool {
        self.data.receiver_id == self.base.self_id
    }
}
