//! Typed API response payloads.

use serde::{Deserialize, Serialize};

use super::message::OneBotMessage;
use super::types::Sender;

/// Response of `get_login_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

/// Response of the `send_*_msg` actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessageId {
    pub message_id: i64,
}

/// Response of `get_msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: i64,
    #[serde(default)]
    pub real_id: Option<i64>,
    pub time: i64,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub sender: Sender,
    pub message: OneBotMessage,
}

/// Entry of `get_friend_list`, and response of `get_stranger_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

/// Response of `get_group_info` and entry of `get_group_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    pub group_name: String,
    #[serde(default)]
    pub member_count: i32,
    #[serde(default)]
    pub max_member_count: i32,
}

/// Response of `get_group_member_info` and entry of `get_group_member_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberInfo {
    pub group_id: i64,
    pub user_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub join_time: i64,
    #[serde(default)]
    pub last_sent_time: i64,
}
