//! Received messages and the contact info attached to them.

use sakiko_core::Messageable;
use serde::{Deserialize, Serialize};

use super::segment::IncomingSegment;

/// Payload of a `message_receive` event.
///
/// Which of `friend`, `group` and `group_member` is present depends on
/// `message_scene`: friend messages carry `friend`, group messages carry
/// `group` and `group_member`, temporary sessions carry `group`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// `friend`, `group` or `temp`.
    pub message_scene: String,
    /// Friend id, group id or temporary-session peer.
    pub peer_id: i64,
    pub message_seq: i64,
    pub sender_id: i64,
    #[serde(default)]
    pub time: i64,
    pub segments: Vec<IncomingSegment>,
    #[serde(default)]
    pub friend: Option<FriendInfo>,
    #[serde(default)]
    pub group: Option<GroupInfo>,
    #[serde(default)]
    pub group_member: Option<GroupMemberInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendInfo {
    pub user_id: i64,
    pub nickname: String,
    pub sex: String,
    pub qid: String,
    pub remark: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupInfo {
    pub group_id: i64,
    pub group_name: String,
    pub member_count: i32,
    pub max_member_count: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMemberInfo {
    pub group_id: i64,
    pub user_id: i64,
    pub nickname: String,
    /// Group card (group nickname).
    pub card: String,
    pub title: String,
    pub level: i32,
    /// `owner`, `admin` or `member`.
    pub role: String,
}

impl IncomingMessage {
    /// Friend messages and temporary sessions.
    pub fn is_private(&self) -> bool {
        matches!(self.message_scene.as_str(), "friend" | "temp")
    }

    pub fn is_group(&self) -> bool {
        self.message_scene == "group"
    }

    /// Group card, friend remark or nickname, whichever is set first.
    pub fn sender_name(&self) -> &str {
        let member = self
            .group_member
            .as_ref()
            .and_then(|m| [&m.card, &m.nickname].into_iter().find(|s| !s.is_empty()));
        let friend = self
            .friend
            .as_ref()
            .and_then(|f| [&f.remark, &f.nickname].into_iter().find(|s| !s.is_empty()));
        member.or(friend).map(String::as_str).unwrap_or_default()
    }

    /// Concatenation of all text segments.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(IncomingSegment::as_text)
            .collect()
    }

    pub fn summary(&self) -> String {
        self.segments.iter().map(IncomingSegment::summary).collect()
    }

    /// Returns `true` if `user_id` is mentioned, or if `allow_all` is set and
    /// the message mentions everyone.
    pub fn mentioned(&self, user_id: i64, allow_all: bool) -> bool {
        self.segments.iter().any(|seg| match seg {
            IncomingSegment::Mention(data) => data.user_id == user_id,
            IncomingSegment::MentionAll(_) => allow_all,
            _ => false,
        })
    }

    /// Sequence number of the message quoted by a reply segment.
    pub fn reply_to(&self) -> Option<i64> {
        self.segments.iter().find_map(|seg| match seg {
            IncomingSegment::Reply(data) => Some(data.message_seq),
            _ => None,
        })
    }
}

impl Messageable for IncomingMessage {
    fn plain_text(&self) -> String {
        IncomingMessage::plain_text(self)
    }

    fn summary(&self) -> String {
        IncomingMessage::summary(self)
    }
}
