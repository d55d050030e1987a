//! Segments of incoming Milky messages.
//!
//! On the wire a segment is `{"type": "...", "data": {...}}`. Segment types
//! not modelled here deserialize into [`IncomingSegment::Unknown`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A segment of a received message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum IncomingSegment {
    Text(TextData),
    /// Mention of a single user.
    Mention(MentionData),
    MentionAll(EmptyData),
    /// Built-in emoji.
    Face(FaceData),
    /// Quote of an earlier message.
    Reply(ReplyData),
    Image(ImageData),
    /// Voice clip.
    Record(MediaData),
    Video(MediaData),
    File(FileData),
    /// Reference to a merged-forward message.
    Forward(ForwardData),
    LightApp(LightAppData),
    Xml(XmlData),
    #[serde(untagged)]
    Unknown(RawSegment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionData {
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmptyData {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    pub face_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    pub message_seq: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageData {
    pub resource_id: String,
    pub temp_url: String,
    pub width: i32,
    pub height: i32,
    /// Display text, e.g. `[图片]` or a sticker's name.
    pub summary: String,
    /// `normal` or `sticker`.
    pub sub_type: String,
}

/// Data for voice and video segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaData {
    pub resource_id: String,
    pub temp_url: String,
    /// Length in seconds.
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileData {
    pub file_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardData {
    pub forward_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightAppData {
    pub app_name: String,
    pub json_payload: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlData {
    pub service_id: i32,
    pub xml_payload: String,
}

/// A segment of a type this crate does not model, kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl IncomingSegment {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            IncomingSegment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// One-line rendering; non-text segments become placeholders.
    pub fn summary(&self) -> String {
        match self {
            IncomingSegment::Text(data) => data.text.clone(),
            IncomingSegment::Mention(data) => format!("@{}", data.user_id),
            IncomingSegment::MentionAll(_) => "@all".to_string(),
            IncomingSegment::Face(data) => format!("[face#{}]", data.face_id),
            IncomingSegment::Reply(data) => format!("[reply#{}]", data.message_seq),
            IncomingSegment::Image(data) if !data.summary.is_empty() => data.summary.clone(),
            IncomingSegment::Image(_) => "[image]".to_string(),
            IncomingSegment::Record(_) => "[voice]".to_string(),
            IncomingSegment::Video(_) => "[video]".to_string(),
            IncomingSegment::File(data) => format!("[file: {}]", data.file_name),
            IncomingSegment::Forward(_) => "[forward]".to_string(),
            IncomingSegment::LightApp(data) => format!("[app: {}]", data.app_name),
            IncomingSegment::Xml(_) => "[xml card]".to_string(),
            IncomingSegment::Unknown(raw) => format!("[{}]", raw.kind),
        }
    }
}
