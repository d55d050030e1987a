//! OneBot v11 message segments.
//!
//! A message segment is a single unit of content in a message, such as plain
//! text, an image or a mention. On the wire a segment is an object of the
//! form `{"type": "...", "data": {...}}`, and in the string format it is a CQ
//! code such as `[CQ:image,file=a.png]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use sakiko_adapter_onebot::Segment;
//!
//! let text = Segment::text("Hello, ");
//! let at = Segment::at(10001000);
//! let face = Segment::face(178);
//! ```
//!
//! Segment types this module does not model deserialize into
//! [`Segment::Unknown`] and are sent back unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::types::{opt_string_like, string_like};

// ============================================================================
// Segment Enum
// ============================================================================

/// A OneBot v11 message segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text content.
    Text(TextData),
    /// Built-in emoji.
    Face(IdData),
    Image(ImageData),
    /// Voice clip.
    Record(MediaData),
    Video(MediaData),
    /// Uploaded file.
    File(FileData),
    /// Mention of a user, or of everyone when `qq` is `all`.
    At(AtData),
    /// Rock-paper-scissors magic emoji.
    Rps(EmptyData),
    /// Dice magic emoji.
    Dice(EmptyData),
    /// Window shake.
    Shake(EmptyData),
    Poke(PokeData),
    /// Link share.
    Share(ShareData),
    /// Friend or group recommendation.
    Contact(ContactData),
    Location(LocationData),
    Music(MusicData),
    /// Quote of an earlier message.
    Reply(IdData),
    /// Reference to a merged-forward message.
    Forward(IdData),
    /// Node used when composing a merged-forward message.
    Node(NodeData),
    Xml(RichData),
    Json(RichData),
    /// Any segment type not listed above.
    #[serde(untagged)]
    Unknown(RawSegment),
}

// ============================================================================
// Segment Data Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// Data for segments that only carry an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdData {
    #[serde(deserialize_with = "string_like")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmptyData {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// File name, path, URL or `base64://` payload.
    pub file: String,
    /// `flash` for flash images.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    /// Download URL (receive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Display text some implementations attach to stickers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Data for voice and video segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaData {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    /// User id, or `all`.
    #[serde(deserialize_with = "string_like")]
    pub qq: String,
    /// Display name some implementations attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AtData {
    pub fn is_all(&self) -> bool {
        self.qq == "all"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokeData {
    #[serde(rename = "type", deserialize_with = "string_like")]
    pub poke_type: String,
    #[serde(deserialize_with = "string_like")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareData {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactData {
    /// `qq` or `group`.
    #[serde(rename = "type")]
    pub contact_type: String,
    #[serde(deserialize_with = "string_like")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    #[serde(deserialize_with = "string_like")]
    pub lat: String,
    #[serde(deserialize_with = "string_like")]
    pub lon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicData {
    /// `qq`, `163`, `xm` or `custom`.
    #[serde(rename = "type")]
    pub music_type: String,
    #[serde(
        default,
        deserialize_with = "opt_string_like",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Existing message to include.
    #[serde(
        default,
        deserialize_with = "opt_string_like",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_like",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Custom content, as a segment array or CQ string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// Data for XML and JSON cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichData {
    pub data: String,
}

/// A segment whose type is not modelled, kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

// ============================================================================
// Builders
// ============================================================================

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    pub fn face(id: i32) -> Self {
        Segment::Face(IdData { id: id.to_string() })
    }

    /// Creates an image from a file path, URL or `base64://` payload.
    pub fn image(file: impl Into<String>) -> Self {
        Segment::Image(ImageData {
            file: file.into(),
            image_type: None,
            url: None,
            summary: None,
        })
    }

    pub fn record(file: impl Into<String>) -> Self {
        Segment::Record(MediaData {
            file: file.into(),
            url: None,
        })
    }

    pub fn video(file: impl Into<String>) -> Self {
        Segment::Video(MediaData {
            file: file.into(),
            url: None,
        })
    }

    pub fn at(user_id: i64) -> Self {
        Segment::At(AtData {
            qq: user_id.to_string(),
            name: None,
        })
    }

    pub fn at_all() -> Self {
        Segment::At(AtData {
            qq: "all".to_string(),
            name: None,
        })
    }

    pub fn reply(message_id: impl ToString) -> Self {
        Segment::Reply(IdData {
            id: message_id.to_string(),
        })
    }

    pub fn poke(poke_type: impl Into<String>, id: impl Into<String>) -> Self {
        Segment::Poke(PokeData {
            poke_type: poke_type.into(),
            id: id.into(),
        })
    }

    pub fn share(url: impl Into<String>, title: impl Into<String>) -> Self {
        Segment::Share(ShareData {
            url: url.into(),
            title: title.into(),
            content: None,
            image: None,
        })
    }

    pub fn location(lat: f64, lon: f64) -> Self {
        Segment::Location(LocationData {
            lat: lat.to_string(),
            lon: lon.to_string(),
            title: None,
            content: None,
        })
    }

    /// Creates a platform music share (`qq`, `163`, `xm`).
    pub fn music(music_type: impl Into<String>, id: impl Into<String>) -> Self {
        Segment::Music(MusicData {
            music_type: music_type.into(),
            id: Some(id.into()),
            url: None,
            audio: None,
            title: None,
        })
    }

    /// Creates a merged-forward node with custom content.
    pub fn node(user_id: i64, nickname: impl Into<String>, content: Value) -> Self {
        Segment::Node(NodeData {
            id: None,
            user_id: Some(user_id.to_string()),
            nickname: Some(nickname.into()),
            content: Some(content),
        })
    }

    pub fn xml(data: impl Into<String>) -> Self {
        Segment::Xml(RichData { data: data.into() })
    }

    pub fn json(data: impl Into<String>) -> Self {
        Segment::Json(RichData { data: data.into() })
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Segment {
    /// Returns the wire `type` of this segment.
    pub fn kind(&self) -> &str {
        match self {
            Segment::Text(_) => "text",
            Segment::Face(_) => "face",
            Segment::Image(_) => "image",
            Segment::Record(_) => "record",
            Segment::Video(_) => "video",
            Segment::File(_) => "file",
            Segment::At(_) => "at",
            Segment::Rps(_) => "rps",
            Segment::Dice(_) => "dice",
            Segment::Shake(_) => "shake",
            Segment::Poke(_) => "poke",
            Segment::Share(_) => "share",
            Segment::Contact(_) => "contact",
            Segment::Location(_) => "location",
            Segment::Music(_) => "music",
            Segment::Reply(_) => "reply",
            Segment::Forward(_) => "forward",
            Segment::Node(_) => "node",
            Segment::Xml(_) => "xml",
            Segment::Json(_) => "json",
            Segment::Unknown(raw) => &raw.kind,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// One-line rendering with an English placeholder for non-text content.
    pub fn summary(&self) -> String {
        match self {
            Segment::Text(data) => data.text.clone(),
            Segment::At(data) if data.is_all() => "@all".to_string(),
            Segment::At(data) => format!("@{}", data.qq),
            Segment::Face(data) => format!("[face#{}]", data.id),
            Segment::Reply(data) => format!("[reply#{}]", data.id),
            Segment::Image(data) => match data.summary.as_deref() {
                Some(summary) if !summary.is_empty() => summary.to_string(),
                _ => "[image]".to_string(),
            },
            Segment::Record(_) => "[voice]".to_string(),
            Segment::Video(_) => "[video]".to_string(),
            Segment::File(data) => match &data.name {
                Some(name) => format!("[file: {name}]"),
                None => "[file]".to_string(),
            },
            Segment::Rps(_) => "[rps]".to_string(),
            Segment::Dice(_) => "[dice]".to_string(),
            Segment::Shake(_) => "[shake]".to_string(),
            Segment::Poke(_) => "[poke]".to_string(),
            Segment::Share(data) => format!("[share: {}]", data.title),
            Segment::Contact(_) => "[contact]".to_string(),
            Segment::Location(_) => "[location]".to_string(),
            Segment::Music(_) => "[music]".to_string(),
            Segment::Forward(_) | Segment::Node(_) => "[forward]".to_string(),
            Segment::Xml(_) => "[xml card]".to_string(),
            Segment::Json(_) => "[json card]".to_string(),
            Segment::Unknown(_) => "[unknown]".to_string(),
        }
    }

    /// Renders this segment as a CQ code. Text is returned escaped.
    pub fn to_cq_code(&self) -> String {
        if let Segment::Text(data) = self {
            return escape_cq_text(&data.text);
        }

        let data = match self {
            Segment::Unknown(raw) => raw.data.clone(),
            other => serde_json::to_value(other)
                .ok()
                .and_then(|mut v| v.get_mut("data").map(Value::take))
                .unwrap_or(Value::Null),
        };

        let mut code = format!("[CQ:{}", self.kind());
        if let Value::Object(fields) = data {
            for (key, value) in fields {
                let value = match value {
                    Value::Null => continue,
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                code.push(',');
                code.push_str(&key);
                code.push('=');
                code.push_str(&escape_cq_value(&value));
            }
        }
        code.push(']');
        code
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

// ============================================================================
// CQ Code Parsing
// ============================================================================

/// Parses a CQ-code string into segments.
///
/// Text between codes becomes text segments. An unterminated `[CQ:` is kept
/// as text.
pub fn parse_cq_string(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find("[CQ:") {
        let Some(len) = rest[start..].find(']') else {
            break;
        };
        if start > 0 {
            segments.push(Segment::text(unescape_cq(&rest[..start])));
        }
        segments.push(cq_to_segment(&rest[start + 4..start + len]));
        rest = &rest[start + len + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::text(unescape_cq(rest)));
    }
    segments
}

/// Converts the body of a CQ code (`type,key=value,...`) into a segment.
fn cq_to_segment(body: &str) -> Segment {
    let mut parts = body.split(',');
    let kind = parts.next().unwrap_or_default().trim().to_string();
    let data: Map<String, Value> = parts
        .filter_map(|part| part.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), Value::String(unescape_cq(value))))
        .collect();

    serde_json::from_value(json!({ "type": kind, "data": data.clone() })).unwrap_or_else(|_| {
        Segment::Unknown(RawSegment {
            kind,
            data: Value::Object(data),
        })
    })
}

/// Escapes `&`, `[` and `]` in plain text.
pub fn escape_cq_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Escapes a CQ parameter value, which additionally escapes `,`.
pub fn escape_cq_value(value: &str) -> String {
    escape_cq_text(value).replace(',', "&#44;")
}

/// Reverses [`escape_cq_value`].
pub fn unescape_cq(text: &str) -> String {
    text.replace("&#44;", ",")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}
