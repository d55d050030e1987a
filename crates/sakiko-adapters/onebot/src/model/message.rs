//! OneBot v11 message type.
//!
//! OneBot v11 carries messages in two formats:
//! - **Array format**: a JSON array of segments
//! - **String format**: a CQ-coded string
//!
//! [`OneBotMessage`] accepts both and always sends the array format.
//!
//! # Example
//!
//! ```rust,ignore
//! use sakiko_adapter_onebot::OneBotMessage;
//!
//! let msg = OneBotMessage::new()
//!     .text("Hello, ")
//!     .at(10001000)
//!     .text("! Check this out: ")
//!     .image("http://example.com/image.jpg");
//!
//! assert_eq!(msg.plain_text(), "Hello, ! Check this out: ");
//! assert_eq!(msg.summary(), "Hello, @10001000! Check this out: [image]");
//! ```

use std::ops::Deref;

use sakiko_core::Messageable;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::segment::{Segment, parse_cq_string};

/// A OneBot v11 message composed of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OneBotMessage {
    segments: Vec<Segment>,
}

impl Serialize for OneBotMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.segments.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OneBotMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Array(Vec<Segment>),
            CqString(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Array(segments) => Self { segments },
            Repr::CqString(s) => Self::from_cq_string(&s),
        })
    }
}

// ============================================================================
// Constructors and Builders
// ============================================================================

impl OneBotMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses a CQ-coded string.
    pub fn from_cq_string(input: &str) -> Self {
        Self {
            segments: parse_cq_string(input),
        }
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.segment(Segment::text(text))
    }

    pub fn at(self, user_id: i64) -> Self {
        self.segment(Segment::at(user_id))
    }

    pub fn at_all(self) -> Self {
        self.segment(Segment::at_all())
    }

    pub fn face(self, id: i32) -> Self {
        self.segment(Segment::face(id))
    }

    pub fn image(self, file: impl Into<String>) -> Self {
        self.segment(Segment::image(file))
    }

    pub fn record(self, file: impl Into<String>) -> Self {
        self.segment(Segment::record(file))
    }

    /// Quotes an earlier message. Implementations expect this first.
    pub fn reply(self, message_id: impl ToString) -> Self {
        self.segment(Segment::reply(message_id))
    }

    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn push(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl OneBotMessage {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Renders the whole message in the CQ string format.
    pub fn to_cq_string(&self) -> String {
        self.segments.iter().map(Segment::to_cq_code).collect()
    }

    /// Concatenation of all text segments.
    pub fn plain_text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }

    /// One-line rendering with placeholders for non-text segments.
    pub fn summary(&self) -> String {
        self.segments.iter().map(Segment::summary).collect()
    }

    /// Ids of every user mentioned, excluding `@all`.
    pub fn mentioned_users(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                Segment::At(data) if !data.is_all() => Some(data.qq.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if `user_id` is mentioned, or if `allow_all` is set and
    /// the message mentions everyone.
    pub fn mentioned(&self, user_id: &str, allow_all: bool) -> bool {
        self.segments.iter().any(|seg| match seg {
            Segment::At(data) => data.qq == user_id || (allow_all && data.is_all()),
            _ => false,
        })
    }

    /// The message id quoted by a reply segment.
    pub fn reply_to(&self) -> Option<&str> {
        self.segments.iter().find_map(|seg| match seg {
            Segment::Reply(data) => Some(data.id.as_str()),
            _ => None,
        })
    }
}

impl Deref for OneBotMessage {
    type Target = [Segment];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl Messageable for OneBotMessage {
    fn plain_text(&self) -> String {
        OneBotMessage::plain_text(self)
    }

    fn summary(&self) -> String {
        OneBotMessage::summary(self)
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Vec<Segment>> for OneBotMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl From<Segment> for OneBotMessage {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

/// Plain text; CQ codes are not interpreted.
impl From<&str> for OneBotMessage {
    fn from(text: &str) -> Self {
        Segment::text(text).into()
    }
}

impl From<String> for OneBotMessage {
    fn from(text: String) -> Self {
        Segment::text(text).into()
    }
}

impl FromIterator<Segment> for OneBotMessage {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OneBotMessage {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_text() {
        let msg = OneBotMessage::new()
            .reply(99)
            .text("Hello, ")
            .at(10001)
            .text("!")
            .image("a.png");

        assert_eq!(msg.len(), 5);
        assert_eq!(msg.plain_text(), "Hello, !");
        assert_eq!(msg.summary(), "[reply#99]Hello, @10001![image]");
        assert_eq!(msg.reply_to(), Some("99"));
    }

    #[test]
    fn test_serializes_as_array() {
        let msg = OneBotMessage::new().text("hi").at(1);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!([
                {"type": "text", "data": {"text": "hi"}},
                {"type": "at", "data": {"qq": "1"}}
            ])
        );
    }

    #[test]
    fn test_deserializes_both_formats() {
        let from_array: OneBotMessage = serde_json::from_value(json!([
            {"type": "text", "data": {"text": "hi "}},
            {"type": "at", "data": {"qq": "10001"}}
        ]))
        .unwrap();
        let from_string: OneBotMessage =
            serde_json::from_value(json!("hi [CQ:at,qq=10001]")).unwrap();

        assert_eq!(from_array, from_string);
        assert_eq!(from_string.to_cq_string(), "hi [CQ:at,qq=10001]");
    }

    #[test]
    fn test_mentions() {
        let msg = OneBotMessage::new().at(10001).at_all().at(10002);

        assert_eq!(msg.mentioned_users(), vec!["10001", "10002"]);
        assert!(msg.mentioned("10001", false));
        assert!(!msg.mentioned("10003", false));
        assert!(msg.mentioned("10003", true));

        let plain = OneBotMessage::from("no mentions");
        assert!(!plain.mentioned("10001", true));
        assert!(plain.reply_to().is_none());
    }

    #[test]
    fn test_messageable_view() {
        let msg = OneBotMessage::from_cq_string("look [CQ:face,id=14]");
        let view: &dyn Messageable = &msg;

        assert_eq!(view.plain_text(), "look ");
        assert_eq!(view.summary(), "look [face#14]");
    }
}
