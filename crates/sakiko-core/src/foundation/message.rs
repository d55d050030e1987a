//! Cross-protocol view of message content.

/// Text access for message-carrying events.
///
/// Adapters implement this on their message types so that filters and
/// loggers can read text without knowing the platform's segment model.
pub trait Messageable: Send + Sync {
    /// Concatenated text of all text segments.
    fn plain_text(&self) -> String;

    /// Human-readable one-line rendering, with placeholders such as `[image]`
    /// for non-text segments.
    fn summary(&self) -> String {
        self.plain_text()
    }
}

impl Messageable for String {
    fn plain_text(&self) -> String {
        self.clone()
    }
}

impl Messageable for str {
    fn plain_text(&self) -> String {
        self.to_owned()
    }
}
