//! Inbound message decomposition.

use std::fmt;

/// Separator between a tag and the rest of a line.
pub const TAG_SEPARATOR: &str = ": ";

/// One line received from the server, split into its tag and payload.
///
/// A line is tagged when it has the shape `<tag>: <payload>` and `<tag>` is a
/// non-empty run of characters without whitespace. Any other line is untagged
/// and its payload is the whole line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: Option<String>,
    payload: String,
    raw: String,
}

impl Message {
    /// Parses a line, without its terminator, into a message.
    ///
    /// # Examples
    ///
    /// ```
    /// use urbi_client::Message;
    ///
    /// let tagged = Message::parse("uping: pong");
    /// assert_eq!(tagged.tag(), Some("uping"));
    /// assert_eq!(tagged.payload(), "pong");
    ///
    /// let untagged = Message::parse("a b: c");
    /// assert_eq!(untagged.tag(), None);
    /// assert_eq!(untagged.payload(), "a b: c");
    /// ```
    #[must_use]
    pub fn parse(line: impl Into<String>) -> Self {
        let raw = line.into();
        match split_tag(&raw) {
            Some((tag, payload)) => Self {
                tag: Some(tag.to_owned()),
                payload: payload.to_owned(),
                raw,
            },
            None => Self {
                tag: None,
                payload: raw.clone(),
                raw,
            },
        }
    }

    /// Correlation tag, when the line carried one.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Body of the message after the tag prefix.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The line exactly as received, minus its terminator.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Message {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.raw)
    }
}

fn split_tag(line: &str) -> Option<(&str, &str)> {
    let (prefix, rest) = line.split_once(TAG_SEPARATOR)?;
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        return None;
    }
    Some((prefix, rest))
}
