//! Opaque payload bytes carried by packets and timeouts.

use std::borrow::Cow;
use std::fmt::{self, Display};
use std::sync::Arc;

/// An immutable byte payload.
///
/// Payloads are shared rather than copied: cloning a `Message`, or fanning a
/// broadcast out to many destinations, reuses the same allocation. The
/// simulator never inspects the bytes; only node programs interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Message {
    bytes: Arc<[u8]>,
}

impl Message {
    /// Creates a new message with the given body content.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lockstep_core::Message;
    /// let message = Message::new("Body");
    /// assert_eq!(message.len(), 4);
    /// ```
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: body.into().into(),
        }
    }

    /// The number of payload bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the payload into a fresh vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Iterates over the payload bytes.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.bytes.iter().copied()
    }

    /// A lossy text view for programs that treat payloads as UTF-8 commands.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Printable payloads read better in prompts and logs; anything else
        // is shown as hex.
        if self
            .bytes
            .iter()
            .all(|&b| b.is_ascii_graphic() || b == b' ')
        {
            write!(f, "{}", String::from_utf8_lossy(&self.bytes))
        } else {
            for byte in self.bytes.iter() {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_and_length() {
        let message = Message::new("hello");
        assert_eq!(message.len(), 5);
        assert!(!message.is_empty());
        assert_eq!(message.as_slice(), b"hello");
        assert!(Message::default().is_empty());
    }

    #[test]
    fn clones_share_the_allocation() {
        let original = Message::new(vec![1, 2, 3]);
        let copy = original.clone();
        assert_eq!(original, copy);
        assert!(std::ptr::eq(original.as_slice(), copy.as_slice()));
    }

    #[test]
    fn text_view() {
        let message = Message::new("send 2 hi");
        assert_eq!(message.as_text(), "send 2 hi");
    }

    #[test]
    fn display_printable_and_binary() {
        assert_eq!(Message::new("ping").to_string(), "ping");
        assert_eq!(Message::new(vec![0x00, 0xff]).to_string(), "00ff");
    }
}
