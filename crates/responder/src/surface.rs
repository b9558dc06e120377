//! The UI operations the conversation loop needs from the messaging client.

use {async_trait::async_trait, serde::Serialize};

pub use partdesk_config::OpenStrategy;

use crate::error::Result;

/// An unread entry in the conversation list.
///
/// Only valid during the tick that produced it; the list may re-render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationHandle {
    /// Surface-specific reference to the list entry.
    pub key: u32,
    /// Title shown in the list (may be empty).
    pub title: String,
}

/// Direction of a message, inferred from the open conversation's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// One message read from the open conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub text: String,
    pub direction: Direction,
}

impl MessageRecord {
    pub fn incoming(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direction: Direction::Incoming,
        }
    }

    pub fn outgoing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direction: Direction::Outgoing,
        }
    }
}

/// Index of the last message we sent, if any.
pub fn last_outgoing_index(messages: &[MessageRecord]) -> Option<usize> {
    messages
        .iter()
        .rposition(|m| m.direction == Direction::Outgoing)
}

/// Non-empty message texts strictly after the last outgoing message.
pub fn new_incoming(messages: &[MessageRecord]) -> Vec<String> {
    let start = last_outgoing_index(messages).map_or(0, |i| i + 1);
    messages[start..]
        .iter()
        .map(|m| m.text.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Everything the loop does to the messaging web client.
///
/// Methods report UI state rather than panicking; `Ok(false)` means the
/// element was not found and the caller decides what to do next.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// The conversation list is rendered and interactive.
    async fn chat_list_visible(&self) -> Result<bool>;

    /// A login challenge (QR code) is on screen.
    async fn auth_challenge_visible(&self) -> Result<bool>;

    /// Unread list entries, in list order.
    async fn unread_conversations(&self) -> Result<Vec<ConversationHandle>>;

    /// Perform one open interaction on a list entry.
    async fn open_with(&self, entry: &ConversationHandle, strategy: OpenStrategy) -> Result<()>;

    /// A conversation is open: message nodes or a composer are present.
    async fn conversation_open(&self) -> Result<bool>;

    /// Display title of the open conversation.
    async fn conversation_title(&self) -> Result<Option<String>>;

    /// Up to `limit` messages of the open conversation, oldest first.
    async fn messages(&self, limit: usize) -> Result<Vec<MessageRecord>>;

    /// Focus the message composer, falling back to a coordinate click.
    async fn focus_composer(&self) -> Result<bool>;

    /// Remove any draft from the focused composer.
    async fn clear_composer(&self) -> Result<()>;

    async fn type_text(&self, text: &str) -> Result<()>;

    async fn press_enter(&self) -> Result<()>;

    /// Number of outgoing message bubbles currently rendered.
    async fn outgoing_count(&self) -> Result<usize>;

    async fn click_send_button(&self) -> Result<bool>;

    /// "Mark as unread" through the list entry's context menu.
    async fn mark_unread_via_menu(&self, title: &str) -> Result<bool>;

    /// "Mark as unread" through the keyboard shortcut.
    async fn mark_unread_via_shortcut(&self) -> Result<()>;

    /// Move focus back to the conversation list without opening a row.
    async fn focus_chat_list(&self) -> Result<bool>;

    async fn press_escape(&self) -> Result<()>;

    /// Release the underlying session. Safe to call repeatedly.
    async fn close(&self);
}

/// Creates the live surface when the controller starts.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn ChatSurface>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_skips_own_messages() {
        let messages = vec![
            MessageRecord::incoming("old question"),
            MessageRecord::outgoing("old answer"),
            MessageRecord::incoming("1234567890"),
            MessageRecord::incoming("  "),
            MessageRecord::incoming("and 58101-2SA00"),
        ];
        assert_eq!(last_outgoing_index(&messages), Some(1));
        assert_eq!(new_incoming(&messages), vec!["1234567890", "and 58101-2SA00"]);
    }

    #[test]
    fn nothing_new_after_last_outgoing() {
        let messages = vec![
            MessageRecord::incoming("1234567890"),
            MessageRecord::outgoing("reply"),
        ];
        assert!(new_incoming(&messages).is_empty());
    }

    #[test]
    fn all_incoming_when_never_replied() {
        let messages = vec![MessageRecord::incoming("a"), MessageRecord::incoming("b")];
        assert_eq!(last_outgoing_index(&messages), None);
        assert_eq!(new_incoming(&messages).len(), 2);
    }
}
