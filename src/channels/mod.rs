pub mod telegram;

use async_trait::async_trait;

/// A reply-keyboard button, possibly requesting a structured payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyButton {
    Text(String),
    RequestContact(String),
    RequestLocation(String),
}

/// An inline action button carrying opaque callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Keyboard to attach to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    #[default]
    None,
    Remove,
    Reply(Vec<Vec<KeyButton>>),
    Inline(Vec<Vec<InlineButton>>),
}

impl Keyboard {
    /// Convenience for plain-text reply keyboards, one label per button.
    pub fn reply_rows(rows: Vec<Vec<String>>) -> Self {
        Self::Reply(
            rows.into_iter()
                .map(|row| row.into_iter().map(KeyButton::Text).collect())
                .collect(),
        )
    }
}

/// Messaging transport seam. The engine and arbitration talk to this trait
/// only; the Telegram implementation lives in [`telegram`], and tests use
/// recording fakes.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a text message with an optional keyboard. Returns the
    /// platform message id when the transport provides one, so the caller
    /// can edit the message later.
    async fn send(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Keyboard,
    ) -> anyhow::Result<Option<String>>;

    /// Replace a previously sent message's text. Editing drops any inline
    /// buttons the message carried, which is exactly what decision
    /// resolution wants.
    async fn edit_text(&self, chat_id: &str, message_id: &str, text: &str) -> anyhow::Result<()>;

    /// Send a map pin with a title and address line.
    async fn send_venue(
        &self,
        chat_id: &str,
        lat: f64,
        lon: f64,
        title: &str,
        address: &str,
    ) -> anyhow::Result<()>;
}
