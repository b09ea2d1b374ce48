//! Outbound replies and the sink that delivers them.

use async_trait::async_trait;

/// One reply button: `title` is shown to the user, `callback_data` comes back in the button callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub title: String,
    pub callback_data: String,
}

impl ReplyButton {
    pub fn new(title: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// A reply to send to a single recipient. Empty `buttons` means a plain text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub recipient_id: String,
    pub text: String,
    pub buttons: Vec<ReplyButton>,
}

impl OutboundReply {
    pub fn text(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<ReplyButton>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Something that can deliver replies (the WhatsApp client, or a recorder in tests).
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Channel id (e.g. "whatsapp"), used in logs.
    fn id(&self) -> &str;
    /// Send one reply. The error is a display string; callers only log it.
    async fn send_reply(&self, reply: &OutboundReply) -> Result<(), String>;
}
