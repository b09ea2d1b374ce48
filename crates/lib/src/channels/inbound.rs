//! Inbound event from a channel: delivered to the dispatcher for rule matching.

/// An event decoded from a provider webhook, handled once and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A plain text message.
    TextMessage {
        sender_id: String,
        sender_name: String,
        text: String,
    },
    /// The user pressed a reply button; `button_data` is the id we attached to it.
    ButtonCallback {
        sender_id: String,
        sender_name: String,
        button_data: String,
    },
}

impl InboundEvent {
    pub fn sender_id(&self) -> &str {
        match self {
            InboundEvent::TextMessage { sender_id, .. } => sender_id,
            InboundEvent::ButtonCallback { sender_id, .. } => sender_id,
        }
    }

    pub fn sender_name(&self) -> &str {
        match self {
            InboundEvent::TextMessage { sender_name, .. } => sender_name,
            InboundEvent::ButtonCallback { sender_name, .. } => sender_name,
        }
    }

    /// Message text, or the callback data for a button press.
    pub fn body(&self) -> &str {
        match self {
            InboundEvent::TextMessage { text, .. } => text,
            InboundEvent::ButtonCallback { button_data, .. } => button_data,
        }
    }
}
