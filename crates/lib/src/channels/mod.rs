//! Communication channels (WhatsApp Cloud API).
//!
//! Inbound webhook payloads are decoded into [`InboundEvent`]s; replies go out
//! through a [`ReplySink`], which the WhatsApp client implements.

mod inbound;
mod outbound;
mod whatsapp;

pub use inbound::InboundEvent;
pub use outbound::{OutboundReply, ReplyButton, ReplySink};
pub use whatsapp::{extract_events, message_body, WebhookPayload, WhatsAppClient, WhatsAppError};
