//! WhatsApp channel: decode Cloud API webhook payloads and send replies via the Graph API.

use crate::channels::inbound::InboundEvent;
use crate::channels::outbound::{OutboundReply, ReplySink};
use crate::config::Credentials;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Webhook POST body: `{ "object": "whatsapp_business_account", "entry": [...] }`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

/// Contacts and messages stay raw so one malformed element cannot sink its siblings.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<serde_json::Value>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppMessage {
    #[serde(default)]
    pub from: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
    /// Quick-reply button on a template message.
    #[serde(default)]
    pub button: Option<TemplateButton>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct Interactive {
    #[serde(default)]
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Deserialize)]
pub struct ButtonReply {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplateButton {
    #[serde(default)]
    pub payload: Option<String>,
}

/// Turn one message into an event, or None for types the bot does not handle.
fn message_event(msg: &WhatsAppMessage, sender_name: String) -> Option<InboundEvent> {
    let sender_id = msg.from.clone();
    match msg.message_type.as_str() {
        "text" => msg.text.as_ref().map(|t| InboundEvent::TextMessage {
            sender_id,
            sender_name,
            text: t.body.clone(),
        }),
        "interactive" => msg
            .interactive
            .as_ref()
            .and_then(|i| i.button_reply.as_ref())
            .filter(|b| !b.id.is_empty())
            .map(|b| InboundEvent::ButtonCallback {
                sender_id,
                sender_name,
                button_data: b.id.clone(),
            }),
        "button" => msg
            .button
            .as_ref()
            .and_then(|b| b.payload.clone())
            .filter(|p| !p.is_empty())
            .map(|button_data| InboundEvent::ButtonCallback {
                sender_id,
                sender_name,
                button_data,
            }),
        _ => None,
    }
}

/// Display name per wa_id. Contacts that fail to decode or have no name are left out.
fn contact_names(contacts: &[serde_json::Value]) -> Vec<(String, String)> {
    contacts
        .iter()
        .filter_map(|c| serde_json::from_value::<Contact>(c.clone()).ok())
        .filter_map(|c| {
            let name = c.profile.map(|p| p.name).unwrap_or_default();
            if c.wa_id.is_empty() || name.is_empty() {
                None
            } else {
                Some((c.wa_id, name))
            }
        })
        .collect()
}

/// Extract text messages and button callbacks from a webhook payload, in delivery order.
/// When `phone_id` is given, changes addressed to another business number are skipped.
/// Messages that fail to decode or carry no sender are skipped individually.
pub fn extract_events(payload: &WebhookPayload, phone_id: Option<&str>) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            if change.field != "messages" {
                log::debug!("whatsapp: ignoring webhook field {}", change.field);
                continue;
            }
            let value = &change.value;
            let received = value
                .metadata
                .as_ref()
                .map(|m| m.phone_number_id.as_str())
                .filter(|id| !id.is_empty());
            if let (Some(expected), Some(received)) = (phone_id, received) {
                if received != expected {
                    log::warn!(
                        "whatsapp: phone number id mismatch (expected {}, received {})",
                        expected,
                        received
                    );
                    continue;
                }
            }
            let names = contact_names(&value.contacts);
            for raw in &value.messages {
                let msg: WhatsAppMessage = match serde_json::from_value(raw.clone()) {
                    Ok(m) => m,
                    Err(e) => {
                        log::warn!("whatsapp: skipping undecodable message: {}", e);
                        continue;
                    }
                };
                if msg.from.is_empty() {
                    log::warn!("whatsapp: skipping message without sender");
                    continue;
                }
                let sender_name = names
                    .iter()
                    .find(|(wa_id, _)| *wa_id == msg.from)
                    .map(|(_, name)| name.clone())
                    .unwrap_or_else(|| msg.from.clone());
                match message_event(&msg, sender_name) {
                    Some(event) => events.push(event),
                    None => log::debug!(
                        "whatsapp: skipping {} message from {}",
                        msg.message_type,
                        msg.from
                    ),
                }
            }
        }
    }
    events
}

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("whatsapp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("whatsapp api error: {0} {1}")]
    Api(reqwest::StatusCode, String),
}

/// Graph API request body for a reply: plain text, or an interactive button message.
pub fn message_body(reply: &OutboundReply) -> serde_json::Value {
    if reply.buttons.is_empty() {
        return json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": reply.recipient_id,
            "type": "text",
            "text": { "body": reply.text },
        });
    }
    let buttons: Vec<serde_json::Value> = reply
        .buttons
        .iter()
        .map(|b| json!({ "type": "reply", "reply": { "id": b.callback_data, "title": b.title } }))
        .collect();
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": reply.recipient_id,
        "type": "interactive",
        "interactive": {
            "type": "button",
            "body": { "text": reply.text },
            "action": { "buttons": buttons },
        },
    })
}

/// WhatsApp Cloud API client bound to one business phone number.
pub struct WhatsAppClient {
    id: String,
    credentials: Credentials,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            id: "whatsapp".to_string(),
            credentials,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.credentials.api_base_url, self.credentials.api_version, self.credentials.phone_id
        )
    }

    /// POST /{version}/{phone_id}/messages.
    pub async fn send(&self, reply: &OutboundReply) -> Result<(), WhatsAppError> {
        let res = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.credentials.auth_token)
            .json(&message_body(reply))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySink for WhatsAppClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_reply(&self, reply: &OutboundReply) -> Result<(), String> {
        self.send(reply).await.map_err(|e| e.to_string())
    }
}
