//! Event dispatch: an ordered rule table mapping inbound events to canned replies.
//!
//! Rules are checked top to bottom and the first match wins. A matching rule
//! without a template swallows the event (no reply).

use crate::channels::{InboundEvent, OutboundReply, ReplyButton, ReplySink};

/// Callback data of the "Ver Catálogo" button.
pub const CATALOG_BUTTON: &str = "CATALOGO";
/// Callback data of the "Hablar con un asesor" button.
pub const ADVISOR_BUTTON: &str = "ASESOR";

pub const CATALOG_TEXT: &str = "¡Claro! Aquí tienes nuestro catálogo de ropa:";
pub const ADVISOR_TEXT: &str = "Un asesor se pondrá en contacto contigo a la brevedad.";

struct Rule {
    name: &'static str,
    matches: fn(&InboundEvent) -> bool,
    template: Option<fn(&InboundEvent) -> OutboundReply>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "greeting",
        matches: is_text,
        template: Some(greeting),
    },
    Rule {
        name: "catalog",
        matches: is_catalog,
        template: Some(catalog),
    },
    Rule {
        name: "advisor",
        matches: is_advisor,
        template: Some(advisor),
    },
    Rule {
        name: "unknown-button",
        matches: is_any_button,
        template: None,
    },
];

fn is_text(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::TextMessage { .. })
}

fn is_any_button(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::ButtonCallback { .. })
}

fn is_button(event: &InboundEvent, data: &str) -> bool {
    matches!(event, InboundEvent::ButtonCallback { button_data, .. } if button_data == data)
}

fn is_catalog(event: &InboundEvent) -> bool {
    is_button(event, CATALOG_BUTTON)
}

fn is_advisor(event: &InboundEvent) -> bool {
    is_button(event, ADVISOR_BUTTON)
}

fn catalog(event: &InboundEvent) -> OutboundReply {
    OutboundReply::text(event.sender_id(), CATALOG_TEXT)
}

fn advisor(event: &InboundEvent) -> OutboundReply {
    OutboundReply::text(event.sender_id(), ADVISOR_TEXT)
}

/// Greeting that echoes the received text and offers the two menu buttons.
fn greeting(event: &InboundEvent) -> OutboundReply {
    OutboundReply::text(
        event.sender_id(),
        format!(
            "¡Hola {}! Recibí tu mensaje: '{}'. ¿Cómo puedo ayudarte con tu pedido de ropa?",
            event.sender_name(),
            event.body()
        ),
    )
    .with_buttons(menu_buttons())
}

pub fn menu_buttons() -> Vec<ReplyButton> {
    vec![
        ReplyButton::new("Ver Catálogo", CATALOG_BUTTON),
        ReplyButton::new("Hablar con un asesor", ADVISOR_BUTTON),
    ]
}

/// Replies for one event: the first matching rule's template, or none.
pub fn replies_for(event: &InboundEvent) -> Vec<OutboundReply> {
    match RULES.iter().find(|r| (r.matches)(event)) {
        Some(rule) => {
            log::debug!("dispatch: rule {} matched for {}", rule.name, event.sender_id());
            rule.template.map(|t| t(event)).into_iter().collect()
        }
        None => Vec::new(),
    }
}

/// Send every reply for `event` through `sink`. Failures are logged with the sender and never returned.
pub async fn dispatch(sink: Option<&dyn ReplySink>, event: &InboundEvent) {
    let kind = match event {
        InboundEvent::TextMessage { .. } => "message from",
        InboundEvent::ButtonCallback { .. } => "button pressed by",
    };
    log::info!("{} {} ({}): {}", kind, event.sender_name(), event.sender_id(), event.body());
    let replies = replies_for(event);
    if replies.is_empty() {
        return;
    }
    let Some(sink) = sink else {
        log::error!(
            "cannot reply to {} ({}): whatsapp client not configured",
            event.sender_name(),
            event.sender_id()
        );
        return;
    };
    for reply in &replies {
        if let Err(e) = sink.send_reply(reply).await {
            log::warn!(
                "{}: failed to reply to {} ({}): {}",
                sink.id(),
                event.sender_name(),
                event.sender_id(),
                e
            );
        }
    }
}
