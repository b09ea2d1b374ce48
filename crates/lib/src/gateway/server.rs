//! Gateway HTTP server: health check, webhook verification and event ingestion.

use crate::channels::{extract_events, ReplySink, WebhookPayload, WhatsAppClient};
use crate::config::{self, Config, WhatsAppSettings};
use crate::dispatch;
use crate::gateway::webhook::{self, WebhookError, SIGNATURE_HEADER};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Query of the subscription handshake: `?hub.mode=subscribe&hub.verify_token=..&hub.challenge=..`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Shared state for the gateway. Read-only once serving starts.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// WhatsApp settings after env overrides.
    pub whatsapp: Arc<WhatsAppSettings>,
    /// Reply sender. None when credentials are missing; dispatch then only logs.
    pub sink: Option<Arc<dyn ReplySink>>,
}

impl GatewayState {
    /// Resolve settings and build the WhatsApp client. Missing credentials are logged, not fatal.
    pub fn from_config(config: Config) -> Self {
        let whatsapp = config::resolve_whatsapp(&config);
        let sink: Option<Arc<dyn ReplySink>> = match whatsapp.credentials() {
            Ok(credentials) => {
                log::info!(
                    "whatsapp client configured for phone id {}",
                    credentials.phone_id
                );
                Some(Arc::new(WhatsAppClient::new(credentials)))
            }
            Err(e) => {
                log::error!("{}; replies are disabled", e);
                None
            }
        };
        if whatsapp.verify_signature && whatsapp.app_secret.is_none() {
            log::error!(
                "whatsapp.verifySignature is set but {} is missing; signatures will not be checked",
                config::ENV_APP_SECRET
            );
        }
        Self {
            config: Arc::new(config),
            whatsapp: Arc::new(whatsapp),
            sink,
        }
    }

    /// Replace the reply sender (e.g. with a recorder in tests).
    pub fn with_sink(mut self, sink: Option<Arc<dyn ReplySink>>) -> Self {
        self.sink = sink;
        self
    }
}

/// Routes: `GET /`, `GET|POST /webhook` (also with a trailing slash).
/// Bodies are not size-limited: every webhook POST must reach the handler and be acknowledged.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(verify_webhook).post(webhook_events))
        .route("/webhook/", get(verify_webhook).post(webhook_events))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let state = GatewayState::from_config(config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": state.config.gateway.health_message,
    }))
}

/// GET /webhook: Meta subscription handshake. Echoes hub.challenge as text/plain or 403.
/// A query that does not decode (e.g. a repeated hub.* key) is a failed handshake too.
async fn verify_webhook(
    State(state): State<GatewayState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Response {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => {
            let e = WebhookError::VerificationFailed;
            log::warn!("{} ({})", e, rejection.body_text());
            return (StatusCode::FORBIDDEN, e.to_string()).into_response();
        }
    };
    match webhook::verify_subscription(
        q.mode.as_deref(),
        q.verify_token.as_deref(),
        q.challenge.as_deref(),
        state.whatsapp.verify_token.as_deref(),
    ) {
        Ok(challenge) => {
            log::info!("webhook verified");
            challenge.into_response()
        }
        Err(e) => {
            log::warn!("{} (mode={:?})", e, q.mode);
            (StatusCode::FORBIDDEN, e.to_string()).into_response()
        }
    }
}

fn parse_payload(body: &[u8]) -> Result<WebhookPayload, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}

/// POST /webhook: logs the raw payload, dispatches every event, and always acknowledges.
/// The only non-200 answer is 401 when signature checking is enabled and fails.
async fn webhook_events(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    log::info!("webhook payload: {}", String::from_utf8_lossy(&body));

    if let Some(secret) = state.whatsapp.signature_secret() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if let Err(e) = webhook::verify_signature(&body, signature, secret) {
            log::warn!("{}", e);
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    }

    match parse_payload(&body) {
        Ok(payload) => {
            let events = extract_events(&payload, state.whatsapp.phone_id.as_deref());
            for event in &events {
                dispatch::dispatch(state.sink.as_deref(), event).await;
            }
        }
        Err(e) => log::warn!("{}", e),
    }
    Json(json!({ "status": "success" })).into_response()
}
