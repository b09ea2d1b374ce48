//! Gateway: the HTTP surface Meta calls.
//!
//! `GET /webhook` answers the subscription handshake; `POST /webhook` receives
//! events, dispatches them synchronously, and always acknowledges.

mod server;
mod webhook;

pub use server::{router, run_gateway, GatewayState, VerifyQuery};
pub use webhook::{sign, verify_signature, verify_subscription, WebhookError, SIGNATURE_HEADER};
