//! wabot core library: configuration, the WhatsApp channel, rule-based
//! dispatch, and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
