//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wabot/config.json`) and environment.
//! Environment always wins, so a container deployment can run with no file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_CONFIG_PATH: &str = "WABOT_CONFIG_PATH";
pub const ENV_BIND: &str = "WABOT_BIND";
pub const ENV_PORT: &str = "PORT";
pub const ENV_VERIFY_TOKEN: &str = "WHATSAPP_VERIFY_TOKEN";
pub const ENV_AUTH_TOKEN: &str = "WHATSAPP_AUTH_TOKEN";
pub const ENV_PHONE_ID: &str = "WHATSAPP_PHONE_ID";
pub const ENV_APP_SECRET: &str = "WHATSAPP_APP_SECRET";
pub const ENV_APP_ID: &str = "WHATSAPP_APP_ID";
pub const ENV_API_BASE: &str = "WHATSAPP_API_BASE";

const DEFAULT_API_BASE: &str = "https://graph.facebook.com";
const DEFAULT_API_VERSION: &str = "v19.0";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Cloud API credentials and options.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Gateway bind, port, and health check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8080). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"). Overridden by WABOT_BIND env.
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Message returned by `GET /`.
    #[serde(default = "default_health_message")]
    pub health_message: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_health_message() -> String {
    "WhatsApp bot running".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            health_message: default_health_message(),
        }
    }
}

/// WhatsApp channel config. Every secret can be overridden by its WHATSAPP_* env var.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Token Meta echoes during the `hub.verify_token` handshake.
    pub verify_token: Option<String>,
    /// System-user or temporary access token for the Graph API.
    pub auth_token: Option<String>,
    /// Phone number id of the business number that sends replies.
    pub phone_id: Option<String>,
    /// App secret; signs webhook bodies (X-Hub-Signature-256).
    pub app_secret: Option<String>,
    pub app_id: Option<String>,
    /// Graph API base URL (default https://graph.facebook.com). Useful for tests and proxies.
    pub api_base_url: Option<String>,
    /// Graph API version segment (default v19.0).
    pub api_version: Option<String>,
    /// Reject webhook POSTs whose X-Hub-Signature-256 does not match the app secret. Default: false.
    #[serde(default)]
    pub verify_signature: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// WhatsApp settings after applying env overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhatsAppSettings {
    pub verify_token: Option<String>,
    pub auth_token: Option<String>,
    pub phone_id: Option<String>,
    pub app_secret: Option<String>,
    pub app_id: Option<String>,
    pub api_base_url: String,
    pub api_version: String,
    pub verify_signature: bool,
}

/// Credentials needed to send replies through the Graph API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub auth_token: String,
    pub phone_id: String,
    pub api_base_url: String,
    pub api_version: String,
}

impl WhatsAppSettings {
    /// Send-capable credentials, or every critical variable that is absent.
    /// The verify token is required too: without it the webhook can never be subscribed.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let mut missing = Vec::new();
        if self.verify_token.is_none() {
            missing.push(ENV_VERIFY_TOKEN);
        }
        if self.auth_token.is_none() {
            missing.push(ENV_AUTH_TOKEN);
        }
        if self.phone_id.is_none() {
            missing.push(ENV_PHONE_ID);
        }
        match (&self.auth_token, &self.phone_id) {
            (Some(auth_token), Some(phone_id)) if missing.is_empty() => Ok(Credentials {
                auth_token: auth_token.clone(),
                phone_id: phone_id.clone(),
                api_base_url: self.api_base_url.clone(),
                api_version: self.api_version.clone(),
            }),
            _ => Err(ConfigError::Missing(missing)),
        }
    }

    /// App secret to check signatures with; None when checking is off or no secret is set.
    pub fn signature_secret(&self) -> Option<&str> {
        if self.verify_signature {
            self.app_secret.as_deref()
        } else {
            None
        }
    }
}

/// Trimmed, non-empty env value.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve one WhatsApp setting: env overrides config.
fn resolve(name: &str, configured: Option<&String>) -> Option<String> {
    env_value(name).or_else(|| non_empty(configured))
}

/// Resolve all WhatsApp settings (env over file, defaults for API base and version).
pub fn resolve_whatsapp(config: &Config) -> WhatsAppSettings {
    let wa = &config.whatsapp;
    WhatsAppSettings {
        verify_token: resolve(ENV_VERIFY_TOKEN, wa.verify_token.as_ref()),
        auth_token: resolve(ENV_AUTH_TOKEN, wa.auth_token.as_ref()),
        phone_id: resolve(ENV_PHONE_ID, wa.phone_id.as_ref()),
        app_secret: resolve(ENV_APP_SECRET, wa.app_secret.as_ref()),
        app_id: resolve(ENV_APP_ID, wa.app_id.as_ref()),
        api_base_url: resolve(ENV_API_BASE, wa.api_base_url.as_ref())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        api_version: non_empty(wa.api_version.as_ref())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        verify_signature: wa.verify_signature,
    }
}

/// Apply PORT and WABOT_BIND env overrides to the gateway section.
pub fn apply_gateway_env(config: &mut Config) -> Result<()> {
    if let Some(port) = env_value(ENV_PORT) {
        config.gateway.port = port
            .parse()
            .with_context(|| format!("parsing {}={}", ENV_PORT, port))?;
    }
    if let Some(bind) = env_value(ENV_BIND) {
        config.gateway.bind = bind;
    }
    Ok(())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".wabot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, WABOT_CONFIG_PATH, or the default. Missing file => default config.
/// Gateway env overrides (PORT, WABOT_BIND) are applied before returning.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_gateway_env(&mut config)?;
    Ok((config, path))
}
