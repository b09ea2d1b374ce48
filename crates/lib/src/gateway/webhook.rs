//! Webhook authenticity: the GET subscription handshake and the POST body signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header Meta signs webhook bodies with.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook verification failed")]
    VerificationFailed,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
}

/// Check the subscription handshake. Returns the challenge to echo (empty when absent)
/// iff mode is "subscribe" and the token equals the configured verify token.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: Option<&str>,
) -> Result<String, WebhookError> {
    match (mode, token, verify_token) {
        (Some("subscribe"), Some(token), Some(expected)) if constant_time_eq(token, expected) => {
            Ok(challenge.unwrap_or_default().to_string())
        }
        _ => Err(WebhookError::VerificationFailed),
    }
}

/// Verify `X-Hub-Signature-256: sha256=<hex>` against HMAC-SHA256(app_secret, body).
/// The digest comparison is constant time (`Mac::verify_slice`).
pub fn verify_signature(
    body: &[u8],
    signature_header: Option<&str>,
    app_secret: &str,
) -> Result<(), WebhookError> {
    let expected = signature_header
        .and_then(|h| h.strip_prefix("sha256="))
        .ok_or(WebhookError::InvalidSignature)?;
    let expected = hex::decode(expected).map_err(|_| WebhookError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::InvalidSignature)
}

/// Hex HMAC-SHA256 of `body` keyed with `app_secret`.
pub fn sign(body: &[u8], app_secret: &str) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_echoes_challenge() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("X"), Some("ping123"), Some("X")),
            Ok("ping123".to_string())
        );
    }

    #[test]
    fn subscription_without_challenge_echoes_empty() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("X"), None, Some("X")),
            Ok(String::new())
        );
    }

    #[test]
    fn subscription_rejects_wrong_token_mode_or_missing_config() {
        let cases = [
            (Some("subscribe"), Some("Y"), Some("X")),
            (Some("unsubscribe"), Some("X"), Some("X")),
            (None, Some("X"), Some("X")),
            (Some("subscribe"), None, Some("X")),
            (Some("subscribe"), Some(""), None),
        ];
        for (mode, token, expected) in cases {
            assert_eq!(
                verify_subscription(mode, token, Some("c"), expected),
                Err(WebhookError::VerificationFailed)
            );
        }
    }

    #[test]
    fn signature_roundtrip() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = format!("sha256={}", sign(body, "app_secret").unwrap());
        assert_eq!(verify_signature(body, Some(header.as_str()), "app_secret"), Ok(()));
        assert_eq!(
            verify_signature(body, Some(header.to_uppercase().replace("SHA256=", "sha256=").as_str()), "app_secret"),
            Ok(())
        );
    }

    #[test]
    fn signature_rejects_tampering_and_bad_headers() {
        let body = b"test body";
        let header = format!("sha256={}", sign(body, "secret").unwrap());
        assert_eq!(
            verify_signature(b"test body!", Some(header.as_str()), "secret"),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_signature(body, Some(header.as_str()), "other"),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            verify_signature(body, Some("invalid_format"), "secret"),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(verify_signature(body, None, "secret"), Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn signature_rejects_non_hex_and_truncated_digests() {
        let body = b"test body";
        let digest = sign(body, "secret").unwrap();
        let cases = [
            "sha256=zz".to_string(),
            format!("sha256={}", &digest[..digest.len() - 2]),
            format!("sha256={}0", digest),
            "sha256=".to_string(),
        ];
        for header in &cases {
            assert_eq!(
                verify_signature(body, Some(header.as_str()), "secret"),
                Err(WebhookError::InvalidSignature),
                "{}",
                header
            );
        }
    }

    #[test]
    fn constant_time_eq_compares_length_and_bytes() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("", "a"));
    }
}
