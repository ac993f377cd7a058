// service/webhook.rs
//
// Svix-style webhook signature verification for the identity provider.
// The signed content is "{msg_id}.{timestamp}.{payload}" and the signature
// header carries space-separated "v1,<base64>" candidates.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reject timestamps more than five minutes off to limit replay.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

const SECRET_PREFIX: &str = "whsec_";

#[derive(Error, Debug, PartialEq)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    SecretNotConfigured,

    #[error("Webhook secret is malformed")]
    InvalidSecret,

    #[error("Webhook timestamp is invalid or outside tolerance")]
    InvalidTimestamp,

    #[error("Webhook signature does not match")]
    SignatureMismatch,
}

pub fn verify_signature(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    payload: &[u8],
    signature_header: &str,
    now_unix: i64,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::SecretNotConfigured);
    }

    let key = STANDARD
        .decode(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
        .map_err(|_| WebhookError::InvalidSecret)?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidTimestamp)?;
    if (now_unix - ts).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }

    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = STANDARD.encode(mac.finalize().into_bytes());

    for candidate in signature_header.split_whitespace() {
        let Some((version, signature)) = candidate.split_once(',') else {
            continue;
        };
        if version != "v1" {
            continue;
        }
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Ok(());
        }
    }

    Err(WebhookError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn sign(msg_id: &str, timestamp: &str, payload: &[u8]) -> String {
        let key = STANDARD
            .decode(SECRET.strip_prefix(SECRET_PREFIX).unwrap())
            .unwrap();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(format!("{}.{}.", msg_id, timestamp).as_bytes());
        mac.update(payload);
        format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_accepted() {
        let body = br#"{"type":"user.created"}"#;
        let header = sign("msg_1", "1700000000", body);
        assert_eq!(
            verify_signature(SECRET, "msg_1", "1700000000", body, &header, 1_700_000_010),
            Ok(())
        );
    }

    #[test]
    fn tampered_payload_rejected() {
        let header = sign("msg_1", "1700000000", br#"{"type":"user.created"}"#);
        assert_eq!(
            verify_signature(
                SECRET,
                "msg_1",
                "1700000000",
                br#"{"type":"user.deleted"}"#,
                &header,
                1_700_000_010
            ),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn stale_timestamp_rejected() {
        let body = br#"{}"#;
        let header = sign("msg_1", "1700000000", body);
        assert_eq!(
            verify_signature(SECRET, "msg_1", "1700000000", body, &header, 1_700_000_000 + 301),
            Err(WebhookError::InvalidTimestamp)
        );
    }

    #[test]
    fn matches_any_v1_candidate() {
        let body = br#"{}"#;
        let good = sign("msg_1", "1700000000", body);
        let header = format!("v1,bm90LXRoZS1zaWduYXR1cmU= {}", good);
        assert_eq!(
            verify_signature(SECRET, "msg_1", "1700000000", body, &header, 1_700_000_000),
            Ok(())
        );
    }

    #[test]
    fn unconfigured_secret_rejected() {
        assert_eq!(
            verify_signature("", "msg_1", "1700000000", b"{}", "v1,abc", 1_700_000_000),
            Err(WebhookError::SecretNotConfigured)
        );
    }
}
