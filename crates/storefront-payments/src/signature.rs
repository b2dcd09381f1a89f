//! # Webhook Signatures
//!
//! Verifies that a webhook payload was sent by the payment provider.
//!
//! ## Header Format
//! ```text
//! Stripe-Signature: t=1760600000,v1=5257a869e7ec...,v1=0f3c...
//!                    │            │
//!                    │            └── hex HMAC-SHA256(secret, "{t}.{payload}")
//!                    │                (several v1 entries during secret rotation)
//!                    └── unix seconds when the provider signed the payload
//! ```
//!
//! Verification happens before the payload is parsed. A stale timestamp is
//! rejected even when the MAC matches.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::error::{PaymentError, PaymentResult};

type HmacSha256 = Hmac<Sha256>;

/// Default accepted clock skew between the provider and this server.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Checks webhook signatures against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verifies `header` for `payload` against the current time.
    pub fn verify(&self, payload: &[u8], header: &str) -> PaymentResult<()> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verifies `header` for `payload` as of `now` (unix seconds).
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> PaymentResult<()> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let part = part.trim();
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(v) = part.strip_prefix("v1=") {
                signatures.push(v);
            }
        }

        let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(invalid("missing v1 signature"));
        }

        let mac = self.mac_for(timestamp, payload)?;
        let matched = signatures.iter().any(|sig| match hex::decode(sig) {
            Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
            Err(_) => false,
        });
        if !matched {
            return Err(invalid("signature mismatch"));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| invalid("timestamp is not a number"))?;
        let age = now.saturating_sub(ts).unsigned_abs();
        if age > self.tolerance.as_secs() {
            return Err(invalid("timestamp outside tolerance"));
        }

        Ok(())
    }

    fn mac_for(&self, timestamp: &str, payload: &[u8]) -> PaymentResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| PaymentError::InvalidConfig(format!("webhook secret: {}", e)))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

/// Produces a signature header for `payload`, as the provider would.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn invalid(reason: &str) -> PaymentError {
    PaymentError::InvalidSignature(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_760_600_000;

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign(payload, SECRET, NOW);

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify_at(payload, &header, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = sign(b"original", SECRET, NOW);
        let verifier = WebhookVerifier::new(SECRET);

        let result = verifier.verify_at(b"tampered", &header, NOW);
        assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = sign(b"payload", "whsec_other", NOW);
        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify_at(b"payload", &header, NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = sign(b"payload", SECRET, NOW);
        let verifier = WebhookVerifier::new(SECRET);

        assert!(verifier.verify_at(b"payload", &header, NOW + 300).is_ok());
        assert!(verifier.verify_at(b"payload", &header, NOW + 301).is_err());

        let relaxed = WebhookVerifier::new(SECRET).with_tolerance(Duration::from_secs(3600));
        assert!(relaxed.verify_at(b"payload", &header, NOW + 301).is_ok());
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let good = sign(b"payload", SECRET, NOW);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify_at(b"payload", &header, NOW).is_ok());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        for header in ["", "garbage", "t=123", "v1=abcd", "t=abc,v1=zz"] {
            assert!(
                matches!(
                    verifier.verify_at(b"payload", header, NOW),
                    Err(PaymentError::InvalidSignature(_))
                ),
                "header {:?} should be rejected",
                header
            );
        }
    }
}
