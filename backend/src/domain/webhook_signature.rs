//! Webhook signature verification.
//!
//! Deliveries carry an id, a unix timestamp and one or more `v1,<base64>`
//! signatures. Each signature is an HMAC-SHA256 over `{id}.{timestamp}.{body}`
//! keyed with the shared signing secret. The body is the exact request bytes.
//!
//! Every failure surfaces as [`SignatureInvalid`], whose display text is the
//! same for all causes. The concrete [`SignatureFailure`] is only meant for
//! logs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use mockable::Clock;
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Default accepted distance between the delivery timestamp and now.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// Shared signing secret, wiped from memory on drop.
#[derive(Clone)]
pub struct WebhookSigningSecret(Vec<u8>);

impl Drop for WebhookSigningSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// The configured secret could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSigningSecret {
    #[error("webhook signing secret must not be empty")]
    Empty,
    #[error("webhook signing secret is not valid base64")]
    NotBase64,
    #[error("webhook signing secret cannot key HMAC-SHA256")]
    UnusableKey,
}

impl WebhookSigningSecret {
    /// Decode a `whsec_`-prefixed (or bare) base64 secret.
    ///
    /// # Examples
    /// ```
    /// use echo_backend::domain::WebhookSigningSecret;
    ///
    /// assert!(WebhookSigningSecret::from_encoded("whsec_c2VjcmV0").is_ok());
    /// assert!(WebhookSigningSecret::from_encoded("whsec_").is_err());
    /// ```
    pub fn from_encoded(encoded: &str) -> Result<Self, InvalidSigningSecret> {
        let trimmed = encoded.trim();
        let body = trimmed.strip_prefix(SECRET_PREFIX).unwrap_or(trimmed);
        if body.is_empty() {
            return Err(InvalidSigningSecret::Empty);
        }
        let bytes = STANDARD
            .decode(body)
            .map_err(|_| InvalidSigningSecret::NotBase64)?;
        if bytes.is_empty() {
            return Err(InvalidSigningSecret::Empty);
        }
        Ok(Self(bytes))
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Produce a `v1,<base64>` signature entry for the given delivery parts.
    pub fn sign(
        &self,
        id: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<String, InvalidSigningSecret> {
        let tag = signed_content_mac(&self.0, id, timestamp, body)
            .map_err(|_| InvalidSigningSecret::UnusableKey)?
            .finalize();
        Ok(format!(
            "{SIGNATURE_VERSION},{}",
            STANDARD.encode(tag.into_bytes())
        ))
    }
}

impl fmt::Debug for WebhookSigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSigningSecret(<redacted>)")
    }
}

fn signed_content_mac(
    key: &[u8],
    id: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Raw delivery as received by an inbound adapter.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    pub id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signatures: Option<&'a str>,
    pub body: &'a [u8],
}

/// Concrete verification failure, for logs only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureFailure {
    #[error("delivery id header missing")]
    MissingId,
    #[error("timestamp header missing")]
    MissingTimestamp,
    #[error("timestamp header is not a unix timestamp")]
    MalformedTimestamp,
    #[error("timestamp is {skew_secs}s away from now")]
    TimestampOutsideTolerance { skew_secs: u64 },
    #[error("signature header missing")]
    MissingSignature,
    #[error("no signature matched")]
    NoMatchingSignature,
    #[error("signing secret cannot key HMAC-SHA256")]
    UnusableSecret,
}

/// Webhook delivery failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("webhook signature invalid")]
pub struct SignatureInvalid {
    reason: SignatureFailure,
}

impl SignatureInvalid {
    pub fn reason(&self) -> &SignatureFailure {
        &self.reason
    }
}

impl From<SignatureFailure> for SignatureInvalid {
    fn from(reason: SignatureFailure) -> Self {
        Self { reason }
    }
}

/// Verifies deliveries against one signing secret and a skew window.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: WebhookSigningSecret,
    tolerance: Duration,
    clock: Arc<dyn Clock>,
}

impl SignatureVerifier {
    pub fn new(secret: WebhookSigningSecret, tolerance: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            tolerance,
            clock,
        }
    }

    /// Check a delivery's timestamp and signatures.
    ///
    /// Succeeds when the timestamp is within the tolerance (in either
    /// direction) and any `v1` signature matches. Comparisons are constant
    /// time.
    pub fn verify(&self, delivery: &WebhookDelivery<'_>) -> Result<(), SignatureInvalid> {
        let id = present(delivery.id).ok_or(SignatureFailure::MissingId)?;
        let timestamp = present(delivery.timestamp).ok_or(SignatureFailure::MissingTimestamp)?;
        self.check_timestamp(timestamp)?;
        let signatures =
            present(delivery.signatures).ok_or(SignatureFailure::MissingSignature)?;

        let expected = signed_content_mac(&self.secret.0, id, timestamp, delivery.body)
            .map_err(|_| SignatureFailure::UnusableSecret)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, encoded)| STANDARD.decode(encoded).ok())
            .any(|candidate| expected.clone().verify_slice(&candidate).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureFailure::NoMatchingSignature.into())
        }
    }

    fn check_timestamp(&self, raw: &str) -> Result<(), SignatureFailure> {
        let sent_at = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| SignatureFailure::MalformedTimestamp)?;
        let now = self.clock.utc().timestamp();
        let skew_secs = now
            .checked_sub(sent_at)
            .map_or(u64::MAX, i64::unsigned_abs);
        if skew_secs > self.tolerance.as_secs() {
            return Err(SignatureFailure::TimestampOutsideTolerance { skew_secs });
        }
        Ok(())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
