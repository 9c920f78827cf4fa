//! HMAC-SHA256 webhook signature verification.
//!
//! GitHub signs every delivery with `X-Hub-Signature-256: sha256=<hex>`
//! where the digest is the HMAC-SHA256 of the raw body keyed by the shared
//! webhook secret.

use crate::SecretString;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the `sha256=<hex>` signature of `payload` keyed by `secret`.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts variable-length keys");
    mac.update(payload);
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Check `signature` against the expected signature of `payload`.
///
/// A missing signature never verifies. The comparison runs in constant time
/// with respect to the signature contents.
pub fn verify_signature(payload: &[u8], signature: Option<&str>, secret: &[u8]) -> bool {
    let Some(provided) = signature else {
        return false;
    };

    let expected = compute_signature(secret, payload);
    if provided.len() != expected.len() {
        return false;
    }

    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Interface for webhook authenticity checks
pub trait SignatureVerifier: Send + Sync {
    /// Returns `true` when `signature` authenticates `payload`.
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> bool;
}

/// A [`SignatureVerifier`] backed by the shared webhook secret.
#[derive(Debug, Clone)]
pub struct HmacSignatureVerifier {
    secret: SecretString,
}

impl HmacSignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl SignatureVerifier for HmacSignatureVerifier {
    #[instrument(skip_all, fields(has_signature = signature.is_some()))]
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> bool {
        let valid = verify_signature(payload, signature, self.secret.expose().as_bytes());
        if !valid {
            debug!(payload_len = payload.len(), "Webhook signature rejected");
        }
        valid
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
