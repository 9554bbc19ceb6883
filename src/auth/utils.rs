//! Small helpers shared by session and handshake code.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Create 32 random bytes encoded for use in URLs and cookies.
fn random_token(what: &'static str) -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .with_context(|| format!("failed to generate {what}"))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Create a new session id for the session cookie.
/// The raw value is only returned to set the cookie; the store keys on a hash.
pub(crate) fn generate_session_id() -> Result<String> {
    random_token("session id")
}

/// Create the single-use CSRF nonce sent as the SSO `state` parameter.
pub(crate) fn generate_csrf_nonce() -> Result<String> {
    random_token("csrf nonce")
}

/// Hash a session id so raw values never sit in the store.
pub(crate) fn hash_session_id(id: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.finalize().to_vec()
}

/// Equality check whose running time depends only on the input lengths.
pub(crate) fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
