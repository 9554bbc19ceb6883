//! Verification token codec.
//!
//! The token binds a username to a session expiry so a mirrored cookie can be
//! checked against the session. It is a salted SHA-256 digest truncated to 32
//! lowercase hex characters; it is not reversible.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use super::utils::constant_time_eq;

const TOKEN_LEN: usize = 32;

#[derive(Clone)]
pub struct VerificationTokenCodec {
    salt: SecretString,
}

impl VerificationTokenCodec {
    #[must_use]
    pub fn new(salt: SecretString) -> Self {
        Self { salt }
    }

    /// Deterministic for the same `(username, expiry)` pair.
    #[must_use]
    pub fn encode(&self, username: &str, expiry: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.expose_secret().as_bytes());
        hasher.update(format!("sso:{username}:{expiry}").as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(TOKEN_LEN);
        for byte in digest.iter().take(TOKEN_LEN / 2) {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    #[must_use]
    pub fn verify(&self, token: &str, username: &str, expiry: i64) -> bool {
        constant_time_eq(
            token.as_bytes(),
            self.encode(username, expiry).as_bytes(),
        )
    }
}

impl std::fmt::Debug for VerificationTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationTokenCodec")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}
