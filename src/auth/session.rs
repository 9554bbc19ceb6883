//! Identity session model and the session store seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::utils::hash_session_id;

pub const DEFAULT_ROLE: &str = "user";

/// Provider-specific state kept for SSO sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoState {
    /// Echo of the authenticated username.
    pub external_subject: String,
    pub access_token: Option<String>,
    pub id_token: Option<String>,
}

/// Server-held state bound to the opaque session id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySession {
    pub username: String,
    pub owner_id: String,
    pub display_name: String,
    pub email: String,
    pub phone: String,
    pub avatar_url: String,
    pub role: String,
    pub multi_tenant: bool,
    /// Version of the provider that established the session.
    pub provider: Option<String>,
    /// Epoch seconds.
    pub token_expiry: Option<i64>,
    pub verification_token: Option<String>,
    pub sso: Option<SsoState>,
    pub csrf_nonce: Option<String>,
    pub return_to: Option<String>,
}

impl IdentitySession {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn is_authenticated_shape(&self) -> bool {
        !self.username.is_empty() && !self.owner_id.is_empty()
    }

    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.sso
            .as_ref()
            .and_then(|sso| sso.id_token.as_deref())
            .filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.token_expiry.map_or(true, |expiry| expiry <= now)
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session backend failure: {0}")]
    Backend(String),
}

/// Backing store for identity sessions.
///
/// Implementations must provide atomic get/set for a single session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<IdentitySession>, SessionStoreError>;
    async fn save(&self, id: &str, session: &IdentitySession) -> Result<(), SessionStoreError>;
    async fn remove(&self, id: &str) -> Result<(), SessionStoreError>;
}

struct Entry {
    session: IdentitySession,
    expires_at: Instant,
}

/// Process-local store; entries are keyed by the SHA-256 of the session id.
pub struct MemorySessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<Vec<u8>, Entry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn live_entries(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<IdentitySession>, SessionStoreError> {
        let key = hash_session_id(id);
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.session.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Expired entries are swept on every write, so ids never sent back still age out.
    async fn save(&self, id: &str, session: &IdentitySession) -> Result<(), SessionStoreError> {
        let now = Instant::now();
        let entry = Entry {
            session: session.clone(),
            expires_at: now + self.ttl,
        };
        let mut entries = self.entries.lock().await;
        entries.retain(|_, existing| existing.expires_at > now);
        entries.insert(hash_session_id(id), entry);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), SessionStoreError> {
        self.entries.lock().await.remove(&hash_session_id(id));
        Ok(())
    }
}
