//! Pluggable authentication methods.
//!
//! A provider can authenticate a request, tell where its login entry lives and
//! list the accounts it knows. Providers are registered by version id in the
//! [`crate::auth::registry::ProviderRegistry`].

pub mod open;
pub mod password;
pub mod sso;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use super::error::AuthResult;
use super::request::RequestContext;
use super::session::{SsoState, DEFAULT_ROLE};

pub const SSO_VERSION: &str = "sso";
pub const PASSWORD_VERSION: &str = "password";
pub const OPEN_VERSION: &str = "open";

/// Tenant used when a provider has no tenant information.
pub const DEFAULT_OWNER_ID: &str = "0";

/// Identity claims produced by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginIdentity {
    pub username: String,
    pub owner_id: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub multi_tenant: bool,
    pub sso: Option<SsoState>,
    /// Keep an existing expiry instead of starting a new lifetime.
    pub token_expiry: Option<i64>,
}

impl LoginIdentity {
    #[must_use]
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            owner_id: DEFAULT_OWNER_ID.to_string(),
            display_name: username.to_string(),
            email: String::new(),
            role: DEFAULT_ROLE.to_string(),
            multi_tenant: false,
            sso: None,
            token_expiry: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct KnownAccount {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn version(&self) -> &str;

    /// Whether every setting the provider needs is present.
    fn is_configured(&self) -> bool {
        true
    }

    /// `Ok(None)` means the request carries nothing this provider can use.
    async fn authenticate(&self, ctx: &RequestContext) -> AuthResult<Option<LoginIdentity>>;

    fn login_redirect(&self, ctx: &RequestContext) -> String;

    async fn list_known_accounts(&self) -> AuthResult<Vec<KnownAccount>>;
}
