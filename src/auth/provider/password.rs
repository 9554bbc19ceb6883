//! Password form provider backed by configured `user:password` pairs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use tracing::debug;

use super::{KnownAccount, LoginIdentity, Provider, PASSWORD_VERSION};
use crate::auth::error::{AuthError, AuthResult, ProtocolError};
use crate::auth::request::RequestContext;
use crate::auth::site::SiteUrls;
use crate::auth::utils::constant_time_eq;

pub const LOGIN_PATH: &str = "/login";

#[derive(Clone, Default)]
pub struct PasswordAccounts {
    accounts: BTreeMap<String, SecretString>,
}

impl PasswordAccounts {
    /// Parse `user:pass,user2:pass2`. Blank input yields no accounts.
    ///
    /// # Errors
    /// Returns a configuration error for pairs without a user or a password.
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let mut accounts = BTreeMap::new();
        for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let Some((user, pass)) = pair.split_once(':') else {
                return Err(AuthError::Configuration(format!(
                    "invalid account entry, expected user:password (entry {})",
                    accounts.len() + 1
                )));
            };
            let user = user.trim();
            if user.is_empty() || pass.is_empty() {
                return Err(AuthError::Configuration(
                    "account entries need both a user and a password".to_string(),
                ));
            }
            accounts.insert(user.to_string(), SecretString::from(pass.to_string()));
        }
        Ok(Self { accounts })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn check(&self, username: &str, password: &str) -> bool {
        self.accounts.get(username).is_some_and(|expected| {
            constant_time_eq(expected.expose_secret().as_bytes(), password.as_bytes())
        })
    }

    pub fn usernames(&self) -> impl Iterator<Item = &String> {
        self.accounts.keys()
    }
}

impl std::fmt::Debug for PasswordAccounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordAccounts")
            .field("users", &self.accounts.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct PasswordProvider {
    accounts: PasswordAccounts,
    site: SiteUrls,
}

impl PasswordProvider {
    #[must_use]
    pub fn new(accounts: PasswordAccounts, site: SiteUrls) -> Self {
        Self { accounts, site }
    }
}

#[async_trait]
impl Provider for PasswordProvider {
    fn version(&self) -> &str {
        PASSWORD_VERSION
    }

    fn is_configured(&self) -> bool {
        !self.accounts.is_empty()
    }

    async fn authenticate(&self, ctx: &RequestContext) -> AuthResult<Option<LoginIdentity>> {
        let username = ctx.form_field("username").map(str::trim).unwrap_or_default();
        let password = ctx.form_field("password").unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Ok(None);
        }
        if !self.accounts.check(username, password) {
            debug!(username = %username, "password login rejected");
            return Err(ProtocolError::InvalidCredentials.into());
        }
        Ok(Some(LoginIdentity::new(username)))
    }

    fn login_redirect(&self, ctx: &RequestContext) -> String {
        self.site.build_login_redirect(LOGIN_PATH, ctx)
    }

    async fn list_known_accounts(&self) -> AuthResult<Vec<KnownAccount>> {
        Ok(self
            .accounts
            .usernames()
            .map(|username| KnownAccount {
                username: username.clone(),
                email: None,
            })
            .collect())
    }
}
