//! Auth configuration assembled by the CLI.

use secrecy::SecretString;

use super::issuer::DEFAULT_SESSION_LIFETIME_SECONDS;
use super::provider::password::PasswordAccounts;
use super::provider::{OPEN_VERSION, PASSWORD_VERSION};
use super::site::SiteUrls;
use super::sso::SsoConfig;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    site: SiteUrls,
    default_version: String,
    fallback_version: String,
    password_accounts: PasswordAccounts,
    sso: Option<SsoConfig>,
    token_salt: SecretString,
    session_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(site: SiteUrls, token_salt: SecretString) -> Self {
        Self {
            site,
            default_version: PASSWORD_VERSION.to_string(),
            fallback_version: OPEN_VERSION.to_string(),
            password_accounts: PasswordAccounts::default(),
            sso: None,
            token_salt,
            session_ttl_seconds: DEFAULT_SESSION_LIFETIME_SECONDS,
        }
    }

    #[must_use]
    pub fn with_default_version(mut self, version: &str) -> Self {
        self.default_version = version.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_fallback_version(mut self, version: &str) -> Self {
        self.fallback_version = version.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_password_accounts(mut self, accounts: PasswordAccounts) -> Self {
        self.password_accounts = accounts;
        self
    }

    #[must_use]
    pub fn with_sso(mut self, sso: SsoConfig) -> Self {
        self.sso = Some(sso);
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn site(&self) -> &SiteUrls {
        &self.site
    }

    #[must_use]
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    #[must_use]
    pub fn fallback_version(&self) -> &str {
        &self.fallback_version
    }

    #[must_use]
    pub fn password_accounts(&self) -> &PasswordAccounts {
        &self.password_accounts
    }

    #[must_use]
    pub fn sso(&self) -> Option<&SsoConfig> {
        self.sso.as_ref()
    }

    #[must_use]
    pub fn token_salt(&self) -> &SecretString {
        &self.token_salt
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }
}
