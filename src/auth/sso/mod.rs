//! Federated single sign-on (authorization-code flow).

pub mod client;
pub mod handshake;

use secrecy::SecretString;

pub const DEFAULT_SCOPES: &str = "openid profile email";

#[derive(Debug, Clone)]
pub struct SsoConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    post_logout_redirect_uri: Option<String>,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    logout_url: String,
    scopes: String,
}

impl SsoConfig {
    #[must_use]
    pub fn new(client_id: &str, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.trim().to_string(),
            client_secret,
            redirect_uri: String::new(),
            post_logout_redirect_uri: None,
            auth_url: String::new(),
            token_url: String::new(),
            userinfo_url: String::new(),
            logout_url: String::new(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, uri: &str) -> Self {
        self.redirect_uri = uri.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_post_logout_redirect_uri(mut self, uri: Option<String>) -> Self {
        self.post_logout_redirect_uri = uri.filter(|uri| !uri.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: &str) -> Self {
        self.auth_url = url.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: &str) -> Self {
        self.token_url = url.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: &str) -> Self {
        self.userinfo_url = url.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_logout_url(mut self, url: &str) -> Self {
        self.logout_url = url.trim().to_string();
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: &str) -> Self {
        if !scopes.trim().is_empty() {
            self.scopes = scopes.trim().to_string();
        }
        self
    }

    /// SSO is usable only when all required settings are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.auth_url.is_empty()
            && !self.token_url.is_empty()
            && !self.userinfo_url.is_empty()
    }

    /// Any SSO setting present at all; used to warn about partial configuration.
    #[must_use]
    pub fn is_partially_configured(&self) -> bool {
        !self.is_configured()
            && (!self.client_id.is_empty()
                || !self.auth_url.is_empty()
                || !self.token_url.is_empty()
                || !self.userinfo_url.is_empty())
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Falls back to the redirect URI.
    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> &str {
        self.post_logout_redirect_uri
            .as_deref()
            .unwrap_or(&self.redirect_uri)
    }

    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }

    #[must_use]
    pub fn logout_url(&self) -> &str {
        &self.logout_url
    }

    #[must_use]
    pub fn scopes(&self) -> &str {
        &self.scopes
    }
}
