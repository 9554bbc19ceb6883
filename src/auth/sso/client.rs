//! HTTP calls to the identity provider: code exchange and claims fetch.

use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

use super::SsoConfig;
use crate::auth::error::{upstream, AuthError, AuthResult, ProtocolError};
use crate::APP_USER_AGENT;

const IDP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SsoClaims {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub preferred_username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl SsoClaims {
    /// Email, then preferred username, then display name; lowercased.
    #[must_use]
    pub fn canonical_username(&self) -> Option<String> {
        [&self.email, &self.preferred_username, &self.name]
            .into_iter()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_lowercase)
    }
}

fn rejected(status: StatusCode, protocol: ProtocolError) -> AuthError {
    if status.is_server_error() {
        AuthError::UpstreamUnavailable(format!("identity provider responded with {status}"))
    } else {
        protocol.into()
    }
}

#[derive(Debug, Clone)]
pub struct SsoClient {
    client: Client,
    config: SsoConfig,
}

impl SsoClient {
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: SsoConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(IDP_TIMEOUT)
            .build()
            .map_err(|err| AuthError::Configuration(format!("http client: {err}")))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &SsoConfig {
        &self.config
    }

    /// Exchange a single-use authorization code. Never retried.
    ///
    /// # Errors
    /// Transport failures, timeouts and 5xx map to `UpstreamUnavailable`; other
    /// non-success responses and a missing access token are protocol errors.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri()),
            ("client_id", self.config.client_id()),
            ("client_secret", self.config.client_secret().expose_secret()),
        ];
        let request = self.client.post(self.config.token_url()).form(&form);

        let span = info_span!("sso.exchange_code");
        async move {
            let response = request.send().await.map_err(|err| upstream(&err))?;
            let status = response.status();
            if !status.is_success() {
                return Err(rejected(status, ProtocolError::TokenRejected(status.as_u16())));
            }
            let tokens: TokenResponse = response
                .json()
                .await
                .map_err(|_| AuthError::from(ProtocolError::MissingAccessToken))?;
            if tokens.access_token.is_empty() {
                return Err(ProtocolError::MissingAccessToken.into());
            }
            debug!(token_type = %tokens.token_type, has_id_token = tokens.id_token.is_some(), "code exchanged");
            Ok(tokens)
        }
        .instrument(span)
        .await
    }

    /// # Errors
    /// Same mapping as [`Self::exchange_code`]; undecodable bodies are `MalformedClaims`.
    pub async fn fetch_claims(&self, access_token: &str) -> AuthResult<SsoClaims> {
        let request = self
            .client
            .get(self.config.userinfo_url())
            .bearer_auth(access_token);

        let span = info_span!("sso.fetch_claims");
        async move {
            let response = request.send().await.map_err(|err| upstream(&err))?;
            let status = response.status();
            if !status.is_success() {
                return Err(rejected(status, ProtocolError::ClaimsRejected(status.as_u16())));
            }
            response
                .json::<SsoClaims>()
                .await
                .map_err(|_| AuthError::from(ProtocolError::MalformedClaims))
        }
        .instrument(span)
        .await
    }
}
