//! SSO handshake state machine.
//!
//! `begin` issues a fresh CSRF nonce and the authorization redirect. `callback`
//! consumes the nonce, checks it before any network call, exchanges the code,
//! fetches the claims and maps them to a directory account. Every path returns
//! a [`Transition`]; nothing here touches the session store.

use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::client::SsoClient;
use crate::auth::cookies::clear_identity_cookies;
use crate::auth::directory::{AccountStatus, DirectoryClient};
use crate::auth::error::{AuthError, AuthResult, ProtocolError};
use crate::auth::issuer::SessionIssuer;
use crate::auth::provider::{LoginIdentity, SSO_VERSION};
use crate::auth::request::RequestContext;
use crate::auth::session::{IdentitySession, SsoState};
use crate::auth::site::SiteUrls;
use crate::auth::transition::Transition;
use crate::auth::utils::{constant_time_eq, generate_csrf_nonce};

#[derive(Debug)]
pub enum CallbackOutcome {
    Established {
        username: String,
        redirect_to: String,
    },
    RejectedUnknownUser {
        username: String,
    },
    RejectedDisabledUser {
        username: String,
        status: AccountStatus,
    },
    Failed(AuthError),
}

impl CallbackOutcome {
    /// The equivalent error for rejected and failed outcomes.
    #[must_use]
    pub fn into_error(self) -> Option<AuthError> {
        match self {
            Self::Established { .. } => None,
            Self::RejectedUnknownUser { username } => Some(AuthError::UnknownAccount(username)),
            Self::RejectedDisabledUser { username, status } => Some(AuthError::DisabledAccount {
                username,
                status: status.to_string(),
            }),
            Self::Failed(err) => Some(err),
        }
    }
}

pub struct SsoHandshake {
    client: SsoClient,
    directory: Arc<dyn DirectoryClient>,
    issuer: SessionIssuer,
    site: SiteUrls,
}

impl SsoHandshake {
    #[must_use]
    pub fn new(
        client: SsoClient,
        directory: Arc<dyn DirectoryClient>,
        issuer: SessionIssuer,
        site: SiteUrls,
    ) -> Self {
        Self {
            client,
            directory,
            issuer,
            site,
        }
    }

    #[must_use]
    pub fn client(&self) -> &SsoClient {
        &self.client
    }

    /// Init: persist a new nonce and the return location, emit the authorization URL.
    ///
    /// # Errors
    /// Configuration errors when SSO is not usable or the authorization URL is invalid.
    pub fn begin(&self, ctx: &RequestContext) -> AuthResult<Transition<String>> {
        let config = self.client.config();
        if !config.is_configured() {
            return Err(AuthError::Configuration("sso is not configured".to_string()));
        }
        let mut url = Url::parse(config.auth_url())
            .map_err(|err| AuthError::Configuration(format!("invalid sso auth url: {err}")))?;
        let nonce = generate_csrf_nonce()
            .map_err(|err| AuthError::Configuration(format!("{err:#}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", config.client_id())
            .append_pair("redirect_uri", config.redirect_uri())
            .append_pair("scope", config.scopes())
            .append_pair("state", &nonce);

        let mut session = ctx.session().clone();
        session.csrf_nonce = Some(nonce);
        session.return_to = Some(
            self.site
                .sanitize_return_to(ctx.query_param("c_url"), ctx),
        );
        Ok(Transition::replace(session, url.into()))
    }

    /// AwaitingCallback: run the callback to a terminal outcome.
    pub async fn callback(&self, ctx: &RequestContext) -> Transition<CallbackOutcome> {
        let mut session = ctx.session().clone();
        // Single use: consumed whatever the outcome.
        let stored_nonce = session.csrf_nonce.take();
        let return_to = session.return_to.take();

        let failed = |session: IdentitySession, err: AuthError| {
            warn!(error = %err, "sso callback failed");
            Transition::replace(session, CallbackOutcome::Failed(err))
        };

        if let Some(error) = ctx.query_param("error").filter(|e| !e.is_empty()) {
            let detail = ctx
                .query_param("error_description")
                .map_or_else(|| error.to_string(), |desc| format!("{error}: {desc}"));
            return failed(session, ProtocolError::ProviderError(detail).into());
        }
        let code = ctx.query_param("code").unwrap_or_default();
        if code.is_empty() {
            return failed(session, ProtocolError::MissingCode.into());
        }
        let state_matches = match (ctx.query_param("state"), stored_nonce.as_deref()) {
            (Some(state), Some(nonce)) if !nonce.is_empty() => {
                constant_time_eq(state.as_bytes(), nonce.as_bytes())
            }
            _ => false,
        };
        if !state_matches {
            return failed(session, ProtocolError::StateMismatch.into());
        }

        let tokens = match self.client.exchange_code(code).await {
            Ok(tokens) => tokens,
            Err(err) => return failed(session, err),
        };
        let claims = match self.client.fetch_claims(&tokens.access_token).await {
            Ok(claims) => claims,
            Err(err) => return failed(session, err),
        };
        let Some(username) = claims.canonical_username() else {
            return failed(session, ProtocolError::MissingUsername.into());
        };

        let account = match self.directory.find_account(&username).await {
            Ok(account) => account,
            Err(err) => return failed(session, err.into()),
        };

        let status = match account {
            Some(record) => record.status,
            None => {
                warn!(username = %username, "sso login for unknown account");
                let minimal = minimal_session(&username, tokens.id_token);
                return Transition::replace(minimal, CallbackOutcome::RejectedUnknownUser { username })
                    .with_cookies(clear_identity_cookies());
            }
        };
        if !status.is_active() {
            warn!(username = %username, status = %status, "sso login for disabled account");
            let minimal = minimal_session(&username, tokens.id_token);
            return Transition::replace(
                minimal,
                CallbackOutcome::RejectedDisabledUser { username, status },
            )
            .with_cookies(clear_identity_cookies());
        }

        let identity = LoginIdentity {
            display_name: if claims.name.trim().is_empty() {
                username.clone()
            } else {
                claims.name.trim().to_string()
            },
            email: claims.email.trim().to_lowercase(),
            sso: Some(SsoState {
                external_subject: username.clone(),
                access_token: Some(tokens.access_token),
                id_token: tokens.id_token,
            }),
            ..LoginIdentity::new(&username)
        };
        let (established, cookies) = self.issuer.issue(identity, SSO_VERSION);
        let redirect_to = return_to.unwrap_or_else(|| self.site.for_request(ctx).to_string());
        info!(username = %username, "sso session established");
        Transition::establish(
            established,
            CallbackOutcome::Established {
                username,
                redirect_to,
            },
        )
        .with_cookies(cookies)
    }
}

/// Enough state for a later logout to end the upstream session.
fn minimal_session(username: &str, id_token: Option<String>) -> IdentitySession {
    IdentitySession {
        sso: Some(SsoState {
            external_subject: username.to_string(),
            access_token: None,
            id_token,
        }),
        ..IdentitySession::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::cookies::TOKEN_COOKIE;
    use crate::auth::directory::{DirectoryError, DirectoryPage, DirectoryRecord, StaticDirectory};
    use crate::auth::sso::SsoConfig;
    use crate::auth::token::VerificationTokenCodec;
    use crate::auth::transition::SessionMutation;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Down;

    #[async_trait]
    impl DirectoryClient for Down {
        async fn search(&self, _q: &str, _l: usize) -> Result<DirectoryPage, DirectoryError> {
            Err(DirectoryError::Transport("connection refused".into()))
        }
    }

    fn assert_failed_without_session(transition: &Transition<CallbackOutcome>) {
        assert!(
            matches!(
                transition.outcome,
                CallbackOutcome::Failed(AuthError::UpstreamUnavailable(_))
            ),
            "expected upstream failure, got {:?}",
            transition.outcome
        );
        let SessionMutation::Replace(session) = &transition.mutation else {
            panic!("expected replace, got {:?}", transition.mutation);
        };
        assert!(session.csrf_nonce.is_none());
        assert!(session.username.is_empty());
        assert!(session.verification_token.is_none());
        assert!(transition.cookies.is_empty());
    }

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn handshake(idp: &str, directory: Arc<dyn DirectoryClient>) -> SsoHandshake {
        let config = SsoConfig::new("client-1", SecretString::from("shh".to_string()))
            .with_redirect_uri("http://app.example.com/oidc/callback")
            .with_auth_url(&format!("{idp}/auth"))
            .with_token_url(&format!("{idp}/token"))
            .with_userinfo_url(&format!("{idp}/userinfo"));
        SsoHandshake::new(
            SsoClient::new(config).unwrap(),
            directory,
            SessionIssuer::new(VerificationTokenCodec::new(SecretString::from("salt".to_string()))),
            SiteUrls::new("http://app.example.com"),
        )
    }

    fn with_nonce(nonce: &str) -> IdentitySession {
        IdentitySession {
            csrf_nonce: Some(nonce.to_string()),
            return_to: Some("http://app.example.com/reports".to_string()),
            ..IdentitySession::default()
        }
    }

    fn callback_ctx(session: IdentitySession, code: &str, state: &str) -> RequestContext {
        RequestContext::new("/oidc/callback")
            .with_session(Some("sid".into()), session)
            .with_query_param("code", code)
            .with_query_param("state", state)
    }

    async fn mount_idp(server: &MockServer, email: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at",
                "token_type": "Bearer",
                "id_token": "idt-123"
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "s-1",
                "name": "Bob",
                "email": email
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn begin_builds_authorization_url_and_stores_nonce() {
        let h = handshake("https://idp.example.com", Arc::new(StaticDirectory::default()));
        let ctx = RequestContext::new("/sso/login?c_url=%2Freports")
            .with_query_param("c_url", "/reports");
        let transition = h.begin(&ctx).unwrap();
        let url = Url::parse(&transition.outcome).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/auth");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["redirect_uri"], "http://app.example.com/oidc/callback");
        assert_eq!(pairs["scope"], "openid profile email");

        let SessionMutation::Replace(session) = transition.mutation else {
            panic!("expected replace");
        };
        assert_eq!(session.csrf_nonce.as_deref(), Some(pairs["state"].as_str()));
        assert_eq!(session.return_to.as_deref(), Some("http://app.example.com/reports"));
    }

    #[test]
    fn begin_rejects_unconfigured_sso() {
        let config = SsoConfig::new("", SecretString::from(String::new()));
        let h = SsoHandshake::new(
            SsoClient::new(config).unwrap(),
            Arc::new(StaticDirectory::default()),
            SessionIssuer::new(VerificationTokenCodec::new(SecretString::from("s".to_string()))),
            SiteUrls::new("http://app"),
        );
        assert!(matches!(
            h.begin(&RequestContext::new("/")),
            Err(AuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn state_mismatch_rejects_before_any_network_call() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "at"})))
            .expect(0)
            .mount(&server)
            .await;

        let h = handshake(&server.uri(), Arc::new(StaticDirectory::default()));
        for (session, state) in [
            (with_nonce("expected"), "forged"),
            (with_nonce("expected"), ""),
            (IdentitySession::default(), "anything"),
        ] {
            let transition = h.callback(&callback_ctx(session, "code-1", state)).await;
            assert!(matches!(
                transition.outcome,
                CallbackOutcome::Failed(AuthError::Protocol(ProtocolError::StateMismatch))
            ));
            let SessionMutation::Replace(session) = transition.mutation else {
                panic!("expected replace");
            };
            assert!(session.csrf_nonce.is_none());
        }
    }

    #[tokio::test]
    async fn provider_error_and_missing_code_fail() {
        let h = handshake("http://127.0.0.1:9", Arc::new(StaticDirectory::default()));
        let ctx = RequestContext::new("/oidc/callback")
            .with_session(None, with_nonce("n"))
            .with_query_param("error", "access_denied")
            .with_query_param("state", "n");
        assert!(matches!(
            h.callback(&ctx).await.outcome,
            CallbackOutcome::Failed(AuthError::Protocol(ProtocolError::ProviderError(_)))
        ));

        let ctx = callback_ctx(with_nonce("n"), "", "n");
        assert!(matches!(
            h.callback(&ctx).await.outcome,
            CallbackOutcome::Failed(AuthError::Protocol(ProtocolError::MissingCode))
        ));
    }

    #[tokio::test]
    async fn established_session_uses_canonical_username() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        mount_idp(&server, "Bob@Example.com").await;
        let directory = Arc::new(StaticDirectory::new(vec![DirectoryRecord::new(
            "bob@example.com",
            "bob@example.com",
            AccountStatus::Active,
        )]));
        let h = handshake(&server.uri(), directory);

        let transition = h.callback(&callback_ctx(with_nonce("n-1"), "code-1", "n-1")).await;
        let CallbackOutcome::Established {
            username,
            redirect_to,
        } = &transition.outcome
        else {
            panic!("expected established, got {:?}", transition.outcome);
        };
        assert_eq!(username, "bob@example.com");
        assert_eq!(redirect_to, "http://app.example.com/reports");

        let SessionMutation::Establish(session) = &transition.mutation else {
            panic!("expected establish");
        };
        assert_eq!(session.username, "bob@example.com");
        assert_eq!(session.owner_id, "0");
        assert_eq!(session.role, "user");
        assert_eq!(session.display_name, "Bob");
        assert_eq!(session.id_token(), Some("idt-123"));
        assert!(session.csrf_nonce.is_none());
        let expiry = session.token_expiry.unwrap();
        assert!(h
            .issuer
            .codec()
            .verify(session.verification_token.as_deref().unwrap(), "bob@example.com", expiry));
        assert!(transition.cookies.iter().any(|c| c.name() == TOKEN_COOKIE));
    }

    #[tokio::test]
    async fn unknown_and_disabled_accounts_keep_minimal_state() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        mount_idp(&server, "carol@example.com").await;
        let directory = Arc::new(StaticDirectory::new(vec![DirectoryRecord::new(
            "carol.smith@example.com",
            "carol.smith@example.com",
            AccountStatus::Active,
        )]));
        let h = handshake(&server.uri(), directory);

        let transition = h.callback(&callback_ctx(with_nonce("n"), "c", "n")).await;
        assert!(matches!(
            &transition.outcome,
            CallbackOutcome::RejectedUnknownUser { username } if username == "carol@example.com"
        ));
        let SessionMutation::Replace(session) = &transition.mutation else {
            panic!("expected replace");
        };
        assert!(session.username.is_empty());
        assert_eq!(session.id_token(), Some("idt-123"));

        let directory = Arc::new(StaticDirectory::new(vec![DirectoryRecord::new(
            "carol@example.com",
            "",
            AccountStatus::Locked,
        )]));
        let h = handshake(&server.uri(), directory);
        let transition = h.callback(&callback_ctx(with_nonce("n"), "c", "n")).await;
        assert!(matches!(
            transition.outcome,
            CallbackOutcome::RejectedDisabledUser {
                status: AccountStatus::Locked,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn token_exchange_transport_error_fails_closed() {
        let h = handshake("http://127.0.0.1:9", Arc::new(StaticDirectory::default()));
        let transition = h.callback(&callback_ctx(with_nonce("n-1"), "code-1", "n-1")).await;
        assert_failed_without_session(&transition);
    }

    #[tokio::test]
    async fn directory_outage_during_callback_fails_closed() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        mount_idp(&server, "bob@example.com").await;
        let h = handshake(&server.uri(), Arc::new(Down));

        let transition = h.callback(&callback_ctx(with_nonce("n-1"), "code-1", "n-1")).await;
        assert_failed_without_session(&transition);
    }
}
