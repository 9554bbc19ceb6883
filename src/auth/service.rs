//! Facade consumed by the web layer.
//!
//! Owns the registry, the handshake, the validator and the logout coordinator,
//! and applies their [`Transition`]s against the [`SessionStore`]. Every
//! collaborator is injected at construction time.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::config::AuthConfig;
use super::cookies::{clear_identity_cookies, CookieDirective, SESSION_COOKIE};
use super::directory::DirectoryClient;
use super::error::{AuthError, AuthResult, Disposition, ProtocolError};
use super::hooks::{spawn_login_hook, LogLoginHook, LoginEvent, LoginHook};
use super::issuer::SessionIssuer;
use super::logout::LogoutCoordinator;
use super::provider::open::OpenProvider;
use super::provider::password::PasswordProvider;
use super::provider::sso::SsoProvider;
use super::provider::{KnownAccount, Provider, SSO_VERSION};
use super::registry::ProviderRegistry;
use super::request::RequestContext;
use super::session::{IdentitySession, SessionStore, SessionStoreError};
use super::site::SiteUrls;
use super::sso::client::SsoClient;
use super::sso::handshake::{CallbackOutcome, SsoHandshake};
use super::token::VerificationTokenCodec;
use super::transition::{SessionMutation, Transition};
use super::utils::generate_session_id;
use super::validator::{SessionValidator, UnauthenticatedReason, Validation};

/// Result of an operation plus the cookies the response must carry.
#[derive(Debug)]
pub struct Applied<T> {
    pub outcome: T,
    pub cookies: Vec<CookieDirective>,
}

/// What the error view needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorPageContext {
    pub message: String,
    pub login_url: String,
    /// Present when an upstream SSO session may still be open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResponse {
    Redirect(String),
    /// The disposition lets the web layer tell denials from transient failures.
    ErrorPage {
        disposition: Disposition,
        page: ErrorPageContext,
    },
}

pub struct AuthService {
    registry: ProviderRegistry,
    validator: SessionValidator,
    handshake: Option<SsoHandshake>,
    logout: LogoutCoordinator,
    issuer: SessionIssuer,
    store: Arc<dyn SessionStore>,
    site: SiteUrls,
    hook: Arc<dyn LoginHook>,
}

impl AuthService {
    /// Wire providers from configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the SSO HTTP client cannot be built.
    pub fn new(
        config: &AuthConfig,
        directory: Arc<dyn DirectoryClient>,
        store: Arc<dyn SessionStore>,
    ) -> AuthResult<Self> {
        let site = config.site().clone();
        let codec = VerificationTokenCodec::new(config.token_salt().clone());
        let issuer = SessionIssuer::new(codec.clone()).with_lifetime_seconds(config.session_ttl_seconds());

        let mut registry = ProviderRegistry::new(config.default_version())
            .with_fallback_version(config.fallback_version())
            .register(Arc::new(OpenProvider::new(site.clone())));
        if !config.password_accounts().is_empty() {
            registry = registry.register(Arc::new(PasswordProvider::new(
                config.password_accounts().clone(),
                site.clone(),
            )));
        }

        let mut handshake = None;
        let mut logout = LogoutCoordinator::default();
        if let Some(sso) = config.sso() {
            if sso.is_partially_configured() {
                warn!("sso is partially configured; client id, auth, token and userinfo urls are all required");
            }
            registry = registry.register(Arc::new(SsoProvider::new(
                sso.clone(),
                directory.clone(),
                site.clone(),
            )));
            if sso.is_configured() {
                logout = LogoutCoordinator::new(
                    Some(sso.logout_url().to_string()),
                    sso.post_logout_redirect_uri(),
                );
                handshake = Some(SsoHandshake::new(
                    SsoClient::new(sso.clone())?,
                    directory.clone(),
                    issuer.clone(),
                    site.clone(),
                ));
            }
        }
        info!(providers = ?registry.versions(), default = %registry.default_version(), "auth providers registered");

        Ok(Self {
            registry,
            validator: SessionValidator::new(directory, codec),
            handshake,
            logout,
            issuer,
            store,
            site,
            hook: Arc::new(LogLoginHook),
        })
    }

    #[must_use]
    pub fn with_login_hook(mut self, hook: Arc<dyn LoginHook>) -> Self {
        self.hook = hook;
        self
    }

    #[must_use]
    pub fn site(&self) -> &SiteUrls {
        &self.site
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// `Secure` cookies only when the site for this request is HTTPS.
    #[must_use]
    pub fn cookies_secure(&self, ctx: &RequestContext) -> bool {
        self.site.is_secure(ctx.scheme())
    }

    /// Store failures are logged and read as "no session".
    pub async fn load_session(&self, id: Option<&str>) -> IdentitySession {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return IdentitySession::default();
        };
        match self.store.load(id).await {
            Ok(session) => session.unwrap_or_default(),
            Err(err) => {
                error!(error = %err, "failed to load session");
                IdentitySession::default()
            }
        }
    }

    fn session_cookie(&self, id: String) -> CookieDirective {
        CookieDirective::Set {
            name: SESSION_COOKIE,
            value: id,
            max_age: self.issuer.lifetime_seconds(),
        }
    }

    async fn apply<T>(&self, ctx: &RequestContext, transition: Transition<T>) -> AuthResult<Applied<T>> {
        let Transition {
            mutation,
            mut cookies,
            outcome,
        } = transition;
        match mutation {
            SessionMutation::Unchanged => {}
            SessionMutation::Replace(session) => match ctx.session_id() {
                Some(id) => self.store.save(id, &session).await?,
                None => {
                    let id = new_session_id()?;
                    self.store.save(&id, &session).await?;
                    cookies.push(self.session_cookie(id));
                }
            },
            SessionMutation::Establish(session) => {
                if let Some(old) = ctx.session_id() {
                    self.store.remove(old).await?;
                }
                let id = new_session_id()?;
                self.store.save(&id, &session).await?;
                cookies.push(self.session_cookie(id));
            }
            SessionMutation::Clear => {
                if let Some(id) = ctx.session_id() {
                    self.store.remove(id).await?;
                }
                cookies.push(CookieDirective::Remove {
                    name: SESSION_COOKIE,
                });
            }
        }
        Ok(Applied { outcome, cookies })
    }

    /// Validate the request's session; forced logouts are applied before returning.
    pub async fn is_authenticated(&self, ctx: &RequestContext) -> Applied<Validation> {
        let transition = self.validator.validate(ctx, Utc::now().timestamp()).await;
        match self.apply(ctx, transition).await {
            Ok(applied) => applied,
            Err(err) => {
                error!(error = %err, "failed to apply session validation");
                let mut cookies = clear_identity_cookies();
                cookies.push(CookieDirective::Remove {
                    name: SESSION_COOKIE,
                });
                Applied {
                    outcome: Validation::Unauthenticated(UnauthenticatedReason::SessionUnavailable),
                    cookies,
                }
            }
        }
    }

    /// Login URL of the resolved provider.
    ///
    /// # Errors
    /// `Configuration` when no provider resolves.
    pub fn login_redirect(&self, ctx: &RequestContext, requested: Option<&str>) -> AuthResult<String> {
        Ok(self.registry.resolve(requested)?.login_redirect(ctx))
    }

    /// Where to send a user who wants to log in. For SSO this starts the handshake.
    ///
    /// # Errors
    /// `Configuration` when no provider resolves; store errors from persisting the nonce.
    pub async fn begin_login(
        &self,
        ctx: &RequestContext,
        requested: Option<&str>,
    ) -> AuthResult<Applied<String>> {
        let provider = self.registry.resolve(requested)?;
        if provider.version() == SSO_VERSION && self.handshake.is_some() {
            return self.begin_sso(ctx).await;
        }
        Ok(Applied {
            outcome: provider.login_redirect(ctx),
            cookies: Vec::new(),
        })
    }

    /// Explicit SSO entry point.
    ///
    /// # Errors
    /// `Configuration` when SSO is not configured.
    pub async fn begin_sso(&self, ctx: &RequestContext) -> AuthResult<Applied<String>> {
        let handshake = self
            .handshake
            .as_ref()
            .ok_or_else(|| AuthError::Configuration("sso is not configured".to_string()))?;
        let transition = handshake.begin(ctx)?;
        self.apply(ctx, transition).await
    }

    pub async fn handle_sso_callback(&self, ctx: &RequestContext) -> Applied<CallbackResponse> {
        let login_url = self.site.for_request(ctx).to_string();
        let Some(handshake) = self.handshake.as_ref() else {
            let err = AuthError::Configuration("sso is not configured".to_string());
            return Applied {
                outcome: self.error_page(&err, &login_url, None),
                cookies: Vec::new(),
            };
        };

        let transition = handshake.callback(ctx).await;
        let logout_url = format!("{}/logout", self.site.for_request(ctx));
        let transition = transition.map(|outcome| match outcome {
            CallbackOutcome::Established {
                username,
                redirect_to,
            } => {
                spawn_login_hook(self.hook.clone(), LoginEvent::now(&username, SSO_VERSION));
                CallbackResponse::Redirect(redirect_to)
            }
            rejected @ (CallbackOutcome::RejectedUnknownUser { .. }
            | CallbackOutcome::RejectedDisabledUser { .. }) => {
                let err = rejected.into_error();
                match err {
                    Some(err) => self.error_page(&err, &login_url, Some(logout_url.clone())),
                    None => CallbackResponse::Redirect(login_url.clone()),
                }
            }
            CallbackOutcome::Failed(err) => self.error_page(&err, &login_url, None),
        });

        match self.apply(ctx, transition).await {
            Ok(applied) => applied,
            Err(err) => {
                error!(error = %err, "failed to persist sso callback state");
                Applied {
                    outcome: self.error_page(&err, &login_url, None),
                    cookies: Vec::new(),
                }
            }
        }
    }

    fn error_page(&self, err: &AuthError, login_url: &str, logout_url: Option<String>) -> CallbackResponse {
        CallbackResponse::ErrorPage {
            disposition: err.disposition(),
            page: ErrorPageContext {
                message: err.user_message(),
                login_url: login_url.to_string(),
                logout_url,
            },
        }
    }

    /// Ask the resolved provider to authenticate the request and establish a session.
    ///
    /// # Errors
    /// `InvalidCredentials` when the provider finds nothing usable; provider errors otherwise.
    pub async fn login_with_provider(
        &self,
        ctx: &RequestContext,
        requested: Option<&str>,
    ) -> AuthResult<Applied<String>> {
        let provider = self.registry.resolve(requested)?;
        self.establish_with(provider.as_ref(), ctx).await
    }

    async fn establish_with(&self, provider: &dyn Provider, ctx: &RequestContext) -> AuthResult<Applied<String>> {
        let identity = provider
            .authenticate(ctx)
            .await?
            .ok_or(ProtocolError::InvalidCredentials)?;
        let username = identity.username.clone();
        let (session, cookies) = self.issuer.issue(identity, provider.version());
        let return_to = ctx.form_field("c_url").or_else(|| ctx.query_param("c_url"));
        let redirect_to = self.site.sanitize_return_to(return_to, ctx);

        let transition = Transition::establish(session, redirect_to).with_cookies(cookies);
        let applied = self.apply(ctx, transition).await?;
        info!(username = %username, provider = %provider.version(), "session established");
        spawn_login_hook(self.hook.clone(), LoginEvent::now(&username, provider.version()));
        Ok(applied)
    }

    /// Validator first. When only the client token is missing or stale, the
    /// resolved provider gets a chance to authenticate the request. Every other
    /// failure is final, so a directory outage never opens this path.
    pub async fn check_login(&self, ctx: &RequestContext) -> Applied<bool> {
        let validation = self.is_authenticated(ctx).await;
        let retry = matches!(
            validation.outcome,
            Validation::Unauthenticated(
                UnauthenticatedReason::MissingToken | UnauthenticatedReason::TokenMismatch
            )
        );
        if validation.outcome.is_authenticated() || !retry {
            return Applied {
                outcome: validation.outcome.is_authenticated(),
                cookies: validation.cookies,
            };
        }
        match self.login_with_provider(ctx, None).await {
            Ok(applied) => Applied {
                outcome: true,
                cookies: applied.cookies,
            },
            Err(err) => {
                if !matches!(err, AuthError::Protocol(ProtocolError::InvalidCredentials)) {
                    warn!(error = %err, "provider authentication failed");
                }
                Applied {
                    outcome: false,
                    cookies: validation.cookies,
                }
            }
        }
    }

    /// Clear the session and return where the browser should go next.
    pub async fn logout(&self, ctx: &RequestContext) -> Applied<String> {
        let home = RequestContext::new("/").with_scheme(ctx.scheme());
        let login_url = self
            .registry
            .resolve(None)
            .map_or_else(|_| self.site.for_request(ctx).to_string(), |p| p.login_redirect(&home));
        let transition = self.logout.logout(ctx.session(), &login_url);
        let destination = transition.outcome.clone();
        let mut fallback_cookies = transition.cookies.clone();
        match self.apply(ctx, transition).await {
            Ok(applied) => applied,
            Err(err) => {
                error!(error = %err, "failed to clear session on logout");
                fallback_cookies.push(CookieDirective::Remove {
                    name: SESSION_COOKIE,
                });
                Applied {
                    outcome: destination,
                    cookies: fallback_cookies,
                }
            }
        }
    }

    /// # Errors
    /// `Configuration` when no provider resolves; directory failures for SSO.
    pub async fn list_known_accounts(&self, requested: Option<&str>) -> AuthResult<Vec<KnownAccount>> {
        self.registry.resolve(requested)?.list_known_accounts().await
    }
}

fn new_session_id() -> AuthResult<String> {
    generate_session_id().map_err(|err| AuthError::from(SessionStoreError::Backend(format!("{err:#}"))))
}
