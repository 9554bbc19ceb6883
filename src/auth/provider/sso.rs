//! SSO provider facade. The handshake itself lives in [`crate::auth::sso`].

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{KnownAccount, LoginIdentity, Provider, SSO_VERSION};
use crate::auth::cookies::USER_COOKIE;
use crate::auth::directory::DirectoryClient;
use crate::auth::error::AuthResult;
use crate::auth::request::RequestContext;
use crate::auth::site::SiteUrls;
use crate::auth::sso::SsoConfig;

pub const SSO_LOGIN_PATH: &str = "/sso/login";
const KNOWN_ACCOUNTS_LIMIT: usize = 100;

pub struct SsoProvider {
    config: SsoConfig,
    directory: Arc<dyn DirectoryClient>,
    site: SiteUrls,
}

impl SsoProvider {
    #[must_use]
    pub fn new(config: SsoConfig, directory: Arc<dyn DirectoryClient>, site: SiteUrls) -> Self {
        Self {
            config,
            directory,
            site,
        }
    }
}

#[async_trait]
impl Provider for SsoProvider {
    fn version(&self) -> &str {
        SSO_VERSION
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Accept an existing SSO session that is still live and matches the user cookie.
    async fn authenticate(&self, ctx: &RequestContext) -> AuthResult<Option<LoginIdentity>> {
        let session = ctx.session();
        if session.username.is_empty() || ctx.cookie(USER_COOKIE) != Some(session.username.as_str()) {
            return Ok(None);
        }
        let Some(sso) = session.sso.as_ref() else {
            return Ok(None);
        };
        if sso.access_token.as_deref().map_or(true, str::is_empty) {
            return Ok(None);
        }
        if session.is_expired(Utc::now().timestamp()) {
            return Ok(None);
        }
        Ok(Some(LoginIdentity {
            owner_id: session.owner_id.clone(),
            display_name: session.display_name.clone(),
            email: session.email.clone(),
            role: session.role.clone(),
            multi_tenant: session.multi_tenant,
            sso: Some(sso.clone()),
            token_expiry: session.token_expiry,
            ..LoginIdentity::new(&session.username)
        }))
    }

    fn login_redirect(&self, ctx: &RequestContext) -> String {
        self.site.build_login_redirect(SSO_LOGIN_PATH, ctx)
    }

    async fn list_known_accounts(&self) -> AuthResult<Vec<KnownAccount>> {
        let page = self.directory.search("", KNOWN_ACCOUNTS_LIMIT).await?;
        Ok(page
            .records
            .into_iter()
            .filter(|record| record.status.is_active())
            .map(|record| KnownAccount {
                username: record.username,
                email: Some(record.email).filter(|email| !email.is_empty()),
            })
            .collect())
    }
}
