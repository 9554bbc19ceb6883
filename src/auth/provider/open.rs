//! Legacy open provider: trusts the user cookie only while the server-held
//! session still carries a login for the same user.

use async_trait::async_trait;

use super::password::LOGIN_PATH;
use super::{KnownAccount, LoginIdentity, Provider, OPEN_VERSION};
use crate::auth::cookies::USER_COOKIE;
use crate::auth::error::AuthResult;
use crate::auth::request::RequestContext;
use crate::auth::site::SiteUrls;

pub struct OpenProvider {
    site: SiteUrls,
}

impl OpenProvider {
    #[must_use]
    pub fn new(site: SiteUrls) -> Self {
        Self { site }
    }
}

#[async_trait]
impl Provider for OpenProvider {
    fn version(&self) -> &str {
        OPEN_VERSION
    }

    async fn authenticate(&self, ctx: &RequestContext) -> AuthResult<Option<LoginIdentity>> {
        let session = ctx.session();
        let marker = session.provider.is_some() && !session.username.is_empty();
        match ctx.cookie(USER_COOKIE) {
            Some(user) if marker && user == session.username => Ok(Some(LoginIdentity::new(user))),
            _ => Ok(None),
        }
    }

    fn login_redirect(&self, ctx: &RequestContext) -> String {
        self.site.build_login_redirect(LOGIN_PATH, ctx)
    }

    async fn list_known_accounts(&self) -> AuthResult<Vec<KnownAccount>> {
        Ok(Vec::new())
    }
}
