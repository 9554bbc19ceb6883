//! Logout coordinator.

use tracing::warn;
use url::Url;

use super::cookies::clear_identity_cookies;
use super::session::IdentitySession;
use super::transition::Transition;

#[derive(Debug, Clone, Default)]
pub struct LogoutCoordinator {
    end_session_url: Option<String>,
    post_logout_redirect_uri: String,
}

impl LogoutCoordinator {
    #[must_use]
    pub fn new(end_session_url: Option<String>, post_logout_redirect_uri: &str) -> Self {
        Self {
            end_session_url: end_session_url.filter(|url| !url.trim().is_empty()),
            post_logout_redirect_uri: post_logout_redirect_uri.to_string(),
        }
    }

    /// Upstream end-session URL for sessions holding an `id_token`, the login URL otherwise.
    #[must_use]
    pub fn build_logout_destination(&self, session: &IdentitySession, login_url: &str) -> String {
        let (Some(id_token), Some(end_session)) = (session.id_token(), self.end_session_url.as_deref())
        else {
            return login_url.to_string();
        };
        match Url::parse(end_session) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("id_token_hint", id_token)
                    .append_pair("post_logout_redirect_uri", &self.post_logout_redirect_uri);
                url.into()
            }
            Err(err) => {
                warn!(error = %err, "invalid sso logout url, falling back to login url");
                login_url.to_string()
            }
        }
    }

    /// The destination is computed from the pre-clear session, then the session is cleared.
    #[must_use]
    pub fn logout(&self, session: &IdentitySession, login_url: &str) -> Transition<String> {
        let destination = self.build_logout_destination(session, login_url);
        Transition::clear(destination).with_cookies(clear_identity_cookies())
    }
}
