//! Per-request session validation with real-time directory revalidation.
//!
//! Every request with a plausible session asks the directory for the bound
//! account. There is no cache in front of the lookup, so disabling an account
//! takes effect on the next request. Directory failures fail closed.

use std::sync::Arc;
use tracing::{debug, warn};

use super::cookies::{clear_identity_cookies, TOKEN_COOKIE};
use super::directory::{AccountStatus, DirectoryClient};
use super::request::RequestContext;
use super::token::VerificationTokenCodec;
use super::transition::Transition;
use super::utils::constant_time_eq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub owner_id: String,
    pub role: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    MissingToken,
    IncompleteSession,
    TokenMismatch,
    Expired,
    DirectoryUnavailable,
    SessionUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedLogoutReason {
    AccountNotFound,
    AccountInactive(AccountStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Authenticated(Principal),
    Unauthenticated(UnauthenticatedReason),
    /// The session was torn down; the request is not authenticated.
    ForcedLogout(ForcedLogoutReason),
}

impl Validation {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

pub struct SessionValidator {
    directory: Arc<dyn DirectoryClient>,
    codec: VerificationTokenCodec,
}

impl SessionValidator {
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryClient>, codec: VerificationTokenCodec) -> Self {
        Self { directory, codec }
    }

    pub async fn validate(&self, ctx: &RequestContext, now: i64) -> Transition<Validation> {
        let unauthenticated =
            |reason| Transition::unchanged(Validation::Unauthenticated(reason));

        let Some(client_token) = ctx.cookie(TOKEN_COOKIE) else {
            return unauthenticated(UnauthenticatedReason::MissingToken);
        };
        let session = ctx.session();
        if !session.is_authenticated_shape() {
            return unauthenticated(UnauthenticatedReason::IncompleteSession);
        }
        let Some(expiry) = session.token_expiry else {
            return unauthenticated(UnauthenticatedReason::IncompleteSession);
        };
        let expected = self.codec.encode(&session.username, expiry);
        if !constant_time_eq(expected.as_bytes(), client_token.as_bytes()) {
            debug!(username = %session.username, "verification token mismatch");
            return unauthenticated(UnauthenticatedReason::TokenMismatch);
        }
        if session.is_expired(now) {
            return unauthenticated(UnauthenticatedReason::Expired);
        }

        let account = match self.directory.find_account(&session.username).await {
            Ok(account) => account,
            Err(err) => {
                warn!(username = %session.username, error = %err, "directory revalidation failed");
                return unauthenticated(UnauthenticatedReason::DirectoryUnavailable);
            }
        };

        let reason = match account {
            None => ForcedLogoutReason::AccountNotFound,
            Some(record) if !record.status.is_active() => {
                ForcedLogoutReason::AccountInactive(record.status)
            }
            Some(_) => {
                return Transition::unchanged(Validation::Authenticated(Principal {
                    username: session.username.clone(),
                    owner_id: session.owner_id.clone(),
                    role: session.role.clone(),
                    display_name: session.display_name.clone(),
                }));
            }
        };
        warn!(username = %session.username, reason = ?reason, "forced logout");
        Transition::clear(Validation::ForcedLogout(reason)).with_cookies(clear_identity_cookies())
    }
}
