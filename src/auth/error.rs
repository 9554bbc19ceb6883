//! Error taxonomy for the authentication core.
//!
//! Every error carries a [`Disposition`] so the web layer can decide between a
//! login redirect, an error page, a 401, or a hard failure without matching on
//! individual variants.

use thiserror::Error;

use super::directory::DirectoryError;
use super::session::SessionStoreError;

pub type AuthResult<T> = Result<T, AuthError>;

/// How a failure should be surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Send the user back to the login entry point.
    RedirectToLogin,
    /// Render an error page (optionally with a logout link).
    ErrorPage,
    /// An upstream dependency failed; the user may try again.
    Retry,
    /// Reject the request outright.
    Unauthorized,
    /// No provider can be resolved; surfaced as a server error.
    Fatal,
}

/// Failures while talking the authorization-code protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("identity provider returned an error: {0}")]
    ProviderError(String),
    #[error("authorization code is missing")]
    MissingCode,
    #[error("state parameter does not match the issued nonce")]
    StateMismatch,
    #[error("token response has no access token")]
    MissingAccessToken,
    #[error("user claims could not be decoded")]
    MalformedClaims,
    #[error("user claims carry no usable username")]
    MissingUsername,
    #[error("token endpoint rejected the request with status {0}")]
    TokenRejected(u16),
    #[error("userinfo endpoint rejected the request with status {0}")]
    ClaimsRejected(u16),
    #[error("invalid username or password")]
    InvalidCredentials,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("account {0} is not registered")]
    UnknownAccount(String),
    #[error("account {username} is {status}")]
    DisabledAccount { username: String, status: String },
    #[error("session store error: {0}")]
    SessionStore(#[from] SessionStoreError),
}

impl AuthError {
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Configuration(_) => Disposition::Fatal,
            Self::Protocol(ProtocolError::InvalidCredentials) => Disposition::Unauthorized,
            Self::Protocol(_) | Self::SessionStore(_) => Disposition::RedirectToLogin,
            Self::UpstreamUnavailable(_) => Disposition::Retry,
            Self::UnknownAccount(_) | Self::DisabledAccount { .. } => Disposition::ErrorPage,
        }
    }

    /// Text that is safe to show to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownAccount(username) => {
                format!("The account {username} is not registered. Contact your administrator.")
            }
            Self::DisabledAccount { username, status } => {
                format!("The account {username} is {status}. Contact your administrator.")
            }
            Self::Protocol(ProtocolError::InvalidCredentials) => {
                "Invalid username or password.".to_string()
            }
            Self::Protocol(_) | Self::UpstreamUnavailable(_) | Self::SessionStore(_) => {
                "Sign-in failed, please try again.".to_string()
            }
            Self::Configuration(_) => "Sign-in is not available, contact your administrator.".to_string(),
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        Self::UpstreamUnavailable(format!("directory: {err}"))
    }
}

/// Map a transport failure from the identity provider.
pub(crate) fn upstream(err: &reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::UpstreamUnavailable("identity provider timed out".to_string())
    } else {
        AuthError::UpstreamUnavailable(format!("identity provider: {err}"))
    }
}
