//! # Gatekeeper (request authentication gateway)
//!
//! `gatekeeper` authenticates inbound web requests and keeps a user's identity
//! trustworthy across requests. It sits in front of an application and decides,
//! for every request, whether the caller has a valid session.
//!
//! ## Providers
//!
//! Authentication methods are pluggable [`auth::provider::Provider`]s keyed by a
//! version identifier: a password form, federated single sign-on (OpenID Connect
//! authorization-code flow), and an open fallback. The
//! [`auth::registry::ProviderRegistry`] picks one per request; SSO always wins
//! when it is fully configured.
//!
//! ## Single sign-on
//!
//! The SSO handshake redirects to the identity provider with a single-use CSRF
//! nonce as `state`, verifies the nonce on callback before any network call,
//! exchanges the code for tokens, fetches the claims and maps them to a local
//! account in the directory. Unknown or disabled accounts are rejected but keep
//! enough state to terminate the upstream session on logout.
//!
//! ## Revalidation
//!
//! Every authenticated request re-checks the account status against the
//! directory. Any failure fails closed; a missing or inactive account triggers
//! a forced logout on the very next request.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
