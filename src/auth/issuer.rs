//! Turns identity claims into an established session plus its cookies.

use chrono::Utc;

use super::cookies::{identity_cookies, CookieDirective};
use super::provider::LoginIdentity;
use super::session::IdentitySession;
use super::token::VerificationTokenCodec;

/// Fixed lifetime of an established session.
pub const DEFAULT_SESSION_LIFETIME_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct SessionIssuer {
    codec: VerificationTokenCodec,
    lifetime_seconds: i64,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(codec: VerificationTokenCodec) -> Self {
        Self {
            codec,
            lifetime_seconds: DEFAULT_SESSION_LIFETIME_SECONDS,
        }
    }

    #[must_use]
    pub fn with_lifetime_seconds(mut self, seconds: i64) -> Self {
        self.lifetime_seconds = seconds;
        self
    }

    #[must_use]
    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    #[must_use]
    pub fn codec(&self) -> &VerificationTokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn issue(&self, identity: LoginIdentity, provider: &str) -> (IdentitySession, Vec<CookieDirective>) {
        self.issue_at(identity, provider, Utc::now().timestamp())
    }

    /// The expiry carried by the identity wins over a fresh lifetime.
    #[must_use]
    pub fn issue_at(
        &self,
        identity: LoginIdentity,
        provider: &str,
        now: i64,
    ) -> (IdentitySession, Vec<CookieDirective>) {
        let expiry = identity
            .token_expiry
            .filter(|expiry| *expiry > now)
            .unwrap_or(now + self.lifetime_seconds);
        let token = self.codec.encode(&identity.username, expiry);
        let max_age = expiry - now;
        let cookies = identity_cookies(&identity.username, &identity.owner_id, &token, max_age);

        let session = IdentitySession {
            username: identity.username,
            owner_id: identity.owner_id,
            display_name: identity.display_name,
            email: identity.email,
            role: identity.role,
            multi_tenant: identity.multi_tenant,
            provider: Some(provider.to_string()),
            token_expiry: Some(expiry),
            verification_token: Some(token),
            sso: identity.sso,
            ..IdentitySession::default()
        };
        (session, cookies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookies::{CookieDirective, TOKEN_COOKIE};
    use secrecy::SecretString;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(VerificationTokenCodec::new(SecretString::from("salt".to_string())))
    }

    #[test]
    fn issue_sets_expiry_token_and_cookies() {
        let (session, cookies) = issuer().issue_at(LoginIdentity::new("alice"), "password", 1_000);
        assert_eq!(session.token_expiry, Some(1_000 + DEFAULT_SESSION_LIFETIME_SECONDS));
        assert_eq!(session.provider.as_deref(), Some("password"));
        let token = session.verification_token.clone().unwrap_or_default();
        assert!(issuer().codec().verify(&token, "alice", 1_000 + DEFAULT_SESSION_LIFETIME_SECONDS));
        assert!(cookies.contains(&CookieDirective::Set {
            name: TOKEN_COOKIE,
            value: token,
            max_age: DEFAULT_SESSION_LIFETIME_SECONDS,
        }));
    }

    #[test]
    fn issue_keeps_live_expiry() {
        let mut identity = LoginIdentity::new("alice");
        identity.token_expiry = Some(5_000);
        let (session, _) = issuer().issue_at(identity.clone(), "sso", 1_000);
        assert_eq!(session.token_expiry, Some(5_000));

        let (session, _) = issuer().issue_at(identity, "sso", 6_000);
        assert_eq!(session.token_expiry, Some(6_000 + DEFAULT_SESSION_LIFETIME_SECONDS));
    }
}
