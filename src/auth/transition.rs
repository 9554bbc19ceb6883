//! Explicit results of state transitions.
//!
//! Handshake, validator and logout code describe what should happen to the
//! session and to the client cookies instead of doing it. The service applies
//! the description against the session store.

use super::cookies::CookieDirective;
use super::session::IdentitySession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMutation {
    Unchanged,
    /// Overwrite the session under the current id (created if missing).
    Replace(IdentitySession),
    /// Authentication succeeded: store under a fresh session id.
    Establish(IdentitySession),
    /// Drop the session entirely.
    Clear,
}

#[derive(Debug)]
pub struct Transition<T> {
    pub mutation: SessionMutation,
    pub cookies: Vec<CookieDirective>,
    pub outcome: T,
}

impl<T> Transition<T> {
    #[must_use]
    pub fn unchanged(outcome: T) -> Self {
        Self {
            mutation: SessionMutation::Unchanged,
            cookies: Vec::new(),
            outcome,
        }
    }

    #[must_use]
    pub fn replace(session: IdentitySession, outcome: T) -> Self {
        Self {
            mutation: SessionMutation::Replace(session),
            cookies: Vec::new(),
            outcome,
        }
    }

    #[must_use]
    pub fn establish(session: IdentitySession, outcome: T) -> Self {
        Self {
            mutation: SessionMutation::Establish(session),
            cookies: Vec::new(),
            outcome,
        }
    }

    #[must_use]
    pub fn clear(outcome: T) -> Self {
        Self {
            mutation: SessionMutation::Clear,
            cookies: Vec::new(),
            outcome,
        }
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: Vec<CookieDirective>) -> Self {
        self.cookies.extend(cookies);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transition<U> {
        Transition {
            mutation: self.mutation,
            cookies: self.cookies,
            outcome: f(self.outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookies::clear_identity_cookies;

    #[test]
    fn builders_keep_mutation_and_cookies() {
        let transition = Transition::clear("bye").with_cookies(clear_identity_cookies());
        assert_eq!(transition.mutation, SessionMutation::Clear);
        assert_eq!(transition.cookies.len(), 3);

        let mapped = transition.map(str::len);
        assert_eq!(mapped.outcome, 3);
        assert_eq!(mapped.mutation, SessionMutation::Clear);
    }
}
