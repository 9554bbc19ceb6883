//! Client-held state: the opaque session reference plus three identity-bound
//! cookies (canonical user, owner/tenant id, verification token).

use std::collections::HashMap;

pub const SESSION_COOKIE: &str = "gatekeeper_session";
pub const USER_COOKIE: &str = "gk_user";
pub const OWNER_COOKIE: &str = "gk_owner";
pub const TOKEN_COOKIE: &str = "gk_token";
/// Scheme hint set by the frontend proxy (`http` or `https`).
pub const SCHEME_COOKIE: &str = "http_scheme";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    Set {
        name: &'static str,
        value: String,
        max_age: i64,
    },
    Remove {
        name: &'static str,
    },
}

impl CookieDirective {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { name, .. } | Self::Remove { name } => name,
        }
    }

    /// Render as a `Set-Cookie` header value.
    #[must_use]
    pub fn to_header_value(&self, secure: bool) -> String {
        let mut cookie = match self {
            Self::Set {
                name,
                value,
                max_age,
            } => format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"),
            Self::Remove { name } => format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
        };
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Cookies written when a session is established.
#[must_use]
pub fn identity_cookies(
    username: &str,
    owner_id: &str,
    verification_token: &str,
    max_age: i64,
) -> Vec<CookieDirective> {
    vec![
        CookieDirective::Set {
            name: USER_COOKIE,
            value: username.to_string(),
            max_age,
        },
        CookieDirective::Set {
            name: OWNER_COOKIE,
            value: owner_id.to_string(),
            max_age,
        },
        CookieDirective::Set {
            name: TOKEN_COOKIE,
            value: verification_token.to_string(),
            max_age,
        },
    ]
}

/// The identity cookies always go away together.
#[must_use]
pub fn clear_identity_cookies() -> Vec<CookieDirective> {
    [USER_COOKIE, OWNER_COOKIE, TOKEN_COOKIE]
        .into_iter()
        .map(|name| CookieDirective::Remove { name })
        .collect()
}

/// Parse a `Cookie` request header into name/value pairs. First occurrence wins.
#[must_use]
pub fn parse_cookie_header(value: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        cookies
            .entry(key.to_string())
            .or_insert_with(|| val.trim().to_string());
    }
    cookies
}
