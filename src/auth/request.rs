//! Request context handed to the core by the web layer.

use std::collections::HashMap;

use super::cookies::{parse_cookie_header, SCHEME_COOKIE};
use super::session::IdentitySession;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpScheme {
    #[default]
    Http,
    Https,
}

impl HttpScheme {
    /// Pick the scheme from the `http_scheme` cookie, then `X-Forwarded-Proto`.
    #[must_use]
    pub fn detect(cookie: Option<&str>, forwarded_proto: Option<&str>) -> Self {
        let hint = cookie
            .filter(|value| !value.is_empty())
            .or(forwarded_proto)
            .map(str::trim);
        match hint {
            Some(value) if value.eq_ignore_ascii_case("https") => Self::Https,
            _ => Self::Http,
        }
    }
}

/// Everything the core may read from an inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session_id: Option<String>,
    session: IdentitySession,
    cookies: HashMap<String, String>,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    path_and_query: String,
    scheme: HttpScheme,
}

impl RequestContext {
    #[must_use]
    pub fn new(path_and_query: &str) -> Self {
        Self {
            path_and_query: path_and_query.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_session(mut self, id: Option<String>, session: IdentitySession) -> Self {
        self.session_id = id;
        self.session = session;
        self
    }

    /// Parse a raw `Cookie` header.
    #[must_use]
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        self.cookies.extend(parse_cookie_header(header));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query.extend(query);
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: HashMap<String, String>) -> Self {
        self.form.extend(form);
        self
    }

    #[must_use]
    pub fn with_form_field(mut self, name: &str, value: &str) -> Self {
        self.form.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: HttpScheme) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn session(&self) -> &IdentitySession {
        &self.session
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    /// Explicit scheme if set, otherwise the `http_scheme` cookie hint.
    #[must_use]
    pub fn scheme(&self) -> HttpScheme {
        match self.scheme {
            HttpScheme::Https => HttpScheme::Https,
            HttpScheme::Http => HttpScheme::detect(self.cookie(SCHEME_COOKIE), None),
        }
    }
}
