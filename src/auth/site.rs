//! Site URLs used to build login redirects and return locations.

use url::form_urlencoded::byte_serialize;

use super::request::{HttpScheme, RequestContext};

#[derive(Debug, Clone)]
pub struct SiteUrls {
    domain_url: String,
    https_domain_url: Option<String>,
}

impl SiteUrls {
    #[must_use]
    pub fn new(domain_url: &str) -> Self {
        Self {
            domain_url: domain_url.trim_end_matches('/').to_string(),
            https_domain_url: None,
        }
    }

    #[must_use]
    pub fn with_https_domain_url(mut self, url: Option<String>) -> Self {
        self.https_domain_url = url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    #[must_use]
    pub fn domain_url(&self) -> &str {
        &self.domain_url
    }

    #[must_use]
    pub fn for_scheme(&self, scheme: HttpScheme) -> &str {
        match (scheme, self.https_domain_url.as_deref()) {
            (HttpScheme::Https, Some(url)) => url,
            _ => &self.domain_url,
        }
    }

    #[must_use]
    pub fn for_request(&self, ctx: &RequestContext) -> &str {
        self.for_scheme(ctx.scheme())
    }

    /// Whether any configured site URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self, scheme: HttpScheme) -> bool {
        self.for_scheme(scheme).starts_with("https://")
    }

    /// `{site}{entry_path}?c_url={site}{original path}` with `c_url` percent-encoded.
    #[must_use]
    pub fn build_login_redirect(&self, entry_path: &str, ctx: &RequestContext) -> String {
        let site = self.for_request(ctx);
        let original = format!("{site}{}", ctx.path_and_query());
        let encoded: String = byte_serialize(original.as_bytes()).collect();
        format!("{site}{entry_path}?c_url={encoded}")
    }

    /// Accept relative paths and URLs under a configured site URL; anything
    /// else falls back to the site URL for this request.
    #[must_use]
    pub fn sanitize_return_to(&self, candidate: Option<&str>, ctx: &RequestContext) -> String {
        let site = self.for_request(ctx);
        let Some(candidate) = candidate.map(str::trim).filter(|c| !c.is_empty()) else {
            return site.to_string();
        };
        if candidate.starts_with('/') && !candidate.starts_with("//") && !candidate.contains('\\') {
            return format!("{site}{candidate}");
        }
        let allowed = std::iter::once(self.domain_url.as_str()).chain(self.https_domain_url.as_deref());
        for base in allowed {
            if let Some(rest) = candidate.strip_prefix(base) {
                if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
                    return candidate.to_string();
                }
            }
        }
        site.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteUrls {
        SiteUrls::new("http://app.example.com/")
            .with_https_domain_url(Some("https://app.example.com".to_string()))
    }

    #[test]
    fn login_redirect_encodes_original_location() {
        let ctx = RequestContext::new("/reports?id=7&tab=a b");
        assert_eq!(
            site().build_login_redirect("/sso/login", &ctx),
            "http://app.example.com/sso/login?c_url=http%3A%2F%2Fapp.example.com%2Freports%3Fid%3D7%26tab%3Da+b"
        );
    }

    #[test]
    fn https_hint_switches_site() {
        let ctx = RequestContext::new("/").with_scheme(HttpScheme::Https);
        assert_eq!(site().for_request(&ctx), "https://app.example.com");
        let plain = SiteUrls::new("http://app.example.com");
        assert_eq!(plain.for_request(&ctx), "http://app.example.com");
        assert!(!plain.is_secure(HttpScheme::Https));
    }

    #[test]
    fn return_to_only_allows_same_site() {
        let ctx = RequestContext::new("/");
        let s = site();
        assert_eq!(s.sanitize_return_to(Some("/a?b=1"), &ctx), "http://app.example.com/a?b=1");
        assert_eq!(
            s.sanitize_return_to(Some("https://app.example.com/x"), &ctx),
            "https://app.example.com/x"
        );
        assert_eq!(s.sanitize_return_to(Some("//evil.com"), &ctx), "http://app.example.com");
        assert_eq!(
            s.sanitize_return_to(Some("http://app.example.com.evil.com/"), &ctx),
            "http://app.example.com"
        );
        assert_eq!(s.sanitize_return_to(None, &ctx), "http://app.example.com");
    }
}
