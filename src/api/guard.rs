//! `require_login`: runs the session validator in front of every non-public route.

use axum::{
    extract::{Extension, Request},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::handlers::{apply_cookies, found, internal_error, request_context};
use crate::auth::{validator::Validation, AuthService};

pub const USER_HEADER: &str = "x-gatekeeper-user";
pub const OWNER_HEADER: &str = "x-gatekeeper-owner";

const PUBLIC_PREFIXES: [&str; 9] = [
    "health",
    "healthz",
    "login",
    "static",
    "is_login",
    "sso",
    "oidc",
    "logout",
    "openapi.json",
];

/// First path segment decides.
#[must_use]
pub fn is_public(path: &str) -> bool {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    PUBLIC_PREFIXES.contains(&first)
}

fn is_api(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub async fn require_login(
    Extension(service): Extension<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Identity headers are only ever set here.
    request.headers_mut().remove(USER_HEADER);
    request.headers_mut().remove(OWNER_HEADER);

    let path = request.uri().path().to_string();
    if is_public(&path) {
        return next.run(request).await;
    }

    let ctx = request_context(&service, request.headers(), request.uri()).await;
    let secure = service.cookies_secure(&ctx);
    let applied = service.is_authenticated(&ctx).await;

    if let Validation::Authenticated(principal) = &applied.outcome {
        if let (Ok(user), Ok(owner)) = (
            HeaderValue::from_str(&principal.username),
            HeaderValue::from_str(&principal.owner_id),
        ) {
            request.headers_mut().insert(USER_HEADER, user);
            request.headers_mut().insert(OWNER_HEADER, owner);
        }
        request.extensions_mut().insert(principal.clone());
        let response = next.run(request).await;
        return apply_cookies(response, &applied.cookies, secure);
    }

    debug!(path = %path, outcome = ?applied.outcome, "request not authenticated");
    let response = if is_api(&path) {
        (StatusCode::UNAUTHORIZED, Json(json!({"status": "log out"}))).into_response()
    } else {
        match service.login_redirect(&ctx, None) {
            Ok(url) => found(&url),
            Err(err) => internal_error(&err),
        }
    };
    apply_cookies(response, &applied.cookies, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_prefixes_match_first_segment() {
        assert!(is_public("/health"));
        assert!(is_public("/sso/login"));
        assert!(is_public("/oidc/callback"));
        assert!(is_public("/static/app.js"));
        assert!(is_public("/openapi.json"));
        assert!(!is_public("/"));
        assert!(!is_public("/user/list"));
        assert!(!is_public("/loginx"));
        assert!(!is_public("/api/health"));
    }

    #[test]
    fn api_paths() {
        assert!(is_api("/api/v1/things"));
        assert!(is_api("/api"));
        assert!(!is_api("/apix"));
    }
}
