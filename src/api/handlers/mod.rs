//! Route handlers and the glue between HTTP and [`RequestContext`].

pub mod health;
pub mod login;
pub mod logout;
pub mod session;
pub mod sso;
pub mod users;

use axum::{
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Json, Response},
};
use std::collections::HashMap;
use tracing::error;
use url::form_urlencoded;

use crate::auth::{
    cookies::{CookieDirective, SESSION_COOKIE, SCHEME_COOKIE},
    request::{HttpScheme, RequestContext},
    service::ErrorPageContext,
    AuthError, AuthService, Disposition,
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub(crate) fn parse_query(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Build the core's view of the request and load its session.
pub(crate) async fn request_context(service: &AuthService, headers: &HeaderMap, uri: &Uri) -> RequestContext {
    let mut ctx = RequestContext::new(uri.path_and_query().map_or("/", |pq| pq.as_str()))
        .with_query(parse_query(uri));
    for value in headers.get_all(COOKIE) {
        if let Ok(value) = value.to_str() {
            ctx = ctx.with_cookie_header(value);
        }
    }
    let forwarded = headers.get(FORWARDED_PROTO).and_then(|v| v.to_str().ok());
    let scheme = HttpScheme::detect(ctx.cookie(SCHEME_COOKIE), forwarded);
    ctx = ctx.with_scheme(scheme);

    let session_id = ctx.cookie(SESSION_COOKIE).map(str::to_string);
    let session = service.load_session(session_id.as_deref()).await;
    ctx.with_session(session_id, session)
}

pub(crate) fn apply_cookies(mut response: Response, cookies: &[CookieDirective], secure: bool) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_header_value(secure)) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(err) => error!(cookie = cookie.name(), "Failed to encode cookie: {err}"),
        }
    }
    response
}

/// 302 to `url`.
pub(crate) fn found(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(err) => {
            error!("Invalid redirect location: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) fn internal_error(err: &AuthError) -> Response {
    error!("{err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.user_message() })),
    )
        .into_response()
}

pub(crate) fn error_page(status: StatusCode, page: ErrorPageContext) -> Response {
    (status, Json(page)).into_response()
}

/// Status of a rendered error page.
pub(crate) fn page_status(disposition: Disposition) -> StatusCode {
    match disposition {
        Disposition::RedirectToLogin => StatusCode::BAD_REQUEST,
        Disposition::ErrorPage => StatusCode::FORBIDDEN,
        Disposition::Retry => StatusCode::SERVICE_UNAVAILABLE,
        Disposition::Unauthorized => StatusCode::UNAUTHORIZED,
        Disposition::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map an error to a response by its disposition.
pub(crate) fn error_response(service: &AuthService, ctx: &RequestContext, err: &AuthError) -> Response {
    let login_url = service.site().for_request(ctx).to_string();
    match err.disposition() {
        Disposition::RedirectToLogin => match service.login_redirect(ctx, None) {
            Ok(url) => found(&url),
            Err(err) => internal_error(&err),
        },
        disposition => {
            if disposition == Disposition::Fatal {
                error!("{err}");
            }
            error_page(
                page_status(disposition),
                ErrorPageContext {
                    message: err.user_message(),
                    login_url,
                    logout_url: None,
                },
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn page_status_separates_denials_from_outages() {
        assert_eq!(page_status(Disposition::ErrorPage), StatusCode::FORBIDDEN);
        assert_eq!(page_status(Disposition::Retry), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(page_status(Disposition::RedirectToLogin), StatusCode::BAD_REQUEST);
        assert_eq!(page_status(Disposition::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(page_status(Disposition::Fatal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn parse_query_decodes_pairs() {
        let uri: Uri = "/oidc/callback?code=a%2Bb&state=x+y".parse().unwrap();
        let query = parse_query(&uri);
        assert_eq!(query["code"], "a+b");
        assert_eq!(query["state"], "x y");
        assert!(parse_query(&"/".parse().unwrap()).is_empty());
    }

    #[test]
    fn found_sets_location() {
        let response = found("http://app/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "http://app/login");
    }

    #[test]
    fn apply_cookies_appends_each_directive() {
        let response = apply_cookies(
            StatusCode::OK.into_response(),
            &[
                CookieDirective::Remove { name: "a" },
                CookieDirective::Remove { name: "b" },
            ],
            true,
        );
        let values: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].to_str().unwrap().ends_with("; Secure"));
    }
}
