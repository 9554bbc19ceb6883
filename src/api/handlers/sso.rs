use super::{apply_cookies, error_page, error_response, found, page_status, request_context};
use crate::auth::{service::CallbackResponse, AuthService};
use axum::{
    extract::Extension,
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/sso/login",
    params(("c_url" = Option<String>, Query, description = "Where to return after login")),
    responses(
        (status = 302, description = "Redirect to the identity provider authorization endpoint"),
        (status = 500, description = "SSO is not configured", body = crate::auth::service::ErrorPageContext),
    ),
    tag = "auth"
)]
pub async fn sso_login(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await;
    let secure = service.cookies_secure(&ctx);
    match service.begin_sso(&ctx).await {
        Ok(applied) => apply_cookies(found(&applied.outcome), &applied.cookies, secure),
        Err(err) => error_response(&service, &ctx, &err),
    }
}

#[utoipa::path(
    get,
    path = "/oidc/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "CSRF nonce echoed by the identity provider"),
        ("error" = Option<String>, Query, description = "Error reported by the identity provider"),
    ),
    responses(
        (status = 302, description = "Session established, redirect to the return location"),
        (status = 400, description = "Callback failed the protocol checks", body = crate::auth::service::ErrorPageContext),
        (status = 403, description = "Login rejected", body = crate::auth::service::ErrorPageContext),
        (status = 503, description = "Identity provider or directory unavailable", body = crate::auth::service::ErrorPageContext),
    ),
    tag = "auth"
)]
pub async fn sso_callback(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await;
    let secure = service.cookies_secure(&ctx);
    let applied = service.handle_sso_callback(&ctx).await;
    let response = match applied.outcome {
        CallbackResponse::Redirect(url) => found(&url),
        CallbackResponse::ErrorPage { disposition, page } => {
            error_page(page_status(disposition), page)
        }
    };
    apply_cookies(response, &applied.cookies, secure)
}
