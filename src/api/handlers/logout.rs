use super::{apply_cookies, found, request_context};
use crate::auth::AuthService;
use axum::{
    extract::Extension,
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Session cleared; redirect to the SSO end-session endpoint or the login page"),
    ),
    tag = "auth"
)]
pub async fn logout(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await;
    let secure = service.cookies_secure(&ctx);
    let username = ctx.session().username.clone();
    let applied = service.logout(&ctx).await;
    info!(username = %username, "logout");
    apply_cookies(found(&applied.outcome), &applied.cookies, secure)
}
