use super::{apply_cookies, request_context};
use crate::auth::{validator::Principal, AuthService};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginStatus {
    result: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct Me {
    username: String,
    owner_id: String,
    role: String,
    display_name: String,
}

#[utoipa::path(
    get,
    path = "/is_login",
    responses((status = 200, description = "Whether the caller has a valid session", body = LoginStatus)),
    tag = "auth"
)]
pub async fn is_login(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await;
    let secure = service.cookies_secure(&ctx);
    let applied = service.check_login(&ctx).await;
    apply_cookies(
        Json(LoginStatus {
            result: applied.outcome,
        })
        .into_response(),
        &applied.cookies,
        secure,
    )
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Authenticated principal", body = Me),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "auth"
)]
pub async fn me(principal: Option<Extension<Principal>>) -> Response {
    match principal {
        Some(Extension(principal)) => Json(Me {
            username: principal.username,
            owner_id: principal.owner_id,
            role: principal.role,
            display_name: principal.display_name,
        })
        .into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
