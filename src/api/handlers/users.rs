use super::{error_response, request_context};
use crate::auth::AuthService;
use axum::{
    extract::Extension,
    http::{HeaderMap, Uri},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/user/list",
    params(("version" = Option<String>, Query, description = "Provider version to ask")),
    responses(
        (status = 200, description = "Accounts known to the resolved provider", body = [crate::auth::provider::KnownAccount]),
    ),
    tag = "auth"
)]
pub async fn list_users(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await;
    match service.list_known_accounts(ctx.query_param("version")).await {
        Ok(accounts) => Json(accounts).into_response(),
        Err(err) => error_response(&service, &ctx, &err),
    }
}
