use super::{apply_cookies, error_response, found, request_context};
use crate::auth::{
    provider::{PASSWORD_VERSION, SSO_VERSION},
    AuthService,
};
use axum::{
    extract::{Extension, Form},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use utoipa::ToSchema;

/// What the login form needs to render.
#[derive(ToSchema, Serialize, Debug)]
pub struct LoginPage {
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    c_url: Option<String>,
    providers: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/login",
    params(
        ("c_url" = Option<String>, Query, description = "Where to return after login"),
        ("version" = Option<String>, Query, description = "Requested provider version"),
    ),
    responses(
        (status = 200, description = "Login form context", body = LoginPage),
        (status = 302, description = "Redirect to the identity provider"),
    ),
    tag = "auth"
)]
pub async fn login_page(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await;
    let requested = ctx.query_param("version").map(str::to_string);
    let provider = match service.registry().resolve(requested.as_deref()) {
        Ok(provider) => provider,
        Err(err) => return error_response(&service, &ctx, &err),
    };

    if provider.version() == SSO_VERSION {
        let secure = service.cookies_secure(&ctx);
        return match service.begin_login(&ctx, Some(SSO_VERSION)).await {
            Ok(applied) => apply_cookies(found(&applied.outcome), &applied.cookies, secure),
            Err(err) => error_response(&service, &ctx, &err),
        };
    }

    Json(LoginPage {
        version: provider.version().to_string(),
        c_url: ctx.query_param("c_url").map(str::to_string),
        providers: service
            .registry()
            .versions()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
    .into_response()
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = String, content_type = "application/x-www-form-urlencoded",
        description = "username, password, optional c_url and version"),
    responses(
        (status = 302, description = "Session established"),
        (status = 401, description = "Invalid credentials", body = crate::auth::service::ErrorPageContext),
    ),
    tag = "auth"
)]
pub async fn login_submit(
    Extension(service): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    uri: Uri,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let ctx = request_context(&service, &headers, &uri).await.with_form(form);
    let version = ctx
        .form_field("version")
        .filter(|v| !v.is_empty())
        .unwrap_or(PASSWORD_VERSION)
        .to_string();
    let secure = service.cookies_secure(&ctx);

    match service.login_with_provider(&ctx, Some(&version)).await {
        Ok(applied) => apply_cookies(found(&applied.outcome), &applied.cookies, secure),
        Err(err) => error_response(&service, &ctx, &err),
    }
}
