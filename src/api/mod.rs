#![allow(clippy::needless_for_each)]

use crate::auth::AuthService;
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;
pub mod guard;

use handlers::{health, login, logout, session, sso, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        login::login_page,
        login::login_submit,
        sso::sso_login,
        sso::sso_callback,
        logout::logout,
        session::is_login,
        session::me,
        users::list_users,
    ),
    components(schemas(
        health::Health,
        login::LoginPage,
        session::LoginStatus,
        session::Me,
        crate::auth::service::ErrorPageContext,
        crate::auth::provider::KnownAccount,
    )),
    tags(
        (name = "gatekeeper", description = "Request authentication gateway"),
        (name = "auth", description = "Login, single sign-on and logout"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the router with every route, the login middleware and the request-id/trace layers.
pub fn router(service: Arc<AuthService>) -> Router {
    with_app(Router::new(), service)
}

/// Mount `app` behind `require_login`, next to the auth routes. Handlers in
/// `app` see the `x-gatekeeper-user` and `x-gatekeeper-owner` headers.
pub fn with_app(app: Router, service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/health", get(health::health).options(health::health))
        .route("/healthz", get(health::health))
        .route("/login", get(login::login_page).post(login::login_submit))
        .route("/sso/login", get(sso::sso_login))
        .route("/oidc/callback", get(sso::sso_callback))
        .route("/sso/callback", get(sso::sso_callback))
        .route("/logout", get(logout::logout).post(logout::logout))
        .route("/is_login", get(session::is_login))
        .route("/me", get(session::me))
        .route("/user/list", get(users::list_users))
        .route("/openapi.json", get(openapi_json))
        .merge(app)
        .layer(middleware::from_fn(guard::require_login))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service)),
        )
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(openapi())
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, service: Arc<AuthService>) -> Result<()> {
    let app = router(service);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
