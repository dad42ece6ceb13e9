//! HTTP wiring: pool setup, route table, tracing layers, and serve loop.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, patch, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use crate::auth::{
    Argon2Hasher, AuthService, JwtSigner, PgPrincipalStore, PgRefreshTokenStore, SystemClock,
};

pub mod handlers;

/// Route table over a shared auth service.
pub fn router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/auth/parent/register", post(handlers::auth::parent_register))
        .route(
            "/v1/auth/parent/set-password/:verify_token",
            patch(handlers::auth::parent_set_password),
        )
        .route("/v1/auth/parent/login", post(handlers::auth::parent_login))
        .route("/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/v1/auth/logout", post(handlers::auth::logout))
        .route("/v1/auth/child", post(handlers::auth::create_child))
        .route("/v1/auth/child/pairing", post(handlers::auth::child_pairing))
        .route("/v1/auth/child/login", post(handlers::auth::child_login))
        .layer(Extension(service))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, jwt_secret: String) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    // Capabilities are injected here once; nothing inside the core reads
    // ambient configuration.
    let service = Arc::new(AuthService::new(
        Arc::new(PgPrincipalStore::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool)),
        Arc::new(Argon2Hasher),
        Arc::new(JwtSigner::new(&jwt_secret)),
        Arc::new(SystemClock),
    ));

    let app = router(service).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

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
