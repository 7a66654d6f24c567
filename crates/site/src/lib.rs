//! Brightpath Academy site backend.
//!
//! Serves the static marketing pages and the form endpoints behind them.
//! Each form submission is validated, then three best-effort side effects
//! run against the mail provider (Brevo in production):
//!
//! 1. notify the academy's staff
//! 2. confirm to the submitter
//! 3. upsert the submitter into a contact list
//!
//! The visitor gets a success reply once validation and the configuration
//! check pass, whatever the provider does.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

pub use config::SiteConfig;
pub use error::AppError;
pub use state::AppState;

/// Build the full application router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// the rate limiter can fall back to the peer address.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let public_dir = ServeDir::new(&config.public_dir);
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes);
    let cors = cors_layer(&config.allowed_origins);

    Router::new()
        .route("/health", get(routes::health))
        .merge(routes::routes())
        .fallback_service(public_dir)
        .layer(body_limit)
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured origins. With no origins configured only
/// same-origin pages can post.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
