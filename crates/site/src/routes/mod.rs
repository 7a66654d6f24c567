//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//!
//! # Forms (POST is rate limited)
//! POST /api/trial              - Free trial request
//! POST /api/contact            - Contact message
//! GET  /api/contact            - Configuration probe
//! POST /api/callback           - Callback request
//! GET  /api/callback           - Configuration probe
//! POST /api/student-form       - Student enrolment
//! POST /api/teacher-apply      - Teacher application (multipart, CV upload)
//! POST /api/form               - Any form, keyed by `formType`
//! GET  /api/form               - Supported form types
//!
//! # Newsletter
//! POST /api/newsletter         - Subscribe
//! GET  /api/newsletter         - `action=info` (default) or `action=verify&email=..[&listId=..]`
//!
//! # Everything else
//! GET  /*                      - Static marketing pages from SITE_PUBLIC_DIR
//! ```

pub mod forms;
pub mod newsletter;

use axum::{
    Router,
    handler::Handler,
    middleware::map_response,
    routing::{MethodRouter, post},
};

use crate::middleware::{RateLimiterLayer, form_rate_limiter, rate_limited_json};
use crate::state::AppState;

/// Create the API router.
pub fn routes() -> Router<AppState> {
    let limiter = form_rate_limiter();

    Router::new()
        .route("/api/trial", limited(forms::trial, &limiter))
        .route(
            "/api/contact",
            limited(forms::contact, &limiter).get(forms::contact_probe),
        )
        .route(
            "/api/callback",
            limited(forms::callback, &limiter).get(forms::callback_probe),
        )
        .route("/api/student-form", limited(forms::student_form, &limiter))
        .route("/api/teacher-apply", limited(forms::teacher_apply, &limiter))
        .route(
            "/api/form",
            limited(forms::dispatch, &limiter).get(forms::list_forms),
        )
        .route(
            "/api/newsletter",
            limited(newsletter::subscribe, &limiter).get(newsletter::query),
        )
}

/// A POST route behind the form rate limiter.
fn limited<H, T>(handler: H, limiter: &RateLimiterLayer) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    post(handler)
        .layer(limiter.clone())
        .layer(map_response(rate_limited_json))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not call the provider.
pub async fn health() -> &'static str {
    "ok"
}
