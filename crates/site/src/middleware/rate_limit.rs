//! Rate limiting for form submissions using governor and `tower_governor`.
//!
//! Every POST form route shares one limiter keyed by client IP: one token
//! every 2 seconds, burst of 20. Probes and static pages are not limited.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

// =============================================================================
// Client IP Key Extractor for Cloudflare + Fly.io
// =============================================================================

/// Key extractor that checks Cloudflare's `CF-Connecting-IP` header first,
/// then the usual proxy headers, then the socket peer address.
#[derive(Clone, Copy)]
pub struct CloudflareIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for CloudflareIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        header_ip("cf-connecting-ip")
            .or_else(|| header_ip("x-forwarded-for"))
            .or_else(|| header_ip("x-real-ip"))
            .or_else(|| header_ip("fly-client-ip"))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<CloudflareIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the rate limiter for form submissions: ~30 per minute per IP.
///
/// Configuration: 1 request every 2 seconds (replenish), burst of 20, enough
/// for a family filling in several forms while stopping scripted floods.
///
/// # Panics
///
/// This function will not panic. `per_second(2)` and `burst_size(20)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn form_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(2)
        .burst_size(20)
        .finish()
        .expect("rate limiter config with per_second(2) and burst_size(20) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rewrite the limiter's plain-text 429 into the JSON error body the form
/// scripts expect, keeping its `retry-after` header.
pub async fn rate_limited_json(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }
    let retry_after = response.headers().get(RETRY_AFTER).cloned();
    tracing::warn!(retry_after = ?retry_after, "Form submission rate limited");

    let mut rewritten = AppError::RateLimited.into_response();
    if let Some(value) = retry_after {
        rewritten.headers_mut().insert(RETRY_AFTER, value);
    }
    rewritten
}
