//! HTTP middleware stack for the site.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (reuse `x-request-id` or generate one)
//! 4. CORS (origins from `SITE_ALLOWED_ORIGINS`)
//! 5. Body limit (`SITE_MAX_UPLOAD_BYTES`)
//! 6. Rate limiting on form POST routes (governor)

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimiterLayer, form_rate_limiter, rate_limited_json};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
