//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Client errors become a JSON body
//! `{ "ok": false, "error": "...", "issues": [...] }`; server faults are
//! captured to Sentry before responding.
//!
//! Provider failures are not represented here. The mailer turns them into
//! logged [`IntegrationError`](crate::services::IntegrationError) values so
//! they never fail a request.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use brightpath_core::{Issue, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// The submission failed its schema.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A server-side setting the form needs is not set.
    #[error("Configuration missing: {key}")]
    ConfigurationMissing { key: String, status: StatusCode },

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body exceeds the upload limit.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<&'a [Issue]>,
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConfigurationMissing { status, .. } => *status,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Server-side faults go to Sentry; client mistakes do not.
        if matches!(self, Self::Internal(_) | Self::ConfigurationMissing { .. }) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details or setting names to clients
        let error = match &self {
            Self::Validation(_) => "Please check the highlighted fields.".to_string(),
            Self::ConfigurationMissing { .. } => {
                "This form is not available right now. Please try again later.".to_string()
            }
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        let issues = match &self {
            Self::Validation(err) => Some(err.issues.as_slice()),
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                ok: false,
                error,
                issues,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::BadRequest("test".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            AppError::Internal("test".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::ConfigurationMissing {
                key: "CONTACT_NOTIFY_EMAIL".to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_issues() {
        let err = ValidationError::new(vec![Issue::new("email", "must contain an @ symbol")]);
        let (status, json) = body(AppError::from(err)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
        assert_eq!(json["issues"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_configuration_missing_hides_key() {
        let (status, json) = body(AppError::ConfigurationMissing {
            key: "TRIAL_NOTIFY_EMAIL".to_string(),
            status: StatusCode::BAD_REQUEST,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("issues").is_none());
        assert!(!json["error"].as_str().unwrap().contains("TRIAL"));
    }
}
