//! Request body extractor for form endpoints.
//!
//! Browsers post JSON (`fetch`), urlencoded bodies (plain `<form>`) or
//! multipart (file uploads). All three end up as an [`Envelope`].

use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{StatusCode, header::CONTENT_TYPE},
};
use brightpath_core::forms::Attachment;
use brightpath_core::{Envelope, FormType, Submission};
use serde_json::Value;

use crate::error::AppError;

/// A form submission body, before schema validation.
#[derive(Debug)]
pub enum SubmissionBody {
    Json(Value),
    Parts {
        fields: Vec<(String, String)>,
        files: Vec<Attachment>,
    },
}

impl SubmissionBody {
    /// Resolve the form type and read the envelope.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed envelope.
    pub fn into_envelope(self, route_form: Option<FormType>) -> Result<Envelope, AppError> {
        let envelope = match self {
            Self::Json(value) => Envelope::from_json(value, route_form)?,
            Self::Parts { fields, files } => Envelope::from_parts(fields, files, route_form)?,
        };
        Ok(envelope)
    }

    /// Read the envelope and validate it against the form's schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every issue found.
    pub fn into_submission(self, route_form: Option<FormType>) -> Result<Submission, AppError> {
        Ok(self.into_envelope(route_form)?.into_submission()?)
    }
}

impl<S> FromRequest<S> for SubmissionBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            return Ok(Self::Parts {
                fields,
                files: Vec::new(),
            });
        }

        // A missing content type is read as JSON; most clients that forget
        // the header are sending `JSON.stringify` output.
        if !content_type.is_empty() && !content_type.contains("json") {
            return Err(AppError::BadRequest(format!(
                "Unsupported content type: {content_type}"
            )));
        }
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Request body is empty".to_string()));
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;
        Ok(Self::Json(value))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<SubmissionBody, AppError> {
    let mut fields = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e.status(), e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            // An untouched `<input type="file">` still posts an empty part.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            files.push(Attachment::new(name, file_name, content_type, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            fields.push((name, value));
        }
    }

    tracing::debug!(fields = fields.len(), files = files.len(), "Multipart body read");
    Ok(SubmissionBody::Parts { fields, files })
}

fn body_error(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(text)
    }
}
