//! Newsletter subscription and diagnostics.
//!
//! `POST` subscribes through the shared form pipeline. `GET` answers two
//! read-only questions used when checking a deployment by hand: is the
//! newsletter configured (`action=info`), and is a given email on the list
//! (`action=verify`).

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use brightpath_core::{Email, FormType, ListId, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::forms::{FormResponse, submit};
use crate::error::{AppError, Result};
use crate::forms::{SubmissionBody, descriptor};
use crate::state::AppState;

/// Subscribe to the newsletter.
///
/// Replies `{ ok, message, contactId?, listId? }`. The contact id is absent
/// when the provider did not report one or the upsert failed.
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    body: SubmissionBody,
) -> Result<Json<FormResponse>> {
    let receipt = submit(&state, body, Some(FormType::Newsletter)).await?;
    Ok(Json(FormResponse::from_receipt(&receipt).with_contact(&receipt)))
}

/// Query string of `GET /api/newsletter`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterQuery {
    pub action: Option<String>,
    pub email: Option<String>,
    pub list_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub ok: bool,
    pub email: Email,
    pub list_id: ListId,
    pub is_in_list: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub ok: bool,
    pub provider: &'static str,
    pub sender_configured: bool,
    pub list_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
}

/// `GET /api/newsletter`: dispatch on `action`.
pub async fn query(
    State(state): State<AppState>,
    query: std::result::Result<Query<NewsletterQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let action = query
        .action
        .as_deref()
        .map(|a| a.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match action.as_str() {
        "" | "info" => Ok(Json(info(&state)).into_response()),
        "verify" => Ok(Json(verify(&state, &query).await?).into_response()),
        other => Err(AppError::BadRequest(format!(
            "Unknown action '{other}', expected info or verify"
        ))),
    }
}

fn info(state: &AppState) -> InfoResponse {
    let list_id = state.forms().settings(FormType::Newsletter).list_id;
    InfoResponse {
        ok: true,
        provider: state.mailer().provider_name(),
        sender_configured: state.forms().sender().is_some(),
        list_configured: list_id.is_some(),
        list_id,
    }
}

/// Ask the provider whether `email` is on the list.
#[instrument(skip_all, fields(list_id = ?query.list_id))]
async fn verify(state: &AppState, query: &NewsletterQuery) -> Result<VerifyResponse> {
    let raw = query
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ValidationError::single("email", "is required"))?;
    let email = Email::parse(raw).map_err(|e| ValidationError::single("email", e.to_string()))?;

    let list_id = match query.list_id {
        Some(id) => ListId::new(id),
        None => state
            .forms()
            .settings(FormType::Newsletter)
            .list_id
            .ok_or_else(|| AppError::ConfigurationMissing {
                key: descriptor(FormType::Newsletter).env_key("LIST_ID"),
                status: state.config().config_missing_status,
            })?,
    };

    let is_in_list = state
        .mailer()
        .is_in_list(&email, list_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(email = %email, list_id = %list_id, is_in_list, "Newsletter membership checked");
    Ok(VerifyResponse {
        ok: true,
        email,
        list_id,
        is_in_list,
    })
}
