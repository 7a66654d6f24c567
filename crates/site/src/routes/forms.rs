//! Form endpoint handlers.
//!
//! Every endpoint runs the same pipeline; they differ only in which form
//! type the route pins and which fields the JSON reply carries.

use axum::{Json, extract::State};
use brightpath_core::{ContactId, FormType, ListId};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::forms::{FormReceipt, SubmissionBody, check_config, process};
use crate::state::AppState;

/// JSON reply for a processed submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_type: Option<FormType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
}

impl FormResponse {
    /// The reply a form-specific route sends: `ok` and the form's message.
    pub(crate) const fn from_receipt(receipt: &FormReceipt) -> Self {
        Self {
            ok: true,
            form_type: None,
            message: receipt.message,
            contact_id: None,
            list_id: None,
        }
    }

    /// Include the contact id and list id, as the newsletter does.
    pub(crate) const fn with_contact(mut self, receipt: &FormReceipt) -> Self {
        self.contact_id = receipt.contact_id;
        self.list_id = receipt.list_id;
        self
    }
}

/// Validate and process a body for one form type.
pub(crate) async fn submit(
    state: &AppState,
    body: SubmissionBody,
    route_form: Option<FormType>,
) -> Result<FormReceipt> {
    let submission = body.into_submission(route_form)?;
    process(state, submission).await
}

async fn submit_route(state: &AppState, body: SubmissionBody, form: FormType) -> Result<Json<FormResponse>> {
    let receipt = submit(state, body, Some(form)).await?;
    Ok(Json(FormResponse::from_receipt(&receipt)))
}

/// Free trial request. Replies `{ ok: true }`.
#[instrument(skip_all)]
pub async fn trial(State(state): State<AppState>, body: SubmissionBody) -> Result<Json<FormResponse>> {
    submit_route(&state, body, FormType::Trial).await
}

/// Contact message.
#[instrument(skip_all)]
pub async fn contact(State(state): State<AppState>, body: SubmissionBody) -> Result<Json<FormResponse>> {
    submit_route(&state, body, FormType::Contact).await
}

/// Callback request.
#[instrument(skip_all)]
pub async fn callback(State(state): State<AppState>, body: SubmissionBody) -> Result<Json<FormResponse>> {
    submit_route(&state, body, FormType::Callback).await
}

/// Student enrolment.
#[instrument(skip_all)]
pub async fn student_form(
    State(state): State<AppState>,
    body: SubmissionBody,
) -> Result<Json<FormResponse>> {
    submit_route(&state, body, FormType::StudentForm).await
}

/// Teacher application with CV upload. Replies `{ ok: true }`.
#[instrument(skip_all)]
pub async fn teacher_apply(
    State(state): State<AppState>,
    body: SubmissionBody,
) -> Result<Json<FormResponse>> {
    submit_route(&state, body, FormType::TeacherApply).await
}

/// Any form, selected by the body's `formType`.
#[instrument(skip_all)]
pub async fn dispatch(State(state): State<AppState>, body: SubmissionBody) -> Result<Json<FormResponse>> {
    let receipt = submit(&state, body, None).await?;
    let mut response = FormResponse::from_receipt(&receipt);
    response.form_type = Some(receipt.form_type);
    if receipt.form_type == FormType::Newsletter {
        response = response.with_contact(&receipt);
    }
    Ok(Json(response))
}

fn probe(state: &AppState, form: FormType) -> Json<Value> {
    Json(json!({
        "ok": true,
        "formType": form,
        "configured": check_config(state, form).is_ok(),
    }))
}

/// Whether the contact form can accept submissions.
pub async fn contact_probe(State(state): State<AppState>) -> Json<Value> {
    probe(&state, FormType::Contact)
}

/// Whether the callback form can accept submissions.
pub async fn callback_probe(State(state): State<AppState>) -> Json<Value> {
    probe(&state, FormType::Callback)
}

/// Form types the dispatcher accepts.
pub async fn list_forms(State(state): State<AppState>) -> Json<Value> {
    let forms: Vec<Value> = FormType::ALL
        .into_iter()
        .map(|form| {
            json!({
                "formType": form,
                "label": form.label(),
                "acceptsFiles": form.accepts_files(),
                "configured": check_config(&state, form).is_ok(),
            })
        })
        .collect();
    Json(json!({ "ok": true, "formTypes": forms }))
}
