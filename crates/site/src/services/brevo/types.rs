//! Brevo v3 API request and response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `POST /contacts`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub email: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list_ids: Vec<i64>,
    pub update_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactResponse {
    pub id: i64,
}

/// `PUT /contacts/{identifier}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list_ids: Vec<i64>,
}

/// `POST /contacts/lists/{listId}/contacts/add`
#[derive(Debug, Serialize)]
pub struct AddToListRequest {
    pub emails: Vec<String>,
}

/// `GET /contacts/{identifier}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: Option<i64>,
    pub email: Option<String>,
    #[serde(default)]
    pub list_ids: Vec<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct Party {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttachmentPayload {
    pub name: String,
    /// Base64-encoded file contents.
    pub content: String,
}

/// `POST /smtp/email`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub sender: Party,
    pub to: Vec<Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachment: Vec<AttachmentPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub message_id: String,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
}
