//! Brevo (formerly Sendinblue) API client.
//!
//! Implements [`MailProvider`] on top of the Brevo v3 REST API: contacts,
//! list membership and transactional email.

mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use brightpath_core::{ContactId, Email, ListId};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use secrecy::ExposeSecret;
use tracing::instrument;

use self::types::{
    AddToListRequest, AttachmentPayload, ContactResponse, CreateContactRequest,
    CreateContactResponse, ErrorResponse, Party, SendEmailRequest, SendEmailResponse,
    UpdateContactRequest,
};
use super::provider::{
    ContactInput, ContactRecord, EmailBody, MailProvider, Mailbox, OutgoingEmail, ProviderError,
};
use crate::config::BrevoConfig;

/// Message fragment Brevo returns when every email is already a member.
const ALREADY_IN_LIST: &str = "already in list";

/// Brevo API client.
///
/// Cheap to clone; the underlying HTTP connection pool is shared.
#[derive(Clone)]
pub struct BrevoClient {
    inner: Arc<BrevoClientInner>,
}

struct BrevoClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for BrevoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoClient")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl BrevoClient {
    /// Create a new Brevo API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BrevoConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| ProviderError::Parse(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("api-key", api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            inner: Arc::new(BrevoClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn contact_url(&self, email: &Email) -> String {
        self.url(&format!("/contacts/{}", urlencoding::encode(email.as_str())))
    }
}

#[async_trait]
impl MailProvider for BrevoClient {
    fn name(&self) -> &'static str {
        "brevo"
    }

    #[instrument(skip(self, contact), fields(email = %contact.email))]
    async fn create_contact(
        &self,
        contact: &ContactInput,
    ) -> Result<Option<ContactId>, ProviderError> {
        let body = CreateContactRequest {
            email: contact.email.to_string(),
            attributes: contact.attributes.clone(),
            list_ids: list_ids(&contact.list_ids),
            update_enabled: true,
        };

        let response = self
            .inner
            .client
            .post(self.url("/contacts"))
            .json(&body)
            .send()
            .await?;
        let response = check(response).await?;

        // 204 means an existing contact was updated; no id is returned.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let created: CreateContactResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(Some(ContactId::new(created.id)))
    }

    #[instrument(skip(self, contact), fields(email = %contact.email))]
    async fn update_contact(&self, contact: &ContactInput) -> Result<(), ProviderError> {
        let body = UpdateContactRequest {
            attributes: contact.attributes.clone(),
            list_ids: list_ids(&contact.list_ids),
        };

        let response = self
            .inner
            .client
            .put(self.contact_url(&contact.email))
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, emails), fields(count = emails.len()))]
    async fn add_to_list(&self, list_id: ListId, emails: &[Email]) -> Result<(), ProviderError> {
        let body = AddToListRequest {
            emails: emails.iter().map(ToString::to_string).collect(),
        };

        let response = self
            .inner
            .client
            .post(self.url(&format!("/contacts/lists/{list_id}/contacts/add")))
            .json(&body)
            .send()
            .await?;

        match check(response).await {
            Ok(_) => Ok(()),
            Err(ProviderError::Api { status: 400, message })
                if message.to_lowercase().contains(ALREADY_IN_LIST) =>
            {
                tracing::debug!(%list_id, "Contacts already in list");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn get_contact(&self, email: &Email) -> Result<Option<ContactRecord>, ProviderError> {
        let response = self
            .inner
            .client
            .get(self.contact_url(email))
            .send()
            .await?;

        let response = match check(response).await {
            Ok(response) => response,
            Err(ProviderError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let contact: ContactResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let email = match contact.email.as_deref().map(Email::parse) {
            Some(Ok(parsed)) => parsed,
            _ => email.clone(),
        };
        Ok(Some(ContactRecord {
            id: contact.id.map(ContactId::new),
            email,
            list_ids: contact.list_ids.into_iter().map(ListId::new).collect(),
            attributes: contact.attributes,
        }))
    }

    #[instrument(skip(self, email), fields(recipients = email.to.len(), template = email.body.is_template()))]
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ProviderError> {
        if email.to.is_empty() {
            return Err(ProviderError::Rejected("no recipients".to_string()));
        }

        let mut body = SendEmailRequest {
            sender: party(&email.sender),
            to: email.to.iter().map(party).collect(),
            reply_to: email.reply_to.as_ref().map(party),
            subject: None,
            html_content: None,
            text_content: None,
            template_id: None,
            params: None,
            attachment: email
                .attachments
                .iter()
                .map(|a| AttachmentPayload {
                    name: a.file_name.clone(),
                    content: BASE64.encode(&a.bytes),
                })
                .collect(),
        };
        match &email.body {
            EmailBody::Content {
                subject,
                text,
                html,
            } => {
                body.subject = Some(subject.clone());
                body.text_content = Some(text.clone());
                body.html_content.clone_from(html);
            }
            EmailBody::Template {
                id,
                params,
                subject,
            } => {
                body.template_id = Some(id.as_i64());
                body.params = (!params.is_empty()).then(|| params.clone());
                body.subject.clone_from(subject);
            }
        }

        let response = self
            .inner
            .client
            .post(self.url("/smtp/email"))
            .json(&body)
            .send()
            .await?;
        let response = check(response).await?;

        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(sent.message_id)
    }
}

fn list_ids(ids: &[ListId]) -> Vec<i64> {
    ids.iter().map(ListId::as_i64).collect()
}

fn party(mailbox: &Mailbox) -> Party {
    Party {
        email: mailbox.email.to_string(),
        name: mailbox.name.clone(),
    }
}

/// Pass successful responses through and map error statuses to
/// [`ProviderError`].
async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ProviderError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = ["retry-after", "x-sib-ratelimit-reset"]
                .iter()
                .find_map(|name| response.headers().get(*name))
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok());
            Err(ProviderError::RateLimited { retry_after })
        }
        _ => {
            let url = response.url().path().to_string();
            let text = response.text().await.unwrap_or_default();
            let body: ErrorResponse = serde_json::from_str(&text).unwrap_or_default();
            let message = body.message.unwrap_or(text);
            if status == StatusCode::NOT_FOUND {
                return Err(ProviderError::NotFound(url));
            }
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: body
                    .code
                    .map_or_else(|| message.clone(), |code| format!("{code}: {message}")),
            })
        }
    }
}
