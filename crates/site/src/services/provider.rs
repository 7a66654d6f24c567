//! Mail/CRM provider abstraction.
//!
//! Everything the site needs from the email provider goes through
//! [`MailProvider`]. The production implementation is
//! [`BrevoClient`](super::BrevoClient); [`InMemoryProvider`](super::InMemoryProvider)
//! backs local development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use brightpath_core::forms::Attachment;
use brightpath_core::{ContactId, Email, ListId, TemplateId};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned by a mail provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the provider.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// The API key was rejected.
    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The request was refused before reaching the provider.
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// A named address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub email: Email,
    pub name: Option<String>,
}

impl Mailbox {
    #[must_use]
    pub const fn new(email: Email, name: Option<String>) -> Self {
        Self { email, name }
    }
}

impl From<Email> for Mailbox {
    fn from(email: Email) -> Self {
        Self { email, name: None }
    }
}

/// Contact data for a create-or-update call.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInput {
    pub email: Email,
    /// Provider attributes (`FIRSTNAME`, `LASTNAME`, `SMS`, ...).
    pub attributes: BTreeMap<String, Value>,
    /// Lists the contact should belong to.
    pub list_ids: Vec<ListId>,
}

/// A contact as the provider knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRecord {
    pub id: Option<ContactId>,
    pub email: Email,
    pub list_ids: Vec<ListId>,
    pub attributes: BTreeMap<String, Value>,
}

impl ContactRecord {
    #[must_use]
    pub fn is_in_list(&self, list_id: ListId) -> bool {
        self.list_ids.contains(&list_id)
    }
}

/// What an outgoing email contains.
#[derive(Debug, Clone, PartialEq)]
pub enum EmailBody {
    /// Content built by the site.
    Content {
        subject: String,
        text: String,
        html: Option<String>,
    },
    /// A template hosted by the provider, filled with `params`.
    Template {
        id: TemplateId,
        params: Map<String, Value>,
        subject: Option<String>,
    },
}

impl EmailBody {
    #[must_use]
    pub const fn is_template(&self) -> bool {
        matches!(self, Self::Template { .. })
    }
}

/// A transactional email ready to hand to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub sender: Mailbox,
    pub to: Vec<Mailbox>,
    pub reply_to: Option<Mailbox>,
    pub body: EmailBody,
    pub attachments: Vec<Attachment>,
}

/// The operations the site needs from an email/CRM provider.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Create a contact, or update it if the email already exists.
    ///
    /// Returns the contact id when the provider reports one.
    async fn create_contact(&self, contact: &ContactInput)
    -> Result<Option<ContactId>, ProviderError>;

    /// Update an existing contact's attributes and list memberships.
    async fn update_contact(&self, contact: &ContactInput) -> Result<(), ProviderError>;

    /// Add existing contacts to a list.
    async fn add_to_list(&self, list_id: ListId, emails: &[Email]) -> Result<(), ProviderError>;

    /// Look up a contact. `Ok(None)` means the provider has no such contact.
    async fn get_contact(&self, email: &Email) -> Result<Option<ContactRecord>, ProviderError>;

    /// Send a transactional email and return the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ProviderError>;
}
