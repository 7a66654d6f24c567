//! Outbound integration wrapper.
//!
//! [`Mailer`] is the only code that calls the [`MailProvider`]. Provider
//! errors are logged here and returned as [`IntegrationError`] values; none
//! of them ever reaches the HTTP client.

use std::collections::BTreeMap;
use std::sync::Arc;

use brightpath_core::forms::Attachment;
use brightpath_core::{ContactId, Email, FormType, ListId, Phone, TemplateId, split_name};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;

use super::provider::{
    ContactInput, ContactRecord, EmailBody, MailProvider, Mailbox, OutgoingEmail, ProviderError,
};

/// A failed outbound operation.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("{email} is still missing from lists {missing:?} after retries")]
    ListMembershipUnconfirmed { email: Email, missing: Vec<ListId> },

    #[error("email has no recipients")]
    NoRecipients,
}

/// Who to store as a contact and what to store about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<Phone>,
    pub country: Option<String>,
    /// Where the contact came from, e.g. the form type.
    pub source: Option<String>,
}

impl ContactDetails {
    /// Provider attributes for this contact. Absent values are left out so
    /// an update never blanks an existing attribute.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        let mut attributes = BTreeMap::new();
        if let Some(full_name) = &self.full_name {
            let (first, last) = split_name(full_name);
            if !first.is_empty() {
                attributes.insert("FIRSTNAME".to_string(), Value::String(first));
            }
            if let Some(last) = last {
                attributes.insert("LASTNAME".to_string(), Value::String(last));
            }
        }
        if let Some(phone) = &self.phone {
            attributes.insert("SMS".to_string(), Value::String(phone.to_string()));
        }
        if let Some(country) = &self.country {
            attributes.insert("COUNTRY".to_string(), Value::String(country.clone()));
        }
        if let Some(source) = &self.source {
            attributes.insert("SOURCE".to_string(), Value::String(source.clone()));
        }
        attributes
    }

    fn input(&self, list_ids: &[ListId]) -> ContactInput {
        ContactInput {
            email: self.email.clone(),
            attributes: self.attributes(),
            list_ids: list_ids.to_vec(),
        }
    }
}

/// Which step of the upsert chain confirmed list membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Confirmation {
    /// No lists were requested, nothing to confirm.
    NotRequired,
    Upsert,
    AddToList,
    Update,
}

/// Result of a successful contact upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactReceipt {
    pub contact_id: Option<ContactId>,
    pub list_ids: Vec<ListId>,
    pub confirmed_by: Confirmation,
}

/// Content built by the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Outcome of one best-effort side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EffectStatus {
    Sent { message_id: String },
    /// The template send failed and the hand-built email went out instead.
    SentFallback { message_id: String },
    Skipped { reason: &'static str },
    Failed { error: String },
}

impl EffectStatus {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Sent { .. } | Self::SentFallback { .. })
    }
}

/// A notification or confirmation for one form submission.
///
/// The template is tried first when configured; `fallback` is what gets sent
/// when there is no template or the template send fails.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub form_type: FormType,
    pub sender: Mailbox,
    pub to: Vec<Mailbox>,
    pub reply_to: Option<Mailbox>,
    pub template_id: Option<TemplateId>,
    pub params: Map<String, Value>,
    pub subject_override: Option<String>,
    pub fallback: RenderedEmail,
    pub attachments: Vec<Attachment>,
}

/// Wrapper around the configured provider.
#[derive(Clone)]
pub struct Mailer {
    provider: Arc<dyn MailProvider>,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl Mailer {
    #[must_use]
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Create or update a contact and make sure it belongs to `list_ids`.
    ///
    /// Membership is read back after the upsert. Missing lists are retried
    /// with a direct add-to-list call and then with an update carrying the
    /// list ids, each followed by another read. Repeating the call for the
    /// same email never duplicates membership.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Provider`] if the initial upsert fails and
    /// [`IntegrationError::ListMembershipUnconfirmed`] if membership still
    /// cannot be confirmed after both retries.
    #[instrument(skip(self, contact), fields(email = %contact.email, provider = self.provider.name()))]
    pub async fn upsert_contact(
        &self,
        contact: &ContactDetails,
        list_ids: &[ListId],
    ) -> Result<ContactReceipt, IntegrationError> {
        let input = contact.input(list_ids);
        let created_id = self
            .provider
            .create_contact(&input)
            .await
            .map_err(|source| failure("create_contact", source))?;

        if list_ids.is_empty() {
            return Ok(ContactReceipt {
                contact_id: created_id,
                list_ids: Vec::new(),
                confirmed_by: Confirmation::NotRequired,
            });
        }

        let (record, missing) = self.verify(&contact.email, list_ids).await;
        if missing.is_empty() {
            return Ok(receipt(created_id, record, list_ids, Confirmation::Upsert));
        }

        tracing::warn!(missing = ?missing, "Contact not in list after upsert, adding directly");
        for list_id in &missing {
            if let Err(source) = self
                .provider
                .add_to_list(*list_id, std::slice::from_ref(&contact.email))
                .await
            {
                failure("add_to_list", source);
            }
        }
        let (record, missing) = self.verify(&contact.email, list_ids).await;
        if missing.is_empty() {
            return Ok(receipt(created_id, record, list_ids, Confirmation::AddToList));
        }

        tracing::warn!(missing = ?missing, "Contact still not in list, retrying as update");
        if let Err(source) = self.provider.update_contact(&input).await {
            failure("update_contact", source);
        }
        let (record, missing) = self.verify(&contact.email, list_ids).await;
        if missing.is_empty() {
            return Ok(receipt(created_id, record, list_ids, Confirmation::Update));
        }

        let error = IntegrationError::ListMembershipUnconfirmed {
            email: contact.email.clone(),
            missing,
        };
        tracing::error!(error = %error, "Giving up on list membership");
        Err(error)
    }

    /// Read the contact back and report which of `list_ids` it is missing
    /// from. A failed read counts every list as missing.
    async fn verify(&self, email: &Email, list_ids: &[ListId]) -> (Option<ContactRecord>, Vec<ListId>) {
        match self.provider.get_contact(email).await {
            Ok(Some(record)) => {
                let missing = list_ids
                    .iter()
                    .copied()
                    .filter(|id| !record.is_in_list(*id))
                    .collect();
                (Some(record), missing)
            }
            Ok(None) => (None, list_ids.to_vec()),
            Err(source) => {
                failure("get_contact", source);
                (None, list_ids.to_vec())
            }
        }
    }

    /// Whether `email` is currently a member of `list_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider lookup fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn is_in_list(&self, email: &Email, list_id: ListId) -> Result<bool, IntegrationError> {
        let record = self
            .provider
            .get_contact(email)
            .await
            .map_err(|source| failure("get_contact", source))?;
        Ok(record.is_some_and(|r| r.is_in_list(list_id)))
    }

    /// Send an email whose content was built by the site.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no recipients or the provider rejects
    /// the send.
    #[instrument(skip_all, fields(recipients = to.len()))]
    pub async fn send_email(
        &self,
        sender: &Mailbox,
        to: &[Mailbox],
        reply_to: Option<&Mailbox>,
        content: &RenderedEmail,
        attachments: &[Attachment],
    ) -> Result<String, IntegrationError> {
        let email = OutgoingEmail {
            sender: sender.clone(),
            to: to.to_vec(),
            reply_to: reply_to.cloned(),
            body: EmailBody::Content {
                subject: content.subject.clone(),
                text: content.text.clone(),
                html: content.html.clone(),
            },
            attachments: attachments.to_vec(),
        };
        self.deliver("send_email", &email).await
    }

    /// Send a provider-hosted template filled with `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no recipients or the provider rejects
    /// the send.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(recipients = to.len(), template_id = %template_id))]
    pub async fn send_template_email(
        &self,
        sender: &Mailbox,
        to: &[Mailbox],
        template_id: TemplateId,
        params: &Map<String, Value>,
        subject_override: Option<&str>,
        reply_to: Option<&Mailbox>,
        attachments: &[Attachment],
    ) -> Result<String, IntegrationError> {
        let email = OutgoingEmail {
            sender: sender.clone(),
            to: to.to_vec(),
            reply_to: reply_to.cloned(),
            body: EmailBody::Template {
                id: template_id,
                params: params.clone(),
                subject: subject_override.map(str::to_string),
            },
            attachments: attachments.to_vec(),
        };
        self.deliver("send_template_email", &email).await
    }

    async fn deliver(
        &self,
        operation: &'static str,
        email: &OutgoingEmail,
    ) -> Result<String, IntegrationError> {
        if email.to.is_empty() {
            return Err(logged(operation, IntegrationError::NoRecipients));
        }
        self.provider
            .send(email)
            .await
            .map_err(|source| failure(operation, source))
    }

    /// Tell the site's staff about a submission.
    pub async fn notify_admins(&self, dispatch: &Dispatch) -> EffectStatus {
        self.dispatch("admin_notification", dispatch).await
    }

    /// Acknowledge a submission to the person who sent it.
    pub async fn confirm_submitter(&self, dispatch: &Dispatch) -> EffectStatus {
        self.dispatch("submitter_confirmation", dispatch).await
    }

    /// Template first, then exactly one fallback send to the same
    /// recipients if the template send fails.
    #[instrument(skip(self, dispatch), fields(form_type = %dispatch.form_type, recipients = dispatch.to.len()))]
    async fn dispatch(&self, effect: &'static str, dispatch: &Dispatch) -> EffectStatus {
        if dispatch.to.is_empty() {
            return EffectStatus::Skipped {
                reason: "no recipients",
            };
        }

        if let Some(template_id) = dispatch.template_id {
            match self
                .send_template_email(
                    &dispatch.sender,
                    &dispatch.to,
                    template_id,
                    &dispatch.params,
                    dispatch.subject_override.as_deref(),
                    dispatch.reply_to.as_ref(),
                    &dispatch.attachments,
                )
                .await
            {
                Ok(message_id) => return EffectStatus::Sent { message_id },
                Err(error) => {
                    tracing::warn!(effect, error = %error, "Template send failed, sending fallback email");
                }
            }
            return match self.send_fallback(dispatch).await {
                Ok(message_id) => EffectStatus::SentFallback { message_id },
                Err(error) => {
                    tracing::error!(effect, error = %error, "Fallback email failed");
                    EffectStatus::Failed {
                        error: error.to_string(),
                    }
                }
            };
        }

        match self.send_fallback(dispatch).await {
            Ok(message_id) => EffectStatus::Sent { message_id },
            Err(error) => {
                tracing::error!(effect, error = %error, "Email send failed");
                EffectStatus::Failed {
                    error: error.to_string(),
                }
            }
        }
    }

    async fn send_fallback(&self, dispatch: &Dispatch) -> Result<String, IntegrationError> {
        self.send_email(
            &dispatch.sender,
            &dispatch.to,
            dispatch.reply_to.as_ref(),
            &dispatch.fallback,
            &dispatch.attachments,
        )
        .await
    }
}

fn receipt(
    created_id: Option<ContactId>,
    record: Option<ContactRecord>,
    list_ids: &[ListId],
    confirmed_by: Confirmation,
) -> ContactReceipt {
    ContactReceipt {
        contact_id: created_id.or_else(|| record.and_then(|r| r.id)),
        list_ids: list_ids.to_vec(),
        confirmed_by,
    }
}

/// Log a provider failure and wrap it.
fn failure(operation: &'static str, source: ProviderError) -> IntegrationError {
    logged(operation, IntegrationError::Provider { operation, source })
}

fn logged(operation: &'static str, error: IntegrationError) -> IntegrationError {
    tracing::warn!(operation, error = %error, "Outbound call failed");
    error
}
