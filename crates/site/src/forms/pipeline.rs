//! The submission pipeline shared by every form endpoint.
//!
//! ```text
//! validated Submission
//!   -> configuration guard        (ConfigurationMissing, no provider calls)
//!   -> admin notification         (best effort)
//!   -> submitter confirmation     (best effort, needs a submitter email)
//!   -> contact upsert into list   (best effort, needs a submitter email)
//!   -> FormReceipt
//! ```
//!
//! Side effects run one after another and their outcomes are only logged
//! and recorded in the receipt. Once the guard passes the request succeeds.

use brightpath_core::forms::FormData;
use brightpath_core::{ContactId, FormType, ListId, Submission};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::instrument;

use super::descriptor::{FormDescriptor, descriptor};
use super::render;
use super::settings::FormSettings;
use crate::error::AppError;
use crate::services::{ContactDetails, Dispatch, EffectStatus, Mailbox};
use crate::state::AppState;

/// What happened to the contact upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactStatus {
    Upserted { contact_id: Option<ContactId> },
    Skipped { reason: &'static str },
    Failed { error: String },
}

/// Outcome of one processed submission.
#[derive(Debug, Clone)]
pub struct FormReceipt {
    pub form_type: FormType,
    /// Message for the client, if the endpoint returns one.
    pub message: Option<&'static str>,
    pub contact_id: Option<ContactId>,
    pub list_id: Option<ListId>,
    pub admin: EffectStatus,
    pub confirmation: EffectStatus,
    pub contact: ContactStatus,
}

/// Check that everything `form` needs at request time is configured.
///
/// Returns the sender to use.
///
/// # Errors
///
/// Returns [`AppError::ConfigurationMissing`] naming the first missing key.
pub fn check_config(state: &AppState, form: FormType) -> Result<&Mailbox, AppError> {
    let d = descriptor(form);
    let settings = state.forms().settings(form);
    let missing = |key: String| AppError::ConfigurationMissing {
        key,
        status: state.config().config_missing_status,
    };

    let sender = state
        .forms()
        .sender()
        .ok_or_else(|| missing("MAIL_SENDER_EMAIL".to_string()))?;
    if d.requires_recipients && settings.notify.is_empty() {
        return Err(missing(d.env_key("NOTIFY_EMAIL")));
    }
    if d.requires_list && settings.list_id.is_none() {
        return Err(missing(d.env_key("LIST_ID")));
    }
    Ok(sender)
}

/// Run the side effects for a validated submission.
///
/// # Errors
///
/// Only the configuration guard can fail. Provider failures are logged and
/// recorded in the returned receipt.
#[instrument(skip_all, fields(form_type = %submission.form_type()))]
pub async fn process(state: &AppState, submission: Submission) -> Result<FormReceipt, AppError> {
    let form = submission.form_type();
    let d = descriptor(form);
    let sender = check_config(state, form)?;
    let settings = state.forms().settings(form);
    let mailer = state.mailer();

    let submitted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let params = template_params(&submission, &submitted_at);
    let submitter = submission.submitter_email().map(|email| Mailbox {
        email: email.clone(),
        name: submission.submitter_name().map(str::to_string),
    });

    let admin = mailer
        .notify_admins(&admin_dispatch(
            d,
            settings,
            sender,
            &submission,
            submitter.as_ref(),
            &params,
            &submitted_at,
        ))
        .await;
    log_effect("admin_notification", &admin);

    let confirmation = match &submitter {
        Some(to) => {
            let status = mailer
                .confirm_submitter(&Dispatch {
                    form_type: form,
                    sender: sender.clone(),
                    to: vec![to.clone()],
                    reply_to: None,
                    template_id: settings.confirm_template_id,
                    params: params.clone(),
                    subject_override: None,
                    fallback: render::confirmation(d, &submission),
                    attachments: Vec::new(),
                })
                .await;
            log_effect("submitter_confirmation", &status);
            status
        }
        None => EffectStatus::Skipped {
            reason: "no submitter email",
        },
    };

    let contact = match submission.submitter_email() {
        Some(email) => {
            let details = ContactDetails {
                email: email.clone(),
                full_name: submission.submitter_name().map(str::to_string),
                phone: submission.phone().cloned(),
                country: submission.country().map(str::to_string),
                source: Some(contact_source(&submission).to_string()),
            };
            let list_ids: Vec<ListId> = settings.list_id.into_iter().collect();
            match mailer.upsert_contact(&details, &list_ids).await {
                Ok(receipt) => ContactStatus::Upserted {
                    contact_id: receipt.contact_id,
                },
                Err(error) => ContactStatus::Failed {
                    error: error.to_string(),
                },
            }
        }
        None => ContactStatus::Skipped {
            reason: "no submitter email",
        },
    };

    let contact_id = match &contact {
        ContactStatus::Upserted { contact_id } => *contact_id,
        _ => None,
    };
    tracing::info!(
        admin = admin.is_delivered(),
        confirmation = confirmation.is_delivered(),
        contact = matches!(contact, ContactStatus::Upserted { .. }),
        "Form submission processed"
    );

    Ok(FormReceipt {
        form_type: form,
        message: d.success_message,
        contact_id,
        list_id: settings.list_id,
        admin,
        confirmation,
        contact,
    })
}

fn admin_dispatch(
    d: &FormDescriptor,
    settings: &FormSettings,
    sender: &Mailbox,
    submission: &Submission,
    submitter: Option<&Mailbox>,
    params: &Map<String, Value>,
    submitted_at: &str,
) -> Dispatch {
    let fallback = render::notification(d, submission, submitted_at);
    Dispatch {
        form_type: d.form_type,
        sender: sender.clone(),
        to: settings.notify.iter().cloned().map(Mailbox::from).collect(),
        reply_to: submitter.cloned(),
        template_id: settings.admin_template_id,
        params: params.clone(),
        subject_override: Some(fallback.subject.clone()),
        fallback,
        attachments: submission.attachments().to_vec(),
    }
}

/// Parameters handed to provider templates: every field by key, plus
/// `formType`, `submittedAt`, `submitterName` and `meta`.
fn template_params(submission: &Submission, submitted_at: &str) -> Map<String, Value> {
    let mut params = Map::new();
    for row in submission.fields() {
        params.insert(row.key.to_string(), Value::String(row.value));
    }
    params.insert(
        "formType".to_string(),
        Value::String(submission.form_type().as_str().to_string()),
    );
    params.insert(
        "submittedAt".to_string(),
        Value::String(submitted_at.to_string()),
    );
    if let Some(name) = submission.submitter_name() {
        params.insert("submitterName".to_string(), Value::String(name.to_string()));
    }
    let meta = submission
        .meta
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    params.insert("meta".to_string(), Value::Object(meta));
    params
}

/// Value stored in the contact's `SOURCE` attribute.
fn contact_source(submission: &Submission) -> &str {
    match &submission.data {
        FormData::Newsletter(signup) => signup
            .source
            .as_deref()
            .unwrap_or_else(|| submission.form_type().as_str()),
        _ => submission.form_type().as_str(),
    }
}

fn log_effect(effect: &'static str, status: &EffectStatus) {
    match status {
        EffectStatus::Sent { message_id } => {
            tracing::info!(effect, message_id = %message_id, "Email sent");
        }
        EffectStatus::SentFallback { message_id } => {
            tracing::warn!(effect, message_id = %message_id, "Fallback email sent");
        }
        EffectStatus::Skipped { reason } => {
            tracing::debug!(effect, reason, "Email skipped");
        }
        EffectStatus::Failed { error } => {
            tracing::warn!(effect, error = %error, "Email not delivered");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use brightpath_core::{Email, Envelope, TemplateId};
    use serde_json::json;

    use super::*;
    use crate::config::{ProviderConfig, SiteConfig};
    use crate::forms::FormsConfig;
    use crate::services::InMemoryProvider;
    use crate::services::memory::Operation;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn forms() -> FormsConfig {
        let mut config = FormsConfig::default()
            .with_sender(Mailbox::new(email("hello@brightpath.academy"), Some("Brightpath".into())));
        for form in FormType::ALL {
            config = config.with_form(
                form,
                FormSettings {
                    notify: vec![email("admissions@brightpath.academy")],
                    list_id: Some(ListId::new(7)),
                    ..FormSettings::default()
                },
            );
        }
        config
    }

    fn state(forms: FormsConfig, provider: &InMemoryProvider) -> AppState {
        let config = SiteConfig {
            forms,
            ..SiteConfig::local(ProviderConfig::Memory)
        };
        AppState::new(config, Arc::new(provider.clone()))
    }

    fn trial() -> Submission {
        Envelope::from_json(
            json!({
                "fullName": "Layla Mansour",
                "email": "layla@example.org",
                "phone": "447700183406",
                "course": "math",
                "preferredDays": ["monday", "wednesday"],
                "meta": { "utm_source": "spring" }
            }),
            Some(FormType::Trial),
        )
        .unwrap()
        .into_submission()
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_sender_stops_before_provider() {
        let provider = InMemoryProvider::new();
        let state = state(FormsConfig::default(), &provider);

        let err = process(&state, trial()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::ConfigurationMissing { ref key, status } if key == "MAIL_SENDER_EMAIL" && status == StatusCode::BAD_REQUEST
        ));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_recipients_names_form_key() {
        let provider = InMemoryProvider::new();
        let config = forms().with_form(FormType::Trial, FormSettings::default());
        let state = state(config, &provider);

        let err = check_config(&state, FormType::Trial).unwrap_err();
        assert!(matches!(err, AppError::ConfigurationMissing { ref key, .. } if key == "TRIAL_NOTIFY_EMAIL"));
    }

    #[tokio::test]
    async fn test_newsletter_needs_list_not_recipients() {
        let provider = InMemoryProvider::new();
        let config = forms().with_form(
            FormType::Newsletter,
            FormSettings {
                list_id: Some(ListId::new(3)),
                ..FormSettings::default()
            },
        );
        assert!(check_config(&state(config, &provider), FormType::Newsletter).is_ok());

        let config = forms().with_form(FormType::Newsletter, FormSettings::default());
        let err = check_config(&state(config, &provider), FormType::Newsletter).unwrap_err();
        assert!(matches!(err, AppError::ConfigurationMissing { ref key, .. } if key == "NEWSLETTER_LIST_ID"));
    }

    #[tokio::test]
    async fn test_runs_three_effects_in_order() {
        let provider = InMemoryProvider::new();
        let state = state(forms(), &provider);

        let receipt = process(&state, trial()).await.unwrap();
        assert!(receipt.admin.is_delivered());
        assert!(receipt.confirmation.is_delivered());
        assert!(matches!(receipt.contact, ContactStatus::Upserted { .. }));
        assert_eq!(receipt.list_id, Some(ListId::new(7)));

        let ops: Vec<Operation> = provider.calls().iter().map(|c| c.operation()).collect();
        assert_eq!(&ops[..3], &[Operation::SendContent, Operation::SendContent, Operation::CreateContact]);

        let sent = provider.sent();
        assert_eq!(sent[0].to[0].email.as_str(), "admissions@brightpath.academy");
        assert_eq!(sent[0].reply_to.as_ref().unwrap().email.as_str(), "layla@example.org");
        assert_eq!(sent[1].to[0].email.as_str(), "layla@example.org");

        let contact = provider.contact(&email("layla@example.org")).unwrap();
        assert!(contact.is_in_list(ListId::new(7)));
        assert_eq!(contact.attributes["SMS"], "+447700183406");
        assert_eq!(contact.attributes["SOURCE"], "trial");
    }

    #[tokio::test]
    async fn test_provider_failures_do_not_fail_request() {
        let provider = InMemoryProvider::new();
        for op in [
            Operation::SendContent,
            Operation::CreateContact,
            Operation::GetContact,
            Operation::AddToList,
            Operation::UpdateContact,
        ] {
            provider.fail_always(op);
        }
        let state = state(forms(), &provider);

        let receipt = process(&state, trial()).await.unwrap();
        assert!(matches!(receipt.admin, EffectStatus::Failed { .. }));
        assert!(matches!(receipt.confirmation, EffectStatus::Failed { .. }));
        assert!(matches!(receipt.contact, ContactStatus::Failed { .. }));
        assert_eq!(receipt.contact_id, None);
    }

    #[tokio::test]
    async fn test_template_params() {
        let provider = InMemoryProvider::new();
        let config = forms().with_form(
            FormType::Trial,
            FormSettings {
                notify: vec![email("admissions@brightpath.academy")],
                admin_template_id: Some(TemplateId::new(11)),
                ..FormSettings::default()
            },
        );
        let state = state(config, &provider);

        process(&state, trial()).await.unwrap();

        let sent = provider.sent();
        let crate::services::provider::EmailBody::Template { id, params, subject } = &sent[0].body
        else {
            panic!("expected a template send");
        };
        assert_eq!(*id, TemplateId::new(11));
        assert_eq!(params["email"], "layla@example.org");
        assert_eq!(params["formType"], "trial");
        assert_eq!(params["submitterName"], "Layla Mansour");
        assert_eq!(params["meta"]["utm_source"], "spring");
        assert!(params["submittedAt"].as_str().unwrap().ends_with('Z'));
        assert!(subject.as_deref().unwrap().contains("Layla Mansour"));
    }

    #[tokio::test]
    async fn test_callback_without_email_skips_confirmation_and_contact() {
        let provider = InMemoryProvider::new();
        let state = state(forms(), &provider);
        let submission = Envelope::from_json(
            json!({ "name": "Omar Said", "phone": "+971 50 123 4567" }),
            Some(FormType::Callback),
        )
        .unwrap()
        .into_submission()
        .unwrap();

        let receipt = process(&state, submission).await.unwrap();
        assert!(receipt.admin.is_delivered());
        assert!(matches!(receipt.confirmation, EffectStatus::Skipped { .. }));
        assert!(matches!(receipt.contact, ContactStatus::Skipped { .. }));
        assert_eq!(provider.calls().len(), 1);
    }
}
