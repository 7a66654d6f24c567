//! Per-form settings from the environment.
//!
//! For every form prefix (`TRIAL`, `CONTACT`, `CALLBACK`, `STUDENT`,
//! `TEACHER`, `NEWSLETTER`):
//!
//! - `{PREFIX}_NOTIFY_EMAIL` - Staff recipient(s), comma-separated
//! - `{PREFIX}_NOTIFY_EMAIL_SECONDARY` - Additional staff recipient(s)
//! - `{PREFIX}_LIST_ID` - Provider list for submitters
//! - `{PREFIX}_ADMIN_TEMPLATE_ID` - Provider template for the staff notification
//! - `{PREFIX}_CONFIRM_TEMPLATE_ID` - Provider template for the submitter confirmation
//!
//! plus `MAIL_SENDER_EMAIL` and `MAIL_SENDER_NAME`, shared by all forms.
//!
//! Unset values stay `None`. Whether a form can run without them is
//! decided per request, so one misconfigured form never stops the server.

use std::collections::BTreeMap;

use brightpath_core::{Email, FormType, ListId, TemplateId};

use super::descriptor::descriptor;
use crate::config::{ConfigError, get_optional_env, parse_value};
use crate::services::Mailbox;

const DEFAULT_SENDER_NAME: &str = "Brightpath Academy";

/// Settings for one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSettings {
    /// Staff recipients, primary first, without duplicates.
    pub notify: Vec<Email>,
    pub list_id: Option<ListId>,
    pub admin_template_id: Option<TemplateId>,
    pub confirm_template_id: Option<TemplateId>,
}

static UNCONFIGURED: FormSettings = FormSettings {
    notify: Vec::new(),
    list_id: None,
    admin_template_id: None,
    confirm_template_id: None,
};

/// Sender and per-form settings.
#[derive(Debug, Clone, Default)]
pub struct FormsConfig {
    sender: Option<Mailbox>,
    forms: BTreeMap<FormType, FormSettings>,
}

impl FormsConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(get_optional_env)
    }

    /// Load using `lookup` to read each key. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sender = read("MAIL_SENDER_EMAIL")
            .map(|value| parse_email("MAIL_SENDER_EMAIL", &value))
            .transpose()?
            .map(|email| {
                let name = read("MAIL_SENDER_NAME").unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());
                Mailbox::new(email, Some(name))
            });

        let mut forms = BTreeMap::new();
        for form in FormType::ALL {
            let d = descriptor(form);
            let mut notify: Vec<Email> = Vec::new();
            for suffix in ["NOTIFY_EMAIL", "NOTIFY_EMAIL_SECONDARY"] {
                let key = d.env_key(suffix);
                if let Some(value) = read(&key) {
                    for part in value.split(',').filter(|p| !p.trim().is_empty()) {
                        let email = parse_email(&key, part)?;
                        if !notify.contains(&email) {
                            notify.push(email);
                        }
                    }
                }
            }
            let id = |suffix: &str| -> Result<Option<i64>, ConfigError> {
                let key = d.env_key(suffix);
                read(&key).map(|v| parse_value::<i64>(&key, &v)).transpose()
            };
            let settings = FormSettings {
                notify,
                list_id: id("LIST_ID")?.map(ListId::new),
                admin_template_id: id("ADMIN_TEMPLATE_ID")?.map(TemplateId::new),
                confirm_template_id: id("CONFIRM_TEMPLATE_ID")?.map(TemplateId::new),
            };
            forms.insert(form, settings);
        }

        Ok(Self { sender, forms })
    }

    /// Address every site email is sent from.
    #[must_use]
    pub const fn sender(&self) -> Option<&Mailbox> {
        self.sender.as_ref()
    }

    /// Settings for one form.
    #[must_use]
    pub fn settings(&self, form: FormType) -> &FormSettings {
        self.forms.get(&form).unwrap_or(&UNCONFIGURED)
    }

    #[must_use]
    pub fn with_sender(mut self, sender: Mailbox) -> Self {
        self.sender = Some(sender);
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: FormType, settings: FormSettings) -> Self {
        self.forms.insert(form, settings);
        self
    }
}

fn parse_email(key: &str, value: &str) -> Result<Email, ConfigError> {
    Email::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<FormsConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        FormsConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_empty_environment() {
        let config = load(&[]).unwrap();
        assert!(config.sender().is_none());
        assert_eq!(config.settings(FormType::Trial), &FormSettings::default());
    }

    #[test]
    fn test_reads_prefixed_keys() {
        let config = load(&[
            ("MAIL_SENDER_EMAIL", "hello@brightpath.academy"),
            ("TRIAL_NOTIFY_EMAIL", "Admissions@Brightpath.Academy, ops@brightpath.academy"),
            ("TRIAL_NOTIFY_EMAIL_SECONDARY", "ops@brightpath.academy"),
            ("TRIAL_LIST_ID", "12"),
            ("TRIAL_ADMIN_TEMPLATE_ID", "4"),
            ("NEWSLETTER_LIST_ID", " 3 "),
        ])
        .unwrap();

        let sender = config.sender().unwrap();
        assert_eq!(sender.name.as_deref(), Some(DEFAULT_SENDER_NAME));

        let trial = config.settings(FormType::Trial);
        assert_eq!(trial.notify.len(), 2);
        assert_eq!(trial.notify[0].as_str(), "admissions@brightpath.academy");
        assert_eq!(trial.list_id, Some(ListId::new(12)));
        assert_eq!(trial.admin_template_id, Some(TemplateId::new(4)));
        assert_eq!(trial.confirm_template_id, None);
        assert_eq!(
            config.settings(FormType::Newsletter).list_id,
            Some(ListId::new(3))
        );
    }

    #[test]
    fn test_malformed_values_name_the_key() {
        let err = load(&[("CONTACT_NOTIFY_EMAIL", "not-an-email")]).unwrap_err();
        assert!(err.to_string().contains("CONTACT_NOTIFY_EMAIL"));

        let err = load(&[("STUDENT_LIST_ID", "abc")]).unwrap_err();
        assert!(err.to_string().contains("STUDENT_LIST_ID"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[("MAIL_SENDER_EMAIL", "  "), ("CALLBACK_LIST_ID", "")]).unwrap();
        assert!(config.sender().is_none());
        assert_eq!(config.settings(FormType::Callback).list_id, None);
    }
}
