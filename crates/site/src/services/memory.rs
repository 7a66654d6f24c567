//! In-memory provider.
//!
//! Selected with `MAIL_PROVIDER=memory` for local development, where it logs
//! what would have been sent. Tests use it as a recording double: every call
//! is kept in order, and failures can be scripted per operation.
//!
//! The call log is unbounded unless [`InMemoryProvider::with_call_log_limit`]
//! is set; the dev server sets it so a long session does not hold every
//! email body and upload.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use brightpath_core::{ContactId, Email, ListId};

use super::provider::{ContactInput, ContactRecord, MailProvider, OutgoingEmail, ProviderError};

/// A provider operation, used for call recording and scripted failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateContact,
    UpdateContact,
    AddToList,
    GetContact,
    SendTemplate,
    SendContent,
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateContact(ContactInput),
    UpdateContact(ContactInput),
    AddToList { list_id: ListId, emails: Vec<Email> },
    GetContact(Email),
    Send(OutgoingEmail),
}

impl Call {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::CreateContact(_) => Operation::CreateContact,
            Self::UpdateContact(_) => Operation::UpdateContact,
            Self::AddToList { .. } => Operation::AddToList,
            Self::GetContact(_) => Operation::GetContact,
            Self::Send(email) if email.body.is_template() => Operation::SendTemplate,
            Self::Send(_) => Operation::SendContent,
        }
    }
}

/// How list ids passed to `create_contact` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListBehavior {
    /// Memberships are applied on create.
    #[default]
    Apply,
    /// Memberships are silently dropped on create, as seen with some
    /// provider accounts. Only `add_to_list` and `update_contact` apply them.
    IgnoreOnCreate,
}

#[derive(Debug, Default)]
struct State {
    contacts: BTreeMap<Email, ContactRecord>,
    calls: VecDeque<Call>,
    call_log_limit: Option<usize>,
    failures: HashMap<Operation, usize>,
    next_id: i64,
    next_message: u64,
    list_behavior: ListBehavior,
}

/// Stateful provider that keeps contacts and sent mail in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    state: Arc<Mutex<State>>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the most recent `limit` calls.
    #[must_use]
    pub fn with_call_log_limit(self, limit: usize) -> Self {
        self.lock().call_log_limit = Some(limit);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the data is
        // still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make the next `times` calls of `operation` fail.
    pub fn fail_next(&self, operation: Operation, times: usize) {
        *self.lock().failures.entry(operation).or_default() += times;
    }

    /// Make every call of `operation` fail.
    pub fn fail_always(&self, operation: Operation) {
        self.lock().failures.insert(operation, usize::MAX);
    }

    pub fn set_list_behavior(&self, behavior: ListBehavior) {
        self.lock().list_behavior = behavior;
    }

    /// Seed a contact, as if it had been created earlier.
    pub fn insert_contact(&self, email: Email, list_ids: Vec<ListId>) {
        let mut state = self.lock();
        state.next_id += 1;
        let id = ContactId::new(state.next_id);
        state.contacts.insert(
            email.clone(),
            ContactRecord {
                id: Some(id),
                email,
                list_ids,
                attributes: BTreeMap::new(),
            },
        );
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.iter().cloned().collect()
    }

    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Every email accepted for sending, including ones whose send was
    /// scripted to fail.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Send(email) => Some(email.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn contact(&self, email: &Email) -> Option<ContactRecord> {
        self.lock().contacts.get(email).cloned()
    }

    /// Record a call and consume a scripted failure for it, if any.
    fn record(state: &mut State, call: Call) -> Result<(), ProviderError> {
        let operation = call.operation();
        state.calls.push_back(call);
        if let Some(limit) = state.call_log_limit {
            while state.calls.len() > limit {
                state.calls.pop_front();
            }
        }
        match state.failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(ProviderError::Api {
                    status: 500,
                    message: format!("scripted failure for {operation:?}"),
                })
            }
            _ => Ok(()),
        }
    }

    fn upsert(state: &mut State, contact: &ContactInput, apply_lists: bool) -> Option<ContactId> {
        if !state.contacts.contains_key(&contact.email) {
            state.next_id += 1;
            let id = ContactId::new(state.next_id);
            state.contacts.insert(
                contact.email.clone(),
                ContactRecord {
                    id: Some(id),
                    email: contact.email.clone(),
                    list_ids: Vec::new(),
                    attributes: BTreeMap::new(),
                },
            );
        }
        let record = state.contacts.get_mut(&contact.email)?;
        record
            .attributes
            .extend(contact.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        if apply_lists {
            for list_id in &contact.list_ids {
                if !record.list_ids.contains(list_id) {
                    record.list_ids.push(*list_id);
                }
            }
        }
        record.id
    }
}

#[async_trait]
impl MailProvider for InMemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_contact(
        &self,
        contact: &ContactInput,
    ) -> Result<Option<ContactId>, ProviderError> {
        let mut state = self.lock();
        Self::record(&mut state, Call::CreateContact(contact.clone()))?;
        let apply = state.list_behavior == ListBehavior::Apply;
        let id = Self::upsert(&mut state, contact, apply);
        tracing::info!(email = %contact.email, lists = ?contact.list_ids, "memory provider: contact upserted");
        Ok(id)
    }

    async fn update_contact(&self, contact: &ContactInput) -> Result<(), ProviderError> {
        let mut state = self.lock();
        Self::record(&mut state, Call::UpdateContact(contact.clone()))?;
        if !state.contacts.contains_key(&contact.email) {
            return Err(ProviderError::NotFound(contact.email.to_string()));
        }
        Self::upsert(&mut state, contact, true);
        Ok(())
    }

    async fn add_to_list(&self, list_id: ListId, emails: &[Email]) -> Result<(), ProviderError> {
        let mut state = self.lock();
        Self::record(
            &mut state,
            Call::AddToList {
                list_id,
                emails: emails.to_vec(),
            },
        )?;
        for email in emails {
            if let Some(record) = state.contacts.get_mut(email) {
                if !record.list_ids.contains(&list_id) {
                    record.list_ids.push(list_id);
                }
            }
        }
        Ok(())
    }

    async fn get_contact(&self, email: &Email) -> Result<Option<ContactRecord>, ProviderError> {
        let mut state = self.lock();
        Self::record(&mut state, Call::GetContact(email.clone()))?;
        Ok(state.contacts.get(email).cloned())
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String, ProviderError> {
        let mut state = self.lock();
        Self::record(&mut state, Call::Send(email.clone()))?;
        if email.to.is_empty() {
            return Err(ProviderError::Rejected("no recipients".to_string()));
        }
        state.next_message += 1;
        let id = format!("<memory-{}@brightpath.local>", state.next_message);
        tracing::info!(
            message_id = %id,
            recipients = email.to.len(),
            template = email.body.is_template(),
            "memory provider: email accepted"
        );
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::provider::{EmailBody, Mailbox};

    fn input(list: i64) -> ContactInput {
        ContactInput {
            email: Email::parse("jane@example.com").unwrap(),
            attributes: BTreeMap::new(),
            list_ids: vec![ListId::new(list)],
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let provider = InMemoryProvider::new();
        let first = provider.create_contact(&input(7)).await.unwrap();
        let second = provider.create_contact(&input(7)).await.unwrap();
        assert_eq!(first, second);
        let record = provider.contact(&input(7).email).unwrap();
        assert_eq!(record.list_ids, vec![ListId::new(7)]);
    }

    #[tokio::test]
    async fn test_ignore_on_create() {
        let provider = InMemoryProvider::new();
        provider.set_list_behavior(ListBehavior::IgnoreOnCreate);
        provider.create_contact(&input(7)).await.unwrap();
        assert!(provider.contact(&input(7).email).unwrap().list_ids.is_empty());

        provider
            .add_to_list(ListId::new(7), &[input(7).email])
            .await
            .unwrap();
        assert!(provider.contact(&input(7).email).unwrap().is_in_list(ListId::new(7)));
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed() {
        let provider = InMemoryProvider::new();
        provider.fail_next(Operation::GetContact, 1);
        let email = input(1).email;
        assert!(provider.get_contact(&email).await.is_err());
        assert!(provider.get_contact(&email).await.unwrap().is_none());
        assert_eq!(provider.count(Operation::GetContact), 2);
    }

    #[tokio::test]
    async fn test_send_records_kind() {
        let provider = InMemoryProvider::new();
        provider.fail_always(Operation::SendTemplate);
        let sender: Mailbox = Email::parse("hello@example.com").unwrap().into();
        let content = OutgoingEmail {
            sender,
            to: vec![input(1).email.into()],
            reply_to: None,
            body: EmailBody::Content {
                subject: "Hi".to_string(),
                text: "Hello".to_string(),
                html: None,
            },
            attachments: Vec::new(),
        };
        assert!(provider.send(&content).await.is_ok());
        assert_eq!(provider.count(Operation::SendContent), 1);
        assert_eq!(provider.count(Operation::SendTemplate), 0);
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_call_log_limit_keeps_latest_calls() {
        let provider = InMemoryProvider::new().with_call_log_limit(2);
        let email = input(1).email;
        for _ in 0..5 {
            provider.get_contact(&email).await.unwrap();
        }
        provider.create_contact(&input(1)).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.first().map(Call::operation), Some(Operation::GetContact));
        assert_eq!(calls.last().map(Call::operation), Some(Operation::CreateContact));
        // Contacts are state, not log, and survive trimming.
        assert!(provider.contact(&email).is_some());
    }
}
