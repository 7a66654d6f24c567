//! External service integrations.

pub mod brevo;
pub mod mailer;
pub mod memory;
pub mod provider;

pub use brevo::BrevoClient;
pub use mailer::{
    ContactDetails, ContactReceipt, Dispatch, EffectStatus, IntegrationError, Mailer,
    RenderedEmail,
};
pub use memory::InMemoryProvider;
pub use provider::{MailProvider, Mailbox, ProviderError};
