//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{ProviderConfig, SiteConfig};
use crate::forms::FormsConfig;
use crate::services::{BrevoClient, InMemoryProvider, MailProvider, Mailer, ProviderError};

/// Calls the dev provider remembers before dropping the oldest.
const DEV_CALL_LOG_LIMIT: usize = 256;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The mail provider is built
/// once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    mailer: Mailer,
}

impl AppState {
    /// Create application state around an already-built provider.
    #[must_use]
    pub fn new(config: SiteConfig, provider: Arc<dyn MailProvider>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                mailer: Mailer::new(provider),
            }),
        }
    }

    /// Create application state with the provider named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Brevo client cannot be built.
    pub fn from_config(config: SiteConfig) -> Result<Self, ProviderError> {
        let provider: Arc<dyn MailProvider> = match &config.provider {
            ProviderConfig::Brevo(brevo) => Arc::new(BrevoClient::new(brevo)?),
            ProviderConfig::Memory => {
                tracing::warn!("MAIL_PROVIDER=memory: emails and contacts are only logged");
                Arc::new(InMemoryProvider::new().with_call_log_limit(DEV_CALL_LOG_LIMIT))
            }
        };
        Ok(Self::new(config, provider))
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the per-form configuration.
    #[must_use]
    pub fn forms(&self) -> &FormsConfig {
        &self.inner.config.forms
    }

    /// Get a reference to the outbound mailer.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
