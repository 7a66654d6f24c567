//! Contract tests for the site backend.
//!
//! Each test spawns the real router on a random local port, backed by an
//! [`InMemoryProvider`], and drives it over HTTP with `reqwest`. The
//! provider records every call, so tests can assert on what reached it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p brightpath-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use brightpath_core::{Email, FormType, ListId};
use brightpath_site::config::ProviderConfig;
use brightpath_site::forms::{FormSettings, FormsConfig};
use brightpath_site::services::{InMemoryProvider, Mailbox};
use brightpath_site::{AppState, SiteConfig, app};
use reqwest::{Client, Response};
use serde_json::Value;

pub use brightpath_site::services::memory::{Call, ListBehavior, Operation};

/// List id every form uses in [`configured_forms`].
pub const LIST_ID: ListId = ListId::new(7);

/// Staff recipient every form notifies in [`configured_forms`].
pub const ADMIN_EMAIL: &str = "admissions@brightpath.academy";

/// A running server and the provider behind it.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub provider: InMemoryProvider,
}

/// Parse a test email address.
///
/// # Panics
///
/// Panics if `s` is not a valid address.
#[must_use]
pub fn email(s: &str) -> Email {
    Email::parse(s).expect("test email should be valid")
}

/// Sender, one staff recipient and [`LIST_ID`] for every form.
#[must_use]
pub fn configured_forms() -> FormsConfig {
    let sender = Mailbox::new(
        email("hello@brightpath.academy"),
        Some("Brightpath Academy".to_string()),
    );
    FormType::ALL
        .into_iter()
        .fold(FormsConfig::default().with_sender(sender), |forms, form| {
            forms.with_form(
                form,
                FormSettings {
                    notify: vec![email(ADMIN_EMAIL)],
                    list_id: Some(LIST_ID),
                    ..FormSettings::default()
                },
            )
        })
}

impl TestApp {
    /// Spawn with [`configured_forms`].
    pub async fn spawn() -> Self {
        Self::spawn_with(configured_forms()).await
    }

    /// Spawn with the given form settings.
    pub async fn spawn_with(forms: FormsConfig) -> Self {
        Self::spawn_with_config(SiteConfig {
            forms,
            ..SiteConfig::local(ProviderConfig::Memory)
        })
        .await
    }

    /// Spawn with a full site configuration.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn_with_config(config: SiteConfig) -> Self {
        let provider = InMemoryProvider::new();
        let state = AppState::new(config, Arc::new(provider.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            address: format!("http://{addr}"),
            client: Client::new(),
            provider,
        }
    }

    /// POST a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(format!("{}{path}", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// GET a path.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{path}", self.address))
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("Response body should be JSON")
}

/// A valid free trial request.
#[must_use]
pub fn trial_body(email: &str) -> Value {
    serde_json::json!({
        "fullName": "Layla Mansour",
        "email": email,
        "phone": "447700183406",
        "country": "United Kingdom",
        "course": "math",
        "studentAge": 9,
        "preferredDays": ["monday", "wednesday"],
        "preferredTime": "After school",
        "meta": { "page": "/free-trial" }
    })
}
