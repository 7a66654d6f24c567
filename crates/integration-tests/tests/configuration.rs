//! Missing server-side configuration is reported before any provider call.

use axum::http::StatusCode as AxumStatus;
use brightpath_core::FormType;
use brightpath_integration_tests::{TestApp, configured_forms, json_body, trial_body};
use brightpath_site::SiteConfig;
use brightpath_site::config::ProviderConfig;
use brightpath_site::forms::{FormSettings, FormsConfig};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn missing_recipients_is_bad_request_without_provider_calls() {
    let forms = configured_forms().with_form(FormType::Contact, FormSettings::default());
    let app = TestApp::spawn_with(forms).await;

    let response = app
        .post_json(
            "/api/contact",
            &json!({
                "name": "Amira Haddad",
                "email": "amira@example.org",
                "subject": "Group classes",
                "message": "Do you run group classes for siblings?"
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["ok"], false);
    assert!(!body["error"].as_str().unwrap_or_default().contains("CONTACT_"));
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn missing_sender_blocks_every_form() {
    let app = TestApp::spawn_with(FormsConfig::default()).await;

    let response = app
        .post_json("/api/trial", &trial_body("layla@example.org"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn missing_configuration_status_can_be_500() {
    let app = TestApp::spawn_with_config(SiteConfig {
        config_missing_status: AxumStatus::INTERNAL_SERVER_ERROR,
        ..SiteConfig::local(ProviderConfig::Memory)
    })
    .await;

    let response = app
        .post_json("/api/trial", &trial_body("layla@example.org"))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn probes_report_configuration() {
    let forms = configured_forms().with_form(FormType::Callback, FormSettings::default());
    let app = TestApp::spawn_with(forms).await;

    let contact = json_body(app.get("/api/contact").await).await;
    assert_eq!(contact, json!({ "ok": true, "formType": "contact", "configured": true }));

    let callback = json_body(app.get("/api/callback").await).await;
    assert_eq!(callback["configured"], false);

    let listing = json_body(app.get("/api/form").await).await;
    let types = listing["formTypes"].as_array().expect("form types listed");
    assert_eq!(types.len(), FormType::ALL.len());
    assert!(
        types
            .iter()
            .any(|t| t["formType"] == "teacher-apply" && t["acceptsFiles"] == true)
    );
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::spawn().await;
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "ok");
}
