//! The three best-effort side effects: what reaches the provider, and what
//! happens when it fails.

#![allow(clippy::indexing_slicing)]

use brightpath_core::{FormType, TemplateId};
use brightpath_integration_tests::{
    ADMIN_EMAIL, Call, LIST_ID, ListBehavior, Operation, TestApp, configured_forms, email,
    json_body, trial_body,
};
use brightpath_site::forms::FormSettings;
use brightpath_site::services::provider::EmailBody;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn trial_runs_all_three_effects() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/api/trial", &trial_body("layla@example.org"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "ok": true }));

    let sent = app.provider.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to[0].email.as_str(), ADMIN_EMAIL);
    assert_eq!(sent[1].to[0].email.as_str(), "layla@example.org");

    let contact = app
        .provider
        .contact(&email("layla@example.org"))
        .expect("contact should exist");
    assert!(contact.is_in_list(LIST_ID));
}

#[tokio::test]
async fn normalized_phone_reaches_provider() {
    let app = TestApp::spawn().await;

    app.post_json("/api/trial", &trial_body("layla@example.org"))
        .await;

    let created = app
        .provider
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::CreateContact(input) => Some(input),
            _ => None,
        })
        .expect("contact should be created");
    assert_eq!(created.attributes["SMS"], "+447700183406");
    assert_eq!(created.attributes["FIRSTNAME"], "Layla");
    assert_eq!(created.attributes["LASTNAME"], "Mansour");
}

#[tokio::test]
async fn provider_failures_still_return_success() {
    let app = TestApp::spawn().await;
    for operation in [
        Operation::SendContent,
        Operation::SendTemplate,
        Operation::CreateContact,
        Operation::GetContact,
        Operation::AddToList,
        Operation::UpdateContact,
    ] {
        app.provider.fail_always(operation);
    }

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

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn template_failure_sends_exactly_one_fallback() {
    let forms = configured_forms().with_form(
        FormType::Trial,
        FormSettings {
            notify: vec![email(ADMIN_EMAIL)],
            list_id: Some(LIST_ID),
            admin_template_id: Some(TemplateId::new(21)),
            confirm_template_id: None,
        },
    );
    let app = TestApp::spawn_with(forms).await;
    app.provider.fail_always(Operation::SendTemplate);

    let response = app
        .post_json("/api/trial", &trial_body("layla@example.org"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let to_admin: Vec<_> = app
        .provider
        .sent()
        .into_iter()
        .filter(|sent| sent.to.iter().any(|to| to.email.as_str() == ADMIN_EMAIL))
        .collect();
    assert_eq!(to_admin.len(), 2, "one template attempt and one fallback");
    assert!(to_admin[0].body.is_template());
    assert!(matches!(to_admin[1].body, EmailBody::Content { .. }));
    assert_eq!(app.provider.count(Operation::SendTemplate), 1);
}

#[tokio::test]
async fn repeated_upsert_keeps_single_membership() {
    let app = TestApp::spawn().await;
    app.provider.set_list_behavior(ListBehavior::IgnoreOnCreate);

    for _ in 0..3 {
        let response = app
            .post_json(
                "/api/newsletter",
                &json!({ "email": "sam@example.org", "firstName": "Sam" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let contact = app
        .provider
        .contact(&email("sam@example.org"))
        .expect("contact should exist");
    assert_eq!(contact.list_ids, vec![LIST_ID]);
}

#[tokio::test]
async fn callback_without_email_only_notifies_staff() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/callback",
            &json!({ "name": "Omar Said", "phone": "+971 50 123 4567", "preferredTime": "evening" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation(), Operation::SendContent);
}
