//! Invalid submissions are rejected before anything reaches the provider.

#![allow(clippy::indexing_slicing)]

use brightpath_integration_tests::{TestApp, json_body, trial_body};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn invalid_email_is_rejected_with_field_issue() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/api/trial", &trial_body("layla.example.org"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["ok"], false);
    let issues = body["issues"].as_array().expect("issues should be listed");
    assert!(issues.iter().any(|issue| issue["field"] == "email"));
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn every_bad_field_is_reported_at_once() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/contact",
            &json!({ "name": "A", "email": "nope", "subject": "H", "message": "short" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let fields: Vec<&str> = body["issues"]
        .as_array()
        .expect("issues should be listed")
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    for field in ["name", "email", "subject", "message"] {
        assert!(fields.contains(&field), "missing issue for {field}: {fields:?}");
    }
}

#[tokio::test]
async fn dispatcher_requires_known_form_type() {
    let app = TestApp::spawn().await;

    let missing = app
        .post_json("/api/form", &json!({ "data": { "email": "a@b.co" } }))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(missing).await["issues"][0]["field"], "formType");

    let unknown = app
        .post_json("/api/form", &json!({ "formType": "webinar", "data": {} }))
        .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(unknown).await["issues"][0]["field"], "formType");
}

#[tokio::test]
async fn route_rejects_conflicting_form_type() {
    let app = TestApp::spawn().await;
    let mut body = trial_body("layla@example.org");
    body["formType"] = json!("contact");

    let response = app.post_json("/api/trial", &body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/api/contact", app.address))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["ok"], false);
}
