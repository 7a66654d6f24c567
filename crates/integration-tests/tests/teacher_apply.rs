//! Teacher applications with CV uploads.

#![allow(clippy::indexing_slicing)]

use brightpath_integration_tests::{ADMIN_EMAIL, TestApp, json_body};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

fn application() -> Form {
    Form::new()
        .text("fullName", "Yusuf Karim")
        .text("email", "yusuf@example.org")
        .text("phone", "+20 100 555 0199")
        .text("country", "Egypt")
        .text("subjects[]", "math")
        .text("subjects[]", "physics")
        .text("experienceYears", "6")
        .text(
            "qualifications",
            "BSc Mathematics, Cairo University; CELTA certified",
        )
}

fn pdf(name: &str) -> Part {
    Part::bytes(b"%PDF-1.4 test".to_vec())
        .file_name(name.to_string())
        .mime_str("application/pdf")
        .expect("valid mime type")
}

async fn post(app: &TestApp, form: Form) -> reqwest::Response {
    app.client
        .post(format!("{}/api/teacher-apply", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
async fn application_with_cv_is_forwarded_to_staff() {
    let app = TestApp::spawn().await;

    let response = post(&app, application().part("cv", pdf("yusuf-karim-cv.pdf"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ok"], true);

    let sent = app.provider.sent();
    let staff = sent
        .iter()
        .find(|email| email.to.iter().any(|to| to.email.as_str() == ADMIN_EMAIL))
        .expect("staff notification");
    assert_eq!(staff.attachments.len(), 1);
    assert_eq!(staff.attachments[0].file_name, "yusuf-karim-cv.pdf");
    assert_eq!(
        staff.reply_to.as_ref().map(|r| r.email.as_str()),
        Some("yusuf@example.org")
    );

    let confirmation = sent
        .iter()
        .find(|email| email.to.iter().any(|to| to.email.as_str() == "yusuf@example.org"))
        .expect("submitter confirmation");
    assert!(confirmation.attachments.is_empty());
}

#[tokio::test]
async fn application_without_cv_is_rejected() {
    let app = TestApp::spawn().await;

    let response = post(&app, application()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let issues = body["issues"].as_array().expect("issues listed");
    assert!(issues.iter().any(|issue| issue["field"] == "cv"));
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn disallowed_file_type_is_rejected() {
    let app = TestApp::spawn().await;

    let exe = Part::bytes(b"MZ".to_vec())
        .file_name("cv.exe")
        .mime_str("application/octet-stream")
        .expect("valid mime type");
    let response = post(&app, application().part("cv", exe)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn files_sent_to_other_forms_are_rejected() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .text("email", "kai@example.org")
        .part("attachments", pdf("brochure.pdf"));
    let response = app
        .client
        .post(format!("{}/api/newsletter", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
