//! Hand-built email bodies.
//!
//! These are what the mailer sends when a form has no provider template,
//! or when the template send fails. Rendering never fails a request: an
//! askama error is logged and the email falls back to plain field rows.

use askama::Template;
use brightpath_core::Submission;
use brightpath_core::forms::FieldRow;

use super::descriptor::FormDescriptor;
use crate::services::RenderedEmail;

const SIGNATURE: &str = "The Brightpath Academy team";

/// HTML body of the staff notification.
#[derive(Template)]
#[template(path = "email/notification.html")]
struct NotificationHtml<'a> {
    heading: &'a str,
    submitted_at: &'a str,
    rows: &'a [FieldRow],
    attachments: &'a [&'a str],
    meta: &'a [(&'a str, &'a str)],
}

/// Plain text body of the staff notification.
#[derive(Template)]
#[template(path = "email/notification.txt")]
struct NotificationText<'a> {
    heading: &'a str,
    submitted_at: &'a str,
    rows: &'a [FieldRow],
    attachments: &'a [&'a str],
    meta: &'a [(&'a str, &'a str)],
}

/// HTML body of the submitter confirmation.
#[derive(Template)]
#[template(path = "email/confirmation.html")]
struct ConfirmationHtml<'a> {
    subject: &'a str,
    name: Option<&'a str>,
    intro: &'a str,
    rows: &'a [FieldRow],
    signature: &'a str,
}

/// Plain text body of the submitter confirmation.
#[derive(Template)]
#[template(path = "email/confirmation.txt")]
struct ConfirmationText<'a> {
    name: Option<&'a str>,
    intro: &'a str,
    rows: &'a [FieldRow],
    signature: &'a str,
}

/// Build the staff notification for a submission.
#[must_use]
pub fn notification(
    descriptor: &FormDescriptor,
    submission: &Submission,
    submitted_at: &str,
) -> RenderedEmail {
    let subject = descriptor.admin_subject(submission);
    let rows = submission.fields();
    let attachments: Vec<&str> = submission
        .attachments()
        .iter()
        .map(|a| a.file_name.as_str())
        .collect();
    let meta: Vec<(&str, &str)> = submission
        .meta
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let text = NotificationText {
        heading: &subject,
        submitted_at,
        rows: &rows,
        attachments: &attachments,
        meta: &meta,
    }
    .render();
    let html = NotificationHtml {
        heading: &subject,
        submitted_at,
        rows: &rows,
        attachments: &attachments,
        meta: &meta,
    }
    .render();

    finish(subject, text, html, || plain_rows(&rows))
}

/// Build the confirmation sent back to the submitter.
#[must_use]
pub fn confirmation(descriptor: &FormDescriptor, submission: &Submission) -> RenderedEmail {
    let subject = descriptor.confirmation_subject;
    let name = submission.submitter_name();
    let rows = submission.fields();

    let text = ConfirmationText {
        name,
        intro: descriptor.confirmation_intro,
        rows: &rows,
        signature: SIGNATURE,
    }
    .render();
    let html = ConfirmationHtml {
        subject,
        name,
        intro: descriptor.confirmation_intro,
        rows: &rows,
        signature: SIGNATURE,
    }
    .render();

    finish(subject.to_string(), text, html, || {
        format!("{}\n\n{}", descriptor.confirmation_intro, plain_rows(&rows))
    })
}

fn finish(
    subject: String,
    text: askama::Result<String>,
    html: askama::Result<String>,
    plain: impl FnOnce() -> String,
) -> RenderedEmail {
    let text = text.unwrap_or_else(|error| {
        tracing::error!(error = %error, "Failed to render text email, using plain rows");
        plain()
    });
    let html = html
        .map_err(|error| tracing::error!(error = %error, "Failed to render HTML email"))
        .ok();
    RenderedEmail {
        subject,
        text,
        html,
    }
}

fn plain_rows(rows: &[FieldRow]) -> String {
    rows.iter()
        .map(|row| format!("{}: {}", row.label, row.value))
        .collect::<Vec<_>>()
        .join("\n")
}
