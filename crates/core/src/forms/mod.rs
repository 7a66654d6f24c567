//! Form submissions: types, schemas and validation.
//!
//! Every public form arrives as an [`Envelope`] (the form type plus raw
//! field data) and is validated into a [`Submission`] holding one typed
//! record. Validation never stops at the first problem; a rejected
//! submission carries every [`Issue`] found.

mod attachment;
mod envelope;
mod fields;
mod records;
mod validation;

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::Serialize;

pub use attachment::{Attachment, AttachmentRules};
pub use envelope::Envelope;
pub use fields::{Choice, FieldReader};
pub use records::{
    CallbackRequest, CallbackWindow, ContactMessage, Course, FieldRow, FormData, Level,
    NewsletterSignup, StudentEnrollment, TeacherApplication, TrialRequest, Weekday,
};
pub use validation::{Issue, ValidationError};

use crate::types::{Email, Phone};

/// The kinds of form the site accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormType {
    Trial,
    Contact,
    Callback,
    StudentForm,
    TeacherApply,
    Newsletter,
}

/// An unrecognised form type tag.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown form type '{0}'")]
pub struct UnknownFormType(pub String);

impl FormType {
    /// Every form type, in the order they are listed to clients.
    pub const ALL: [Self; 6] = [
        Self::Trial,
        Self::Contact,
        Self::Callback,
        Self::StudentForm,
        Self::TeacherApply,
        Self::Newsletter,
    ];

    /// Canonical kebab-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Contact => "contact",
            Self::Callback => "callback",
            Self::StudentForm => "student-form",
            Self::TeacherApply => "teacher-apply",
            Self::Newsletter => "newsletter",
        }
    }

    /// Human-readable name used in email subjects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trial => "Free trial request",
            Self::Contact => "Contact message",
            Self::Callback => "Callback request",
            Self::StudentForm => "Student enrolment",
            Self::TeacherApply => "Teacher application",
            Self::Newsletter => "Newsletter signup",
        }
    }

    /// Returns true if submissions of this type may carry uploaded files.
    #[must_use]
    pub const fn accepts_files(self) -> bool {
        matches!(self, Self::TeacherApply)
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = UnknownFormType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "trial" => Ok(Self::Trial),
            "contact" => Ok(Self::Contact),
            "callback" => Ok(Self::Callback),
            "student-form" | "student" => Ok(Self::StudentForm),
            "teacher-apply" | "teacher" | "teacher-application" => Ok(Self::TeacherApply),
            "newsletter" | "subscribe" => Ok(Self::Newsletter),
            _ => Err(UnknownFormType(s.trim().to_string())),
        }
    }
}

/// A validated form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The typed record.
    pub data: FormData,
    /// Free-form client metadata (page, campaign, locale).
    pub meta: BTreeMap<String, String>,
}

impl Submission {
    /// Which form this submission came from.
    #[must_use]
    pub const fn form_type(&self) -> FormType {
        match self.data {
            FormData::Trial(_) => FormType::Trial,
            FormData::Contact(_) => FormType::Contact,
            FormData::Callback(_) => FormType::Callback,
            FormData::Student(_) => FormType::StudentForm,
            FormData::Teacher(_) => FormType::TeacherApply,
            FormData::Newsletter(_) => FormType::Newsletter,
        }
    }

    /// Address of the person who filled in the form, if the form has one.
    #[must_use]
    pub fn submitter_email(&self) -> Option<&Email> {
        match &self.data {
            FormData::Trial(r) => Some(&r.email),
            FormData::Contact(r) => Some(&r.email),
            FormData::Callback(r) => r.email.as_ref(),
            FormData::Student(r) => Some(&r.email),
            FormData::Teacher(r) => Some(&r.email),
            FormData::Newsletter(r) => Some(&r.email),
        }
    }

    /// Full name of the submitter.
    ///
    /// For enrolments this is the guardian when given, since they are the
    /// person being contacted.
    #[must_use]
    pub fn submitter_name(&self) -> Option<&str> {
        match &self.data {
            FormData::Trial(r) => Some(&r.full_name),
            FormData::Contact(r) => Some(&r.name),
            FormData::Callback(r) => Some(&r.name),
            FormData::Student(r) => Some(r.guardian_name.as_deref().unwrap_or(&r.student_name)),
            FormData::Teacher(r) => Some(&r.full_name),
            FormData::Newsletter(r) => r.first_name.as_deref(),
        }
    }

    #[must_use]
    pub fn phone(&self) -> Option<&Phone> {
        match &self.data {
            FormData::Trial(r) => Some(&r.phone),
            FormData::Contact(r) => r.phone.as_ref(),
            FormData::Callback(r) => Some(&r.phone),
            FormData::Student(r) => Some(&r.phone),
            FormData::Teacher(r) => Some(&r.phone),
            FormData::Newsletter(_) => None,
        }
    }

    #[must_use]
    pub fn country(&self) -> Option<&str> {
        match &self.data {
            FormData::Trial(r) => r.country.as_deref(),
            FormData::Student(r) => Some(&r.country),
            FormData::Teacher(r) => Some(&r.country),
            FormData::Contact(_) | FormData::Callback(_) | FormData::Newsletter(_) => None,
        }
    }

    /// Ordered field rows for emails and template params.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldRow> {
        self.data.rows()
    }

    /// Uploaded files, CV first.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        match &self.data {
            FormData::Teacher(r) => &r.documents,
            _ => &[],
        }
    }
}
