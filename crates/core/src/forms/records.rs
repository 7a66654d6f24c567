//! Typed records for each form, with their schemas.

use serde_json::{Map, Value};

use super::attachment::{Attachment, AttachmentRules};
use super::fields::{Choice, FieldReader};
use super::validation::ValidationError;
use crate::define_choice;
use crate::types::{Email, Phone};

define_choice!(Course {
    Math => ("math", "Mathematics"),
    English => ("english", "English"),
    Science => ("science", "Science"),
    Coding => ("coding", "Coding"),
    Arabic => ("arabic", "Arabic"),
});

define_choice!(Weekday {
    Monday => ("monday", "Monday"),
    Tuesday => ("tuesday", "Tuesday"),
    Wednesday => ("wednesday", "Wednesday"),
    Thursday => ("thursday", "Thursday"),
    Friday => ("friday", "Friday"),
    Saturday => ("saturday", "Saturday"),
    Sunday => ("sunday", "Sunday"),
});

define_choice!(CallbackWindow {
    Morning => ("morning", "Morning (9am - 12pm)"),
    Afternoon => ("afternoon", "Afternoon (12pm - 5pm)"),
    Evening => ("evening", "Evening (5pm - 8pm)"),
});

define_choice!(Level {
    Beginner => ("beginner", "Beginner"),
    Intermediate => ("intermediate", "Intermediate"),
    Advanced => ("advanced", "Advanced"),
});

/// One labelled value of a submission, in display order.
///
/// Used for template parameters (by `key`) and for hand-built emails (by
/// `label`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// Wire name of the field (camelCase).
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Display value.
    pub value: String,
}

/// Accumulates [`FieldRow`]s, skipping absent optional values.
#[derive(Debug, Default)]
struct Rows(Vec<FieldRow>);

impl Rows {
    fn push(&mut self, key: &'static str, label: &'static str, value: impl ToString) -> &mut Self {
        self.0.push(FieldRow {
            key,
            label,
            value: value.to_string(),
        });
        self
    }

    fn push_opt<T: std::fmt::Display + ?Sized>(&mut self, key: &'static str, label: &'static str, value: Option<&T>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, label, value);
        }
        self
    }

    fn push_labels<T: Choice>(&mut self, key: &'static str, label: &'static str, values: &[T]) -> &mut Self {
        let joined = values
            .iter()
            .map(|v| v.label())
            .collect::<Vec<_>>()
            .join(", ");
        self.push(key, label, joined)
    }

    fn finish(&mut self) -> Vec<FieldRow> {
        std::mem::take(&mut self.0)
    }
}

/// Free trial class request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRequest {
    pub full_name: String,
    pub email: Email,
    pub phone: Phone,
    pub country: Option<String>,
    pub course: Course,
    pub student_age: Option<u32>,
    pub preferred_days: Vec<Weekday>,
    pub preferred_time: Option<String>,
    pub message: Option<String>,
}

impl TrialRequest {
    /// Validate trial request data.
    ///
    /// # Errors
    ///
    /// Returns every field issue found.
    pub fn parse(data: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut f = FieldReader::new(data);
        let full_name = f.required_text("fullName", 2, 100);
        let email = f.required_email("email");
        let phone = f.required_phone("phone");
        let country = f.optional_text("country", 60);
        let course = f.required_choice::<Course>("course");
        let student_age = f.optional_number("studentAge", 3, 99);
        let preferred_days = f.choice_list::<Weekday>("preferredDays", 1);
        let preferred_time = f.optional_text("preferredTime", 60);
        let message = f.optional_text("message", 1000);

        match (full_name, email, phone, course) {
            (Some(full_name), Some(email), Some(phone), Some(course)) if f.is_clean() => Ok(Self {
                full_name,
                email,
                phone,
                country,
                course,
                student_age,
                preferred_days,
                preferred_time,
                message,
            }),
            _ => Err(f.into_error()),
        }
    }

    fn rows(&self) -> Vec<FieldRow> {
        Rows::default()
            .push("fullName", "Name", &self.full_name)
            .push("email", "Email", &self.email)
            .push("phone", "Phone", &self.phone)
            .push_opt("country", "Country", self.country.as_ref())
            .push("course", "Course", self.course.label())
            .push_opt("studentAge", "Student age", self.student_age.as_ref())
            .push_labels("preferredDays", "Preferred days", &self.preferred_days)
            .push_opt("preferredTime", "Preferred time", self.preferred_time.as_ref())
            .push_opt("message", "Message", self.message.as_ref())
            .finish()
    }
}

/// General contact message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub phone: Option<Phone>,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    /// Validate contact form data.
    ///
    /// # Errors
    ///
    /// Returns every field issue found.
    pub fn parse(data: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut f = FieldReader::new(data);
        let name = f.required_text("name", 2, 100);
        let email = f.required_email("email");
        let phone = f.optional_phone("phone");
        let subject = f.required_text("subject", 2, 150);
        let message = f.required_text("message", 10, 2000);

        match (name, email, subject, message) {
            (Some(name), Some(email), Some(subject), Some(message)) if f.is_clean() => Ok(Self {
                name,
                email,
                phone,
                subject,
                message,
            }),
            _ => Err(f.into_error()),
        }
    }

    fn rows(&self) -> Vec<FieldRow> {
        Rows::default()
            .push("name", "Name", &self.name)
            .push("email", "Email", &self.email)
            .push_opt("phone", "Phone", self.phone.as_ref())
            .push("subject", "Subject", &self.subject)
            .push("message", "Message", &self.message)
            .finish()
    }
}

/// Request for a phone callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRequest {
    pub name: String,
    pub phone: Phone,
    pub email: Option<Email>,
    pub preferred_time: Option<CallbackWindow>,
    pub timezone: Option<String>,
    pub message: Option<String>,
}

impl CallbackRequest {
    /// Validate callback request data.
    ///
    /// # Errors
    ///
    /// Returns every field issue found.
    pub fn parse(data: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut f = FieldReader::new(data);
        let name = f.required_text("name", 2, 100);
        let phone = f.required_phone("phone");
        let email = f.optional_email("email");
        let preferred_time = f.optional_choice::<CallbackWindow>("preferredTime");
        let timezone = f.optional_text("timezone", 60);
        let message = f.optional_text("message", 500);

        match (name, phone) {
            (Some(name), Some(phone)) if f.is_clean() => Ok(Self {
                name,
                phone,
                email,
                preferred_time,
                timezone,
                message,
            }),
            _ => Err(f.into_error()),
        }
    }

    fn rows(&self) -> Vec<FieldRow> {
        Rows::default()
            .push("name", "Name", &self.name)
            .push("phone", "Phone", &self.phone)
            .push_opt("email", "Email", self.email.as_ref())
            .push_opt(
                "preferredTime",
                "Preferred time",
                self.preferred_time.map(CallbackWindow::label).as_ref(),
            )
            .push_opt("timezone", "Timezone", self.timezone.as_ref())
            .push_opt("message", "Message", self.message.as_ref())
            .finish()
    }
}

/// Student enrolment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEnrollment {
    pub student_name: String,
    pub guardian_name: Option<String>,
    pub email: Email,
    pub phone: Phone,
    pub country: String,
    pub student_age: u32,
    pub courses: Vec<Course>,
    pub level: Level,
    pub notes: Option<String>,
}

impl StudentEnrollment {
    /// Validate enrolment data.
    ///
    /// # Errors
    ///
    /// Returns every field issue found.
    pub fn parse(data: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut f = FieldReader::new(data);
        let student_name = f.required_text("studentName", 2, 100);
        let guardian_name = f.optional_text("guardianName", 100);
        let email = f.required_email("email");
        let phone = f.required_phone("phone");
        let country = f.required_text("country", 2, 60);
        let student_age = f.required_number("studentAge", 3, 99);
        let courses = f.choice_list::<Course>("courses", 1);
        let level = f.required_choice::<Level>("level");
        let notes = f.optional_text("notes", 1000);

        match (student_name, email, phone, country, student_age, level) {
            (Some(student_name), Some(email), Some(phone), Some(country), Some(student_age), Some(level))
                if f.is_clean() =>
            {
                Ok(Self {
                    student_name,
                    guardian_name,
                    email,
                    phone,
                    country,
                    student_age,
                    courses,
                    level,
                    notes,
                })
            }
            _ => Err(f.into_error()),
        }
    }

    fn rows(&self) -> Vec<FieldRow> {
        Rows::default()
            .push("studentName", "Student name", &self.student_name)
            .push_opt("guardianName", "Parent / guardian", self.guardian_name.as_ref())
            .push("email", "Email", &self.email)
            .push("phone", "Phone", &self.phone)
            .push("country", "Country", &self.country)
            .push("studentAge", "Student age", self.student_age)
            .push_labels("courses", "Courses", &self.courses)
            .push("level", "Level", self.level.label())
            .push_opt("notes", "Notes", self.notes.as_ref())
            .finish()
    }
}

/// Application to join as a teacher, with uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherApplication {
    pub full_name: String,
    pub email: Email,
    pub phone: Phone,
    pub country: String,
    pub subjects: Vec<String>,
    pub experience_years: u32,
    pub qualifications: String,
    pub cover_letter: Option<String>,
    pub documents: Vec<Attachment>,
}

impl TeacherApplication {
    /// Field names accepted for the CV upload.
    pub const CV_FIELDS: &'static [&'static str] = &["cv", "resume"];

    /// Validate a teacher application and its uploads.
    ///
    /// The CV comes first in `documents`; further files keep their upload
    /// order.
    ///
    /// # Errors
    ///
    /// Returns every field and file issue found.
    pub fn parse(data: &Map<String, Value>, attachments: &[Attachment]) -> Result<Self, ValidationError> {
        let mut f = FieldReader::new(data);
        let full_name = f.required_text("fullName", 2, 100);
        let email = f.required_email("email");
        let phone = f.required_phone("phone");
        let country = f.required_text("country", 2, 60);
        let subjects = f.text_list("subjects", 1, 60);
        let experience_years = f.required_number("experienceYears", 0, 60);
        let qualifications = f.required_text("qualifications", 10, 2000);
        let cover_letter = f.optional_text("coverLetter", 4000);

        let rules = AttachmentRules::documents();
        let (cvs, others): (Vec<&Attachment>, Vec<&Attachment>) = attachments
            .iter()
            .partition(|a| Self::CV_FIELDS.contains(&a.field.as_str()));

        match cvs.as_slice() {
            [] => f.issue("cv", "a CV file is required"),
            [_] => {}
            _ => f.issue("cv", "only one CV file may be uploaded"),
        }
        if attachments.len() > rules.max_files {
            f.issue(
                "attachments",
                format!("at most {} files may be uploaded", rules.max_files),
            );
        }
        for attachment in cvs.iter().chain(others.iter()) {
            if let Err(message) = rules.check(attachment) {
                f.issue(&attachment.field, message);
            }
        }

        match (full_name, email, phone, country, experience_years, qualifications) {
            (
                Some(full_name),
                Some(email),
                Some(phone),
                Some(country),
                Some(experience_years),
                Some(qualifications),
            ) if f.is_clean() => Ok(Self {
                full_name,
                email,
                phone,
                country,
                subjects,
                experience_years,
                qualifications,
                cover_letter,
                documents: cvs.into_iter().chain(others).cloned().collect(),
            }),
            _ => Err(f.into_error()),
        }
    }

    fn rows(&self) -> Vec<FieldRow> {
        let files = self
            .documents
            .iter()
            .map(|d| d.file_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Rows::default()
            .push("fullName", "Name", &self.full_name)
            .push("email", "Email", &self.email)
            .push("phone", "Phone", &self.phone)
            .push("country", "Country", &self.country)
            .push("subjects", "Subjects", self.subjects.join(", "))
            .push("experienceYears", "Years of experience", self.experience_years)
            .push("qualifications", "Qualifications", &self.qualifications)
            .push_opt("coverLetter", "Cover letter", self.cover_letter.as_ref())
            .push("documents", "Documents", files)
            .finish()
    }
}

/// Newsletter signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterSignup {
    pub email: Email,
    pub first_name: Option<String>,
    pub source: Option<String>,
}

impl NewsletterSignup {
    /// Validate a newsletter signup.
    ///
    /// # Errors
    ///
    /// Returns every field issue found.
    pub fn parse(data: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut f = FieldReader::new(data);
        let email = f.required_email("email");
        let first_name = f.optional_text("firstName", 60);
        let source = f.optional_text("source", 100);

        match email {
            Some(email) if f.is_clean() => Ok(Self {
                email,
                first_name,
                source,
            }),
            _ => Err(f.into_error()),
        }
    }

    fn rows(&self) -> Vec<FieldRow> {
        Rows::default()
            .push("email", "Email", &self.email)
            .push_opt("firstName", "First name", self.first_name.as_ref())
            .push_opt("source", "Source", self.source.as_ref())
            .finish()
    }
}

/// The validated payload of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormData {
    Trial(TrialRequest),
    Contact(ContactMessage),
    Callback(CallbackRequest),
    Student(StudentEnrollment),
    Teacher(TeacherApplication),
    Newsletter(NewsletterSignup),
}

impl FormData {
    /// Ordered label/value rows for emails and template params.
    #[must_use]
    pub fn rows(&self) -> Vec<FieldRow> {
        match self {
            Self::Trial(r) => r.rows(),
            Self::Contact(r) => r.rows(),
            Self::Callback(r) => r.rows(),
            Self::Student(r) => r.rows(),
            Self::Teacher(r) => r.rows(),
            Self::Newsletter(r) => r.rows(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn pdf(field: &str) -> Attachment {
        Attachment::new(field, "cv.pdf", Some("application/pdf".to_string()), b"%PDF-1.7".to_vec())
    }

    #[test]
    fn test_trial_valid() {
        let data = object(json!({
            "fullName": "Amina Khan",
            "email": "Amina@Example.com",
            "phone": "447700183406",
            "course": "Math",
            "preferredDays": ["monday", "friday"],
            "studentAge": "9"
        }));
        let trial = TrialRequest::parse(&data).unwrap();
        assert_eq!(trial.email.as_str(), "amina@example.com");
        assert_eq!(trial.phone.as_str(), "+447700183406");
        assert_eq!(trial.course, Course::Math);
        assert_eq!(trial.preferred_days, vec![Weekday::Monday, Weekday::Friday]);
        assert_eq!(trial.student_age, Some(9));
    }

    #[test]
    fn test_trial_student_age_as_float() {
        let data = object(json!({
            "fullName": "Amina Khan",
            "email": "amina@example.com",
            "phone": "+447700183406",
            "course": "science",
            "preferredDays": ["tuesday"],
            "studentAge": 9.0
        }));
        assert_eq!(TrialRequest::parse(&data).unwrap().student_age, Some(9));
    }

    #[test]
    fn test_trial_requires_a_preferred_day() {
        let data = object(json!({
            "fullName": "Amina Khan",
            "email": "amina@example.com",
            "phone": "+447700183406",
            "course": "math",
            "preferredDays": []
        }));
        let err = TrialRequest::parse(&data).unwrap_err();
        assert!(err.mentions("preferredDays"));
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn test_contact_reports_all_issues() {
        let data = object(json!({ "name": "J", "email": "jexample.com", "message": "short" }));
        let err = ContactMessage::parse(&data).unwrap_err();
        for field in ["name", "email", "subject", "message"] {
            assert!(err.mentions(field), "missing issue for {field}");
        }
    }

    #[test]
    fn test_callback_email_optional() {
        let data = object(json!({ "name": "Omar", "phone": "0044 20 7946 0958", "preferredTime": "evening" }));
        let callback = CallbackRequest::parse(&data).unwrap();
        assert!(callback.email.is_none());
        assert_eq!(callback.phone.as_str(), "+00442079460958");
        assert_eq!(callback.preferred_time, Some(CallbackWindow::Evening));
    }

    #[test]
    fn test_rows_include_present_optional_values() {
        let data = object(json!({
            "fullName": "Amina Khan",
            "email": "amina@example.com",
            "phone": "+447700183406",
            "course": "english",
            "preferredDays": ["monday"],
            "studentAge": 12,
            "country": "Jordan"
        }));
        let rows = FormData::Trial(TrialRequest::parse(&data).unwrap()).rows();
        let value = |key: &str| rows.iter().find(|r| r.key == key).map(|r| r.value.clone());
        assert_eq!(value("studentAge").as_deref(), Some("12"));
        assert_eq!(value("country").as_deref(), Some("Jordan"));
        assert_eq!(value("message"), None);

        let data = object(json!({ "name": "Omar", "phone": "+442079460958", "preferredTime": "morning" }));
        let rows = FormData::Callback(CallbackRequest::parse(&data).unwrap()).rows();
        let window = rows.iter().find(|r| r.key == "preferredTime").unwrap();
        assert_eq!(window.value, CallbackWindow::Morning.label());
        assert!(rows.iter().all(|r| r.key != "email"));
    }

    #[test]
    fn test_student_rows_use_labels() {
        let data = object(json!({
            "studentName": "Yusuf",
            "email": "parent@example.com",
            "phone": "+14155550100",
            "country": "USA",
            "studentAge": 11,
            "courses": ["coding", "math"],
            "level": "beginner"
        }));
        let student = StudentEnrollment::parse(&data).unwrap();
        let rows = FormData::Student(student).rows();
        let courses = rows.iter().find(|r| r.key == "courses").unwrap();
        assert_eq!(courses.value, "Coding, Mathematics");
        assert!(rows.iter().all(|r| r.key != "guardianName"));
    }

    #[test]
    fn test_teacher_requires_cv() {
        let data = object(json!({
            "fullName": "Sara Ali",
            "email": "sara@example.com",
            "phone": "+201001234567",
            "country": "Egypt",
            "subjects": "Arabic",
            "experienceYears": "4",
            "qualifications": "BA in Arabic literature"
        }));
        let err = TeacherApplication::parse(&data, &[]).unwrap_err();
        assert!(err.mentions("cv"));

        let application = TeacherApplication::parse(&data, &[pdf("resume")]).unwrap();
        assert_eq!(application.subjects, vec!["Arabic".to_string()]);
        assert_eq!(application.documents.len(), 1);
    }

    #[test]
    fn test_teacher_rejects_wrong_file_type() {
        let data = object(json!({
            "fullName": "Sara Ali",
            "email": "sara@example.com",
            "phone": "+201001234567",
            "country": "Egypt",
            "subjects": ["Arabic"],
            "experienceYears": 4,
            "qualifications": "BA in Arabic literature"
        }));
        let exe = Attachment::new("cv", "cv.exe", None, vec![1, 2, 3]);
        let err = TeacherApplication::parse(&data, &[exe]).unwrap_err();
        assert!(err.mentions("cv"));
    }

    #[test]
    fn test_newsletter_only_needs_email() {
        let data = object(json!({ "email": "reader@example.com" }));
        let signup = NewsletterSignup::parse(&data).unwrap();
        assert_eq!(signup.email.as_str(), "reader@example.com");
        assert!(NewsletterSignup::parse(&Map::new()).unwrap_err().mentions("email"));
    }
}
