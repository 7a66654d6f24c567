//! Per-form behavior table.
//!
//! Every form runs through the same pipeline; what differs between them
//! (environment keys, subjects, which settings are mandatory, the reply
//! message) lives in one [`FormDescriptor`] per [`FormType`].

use brightpath_core::forms::{Choice, FormData};
use brightpath_core::{FormType, Submission};

/// Static description of one form.
#[derive(Debug)]
pub struct FormDescriptor {
    pub form_type: FormType,
    /// Prefix of the form's environment keys, e.g. `TRIAL` for
    /// `TRIAL_NOTIFY_EMAIL`.
    pub env_prefix: &'static str,
    /// Refuse submissions while no admin recipient is configured.
    pub requires_recipients: bool,
    /// Refuse submissions while no list id is configured.
    pub requires_list: bool,
    /// Message returned to the client on success, if the endpoint sends one.
    pub success_message: Option<&'static str>,
    pub confirmation_subject: &'static str,
    /// First paragraph of the hand-built confirmation email.
    pub confirmation_intro: &'static str,
    admin_subject: fn(&Submission) -> String,
}

impl FormDescriptor {
    /// Subject line for the staff notification.
    #[must_use]
    pub fn admin_subject(&self, submission: &Submission) -> String {
        (self.admin_subject)(submission)
    }

    /// Full environment key for one of this form's settings.
    #[must_use]
    pub fn env_key(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.env_prefix)
    }
}

static TRIAL: FormDescriptor = FormDescriptor {
    form_type: FormType::Trial,
    env_prefix: "TRIAL",
    requires_recipients: true,
    requires_list: false,
    success_message: None,
    confirmation_subject: "Your free trial class request",
    confirmation_intro: "Thank you for booking a free trial class with Brightpath Academy. \
        Our team will contact you within 24 hours to arrange a time that suits you.",
    admin_subject: trial_subject,
};

static CONTACT: FormDescriptor = FormDescriptor {
    form_type: FormType::Contact,
    env_prefix: "CONTACT",
    requires_recipients: true,
    requires_list: false,
    success_message: Some("Thank you for your message. We'll get back to you soon."),
    confirmation_subject: "We received your message",
    confirmation_intro: "Thank you for contacting Brightpath Academy. \
        A member of our team will reply within one working day.",
    admin_subject: contact_subject,
};

static CALLBACK: FormDescriptor = FormDescriptor {
    form_type: FormType::Callback,
    env_prefix: "CALLBACK",
    requires_recipients: true,
    requires_list: false,
    success_message: Some("Thanks! We'll call you back at your preferred time."),
    confirmation_subject: "Your callback request",
    confirmation_intro: "Thank you for requesting a call from Brightpath Academy. \
        One of our advisors will phone you at the time you selected.",
    admin_subject: callback_subject,
};

static STUDENT_FORM: FormDescriptor = FormDescriptor {
    form_type: FormType::StudentForm,
    env_prefix: "STUDENT",
    requires_recipients: true,
    requires_list: false,
    success_message: Some("Thank you for enrolling. We'll be in touch shortly."),
    confirmation_subject: "Your Brightpath Academy enrolment",
    confirmation_intro: "Thank you for enrolling with Brightpath Academy. \
        We will match the student with a teacher and send the class schedule shortly.",
    admin_subject: student_subject,
};

static TEACHER_APPLY: FormDescriptor = FormDescriptor {
    form_type: FormType::TeacherApply,
    env_prefix: "TEACHER",
    requires_recipients: true,
    requires_list: false,
    success_message: None,
    confirmation_subject: "Your teacher application",
    confirmation_intro: "Thank you for applying to teach with Brightpath Academy. \
        Our academic team reviews every application and will contact you if your profile matches an opening.",
    admin_subject: teacher_subject,
};

static NEWSLETTER: FormDescriptor = FormDescriptor {
    form_type: FormType::Newsletter,
    env_prefix: "NEWSLETTER",
    requires_recipients: false,
    requires_list: true,
    success_message: Some("You're subscribed! Look out for our next newsletter."),
    confirmation_subject: "Welcome to the Brightpath Academy newsletter",
    confirmation_intro: "Thanks for subscribing. You'll receive learning tips, \
        course news and seasonal offers from Brightpath Academy.",
    admin_subject: newsletter_subject,
};

/// Look up the descriptor for a form type.
#[must_use]
pub fn descriptor(form_type: FormType) -> &'static FormDescriptor {
    match form_type {
        FormType::Trial => &TRIAL,
        FormType::Contact => &CONTACT,
        FormType::Callback => &CALLBACK,
        FormType::StudentForm => &STUDENT_FORM,
        FormType::TeacherApply => &TEACHER_APPLY,
        FormType::Newsletter => &NEWSLETTER,
    }
}

fn trial_subject(submission: &Submission) -> String {
    match &submission.data {
        FormData::Trial(r) => format!("New free trial request: {} ({})", r.full_name, r.course.label()),
        _ => FormType::Trial.label().to_string(),
    }
}

fn contact_subject(submission: &Submission) -> String {
    match &submission.data {
        FormData::Contact(r) => format!("Contact form: {} - {}", r.subject, r.name),
        _ => FormType::Contact.label().to_string(),
    }
}

fn callback_subject(submission: &Submission) -> String {
    match &submission.data {
        FormData::Callback(r) => format!("Callback request: {} ({})", r.name, r.phone),
        _ => FormType::Callback.label().to_string(),
    }
}

fn student_subject(submission: &Submission) -> String {
    match &submission.data {
        FormData::Student(r) => format!("New student enrolment: {}", r.student_name),
        _ => FormType::StudentForm.label().to_string(),
    }
}

fn teacher_subject(submission: &Submission) -> String {
    match &submission.data {
        FormData::Teacher(r) => format!("Teacher application: {}", r.full_name),
        _ => FormType::TeacherApply.label().to_string(),
    }
}

fn newsletter_subject(submission: &Submission) -> String {
    match &submission.data {
        FormData::Newsletter(r) => format!("New newsletter subscriber: {}", r.email),
        _ => FormType::Newsletter.label().to_string(),
    }
}
