//! Request envelopes.
//!
//! Clients post either the nested shape
//!
//! ```json
//! { "formType": "contact", "data": { "name": "..." }, "meta": { "page": "/" } }
//! ```
//!
//! or a flat object with `formType` and `meta` next to the fields. Both are
//! normalized into an [`Envelope`] before schema validation.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::attachment::Attachment;
use super::records::{
    CallbackRequest, ContactMessage, FormData, NewsletterSignup, StudentEnrollment,
    TeacherApplication, TrialRequest,
};
use super::validation::{Issue, ValidationError};
use super::{FormType, Submission};

const FORM_TYPE_KEY: &str = "formType";
const DATA_KEY: &str = "data";
const META_KEY: &str = "meta";

/// A submission whose form type is known but whose fields are not yet
/// validated.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub form_type: FormType,
    pub data: Map<String, Value>,
    pub meta: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
}

impl Envelope {
    /// Normalize a JSON request body.
    ///
    /// `route_form` is the form served by the endpoint, or `None` on the
    /// generic dispatcher where the body must name its form type.
    ///
    /// # Errors
    ///
    /// Returns issues for a non-object body, a missing, unknown or
    /// conflicting `formType`, and a malformed `meta`.
    pub fn from_json(body: Value, route_form: Option<FormType>) -> Result<Self, ValidationError> {
        let Value::Object(mut object) = body else {
            return Err(ValidationError::single("body", "must be a JSON object"));
        };

        let declared = object.remove(FORM_TYPE_KEY);
        let meta = object.remove(META_KEY);
        let data = match object.remove(DATA_KEY) {
            Some(Value::Object(inner)) => inner,
            Some(other) => {
                // A flat form may legitimately have a field called `data`.
                object.insert(DATA_KEY.to_string(), other);
                object
            }
            None => object,
        };

        let mut issues = Vec::new();
        let declared = match declared {
            None | Some(Value::Null) => None,
            Some(Value::String(tag)) => Some(tag),
            Some(_) => {
                issues.push(Issue::new(FORM_TYPE_KEY, "must be a string"));
                None
            }
        };
        let form_type = resolve_form_type(declared.as_deref(), route_form, &mut issues);
        let meta = read_meta(meta, &mut issues);

        match form_type {
            Some(form_type) if issues.is_empty() => Ok(Self {
                form_type,
                data,
                meta,
                attachments: Vec::new(),
            }),
            _ => Err(ValidationError::new(issues)),
        }
    }

    /// Normalize a multipart body.
    ///
    /// Repeated field names (or names ending in `[]`) become arrays. A `meta`
    /// field holding a JSON object becomes the metadata.
    ///
    /// # Errors
    ///
    /// Same as [`Envelope::from_json`], plus an issue when files are sent to
    /// a form that does not take uploads.
    pub fn from_parts(
        fields: Vec<(String, String)>,
        files: Vec<Attachment>,
        route_form: Option<FormType>,
    ) -> Result<Self, ValidationError> {
        let mut data = Map::new();
        let mut declared = None;
        let mut meta = None;
        let mut issues = Vec::new();

        for (name, value) in fields {
            if name == FORM_TYPE_KEY {
                declared = Some(value);
                continue;
            }
            if name == META_KEY {
                match serde_json::from_str::<Value>(&value) {
                    Ok(parsed) => meta = Some(parsed),
                    Err(_) => issues.push(Issue::new(META_KEY, "must be a JSON object")),
                }
                continue;
            }
            let (key, forced_array) = match name.strip_suffix("[]") {
                Some(stripped) => (stripped.to_string(), true),
                None => (name, false),
            };
            push_field(&mut data, key, value, forced_array);
        }

        let form_type = resolve_form_type(declared.as_deref(), route_form, &mut issues);
        let meta = read_meta(meta, &mut issues);
        if let Some(form_type) = form_type {
            if !form_type.accepts_files() && !files.is_empty() {
                issues.push(Issue::new("attachments", "this form does not accept files"));
            }
        }

        match form_type {
            Some(form_type) if issues.is_empty() => Ok(Self {
                form_type,
                data,
                meta,
                attachments: files,
            }),
            _ => Err(ValidationError::new(issues)),
        }
    }

    /// Validate the data against the schema of the form type.
    ///
    /// # Errors
    ///
    /// Returns every field issue found by the schema.
    pub fn into_submission(self) -> Result<Submission, ValidationError> {
        let data = match self.form_type {
            FormType::Trial => FormData::Trial(TrialRequest::parse(&self.data)?),
            FormType::Contact => FormData::Contact(ContactMessage::parse(&self.data)?),
            FormType::Callback => FormData::Callback(CallbackRequest::parse(&self.data)?),
            FormType::StudentForm => FormData::Student(StudentEnrollment::parse(&self.data)?),
            FormType::TeacherApply => {
                FormData::Teacher(TeacherApplication::parse(&self.data, &self.attachments)?)
            }
            FormType::Newsletter => FormData::Newsletter(NewsletterSignup::parse(&self.data)?),
        };
        Ok(Submission {
            data,
            meta: self.meta,
        })
    }
}

fn push_field(data: &mut Map<String, Value>, key: String, value: String, forced_array: bool) {
    match data.get_mut(&key) {
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
        None if forced_array => {
            data.insert(key, Value::Array(vec![Value::String(value)]));
        }
        None => {
            data.insert(key, Value::String(value));
        }
    }
}

/// Decide the form type from the route and the tag declared in the body.
fn resolve_form_type(
    declared: Option<&str>,
    route_form: Option<FormType>,
    issues: &mut Vec<Issue>,
) -> Option<FormType> {
    let declared = declared.map(str::trim).filter(|tag| !tag.is_empty());
    match (route_form, declared) {
        (Some(route), None) => Some(route),
        (Some(route), Some(tag)) => {
            if tag.parse::<FormType>().ok() != Some(route) {
                issues.push(Issue::new(
                    FORM_TYPE_KEY,
                    format!("'{tag}' does not match this endpoint ({route})"),
                ));
            }
            Some(route)
        }
        (None, None) => {
            issues.push(Issue::new(FORM_TYPE_KEY, "is required"));
            None
        }
        (None, Some(tag)) => match tag.parse::<FormType>() {
            Ok(form_type) => Some(form_type),
            Err(e) => {
                let expected = FormType::ALL.map(FormType::as_str).join(", ");
                issues.push(Issue::new(
                    FORM_TYPE_KEY,
                    format!("{e}, expected one of: {expected}"),
                ));
                None
            }
        },
    }
}

/// Flatten client metadata into strings. Nested values are dropped.
fn read_meta(meta: Option<Value>, issues: &mut Vec<Issue>) -> BTreeMap<String, String> {
    match meta {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => return None,
                };
                Some((key, text))
            })
            .collect(),
        Some(_) => {
            issues.push(Issue::new(META_KEY, "must be an object"));
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn contact_fields() -> Value {
        json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "subject": "Group classes",
            "message": "Do you offer group classes on weekends?"
        })
    }

    #[test]
    fn test_nested_envelope() {
        let body = json!({
            "formType": "contact",
            "data": contact_fields(),
            "meta": { "page": "/contact", "attempt": 2, "nested": { "x": 1 } }
        });
        let envelope = Envelope::from_json(body, None).unwrap();
        assert_eq!(envelope.form_type, FormType::Contact);
        assert_eq!(envelope.data.get("name"), Some(&json!("Jane Doe")));
        assert_eq!(envelope.meta.get("page").map(String::as_str), Some("/contact"));
        assert_eq!(envelope.meta.get("attempt").map(String::as_str), Some("2"));
        assert!(!envelope.meta.contains_key("nested"));
    }

    #[test]
    fn test_flat_envelope_on_route() {
        let envelope = Envelope::from_json(contact_fields(), Some(FormType::Contact)).unwrap();
        assert_eq!(envelope.form_type, FormType::Contact);
        assert!(envelope.into_submission().is_ok());
    }

    #[test]
    fn test_route_conflict_is_an_issue() {
        let mut body = contact_fields();
        body["formType"] = json!("trial");
        let err = Envelope::from_json(body, Some(FormType::Contact)).unwrap_err();
        assert!(err.mentions("formType"));
    }

    #[test]
    fn test_route_accepts_alias() {
        let body = json!({ "formType": "subscribe", "email": "reader@example.com" });
        let envelope = Envelope::from_json(body, Some(FormType::Newsletter)).unwrap();
        assert_eq!(envelope.form_type, FormType::Newsletter);
    }

    #[test]
    fn test_dispatcher_needs_form_type() {
        let err = Envelope::from_json(contact_fields(), None).unwrap_err();
        assert!(err.mentions("formType"));

        let body = json!({ "formType": "quote", "data": {} });
        let err = Envelope::from_json(body, None).unwrap_err();
        assert!(err.issues.first().unwrap().message.contains("student-form"));
    }

    #[test]
    fn test_non_object_body() {
        let err = Envelope::from_json(json!(["a"]), Some(FormType::Trial)).unwrap_err();
        assert!(err.mentions("body"));
    }

    #[test]
    fn test_parts_repeat_into_arrays() {
        let fields = vec![
            ("subjects".to_string(), "Arabic".to_string()),
            ("subjects".to_string(), "English".to_string()),
            ("tags[]".to_string(), "one".to_string()),
            ("fullName".to_string(), "Sara Ali".to_string()),
            ("meta".to_string(), r#"{"page":"/careers"}"#.to_string()),
        ];
        let envelope = Envelope::from_parts(fields, Vec::new(), Some(FormType::TeacherApply)).unwrap();
        assert_eq!(envelope.data.get("subjects"), Some(&json!(["Arabic", "English"])));
        assert_eq!(envelope.data.get("tags"), Some(&json!(["one"])));
        assert_eq!(envelope.data.get("fullName"), Some(&json!("Sara Ali")));
        assert_eq!(envelope.meta.get("page").map(String::as_str), Some("/careers"));
    }

    #[test]
    fn test_parts_reject_files_for_plain_forms() {
        let file = Attachment::new("cv", "cv.pdf", None, vec![1]);
        let err = Envelope::from_parts(Vec::new(), vec![file], Some(FormType::Contact)).unwrap_err();
        assert!(err.mentions("attachments"));
    }
}
