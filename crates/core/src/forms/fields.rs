//! Schema helpers for reading untyped submission data.
//!
//! A [`FieldReader`] wraps the JSON object of one submission and hands out
//! typed values field by field. Every failed read records an [`Issue`]
//! instead of returning early, so a client gets the complete list of
//! problems in one response.

use serde_json::{Map, Value};

use super::validation::{Issue, ValidationError};
use crate::types::{Email, Phone};

/// A closed set of string options accepted by a form field.
pub trait Choice: Sized + Copy + 'static {
    /// Every accepted option with its wire value.
    const OPTIONS: &'static [Self];

    /// Wire value sent by the client and forwarded to the provider.
    fn as_str(self) -> &'static str;

    /// Human-readable label used in emails.
    fn label(self) -> &'static str;

    /// Parse a wire value, ignoring case and surrounding whitespace.
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::OPTIONS
            .iter()
            .copied()
            .find(|option| option.as_str().eq_ignore_ascii_case(value))
    }

    /// Comma-separated list of accepted wire values.
    #[must_use]
    fn expected() -> String {
        Self::OPTIONS
            .iter()
            .map(|option| option.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Define a [`Choice`] enum from `Variant => ("wire", "Label")` pairs.
///
/// ```rust
/// # use brightpath_core::define_choice;
/// # use brightpath_core::forms::Choice;
/// define_choice!(Shift { Day => ("day", "Day shift"), Night => ("night", "Night shift") });
///
/// assert_eq!(Shift::parse("NIGHT"), Some(Shift::Night));
/// assert_eq!(Shift::Day.label(), "Day shift");
/// ```
#[macro_export]
macro_rules! define_choice {
    ($name:ident { $($variant:ident => ($wire:literal, $label:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $crate::forms::Choice for $name {
            const OPTIONS: &'static [Self] = &[$(Self::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str($crate::forms::Choice::as_str(*self))
            }
        }
    };
}

/// Outcome of reading one scalar field.
enum Raw {
    Missing,
    Invalid,
    Text(String),
}

/// Reads typed fields out of a submission object, collecting issues.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a Map<String, Value>,
    issues: Vec<Issue>,
}

impl<'a> FieldReader<'a> {
    /// Start reading the given submission data.
    #[must_use]
    pub const fn new(data: &'a Map<String, Value>) -> Self {
        Self {
            data,
            issues: Vec::new(),
        }
    }

    /// Record an issue for a field.
    pub fn issue(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(Issue::new(field, message));
    }

    /// Returns true if no issue has been recorded so far.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Finish reading and turn the collected issues into an error.
    #[must_use]
    pub fn into_error(self) -> ValidationError {
        ValidationError::new(self.issues)
    }

    /// Scalar value of a field as trimmed text. Blank strings and nulls count as missing.
    fn scalar(&mut self, field: &str) -> Raw {
        match self.data.get(field) {
            None | Some(Value::Null) => Raw::Missing,
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Raw::Missing
                } else {
                    Raw::Text(trimmed.to_string())
                }
            }
            Some(Value::Number(n)) => Raw::Text(n.to_string()),
            Some(Value::Bool(b)) => Raw::Text(b.to_string()),
            Some(Value::Array(_) | Value::Object(_)) => {
                self.issue(field, "must be a single value");
                Raw::Invalid
            }
        }
    }

    /// Text of a field that must be present.
    fn required(&mut self, field: &str) -> Option<String> {
        match self.scalar(field) {
            Raw::Text(value) => Some(value),
            Raw::Missing => {
                self.issue(field, "is required");
                None
            }
            Raw::Invalid => None,
        }
    }

    /// Text of a field that may be absent.
    fn optional(&mut self, field: &str) -> Option<String> {
        match self.scalar(field) {
            Raw::Text(value) => Some(value),
            Raw::Missing | Raw::Invalid => None,
        }
    }

    fn check_length(&mut self, field: &str, value: String, min: usize, max: usize) -> Option<String> {
        let len = value.chars().count();
        if len < min {
            self.issue(field, format!("must be at least {min} characters"));
            return None;
        }
        if len > max {
            self.issue(field, format!("must be at most {max} characters"));
            return None;
        }
        Some(value)
    }

    /// Read a required text field with character bounds.
    pub fn required_text(&mut self, field: &str, min: usize, max: usize) -> Option<String> {
        let value = self.required(field)?;
        self.check_length(field, value, min, max)
    }

    /// Read an optional text field with an upper character bound.
    pub fn optional_text(&mut self, field: &str, max: usize) -> Option<String> {
        let value = self.optional(field)?;
        self.check_length(field, value, 0, max)
    }

    /// Read a required email address.
    pub fn required_email(&mut self, field: &str) -> Option<Email> {
        let value = self.required(field)?;
        self.parse_email(field, &value)
    }

    /// Read an optional email address.
    pub fn optional_email(&mut self, field: &str) -> Option<Email> {
        let value = self.optional(field)?;
        self.parse_email(field, &value)
    }

    fn parse_email(&mut self, field: &str, value: &str) -> Option<Email> {
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(e) => {
                self.issue(field, e.to_string());
                None
            }
        }
    }

    /// Read a required phone number, normalized with a leading `+`.
    pub fn required_phone(&mut self, field: &str) -> Option<Phone> {
        let value = self.required(field)?;
        self.parse_phone(field, &value)
    }

    /// Read an optional phone number.
    pub fn optional_phone(&mut self, field: &str) -> Option<Phone> {
        let value = self.optional(field)?;
        self.parse_phone(field, &value)
    }

    fn parse_phone(&mut self, field: &str, value: &str) -> Option<Phone> {
        match Phone::parse(value) {
            Ok(phone) => Some(phone),
            Err(e) => {
                self.issue(field, e.to_string());
                None
            }
        }
    }

    /// Read a required field that must be one of `T`'s options.
    pub fn required_choice<T: Choice>(&mut self, field: &str) -> Option<T> {
        let value = self.required(field)?;
        self.parse_choice(field, &value)
    }

    /// Read an optional field that must be one of `T`'s options when present.
    pub fn optional_choice<T: Choice>(&mut self, field: &str) -> Option<T> {
        let value = self.optional(field)?;
        self.parse_choice(field, &value)
    }

    fn parse_choice<T: Choice>(&mut self, field: &str, value: &str) -> Option<T> {
        let parsed = T::parse(value);
        if parsed.is_none() {
            self.issue(field, format!("must be one of: {}", T::expected()));
        }
        parsed
    }

    /// Read a required whole number within `min..=max`.
    ///
    /// Accepts JSON numbers and numeric strings (multipart bodies only carry
    /// strings).
    pub fn required_number(&mut self, field: &str, min: u32, max: u32) -> Option<u32> {
        let value = self.required(field)?;
        self.parse_number(field, &value, min, max)
    }

    /// Read an optional whole number within `min..=max`.
    pub fn optional_number(&mut self, field: &str, min: u32, max: u32) -> Option<u32> {
        let value = self.optional(field)?;
        self.parse_number(field, &value, min, max)
    }

    fn parse_number(&mut self, field: &str, value: &str, min: u32, max: u32) -> Option<u32> {
        // JSON floats such as `9.0` arrive as "9.0"; a zero fraction is whole.
        let whole = match value.split_once('.') {
            Some((int, frac)) if !frac.is_empty() && frac.bytes().all(|b| b == b'0') => int,
            _ => value,
        };
        match whole.parse::<u32>() {
            Ok(n) if (min..=max).contains(&n) => Some(n),
            _ => {
                self.issue(field, format!("must be a whole number between {min} and {max}"));
                None
            }
        }
    }

    /// Raw string items of an array field. A single string counts as one item.
    fn items(&mut self, field: &str) -> Vec<String> {
        match self.data.get(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Vec::new()
                } else {
                    vec![trimmed.to_string()]
                }
            }
            Some(Value::Array(values)) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        Value::String(s) if !s.trim().is_empty() => items.push(s.trim().to_string()),
                        Value::String(_) | Value::Null => {}
                        _ => {
                            self.issue(field, "must contain only text values");
                            return Vec::new();
                        }
                    }
                }
                items
            }
            Some(_) => {
                self.issue(field, "must be a list");
                Vec::new()
            }
        }
    }

    /// Read a list of choices with at least `min` distinct entries.
    pub fn choice_list<T: Choice + PartialEq>(&mut self, field: &str, min: usize) -> Vec<T> {
        let items = self.items(field);
        let mut parsed: Vec<T> = Vec::with_capacity(items.len());
        for item in &items {
            match T::parse(item) {
                Some(choice) if !parsed.contains(&choice) => parsed.push(choice),
                Some(_) => {}
                None => {
                    self.issue(field, format!("contains '{item}', expected one of: {}", T::expected()));
                    return Vec::new();
                }
            }
        }
        self.check_min_items(field, parsed, min)
    }

    /// Read a list of free-text entries, each at most `max_len` characters.
    pub fn text_list(&mut self, field: &str, min: usize, max_len: usize) -> Vec<String> {
        let items = self.items(field);
        if items.iter().any(|item| item.chars().count() > max_len) {
            self.issue(field, format!("entries must be at most {max_len} characters"));
            return Vec::new();
        }
        let mut unique: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
                unique.push(item);
            }
        }
        self.check_min_items(field, unique, min)
    }

    fn check_min_items<T>(&mut self, field: &str, items: Vec<T>, min: usize) -> Vec<T> {
        if items.len() < min {
            let noun = if min == 1 { "entry" } else { "entries" };
            self.issue(field, format!("must contain at least {min} {noun}"));
        }
        items
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    crate::define_choice!(Colour {
        Red => ("red", "Red"),
        Blue => ("blue", "Blue"),
    });

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_text_bounds() {
        let data = object(json!({ "name": " A ", "bio": "long enough" }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(reader.required_text("name", 2, 10), None);
        assert_eq!(reader.required_text("bio", 2, 20).as_deref(), Some("long enough"));
        assert_eq!(reader.required_text("missing", 1, 5), None);
        let err = reader.into_error();
        assert!(err.mentions("name"));
        assert!(err.mentions("missing"));
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_optional_text_blank_is_absent() {
        let data = object(json!({ "note": "   ", "other": null }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(reader.optional_text("note", 10), None);
        assert_eq!(reader.optional_text("other", 10), None);
        assert!(reader.is_clean());
    }

    #[test]
    fn test_email_and_phone() {
        let data = object(json!({ "email": "bad-address", "phone": "447700183406" }));
        let mut reader = FieldReader::new(&data);
        assert!(reader.required_email("email").is_none());
        assert_eq!(
            reader.required_phone("phone").unwrap().as_str(),
            "+447700183406"
        );
        assert!(reader.into_error().mentions("email"));
    }

    #[test]
    fn test_choice_list_min_and_dedup() {
        let data = object(json!({ "colours": ["red", "RED", "blue"], "none": [] }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(
            reader.choice_list::<Colour>("colours", 1),
            vec![Colour::Red, Colour::Blue]
        );
        assert!(reader.is_clean());
        assert!(reader.choice_list::<Colour>("none", 1).is_empty());
        assert!(reader.into_error().mentions("none"));
    }

    #[test]
    fn test_choice_list_single_string() {
        let data = object(json!({ "colours": "blue" }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(reader.choice_list::<Colour>("colours", 1), vec![Colour::Blue]);
    }

    #[test]
    fn test_choice_list_rejects_unknown() {
        let data = object(json!({ "colours": ["green"] }));
        let mut reader = FieldReader::new(&data);
        assert!(reader.choice_list::<Colour>("colours", 1).is_empty());
        let err = reader.into_error();
        assert!(err.issues.first().unwrap().message.contains("red, blue"));
    }

    #[test]
    fn test_number_from_string_or_number() {
        let data = object(json!({ "a": "12", "b": 7, "c": "x", "d": 200 }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(reader.required_number("a", 0, 60), Some(12));
        assert_eq!(reader.required_number("b", 0, 60), Some(7));
        assert_eq!(reader.required_number("c", 0, 60), None);
        assert_eq!(reader.optional_number("d", 0, 60), None);
        assert_eq!(reader.into_error().issues.len(), 2);
    }

    #[test]
    fn test_number_accepts_whole_floats() {
        let data = object(json!({ "a": 9.0, "b": "12.00", "c": 9.5, "d": "9." }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(reader.required_number("a", 3, 99), Some(9));
        assert_eq!(reader.required_number("b", 3, 99), Some(12));
        assert_eq!(reader.required_number("c", 3, 99), None);
        assert_eq!(reader.required_number("d", 3, 99), None);
        let err = reader.into_error();
        assert!(err.mentions("c"));
        assert!(err.mentions("d"));
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_scalar_rejects_nested_values() {
        let data = object(json!({ "name": { "first": "x" } }));
        let mut reader = FieldReader::new(&data);
        assert_eq!(reader.required_text("name", 1, 10), None);
        let err = reader.into_error();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues.first().unwrap().message, "must be a single value");
    }
}
