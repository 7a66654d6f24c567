//! Validation error types shared by every form schema.

use core::fmt;

use serde::Serialize;

/// A single problem with one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Field name as the client sent it (camelCase).
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl Issue {
    /// Create a new issue for a field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A submission failed its schema.
///
/// This is a client error. It is returned to the caller with every issue
/// that was found, never just the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Every field-level problem found in the submission.
    pub issues: Vec<Issue>,
}

impl ValidationError {
    /// Create a validation error from collected issues.
    ///
    /// An empty list still produces a usable error that points at the body.
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            return Self::single("body", "submission is invalid");
        }
        Self { issues }
    }

    /// Create a validation error with a single issue.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue::new(field, message)],
        }
    }

    /// Returns true if any issue refers to `field`.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.issues.iter().map(|i| i.field.as_str()).collect();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}
