//! Per-route declarative payload checks.
//!
//! Routes declare an ordered list of `FieldRule`s. The gate evaluates every rule
//! against the raw payload (after uploads have been classified, before any
//! coercion) and fails the request with the complete list of failures.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::{AppError, FieldError};
use crate::models::{ContactStatus, PersonCategory};

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$")
        .expect("email pattern is valid")
});

/// Email shape shared by the gate and the schema checks.
pub fn is_email(candidate: &str) -> bool {
    EMAIL_SHAPE.is_match(candidate.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Present, non-null, and not blank (an empty list also counts as blank).
    NotEmpty,
    Email,
    /// Membership in a fixed set, compared case-insensitively since stored
    /// choices are normalized to uppercase afterwards.
    OneOf(&'static [&'static str]),
    MinLength(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub check: Check,
    pub message: &'static str,
    /// Optional rules are skipped entirely when the field is absent.
    pub optional: bool,
}

impl FieldRule {
    pub const fn new(field: &'static str, check: Check, message: &'static str) -> Self {
        Self {
            field,
            check,
            message,
            optional: false,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn passes(&self, value: Option<&Value>) -> bool {
        let text = match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(items)) => {
                return match self.check {
                    Check::NotEmpty => !items.is_empty(),
                    Check::MinLength(min) => items.len() >= min,
                    _ => false,
                };
            }
            Some(other) => other.to_string(),
        };

        match self.check {
            Check::NotEmpty => !text.is_empty(),
            Check::Email => is_email(&text),
            Check::OneOf(options) => options.iter().any(|o| o.eq_ignore_ascii_case(&text)),
            Check::MinLength(min) => text.chars().count() >= min,
        }
    }
}

/// Runs every rule and reports all failures at once.
pub fn validate(payload: &Map<String, Value>, rules: &[FieldRule]) -> Result<(), AppError> {
    let errors: Vec<FieldError> = rules
        .iter()
        .filter(|rule| {
            let value = payload.get(rule.field);
            let absent = matches!(value, None | Some(Value::Null));
            !(rule.optional && absent) && !rule.passes(value)
        })
        .map(|rule| FieldError::new(rule.field, rule.message))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(failures = errors.len(), "payload rejected by validation gate");
        Err(AppError::ValidationFailed(errors))
    }
}

// --- Route Rule Sets ---

pub const PERSON_RULES: &[FieldRule] = &[
    FieldRule::new("name", Check::NotEmpty, "Name is required"),
    FieldRule::new("designation", Check::NotEmpty, "Designation is required"),
    FieldRule::new("category", Check::NotEmpty, "Category is required"),
    FieldRule::new("category", Check::OneOf(PersonCategory::NAMES), "Invalid category"),
    FieldRule::new("email", Check::Email, "Please provide a valid email").optional(),
];

pub const PROJECT_RULES: &[FieldRule] = &[
    FieldRule::new("title", Check::NotEmpty, "Title is required"),
    FieldRule::new("description", Check::NotEmpty, "Description is required"),
    FieldRule::new("category", Check::NotEmpty, "Category is required"),
];

pub const TESTIMONIAL_RULES: &[FieldRule] = &[
    FieldRule::new("name", Check::NotEmpty, "Name is required"),
    FieldRule::new("designation", Check::NotEmpty, "Designation is required"),
    FieldRule::new("message", Check::NotEmpty, "Message is required"),
];

pub const GALLERY_RULES: &[FieldRule] = &[FieldRule::new("title", Check::NotEmpty, "Title is required")];

pub const CONTACT_RULES: &[FieldRule] = &[
    FieldRule::new("name", Check::NotEmpty, "Name is required"),
    FieldRule::new("email", Check::Email, "Please provide a valid email"),
    FieldRule::new("subject", Check::NotEmpty, "Subject is required"),
    FieldRule::new("message", Check::NotEmpty, "Message is required"),
];

/// Admin edits of a contact message: typically only the status moves.
pub const CONTACT_UPDATE_RULES: &[FieldRule] = &[
    FieldRule::new("status", Check::OneOf(ContactStatus::NAMES), "Invalid status").optional(),
    FieldRule::new("email", Check::Email, "Please provide a valid email").optional(),
];
