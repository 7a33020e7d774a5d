//! Domain error types.
//!
//! Operations return these instead of panicking or using exceptions for
//! control flow; the HTTP layer maps them to status codes.

use serde::Serialize;
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Denial produced by the access control evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AccessDenied {
    pub reason: String,
}

impl AccessDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DomainError {
    /// Shorthand for a validation error on one field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        DomainError::AccessDenied(AccessDenied::new(reason))
    }
}

fn summarize(errors: &[FieldError]) -> String {
    match errors {
        [single] => format!("{}: {}", single.field, single.message),
        many => format!("{} validation errors", many.len()),
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    FieldError::new(
                        field.to_string(),
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field)),
                    )
                })
            })
            .collect();
        // HashMap iteration order is not stable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        DomainError::Validation(details)
    }
}
