//! # Validation Errors
//!
//! Structured error type for malformed input, built with `thiserror`.
//! Each variant names the field that failed so that the API layer can
//! return a field-specific message.

use thiserror::Error;

/// Validation errors for domain primitives and descriptive fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Resource identifier does not match `[A-Za-z0-9_-]{1,64}`.
    #[error("invalid resource id: \"{0}\" (expected 1-64 characters of A-Z, a-z, 0-9, '_' or '-')")]
    InvalidResourceId(String),

    /// Phone identity is not 5-20 ASCII digits with an optional leading '+'.
    #[error("invalid phone: \"{0}\" (expected 5-20 digits, optionally prefixed with '+')")]
    InvalidPhone(String),

    /// A required field was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field exceeded its maximum length in characters.
    #[error("{field} must not exceed {max} characters (got {actual})")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// A numeric parameter was outside its permitted range.
    #[error("{field} is out of range: {reason}")]
    OutOfRange {
        /// Name of the offending parameter.
        field: &'static str,
        /// Human-readable constraint description.
        reason: String,
    },
}

impl ValidationError {
    /// Validate a required text field: non-empty after trimming and within
    /// `max` characters. Returns the trimmed value.
    pub fn require_text(
        field: &'static str,
        value: &str,
        max: usize,
    ) -> Result<String, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Self::EmptyField { field });
        }
        Self::check_len(field, trimmed, max)?;
        Ok(trimmed.to_string())
    }

    /// Validate that an optional text field is within `max` characters.
    pub fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
        let actual = value.chars().count();
        if actual > max {
            return Err(Self::TooLong { field, max, actual });
        }
        Ok(())
    }
}
