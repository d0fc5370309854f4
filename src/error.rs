//! Validation errors shared by the stores and flows.
//!
//! Invalid caller input is reported as a value, never as a panic. Each
//! module wraps [`ValidationError`] into its own error enum where it needs
//! more variants.

use thiserror::Error;

/// A caller-supplied value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// The field was empty or whitespace-only.
    #[must_use]
    pub fn blank(field: &'static str) -> Self {
        Self::new(field, "must not be empty")
    }
}

/// Reject empty and whitespace-only strings.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::blank(field));
    }
    Ok(())
}
