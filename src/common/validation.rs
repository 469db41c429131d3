// Request validation collector shared by the handlers

use super::error::NormalizedError;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Accumulates every field problem of a request before failing it
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Records an error when `value` is empty after trimming
    pub fn require_non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(field, "must not be empty");
        }
    }

    /// Turns the collected errors into a `bad_request` with per-field details
    pub fn into_result(self) -> Result<(), NormalizedError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}
