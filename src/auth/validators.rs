//! Request validators for the auth endpoints

use super::models::{GoogleLoginRequest, RefreshTokenRequest};
use crate::common::{ValidationResult, Validator};

pub struct GoogleLoginValidator;

impl Validator<GoogleLoginRequest> for GoogleLoginValidator {
    fn validate(&self, data: &GoogleLoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_non_empty("id_token", &data.id_token);
        result
    }
}

pub struct RefreshTokenValidator;

impl Validator<RefreshTokenRequest> for RefreshTokenValidator {
    fn validate(&self, data: &RefreshTokenRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_non_empty("refresh_token", &data.refresh_token);
        result
    }
}
