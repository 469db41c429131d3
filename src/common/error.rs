// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;

/// Field name to the list of problems reported for it
pub type ErrorDetails = BTreeMap<String, Vec<String>>;

/// Stable error taxonomy exposed to API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InvalidReference,
    Internal,
}

impl ErrorKind {
    /// Transport-level status for this kind
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidReference => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code rendered in error bodies
    pub fn as_code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InvalidReference => "INVALID_REFERENCE",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Classified, user-safe failure.
///
/// Every error that leaves the core passes through this type. Messages of
/// [`ErrorKind::Internal`] are always generic; the diagnostic detail is
/// logged where the error is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    #[allow(dead_code)]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidReference, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl IntoResponse for NormalizedError {
    fn into_response(self) -> axum::response::Response {
        let status = self.kind.status_code();
        if self.kind == ErrorKind::Internal {
            error!(message = %self.message, "Responding with internal server error");
        }

        let error_response = ErrorResponse {
            error: self.message,
            code: self.kind.as_code().to_string(),
            details: self.details,
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to NormalizedError
impl From<ValidationResult> for NormalizedError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            return NormalizedError::internal(
                "Validation result was valid but converted to error",
            );
        }

        let mut details = ErrorDetails::new();
        for e in result.errors {
            details.entry(e.field).or_default().push(e.message);
        }
        NormalizedError::bad_request("Validation failed").with_details(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorKind::InvalidReference.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_result_groups_messages_by_field() {
        let mut result = ValidationResult::new();
        result.add_error("id_token", "must not be empty");
        result.add_error("id_token", "must be a string");

        let err = NormalizedError::from(result);

        assert_eq!(err.kind, ErrorKind::BadRequest);
        let details = err.details.expect("details should be attached");
        assert_eq!(
            details.get("id_token"),
            Some(&vec![
                "must not be empty".to_string(),
                "must be a string".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_into_response_renders_code_and_message() {
        let response = NormalizedError::conflict("This email is already in use").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "This email is already in use");
        assert_eq!(body["code"], "CONFLICT");
        assert!(body.get("details").is_none());
    }
}
