//! Storage error classifier
//!
//! Collapses SQLite result codes into the small [`ErrorKind`] taxonomy so
//! handlers only branch on a handful of kinds. Table names, column names
//! and engine codes never reach a caller, except through the curated
//! unique-field messages below.

use tracing::{error, warn};

use super::errors::{ErrorMeta, StorageError};
use crate::common::NormalizedError;

/// User-facing messages for unique constraint violations, keyed by column
const UNIQUE_CONSTRAINT_MESSAGES: &[(&str, &str)] = &[
    ("email", "This email is already in use"),
    ("phoneNumber", "This phone number is already registered"),
    ("phone_number", "This phone number is already registered"),
    ("whatsappNumber", "This WhatsApp number is already in use"),
    ("whatsapp_number", "This WhatsApp number is already in use"),
    ("code", "This code already exists"),
    ("token", "This token already exists"),
    ("username", "This username is already taken"),
    (
        "external_subject_id",
        "This Google account is already linked to another user",
    ),
];

// SQLite extended result codes
const SQLITE_ERROR: i64 = 1;
const SQLITE_IOERR: i64 = 10;
const SQLITE_CANTOPEN: i64 = 14;
const SQLITE_TOOBIG: i64 = 18;
const SQLITE_CONSTRAINT: i64 = 19;
const SQLITE_MISMATCH: i64 = 20;
const SQLITE_RANGE: i64 = 25;
const SQLITE_NOTADB: i64 = 26;
const SQLITE_CONSTRAINT_CHECK: i64 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY: i64 = 787;
const SQLITE_CONSTRAINT_NOTNULL: i64 = 1299;
const SQLITE_CONSTRAINT_PRIMARYKEY: i64 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i64 = 2067;

const MSG_REFERENCE: &str = "Referenced resource does not exist or cannot be deleted";
const MSG_NOT_FOUND: &str = "Record not found";
const MSG_INVALID_DATA: &str = "Invalid data provided";
const MSG_UNEXPECTED: &str = "An unexpected database error occurred";
const MSG_CONNECTION: &str = "Database connection failed";
const MSG_FAILED: &str = "Database operation failed";

/// Classify a raw storage failure into a user-safe error.
///
/// `context` names the failed operation and is only logged.
pub fn classify(raw: StorageError, context: &str) -> NormalizedError {
    match raw {
        StorageError::Database {
            code,
            message,
            meta,
        } => {
            warn!(
                context = %context,
                code = ?code,
                message = %message,
                meta = %meta,
                "Database error"
            );
            classify_code(code.as_deref(), &meta, context)
        }
        StorageError::RecordNotFound => {
            warn!(context = %context, "Database error: record not found");
            NormalizedError::not_found(MSG_NOT_FOUND)
        }
        StorageError::Interpretation(detail) => {
            error!(
                context = %context,
                detail = %detail,
                "Query interpretation error in database operation"
            );
            NormalizedError::internal(MSG_UNEXPECTED)
        }
        StorageError::Connection(detail) => {
            error!(context = %context, detail = %detail, "Database connection error");
            NormalizedError::internal(MSG_CONNECTION)
        }
        StorageError::Application(err) => err,
    }
}

fn classify_code(code: Option<&str>, meta: &ErrorMeta, context: &str) -> NormalizedError {
    // the raw code was already logged by `classify`
    let Some(extended) = code.and_then(|c| c.trim().parse::<i64>().ok()) else {
        return NormalizedError::internal(MSG_FAILED);
    };
    let primary = extended & 0xff;

    match extended {
        SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => {
            NormalizedError::conflict(unique_violation_message(meta))
        }
        SQLITE_CONSTRAINT_FOREIGNKEY => NormalizedError::invalid_reference(MSG_REFERENCE),
        SQLITE_CONSTRAINT_NOTNULL => {
            let field = meta.field_name.as_deref().unwrap_or("required field");
            NormalizedError::bad_request(format!("{} is required", field))
        }
        SQLITE_CONSTRAINT_CHECK | SQLITE_CONSTRAINT | SQLITE_MISMATCH | SQLITE_TOOBIG
        | SQLITE_RANGE => NormalizedError::bad_request(MSG_INVALID_DATA),
        SQLITE_ERROR => {
            error!(
                context = %context,
                code = extended,
                "Syntax error in database query"
            );
            NormalizedError::internal(MSG_UNEXPECTED)
        }
        _ if matches!(primary, SQLITE_IOERR | SQLITE_CANTOPEN | SQLITE_NOTADB) => {
            error!(context = %context, code = extended, "Database connection error");
            NormalizedError::internal(MSG_CONNECTION)
        }
        _ => NormalizedError::internal(MSG_FAILED),
    }
}

fn unique_violation_message(meta: &ErrorMeta) -> String {
    let field = meta
        .target
        .first()
        .map(String::as_str)
        .unwrap_or("unknown field");

    UNIQUE_CONSTRAINT_MESSAGES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, message)| message.to_string())
        .unwrap_or_else(|| format!("{} already exists", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorKind;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn db_error(code: &str, target: &[&str], field_name: Option<&str>) -> StorageError {
        StorageError::Database {
            code: Some(code.to_string()),
            message: "engine message".to_string(),
            meta: ErrorMeta {
                target: target.iter().map(|t| t.to_string()).collect(),
                field_name: field_name.map(str::to_string),
            },
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_unique_email_is_conflict_with_friendly_message() {
        let err = classify(db_error("2067", &["email"], None), "create user");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "This email is already in use");
    }

    #[test]
    fn test_unique_unknown_field_uses_generic_message() {
        let err = classify(db_error("2067", &["nickname"], None), "create user");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "nickname already exists");

        let err = classify(db_error("1555", &[], None), "create user");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "unknown field already exists");
    }

    #[test]
    fn test_unique_subject_id_message() {
        let err = classify(
            db_error("2067", &["external_subject_id"], None),
            "create user",
        );
        assert_eq!(
            err.message,
            "This Google account is already linked to another user"
        );
    }

    #[test]
    fn test_foreign_key_is_invalid_reference() {
        let err = classify(db_error("787", &[], None), "delete user");
        assert_eq!(err.kind, ErrorKind::InvalidReference);
        assert_eq!(err.message, MSG_REFERENCE);
    }

    #[test]
    fn test_record_not_found() {
        let err = classify(StorageError::RecordNotFound, "update user");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Record not found");
    }

    #[test]
    fn test_required_field_names_the_field() {
        let err = classify(
            db_error("1299", &["display_name"], Some("display_name")),
            "create user",
        );
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert_eq!(err.message, "display_name is required");

        let err = classify(db_error("1299", &[], None), "create user");
        assert_eq!(err.message, "required field is required");
    }

    #[test]
    fn test_engine_validation_is_bad_request_without_detail() {
        for code in ["275", "19", "20", "18", "25"] {
            let err = classify(db_error(code, &["role"], None), "update user");
            assert_eq!(err.kind, ErrorKind::BadRequest, "code {}", code);
            assert_eq!(err.message, MSG_INVALID_DATA);
        }
    }

    #[test]
    fn test_syntax_error_is_internal_and_generic() {
        let err = classify(db_error("1", &[], None), "find user");
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, MSG_UNEXPECTED);

        let err = classify(
            StorageError::Interpretation("no column found for name: role".to_string()),
            "find user",
        );
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(!err.message.contains("role"));
    }

    #[test]
    fn test_connection_failures_are_internal() {
        for code in ["14", "26", "10", "266"] {
            let err = classify(db_error(code, &[], None), "find user");
            assert_eq!(err.kind, ErrorKind::Internal, "code {}", code);
            assert_eq!(err.message, MSG_CONNECTION);
        }

        let err = classify(
            StorageError::Connection("pool timed out".to_string()),
            "find user",
        );
        assert_eq!(err.message, MSG_CONNECTION);
    }

    #[test]
    fn test_unrecognized_code_is_logged_but_not_returned() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let err = tracing::subscriber::with_default(subscriber, || {
            classify(db_error("4242", &[], None), "lookup user by email")
        });

        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, MSG_FAILED);
        assert!(err.details.is_none());
        assert!(!err.message.contains("4242"));

        let output = logs.contents();
        assert!(output.contains("4242"), "raw code missing from logs: {}", output);
        assert!(output.contains("lookup user by email"));
        assert_eq!(
            output.lines().filter(|line| line.contains("WARN")).count(),
            1,
            "expected a single warning: {}",
            output
        );
    }

    #[test]
    fn test_missing_or_non_numeric_code_is_internal() {
        let err = classify(
            StorageError::Database {
                code: None,
                message: "driver failure".to_string(),
                meta: ErrorMeta::default(),
            },
            "find user",
        );
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, MSG_FAILED);

        let err = classify(db_error("P2002", &["email"], None), "find user");
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_application_errors_pass_through_unchanged() {
        let original = NormalizedError::unauthorized("User not found");
        let err = classify(StorageError::Application(original.clone()), "find user");
        assert_eq!(err, original);
    }
}
