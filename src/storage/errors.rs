//! Raw storage failures as reported by the engine, before classification

use std::fmt;

use crate::common::NormalizedError;

/// Engine metadata attached to a database error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMeta {
    /// Columns named by a violated constraint, in engine order
    pub target: Vec<String>,
    /// Column reported missing by a NOT NULL violation
    pub field_name: Option<String>,
}

impl fmt::Display for ErrorMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target={:?}", self.target)?;
        if let Some(field) = &self.field_name {
            write!(f, " field_name={}", field)?;
        }
        Ok(())
    }
}

/// Failure raised by a storage adapter.
///
/// Only the classifier looks inside this type; everything above the
/// storage layer sees a [`NormalizedError`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The engine rejected a statement and reported a result code
    #[error("database error (code {code:?}): {message}")]
    Database {
        code: Option<String>,
        message: String,
        meta: ErrorMeta,
    },

    /// An update or delete matched no row
    #[error("record not found")]
    RecordNotFound,

    /// A result could not be mapped back onto the expected shape
    #[error("query interpretation failed: {0}")]
    Interpretation(String),

    /// The engine could not be reached or initialised
    #[error("storage connection failed: {0}")]
    Connection(String),

    /// Already an application error; classification leaves it untouched
    #[error(transparent)]
    Application(#[from] NormalizedError),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                StorageError::Database {
                    code: db_err.code().map(|c| c.into_owned()),
                    meta: parse_constraint_meta(&message),
                    message,
                }
            }
            sqlx::Error::RowNotFound => StorageError::RecordNotFound,
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => StorageError::Interpretation(err.to_string()),
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageError::Connection(err.to_string()),
            other => StorageError::Database {
                code: None,
                message: other.to_string(),
                meta: ErrorMeta::default(),
            },
        }
    }
}

/// Extracts column names from SQLite constraint messages such as
/// `UNIQUE constraint failed: users.email, users.external_subject_id`.
fn parse_constraint_meta(message: &str) -> ErrorMeta {
    let Some((constraint, columns)) = message.split_once(" constraint failed: ") else {
        return ErrorMeta::default();
    };

    let target: Vec<String> = columns
        .split(',')
        .map(|column| {
            let column = column.trim();
            column
                .rsplit_once('.')
                .map_or(column, |(_, name)| name)
                .to_string()
        })
        .filter(|column| !column.is_empty())
        .collect();

    let field_name = if constraint.trim() == "NOT NULL" {
        target.first().cloned()
    } else {
        None
    };

    ErrorMeta { target, field_name }
}
