//! Error and outcome types shared by the entity and relation mappers.
//!
//! `MapperError` covers programmer errors and read failures; they abort the
//! operation. Write failures are data conditions and travel as values inside
//! [`SaveOutcome`].

use crate::db::DbError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type MapperResult<T> = Result<T, MapperError>;

#[derive(Debug, Error)]
pub enum MapperError {
    /// A value or declared field kind has no storage mapping.
    #[error("unsupported type `{type_name}`{}", field_suffix(.field))]
    UnsupportedType {
        field: Option<String>,
        type_name: String,
    },
    /// NaN and infinities cannot be read back from SQLite or JSON.
    #[error("non-finite float `{value}`{}", field_suffix(.field))]
    NonFiniteFloat {
        field: Option<String>,
        value: String,
    },
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("unknown column `{column}` in table `{table}`")]
    UnknownColumn { table: String, column: String },
    #[error("record for `{entity}` is missing field `{field}`")]
    MissingField { entity: String, field: String },
    #[error("field `{field}` declared as {expected} but holds {actual}")]
    KindMismatch {
        field: String,
        expected: String,
        actual: String,
    },
    #[error("invalid schema for `{table}`: {message}")]
    InvalidSchema { table: String, message: String },
}

impl MapperError {
    /// Attaches the field name to a value error raised by a pure coercion.
    pub(crate) fn for_field(self, name: &str) -> Self {
        match self {
            Self::UnsupportedType {
                field: None,
                type_name,
            } => Self::UnsupportedType {
                field: Some(name.to_string()),
                type_name,
            },
            Self::NonFiniteFloat { field: None, value } => Self::NonFiniteFloat {
                field: Some(name.to_string()),
                value,
            },
            other => other,
        }
    }
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|name| format!(" for field `{name}`"))
        .unwrap_or_default()
}

impl From<rusqlite::Error> for MapperError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whether `save` may overwrite a row that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Persisted entities are written back by primary key.
    #[default]
    Update,
    /// Persisted entities are left untouched and the save is reported as skipped.
    Skip,
}

/// Category of a rejected write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailureKind {
    /// UNIQUE, NOT NULL or FOREIGN KEY constraint rejected the row.
    Constraint,
    /// UPDATE targeted an id that has no row.
    MissingRow,
    /// Any other storage engine error.
    Storage,
}

/// A recoverable write failure. The entity keeps its previous `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub kind: WriteFailureKind,
    pub message: String,
}

impl WriteFailure {
    pub(crate) fn from_sqlite(err: &rusqlite::Error) -> Self {
        let kind = match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => WriteFailureKind::Constraint,
            _ => WriteFailureKind::Storage,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }

    pub(crate) fn missing_row(table: &str, id: i64) -> Self {
        Self {
            kind: WriteFailureKind::MissingRow,
            message: format!("no row with id {id} in {table}"),
        }
    }
}

impl Display for WriteFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Result of a save call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(i64),
    Updated(i64),
    /// Caller asked not to overwrite an already persisted entity.
    Skipped,
    Failed(WriteFailure),
}

impl SaveOutcome {
    /// Row id written by this save, if any.
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Inserted(id) | Self::Updated(id) => Some(*id),
            Self::Skipped | Self::Failed(_) => None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id().is_some()
    }

    pub fn failure(&self) -> Option<&WriteFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}
