//! Object-relational mapping over a single SQLite store.
//!
//! # Responsibility
//! - Derive table schemas from declared entity field descriptors.
//! - Create, read and update entity rows and many-to-many junction rows.
//! - Coerce values between host types and SQLite storage types.
//!
//! # Invariants
//! - Every identifier formatted into SQL passes [`ensure_identifier`].
//! - Write failures are returned as [`SaveOutcome::Failed`], never raised.
//! - An insert and its rowid read-back run in one transaction on one
//!   connection.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

pub mod coerce;
pub mod entity;
pub mod error;
pub mod field;
pub mod record;
pub mod relation;

pub use coerce::{parse_entry, parse_stored, sql_type_of, sql_value_of, SqlType, Value};
pub use entity::Entity;
pub use error::{
    MapperError, MapperResult, SaveOutcome, UpdatePolicy, WriteFailure, WriteFailureKind,
};
pub use field::{FieldKind, FieldMeta, FieldSpec};
pub use record::Record;
pub use relation::{Relation, Side};

/// Rejects names that cannot be safely formatted into SQL as identifiers.
pub fn ensure_identifier(name: &str) -> MapperResult<()> {
    if crate::db::is_identifier(name) {
        Ok(())
    } else {
        Err(MapperError::InvalidIdentifier(name.to_string()))
    }
}

/// Runs one INSERT and reads back its rowid before committing.
fn insert_returning_rowid(
    conn: &Connection,
    sql: &str,
    values: Vec<SqlValue>,
) -> rusqlite::Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(sql, params_from_iter(values))?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::ensure_identifier;

    #[test]
    fn identifiers_reject_sql_fragments() {
        assert!(ensure_identifier("books_authors").is_ok());
        assert!(ensure_identifier("_private1").is_ok());
        assert!(ensure_identifier("1abc").is_err());
        assert!(ensure_identifier("name; DROP TABLE Books").is_err());
        assert!(ensure_identifier("").is_err());
    }
}
