//! SQLite storage handle and connection bootstrap.
//!
//! # Responsibility
//! - Own the single SQLite connection used by every mapper operation.
//! - Open and configure file or in-memory databases.
//!
//! # Invariants
//! - A `Store` is passed explicitly; there is no process-wide default handle.
//! - `rusqlite::Connection` is `!Sync`, so one `Store` serves one writer.
//! - Returned stores have `foreign_keys=ON`.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod open;

pub use open::{open_store, open_store_in_memory};

pub type DbResult<T> = Result<T, DbError>;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Whether `name` can be formatted into SQL as a bare identifier.
pub(crate) fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid table name `{0}`")]
    InvalidIdentifier(String),
    #[error("failed to prepare database directory `{path}`: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Storage handle bound to one database file (or memory).
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    pub(crate) fn new(conn: Connection, path: Option<PathBuf>) -> Self {
        Self { conn, path }
    }

    /// Underlying connection for mapper operations.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns whether a table with the given name exists.
    pub fn table_exists(&self, table: &str) -> DbResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1 COLLATE NOCASE
            );",
            [table],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Counts rows in a table.
    ///
    /// # Errors
    /// - `InvalidIdentifier` when `table` is not a bare SQL identifier.
    pub fn row_count(&self, table: &str) -> DbResult<i64> {
        if !is_identifier(table) {
            return Err(DbError::InvalidIdentifier(table.to_string()));
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}
