//! Generic many-to-many junction table mapper.
//!
//! # Responsibility
//! - Provision a junction table between two entity tables.
//! - Record and look up (A, B) id pairs.
//!
//! # Invariants
//! - Junction columns are `<a type>_id` and `<b type>_id`, lowercase.
//! - A pair is stored at most once (UNIQUE over both columns).
//! - Both columns reference their entity table's `id`.
//! - Lookups from either side are served by an index.

use super::entity::Entity;
use super::error::{MapperError, MapperResult, SaveOutcome, WriteFailure};
use super::{ensure_identifier, insert_returning_rowid};
use crate::db::Store;
use log::{debug, error};
use rusqlite::types::Value as SqlValue;

/// Binds two entity types to an explicitly named junction table.
pub trait Relation {
    type A: Entity;
    type B: Entity;

    const TABLE_NAME: &'static str;
}

/// Which side of a relation a looked-up id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Resolved, validated junction table layout.
struct Junction {
    table: &'static str,
    a_column: String,
    b_column: String,
}

impl Junction {
    fn of<R: Relation>() -> MapperResult<Self> {
        ensure_identifier(R::TABLE_NAME)?;
        let a_column = format!("{}_id", R::A::TYPE_NAME.to_lowercase());
        let b_column = format!("{}_id", R::B::TYPE_NAME.to_lowercase());
        ensure_identifier(&a_column)?;
        ensure_identifier(&b_column)?;
        if a_column == b_column {
            return Err(MapperError::InvalidSchema {
                table: R::TABLE_NAME.to_string(),
                message: format!("both sides map to column `{a_column}`"),
            });
        }
        Ok(Self {
            table: R::TABLE_NAME,
            a_column,
            b_column,
        })
    }

    fn column(&self, side: Side) -> &str {
        match side {
            Side::A => &self.a_column,
            Side::B => &self.b_column,
        }
    }
}

/// Idempotently provisions the junction table.
pub fn create<R: Relation>(store: &Store) -> MapperResult<()> {
    let junction = Junction::of::<R>()?;
    let a_table = R::A::table_name();
    let b_table = R::B::table_name();
    ensure_identifier(&a_table)?;
    ensure_identifier(&b_table)?;

    let Junction {
        table,
        a_column,
        b_column,
    } = &junction;
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            {a_column} INTEGER NOT NULL,
            {b_column} INTEGER NOT NULL,
            FOREIGN KEY ({a_column}) REFERENCES {a_table}(id),
            FOREIGN KEY ({b_column}) REFERENCES {b_table}(id),
            UNIQUE ({a_column}, {b_column})
        );"
    );
    // The UNIQUE autoindex leads with the A column; B-side lookups need their own.
    let b_index = format!("{table}_{b_column}_idx");
    ensure_identifier(&b_index)?;
    let index_sql = format!("CREATE INDEX IF NOT EXISTS {b_index} ON {table} ({b_column});");

    debug!(
        "event=relation_create module=mapper status=start table={table} a={a_column} b={b_column}"
    );
    let tx = store.conn().unchecked_transaction()?;
    tx.execute_batch(&sql)?;
    tx.execute_batch(&index_sql)?;
    tx.commit()?;
    debug!("event=relation_create module=mapper status=ok table={table} index={b_index}");
    Ok(())
}

/// Returns the ids on the other side linked to `id` on `side`, in link order.
pub fn lookup_related_ids<R: Relation>(store: &Store, id: i64, side: Side) -> MapperResult<Vec<i64>> {
    let junction = Junction::of::<R>()?;
    let filter = junction.column(side);
    let target = junction.column(side.other());

    let mut stmt = store.conn().prepare(&format!(
        "SELECT {target} FROM {} WHERE {filter} = ?1 ORDER BY rowid;",
        junction.table
    ))?;
    let mut rows = stmt.query([id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get::<_, i64>(0)?);
    }
    debug!(
        "event=relation_lookup module=mapper status=ok table={} side={:?} id={} found={}",
        junction.table,
        side,
        id,
        ids.len()
    );
    Ok(ids)
}

/// Reads every (a_id, b_id) pair, in link order.
pub fn load_table<R: Relation>(store: &Store) -> MapperResult<Vec<(i64, i64)>> {
    let junction = Junction::of::<R>()?;
    let mut stmt = store.conn().prepare(&format!(
        "SELECT {}, {} FROM {} ORDER BY rowid;",
        junction.a_column, junction.b_column, junction.table
    ))?;
    let mut rows = stmt.query([])?;
    let mut pairs = Vec::new();
    while let Some(row) = rows.next()? {
        pairs.push((row.get(0)?, row.get(1)?));
    }
    Ok(pairs)
}

/// Links `a_id` and `b_id`.
///
/// Returns `Inserted(rowid)` of the junction row, or `Failed(_)` when the pair
/// already exists, an id has no entity row, or storage rejects the write.
pub fn save<R: Relation>(store: &Store, (a_id, b_id): (i64, i64)) -> MapperResult<SaveOutcome> {
    let junction = Junction::of::<R>()?;
    let sql = format!(
        "INSERT INTO {} ({}, {}) VALUES (?1, ?2);",
        junction.table, junction.a_column, junction.b_column
    );

    let values = vec![SqlValue::Integer(a_id), SqlValue::Integer(b_id)];
    match insert_returning_rowid(store.conn(), &sql, values) {
        Ok(rowid) => {
            debug!(
                "event=relation_save module=mapper status=ok table={} a={a_id} b={b_id} rowid={rowid}",
                junction.table
            );
            Ok(SaveOutcome::Inserted(rowid))
        }
        Err(err) => {
            let failure = WriteFailure::from_sqlite(&err);
            error!(
                "event=relation_save module=mapper status=error table={} a={a_id} b={b_id} kind={:?} error={}",
                junction.table, failure.kind, err
            );
            Ok(SaveOutcome::Failed(failure))
        }
    }
}
