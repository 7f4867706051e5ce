//! Generic single-table entity mapper.
//!
//! # Responsibility
//! - Provision one table per entity type from its declared descriptors.
//! - Load, list and save entity rows; expose form metadata lookups.
//!
//! # Invariants
//! - Table name is the type name plus `s`; column `id` is the rowid.
//! - Columns are declared, selected and bound in descriptor order.
//! - `id == 0` means transient; only a successful insert assigns an id.
//! - A failed save never changes the entity's `id`.

use super::coerce::{decode_stored, parse_entry, sql_value_of, value_from_cell, Value};
use super::error::{MapperError, MapperResult, SaveOutcome, UpdatePolicy, WriteFailure};
use super::field::{self, FieldKind, FieldSpec};
use super::record::Record;
use super::{ensure_identifier, insert_returning_rowid};
use crate::db::Store;
use log::{debug, error, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Capability implemented by every mapped record type.
pub trait Entity: Sized {
    /// Type name; the table is named after its plural.
    const TYPE_NAME: &'static str;

    /// Ordered column descriptors, excluding `id`.
    fn fields() -> &'static [FieldSpec];

    /// Field names forming the natural key. Empty opts out of UNIQUE.
    fn unique_key() -> &'static [&'static str] {
        &[]
    }

    fn id(&self) -> i64;

    /// Reserved for the mapper; application code never assigns ids.
    fn set_id(&mut self, id: i64);

    fn to_record(&self) -> Record;

    fn from_record(record: &mut Record) -> MapperResult<Self>;

    fn table_name() -> String {
        format!("{}s", Self::TYPE_NAME)
    }

    /// Natural key as ordered (field, value) pairs.
    fn unique_ids(&self) -> Vec<(&'static str, Value)> {
        let record = self.to_record();
        Self::unique_key()
            .iter()
            .filter_map(|name| record.get(name).map(|value| (*name, value.clone())))
            .collect()
    }
}

/// Idempotently provisions the entity table.
///
/// # Errors
/// - `UnsupportedType` when a descriptor has no column type; no DDL runs.
/// - `InvalidIdentifier`/`InvalidSchema` for malformed declarations.
pub fn create<T: Entity>(store: &Store) -> MapperResult<()> {
    let table = checked_table::<T>()?;
    let sql = create_table_sql::<T>(&table)?;
    debug!("event=entity_create module=mapper status=start table={table}");
    store.conn().execute_batch(&sql)?;
    debug!("event=entity_create module=mapper status=ok table={table}");
    Ok(())
}

/// Loads the row with the given id.
pub fn load<T: Entity>(store: &Store, id: i64) -> MapperResult<Option<T>> {
    load_by::<T>(store, "id", &Value::Int(id))
}

/// Loads the first row (lowest id) where `column = value`.
///
/// Returns `Ok(None)` when nothing matches.
pub fn load_by<T: Entity>(store: &Store, column: &str, value: &Value) -> MapperResult<Option<T>> {
    let table = checked_table::<T>()?;
    ensure_known_column::<T>(&table, column)?;
    let bound = sql_value_of(value).map_err(|err| err.for_field(column))?;

    let sql = format!(
        "SELECT {} FROM {table} WHERE {column} = ?1 ORDER BY id LIMIT 1;",
        select_list::<T>()
    );
    let mut stmt = store.conn().prepare(&sql)?;
    let mut rows = stmt.query([bound])?;
    let Some(row) = rows.next()? else {
        debug!("event=entity_load module=mapper status=not_found table={table} column={column}");
        return Ok(None);
    };

    let entity = entity_from_row::<T>(&table, row)?;
    debug!(
        "event=entity_load module=mapper status=ok table={table} column={column} id={}",
        entity.id()
    );
    Ok(Some(entity))
}

/// Loads the stored row sharing the entity's natural key, if any.
///
/// Always `None` for types without a unique key.
pub fn find_by_natural_key<T: Entity>(store: &Store, entity: &T) -> MapperResult<Option<T>> {
    let key = entity.unique_ids();
    if key.is_empty() {
        return Ok(None);
    }

    let table = checked_table::<T>()?;
    let mut conditions = Vec::with_capacity(key.len());
    let mut bound = Vec::with_capacity(key.len());
    for (index, (name, value)) in key.iter().enumerate() {
        ensure_identifier(name)?;
        conditions.push(format!("{name} = ?{}", index + 1));
        bound.push(sql_value_of(value).map_err(|err| err.for_field(name))?);
    }

    let sql = format!(
        "SELECT {} FROM {table} WHERE {} ORDER BY id LIMIT 1;",
        select_list::<T>(),
        conditions.join(" AND ")
    );
    let mut stmt = store.conn().prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bound))?;
    match rows.next()? {
        Some(row) => Ok(Some(entity_from_row::<T>(&table, row)?)),
        None => Ok(None),
    }
}

/// Reads every row as raw cells: `id` first, then descriptor order.
pub fn load_table<T: Entity>(store: &Store) -> MapperResult<Vec<Vec<SqlValue>>> {
    let table = checked_table::<T>()?;
    debug!("event=entity_load_table module=mapper status=start table={table}");

    let width = T::fields().len() + 1;
    let mut stmt = store
        .conn()
        .prepare(&format!("SELECT {} FROM {table} ORDER BY id;", select_list::<T>()))?;
    let mut rows = stmt.query([])?;
    let mut table_rows = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for index in 0..width {
            cells.push(row.get::<_, SqlValue>(index)?);
        }
        table_rows.push(cells);
    }
    Ok(table_rows)
}

/// Reads the distinct non-NULL values of one column, in first-seen order.
///
/// Text cells are rebuilt with [`super::parse_stored`].
pub fn load_column<T: Entity>(store: &Store, column: &str) -> MapperResult<Vec<Value>> {
    let table = checked_table::<T>()?;
    ensure_known_column::<T>(&table, column)?;
    debug!("event=entity_load_column module=mapper status=start table={table} column={column}");

    let mut stmt = store.conn().prepare(&format!(
        "SELECT {column} FROM {table} GROUP BY {column} ORDER BY MIN(id);"
    ))?;
    let mut rows = stmt.query([])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let raw: SqlValue = row.get(0)?;
        if let Some(value) = value_from_cell(&raw) {
            values.push(value);
        }
    }
    Ok(values)
}

/// Renders every stored entity through its `Display` form, ordered by id.
pub fn list_all<T: Entity + Display>(store: &Store) -> MapperResult<Vec<String>> {
    let table = checked_table::<T>()?;
    let mut stmt = store
        .conn()
        .prepare(&format!("SELECT {} FROM {table} ORDER BY id;", select_list::<T>()))?;
    let mut rows = stmt.query([])?;
    let mut rendered = Vec::new();
    while let Some(row) = rows.next()? {
        rendered.push(entity_from_row::<T>(&table, row)?.to_string());
    }
    Ok(rendered)
}

/// Inserts a transient entity or updates a persisted one.
///
/// # Returns
/// - `Inserted(id)` and assigns `id` for transient entities.
/// - `Updated(id)` for persisted entities under `UpdatePolicy::Update`.
/// - `Skipped` for persisted entities under `UpdatePolicy::Skip`.
/// - `Failed(_)` on constraint violations or storage errors; `id` unchanged.
///
/// # Errors
/// - `UnsupportedType`/`KindMismatch`/`MissingField` when the entity's record
///   does not fit its declared descriptors. Nothing is written.
pub fn save<T: Entity>(
    store: &Store,
    entity: &mut T,
    policy: UpdatePolicy,
) -> MapperResult<SaveOutcome> {
    let table = checked_table::<T>()?;
    let values = bind_values(entity)?;
    let id = entity.id();

    if id == 0 {
        return Ok(insert_row::<T>(store, &table, entity, values));
    }

    match policy {
        UpdatePolicy::Update => Ok(update_row::<T>(store, &table, id, values)),
        UpdatePolicy::Skip => {
            warn!("event=entity_save module=mapper status=skipped table={table} id={id}");
            Ok(SaveOutcome::Skipped)
        }
    }
}

/// Aliases of described fields, in declaration order.
pub fn aliases<T: Entity>() -> Vec<&'static str> {
    field::aliases(T::fields())
}

pub fn alias_to_field<T: Entity>() -> BTreeMap<&'static str, &'static str> {
    field::alias_to_field(T::fields())
}

pub fn alias_to_description<T: Entity>() -> BTreeMap<&'static str, &'static str> {
    field::alias_to_description(T::fields())
}

pub fn field_to_alias<T: Entity>() -> BTreeMap<&'static str, &'static str> {
    field::field_to_alias(T::fields())
}

pub fn field_to_type<T: Entity>() -> BTreeMap<&'static str, FieldKind> {
    field::field_to_type(T::fields())
}

pub fn field_to_description<T: Entity>() -> BTreeMap<&'static str, &'static str> {
    field::field_to_description(T::fields())
}

/// Writes alias-keyed form input back into an entity.
///
/// Each entry is parsed by its field's declared kind; fields without an entry
/// keep their current value, as does the entity's `id`. Nothing changes
/// unless every entry parses.
///
/// # Errors
/// - `UnknownColumn` for an alias that no described field carries.
/// - `InvalidData` when an entry does not parse as its field's kind.
pub fn apply_entry<T: Entity>(entity: &mut T, entry: &BTreeMap<&str, &str>) -> MapperResult<()> {
    let alias_fields = alias_to_field::<T>();
    let mut record = entity.to_record();
    for (alias, text) in entry {
        let Some(field) = alias_fields
            .get(*alias)
            .and_then(|name| T::fields().iter().find(|field| field.name == *name))
        else {
            return Err(MapperError::UnknownColumn {
                table: T::table_name(),
                column: (*alias).to_string(),
            });
        };
        let value = parse_entry(field.kind, text).map_err(|err| match err {
            MapperError::InvalidData(message) => {
                MapperError::InvalidData(format!("{}: {message}", field.name))
            }
            other => other.for_field(field.name),
        })?;
        record.insert(field.name, value);
    }

    let mut rebuilt = T::from_record(&mut record)?;
    rebuilt.set_id(entity.id());
    *entity = rebuilt;
    debug!(
        "event=entity_apply_entry module=mapper status=ok entity={} fields={}",
        T::TYPE_NAME,
        entry.len()
    );
    Ok(())
}

fn insert_row<T: Entity>(
    store: &Store,
    table: &str,
    entity: &mut T,
    values: Vec<SqlValue>,
) -> SaveOutcome {
    let sql = if values.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES;")
    } else {
        let columns = T::fields()
            .iter()
            .map(|field| field.name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {table} ({columns}) VALUES ({placeholders});")
    };

    match insert_returning_rowid(store.conn(), &sql, values) {
        Ok(id) => {
            entity.set_id(id);
            debug!("event=entity_save module=mapper status=ok op=insert table={table} id={id}");
            SaveOutcome::Inserted(id)
        }
        Err(err) => {
            let failure = WriteFailure::from_sqlite(&err);
            error!(
                "event=entity_save module=mapper status=error op=insert table={table} kind={:?} error={}",
                failure.kind, err
            );
            SaveOutcome::Failed(failure)
        }
    }
}

fn update_row<T: Entity>(store: &Store, table: &str, id: i64, values: Vec<SqlValue>) -> SaveOutcome {
    let result = if values.is_empty() {
        store
            .conn()
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1;"),
                [id],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| usize::from(count > 0))
    } else {
        let assignments = T::fields()
            .iter()
            .enumerate()
            .map(|(index, field)| format!("{} = ?{}", field.name, index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {table} SET {assignments} WHERE id = ?{};",
            values.len() + 1
        );
        let mut bound = values;
        bound.push(SqlValue::Integer(id));
        store.conn().execute(&sql, params_from_iter(bound))
    };

    match result {
        Ok(0) => {
            let failure = WriteFailure::missing_row(table, id);
            error!(
                "event=entity_save module=mapper status=error op=update table={table} id={id} kind={:?}",
                failure.kind
            );
            SaveOutcome::Failed(failure)
        }
        Ok(_) => {
            debug!("event=entity_save module=mapper status=ok op=update table={table} id={id}");
            SaveOutcome::Updated(id)
        }
        Err(err) => {
            let failure = WriteFailure::from_sqlite(&err);
            error!(
                "event=entity_save module=mapper status=error op=update table={table} id={id} kind={:?} error={}",
                failure.kind, err
            );
            SaveOutcome::Failed(failure)
        }
    }
}

/// Converts the entity's record into SQL values in descriptor order.
fn bind_values<T: Entity>(entity: &T) -> MapperResult<Vec<SqlValue>> {
    let mut record = entity.to_record();
    let mut values = Vec::with_capacity(T::fields().len());
    for field in T::fields() {
        let value = record.take(field.name)?;
        let bound = sql_value_of(&value).map_err(|err| err.for_field(field.name))?;
        if value.kind() != field.kind {
            return Err(MapperError::KindMismatch {
                field: field.name.to_string(),
                expected: field.kind.to_string(),
                actual: value.kind().to_string(),
            });
        }
        values.push(bound);
    }

    if let Some(extra) = record.names().next() {
        return Err(MapperError::InvalidSchema {
            table: T::table_name(),
            message: format!("record carries undeclared field `{extra}`"),
        });
    }
    Ok(values)
}

fn entity_from_row<T: Entity>(table: &str, row: &Row<'_>) -> MapperResult<T> {
    let id: i64 = row.get(0)?;
    let mut record = Record::new(T::TYPE_NAME);
    for (index, field) in T::fields().iter().enumerate() {
        let raw: SqlValue = row.get(index + 1)?;
        let value = decode_stored(field.kind, &raw).map_err(|err| match err {
            MapperError::InvalidData(message) => {
                MapperError::InvalidData(format!("{table}.{} (id {id}): {message}", field.name))
            }
            other => other.for_field(field.name),
        })?;
        record.insert(field.name, value);
    }

    let mut entity = T::from_record(&mut record)?;
    entity.set_id(id);
    Ok(entity)
}

fn create_table_sql<T: Entity>(table: &str) -> MapperResult<String> {
    let mut columns = vec!["id INTEGER PRIMARY KEY".to_string()];
    let mut declared = BTreeSet::new();
    for field in T::fields() {
        ensure_identifier(field.name)?;
        if field.name.eq_ignore_ascii_case("id") {
            return Err(MapperError::InvalidSchema {
                table: table.to_string(),
                message: "`id` is reserved for the primary key".to_string(),
            });
        }
        if !declared.insert(field.name) {
            return Err(MapperError::InvalidSchema {
                table: table.to_string(),
                message: format!("duplicate column `{}`", field.name),
            });
        }
        let sql_type = field.kind.sql_type().map_err(|err| err.for_field(field.name))?;
        columns.push(format!("{} {}", field.name, sql_type));
    }

    let key = T::unique_key();
    if !key.is_empty() {
        if let Some(unknown) = key.iter().find(|name| !declared.contains(*name)) {
            return Err(MapperError::InvalidSchema {
                table: table.to_string(),
                message: format!("unique key names undeclared field `{unknown}`"),
            });
        }
        columns.push(format!("UNIQUE ({})", key.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({});",
        columns.join(", ")
    ))
}

fn checked_table<T: Entity>() -> MapperResult<String> {
    let table = T::table_name();
    ensure_identifier(&table)?;
    Ok(table)
}

fn ensure_known_column<T: Entity>(table: &str, column: &str) -> MapperResult<()> {
    if column == "id" || T::fields().iter().any(|field| field.name == column) {
        Ok(())
    } else {
        Err(MapperError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

fn select_list<T: Entity>() -> String {
    std::iter::once("id")
        .chain(T::fields().iter().map(|field| field.name))
        .collect::<Vec<_>>()
        .join(", ")
}
