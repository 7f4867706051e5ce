//! Type coercion between host values and SQLite storage values.
//!
//! # Responsibility
//! - Map a host [`Value`] to its column type and to a bindable SQL value.
//! - Rebuild host values from stored cells, either by declared kind or by
//!   content detection for untyped reads.
//!
//! # Invariants
//! - Values without a storage mapping fail loudly; nothing is stored as NULL.
//! - Composite values are stored as a versioned JSON envelope and decoded by
//!   serde; stored text is never evaluated.
//! - DATETIME cells hold canonical `YYYY-MM-DD HH:MM:SS[.fraction]` text.

use super::error::{MapperError, MapperResult};
use super::field::FieldKind;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Current composite envelope version written by [`sql_value_of`].
pub const COMPOSITE_FORMAT_VERSION: u32 = 1;

/// Canonical DATETIME text format.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const RECOGNIZED_DATETIME_FORMATS: &[&str] = &[
    DATETIME_FORMAT,
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

static DATETIME_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?$")
        .expect("datetime shape pattern is valid")
});

/// Column type of the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    DateTime,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::DateTime => "DATETIME",
        }
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Type name carried by [`Value::Opaque`].
///
/// Spelled through an alias so serde's derive does not treat the variant as
/// borrowing from the input.
pub type TypeName = &'static str;

/// Host-side value of a mapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bytes(Vec<u8>),
    /// A host value with no storage mapping; carries its type name.
    #[serde(skip)]
    Opaque(TypeName),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::Int(_) => FieldKind::Integer,
            Self::Float(_) => FieldKind::Real,
            Self::Text(_) => FieldKind::Text,
            Self::DateTime(_) => FieldKind::DateTime,
            Self::List(_) => FieldKind::List,
            Self::Map(_) => FieldKind::Map,
            Self::Bytes(_) => FieldKind::Bytes,
            Self::Opaque(name) => FieldKind::Opaque(name),
        }
    }

    /// Fails on the first nested value that has no storage mapping or
    /// would not read back unchanged.
    fn ensure_storable(&self) -> MapperResult<()> {
        match self {
            Self::Opaque(name) => Err(MapperError::UnsupportedType {
                field: None,
                type_name: (*name).to_string(),
            }),
            Self::Float(number) if !number.is_finite() => Err(MapperError::NonFiniteFloat {
                field: None,
                value: number.to_string(),
            }),
            Self::List(items) => items.iter().try_for_each(Value::ensure_storable),
            Self::Map(entries) => entries.values().try_for_each(Value::ensure_storable),
            _ => Ok(()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value.into_iter().map(Self::Text).collect())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u32,
    value: &'a Value,
}

#[derive(Deserialize)]
struct Envelope {
    v: u32,
    value: Value,
}

/// Returns the storage column type for a host value.
///
/// # Errors
/// - `UnsupportedType` for opaque values and composites containing one.
/// - `NonFiniteFloat` for NaN or infinite floats, nested or not.
pub fn sql_type_of(value: &Value) -> MapperResult<SqlType> {
    value.ensure_storable()?;
    value.kind().sql_type()
}

/// Converts a host value into a bindable SQL value.
///
/// # Errors
/// - `UnsupportedType` for opaque values and composites containing one.
/// - `NonFiniteFloat` for NaN or infinite floats, nested or not.
pub fn sql_value_of(value: &Value) -> MapperResult<SqlValue> {
    value.ensure_storable()?;
    match value {
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Int(number) => Ok(SqlValue::Integer(*number)),
        Value::Float(number) => Ok(SqlValue::Real(*number)),
        Value::Text(text) => Ok(SqlValue::Text(text.clone())),
        Value::DateTime(stamp) => Ok(SqlValue::Text(format_datetime(stamp))),
        Value::List(_) | Value::Map(_) | Value::Bytes(_) => {
            Ok(SqlValue::Text(encode_composite(value)?))
        }
        Value::Opaque(name) => Err(MapperError::UnsupportedType {
            field: None,
            type_name: (*name).to_string(),
        }),
    }
}

/// Rebuilds a host value from raw stored text by content detection.
///
/// Composite envelopes win over datetimes, datetimes over plain text. A
/// plain text field that happens to look like a timestamp is reported as a
/// timestamp here; typed reads go through [`decode_stored`] instead.
pub fn parse_stored(text: &str) -> Value {
    if text.starts_with('{') || text.starts_with('[') {
        if let Ok(value) = decode_composite(text) {
            return value;
        }
    }
    if let Some(stamp) = parse_datetime(text) {
        return Value::DateTime(stamp);
    }
    Value::Text(text.to_string())
}

/// Rebuilds a host value from a stored cell using the declared field kind.
///
/// # Errors
/// - `InvalidData` when the cell does not hold a valid value of `kind`.
/// - `UnsupportedType` for opaque kinds.
pub fn decode_stored(kind: FieldKind, raw: &SqlValue) -> MapperResult<Value> {
    let value = match (kind, raw) {
        (FieldKind::Bool, SqlValue::Integer(0)) => Value::Bool(false),
        (FieldKind::Bool, SqlValue::Integer(1)) => Value::Bool(true),
        (FieldKind::Integer, SqlValue::Integer(number)) => Value::Int(*number),
        (FieldKind::Real, SqlValue::Real(number)) => Value::Float(*number),
        (FieldKind::Real, SqlValue::Integer(number)) => Value::Float(*number as f64),
        (FieldKind::Text, SqlValue::Text(text)) => Value::Text(text.clone()),
        (FieldKind::DateTime, SqlValue::Text(text)) => {
            Value::DateTime(parse_datetime(text).ok_or_else(|| {
                MapperError::InvalidData(format!("unrecognized datetime `{text}`"))
            })?)
        }
        (FieldKind::List | FieldKind::Map | FieldKind::Bytes, SqlValue::Text(text)) => {
            let value = decode_composite(text)?;
            if value.kind() != kind {
                return Err(MapperError::InvalidData(format!(
                    "expected {kind} envelope, found {}",
                    value.kind()
                )));
            }
            value
        }
        (FieldKind::Opaque(name), _) => {
            return Err(MapperError::UnsupportedType {
                field: None,
                type_name: name.to_string(),
            })
        }
        (kind, raw) => {
            return Err(MapperError::InvalidData(format!(
                "cannot read {kind} from stored {}",
                describe_sql_value(raw)
            )))
        }
    };
    Ok(value)
}

/// Parses text typed into a form field as a value of the declared kind.
///
/// Lists are comma-separated text items; blank items are dropped. Maps and
/// byte strings have no text entry form.
///
/// # Errors
/// - `InvalidData` when the text does not parse as `kind`.
/// - `UnsupportedType` for opaque kinds.
pub fn parse_entry(kind: FieldKind, text: &str) -> MapperResult<Value> {
    let trimmed = text.trim();
    let invalid = || MapperError::InvalidData(format!("cannot read {kind} from entry `{text}`"));
    let value = match kind {
        FieldKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Value::Bool(true),
            "false" | "no" | "n" | "0" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        FieldKind::Integer => Value::Int(trimmed.parse().map_err(|_| invalid())?),
        FieldKind::Real => {
            let number: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !number.is_finite() {
                return Err(invalid());
            }
            Value::Float(number)
        }
        FieldKind::Text => Value::Text(text.to_string()),
        FieldKind::DateTime => Value::DateTime(parse_datetime(trimmed).ok_or_else(invalid)?),
        FieldKind::List => Value::List(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from)
                .collect(),
        ),
        FieldKind::Map | FieldKind::Bytes => return Err(invalid()),
        FieldKind::Opaque(name) => {
            return Err(MapperError::UnsupportedType {
                field: None,
                type_name: name.to_string(),
            })
        }
    };
    Ok(value)
}

/// Rebuilds a host value from a raw cell without a declared kind.
pub fn value_from_cell(raw: &SqlValue) -> Option<Value> {
    match raw {
        SqlValue::Null => None,
        SqlValue::Integer(number) => Some(Value::Int(*number)),
        SqlValue::Real(number) => Some(Value::Float(*number)),
        SqlValue::Text(text) => Some(parse_stored(text)),
        SqlValue::Blob(bytes) => Some(Value::Bytes(bytes.clone())),
    }
}

pub fn format_datetime(stamp: &NaiveDateTime) -> String {
    stamp.format(DATETIME_FORMAT).to_string()
}

/// Parses any recognized datetime format.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if !DATETIME_SHAPE.is_match(text) {
        return None;
    }
    RECOGNIZED_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

fn encode_composite(value: &Value) -> MapperResult<String> {
    serde_json::to_string(&EnvelopeRef {
        v: COMPOSITE_FORMAT_VERSION,
        value,
    })
    .map_err(|err| MapperError::InvalidData(format!("cannot encode composite value: {err}")))
}

fn decode_composite(text: &str) -> MapperResult<Value> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|err| MapperError::InvalidData(format!("invalid composite envelope: {err}")))?;
    if envelope.v != COMPOSITE_FORMAT_VERSION {
        return Err(MapperError::InvalidData(format!(
            "unsupported composite format version {}",
            envelope.v
        )));
    }
    Ok(envelope.value)
}

fn describe_sql_value(raw: &SqlValue) -> &'static str {
    match raw {
        SqlValue::Null => "NULL",
        SqlValue::Integer(_) => "INTEGER",
        SqlValue::Real(_) => "REAL",
        SqlValue::Text(_) => "TEXT",
        SqlValue::Blob(_) => "BLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(21, 15, 0)
            .unwrap()
    }

    #[test]
    fn scalar_types_map_to_expected_columns() {
        assert_eq!(sql_type_of(&Value::Bool(true)).unwrap(), SqlType::Integer);
        assert_eq!(sql_type_of(&Value::Int(3)).unwrap(), SqlType::Integer);
        assert_eq!(sql_type_of(&Value::Float(0.5)).unwrap(), SqlType::Real);
        assert_eq!(sql_type_of(&Value::from("x")).unwrap(), SqlType::Text);
        assert_eq!(sql_type_of(&Value::from(stamp())).unwrap(), SqlType::DateTime);
        assert_eq!(sql_type_of(&Value::Bytes(vec![1])).unwrap(), SqlType::Text);
    }

    #[test]
    fn opaque_values_fail_even_when_nested() {
        let nested = Value::List(vec![Value::Int(1), Value::Opaque("fn()")]);
        let err = sql_type_of(&nested).unwrap_err();
        assert!(matches!(
            err,
            MapperError::UnsupportedType { ref type_name, .. } if type_name == "fn()"
        ));
        assert!(sql_value_of(&Value::Opaque("fn()")).is_err());
    }

    #[test]
    fn booleans_are_stored_as_integers() {
        assert_eq!(sql_value_of(&Value::Bool(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(
            decode_stored(FieldKind::Bool, &SqlValue::Integer(0)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn datetimes_use_canonical_text() {
        let stored = sql_value_of(&Value::from(stamp())).unwrap();
        assert_eq!(stored, SqlValue::Text("2024-03-09 21:15:00".to_string()));
        assert_eq!(parse_stored("2024-03-09 21:15:00"), Value::DateTime(stamp()));
        assert_eq!(parse_stored("2024-03-09T21:15"), Value::DateTime(stamp()));
    }

    #[test]
    fn composite_text_is_a_versioned_envelope() {
        let value = Value::from(vec!["sci-fi".to_string(), "space".to_string()]);
        let SqlValue::Text(text) = sql_value_of(&value).unwrap() else {
            panic!("composite should be stored as text");
        };
        assert!(text.starts_with("{\"v\":1,"));
        assert_eq!(parse_stored(&text), value);
        assert_eq!(decode_stored(FieldKind::List, &SqlValue::Text(text)).unwrap(), value);
    }

    #[test]
    fn parse_stored_never_evaluates_bracketed_text() {
        assert_eq!(
            parse_stored("[__import__('os')]"),
            Value::Text("[__import__('os')]".to_string())
        );
        assert_eq!(parse_stored("{\"v\":9,\"value\":{\"Int\":1}}").kind(), FieldKind::Text);
        assert_eq!(parse_stored("plain words"), Value::from("plain words"));
    }

    #[test]
    fn envelopes_decode_from_owned_text() {
        fn decode_owned(text: String) -> Value {
            decode_composite(&text).unwrap()
        }

        let text = String::from(r#"{"v":1,"value":{"List":[{"Int":4},{"Text":"four"}]}}"#);
        assert_eq!(
            decode_owned(text),
            Value::List(vec![Value::Int(4), Value::from("four")])
        );
    }

    #[test]
    fn non_finite_floats_are_rejected_before_storage() {
        for number in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                sql_value_of(&Value::Float(number)),
                Err(MapperError::NonFiniteFloat { .. })
            ));
        }

        let mut nested = BTreeMap::new();
        nested.insert("ratio".to_string(), Value::List(vec![Value::Float(f64::NAN)]));
        assert!(matches!(
            sql_type_of(&Value::Map(nested)),
            Err(MapperError::NonFiniteFloat { .. })
        ));
        assert!(sql_value_of(&Value::Float(f64::MAX)).is_ok());
    }

    #[test]
    fn form_entries_parse_by_kind() {
        assert_eq!(parse_entry(FieldKind::Integer, " 311 ").unwrap(), Value::Int(311));
        assert_eq!(parse_entry(FieldKind::Bool, "Yes").unwrap(), Value::Bool(true));
        assert_eq!(parse_entry(FieldKind::Real, "4.5").unwrap(), Value::Float(4.5));
        assert_eq!(parse_entry(FieldKind::Text, " as typed ").unwrap(), Value::from(" as typed "));
        assert_eq!(
            parse_entry(FieldKind::DateTime, "2024-03-09 21:15").unwrap(),
            Value::DateTime(stamp())
        );
        assert_eq!(
            parse_entry(FieldKind::List, "sci-fi, space ,").unwrap(),
            Value::from(vec!["sci-fi".to_string(), "space".to_string()])
        );
        assert_eq!(parse_entry(FieldKind::List, "").unwrap(), Value::List(Vec::new()));
    }

    #[test]
    fn malformed_form_entries_are_rejected() {
        for (kind, text) in [
            (FieldKind::Integer, "many"),
            (FieldKind::Bool, "maybe"),
            (FieldKind::Real, "inf"),
            (FieldKind::DateTime, "next tuesday"),
            (FieldKind::Map, "{}"),
        ] {
            assert!(
                matches!(parse_entry(kind, text), Err(MapperError::InvalidData(_))),
                "{kind} accepted `{text}`"
            );
        }
        assert!(matches!(
            parse_entry(FieldKind::Opaque("fn()"), "x"),
            Err(MapperError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn typed_decode_keeps_date_like_text_as_text() {
        let raw = SqlValue::Text("2024-03-09 21:15:00".to_string());
        assert_eq!(
            decode_stored(FieldKind::Text, &raw).unwrap(),
            Value::from("2024-03-09 21:15:00")
        );
    }

    #[test]
    fn typed_decode_rejects_mismatched_cells() {
        let err = decode_stored(FieldKind::Integer, &SqlValue::Text("7".into())).unwrap_err();
        assert!(matches!(err, MapperError::InvalidData(_)));
        let err = decode_stored(FieldKind::Bool, &SqlValue::Integer(2)).unwrap_err();
        assert!(matches!(err, MapperError::InvalidData(_)));
    }
}
