//! Declared field descriptors and the alias/description lookup tables.
//!
//! # Invariants
//! - Descriptor order is column order, both for DDL and for reads.
//! - Fields without metadata are persisted but never appear in a lookup.

use super::coerce::SqlType;
use super::error::{MapperError, MapperResult};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Host-side type tag of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Integer,
    Real,
    Text,
    DateTime,
    List,
    Map,
    Bytes,
    /// A host type with no storage mapping (callbacks, handles, references).
    Opaque(&'static str),
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::DateTime => "datetime",
            Self::List => "list",
            Self::Map => "map",
            Self::Bytes => "bytes",
            Self::Opaque(name) => name,
        }
    }

    /// Declared column type for this kind.
    pub fn sql_type(self) -> MapperResult<SqlType> {
        match self {
            Self::Bool | Self::Integer => Ok(SqlType::Integer),
            Self::Real => Ok(SqlType::Real),
            Self::Text | Self::List | Self::Map | Self::Bytes => Ok(SqlType::Text),
            Self::DateTime => Ok(SqlType::DateTime),
            Self::Opaque(name) => Err(MapperError::UnsupportedType {
                field: None,
                type_name: name.to_string(),
            }),
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Presentation metadata used to build editable forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub alias: &'static str,
    pub description: &'static str,
}

/// One declared column of a mapped entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub meta: Option<FieldMeta>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            meta: None,
        }
    }

    pub const fn with_meta(
        name: &'static str,
        kind: FieldKind,
        alias: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            meta: Some(FieldMeta { alias, description }),
        }
    }
}

fn described(fields: &[FieldSpec]) -> impl Iterator<Item = (&FieldSpec, &FieldMeta)> {
    fields
        .iter()
        .filter_map(|field| field.meta.as_ref().map(|meta| (field, meta)))
}

/// Aliases of described fields, in declaration order.
pub fn aliases(fields: &[FieldSpec]) -> Vec<&'static str> {
    described(fields).map(|(_, meta)| meta.alias).collect()
}

pub fn alias_to_field(fields: &[FieldSpec]) -> BTreeMap<&'static str, &'static str> {
    described(fields)
        .map(|(field, meta)| (meta.alias, field.name))
        .collect()
}

pub fn alias_to_description(fields: &[FieldSpec]) -> BTreeMap<&'static str, &'static str> {
    described(fields)
        .map(|(_, meta)| (meta.alias, meta.description))
        .collect()
}

pub fn field_to_alias(fields: &[FieldSpec]) -> BTreeMap<&'static str, &'static str> {
    described(fields)
        .map(|(field, meta)| (field.name, meta.alias))
        .collect()
}

pub fn field_to_type(fields: &[FieldSpec]) -> BTreeMap<&'static str, FieldKind> {
    described(fields)
        .map(|(field, _)| (field.name, field.kind))
        .collect()
}

pub fn field_to_description(fields: &[FieldSpec]) -> BTreeMap<&'static str, &'static str> {
    described(fields)
        .map(|(field, meta)| (field.name, meta.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::with_meta("title", FieldKind::Text, "Title", "Book title"),
        FieldSpec::new("internal", FieldKind::Integer),
        FieldSpec::with_meta("rating", FieldKind::Integer, "Rating", "Personal rating"),
    ];

    #[test]
    fn lookups_skip_fields_without_metadata() {
        assert_eq!(aliases(FIELDS), vec!["Title", "Rating"]);
        assert!(!field_to_alias(FIELDS).contains_key("internal"));
        assert!(!field_to_type(FIELDS).contains_key("internal"));
        assert_eq!(field_to_type(FIELDS)["rating"], FieldKind::Integer);
        assert_eq!(alias_to_description(FIELDS)["Title"], "Book title");
        assert_eq!(field_to_description(FIELDS)["rating"], "Personal rating");
    }

    #[test]
    fn opaque_kind_has_no_sql_type() {
        let err = FieldKind::Opaque("fn()").sql_type().unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedType { .. }));
        assert_eq!(FieldKind::Map.sql_type().unwrap(), SqlType::Text);
        assert_eq!(FieldKind::Bool.sql_type().unwrap(), SqlType::Integer);
    }
}
