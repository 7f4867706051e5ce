//! Named field values exchanged between an entity and the mapper.
//!
//! Entities hand the mapper a `Record` on save and rebuild themselves from one
//! on load by pulling fields by name, so column order never has to match a
//! constructor's parameter order.

use super::coerce::Value;
use super::error::{MapperError, MapperResult};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entity: &'static str,
    values: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            values: Vec::new(),
        }
    }

    /// Builder-style insert; a repeated name replaces the earlier value.
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(name, _)| *name)
    }

    /// Removes and returns a field value.
    ///
    /// # Errors
    /// - `MissingField` when the record has no value under `name`.
    pub fn take(&mut self, name: &'static str) -> MapperResult<Value> {
        let position = self
            .values
            .iter()
            .position(|(key, _)| *key == name)
            .ok_or_else(|| MapperError::MissingField {
                entity: self.entity.to_string(),
                field: name.to_string(),
            })?;
        Ok(self.values.remove(position).1)
    }

    pub fn take_text(&mut self, name: &'static str) -> MapperResult<String> {
        match self.take(name)? {
            Value::Text(text) => Ok(text),
            other => Err(mismatch(name, "text", &other)),
        }
    }

    pub fn take_int(&mut self, name: &'static str) -> MapperResult<i64> {
        match self.take(name)? {
            Value::Int(number) => Ok(number),
            other => Err(mismatch(name, "integer", &other)),
        }
    }

    pub fn take_float(&mut self, name: &'static str) -> MapperResult<f64> {
        match self.take(name)? {
            Value::Float(number) => Ok(number),
            other => Err(mismatch(name, "real", &other)),
        }
    }

    pub fn take_bool(&mut self, name: &'static str) -> MapperResult<bool> {
        match self.take(name)? {
            Value::Bool(flag) => Ok(flag),
            other => Err(mismatch(name, "bool", &other)),
        }
    }

    pub fn take_datetime(&mut self, name: &'static str) -> MapperResult<NaiveDateTime> {
        match self.take(name)? {
            Value::DateTime(stamp) => Ok(stamp),
            other => Err(mismatch(name, "datetime", &other)),
        }
    }

    pub fn take_list(&mut self, name: &'static str) -> MapperResult<Vec<Value>> {
        match self.take(name)? {
            Value::List(items) => Ok(items),
            other => Err(mismatch(name, "list", &other)),
        }
    }

    /// Takes a list field whose items are all text.
    pub fn take_text_list(&mut self, name: &'static str) -> MapperResult<Vec<String>> {
        self.take_list(name)?
            .into_iter()
            .map(|item| match item {
                Value::Text(text) => Ok(text),
                other => Err(mismatch(name, "list of text", &other)),
            })
            .collect()
    }

    pub fn take_map(&mut self, name: &'static str) -> MapperResult<BTreeMap<String, Value>> {
        match self.take(name)? {
            Value::Map(entries) => Ok(entries),
            other => Err(mismatch(name, "map", &other)),
        }
    }

    pub fn take_bytes(&mut self, name: &'static str) -> MapperResult<Vec<u8>> {
        match self.take(name)? {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(mismatch(name, "bytes", &other)),
        }
    }
}

fn mismatch(field: &str, expected: &str, actual: &Value) -> MapperError {
    MapperError::KindMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}
