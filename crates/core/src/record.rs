//! Durable row form of an entity

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row of a table: table name plus named field values
///
/// The identity is not part of the record. The store keys records by
/// identity and hands it back alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    table: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Table this record belongs to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field value, if present
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Required text field
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            Value::Text(s) => Ok(s),
            other => Err(self.mismatch(name, "Text", other)),
        }
    }

    /// Optional date field (missing or Null map to None)
    pub fn date_opt(&self, name: &str) -> Result<Option<chrono::NaiveDate>> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Date(d)) => Ok(Some(*d)),
            Some(other) => Err(self.mismatch(name, "Date", other)),
        }
    }

    fn require(&self, name: &str) -> Result<&Value> {
        self.fields.get(name).ok_or_else(|| {
            Error::Serialization(format!("{}: missing field '{}'", self.table, name))
        })
    }

    fn mismatch(&self, name: &str, expected: &str, actual: &Value) -> Error {
        Error::Serialization(format!(
            "{}.{}: expected {}, got {}",
            self.table,
            name,
            expected,
            actual.type_name()
        ))
    }
}
