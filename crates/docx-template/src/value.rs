/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Data values and records used to fill templates.
//!
//! A [`Record`] mixes two key representations:
//!
//! - **fields** ([`KeyKind::Field`]): names of native structure fields, as
//!   produced by [`Record::from_serialize`];
//! - **keys** ([`KeyKind::Key`]): string map keys, as produced by
//!   [`Record::from_json`].
//!
//! Lookups are case-insensitive. Each record keeps one lower-cased index per
//! key kind, built on insertion, so a path segment is matched with two hash
//! lookups instead of a scan.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::DataAccessError;

/// A value that can be substituted into a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Check if this value is "truthy" for conditional sections.
    ///
    /// Falsy: null, `false`, `0`, `0.0`, the empty string, and the strings
    /// `"false"` and `"0"` (the stringified forms of `false` and `0`).
    /// Everything else is truthy, including empty lists and records.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !(s.is_empty() || s == "false" || s == "0"),
            Value::List(_) | Value::Record(_) => true,
        }
    }

    /// Render a scalar as the text that replaces a placeholder.
    pub fn to_text(&self) -> Result<String, DataAccessError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(format_float(*f)),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Err(DataAccessError::NilValue),
            Value::List(_) | Value::Record(_) => Err(DataAccessError::UnsupportedType),
        }
    }

    /// The items of a list value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn from_json_with(value: serde_json::Value, kind: KeyKind) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(|v| Value::from_json_with(v, kind))
                    .collect(),
            ),
            serde_json::Value::Object(map) => {
                let mut record = Record::new();
                for (name, v) in map {
                    record.insert(name, kind, Value::from_json_with(v, kind));
                }
                Value::Record(record)
            }
        }
    }
}

/// Integral floats print without a fractional part (`100.0` -> `100`).
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::from_json_with(value, KeyKind::Key)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

/// How a record key is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// A native structure field.
    Field,
    /// A string map key.
    Key,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: String,
    kind: KeyKind,
    value: Value,
}

/// A data record with case-insensitive lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entries: Vec<Entry>,
    /// Lower-cased field name -> entry indices.
    fields: HashMap<String, Vec<usize>>,
    /// Lower-cased map key -> entry indices.
    keys: HashMap<String, Vec<usize>>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON value. Objects contribute string keys.
    ///
    /// Non-object values produce an empty record.
    pub fn from_json(value: serde_json::Value) -> Self {
        match Value::from(value) {
            Value::Record(record) => record,
            _ => Record::new(),
        }
    }

    /// Build a record from any serializable value. Structure members become
    /// native fields.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_value(value)?;
        match Value::from_json_with(json, KeyKind::Field) {
            Value::Record(record) => Ok(record),
            _ => Ok(Record::new()),
        }
    }

    /// Insert a native field. An existing field with the exact same name is replaced.
    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.insert(name.into(), KeyKind::Field, value.into());
    }

    /// Insert a string key. An existing key with the exact same name is replaced.
    pub fn insert_key(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.insert(name.into(), KeyKind::Key, value.into());
    }

    /// Builder form of [`Record::insert_key`].
    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_key(name, value);
        self
    }

    /// Builder form of [`Record::insert_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_field(name, value);
        self
    }

    fn insert(&mut self, name: String, kind: KeyKind, value: Value) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.kind == kind && e.name == name)
        {
            entry.value = value;
            return;
        }

        let index = self.entries.len();
        self.table_mut(kind)
            .entry(name.to_lowercase())
            .or_default()
            .push(index);
        self.entries.push(Entry { name, kind, value });
    }

    fn table_mut(&mut self, kind: KeyKind) -> &mut HashMap<String, Vec<usize>> {
        match kind {
            KeyKind::Field => &mut self.fields,
            KeyKind::Key => &mut self.keys,
        }
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, KeyKind, &Value)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.kind, &e.value))
    }

    /// Case-insensitive lookup of one key.
    ///
    /// `path` is the full dot-path being resolved, used in the error when
    /// nothing matches.
    pub fn lookup(&self, segment: &str, path: &str) -> Result<&Value, DataAccessError> {
        let lowered = segment.to_lowercase();
        let fields = self.fields.get(&lowered).map_or(&[][..], |v| v.as_slice());
        let keys = self.keys.get(&lowered).map_or(&[][..], |v| v.as_slice());

        match (fields, keys) {
            ([], []) => Err(DataAccessError::PathNotFound {
                path: path.to_string(),
            }),
            ([only], []) | ([], [only]) => Ok(&self.entries[*only].value),
            ([field], [key]) => Err(DataAccessError::ConflictingKeyTypes {
                key: segment.to_string(),
                field: self.entries[*field].name.clone(),
                string_key: self.entries[*key].name.clone(),
            }),
            _ => {
                let mut matches: Vec<String> = fields
                    .iter()
                    .chain(keys)
                    .map(|i| self.entries[*i].name.clone())
                    .collect();
                matches.sort();
                Err(DataAccessError::AmbiguousKey {
                    key: segment.to_string(),
                    matches,
                })
            }
        }
    }

    /// The value bound to `key`, if exactly one entry matches it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.lookup(key, key).ok()
    }

    /// Scoped view: this record without any entry matching `key`
    /// (case-insensitively), with `key` bound as a string key to `value`.
    pub fn rebind(&self, key: &str, value: Value) -> Record {
        let lowered = key.to_lowercase();
        let mut scoped = Record::new();
        for entry in &self.entries {
            if entry.name.to_lowercase() != lowered {
                scoped.insert(entry.name.clone(), entry.kind, entry.value.clone());
            }
        }
        scoped.insert(key.to_string(), KeyKind::Key, value);
        scoped
    }
}
