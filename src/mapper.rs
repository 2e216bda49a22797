//! Reshape result rows into plain records.
//!
//! A [`FieldMapping`] names the output fields and the column key each one is
//! read from. Output records are built fresh; the mapping is never written to.

use std::collections::HashMap;
use std::fmt::Display;

use crate::error::{Error, Result};
use crate::sqlite::{Row, Value};

/// Read access to a single column of a row by key.
pub trait ColumnAccess<K> {
    type Value;

    fn column(&self, key: &K) -> Option<Self::Value>;
}

impl ColumnAccess<String> for Row {
    type Value = Value;

    fn column(&self, key: &String) -> Option<Value> {
        self.get_by_name(key).cloned()
    }
}

impl ColumnAccess<usize> for Row {
    type Value = Value;

    fn column(&self, key: &usize) -> Option<Value> {
        self.get(*key).cloned()
    }
}

impl<V: Clone> ColumnAccess<String> for HashMap<String, V> {
    type Value = V;

    fn column(&self, key: &String) -> Option<V> {
        self.get(key).cloned()
    }
}

/// Ordered output-field to column-key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping<K> {
    fields: Vec<(String, K)>,
}

impl<K> Default for FieldMapping<K> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<K> FieldMapping<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map output field `name` to column `key`, replacing an earlier entry
    /// for the same field.
    pub fn with_field(mut self, name: impl Into<String>, key: impl Into<K>) -> Self {
        let name = name.into();
        let key = key.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(entry) => entry.1 = key,
            None => self.fields.push((name, key)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &K)> {
        self.fields.iter().map(|(name, key)| (name.as_str(), key))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, K> FromIterator<(N, K)> for FieldMapping<K> {
    fn from_iter<I: IntoIterator<Item = (N, K)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |mapping, (name, key)| mapping.with_field(name, key))
    }
}

/// Project each row into a record keyed by the mapping's field names.
///
/// Output order follows `rows`. Fails with [`Error::MissingColumn`] on the
/// first absent column; no partial result is returned.
pub fn project<K, R>(
    mapping: &FieldMapping<K>,
    rows: &[R],
) -> Result<Vec<HashMap<String, R::Value>>>
where
    K: Display,
    R: ColumnAccess<K>,
{
    rows.iter().map(|row| project_row(mapping, row)).collect()
}

fn project_row<K, R>(mapping: &FieldMapping<K>, row: &R) -> Result<HashMap<String, R::Value>>
where
    K: Display,
    R: ColumnAccess<K>,
{
    mapping
        .fields
        .iter()
        .map(|(field, key)| {
            row.column(key)
                .map(|value| (field.clone(), value))
                .ok_or_else(|| Error::MissingColumn(key.to_string()))
        })
        .collect()
}
