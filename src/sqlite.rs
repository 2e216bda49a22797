use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, Statement, ToSql};
use serde::Serialize;
use std::borrow::Borrow;
use std::{collections::HashMap, sync::Arc};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

// SQLite has no boolean storage class.
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// One parameter set bound into a single statement execution.
///
/// Positional values fill `?` and `?NNN` placeholders by parameter index.
/// Named values fill `:name`, `@name` and `$name` placeholders and are keyed
/// without the prefix character; the prefixed key is accepted as well.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub positional: Vec<Value>,
    pub named: HashMap<String, Value>,
}

impl Params {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            named: HashMap::new(),
        }
    }

    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            positional: Vec::new(),
            named: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.insert(name.to_string(), value.into());
        self
    }

    /// Append a positional value
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    fn lookup(&self, placeholder: &str) -> Option<&Value> {
        // Placeholder prefixes (`:`, `@`, `$`) are single ASCII bytes.
        self.named
            .get(&placeholder[1..])
            .or_else(|| self.named.get(placeholder))
    }

    /// Bind every placeholder of `stmt`, replacing any earlier bindings.
    pub(crate) fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        let count = stmt.parameter_count();
        let mut last_positional = 0;
        for index in 1..=count {
            match stmt.parameter_name(index).map(str::to_owned) {
                Some(name) if !name.starts_with('?') => {
                    let value = self
                        .lookup(&name)
                        .ok_or(rusqlite::Error::InvalidParameterName(name))?;
                    stmt.raw_bind_parameter(index, value)?;
                }
                _ => {
                    let value = self.positional.get(index - 1).ok_or(
                        rusqlite::Error::InvalidParameterCount(self.positional.len(), index),
                    )?;
                    stmt.raw_bind_parameter(index, value)?;
                    last_positional = index;
                }
            }
        }
        if self.positional.len() > last_positional {
            return Err(rusqlite::Error::InvalidParameterCount(
                self.positional.len(),
                last_positional,
            ));
        }
        Ok(())
    }
}

/// A fully materialized result row.
///
/// Column names are shared by every row of the query that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Look up a value by column name, ignoring ASCII case.
    /// The first matching column wins when names repeat.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
            .and_then(|index| self.values.get(index))
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }
}

/// Execute `sql` once and collect every row before returning.
pub(crate) fn query_rows(
    conn: &Connection,
    sql: &str,
    params: &Params,
) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    params.bind(&mut stmt)?;
    let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.raw_query();
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..width)
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        result.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(result)
}

/// Execute one prepared statement per parameter set, returning the total
/// number of changed rows.
pub(crate) fn execute_each<I>(
    conn: &Connection,
    sql: &str,
    param_sets: I,
) -> rusqlite::Result<usize>
where
    I: IntoIterator,
    I::Item: Borrow<Params>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut changed = 0;
    for params in param_sets {
        params.borrow().bind(&mut stmt)?;
        changed += stmt.raw_execute()?;
    }
    Ok(changed)
}
