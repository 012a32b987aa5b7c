use crate::caller::Source;
use crate::value::Value;
use std::time::Duration;

pub const SOURCE_KEY: &str = "source";
pub const DURATION_KEY: &str = "duration";
pub const ROWS_KEY: &str = "rows";
pub const SQL_KEY: &str = "sql";

/// Request-scoped values that travel next to a record.
///
/// The SQL trace fields and an explicit source are typed slots; anything
/// else is a named value that a handler surfaces when its key is listed in
/// `add_ctx_attr`. Every field is optional and handlers omit whatever is
/// missing.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    source: Option<Source>,
    sql: Option<String>,
    duration: Option<Duration>,
    rows: Option<i64>,
    values: Vec<(String, Value)>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute the record to `source` instead of its own call site.
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_rows(mut self, rows: i64) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Set a named value, replacing an earlier one with the same key.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_value(key, value);
        self
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key, value)),
        }
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn rows(&self) -> Option<i64> {
        self.rows
    }

    /// Look a value up by key. The typed slots answer to their well-known
    /// keys too, so `add_ctx_attr = ["sql"]` works like any other key.
    pub fn value(&self, key: &str) -> Option<Value> {
        if let Some((_, v)) = self.values.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            SQL_KEY => self.sql.clone().map(Value::String),
            ROWS_KEY => self.rows.map(Value::Int64),
            DURATION_KEY => self.duration.map(Value::Duration),
            SOURCE_KEY => self.source.clone().map(Value::from),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.sql.is_none()
            && self.duration.is_none()
            && self.rows.is_none()
            && self.values.is_empty()
    }
}
