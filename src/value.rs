use crate::caller::Source;
use crate::encode::format_float;
use crate::level::Level;
use chrono::{DateTime, Local};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A key paired with a typed value.
#[derive(Debug, Clone)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A named group; members render with `key.` prepended to their keys.
    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Self::new(key, Value::Group(attrs))
    }

    /// An error attribute, rendered with its own coloring by the dev handler.
    pub fn error(key: impl Into<String>, err: impl Error + Send + Sync + 'static) -> Self {
        Self::new(key, Value::error(err))
    }

    /// The zero attribute: no key and a nil value. Handlers skip it.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && matches!(self.value, Value::Any(AnyValue::Nil))
    }
}

/// Typed attribute value.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<Local>),
    Group(Vec<Attr>),
    Any(AnyValue),
}

/// Values that do not map onto one of the scalar kinds.
#[derive(Clone)]
pub enum AnyValue {
    Nil,
    Level(Level),
    Source(Source),
    Error(Arc<dyn Error + Send + Sync>),
    Text(Arc<dyn TextMarshaler>),
    Debug(Arc<dyn fmt::Debug + Send + Sync>),
}

/// Custom text form for a value.
///
/// Encoding may fail; the renderer substitutes a placeholder for the one
/// attribute and carries on with the rest of the line.
pub trait TextMarshaler: Send + Sync {
    fn marshal_text(&self) -> Result<String, EncodeError>;
}

/// Failure while producing the text of a single value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value has nothing behind it (for example an unset optional).
    #[error("<nil>")]
    Nil,
    #[error("{0}")]
    Failed(String),
}

impl Value {
    pub fn error(err: impl Error + Send + Sync + 'static) -> Self {
        Value::Any(AnyValue::Error(Arc::new(err)))
    }

    pub fn text(value: impl TextMarshaler + 'static) -> Self {
        Value::Any(AnyValue::Text(Arc::new(value)))
    }

    pub fn debug(value: impl fmt::Debug + Send + Sync + 'static) -> Self {
        Value::Any(AnyValue::Debug(Arc::new(value)))
    }

    pub fn nil() -> Self {
        Value::Any(AnyValue::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int64(v) => Some(v),
            Value::Uint64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match *self {
            Value::Duration(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Nil => f.write_str("Nil"),
            AnyValue::Level(l) => f.debug_tuple("Level").field(l).finish(),
            AnyValue::Source(s) => f.debug_tuple("Source").field(s).finish(),
            AnyValue::Error(e) => f.debug_tuple("Error").field(e).finish(),
            AnyValue::Text(t) => f.debug_tuple("Text").field(&t.marshal_text()).finish(),
            AnyValue::Debug(d) => f.debug_tuple("Debug").field(d).finish(),
        }
    }
}

/// Unquoted text form, used for context values and as the JSON fallback.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Float64(v) => f.write_str(&format_float(*v)),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Duration(d) => write!(f, "{:?}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::Group(attrs) => {
                f.write_str("[")?;
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}={}", attr.key, attr.value)?;
                }
                f.write_str("]")
            }
            Value::Any(any) => match any {
                AnyValue::Nil => f.write_str("<nil>"),
                AnyValue::Level(l) => write!(f, "{}", l),
                AnyValue::Source(s) => write!(f, "{}", s),
                AnyValue::Error(e) => write!(f, "{}", e),
                AnyValue::Text(t) => match t.marshal_text() {
                    Ok(text) => f.write_str(&text),
                    Err(e) => write!(f, "{}", e),
                },
                AnyValue::Debug(d) => write!(f, "{:?}", d),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint64(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint64(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<DateTime<Local>> for Value {
    fn from(v: DateTime<Local>) -> Self {
        Value::Time(v)
    }
}

impl From<Level> for Value {
    fn from(v: Level) -> Self {
        Value::Any(AnyValue::Level(v))
    }
}

impl From<Source> for Value {
    fn from(v: Source) -> Self {
        Value::Any(AnyValue::Source(v))
    }
}

impl From<Vec<Attr>> for Value {
    fn from(v: Vec<Attr>) -> Self {
        Value::Group(v)
    }
}
