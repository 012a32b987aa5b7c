use crate::buffer::Buffer;
use crate::context::LogContext;
use crate::encode::{format_or_marker, ENCODE_FAILURE_MARKER};
use crate::handler::{Handler, HandlerError};
use crate::level::Level;
use crate::options::Options;
use crate::record::Record;
use crate::sink::SharedSink;
use crate::value::{AnyValue, Attr, EncodeError, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::sync::Arc;

#[derive(Debug)]
struct Shared {
    sink: SharedSink,
    level: Level,
}

/// Handler that writes one JSON object per record.
///
/// `time`, `level` and `msg` come first, followed by attributes bound
/// through derivation and then the record's own attributes. Groups become
/// nested objects; a group that ends up with no members is left out.
///
/// Context values are not read here: wrap the handler in a
/// [`HandlerMiddleware`](crate::middleware::HandlerMiddleware) to copy them
/// onto records as attributes.
#[derive(Debug)]
pub struct JsonHandler {
    shared: Arc<Shared>,
    /// Bound attributes with the group path that was open when bound.
    bound: Vec<(Vec<String>, Attr)>,
    groups: Vec<String>,
}

impl JsonHandler {
    pub fn new(opts: Options) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink: opts.output.unwrap_or_else(SharedSink::stdout),
                level: opts.level,
            }),
            bound: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn derive(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            bound: self.bound.clone(),
            groups: self.groups.clone(),
        }
    }

    fn to_object(&self, record: &Record) -> Map<String, JsonValue> {
        let mut root = Map::new();
        if let Some(time) = record.time {
            root.insert("time".into(), JsonValue::String(time.to_rfc3339()));
        }
        root.insert("level".into(), JsonValue::String(record.level.as_str().into()));
        root.insert("msg".into(), JsonValue::String(record.message.clone()));

        for (path, attr) in &self.bound {
            insert_attr(&mut root, path, attr);
        }
        for attr in record.attrs() {
            insert_attr(&mut root, &self.groups, attr);
        }
        root
    }
}

impl Handler for JsonHandler {
    fn enabled(&self, _ctx: &LogContext, level: Level) -> bool {
        level >= self.shared.level
    }

    fn handle(&self, _ctx: &LogContext, record: Record) -> Result<(), HandlerError> {
        let mut buf = Buffer::get();
        serde_json::to_writer(&mut buf, &self.to_object(&record))?;
        buf.write_byte(b'\n');
        self.shared.sink.write_line(&buf)?;
        Ok(())
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }
        let mut derived = self.derive();
        derived
            .bound
            .extend(attrs.into_iter().map(|attr| (self.groups.clone(), attr)));
        Arc::new(derived)
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        let mut derived = self.derive();
        derived.groups.push(name.to_string());
        Arc::new(derived)
    }
}

/// Insert `attr` under the object at `path`, creating intermediate objects
/// only when there is something to put in them.
fn insert_attr(root: &mut Map<String, JsonValue>, path: &[String], attr: &Attr) {
    if attr.is_empty() {
        return;
    }
    if let Value::Group(members) = &attr.value {
        if members.iter().all(Attr::is_empty) {
            return;
        }
        let mut inner = path.to_vec();
        if !attr.key.is_empty() {
            inner.push(attr.key.clone());
        }
        for member in members {
            insert_attr(root, &inner, member);
        }
        return;
    }

    let mut target = root;
    for name in path {
        let slot = target
            .entry(name.clone())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !slot.is_object() {
            *slot = JsonValue::Object(Map::new());
        }
        let JsonValue::Object(map) = slot else {
            return;
        };
        target = map;
    }
    target.insert(attr.key.clone(), to_json(&attr.value));
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Int64(v) => JsonValue::from(*v),
        Value::Uint64(v) => JsonValue::from(*v),
        Value::Float64(v) => Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(value.to_string())),
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Duration(d) => JsonValue::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
        Value::Time(t) => JsonValue::String(t.to_rfc3339()),
        Value::Group(attrs) => {
            let mut map = Map::new();
            for attr in attrs {
                insert_attr(&mut map, &[], attr);
            }
            JsonValue::Object(map)
        }
        Value::Any(any) => match any {
            AnyValue::Nil => JsonValue::Null,
            AnyValue::Level(l) => JsonValue::String(l.as_str().into()),
            AnyValue::Source(src) => serde_json::to_value(src).unwrap_or(JsonValue::Null),
            AnyValue::Error(e) => JsonValue::String(format_or_marker(format_args!("{}", e))),
            AnyValue::Text(t) => match t.marshal_text() {
                Ok(text) => JsonValue::String(text),
                Err(EncodeError::Nil) => JsonValue::Null,
                Err(EncodeError::Failed(msg)) => {
                    JsonValue::String(format!("{}{}", ENCODE_FAILURE_MARKER, msg))
                }
            },
            AnyValue::Debug(d) => JsonValue::String(format_or_marker(format_args!("{:?}", d))),
        },
    }
}
