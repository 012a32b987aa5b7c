use crate::context::{LogContext, ROWS_KEY, SQL_KEY};
use crate::encode::format_or_marker;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{CallSite, Record};
use crate::value::{Attr, Value};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanRecord};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`Record`]s and hands
/// them to a [`Handler`].
///
/// Fields of the enclosing spans become the [`LogContext`] of the event,
/// outermost span first, so an inner span's value for a key wins. Two span
/// fields are read into typed slots: `sql` (a string) and `rows` (an
/// integer). A field with one of those names and another type is ignored.
/// Everything else is a named context value, printed when its key is
/// listed in `add_ctx_attr`.
///
/// Handler failures are reported on stderr; a log call never fails the
/// instrumented code.
pub struct DevLayer {
    handler: Arc<dyn Handler>,
}

impl DevLayer {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    fn context_for<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> LogContext
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let mut log_ctx = LogContext::new();
        let Some(scope) = ctx.event_scope(event) else {
            return log_ctx;
        };
        for span in scope.from_root() {
            let extensions = span.extensions();
            let Some(fields) = extensions.get::<SpanFields>() else {
                continue;
            };
            for (key, value) in &fields.0 {
                log_ctx = apply_span_field(log_ctx, key, value);
            }
        }
        log_ctx
    }
}

impl fmt::Debug for DevLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevLayer").finish_non_exhaustive()
    }
}

fn apply_span_field(ctx: LogContext, key: &str, value: &Value) -> LogContext {
    match key {
        SQL_KEY => match value.as_str() {
            Some(sql) => ctx.with_sql(sql),
            None => ctx,
        },
        ROWS_KEY => match value.as_i64() {
            Some(rows) => ctx.with_rows(rows),
            None => ctx,
        },
        _ => ctx.with_value(key, value.clone()),
    }
}

/// Fields recorded on a span, kept in its extensions.
struct SpanFields(Vec<(String, Value)>);

impl<S> Layer<S> for DevLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Vec::new();
        attrs.record(&mut FieldVisitor {
            fields: &mut fields,
            message: None,
        });
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &SpanRecord<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            let mut recorded = Vec::new();
            values.record(&mut FieldVisitor {
                fields: &mut recorded,
                message: None,
            });
            for (key, value) in recorded {
                match fields.iter_mut().find(|(k, _)| *k == key) {
                    Some(slot) => slot.1 = value,
                    None => fields.push((key, value)),
                }
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        let log_ctx = self.context_for(event, &ctx);
        if !self.handler.enabled(&log_ctx, level) {
            return;
        }

        let mut fields = Vec::new();
        let mut message = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: Some(&mut message),
        });

        let call_site = meta.file().map(|file| CallSite {
            function: meta.module_path().unwrap_or_else(|| meta.target()),
            file,
            line: meta.line().unwrap_or(0),
        });

        let record = Record::new(level, message.unwrap_or_default())
            .with_call_site(call_site)
            .with_attrs(fields.into_iter().map(|(key, value)| Attr { key, value }));

        if let Err(e) = self.handler.handle(&log_ctx, record) {
            eprintln!("devlog: failed to write log record: {}", e);
        }
    }
}

/// Error recorded through `tracing`, which only lends the value.
#[derive(Debug)]
struct RecordedError(String);

impl fmt::Display for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RecordedError {}

/// Collects `tracing` fields as typed values. The `message` field goes to
/// `message` when one is given.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<(String, Value)>,
    pub message: Option<&'a mut Option<String>>,
}

impl<'a> FieldVisitor<'a> {
    fn push(&mut self, field: &Field, value: Value) {
        self.fields.push((field.name().to_string(), value));
    }

    fn take_message(&mut self, field: &Field, text: impl FnOnce() -> String) -> bool {
        if field.name() != "message" {
            return false;
        }
        match self.message.as_deref_mut() {
            Some(slot) => {
                *slot = Some(text());
                true
            }
            None => false,
        }
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if !self.take_message(field, || value.to_string()) {
            self.push(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        let text = format_or_marker(format_args!("{}", value));
        self.push(field, Value::error(RecordedError(text)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format_or_marker(format_args!("{:?}", value));
        if !self.take_message(field, || text.clone()) {
            self.push(field, Value::String(text));
        }
    }
}
