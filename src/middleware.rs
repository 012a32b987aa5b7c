use crate::caller::Source;
use crate::context::{LogContext, SOURCE_KEY, SQL_KEY};
use crate::handler::{Handler, HandlerError};
use crate::level::Level;
use crate::options::Options;
use crate::record::Record;
use crate::value::{Attr, Value};
use std::sync::Arc;

/// Decorator that copies context values onto records before forwarding
/// them, so structured downstream handlers (JSON) see them as attributes.
///
/// On each record it attaches, in order:
/// 1. every `add_ctx_attr` key present in the context,
/// 2. the context SQL statement under `sql`,
/// 3. with `source` enabled and no explicit source in the context, the
///    record's call site under `source` (short function, `dir/file`, line).
///
/// Derived handlers keep the enrichment settings: `with_attrs` and
/// `with_group` derive the downstream handler and wrap it again with the
/// same configuration.
#[derive(Clone)]
pub struct HandlerMiddleware {
    source: bool,
    add_ctx_attr: Arc<[String]>,
    next: Arc<dyn Handler>,
}

impl HandlerMiddleware {
    pub fn new(next: Arc<dyn Handler>, opts: &Options) -> Self {
        Self {
            source: opts.source,
            add_ctx_attr: opts.add_ctx_attr.clone().into(),
            next,
        }
    }

    fn enrich(&self, ctx: &LogContext, record: &mut Record) {
        for key in self.add_ctx_attr.iter() {
            if let Some(value) = ctx.value(key) {
                record.add(key.as_str(), value);
            }
        }

        if let Some(sql) = ctx.sql() {
            record.add(SQL_KEY, sql);
        }

        if self.source && ctx.source().is_none() {
            if let Some(site) = &record.call_site {
                let src = Source::from_call_site(site).reduced();
                record.add(SOURCE_KEY, Value::from(src));
            }
        }
    }

    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(Self {
            source: self.source,
            add_ctx_attr: Arc::clone(&self.add_ctx_attr),
            next,
        })
    }
}

impl Handler for HandlerMiddleware {
    fn enabled(&self, ctx: &LogContext, level: Level) -> bool {
        self.next.enabled(ctx, level)
    }

    fn handle(&self, ctx: &LogContext, mut record: Record) -> Result<(), HandlerError> {
        self.enrich(ctx, &mut record);
        self.next.handle(ctx, record)
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }
        self.wrap(Arc::clone(&self.next).with_attrs(attrs))
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        self.wrap(Arc::clone(&self.next).with_group(name))
    }
}

impl std::fmt::Debug for HandlerMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerMiddleware")
            .field("source", &self.source)
            .field("add_ctx_attr", &self.add_ctx_attr)
            .finish_non_exhaustive()
    }
}
