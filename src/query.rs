use crate::caller::{BacktraceResolver, CallerResolver};
use crate::context::LogContext;
use crate::encode::format_or_marker;
use crate::handler::HandlerError;
use crate::level::Level;
use crate::logger::Logger;
use crate::value::{Attr, Value};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

/// Frames to pass over before looking for application code. The resolver
/// already ignores runtime and library frames, so none are skipped blindly.
const CALLER_SKIP: usize = 0;

/// Adapter that reports database queries through a [`Logger`].
///
/// A database layer calls [`trace`](QueryLogger::trace) once per statement.
/// The statement, row count and elapsed time travel in the [`LogContext`]
/// so the dev handler can print them as a block under the log line, and the
/// record is attributed to the first application frame on the stack rather
/// than to the database layer.
#[derive(Clone)]
pub struct QueryLogger {
    logger: Logger,
    attrs: Vec<Attr>,
    resolver: Arc<dyn CallerResolver>,
    show_params: bool,
}

impl QueryLogger {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            attrs: Vec::new(),
            resolver: Arc::new(BacktraceResolver::default()),
            show_params: true,
        }
    }

    /// Attributes added to every successful query record.
    pub fn with_attrs(mut self, attrs: Vec<Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn CallerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// When `false`, [`params_filter`](QueryLogger::params_filter) drops
    /// bound parameters so they never reach the log.
    pub fn show_params(mut self, show: bool) -> Self {
        self.show_params = show;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Record one executed statement.
    ///
    /// `fc` is called once to produce the SQL text and the affected row
    /// count; the elapsed time is measured from `begin` after it returns.
    /// With `err` set the record is logged at `ERROR` with the error text as
    /// message, otherwise at `INFO` with an empty message and the bound
    /// attributes. When no application frame can be found the source is
    /// left out entirely.
    ///
    /// **Returns**
    /// - whatever the underlying handler reports.
    pub fn trace<F>(
        &self,
        ctx: &LogContext,
        begin: Instant,
        fc: F,
        err: Option<&dyn Error>,
    ) -> Result<(), HandlerError>
    where
        F: FnOnce() -> (String, i64),
    {
        let (sql, rows) = fc();
        let elapsed = begin.elapsed();
        let ctx = ctx
            .clone()
            .with_sql(sql)
            .with_rows(rows)
            .with_duration(elapsed);

        let (ctx, call_site) = match self.resolver.resolve(CALLER_SKIP) {
            Some(source) => (ctx.with_source(source), Some(crate::call_site!())),
            None => (ctx, None),
        };

        match err {
            Some(err) => {
                let message = format_or_marker(format_args!("{}", err));
                self.logger
                    .log(&ctx, Level::Error, message, Vec::new(), call_site)
            }
            None => self
                .logger
                .log(&ctx, Level::Info, "", self.attrs.clone(), call_site),
        }
    }

    /// Log a free-form message, e.g. a driver notice.
    #[track_caller]
    pub fn info(&self, ctx: &LogContext, message: &str, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.logger.info(ctx, message, attrs)
    }

    #[track_caller]
    pub fn warn(&self, ctx: &LogContext, message: &str, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.logger.warn(ctx, message, attrs)
    }

    #[track_caller]
    pub fn error(&self, ctx: &LogContext, message: &str, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.logger.error(ctx, message, attrs)
    }

    /// Hook for the database layer to decide which bound parameters are
    /// shown next to a statement.
    pub fn params_filter<'a>(&self, sql: &'a str, params: Vec<Value>) -> (&'a str, Vec<Value>) {
        if self.show_params {
            (sql, params)
        } else {
            (sql, Vec::new())
        }
    }
}

impl std::fmt::Debug for QueryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryLogger")
            .field("attrs", &self.attrs)
            .field("show_params", &self.show_params)
            .finish_non_exhaustive()
    }
}
