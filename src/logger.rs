use crate::context::LogContext;
use crate::handler::{Handler, HandlerError};
use crate::level::Level;
use crate::record::{CallSite, Record};
use crate::value::Attr;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Front end over a [`Handler`] chain.
///
/// Cloning is cheap; clones share the same handler. Records below the
/// handler's level are dropped before a [`Record`] is built.
///
/// The level methods (`info`, `warn`, ...) take the call site from
/// `#[track_caller]`, which knows the file and line but not the function.
/// The [`info!`](crate::info) family of macros captures all three.
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl Logger {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn enabled(&self, ctx: &LogContext, level: Level) -> bool {
        self.handler.enabled(ctx, level)
    }

    /// Logger whose records all carry `attrs`.
    pub fn with(&self, attrs: Vec<Attr>) -> Self {
        Self::new(Arc::clone(&self.handler).with_attrs(attrs))
    }

    /// Logger that qualifies later attribute keys with `name`.
    pub fn with_group(&self, name: &str) -> Self {
        Self::new(Arc::clone(&self.handler).with_group(name))
    }

    /// Build a record and hand it to the handler.
    ///
    /// **Returns**
    /// - `Ok(())` when the record was written or filtered out by level.
    /// - `Err(..)` with whatever the handler reported.
    pub fn log(
        &self,
        ctx: &LogContext,
        level: Level,
        message: impl Into<String>,
        attrs: Vec<Attr>,
        call_site: Option<CallSite>,
    ) -> Result<(), HandlerError> {
        if !self.handler.enabled(ctx, level) {
            return Ok(());
        }
        let record = Record::new(level, message)
            .with_call_site(call_site)
            .with_attrs(attrs);
        self.handler.handle(ctx, record)
    }

    #[track_caller]
    pub fn debug(&self, ctx: &LogContext, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.log(ctx, Level::Debug, message, attrs, Some(caller_location()))
    }

    #[track_caller]
    pub fn info(&self, ctx: &LogContext, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.log(ctx, Level::Info, message, attrs, Some(caller_location()))
    }

    #[track_caller]
    pub fn warn(&self, ctx: &LogContext, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.log(ctx, Level::Warn, message, attrs, Some(caller_location()))
    }

    #[track_caller]
    pub fn error(&self, ctx: &LogContext, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandlerError> {
        self.log(ctx, Level::Error, message, attrs, Some(caller_location()))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[track_caller]
fn caller_location() -> CallSite {
    let loc = Location::caller();
    CallSite {
        function: "",
        file: loc.file(),
        line: loc.line(),
    }
}

/// Log through a [`Logger`] with the full call site of the invocation.
///
/// ```ignore
/// devlog::log!(logger, &ctx, Level::Info, "user created", "id" => 7, "name" => "ann")?;
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $ctx:expr, $level:expr, $msg:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $logger.log(
            $ctx,
            $level,
            $msg,
            ::std::vec![$($crate::Attr::new($key, $value)),*],
            ::std::option::Option::Some($crate::call_site!()),
        )
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Debug, $($rest)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Info, $($rest)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Warn, $($rest)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Error, $($rest)+)
    };
}
