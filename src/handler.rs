use crate::context::LogContext;
use crate::level::Level;
use crate::record::Record;
use crate::value::Attr;
use std::sync::Arc;

/// Destination for [`Record`]s: renders them, decorates them, or both.
///
/// Handlers are shared between threads and never mutated after
/// construction. Derivation through [`with_attrs`](Handler::with_attrs)
/// and [`with_group`](Handler::with_group) produces a new handler and
/// leaves the receiver as it was.
pub trait Handler: Send + Sync {
    /// Whether a record at `level` would be handled at all.
    fn enabled(&self, ctx: &LogContext, level: Level) -> bool;

    /// Render or forward one record.
    ///
    /// **Returns**
    /// - `Ok(())` once the record was written (or intentionally dropped).
    /// - `Err(..)` if the output sink rejected the write. The record is
    ///   written at most once; there is no retry.
    fn handle(&self, ctx: &LogContext, record: Record) -> Result<(), HandlerError>;

    /// Handler that adds `attrs` to every record after the record's own.
    /// An empty list returns the receiver itself.
    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler>;

    /// Handler that prefixes subsequent keys with `name.`. An empty name
    /// returns the receiver itself.
    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler>;
}

/// Error type returned by [`Handler::handle`].
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("write log output: {0}")]
    Write(#[from] std::io::Error),

    #[cfg(feature = "json")]
    #[error("encode json record: {0}")]
    Json(#[from] serde_json::Error),
}
