use crate::dev::DevHandler;
use crate::handler::Handler;
use crate::layer::DevLayer;
use crate::logger::Logger;
use crate::middleware::HandlerMiddleware;
use crate::options::Options;
use std::sync::{Arc, OnceLock};
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

static DEFAULT_LOGGER: OnceLock<Logger> = OnceLock::new();

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("default logger already installed")]
    AlreadyInstalled,
    #[error("set global tracing subscriber: {0}")]
    Tracing(#[from] SetGlobalDefaultError),
}

/// Install `logger` as the process-wide default returned by
/// [`default_logger`].
///
/// **Returns**
/// - `Err(InitError::AlreadyInstalled)` if a default was set before, or
///   [`default_logger`] was already called and fell back to a dev logger.
pub fn set_default(logger: Logger) -> Result<(), InitError> {
    DEFAULT_LOGGER
        .set(logger)
        .map_err(|_| InitError::AlreadyInstalled)
}

/// The process-wide logger. Without an earlier [`set_default`] this is a
/// dev logger on stdout with default [`Options`].
pub fn default_logger() -> Logger {
    DEFAULT_LOGGER
        .get_or_init(|| Logger::new(Arc::new(DevHandler::new(Options::default()))))
        .clone()
}

/// Build the production logger: JSON lines on the configured output
/// (stdout by default), enriched from the context by a
/// [`HandlerMiddleware`], and install it as the default.
#[cfg(feature = "json")]
pub fn init_logger(opts: Options) -> Result<Logger, InitError> {
    let json: Arc<dyn Handler> = Arc::new(crate::json::JsonHandler::new(opts.clone()));
    let logger = Logger::new(Arc::new(HandlerMiddleware::new(json, &opts)));
    set_default(logger.clone())?;
    Ok(logger)
}

/// Build the colorized dev logger and install it as the default.
///
/// The dev handler prints context values itself, so no middleware is put
/// in front of it.
pub fn init_dev_logger(opts: Options) -> Result<Logger, InitError> {
    let logger = Logger::new(Arc::new(DevHandler::new(opts)));
    set_default(logger.clone())?;
    Ok(logger)
}

/// Wrap any handler in the enrichment middleware configured by `opts`.
pub fn with_middleware(handler: Arc<dyn Handler>, opts: &Options) -> Arc<dyn Handler> {
    Arc::new(HandlerMiddleware::new(handler, opts))
}

/// Configuration of the global `tracing` subscriber.
///
/// **Fields**
/// - `enable_fmt`: also print every event through
///   `tracing_subscriber::fmt`, next to the handler output.
#[derive(Clone, Debug, Default)]
pub struct TracingConfig {
    pub enable_fmt: bool,
}

/// Route `tracing` events to `handler` through a [`DevLayer`].
///
/// **Effects**
///
/// Installs a [`Registry`] combined with the layer as the global default
/// subscriber, so all `tracing` events in the process reach the handler.
pub fn init_tracing_with_config(
    handler: Arc<dyn Handler>,
    config: TracingConfig,
) -> Result<(), InitError> {
    let layer = DevLayer::new(handler);
    if config.enable_fmt {
        let subscriber = Registry::default()
            .with(layer)
            .with(tracing_subscriber::fmt::layer());
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing::subscriber::set_global_default(Registry::default().with(layer))?;
    }
    Ok(())
}

/// [`init_tracing_with_config`] with [`TracingConfig::default`].
pub fn init_tracing(handler: Arc<dyn Handler>) -> Result<(), InitError> {
    init_tracing_with_config(handler, TracingConfig::default())
}
