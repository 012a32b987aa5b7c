pub mod buffer;
pub mod caller;
pub mod color;
pub mod context;
pub mod dev;
pub mod encode;
pub mod env;
pub mod handler;
pub mod init;
pub mod layer;
pub mod level;
pub mod logger;
pub mod middleware;
pub mod options;
pub mod query;
pub mod record;
pub mod sink;
pub mod value;

#[cfg(feature = "json")]
pub mod json;

pub use caller::{BacktraceResolver, CallerResolver, Source};
pub use context::LogContext;
pub use dev::DevHandler;
pub use handler::{Handler, HandlerError};
pub use init::{default_logger, init_dev_logger, init_tracing, set_default, InitError};
#[cfg(feature = "json")]
pub use init::init_logger;
#[cfg(feature = "json")]
pub use json::JsonHandler;
pub use layer::DevLayer;
pub use level::{Level, ParseLevelError};
pub use logger::Logger;
pub use middleware::HandlerMiddleware;
pub use options::Options;
pub use query::QueryLogger;
pub use record::{CallSite, Record};
pub use sink::{MemorySink, SharedSink};
pub use value::{AnyValue, Attr, EncodeError, TextMarshaler, Value};
