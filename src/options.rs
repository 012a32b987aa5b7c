use crate::env::{
    env_flag, env_or, DEVLOG_CTX_ATTRS_ENV, DEVLOG_LEVEL_ENV, DEVLOG_SLOW_THRESHOLD_MS_ENV,
    DEVLOG_SOURCE_ENV, DEVLOG_TIME_FORMAT_ENV, NO_COLOR_ENV,
};
use crate::level::{Level, ParseLevelError};
use crate::sink::SharedSink;
use std::io::Write;
use std::time::Duration;

pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(1);

/// Time of day, the dev handler's default time column.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// Configuration shared by the dev handler and the enrichment middleware.
///
/// **Fields**
/// - `add_ctx_attr`: context keys printed (dev handler) or attached as
///   attributes (middleware) on every record, in this order.
/// - `output`: where lines go; `None` means stdout.
/// - `source`: resolve and print the call site of each record.
/// - `slow_threshold`: SQL durations strictly above it render in the alarm
///   color. Zero means the default of one second.
/// - `level`: records below this level are not handled.
/// - `time_format`: `strftime` format of the time column.
/// - `color`: emit ANSI color codes.
#[derive(Clone, Debug)]
pub struct Options {
    pub add_ctx_attr: Vec<String>,
    pub output: Option<SharedSink>,
    pub source: bool,
    pub slow_threshold: Duration,
    pub level: Level,
    pub time_format: String,
    pub color: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            add_ctx_attr: Vec::new(),
            output: None,
            source: false,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            level: Level::Debug,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            color: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from defaults and apply the `DEVLOG_*` and `NO_COLOR`
    /// variables that are set.
    ///
    /// **Returns**
    /// - `Err(..)` if `DEVLOG_LEVEL` is set to an unknown level name.
    ///   Other malformed values fall back to their defaults.
    pub fn from_env() -> Result<Self, ParseLevelError> {
        let mut opts = Self::default();
        if let Ok(level) = std::env::var(DEVLOG_LEVEL_ENV) {
            opts.level = level.parse()?;
        }
        if let Some(source) = env_flag(DEVLOG_SOURCE_ENV) {
            opts.source = source;
        }
        if let Ok(ms) = env_or(DEVLOG_SLOW_THRESHOLD_MS_ENV, "").trim().parse::<u64>() {
            opts.slow_threshold = Duration::from_millis(ms);
        }
        let time_format = env_or(DEVLOG_TIME_FORMAT_ENV, "");
        if !time_format.is_empty() {
            opts.time_format = time_format;
        }
        opts.add_ctx_attr = env_or(DEVLOG_CTX_ATTRS_ENV, "")
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if !env_or(NO_COLOR_ENV, "").is_empty() {
            opts.color = false;
        }
        Ok(opts.normalized())
    }

    pub fn add_ctx_attr<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_ctx_attr.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, writer: impl Write + Send + 'static) -> Self {
        self.output = Some(SharedSink::new(writer));
        self
    }

    /// Write to an existing sink, so several handlers share one lock and
    /// their lines never interleave.
    pub fn shared_output(mut self, sink: SharedSink) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn source(mut self, source: bool) -> Self {
        self.source = source;
        self
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Replace zero values with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.slow_threshold.is_zero() {
            self.slow_threshold = DEFAULT_SLOW_THRESHOLD;
        }
        if self.time_format.is_empty() {
            self.time_format = DEFAULT_TIME_FORMAT.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_means_one_second() {
        let opts = Options::new().slow_threshold(Duration::ZERO).normalized();
        assert_eq!(opts.slow_threshold, Duration::from_secs(1));
    }

    #[test]
    fn builder_collects_ctx_keys_in_order() {
        let opts = Options::new().add_ctx_attr(["request_id", "user"]).add_ctx_attr(["trace"]);
        assert_eq!(opts.add_ctx_attr, ["request_id", "user", "trace"]);
    }

    #[test]
    fn shared_output_reuses_the_sink() {
        let mem = crate::sink::MemorySink::new();
        let sink = SharedSink::new(mem.clone());
        let opts = Options::new().shared_output(sink.clone());
        opts.output.unwrap().write_line(b"a\n").unwrap();
        sink.write_line(b"b\n").unwrap();
        assert_eq!(mem.text(), "a\nb\n");
    }

    #[test]
    fn from_env_reads_variables() {
        std::env::set_var(DEVLOG_LEVEL_ENV, "warn");
        std::env::set_var(DEVLOG_SOURCE_ENV, "true");
        std::env::set_var(DEVLOG_SLOW_THRESHOLD_MS_ENV, "250");
        std::env::set_var(DEVLOG_CTX_ATTRS_ENV, "request_id, user ,");
        let opts = Options::from_env().unwrap();
        std::env::remove_var(DEVLOG_LEVEL_ENV);
        std::env::remove_var(DEVLOG_SOURCE_ENV);
        std::env::remove_var(DEVLOG_SLOW_THRESHOLD_MS_ENV);
        std::env::remove_var(DEVLOG_CTX_ATTRS_ENV);

        assert_eq!(opts.level, Level::Warn);
        assert!(opts.source);
        assert_eq!(opts.slow_threshold, Duration::from_millis(250));
        assert_eq!(opts.add_ctx_attr, ["request_id", "user"]);
    }
}
