//! Environment variable names read by [`Options::from_env`].
//!
//! These are purely helpers; handlers themselves never read the
//! environment.
//!
//! [`Options::from_env`]: crate::options::Options::from_env

/// Minimum level: `debug`, `info`, `warn` or `error`.
pub const DEVLOG_LEVEL_ENV: &str = "DEVLOG_LEVEL";

/// `1`/`true` to resolve and print the call site of each record.
pub const DEVLOG_SOURCE_ENV: &str = "DEVLOG_SOURCE";

/// SQL durations above this many milliseconds render in the alarm color.
pub const DEVLOG_SLOW_THRESHOLD_MS_ENV: &str = "DEVLOG_SLOW_THRESHOLD_MS";

/// `strftime` format of the time column.
pub const DEVLOG_TIME_FORMAT_ENV: &str = "DEVLOG_TIME_FORMAT";

/// Comma-separated context keys to print on every line.
pub const DEVLOG_CTX_ATTRS_ENV: &str = "DEVLOG_CTX_ATTRS";

/// Any non-empty value disables color codes (<https://no-color.org>).
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable as a boolean flag.
///
/// `1`, `true`, `yes` and `on` (any case) are true, other values are false,
/// and an unset variable yields `None`.
pub fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
