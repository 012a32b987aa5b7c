//! Colorized, human-oriented handler for development consoles.
//!
//! A rendered record looks like
//!
//! ```text
//! 15:04:05 INFO db/repo.rs:42 find loaded user id=7 request_id=abc
//! [0.0123] rows:1 SELECT * FROM users WHERE id = $1
//! ```
//!
//! where the second line only appears when the [`LogContext`] carries SQL.

use crate::buffer::Buffer;
use crate::caller::{short_file, short_function_name, Source};
use crate::color::Palette;
use crate::context::LogContext;
use crate::encode::{append_string, format_float, format_or_marker, ENCODE_FAILURE_MARKER};
use crate::handler::{Handler, HandlerError};
use crate::level::Level;
use crate::options::{Options, DEFAULT_TIME_FORMAT};
use crate::record::Record;
use crate::sink::SharedSink;
use crate::value::{AnyValue, Attr, EncodeError, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Configuration shared by a handler and every handler derived from it.
#[derive(Debug)]
struct Shared {
    sink: SharedSink,
    palette: Palette,
    level: Level,
    time_format: String,
    source: bool,
    slow_threshold: Duration,
    add_ctx_attr: Vec<String>,
}

/// The dev handler. Cheap to derive: only the bound-attribute bytes and
/// group prefix are per instance.
#[derive(Debug)]
pub struct DevHandler {
    shared: Arc<Shared>,
    attrs_prefix: Vec<u8>,
    group_prefix: String,
    groups: Vec<String>,
}

impl DevHandler {
    pub fn new(opts: Options) -> Self {
        let opts = opts.normalized();
        let time_format = if is_valid_time_format(&opts.time_format) {
            opts.time_format
        } else {
            DEFAULT_TIME_FORMAT.to_string()
        };
        Self {
            shared: Arc::new(Shared {
                sink: opts.output.unwrap_or_else(SharedSink::stdout),
                palette: Palette::new(opts.color),
                level: opts.level,
                time_format,
                source: opts.source,
                slow_threshold: opts.slow_threshold,
                add_ctx_attr: opts.add_ctx_attr,
            }),
            attrs_prefix: Vec::new(),
            group_prefix: String::new(),
            groups: Vec::new(),
        }
    }

    /// Names of the groups opened on this handler, outermost first.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    fn derive(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            attrs_prefix: self.attrs_prefix.clone(),
            group_prefix: self.group_prefix.clone(),
            groups: self.groups.clone(),
        }
    }

    fn palette(&self) -> &Palette {
        &self.shared.palette
    }

    fn color(&self) -> bool {
        !self.shared.palette.is_plain()
    }

    fn paint(&self, buf: &mut Buffer, color: &str, text: &str) {
        buf.write_str(color);
        buf.write_str(text);
        buf.write_str(self.palette().reset);
    }

    /// Assemble the full block for one record into `buf`.
    fn render(&self, buf: &mut Buffer, ctx: &LogContext, record: &Record) {
        if let Some(time) = record.time {
            self.append_time(buf, &time);
            buf.write_byte(b' ');
        }

        self.append_level(buf, record.level);
        buf.write_byte(b' ');

        if self.shared.source {
            if let Some(site) = &record.call_site {
                let wrote = match ctx.source() {
                    Some(src) => self.append_source(buf, src),
                    None => self.append_source(buf, &Source::from_call_site(site)),
                };
                if wrote {
                    buf.write_byte(b' ');
                }
            }
        }

        self.append_message(buf, record.level, &record.message);

        for attr in record.attrs() {
            self.append_attr(buf, attr, &self.group_prefix);
        }

        self.append_ctx_values(buf, ctx);

        if !self.attrs_prefix.is_empty() {
            buf.write_bytes(&self.attrs_prefix);
        }

        self.append_sql(buf, ctx, record.level);
    }

    fn append_time(&self, buf: &mut Buffer, time: &DateTime<Local>) {
        buf.write_str(self.palette().faint);
        buf.write_display(time.format(&self.shared.time_format));
        buf.write_str(self.palette().reset);
    }

    fn append_level(&self, buf: &mut Buffer, level: Level) {
        let palette = self.palette();
        let color = match level {
            Level::Info => palette.info,
            Level::Warn => palette.warn,
            _ => palette.error,
        };
        self.paint(buf, color, level.as_str());
    }

    /// `dir/file.rs:line function`, without a trailing separator. Either
    /// half is left out when unknown; returns whether anything was written.
    fn append_source(&self, buf: &mut Buffer, src: &Source) -> bool {
        let located = !src.file.is_empty();
        if located {
            buf.write_str(self.palette().faint);
            buf.write_str(&short_file(&src.file));
            if src.line != 0 {
                buf.write_byte(b':');
                buf.write_display(src.line);
            }
            buf.write_str(self.palette().reset);
        }

        if !src.function.is_empty() {
            if located {
                buf.write_byte(b' ');
            }
            self.paint(buf, self.palette().function, &short_function_name(&src.function));
            return true;
        }
        located
    }

    fn append_message(&self, buf: &mut Buffer, level: Level, msg: &str) {
        if msg.is_empty() {
            return;
        }
        let color = if level == Level::Error {
            self.palette().error
        } else {
            self.palette().message
        };
        self.paint(buf, color, msg);
        buf.write_byte(b' ');
    }

    fn append_attr(&self, buf: &mut Buffer, attr: &Attr, group_prefix: &str) {
        if attr.is_empty() {
            return;
        }

        match &attr.value {
            Value::Any(AnyValue::Error(err)) => {
                let msg = format_or_marker(format_args!("{}", err));
                self.append_error(buf, &msg, &attr.key, group_prefix);
                buf.write_byte(b' ');
                return;
            }
            Value::Group(members) => {
                let prefix: Cow<'_, str> = if attr.key.is_empty() {
                    Cow::Borrowed(group_prefix)
                } else {
                    Cow::Owned(format!("{}{}.", group_prefix, attr.key))
                };
                for member in members {
                    self.append_attr(buf, member, &prefix);
                }
                return;
            }
            _ => {}
        }

        self.append_key(buf, &attr.key, group_prefix);
        self.append_value(buf, &attr.value, true);
        buf.write_byte(b' ');
    }

    fn append_key(&self, buf: &mut Buffer, key: &str, group_prefix: &str) {
        buf.write_str(self.palette().faint);
        append_string(buf, &format!("{}{}", group_prefix, key), false, self.color());
        buf.write_byte(b'=');
        buf.write_str(self.palette().reset);
    }

    fn append_value(&self, buf: &mut Buffer, value: &Value, quote: bool) {
        let color = self.color();
        match value {
            Value::String(s) => append_string(buf, s, quote, color),
            Value::Int64(v) => buf.write_i64(*v),
            Value::Uint64(v) => buf.write_u64(*v),
            Value::Float64(v) => buf.write_str(&format_float(*v)),
            Value::Bool(v) => buf.write_str(if *v { "true" } else { "false" }),
            Value::Duration(d) => append_string(buf, &format!("{:?}", d), quote, color),
            Value::Time(t) => append_string(buf, &t.to_string(), quote, color),
            Value::Group(_) => {
                append_string(buf, &format_or_marker(format_args!("{}", value)), quote, color)
            }
            Value::Any(any) => self.append_any(buf, any, quote),
        }
    }

    fn append_any(&self, buf: &mut Buffer, any: &AnyValue, quote: bool) {
        let color = self.color();
        match any {
            AnyValue::Nil => append_string(buf, "<nil>", false, false),
            AnyValue::Level(level) => self.append_level(buf, *level),
            AnyValue::Source(src) => {
                self.append_source(buf, src);
            }
            AnyValue::Error(err) => {
                append_string(buf, &format_or_marker(format_args!("{}", err)), quote, color)
            }
            AnyValue::Text(marshaler) => match marshaler.marshal_text() {
                Ok(text) => append_string(buf, &text, quote, color),
                Err(EncodeError::Nil) => append_string(buf, "<nil>", false, false),
                Err(EncodeError::Failed(msg)) => append_string(
                    buf,
                    &format!("{}{}", ENCODE_FAILURE_MARKER, msg),
                    true,
                    color,
                ),
            },
            AnyValue::Debug(v) => {
                append_string(buf, &format_or_marker(format_args!("{:?}", v)), quote, color)
            }
        }
    }

    fn append_error(&self, buf: &mut Buffer, msg: &str, key: &str, group_prefix: &str) {
        let color = self.color();
        buf.write_str(self.palette().function);
        append_string(buf, &format!("{}{}", group_prefix, key), true, color);
        buf.write_byte(b'=');
        buf.write_str(self.palette().faint);
        append_string(buf, msg, true, color);
        buf.write_str(self.palette().reset);
    }

    /// Configured context keys, in order, as `key=value ` with the value
    /// printed as is.
    fn append_ctx_values(&self, buf: &mut Buffer, ctx: &LogContext) {
        for key in &self.shared.add_ctx_attr {
            if let Some(value) = ctx.value(key) {
                buf.write_str(self.palette().faint);
                buf.write_str(key);
                buf.write_byte(b'=');
                buf.write_str(self.palette().reset);
                buf.write_str(&format_or_marker(format_args!("{}", value)));
                buf.write_byte(b' ');
            }
        }
    }

    /// Trailing block for a traced SQL statement:
    /// `\n[secs] rows:n statement \n`.
    fn append_sql(&self, buf: &mut Buffer, ctx: &LogContext, level: Level) {
        let Some(sql) = ctx.sql() else {
            return;
        };
        let palette = *self.palette();

        buf.write_byte(b'\n');

        if let Some(duration) = ctx.duration() {
            let color = if duration > self.shared.slow_threshold {
                palette.error
            } else {
                palette.fast
            };
            buf.write_str(color);
            buf.write_display(format_args!("[{:.4}] ", duration.as_secs_f64()));
            buf.write_str(palette.reset);
        }

        if let Some(rows) = ctx.rows() {
            buf.write_str(palette.rows);
            buf.write_display(format_args!("rows:{} ", rows));
            buf.write_str(palette.reset);
        }

        let color = if level == Level::Error {
            palette.error
        } else {
            palette.sql
        };
        buf.write_str(color);
        buf.write_str(sql);
        buf.write_byte(b' ');
        buf.write_str(palette.reset);

        buf.write_byte(b'\n');
    }
}

impl Handler for DevHandler {
    fn enabled(&self, _ctx: &LogContext, level: Level) -> bool {
        level >= self.shared.level
    }

    fn handle(&self, ctx: &LogContext, record: Record) -> Result<(), HandlerError> {
        let mut buf = Buffer::get();
        self.render(&mut buf, ctx, &record);

        if buf.is_empty() {
            return Ok(());
        }
        buf.set_last(b'\n');

        self.shared.sink.write_line(&buf)?;
        Ok(())
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }

        let mut buf = Buffer::get();
        for attr in &attrs {
            self.append_attr(&mut buf, attr, &self.group_prefix);
        }

        let mut derived = self.derive();
        derived.attrs_prefix.extend_from_slice(&buf);
        Arc::new(derived)
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        let mut derived = self.derive();
        derived.group_prefix.push_str(name);
        derived.group_prefix.push('.');
        derived.groups.push(name.to_string());
        Arc::new(derived)
    }
}

fn is_valid_time_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{
        BLUE, BRIGHT_GREEN, BRIGHT_YELLOW, CYAN, FAINT, GREEN, MAGENTA, RED, RESET, YELLOW,
    };
    use crate::sink::MemorySink;
    use crate::value::TextMarshaler;
    use chrono::TimeZone;

    fn at_15_04_05() -> Option<DateTime<Local>> {
        Local.with_ymd_and_hms(2024, 5, 6, 15, 4, 5).single()
    }

    fn handler(opts: Options) -> (Arc<DevHandler>, MemorySink) {
        let mem = MemorySink::new();
        (Arc::new(DevHandler::new(opts.output(mem.clone()))), mem)
    }

    fn record(level: Level, msg: &str) -> Record {
        Record::new(level, msg).with_time(None)
    }

    fn plain() -> Options {
        Options::new().color(false)
    }

    #[test]
    fn info_line_with_colors() {
        let (h, mem) = handler(Options::new());
        let rec = Record::new(Level::Info, "started").with_time(at_15_04_05());
        h.handle(&LogContext::new(), rec).unwrap();
        assert_eq!(
            mem.text(),
            format!("{FAINT}15:04:05{RESET} {BRIGHT_GREEN}INFO{RESET} {CYAN}started{RESET}\n")
        );
    }

    #[test]
    fn level_palette() {
        let (h, mem) = handler(Options::new());
        h.handle(&LogContext::new(), record(Level::Warn, "")).unwrap();
        h.handle(&LogContext::new(), record(Level::Debug, "")).unwrap();
        h.handle(&LogContext::new(), record(Level::Error, "boom")).unwrap();
        assert_eq!(
            mem.text(),
            format!(
                "{BRIGHT_YELLOW}WARN{RESET}\n{RED}DEBUG{RESET}\n{RED}ERROR{RESET} {RED}boom{RESET}\n"
            )
        );
    }

    #[test]
    fn zero_time_is_omitted_and_empty_message_suppressed() {
        let (h, mem) = handler(plain());
        h.handle(&LogContext::new(), record(Level::Info, "").with_attrs([Attr::new("k", 1)]))
            .unwrap();
        assert_eq!(mem.text(), "INFO k=1\n");
    }

    #[test]
    fn attribute_kinds() {
        let (h, mem) = handler(plain());
        let rec = record(Level::Info, "kinds").with_attrs([
            Attr::new("s", "plain"),
            Attr::new("q", "two words"),
            Attr::new("empty", ""),
            Attr::new("i", -7),
            Attr::new("u", 7u64),
            Attr::new("f", 0.5),
            Attr::new("b", true),
            Attr::new("d", Duration::from_millis(1500)),
            Attr::new("lvl", Level::Warn),
            Attr::new("dbg", Value::debug(vec![1, 2])),
        ]);
        h.handle(&LogContext::new(), rec).unwrap();
        assert_eq!(
            mem.text(),
            "INFO kinds s=plain q=\"two words\" empty=\"\" i=-7 u=7 f=0.5 b=true d=1.5s lvl=WARN dbg=\"[1, 2]\"\n"
        );
    }

    #[test]
    fn groups_prefix_member_keys() {
        let (h, mem) = handler(plain());
        let rec = record(Level::Info, "g").with_attrs([
            Attr::group("req", vec![Attr::new("id", 1), Attr::group("user", vec![Attr::new("name", "ann")])]),
            Attr::group("empty", vec![]),
            Attr::group("", vec![Attr::new("inline", 2)]),
            Attr::new("", Value::nil()),
        ]);
        h.handle(&LogContext::new(), rec).unwrap();
        assert_eq!(mem.text(), "INFO g req.id=1 req.user.name=ann inline=2\n");
    }

    #[test]
    fn error_attribute_rendering() {
        let (h, mem) = handler(Options::new());
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        h.handle(&LogContext::new(), record(Level::Error, "").with_attrs([Attr::error("err", err)]))
            .unwrap();
        assert_eq!(
            mem.text(),
            format!("{RED}ERROR{RESET} {BLUE}err={FAINT}\"disk full\"{RESET}\n")
        );
    }

    struct Broken(EncodeError);

    impl TextMarshaler for Broken {
        fn marshal_text(&self) -> Result<String, EncodeError> {
            Err(self.0.clone())
        }
    }

    struct Upper(&'static str);

    impl TextMarshaler for Upper {
        fn marshal_text(&self) -> Result<String, EncodeError> {
            Ok(self.0.to_uppercase())
        }
    }

    #[test]
    fn failing_encoder_is_contained() {
        let (h, mem) = handler(plain());
        let rec = record(Level::Info, "m").with_attrs([
            Attr::new("a", Value::text(Broken(EncodeError::Nil))),
            Attr::new("b", Value::text(Broken(EncodeError::Failed("bad state".into())))),
            Attr::new("c", Value::text(Upper("ok"))),
            Attr::new("d", 1),
        ]);
        h.handle(&LogContext::new(), rec).unwrap();
        assert_eq!(mem.text(), "INFO m a=<nil> b=\"!PANIC: bad state\" c=OK d=1\n");
    }

    /// `Debug` and `Display` impls that report an error.
    struct Faulty;

    impl std::fmt::Debug for Faulty {
        fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Err(std::fmt::Error)
        }
    }

    impl std::fmt::Display for Faulty {
        fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Err(std::fmt::Error)
        }
    }

    impl std::error::Error for Faulty {}

    #[test]
    fn failing_formatter_is_contained() {
        let (h, mem) = handler(plain());
        let rec = record(Level::Info, "m")
            .with_attrs([Attr::new("v", Value::debug(Faulty)), Attr::new("after", 1)]);
        h.handle(&LogContext::new(), rec).unwrap();
        assert_eq!(mem.text(), "INFO m v=\"!PANIC: formatting error\" after=1\n");
    }

    #[test]
    fn failing_error_display_is_contained() {
        let (h, mem) = handler(plain());
        let rec = record(Level::Error, "m").with_attrs([
            Attr::error("err", Faulty),
            Attr::new("cause", Value::error(Faulty)),
            Attr::new("after", 1),
        ]);
        h.handle(&LogContext::new(), rec).unwrap();
        assert_eq!(
            mem.text(),
            "ERROR m err=\"!PANIC: formatting error\" cause=\"!PANIC: formatting error\" after=1\n"
        );
    }

    #[test]
    fn failing_context_value_is_contained() {
        let (h, mem) = handler(plain().add_ctx_attr(["state", "rid"]));
        let ctx = LogContext::new()
            .with_value("state", Value::debug(Faulty))
            .with_value("rid", "r1");
        h.handle(&ctx, record(Level::Info, "m")).unwrap();
        assert_eq!(mem.text(), "INFO m state=!PANIC: formatting error rid=r1\n");
    }

    #[test]
    fn source_from_call_site() {
        let (h, mem) = handler(plain().source(true));
        let site = crate::CallSite {
            function: "app::repo::Repo::find::{{closure}}",
            file: "/work/app/src/repo.rs",
            line: 42,
        };
        h.handle(&LogContext::new(), record(Level::Info, "found").with_call_site(Some(site)))
            .unwrap();
        assert_eq!(mem.text(), "INFO src/repo.rs:42 find::{{closure}} found\n");
    }

    #[test]
    fn context_source_wins_over_call_site() {
        let (h, mem) = handler(plain().source(true));
        let ctx = LogContext::new().with_source(Source::new("by_id", "service/users.rs", 9));
        let rec = record(Level::Info, "q").with_call_site(Some(crate::call_site!()));
        h.handle(&ctx, rec).unwrap();
        assert_eq!(mem.text(), "INFO service/users.rs:9 by_id q\n");
    }

    #[test]
    fn source_without_location_prints_function_only() {
        let (h, mem) = handler(plain().source(true));
        let rec = record(Level::Info, "q").with_call_site(Some(crate::call_site!()));
        let ctx = LogContext::new().with_source(Source::new("load_user", "", 0));
        h.handle(&ctx, rec.clone()).unwrap();
        let empty = LogContext::new().with_source(Source::default());
        h.handle(&empty, rec).unwrap();
        assert_eq!(mem.text(), "INFO load_user q\nINFO q\n");
    }

    #[test]
    fn source_needs_call_site_and_flag() {
        let (h, mem) = handler(plain().source(true));
        h.handle(&LogContext::new(), record(Level::Info, "none")).unwrap();
        let (off, off_mem) = handler(plain());
        off.handle(
            &LogContext::new(),
            record(Level::Info, "off").with_call_site(Some(crate::call_site!())),
        )
        .unwrap();
        assert_eq!(mem.text(), "INFO none\n");
        assert_eq!(off_mem.text(), "INFO off\n");
    }

    #[test]
    fn context_values_in_configured_order() {
        let (h, mem) = handler(plain().add_ctx_attr(["user", "request_id", "missing"]));
        let ctx = LogContext::new()
            .with_value("request_id", "r-1")
            .with_value("user", "ann smith");
        h.handle(&ctx, record(Level::Info, "hi").with_attrs([Attr::new("k", "v")]))
            .unwrap();
        assert_eq!(mem.text(), "INFO hi k=v user=ann smith request_id=r-1\n");
    }

    #[test]
    fn sql_block() {
        let (h, mem) = handler(Options::new());
        let ctx = LogContext::new()
            .with_sql("SELECT 1")
            .with_duration(Duration::from_millis(250))
            .with_rows(3);
        h.handle(&ctx, record(Level::Info, "")).unwrap();
        assert_eq!(
            mem.text(),
            format!(
                "{BRIGHT_GREEN}INFO{RESET} \n{GREEN}[0.2500] {RESET}{YELLOW}rows:3 {RESET}{MAGENTA}SELECT 1 {RESET}\n"
            )
        );
    }

    #[test]
    fn slow_threshold_is_strict() {
        let threshold = Duration::from_millis(500);
        let render = |d: Duration| {
            let (h, mem) = handler(Options::new().slow_threshold(threshold));
            let ctx = LogContext::new().with_sql("SELECT 1").with_duration(d);
            h.handle(&ctx, record(Level::Info, "")).unwrap();
            mem.text()
        };
        assert!(render(threshold).contains(&format!("{GREEN}[0.5000] ")));
        assert!(render(threshold + Duration::from_nanos(1)).contains(&format!("{RED}[0.5000] ")));
    }

    #[test]
    fn sql_in_error_record_is_red() {
        let (h, mem) = handler(Options::new());
        let ctx = LogContext::new().with_sql("DELETE FROM t");
        h.handle(&ctx, record(Level::Error, "")).unwrap();
        assert!(mem.text().ends_with(&format!("\n{RED}DELETE FROM t {RESET}\n")));
    }

    #[test]
    fn sql_without_duration_or_rows() {
        let (h, mem) = handler(plain());
        let ctx = LogContext::new().with_sql("SELECT 2");
        h.handle(&ctx, record(Level::Info, "q")).unwrap();
        assert_eq!(mem.text(), "INFO q \nSELECT 2 \n");
    }

    #[test]
    fn with_attrs_and_group_return_self_on_empty_input() {
        let (h, _mem) = handler(plain());
        let as_dyn: Arc<dyn Handler> = h.clone();
        let same_attrs = h.clone().with_attrs(Vec::new());
        let same_group = h.clone().with_group("");
        assert_eq!(Arc::as_ptr(&as_dyn) as *const (), Arc::as_ptr(&same_attrs) as *const ());
        assert_eq!(Arc::as_ptr(&as_dyn) as *const (), Arc::as_ptr(&same_group) as *const ());
    }

    #[test]
    fn nested_groups_compose_prefix() {
        let (h, mem) = handler(plain());
        let derived = h.clone().with_group("a").with_group("b");
        derived
            .handle(&LogContext::new(), record(Level::Info, "x").with_attrs([Attr::new("k", 1)]))
            .unwrap();
        assert_eq!(mem.text(), "INFO x a.b.k=1\n");
    }

    #[test]
    fn bound_attrs_render_after_context_values() {
        let (h, mem) = handler(plain().add_ctx_attr(["rid"]));
        let derived = h
            .clone()
            .with_attrs(vec![Attr::new("svc", "api")])
            .with_group("req")
            .with_attrs(vec![Attr::new("id", 9)]);
        let ctx = LogContext::new().with_value("rid", "r1");
        derived
            .handle(&ctx, record(Level::Info, "m").with_attrs([Attr::new("k", "v")]))
            .unwrap();
        assert_eq!(mem.text(), "INFO m req.k=v rid=r1 svc=api req.id=9\n");
    }

    #[test]
    fn derivation_leaves_parent_untouched() {
        let (h, mem) = handler(plain());
        let _child = h.clone().with_attrs(vec![Attr::new("child", 1)]).with_group("g");
        h.handle(&LogContext::new(), record(Level::Info, "parent").with_attrs([Attr::new("k", 1)]))
            .unwrap();
        assert_eq!(mem.text(), "INFO parent k=1\n");
        assert!(h.groups().is_empty());
    }

    #[test]
    fn level_floor() {
        let (h, _mem) = handler(plain().level(Level::Warn));
        assert!(!h.enabled(&LogContext::new(), Level::Info));
        assert!(h.enabled(&LogContext::new(), Level::Error));
    }

    #[test]
    fn invalid_time_format_falls_back() {
        let (h, mem) = handler(plain().time_format("%Q"));
        h.handle(&LogContext::new(), Record::new(Level::Info, "t").with_time(at_15_04_05()))
            .unwrap();
        assert_eq!(mem.text(), "15:04:05 INFO t\n");
    }

    #[test]
    fn rendered_pairs_split_back() {
        let (h, mem) = handler(plain());
        let rec = record(Level::Info, "").with_attrs([
            Attr::new("name", "ann"),
            Attr::new("greeting", "hello world"),
            Attr::new("n", 42),
        ]);
        h.handle(&LogContext::new(), rec).unwrap();
        let text = mem.text();
        let body = text.trim_end().strip_prefix("INFO ").unwrap();

        let mut pairs = Vec::new();
        let mut rest = body;
        while !rest.is_empty() {
            let (key, after) = rest.split_once('=').unwrap();
            let (value, next) = if let Some(quoted) = after.strip_prefix('"') {
                let end = quoted.find('"').unwrap();
                (&quoted[..end], quoted[end + 1..].trim_start())
            } else {
                match after.split_once(' ') {
                    Some((v, n)) => (v, n),
                    None => (after, ""),
                }
            };
            pairs.push((key.to_string(), value.to_string()));
            rest = next;
        }
        assert_eq!(
            pairs,
            [
                ("name".to_string(), "ann".to_string()),
                ("greeting".to_string(), "hello world".to_string()),
                ("n".to_string(), "42".to_string()),
            ]
        );
    }

    struct FailingWriter;

    impl std::io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_returned() {
        let h = DevHandler::new(Options::new().output(FailingWriter));
        let err = h.handle(&LogContext::new(), record(Level::Info, "x")).unwrap_err();
        assert!(matches!(err, HandlerError::Write(_)));
    }
}
