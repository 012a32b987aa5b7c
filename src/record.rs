use crate::level::Level;
use crate::value::{Attr, Value};
use chrono::{DateTime, Local};

/// Where a record was emitted, captured at compile time by [`call_site!`].
///
/// `function` is the full path of the enclosing function (closures show up
/// as `{{closure}}` segments); `file` is the path as the compiler saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
}

/// Capture the [`CallSite`] of the macro invocation.
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __devlog_here() {}
        fn __devlog_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __devlog_name_of(__devlog_here);
        $crate::CallSite {
            function: name.strip_suffix("::__devlog_here").unwrap_or(name),
            file: file!(),
            line: line!(),
        }
    }};
}

/// One log event. Handlers receive it by value and read it once.
#[derive(Debug, Clone)]
pub struct Record {
    /// `None` suppresses the timestamp column.
    pub time: Option<DateTime<Local>>,
    pub level: Level,
    pub message: String,
    pub call_site: Option<CallSite>,
    attrs: Vec<Attr>,
}

impl Record {
    /// New record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Some(Local::now()),
            level,
            message: message.into(),
            call_site: None,
            attrs: Vec::new(),
        }
    }

    pub fn with_time(mut self, time: Option<DateTime<Local>>) -> Self {
        self.time = time;
        self
    }

    pub fn with_call_site(mut self, site: Option<CallSite>) -> Self {
        self.call_site = site;
        self
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Append one attribute after the existing ones.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.push(Attr::new(key, value));
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }
}
