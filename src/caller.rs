//! Call-site resolution: short function names, short file paths, and a
//! stack-walking resolver for code that logs on behalf of its caller.

use crate::record::CallSite;
use serde::Serialize;
use std::backtrace::Backtrace;
use std::fmt;
use std::path::Path;

/// Resolved origin of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Source {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Source {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// Full-path source for a call site, as captured.
    pub fn from_call_site(site: &CallSite) -> Self {
        Self::new(site.function, site.file, site.line)
    }

    /// Copy with the function reduced to its short name and the file to
    /// `parent/file`.
    pub fn reduced(&self) -> Self {
        Self {
            function: short_function_name(&self.function),
            file: short_file(&self.file),
            line: self.line,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if self.line != 0 {
            write!(f, ":{}", self.line)?;
        }
        if !self.function.is_empty() {
            write!(f, " {}", self.function)?;
        }
        Ok(())
    }
}

/// Reduce a qualified function path to the name a reader recognizes.
///
/// Trailing closure segments (`{{closure}}`, `func1`) and numeric segments
/// are kept as a suffix of the first real segment found walking from the
/// end, so `pkg.(*Type).Method.func1.1` becomes `Method.func1.1` and
/// `app::repo::Repo::find::{{closure}}` becomes `find::{{closure}}`.
pub fn short_function_name(path: &str) -> String {
    let path = strip_symbol_hash(path);
    let sep = if path.contains("::") { "::" } else { "." };
    let mut kept = Vec::new();
    for segment in path.rsplit(sep) {
        kept.push(segment);
        if !is_synthetic_segment(segment) {
            break;
        }
    }
    kept.reverse();
    kept.join(sep)
}

fn is_synthetic_segment(segment: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if all_digits(segment) || segment == "{{closure}}" {
        return true;
    }
    match segment.strip_prefix("func") {
        Some(rest) => all_digits(rest),
        None => false,
    }
}

/// Drop a trailing `::h0123456789abcdef` legacy mangling hash.
fn strip_symbol_hash(path: &str) -> &str {
    if let Some((head, hash)) = path.rsplit_once("::h") {
        if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return head;
        }
    }
    path
}

/// Keep the file name and the base name of its directory: `parent/file.rs`.
pub fn short_file(file: &str) -> String {
    let path = Path::new(file);
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return file.to_string(),
    };
    match path.parent().and_then(Path::file_name) {
        Some(dir) if dir != "." => format!("{}/{}", dir.to_string_lossy(), name),
        _ => name.into_owned(),
    }
}

/// Capability to find the code that a record should be attributed to.
pub trait CallerResolver: Send + Sync {
    /// Walk the current stack, ignoring the innermost `skip` frames, and
    /// return the first frame that belongs to application code.
    fn resolve(&self, skip: usize) -> Option<Source>;
}

/// One frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: Option<String>,
    pub line: u32,
}

const RUNTIME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "__rust",
    "rust_begin_unwind",
];

/// [`CallerResolver`] backed by [`std::backtrace::Backtrace`].
///
/// Frames from the runtime, from any configured library module prefix,
/// and from generated files are passed over. A library frame still counts
/// when it is test code, so a library's own tests attribute to themselves.
#[derive(Debug, Clone)]
pub struct BacktraceResolver {
    library_prefixes: Vec<String>,
    generated_suffixes: Vec<String>,
}

impl Default for BacktraceResolver {
    fn default() -> Self {
        Self {
            library_prefixes: vec![concat!(env!("CARGO_CRATE_NAME"), "::").to_string()],
            generated_suffixes: vec![".gen.rs".to_string()],
        }
    }
}

impl BacktraceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also skip frames whose function path starts with `prefix`, e.g. the
    /// module path of a database driver (`"sqlx::"`).
    pub fn skip_library(mut self, prefix: impl Into<String>) -> Self {
        self.library_prefixes.push(prefix.into());
        self
    }

    /// Also skip frames whose file name ends with `suffix`, for code
    /// emitted by build scripts or macros (`".pb.rs"`). `.gen.rs` is
    /// skipped by default.
    pub fn skip_generated(mut self, suffix: impl Into<String>) -> Self {
        self.generated_suffixes.push(suffix.into());
        self
    }

    /// First acceptable frame after `skip`, reduced for display.
    pub fn pick(&self, frames: &[Frame], skip: usize) -> Option<Source> {
        frames
            .iter()
            .skip(skip)
            .find(|frame| self.accepts(frame))
            .map(|frame| Source {
                function: short_function_name(&frame.function),
                file: frame.file.as_deref().map(short_file).unwrap_or_default(),
                line: frame.line,
            })
    }

    fn accepts(&self, frame: &Frame) -> bool {
        let function = frame.function.trim_start_matches('<');
        if function.is_empty() || RUNTIME_PREFIXES.iter().any(|p| function.starts_with(p)) {
            return false;
        }
        let file = frame.file.as_deref().unwrap_or("");
        if self.generated_suffixes.iter().any(|s| file.ends_with(s.as_str())) {
            return false;
        }
        let in_library = self
            .library_prefixes
            .iter()
            .any(|p| function.starts_with(p.as_str()));
        !in_library || is_test_code(function, file)
    }
}

impl CallerResolver for BacktraceResolver {
    fn resolve(&self, skip: usize) -> Option<Source> {
        let trace = Backtrace::force_capture().to_string();
        self.pick(&parse_backtrace(&trace), skip)
    }
}

fn is_test_code(function: &str, file: &str) -> bool {
    let file = file.replace('\\', "/");
    function.contains("::tests::")
        || file.starts_with("tests/")
        || file.contains("/tests/")
        || file.ends_with("_test.rs")
}

/// Parse the text form of a captured backtrace into frames.
///
/// Each frame starts with `N: function` and is optionally followed by
/// `at file:line:column` lines; the first location is kept.
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut located = false;
    for line in text.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let (Some(frame), false) = (frames.last_mut(), located) {
                let (file, line_no) = split_location(location);
                frame.file = Some(file.to_string());
                frame.line = line_no;
                located = true;
            }
            continue;
        }
        let Some((index, function)) = line.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        frames.push(Frame {
            function: function.trim().to_string(),
            file: None,
            line: 0,
        });
        located = false;
    }
    frames
}

/// Split `path:line:column` (column optional) into path and line.
fn split_location(location: &str) -> (&str, u32) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next().unwrap_or("");
    let middle = parts.next();
    let rest = parts.next();
    match (middle, rest) {
        (Some(line), Some(path)) if line.parse::<u32>().is_ok() => {
            (path, line.parse().unwrap_or(0))
        }
        (Some(path), _) => (path, last.parse().unwrap_or(0)),
        _ => (location, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_style_closure_names() {
        assert_eq!(
            short_function_name("github.com/acme/app/pkg.(*Type).Method.func1.1"),
            "Method.func1.1"
        );
        assert_eq!(short_function_name("main.main"), "main");
        assert_eq!(short_function_name("pkg.handler.func2"), "handler.func2");
    }

    #[test]
    fn rust_closure_names() {
        assert_eq!(short_function_name("app::repo::Repo::find"), "find");
        assert_eq!(
            short_function_name("app::repo::Repo::find::{{closure}}::{{closure}}"),
            "find::{{closure}}::{{closure}}"
        );
        assert_eq!(
            short_function_name("<app::Db as app::Store>::load::{{closure}}"),
            "load::{{closure}}"
        );
        assert_eq!(short_function_name("app::run::h0123456789abcdef"), "run");
        assert_eq!(short_function_name("function_name"), "function_name");
    }

    #[test]
    fn short_name_is_idempotent() {
        let once = short_function_name("a.b.Method.func1.1");
        assert_eq!(short_function_name(&once), once);
    }

    #[test]
    fn file_keeps_parent_directory() {
        assert_eq!(short_file("/home/me/app/src/db/repo.rs"), "db/repo.rs");
        assert_eq!(short_file("./tests/query.rs"), "tests/query.rs");
        assert_eq!(short_file("lib.rs"), "lib.rs");
        assert_eq!(short_file("src/lib.rs"), "src/lib.rs");
    }

    #[test]
    fn source_display() {
        let src = Source::new("find", "db/repo.rs", 12);
        assert_eq!(src.to_string(), "db/repo.rs:12 find");
    }

    const SAMPLE: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   2: devlog::caller::BacktraceResolver::resolve
             at ./src/caller.rs:170:21
   3: sqlx_core::pool::fetch
             at /cargo/registry/sqlx-core/src/pool.rs:88:9
   4: app::models::users.gen::load
             at ./src/models/users.gen.rs:10:1
   5: app::service::UserService::by_id::{{closure}}
             at ./src/service.rs:42:17
   6: app::main
             at ./src/main.rs:5:5
";

    #[test]
    fn parses_std_backtrace_text() {
        let frames = parse_backtrace(SAMPLE);
        assert_eq!(frames.len(), 7);
        assert_eq!(frames[2].function, "devlog::caller::BacktraceResolver::resolve");
        assert_eq!(frames[2].file.as_deref(), Some("./src/caller.rs"));
        assert_eq!(frames[2].line, 170);
    }

    #[test]
    fn picks_first_application_frame() {
        let resolver = BacktraceResolver::new().skip_library("sqlx_core::");
        let src = resolver.pick(&parse_backtrace(SAMPLE), 0).unwrap();
        assert_eq!(src.function, "by_id::{{closure}}");
        assert_eq!(src.file, "src/service.rs");
        assert_eq!(src.line, 42);
    }

    #[test]
    fn skip_depth_is_applied_before_filtering() {
        let resolver = BacktraceResolver::new().skip_library("sqlx_core::");
        let src = resolver.pick(&parse_backtrace(SAMPLE), 6).unwrap();
        assert_eq!(src.function, "main");
    }

    #[test]
    fn library_test_frames_are_accepted() {
        let frames = vec![
            Frame {
                function: "devlog::query::QueryLogger::trace".into(),
                file: Some("./src/query.rs".into()),
                line: 80,
            },
            Frame {
                function: "devlog::query::tests::runs_query".into(),
                file: Some("./src/query.rs".into()),
                line: 200,
            },
        ];
        let src = BacktraceResolver::new().pick(&frames, 0).unwrap();
        assert_eq!(src.function, "runs_query");
    }

    #[test]
    fn configured_generated_suffix_is_skipped() {
        let frames = vec![
            Frame {
                function: "app::proto::decode".into(),
                file: Some("./src/proto/user.pb.rs".into()),
                line: 3,
            },
            Frame {
                function: "app::handlers::get_user".into(),
                file: Some("./src/handlers.rs".into()),
                line: 21,
            },
        ];
        let plain = BacktraceResolver::new().pick(&frames, 0).unwrap();
        assert_eq!(plain.function, "decode");
        let skipping = BacktraceResolver::new().skip_generated(".pb.rs");
        assert_eq!(skipping.pick(&frames, 0).unwrap().function, "get_user");
    }

    #[test]
    fn frame_without_location_keeps_function() {
        let frames = vec![Frame {
            function: "app::jobs::sweep".into(),
            file: None,
            line: 0,
        }];
        let src = BacktraceResolver::new().pick(&frames, 0).unwrap();
        assert_eq!(src, Source::new("sweep", "", 0));
    }

    #[test]
    fn no_frames_resolves_to_none() {
        assert_eq!(BacktraceResolver::new().pick(&[], 0), None);
        assert_eq!(BacktraceResolver::new().pick(&parse_backtrace(SAMPLE), 100), None);
    }

    #[test]
    fn live_capture_finds_this_test() {
        #[inline(never)]
        fn capture_here() -> Option<Source> {
            BacktraceResolver::new().resolve(0)
        }
        let src = capture_here().expect("a frame from this test");
        assert!(src.function.contains("capture_here"), "got {:?}", src);
    }
}
