//! ANSI escape codes and the palette used by the dev handler.

pub const RESET: &str = "\x1b[0m";
pub const RED: &str = "\x1b[31m";
pub const FAINT: &str = "\x1b[90m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";
pub const BRIGHT_GREEN: &str = "\x1b[92m";
pub const BRIGHT_YELLOW: &str = "\x1b[93m";

pub const ESC: char = '\x1b';

/// Color codes for each span the dev handler writes.
///
/// The colorless palette has every code empty, so the render path is the
/// same for both modes and simply emits nothing around each span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub reset: &'static str,
    pub faint: &'static str,
    pub error: &'static str,
    pub warn: &'static str,
    pub info: &'static str,
    pub message: &'static str,
    pub function: &'static str,
    pub fast: &'static str,
    pub rows: &'static str,
    pub sql: &'static str,
}

impl Palette {
    pub const ANSI: Palette = Palette {
        reset: RESET,
        faint: FAINT,
        error: RED,
        warn: BRIGHT_YELLOW,
        info: BRIGHT_GREEN,
        message: CYAN,
        function: BLUE,
        fast: GREEN,
        rows: YELLOW,
        sql: MAGENTA,
    };

    pub const PLAIN: Palette = Palette {
        reset: "",
        faint: "",
        error: "",
        warn: "",
        info: "",
        message: "",
        function: "",
        fast: "",
        rows: "",
        sql: "",
    };

    pub fn new(color: bool) -> Self {
        if color {
            Self::ANSI
        } else {
            Self::PLAIN
        }
    }

    pub fn is_plain(&self) -> bool {
        self.reset.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::ANSI
    }
}
