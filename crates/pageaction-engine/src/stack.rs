//! Calling-stack parsing for the "display calling stack" action.
//!
//! Understands both common stack formats:
//! - `name@https://host/file.js:12:5` (Gecko)
//! - `    at name (https://host/file.js:12:5)` (V8)
//!
//! Lines in neither format are kept verbatim.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Gecko frame: `function@url:line:column`.
static GECKO_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<func>[^@]*)@(?P<url>.+):(?P<line>\d+):(?P<col>\d+)$")
        .expect("valid gecko frame regex")
});

/// V8 frame: `at function (url:line:column)` or `at url:line:column`.
static V8_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^at (?:(?P<func>.+?) \()?(?P<url>[^()\s]+):(?P<line>\d+):(?P<col>\d+)\)?$")
        .expect("valid v8 frame regex")
});

/// One parsed stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function name, empty for anonymous code.
    pub function: String,
    /// Script URL.
    pub url: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// A stack line, parsed when possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    /// Recognized frame.
    Frame(StackFrame),
    /// Unrecognized line, trimmed.
    Raw(String),
}

/// A parsed calling stack, innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallingStack {
    /// Entries in stack order.
    pub entries: Vec<StackEntry>,
}

/// Parse a raw `Error.stack` string.
pub fn parse_error_stack(raw: &str) -> CallingStack {
    let mut entries = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        // V8 prefixes the stack with the error message.
        if entries.is_empty() && (line == "Error" || line.starts_with("Error:")) {
            continue;
        }
        entries.push(parse_line(line));
    }
    CallingStack { entries }
}

/// Parse one trimmed, non-empty line.
fn parse_line(line: &str) -> StackEntry {
    let caps = GECKO_FRAME
        .captures(line)
        .or_else(|| V8_FRAME.captures(line));
    let Some(caps) = caps else {
        return StackEntry::Raw(line.to_string());
    };
    let num = |name: &str| -> Option<u32> { caps.name(name).and_then(|m| m.as_str().parse().ok()) };
    match (num("line"), num("col")) {
        (Some(line_no), Some(column)) => StackEntry::Frame(StackFrame {
            function: caps
                .name("func")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            url: caps
                .name("url")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            line: line_no,
            column,
        }),
        _ => StackEntry::Raw(line.to_string()),
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.function.is_empty() {
            "(anonymous)"
        } else {
            &self.function
        };
        write!(
            f,
            "{} @ {} line {}, column {}",
            name, self.url, self.line, self.column
        )
    }
}

impl fmt::Display for CallingStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match entry {
                StackEntry::Frame(frame) => write!(f, "{}", frame)?,
                StackEntry::Raw(raw) => f.write_str(raw)?,
            }
        }
        Ok(())
    }
}
