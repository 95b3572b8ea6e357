//! Source locations and recoverable-error records.
//!
//! No running VM sits behind this crate to report argument-mismatch errors
//! against, so there is no underlined-source-snippet rendering here — just
//! the span vocabulary and a structured diagnostic record with a `Display`
//! impl.

use std::fmt;

/// A byte-offset span into the source file a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// One recoverable translation error: an unsupported construct, literal,
/// binding form, or similar. Printed as `path:lineno: message` when a line
/// number is known, else `path: message`.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub path: String,
    pub line: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, line: Option<u32>, message: impl Into<String>) -> Self {
        Self { path: path.into(), line, message: message.into() }
    }
}

/// Resolve a byte offset into a 1-indexed line number by scanning `source`.
/// A straight `char_indices` scan is all a diagnostic message needs; this
/// crate never pulls in `ruff_source_file`'s `LineIndex` for it.
pub fn offset_to_line(source: &str, offset: u32) -> u32 {
    let offset = offset as usize;
    let mut line = 1u32;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
        }
    }
    line
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.path, line, self.message),
            None => write!(f, "{}: {}", self.path, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_line_number() {
        let d = Diagnostic::new("tests/fib.py", Some(3), "unsupported Python construct: ClassDef");
        assert_eq!(d.to_string(), "tests/fib.py:3: unsupported Python construct: ClassDef");
    }

    #[test]
    fn formats_without_line_number() {
        let d = Diagnostic::new("tests/fib.py", None, "top-level parse failure");
        assert_eq!(d.to_string(), "tests/fib.py: top-level parse failure");
    }

    #[test]
    fn offset_to_line_counts_newlines() {
        let src = "a = 1\nb = 2\nc = 3\n";
        assert_eq!(offset_to_line(src, 0), 1);
        assert_eq!(offset_to_line(src, 7), 2);
        assert_eq!(offset_to_line(src, 14), 3);
    }
}
