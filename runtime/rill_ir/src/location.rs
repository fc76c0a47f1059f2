//! Source locations.
//!
//! A location is a file name plus a 1-based line number. It is attached to
//! variable declarations, to symbol-carrying AVMC nodes, and to backtrace
//! frames, so it has to be cheap to clone; the file name is a shared `Rc`.

use std::fmt;
use std::rc::Rc;

/// A point in script source: file name and 1-based line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Rc<str>,
    line: u32,
}

impl SourceLocation {
    /// Create a new location.
    #[inline]
    pub fn new(file: impl Into<Rc<str>>, line: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
        }
    }

    /// Location used for generated code with no source counterpart.
    pub fn builtin() -> Self {
        SourceLocation::new("<builtin>", 0)
    }

    /// The file name.
    #[inline]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The 1-based line number.
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn display_is_file_colon_line() {
        let sloc = SourceLocation::new("example.rill", 42);
        assert_eq!(sloc.to_string(), "example.rill:42");
        assert_eq!(sloc.file(), "example.rill");
        assert_eq!(sloc.line(), 42);
    }

    #[test]
    fn clones_share_the_file_name() {
        let a = SourceLocation::new("a.rill", 1);
        let b = a.clone();
        assert_eq!(a, b);
    }
}
