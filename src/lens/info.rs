//! Source locations attached to lenses

use std::fmt;
use std::sync::Arc;

/// Where a lens was defined: file name and the line/column span of its definition.
///
/// Lenses built programmatically can use [`Info::unknown`]; error messages then print
/// `(no location)` instead of a file position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub filename: Option<Arc<str>>,
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
}

impl Info {
    pub fn unknown() -> Self {
        Self::default()
    }

    /// A single-point location.
    pub fn new(filename: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            filename: Some(filename.into()),
            first_line: line,
            first_column: column,
            last_line: line,
            last_column: column,
        }
    }

    /// Extend this location so it ends where `other` ends.
    pub fn span_to(mut self, other: &Info) -> Self {
        self.last_line = other.last_line;
        self.last_column = other.last_column;
        self
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(filename) = &self.filename else {
            return write!(f, "(no location)");
        };
        write!(f, "{}:{}.{}", filename, self.first_line, self.first_column)?;
        if (self.last_line, self.last_column) != (self.first_line, self.first_column) {
            write!(f, "-{}.{}", self.last_line, self.last_column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Info::unknown().to_string(), "(no location)");
        let start = Info::new("hosts.lns", 3, 5);
        assert_eq!(start.to_string(), "hosts.lns:3.5");
        let span = start.span_to(&Info::new("hosts.lns", 4, 12));
        assert_eq!(span.to_string(), "hosts.lns:3.5-4.12");
    }
}
