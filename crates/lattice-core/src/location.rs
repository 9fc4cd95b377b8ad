//! Source provenance for schema elements.
//!
//! A [`Location`] records where an element came from: the root it was loaded
//! under, the root-relative path, and an optional line/column. Locations ride
//! along on every element and every error for diagnostics. They deliberately
//! implement no equality: two schema nodes are the same node because their
//! names agree, never because they were declared in the same place.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a schema element was declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    /// The source or proto root the file was loaded under.
    root: String,
    /// Path relative to `root`, using `/` separators (e.g. `a/b/c.proto`).
    path: String,
    /// 1-based line, when the parser provided one.
    line: Option<u32>,
    /// 1-based column, when the parser provided one.
    column: Option<u32>,
}

impl Location {
    /// A location naming a whole file.
    pub fn new(root: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            path: path.into(),
            line: None,
            column: None,
        }
    }

    /// Narrow this location to a line and column within the same file.
    pub fn at(&self, line: u32, column: u32) -> Self {
        Self {
            root: self.root.clone(),
            path: self.path.clone(),
            line: Some(line),
            column: Some(column),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<u32> {
        self.column
    }

    /// The directory portion of `path`, or `""` for a root-level file.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_file_only() {
        let location = Location::new("/proto", "a/b/c.proto");
        assert_eq!(location.to_string(), "a/b/c.proto");
    }

    #[test]
    fn test_display_with_position() {
        let location = Location::new("/proto", "a/b/c.proto").at(12, 4);
        assert_eq!(location.to_string(), "a/b/c.proto:12:4");
    }

    #[test]
    fn test_directory() {
        assert_eq!(Location::new("/r", "c/d/e.proto").directory(), "c/d");
        assert_eq!(Location::new("/r", "top.proto").directory(), "");
    }
}
