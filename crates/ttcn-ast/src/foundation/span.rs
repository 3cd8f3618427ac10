//! Source locations for diagnostics.
//!
//! Every AST node carries a [`Span`] so that the checker can attach a
//! location to each diagnostic it reports. The parser that produces the AST
//! is an external collaborator; spans therefore arrive fully formed and the
//! source text itself is optional. A [`SourceMap`] is only needed when
//! diagnostics are rendered with snippets.
//!
//! # Examples
//!
//! ```
//! # use ttcn_ast::foundation::span::*;
//! # use std::path::PathBuf;
//! let mut map = SourceMap::new();
//! let file = map.add_file(PathBuf::from("Types.ttcn"), "module Types {\n}\n".to_string());
//! let span = Span::new(file, 7, 12, 1);
//!
//! assert_eq!(map.snippet(&span), Some("Types"));
//! assert_eq!(map.line_col(&span), Some((1, 8)));
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Byte range inside one source file, with the cached start line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into [`SourceMap`] files
    pub file_id: u16,
    /// Byte offset of the first character
    pub start: u32,
    /// Byte offset one past the last character
    pub end: u32,
    /// 1-based line of `start`
    pub start_line: u16,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Zero-length span at the beginning of a file.
    ///
    /// Used for synthesized nodes (padding placeholders, implicit imports)
    /// that have no text of their own.
    pub fn synthetic(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    /// Whether the span covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length in bytes.
    ///
    /// # Panics
    /// Panics if `end < start`.
    pub fn len(&self) -> u32 {
        assert!(
            self.end >= self.start,
            "inverted span: end ({}) < start ({})",
            self.end,
            self.start
        );
        self.end - self.start
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// # Panics
    /// Panics if the spans belong to different files.
    pub fn to(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "spans from different files cannot be joined"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line: self.start_line.min(other.start_line),
        }
    }
}

/// All source files of one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// One source file with its line index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as given by the driver
    pub path: PathBuf,
    /// Full text
    pub source: String,
    /// Byte offset of every line start, followed by an end-of-file sentinel
    pub line_starts: Vec<u32>,
}

impl SourceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a file and return its id.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    /// File a span points into, if it is registered.
    pub fn file(&self, span: &Span) -> Option<&SourceFile> {
        self.files.get(span.file_id as usize)
    }

    /// Path of the file a span points into.
    pub fn file_path(&self, span: &Span) -> Option<&Path> {
        self.file(span).map(|f| f.path.as_path())
    }

    /// Text covered by a span.
    pub fn snippet(&self, span: &Span) -> Option<&str> {
        self.file(span)
            .and_then(|f| f.source.get(span.start as usize..span.end as usize))
    }

    /// 1-based (line, column) of a span start.
    ///
    /// Returns `None` when the file is unknown or the span lies past its end.
    pub fn line_col(&self, span: &Span) -> Option<(u32, u32)> {
        let file = self.file(span)?;
        if span.start as usize > file.source.len() {
            return None;
        }
        Some(file.line_col(span.start))
    }

    /// Number of registered files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    /// Create a file and index its lines.
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) for a byte offset.
    ///
    /// # Panics
    /// Panics if the offset is past the end of the file.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        assert!(
            offset as usize <= self.source.len(),
            "offset {} past end of {} ({} bytes)",
            offset,
            self.path.display(),
            self.source.len()
        );
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };
        (line_idx as u32 + 1, offset - self.line_starts[line_idx] + 1)
    }

    /// Text of a 1-based line without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line as usize - 1] as usize;
        let end = self.line_starts[line as usize] as usize;
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len().saturating_sub(1)
    }
}

fn line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    starts.extend(
        source
            .char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx as u32 + 1),
    );
    if starts.last() != Some(&(source.len() as u32)) {
        starts.push(source.len() as u32);
    }
    starts
}
