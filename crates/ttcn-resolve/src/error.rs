//! Semantic diagnostics.
//!
//! The checker never aborts on a user error. Every problem becomes a
//! [`CompileError`] pushed into the checker's sink, the offending node is
//! treated as erroneous, and checking continues so that one run reports as
//! many independent problems as possible.
//!
//! # Design
//!
//! - `CompileError` - single diagnostic with primary span and optional notes
//! - `ErrorKind` - categorizes diagnostics by the check that produced them
//! - `Severity` - error, warning, or note
//! - `DiagnosticFormatter` - renders diagnostics with source snippets
//!
//! Internal invariant violations are not diagnostics; they panic.
//!
//! # Examples
//!
//! ```
//! # use ttcn_resolve::error::*;
//! # use ttcn_ast::foundation::Span;
//! # let span = Span::new(0, 0, 5, 1);
//! let error = CompileError::new(
//!     ErrorKind::UndefinedName,
//!     span,
//!     "There is no local or imported definition with name `x'".to_string(),
//! );
//! assert_eq!(error.severity, Severity::Error);
//! ```

use serde::Serialize;
use std::fmt;
use ttcn_ast::foundation::{SourceMap, Span};

/// Semantic diagnostic with source location and message.
///
/// Related locations ("first defined here", "the mapping is here") are
/// attached as labels rather than as separate diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    /// Category of this diagnostic
    pub kind: ErrorKind,
    /// Severity level
    pub severity: Severity,
    /// Primary source location
    pub span: Span,
    /// Primary message
    pub message: String,
    /// Additional labeled spans
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    /// Additional notes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Category of a semantic diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the ERROR_KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ErrorKind {
    // Name resolution
    /// No visible definition with the name
    UndefinedName = 0,
    /// Two definitions with the same name in one scope
    DuplicateName = 1,
    /// Unqualified name found in more than one imported module
    AmbiguousName = 2,
    /// Definition hides a module identifier or an outer definition
    ShadowedName = 3,

    // Typing
    /// Value or template of an incompatible type
    TypeMismatch = 4,
    /// A type was expected but the reference names something else
    ExpectedType = 5,
    /// Reference names the wrong kind of definition
    InvalidReference = 6,
    /// Field or index access that the type does not support
    InvalidSubReference = 7,

    // Parameters
    /// Actual parameter list does not fit the formal list
    ParameterMismatch = 8,
    /// Template restriction violated
    TemplateRestriction = 9,

    // Structure
    /// Constant or template depends on itself
    CircularReference = 10,
    /// Import of an unknown module, self import, import cycle
    InvalidImport = 11,

    // Ports
    /// Inconsistent port type declaration
    InvalidPort = 12,
    /// Invalid type mapping of a translation port
    InvalidMapping = 13,
    /// `connect` or `map` between inconsistent port types
    InconsistentConnection = 14,
    /// Function prototype violation
    InvalidPrototype = 15,

    // Behaviour
    /// Statement not allowed in its context
    InvalidStatement = 16,

    // Generic
    /// Value outside the permitted range
    InvalidValue = 17,
}

/// Human-readable names for error kinds.
///
/// Index matches ErrorKind discriminant.
const ERROR_KIND_NAMES: &[&str] = &[
    "undefined name",          // 0: UndefinedName
    "duplicate name",          // 1: DuplicateName
    "ambiguous name",          // 2: AmbiguousName
    "shadowed name",           // 3: ShadowedName
    "type mismatch",           // 4: TypeMismatch
    "type expected",           // 5: ExpectedType
    "invalid reference",       // 6: InvalidReference
    "invalid sub-reference",   // 7: InvalidSubReference
    "parameter mismatch",      // 8: ParameterMismatch
    "template restriction",    // 9: TemplateRestriction
    "circular reference",      // 10: CircularReference
    "invalid import",          // 11: InvalidImport
    "invalid port type",       // 12: InvalidPort
    "invalid type mapping",    // 13: InvalidMapping
    "inconsistent connection", // 14: InconsistentConnection
    "invalid prototype",       // 15: InvalidPrototype
    "invalid statement",       // 16: InvalidStatement
    "invalid value",           // 17: InvalidValue
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Attached explanation of a preceding error
    Note,
    /// Suspicious but valid
    Warning,
    /// The program is invalid
    Error,
}

/// Secondary labeled span in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    /// Source location
    pub span: Span,
    /// Label text
    pub message: String,
}

impl CompileError {
    /// Creates a new error diagnostic.
    ///
    /// # Parameters
    ///
    /// * `kind` - Error category
    /// * `span` - Primary source location
    /// * `message` - Human-readable error message
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, span, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, span, message)
    }

    /// Creates a new note diagnostic.
    pub fn note(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Note, span, message)
    }

    fn with_severity(kind: ErrorKind, severity: Severity, span: Span, message: String) -> Self {
        Self {
            kind,
            severity,
            span,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a secondary labeled span.
    ///
    /// # Parameters
    ///
    /// * `span` - Related source location
    /// * `message` - Label text (e.g., "first defined here")
    pub fn with_label(mut self, span: Span, message: String) -> Self {
        self.labels.push(Label { span, message });
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl ErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.severity,
            self.kind.name(),
            self.message
        )
    }
}

impl std::error::Error for CompileError {}

/// Formats diagnostics with source code context.
///
/// Spans whose file is not registered in the [`SourceMap`] are printed as
/// `<file N>:offset` without a snippet; the checker works on trees that
/// were not necessarily parsed from text.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Formats a diagnostic as a string with source context.
    pub fn format(&self, error: &CompileError) -> String {
        let mut output = format!(
            "{}: {}: {}\n",
            error.severity,
            error.kind.name(),
            error.message
        );
        output.push_str(&format!("  --> {}\n", self.location(&error.span)));

        if let Some((line, col)) = self.sources.line_col(&error.span) {
            let text = self
                .sources
                .file(&error.span)
                .and_then(|file| file.line_text(line));
            if let Some(source_line) = text {
                output.push_str("   |\n");
                output.push_str(&format!("{:3} | {}\n", line, source_line));
                let start_col = col as usize;
                let span_len = error.span.end.saturating_sub(error.span.start) as usize;
                let end_col = (start_col + span_len).min(source_line.len() + 1);
                let underline = " ".repeat(start_col.saturating_sub(1))
                    + &"^".repeat(end_col.saturating_sub(start_col).max(1));
                output.push_str(&format!("   | {}\n", underline));
            }
        }

        for label in &error.labels {
            output.push_str(&format!("   = note: {}\n", label.message));
            output.push_str(&format!("     at {}\n", self.location(&label.span)));
        }

        for note in &error.notes {
            output.push_str(&format!("   = help: {}\n", note));
        }

        output
    }

    /// Formats multiple diagnostics separated by blank lines.
    pub fn format_all(&self, errors: &[CompileError]) -> String {
        errors
            .iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn location(&self, span: &Span) -> String {
        match (self.sources.file_path(span), self.sources.line_col(span)) {
            (Some(path), Some((line, col))) => format!("{}:{}:{}", path.display(), line, col),
            _ => format!("<file {}>:{}", span.file_id, span.start),
        }
    }
}
