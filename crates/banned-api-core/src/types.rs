//! Core types for diagnostics and run reports.

use miette::{Diagnostic as MietteDiagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail a check.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A location in a source file.
///
/// `offset` and `length` are byte offsets into the file contents; `line` and
/// `column` are 1-indexed and only used for terminal output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// File the span belongs to.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in file.
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Span {
    /// Creates a span from a line and column, without byte information.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte offset and length for this span.
    #[must_use]
    pub fn with_bytes(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }

    /// Returns the file this span points into.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl From<&Span> for SourceSpan {
    fn from(span: &Span) -> Self {
        SourceSpan::from((span.offset, span.length))
    }
}

/// The two kinds of diagnostics the engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticId {
    /// A use of a banned symbol (or of a member of a banned container).
    SymbolIsBanned,
    /// A policy entry that repeats an earlier one.
    DuplicateBannedSymbol,
}

impl DiagnosticId {
    /// Returns the stable diagnostic code (e.g., "BA0001").
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::SymbolIsBanned => "BA0001",
            Self::DuplicateBannedSymbol => "BA0002",
        }
    }

    /// Returns the kebab-case name of this diagnostic.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SymbolIsBanned => "symbol-is-banned",
            Self::DuplicateBannedSymbol => "duplicate-banned-symbol",
        }
    }

    /// Looks a diagnostic up by code or name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        [Self::SymbolIsBanned, Self::DuplicateBannedSymbol]
            .into_iter()
            .find(|id| id.code() == key || id.name() == key)
    }

    /// Renders the user-facing message for the given argument.
    #[must_use]
    pub fn message(self, argument: &str) -> String {
        match self {
            Self::SymbolIsBanned => format!("The symbol '{argument}' is banned in this project"),
            Self::DuplicateBannedSymbol => format!(
                "The symbol '{argument}' is listed multiple times in the list of banned symbols"
            ),
        }
    }
}

impl std::fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A diagnostic produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Which diagnostic this is.
    pub id: DiagnosticId,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Primary location.
    pub span: Span,
    /// Additional locations (e.g., the first occurrence of a duplicate).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Span>,
    /// Human-readable message.
    pub message: String,
    /// The message parameter: a display name or a policy entry text.
    pub argument: String,
}

impl Diagnostic {
    /// Creates a new diagnostic with the id's default severity and message.
    #[must_use]
    pub fn new(id: DiagnosticId, span: Span, argument: impl Into<String>) -> Self {
        let argument = argument.into();
        Self {
            id,
            severity: Severity::Error,
            span,
            related: Vec::new(),
            message: id.message(&argument),
            argument,
        }
    }

    /// Adds a related location.
    #[must_use]
    pub fn with_related(mut self, span: Span) -> Self {
        self.related.push(span);
        self
    }

    /// Overrides the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Formats the diagnostic for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} {} at {}:{}:{}\n",
            self.id.code(),
            self.id.name(),
            self.span.file.display(),
            self.span.line,
            self.span.column,
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        for related in &self.related {
            let _ = writeln!(
                output,
                "  = note: first listed at {}:{}:{}",
                related.file.display(),
                related.line,
                related.column
            );
        }
        output
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.span.file.display(),
            self.span.line,
            self.span.column,
            self.severity,
            self.id.code(),
            self.message
        )
    }
}

/// A [`Diagnostic`] rendered through `miette` for rich terminal output.
#[derive(Debug, thiserror::Error, MietteDiagnostic)]
#[error("[{code}] {message}")]
pub struct RenderedDiagnostic {
    code: &'static str,
    message: String,
    #[source_code]
    source_code: String,
    #[label("{label}")]
    span: SourceSpan,
    label: String,
    #[label("first listed here")]
    related: Option<SourceSpan>,
}

impl RenderedDiagnostic {
    /// Attaches the primary file's contents to a diagnostic for rendering.
    ///
    /// The related label is only kept when it points into the same file.
    #[must_use]
    pub fn new(diagnostic: &Diagnostic, source_code: impl Into<String>) -> Self {
        let related = diagnostic
            .related
            .iter()
            .find(|r| r.file == diagnostic.span.file)
            .map(SourceSpan::from);
        Self {
            code: diagnostic.id.code(),
            message: diagnostic.message.clone(),
            source_code: source_code.into(),
            span: SourceSpan::from(&diagnostic.span),
            label: diagnostic.id.name().to_string(),
            related,
        }
    }
}

/// Anything that accepts diagnostics.
pub trait DiagnosticSink {
    /// Receives one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Result of one check run over a program.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Report {
    /// All diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of source files checked.
    pub files_checked: usize,
    /// Number of usage events checked.
    pub usages_checked: usize,
    /// Number of policy entries in effect.
    pub policy_entries: usize,
}

impl Report {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_diagnostics_at(Severity::Error)
    }

    /// Checks if any diagnostic meets or exceeds the given severity.
    #[must_use]
    pub fn has_diagnostics_at(&self, severity: Severity) -> bool {
        self.diagnostics.iter().any(|d| d.severity >= severity)
    }

    /// Returns diagnostics with the given id.
    #[must_use]
    pub fn by_id(&self, id: DiagnosticId) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.id == id).collect()
    }

    /// Counts diagnostics by severity as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |s: Severity| self.diagnostics.iter().filter(|d| d.severity == s).count();
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Sorts diagnostics by file, line and column.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.span
                .file
                .cmp(&b.span.file)
                .then(a.span.line.cmp(&b.span.line))
                .then(a.span.column.cmp(&b.span.column))
        });
    }

    /// Formats the one-line summary printed after the diagnostics.
    #[must_use]
    pub fn summary(&self) -> String {
        let (errors, warnings, infos) = self.count_by_severity();
        format!(
            "Found {} error(s), {} warning(s), {} info(s) in {} file(s) ({} usage(s), {} policy entr{})",
            errors,
            warnings,
            infos,
            self.files_checked,
            self.usages_checked,
            self.policy_entries,
            if self.policy_entries == 1 { "y" } else { "ies" }
        )
    }
}

impl DiagnosticSink for Report {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
