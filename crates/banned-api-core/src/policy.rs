//! Policy file parsing.
//!
//! A policy is plain text with one declaration id per line. Blank lines are
//! ignored; there is no comment or escaping syntax.

use std::path::{Path, PathBuf};

use crate::types::Span;

/// Well-known name of the policy file at the analysed root.
pub const DEFAULT_POLICY_FILE: &str = "BannedSymbols.txt";

/// One non-blank line of a policy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    text: String,
    span: Span,
}

impl PolicyEntry {
    /// Creates an entry from its declaration id and the span of its line.
    #[must_use]
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    /// The declaration id, with surrounding whitespace removed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The span of the whole source line.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Raw policy text together with the file it came from.
#[derive(Debug, Clone, Copy)]
pub struct PolicySource<'a> {
    /// File id used for every span produced from this text.
    pub file: &'a Path,
    /// The file contents.
    pub text: &'a str,
}

impl<'a> PolicySource<'a> {
    /// Creates a new policy source.
    #[must_use]
    pub fn new(file: &'a Path, text: &'a str) -> Self {
        Self { file, text }
    }

    /// Parses this source.
    #[must_use]
    pub fn parse(&self) -> Vec<PolicyEntry> {
        parse(self.file, self.text)
    }
}

/// Parses policy text into its non-blank entries, in file order.
///
/// Each entry's span covers the raw line (without its terminator), so leading
/// and trailing whitespace are part of the reported location while the entry
/// text is trimmed. A leading byte order mark is skipped; offsets still count
/// its bytes so they index into `raw`.
#[must_use]
pub fn parse(file: &Path, raw: &str) -> Vec<PolicyEntry> {
    let file: PathBuf = file.to_path_buf();
    let mut entries = Vec::new();
    let body = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut offset = raw.len() - body.len();

    for (index, line) in body.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += line.len();

        let content = line
            .strip_suffix('\n')
            .map_or(line, |l| l.strip_suffix('\r').unwrap_or(l));
        let text = content.trim();
        if text.is_empty() {
            continue;
        }

        let span = Span::new(file.clone(), index + 1, 1).with_bytes(start, content.len());
        entries.push(PolicyEntry::new(text, span));
    }

    entries
}
