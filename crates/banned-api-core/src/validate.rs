//! Duplicate detection over parsed policy entries.

use std::collections::HashMap;

use crate::policy::PolicyEntry;
use crate::types::{Diagnostic, DiagnosticId, Span};

/// What went wrong with a policy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyErrorKind {
    /// The entry text already appeared earlier in the policy.
    Duplicate,
}

/// A structured policy validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    /// Error kind.
    pub kind: PolicyErrorKind,
    /// The repeated entry's text.
    pub text: String,
    /// Location of the repeat being reported.
    pub primary: Span,
    /// Location of the first occurrence.
    pub related: Vec<Span>,
}

impl PolicyError {
    /// Converts this error into a `DuplicateBannedSymbol` diagnostic.
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self.kind {
            PolicyErrorKind::Duplicate => self.related.iter().cloned().fold(
                Diagnostic::new(
                    DiagnosticId::DuplicateBannedSymbol,
                    self.primary.clone(),
                    self.text.clone(),
                ),
                Diagnostic::with_related,
            ),
        }
    }
}

/// Outcome of validating a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// All errors, in file order of the offending entry.
    pub errors: Vec<PolicyError>,
}

impl Validation {
    /// Returns true when no errors were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reports every entry whose text already appeared earlier.
///
/// Each repeat yields one error pointing back at the first occurrence, so a
/// text listed three times yields two errors.
#[must_use]
pub fn validate(entries: &[PolicyEntry]) -> Validation {
    let mut first_seen: HashMap<&str, &PolicyEntry> = HashMap::with_capacity(entries.len());
    let mut errors = Vec::new();

    for entry in entries {
        if let Some(first) = first_seen.get(entry.text()) {
            errors.push(PolicyError {
                kind: PolicyErrorKind::Duplicate,
                text: entry.text().to_string(),
                primary: entry.span().clone(),
                related: vec![first.span().clone()],
            });
        } else {
            first_seen.insert(entry.text(), entry);
        }
    }

    Validation { errors }
}
