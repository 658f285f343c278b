//! # banned-api-core
//!
//! Host-agnostic engine for enforcing a list of banned APIs.
//!
//! A run goes through four steps:
//!
//! - [`policy::parse`] turns the policy text into [`PolicyEntry`] values
//! - [`validate::validate`] rejects policies that list an id twice
//! - [`BannedSymbolSet::build`] resolves entries through a [`SymbolResolver`]
//! - [`RunContext::check_usage`] matches each [`UsageEvent`] against the set
//!
//! [`RuleEngine`] ties them together.
//!
//! ## Example
//!
//! ```ignore
//! use banned_api_core::{CancellationToken, PolicySource, RuleEngine, RunOutcome};
//!
//! let engine = RuleEngine::new();
//! let source = PolicySource::new(path, &text);
//! match engine.begin_run(source, &resolver, &CancellationToken::new())? {
//!     RunOutcome::Invalid(errors) => report(engine.policy_diagnostics(&errors)),
//!     RunOutcome::Ready(ctx) => {
//!         for event in &events {
//!             if let Some(d) = ctx.check_usage(event, &resolver) {
//!                 sink.report(d);
//!             }
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod banned_set;
mod cancel;
mod config;
mod engine;
mod resolver;
mod types;

/// Policy text parsing.
pub mod policy;

/// Matching uses against the banned set.
pub mod matcher;

/// Policy validation.
pub mod validate;

#[cfg(test)]
mod testing;

pub use banned_set::BannedSymbolSet;
pub use cancel::{CancellationToken, Cancelled};
pub use config::{AnalyzerConfig, Config, ConfigError, DiagnosticConfig, PolicyConfig};
pub use engine::{RuleEngine, RunContext, RunOutcome};
pub use matcher::{MatchScope, UsageEvent};
pub use policy::{PolicyEntry, PolicySource, DEFAULT_POLICY_FILE};
pub use resolver::SymbolResolver;
pub use types::{
    Diagnostic, DiagnosticId, DiagnosticSink, RenderedDiagnostic, Report, Severity, Span,
};
pub use validate::{PolicyError, PolicyErrorKind, Validation};
