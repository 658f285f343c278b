//! Run orchestration: policy in, checkable context out.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::banned_set::BannedSymbolSet;
use crate::cancel::{CancellationToken, Cancelled};
use crate::config::Config;
use crate::matcher::{self, MatchScope, UsageEvent};
use crate::policy::{PolicyEntry, PolicySource};
use crate::resolver::SymbolResolver;
use crate::types::{Diagnostic, DiagnosticId, Severity};
use crate::validate::{validate, PolicyError};

/// Starts runs and applies configured severities to their diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    severities: HashMap<DiagnosticId, Severity>,
    scope: MatchScope,
}

impl RuleEngine {
    /// Creates an engine with default severities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine using the severity overrides from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let scope = if config.policy.match_members {
            MatchScope::Members
        } else {
            MatchScope::Containers
        };
        Self {
            severities: config.severity_overrides(),
            scope,
        }
    }

    /// Sets which identities of a use are matched.
    #[must_use]
    pub fn match_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Overrides the severity of one diagnostic.
    #[must_use]
    pub fn severity(mut self, id: DiagnosticId, severity: Severity) -> Self {
        self.severities.insert(id, severity);
        self
    }

    /// Severity applied to diagnostics with the given id.
    #[must_use]
    pub fn severity_of(&self, id: DiagnosticId) -> Severity {
        self.severities.get(&id).copied().unwrap_or(Severity::Error)
    }

    /// Parses and validates a single policy, then builds the banned set.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the token is cancelled before the set is built.
    pub fn begin_run<R: SymbolResolver + ?Sized>(
        &self,
        policy: PolicySource<'_>,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome<R::Key>, Cancelled> {
        self.begin_run_many(std::iter::once(policy), resolver, cancel)
    }

    /// Like [`begin_run`](Self::begin_run) for several policy files.
    ///
    /// Entries are validated together in source order, so an id repeated
    /// across two files is a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the token is cancelled before the set is built.
    pub fn begin_run_many<'a, I, R>(
        &self,
        policies: I,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome<R::Key>, Cancelled>
    where
        I: IntoIterator<Item = PolicySource<'a>>,
        R: SymbolResolver + ?Sized,
    {
        let mut entries: Vec<PolicyEntry> = Vec::new();
        for policy in policies {
            cancel.check()?;
            let parsed = policy.parse();
            debug!("{}: {} policy entries", policy.file.display(), parsed.len());
            entries.extend(parsed);
        }

        cancel.check()?;
        let validation = validate(&entries);
        if !validation.is_ok() {
            info!(
                "Policy has {} duplicate entr{}; skipping usage checks",
                validation.errors.len(),
                if validation.errors.len() == 1 { "y" } else { "ies" }
            );
            return Ok(RunOutcome::Invalid(validation.errors));
        }

        if entries.is_empty() {
            debug!("Empty policy; run is inert");
            return Ok(RunOutcome::Ready(RunContext::inert(
                self.severity_of(DiagnosticId::SymbolIsBanned),
                self.scope,
            )));
        }

        let banned = BannedSymbolSet::build(&entries, resolver, cancel)?;
        info!(
            "Banned set built: {} entries resolved to {} symbols",
            entries.len(),
            banned.len()
        );

        Ok(RunOutcome::Ready(RunContext {
            banned: Some(Arc::new(banned)),
            entries: entries.len(),
            severity: self.severity_of(DiagnosticId::SymbolIsBanned),
            scope: self.scope,
        }))
    }

    /// Converts policy errors to diagnostics with the configured severity.
    #[must_use]
    pub fn policy_diagnostics(&self, errors: &[PolicyError]) -> Vec<Diagnostic> {
        let severity = self.severity_of(DiagnosticId::DuplicateBannedSymbol);
        errors
            .iter()
            .map(|e| e.to_diagnostic().with_severity(severity))
            .collect()
    }
}

/// Result of starting a run.
#[derive(Debug)]
pub enum RunOutcome<K: Eq + std::hash::Hash> {
    /// The policy has errors; no usage may be checked in this run.
    Invalid(Vec<PolicyError>),
    /// The policy is valid and uses can be checked.
    Ready(RunContext<K>),
}

impl<K: Eq + std::hash::Hash> RunOutcome<K> {
    /// Returns the context of a valid run.
    #[must_use]
    pub fn context(self) -> Option<RunContext<K>> {
        match self {
            Self::Ready(ctx) => Some(ctx),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the errors of an invalid run.
    #[must_use]
    pub fn errors(&self) -> &[PolicyError] {
        match self {
            Self::Invalid(errors) => errors,
            Self::Ready(_) => &[],
        }
    }
}

/// A valid run, shared by every usage check of that run.
///
/// Cloning is cheap: the banned set sits behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RunContext<K: Eq + std::hash::Hash> {
    banned: Option<Arc<BannedSymbolSet<K>>>,
    entries: usize,
    severity: Severity,
    scope: MatchScope,
}

impl<K: Eq + std::hash::Hash + Clone> RunContext<K> {
    fn inert(severity: Severity, scope: MatchScope) -> Self {
        Self {
            banned: None,
            entries: 0,
            severity,
            scope,
        }
    }

    /// Returns false for an empty policy: there is nothing to check.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.banned.is_some()
    }

    /// Number of policy entries in effect.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// The banned set, absent for an inert run.
    #[must_use]
    pub fn banned(&self) -> Option<&BannedSymbolSet<K>> {
        self.banned.as_deref()
    }

    /// Checks one use of a symbol.
    #[must_use]
    pub fn check_usage<R>(&self, event: &UsageEvent<K>, resolver: &R) -> Option<Diagnostic>
    where
        R: SymbolResolver<Key = K> + ?Sized,
    {
        let banned = self.banned.as_deref()?;
        matcher::check_scoped(event, banned, resolver, self.scope)
            .map(|d| d.with_severity(self.severity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MapResolver;
    use crate::types::Span;
    use std::path::Path;

    fn resolver() -> MapResolver {
        MapResolver::new()
            .symbol("T:N.Banned", 1, "N.Banned")
            .symbol("T:N.Fine", 2, "N.Fine")
    }

    fn start(engine: &RuleEngine, text: &str) -> RunOutcome<u32> {
        engine
            .begin_run(
                PolicySource::new(Path::new("BannedSymbols.txt"), text),
                &resolver(),
                &CancellationToken::new(),
            )
            .expect("not cancelled")
    }

    #[test]
    fn valid_policy_yields_active_context() {
        let ctx = start(&RuleEngine::new(), "T:N.Banned\n")
            .context()
            .expect("policy is valid");
        assert!(ctx.is_active());
        assert_eq!(ctx.entry_count(), 1);

        let event = UsageEvent::construction(1, [], Span::new("a.rs", 3, 9));
        let diagnostic = ctx.check_usage(&event, &resolver()).expect("banned");
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.argument, "N.Banned");
    }

    #[test]
    fn duplicate_policy_is_invalid() {
        let outcome = start(&RuleEngine::new(), "T:N.Banned\nT:N.Banned\n");
        assert_eq!(outcome.errors().len(), 1);
        assert!(outcome.context().is_none());
    }

    #[test]
    fn empty_policy_is_inert() {
        let ctx = start(&RuleEngine::new(), "\n  \n")
            .context()
            .expect("empty policy is valid");
        assert!(!ctx.is_active());
        assert!(ctx.banned().is_none());
        let event = UsageEvent::construction(1, [], Span::new("a.rs", 1, 1));
        assert!(ctx.check_usage(&event, &resolver()).is_none());
    }

    #[test]
    fn duplicates_across_files_are_detected() {
        let outcome = RuleEngine::new()
            .begin_run_many(
                [
                    PolicySource::new(Path::new("a.txt"), "T:N.Banned\n"),
                    PolicySource::new(Path::new("b.txt"), "T:N.Fine\nT:N.Banned\n"),
                ],
                &resolver(),
                &CancellationToken::new(),
            )
            .expect("not cancelled");
        let errors = outcome.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].primary.file, Path::new("b.txt"));
        assert_eq!(errors[0].related[0].file, Path::new("a.txt"));
    }

    #[test]
    fn severity_overrides_apply() {
        let engine = RuleEngine::new()
            .severity(DiagnosticId::SymbolIsBanned, Severity::Warning)
            .severity(DiagnosticId::DuplicateBannedSymbol, Severity::Info);

        let ctx = start(&engine, "T:N.Banned\n").context().expect("valid");
        let event = UsageEvent::construction(1, [], Span::new("a.rs", 1, 1));
        let diagnostic = ctx.check_usage(&event, &resolver()).expect("banned");
        assert_eq!(diagnostic.severity, Severity::Warning);

        let outcome = start(&engine, "T:N.Fine\nT:N.Fine\n");
        let diagnostics = engine.policy_diagnostics(outcome.errors());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Info);
    }

    #[test]
    fn cancelled_run_emits_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let result = RuleEngine::new().begin_run(
            PolicySource::new(Path::new("BannedSymbols.txt"), "T:N.Banned\n"),
            &resolver(),
            &token,
        );
        assert!(matches!(result, Err(Cancelled)));
    }

    #[test]
    fn context_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RunContext<u32>>();

        let ctx = start(&RuleEngine::new(), "T:N.Banned\n")
            .context()
            .expect("valid");
        let resolver = resolver();
        let hits: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let ctx = &ctx;
                    let resolver = &resolver;
                    scope.spawn(move || {
                        let event = UsageEvent::construction(1 + (i % 2), [], Span::new("a.rs", 1, 1));
                        usize::from(ctx.check_usage(&event, resolver).is_some())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("worker panicked"))
                .sum()
        });
        assert_eq!(hits, 2);
    }

    #[test]
    fn member_scope_comes_from_config() {
        let resolver = resolver().symbol("M:N.Fine.Run", 3, "N.Fine.Run");
        let policy = PolicySource::new(Path::new("BannedSymbols.txt"), "M:N.Fine.Run\n");
        let event = UsageEvent::new(3, vec![2], Span::new("a.rs", 1, 1));

        let mut config = Config::default();
        let ctx = RuleEngine::from_config(&config)
            .begin_run(policy, &resolver, &CancellationToken::new())
            .expect("not cancelled")
            .context()
            .expect("valid");
        assert!(ctx.check_usage(&event, &resolver).is_none());

        config.policy.match_members = true;
        let ctx = RuleEngine::from_config(&config)
            .begin_run(policy, &resolver, &CancellationToken::new())
            .expect("not cancelled")
            .context()
            .expect("valid");
        let diagnostic = ctx.check_usage(&event, &resolver).expect("member is banned");
        assert_eq!(diagnostic.argument, "N.Fine.Run");
    }
}
