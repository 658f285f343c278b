//! Matching symbol uses against the banned set.

use std::hash::Hash;

use crate::banned_set::BannedSymbolSet;
use crate::resolver::SymbolResolver;
use crate::types::{Diagnostic, DiagnosticId, Span};

/// Which identities of a use are tested against the banned set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchScope {
    /// The declaring type and its containers only. A ban on a member id
    /// never matches a use.
    #[default]
    Containers,
    /// The used symbol itself, then its containers, so member ids ban
    /// individual members.
    Members,
}

/// One place in program text where a symbol is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent<K> {
    /// The symbol referenced, in its original (unsubstituted) form.
    pub symbol: K,
    /// Types and containers whose bans cover this use, innermost first.
    ///
    /// Starts at the symbol's declaring type, or at the type itself when the
    /// use constructs it.
    pub containing: Vec<K>,
    /// Where the use occurs.
    pub span: Span,
}

impl<K> UsageEvent<K> {
    /// Creates a usage event for a member whose declaring type is the first
    /// element of `containing`.
    #[must_use]
    pub fn new(symbol: K, containing: Vec<K>, span: Span) -> Self {
        Self {
            symbol,
            containing,
            span,
        }
    }

    /// The identities tested under `scope`, innermost first.
    pub fn chain(&self, scope: MatchScope) -> impl Iterator<Item = &K> {
        let own = (scope == MatchScope::Members).then_some(&self.symbol);
        own.into_iter().chain(&self.containing)
    }
}

impl<K: Clone> UsageEvent<K> {
    /// Creates a usage event for a use of the type `ty` itself, such as a
    /// construction. The type heads its own chain.
    #[must_use]
    pub fn construction(ty: K, outer: impl IntoIterator<Item = K>, span: Span) -> Self {
        let containing = std::iter::once(ty.clone()).chain(outer).collect();
        Self::new(ty, containing, span)
    }
}

/// Returns the innermost banned identity along the event's chain, if any.
#[must_use]
pub fn first_banned<'e, K: Eq + Hash + Clone>(
    event: &'e UsageEvent<K>,
    banned: &BannedSymbolSet<K>,
    scope: MatchScope,
) -> Option<&'e K> {
    event.chain(scope).find(|key| banned.contains(key))
}

/// Checks one use, producing at most one `SymbolIsBanned` diagnostic.
///
/// The first banned key wins, so the reported name is the innermost banned
/// container rather than necessarily the symbol used directly.
#[must_use]
pub fn check<R: SymbolResolver + ?Sized>(
    event: &UsageEvent<R::Key>,
    banned: &BannedSymbolSet<R::Key>,
    resolver: &R,
) -> Option<Diagnostic> {
    check_scoped(event, banned, resolver, MatchScope::Containers)
}

/// Like [`check`], with an explicit [`MatchScope`].
#[must_use]
pub fn check_scoped<R: SymbolResolver + ?Sized>(
    event: &UsageEvent<R::Key>,
    banned: &BannedSymbolSet<R::Key>,
    resolver: &R,
    scope: MatchScope,
) -> Option<Diagnostic> {
    let matched = first_banned(event, banned, scope)?;
    Some(Diagnostic::new(
        DiagnosticId::SymbolIsBanned,
        event.span.clone(),
        resolver.display_name(matched),
    ))
}
