//! The frozen set of banned symbols for one run.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::debug;

use crate::cancel::{CancellationToken, Cancelled};
use crate::policy::PolicyEntry;
use crate::resolver::SymbolResolver;

/// Symbols banned for the duration of one run.
///
/// Built once from validated policy entries and never mutated afterwards, so
/// it can be shared across threads without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannedSymbolSet<K: Eq + Hash> {
    symbols: HashSet<K>,
}

impl<K: Eq + Hash + Clone> BannedSymbolSet<K> {
    /// Resolves every entry and unions the results.
    ///
    /// Entries resolving to nothing are accepted as inert. The token is
    /// checked before each entry is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the token is cancelled during construction.
    pub fn build<R>(
        entries: &[PolicyEntry],
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<Self, Cancelled>
    where
        R: SymbolResolver<Key = K> + ?Sized,
    {
        let mut symbols = HashSet::with_capacity(entries.len());

        for entry in entries {
            cancel.check()?;

            let resolved = resolver.resolve(entry.text());
            match resolved.len() {
                0 => debug!("{} resolves to no symbol", entry.text()),
                1 => {}
                n => debug!("{} resolves to {} symbols", entry.text(), n),
            }
            symbols.extend(resolved);
        }

        Ok(Self { symbols })
    }

    /// Returns true if the key is banned.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.symbols.contains(key)
    }

    /// Number of distinct banned symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if nothing is banned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates the banned symbols in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::parse;
    use crate::testing::MapResolver;
    use std::path::Path;

    fn resolver() -> MapResolver {
        MapResolver::new()
            .symbol("T:N.A", 1, "N.A")
            .symbol("T:N.B", 2, "N.B")
            .symbol("M:N.B.Run", 3, "N.B.Run")
            .symbol("M:N.B.Run", 4, "N.B.Run")
    }

    #[test]
    fn unions_resolved_symbols() {
        let entries = parse(Path::new("p.txt"), "T:N.A\nM:N.B.Run\n");
        let set = BannedSymbolSet::build(&entries, &resolver(), &CancellationToken::new())
            .expect("not cancelled");
        assert_eq!(set.len(), 3);
        assert!(set.contains(&1));
        assert!(set.contains(&3));
        assert!(set.contains(&4));
        assert!(!set.contains(&2));
    }

    #[test]
    fn unresolved_entries_are_inert() {
        let entries = parse(Path::new("p.txt"), "T:Missing\nT:N.A\n");
        let set = BannedSymbolSet::build(&entries, &resolver(), &CancellationToken::new())
            .expect("not cancelled");
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn entry_order_does_not_matter() {
        let forward = parse(Path::new("p.txt"), "T:N.A\nT:N.B\nM:N.B.Run\n");
        let mut reversed = forward.clone();
        reversed.reverse();
        let rotated: Vec<_> = forward[1..].iter().chain(&forward[..1]).cloned().collect();

        let token = CancellationToken::new();
        let a = BannedSymbolSet::build(&forward, &resolver(), &token).expect("not cancelled");
        let b = BannedSymbolSet::build(&reversed, &resolver(), &token).expect("not cancelled");
        let c = BannedSymbolSet::build(&rotated, &resolver(), &token).expect("not cancelled");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn cancelled_token_abandons_construction() {
        let entries = parse(Path::new("p.txt"), "T:N.A\n");
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            BannedSymbolSet::build(&entries, &resolver(), &token),
            Err(Cancelled)
        );
    }
}
