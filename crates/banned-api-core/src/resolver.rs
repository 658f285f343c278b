//! The host type-system capability consumed by the engine.

use std::hash::Hash;

/// Resolves declaration ids to host symbols.
///
/// Implementations must be deterministic for a given program snapshot. The
/// engine never inspects keys beyond hashing and comparing them.
///
/// # Example
///
/// ```ignore
/// use banned_api_core::SymbolResolver;
///
/// struct Table(std::collections::HashMap<String, u32>);
///
/// impl SymbolResolver for Table {
///     type Key = u32;
///
///     fn resolve(&self, declaration_id: &str) -> Vec<u32> {
///         self.0.get(declaration_id).copied().into_iter().collect()
///     }
///
///     fn display_name(&self, key: &u32) -> String {
///         format!("#{key}")
///     }
/// }
/// ```
pub trait SymbolResolver: Sync {
    /// Stable identity of one declared entity, in its original (unsubstituted) form.
    type Key: Eq + Hash + Clone + Send + Sync;

    /// Returns every symbol the declaration id denotes: zero, one or many.
    fn resolve(&self, declaration_id: &str) -> Vec<Self::Key>;

    /// Returns the human-readable name used in diagnostics.
    fn display_name(&self, key: &Self::Key) -> String;
}

impl<R: SymbolResolver + ?Sized> SymbolResolver for &R {
    type Key = R::Key;

    fn resolve(&self, declaration_id: &str) -> Vec<Self::Key> {
        (**self).resolve(declaration_id)
    }

    fn display_name(&self, key: &Self::Key) -> String {
        (**self).display_name(key)
    }
}
