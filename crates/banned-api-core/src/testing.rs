//! Test double for the host resolver.

use std::collections::HashMap;

use crate::resolver::SymbolResolver;

/// Resolves ids from a fixed table of `u32` keys.
#[derive(Debug, Default)]
pub(crate) struct MapResolver {
    ids: HashMap<String, Vec<u32>>,
    names: HashMap<u32, String>,
}

impl MapResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn symbol(mut self, id: &str, key: u32, name: &str) -> Self {
        self.ids.entry(id.to_string()).or_default().push(key);
        self.names.insert(key, name.to_string());
        self
    }
}

impl SymbolResolver for MapResolver {
    type Key = u32;

    fn resolve(&self, declaration_id: &str) -> Vec<u32> {
        self.ids.get(declaration_id).cloned().unwrap_or_default()
    }

    fn display_name(&self, key: &u32) -> String {
        self.names
            .get(key)
            .cloned()
            .unwrap_or_else(|| format!("#{key}"))
    }
}
