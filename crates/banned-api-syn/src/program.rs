//! Frozen symbol table of an analysed Rust source tree.

use std::collections::HashMap;

use banned_api_core::SymbolResolver;
use serde::Serialize;

use crate::doc_id::{self, DeclKind, DocId};

/// Identity of one symbol within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(u32);

impl SymbolId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a symbol was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Declared in the analysed sources.
    Local(DeclKind),
    /// Referenced from the analysed sources but declared elsewhere; the kind
    /// is unknown.
    External,
}

/// One declared (or referenced external) entity.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    /// Canonical `::` path, e.g. `crate::legacy::Client::new`.
    pub path: String,
    /// Local kind or external.
    pub origin: Origin,
    /// Enclosing module or type.
    pub parent: Option<SymbolId>,
}

impl Symbol {
    /// The kind of a local symbol.
    #[must_use]
    pub fn kind(&self) -> Option<DeclKind> {
        match self.origin {
            Origin::Local(kind) => Some(kind),
            Origin::External => None,
        }
    }

    /// The declaration id of a local symbol, or the bare path of an external one.
    #[must_use]
    pub fn doc_id(&self) -> String {
        self.kind()
            .map_or_else(|| self.path.clone(), |kind| doc_id::format(kind, &self.path))
    }
}

/// Mutable symbol table used while indexing.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    symbols: Vec<Symbol>,
    by_path: HashMap<String, Vec<SymbolId>>,
}

impl ProgramBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a local symbol, returning the existing one if the same path
    /// and kind were declared before (e.g., a module split over files).
    pub fn declare(&mut self, path: &str, kind: DeclKind, parent: Option<SymbolId>) -> SymbolId {
        if let Some(existing) = self.find(path, |s| s.origin == Origin::Local(kind)) {
            return existing;
        }
        self.push(Symbol {
            path: path.to_string(),
            origin: Origin::Local(kind),
            parent,
        })
    }

    /// Interns an external path together with each of its prefixes.
    pub fn external(&mut self, path: &str) -> SymbolId {
        if let Some(existing) = self.find(path, |s| s.origin == Origin::External) {
            return existing;
        }
        let parent = path
            .rsplit_once("::")
            .map(|(parent, _)| self.external(parent));
        self.push(Symbol {
            path: path.to_string(),
            origin: Origin::External,
            parent,
        })
    }

    /// Returns local symbols declared at `path`.
    #[must_use]
    pub fn locals(&self, path: &str) -> Vec<SymbolId> {
        self.by_path
            .get(path)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.symbols[id.index()].kind().is_some())
            .collect()
    }

    /// Returns the symbol data for an id.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Freezes the table.
    #[must_use]
    pub fn freeze(self) -> Program {
        Program {
            symbols: self.symbols,
            by_path: self.by_path,
        }
    }

    fn find(&self, path: &str, pred: impl Fn(&Symbol) -> bool) -> Option<SymbolId> {
        self.by_path
            .get(path)?
            .iter()
            .copied()
            .find(|id| pred(&self.symbols[id.index()]))
    }

    fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
        self.by_path.entry(symbol.path.clone()).or_default().push(id);
        self.symbols.push(symbol);
        id
    }
}

/// Read-only symbol table, shared by every usage check of a run.
#[derive(Debug, Default)]
pub struct Program {
    symbols: Vec<Symbol>,
    by_path: HashMap<String, Vec<SymbolId>>,
}

impl Program {
    /// Returns the symbol data for an id.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Number of symbols, local and external.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if no symbol was declared or referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Enclosing symbols of `id`, innermost first.
    #[must_use]
    pub fn containing(&self, id: SymbolId) -> Vec<SymbolId> {
        // A parent always exists before its children, so ids strictly
        // decrease along the chain.
        let mut chain = Vec::new();
        let mut current = self.symbol(id).parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.symbol(parent).parent;
        }
        chain
    }

    /// Iterates all symbols with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(u32::try_from(i).unwrap_or(u32::MAX)), s))
    }
}

impl SymbolResolver for Program {
    type Key = SymbolId;

    fn resolve(&self, declaration_id: &str) -> Vec<SymbolId> {
        let Some(id) = DocId::parse(declaration_id) else {
            return Vec::new();
        };
        self.by_path
            .get(&id.path)
            .into_iter()
            .flatten()
            .copied()
            .filter(|sym| self.symbol(*sym).kind().map_or(true, |k| id.accepts(k)))
            .collect()
    }

    fn display_name(&self, key: &SymbolId) -> String {
        self.symbol(*key).path.clone()
    }
}
