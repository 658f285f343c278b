//! Declaration ids for Rust items.
//!
//! A declaration id is a kind prefix followed by a `::` path:
//!
//! | Prefix | Kind |
//! |--------|------|
//! | `N:` | module |
//! | `T:` | struct, enum, union, trait, type alias |
//! | `M:` | function, associated function, method |
//! | `F:` | field, variant, const, static |
//!
//! Without a prefix the id matches every kind. Generic arguments and a
//! trailing parameter list are ignored, so `M:crate::Pool<T>::get(usize)`
//! denotes the same symbol as `M:crate::Pool::get`.

use serde::Serialize;

/// The kind of a declared Rust item, as far as ids distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// `mod`, or a crate root.
    Module,
    /// `struct`, `enum`, `union`, `trait` or `type`.
    Type,
    /// `fn`, free or associated.
    Function,
    /// Field, enum variant, `const` or `static`.
    Value,
}

impl DeclKind {
    /// The id prefix letter for this kind.
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Self::Module => 'N',
            Self::Type => 'T',
            Self::Function => 'M',
            Self::Value => 'F',
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "N" => Some(Self::Module),
            "T" => Some(Self::Type),
            "M" => Some(Self::Function),
            "F" => Some(Self::Value),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeclKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Module => "module",
            Self::Type => "type",
            Self::Function => "function",
            Self::Value => "value",
        };
        f.write_str(name)
    }
}

/// A parsed declaration id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocId {
    /// Required kind, or `None` to match any.
    pub kind: Option<DeclKind>,
    /// Canonical `::` path without generics.
    pub path: String,
}

impl DocId {
    /// Parses a declaration id.
    ///
    /// Returns `None` when nothing path-like remains after normalisation;
    /// such ids simply resolve to no symbol.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        let (kind, rest) = match id.split_once(':') {
            Some((prefix, rest)) if !rest.starts_with(':') => match DeclKind::from_prefix(prefix) {
                Some(kind) => (Some(kind), rest),
                None => return None,
            },
            _ => (None, id),
        };

        let path = canonical_path(rest);
        if path.is_empty() {
            None
        } else {
            Some(Self { kind, path })
        }
    }

    /// Returns true if a symbol of `kind` satisfies this id.
    #[must_use]
    pub fn accepts(&self, kind: DeclKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
    }
}

/// Strips generic arguments, a parameter list, a leading `::` and whitespace.
fn canonical_path(raw: &str) -> String {
    let raw = raw.split('(').next().unwrap_or_default();
    let mut depth = 0usize;
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    let out = out.trim_start_matches("::").trim_end_matches("::");
    if out.split("::").any(str::is_empty) {
        return String::new();
    }
    out.to_string()
}

/// Formats the id of a symbol.
#[must_use]
pub fn format(kind: DeclKind, path: &str) -> String {
    format!("{}:{path}", kind.prefix())
}
