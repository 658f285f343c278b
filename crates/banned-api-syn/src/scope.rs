//! Name resolution: turning a path written in some module into a canonical path.
//!
//! Resolution is syntactic. It knows about `crate`/`self`/`super`/`Self`,
//! `use` imports (including renames and globs of local modules), items
//! declared in the current module, and a small slice of the std prelude.
//! Anything else with more than one segment is taken to name an external
//! crate item.

use std::collections::HashMap;

use crate::program::ProgramBuilder;

/// Std prelude names resolvable without an import.
const PRELUDE: &[(&str, &str)] = &[
    ("Box", "std::boxed::Box"),
    ("Default", "std::default::Default"),
    ("Err", "std::result::Result::Err"),
    ("Iterator", "std::iter::Iterator"),
    ("None", "std::option::Option::None"),
    ("Ok", "std::result::Result::Ok"),
    ("Option", "std::option::Option"),
    ("Result", "std::result::Result"),
    ("Some", "std::option::Option::Some"),
    ("String", "std::string::String"),
    ("ToString", "std::string::ToString"),
    ("Vec", "std::vec::Vec"),
];

/// Imports visible in one module.
#[derive(Debug, Default, Clone)]
pub struct ModuleScope {
    /// Local name to the raw import path.
    imports: HashMap<String, Vec<String>>,
    /// Raw paths of `use path::*;` imports.
    globs: Vec<Vec<String>>,
}

/// Import tables for every module of the program.
#[derive(Debug, Default)]
pub struct Scopes {
    modules: HashMap<String, ModuleScope>,
}

impl Scopes {
    /// Creates an empty set of scopes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every import of a `use` item into `module`.
    pub fn record_use(&mut self, module: &str, tree: &syn::UseTree) {
        let scope = self.modules.entry(module.to_string()).or_default();
        for import in expand_use_tree(tree, &[]) {
            match import {
                Import::Named { alias, path } => {
                    if alias != "_" {
                        scope.imports.insert(alias, path);
                    }
                }
                Import::Glob(path) => scope.globs.push(path),
            }
        }
    }

    /// Resolves a path written inside `module` to its canonical form.
    ///
    /// `self_ty` is the canonical path `Self` refers to, if any. Returns
    /// `None` for single-segment names that match nothing (local bindings).
    #[must_use]
    pub fn resolve(
        &self,
        segments: &[String],
        leading_colon: bool,
        module: &str,
        self_ty: Option<&str>,
        program: &ProgramBuilder,
    ) -> Option<String> {
        let (first, rest) = segments.split_first()?;
        if leading_colon {
            return Some(segments.join("::"));
        }

        if let Some(base) = anchor(first, rest, module, self_ty) {
            return base;
        }

        let scope = self.modules.get(module);
        if let Some(target) = scope.and_then(|s| s.imports.get(first)) {
            let base = self.normalize_import(target, module, program)?;
            return Some(join(&base, rest));
        }

        let local = format!("{module}::{first}");
        if !program.locals(&local).is_empty() {
            return Some(join(&local, rest));
        }

        for glob in scope.map(|s| s.globs.as_slice()).unwrap_or_default() {
            let Some(base) = self.normalize_import(glob, module, program) else {
                continue;
            };
            let candidate = format!("{base}::{first}");
            if !program.locals(&candidate).is_empty() {
                return Some(join(&candidate, rest));
            }
        }

        if let Some((_, path)) = PRELUDE.iter().find(|(name, _)| *name == first.as_str()) {
            return Some(join(path, rest));
        }

        if rest.is_empty() {
            None
        } else {
            Some(segments.join("::"))
        }
    }

    /// Resolves the target of an import, which is written relative to the
    /// module containing the `use` or names an external crate.
    fn normalize_import(
        &self,
        target: &[String],
        module: &str,
        program: &ProgramBuilder,
    ) -> Option<String> {
        let (first, rest) = target.split_first()?;
        if let Some(base) = anchor(first, rest, module, None) {
            return base;
        }
        let local = format!("{module}::{first}");
        if !program.locals(&local).is_empty() {
            return Some(join(&local, rest));
        }
        Some(target.join("::"))
    }
}

/// Handles `crate`, `self`, `super` and `Self`. The outer `Option` says
/// whether the first segment was one of them.
#[allow(clippy::option_option)]
fn anchor(
    first: &str,
    rest: &[String],
    module: &str,
    self_ty: Option<&str>,
) -> Option<Option<String>> {
    match first {
        "crate" => Some(Some(join("crate", rest))),
        "self" => Some(Some(join(module, rest))),
        "Self" => Some(self_ty.map(|ty| join(ty, rest))),
        "super" => {
            let mut base = parent_module(module);
            let mut rest = rest;
            while let Some(("super", tail)) = rest.split_first().map(|(h, t)| (h.as_str(), t)) {
                base = base.and_then(parent_module);
                rest = tail;
            }
            Some(base.map(|b| join(b, rest)))
        }
        _ => None,
    }
}

fn join(base: &str, rest: &[String]) -> String {
    let mut out = base.to_string();
    for segment in rest {
        out.push_str("::");
        out.push_str(segment);
    }
    out
}

fn parent_module(module: &str) -> Option<&str> {
    module.rsplit_once("::").map(|(parent, _)| parent)
}

/// One name brought into scope by a `use` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Import {
    /// `use a::b;` or `use a::b as c;`
    Named {
        /// Name visible in the module.
        alias: String,
        /// Path as written.
        path: Vec<String>,
    },
    /// `use a::*;`
    Glob(Vec<String>),
}

/// Recursively expands a [`syn::UseTree`] into flat imports.
///
/// For example, `use std::{fs::File, io::{self, Read as R}};` expands to
/// `File → std::fs::File`, `io → std::io` and `R → std::io::Read`.
pub(crate) fn expand_use_tree(tree: &syn::UseTree, prefix: &[String]) -> Vec<Import> {
    let with = |ident: &syn::Ident| {
        let mut path = prefix.to_vec();
        path.push(ident.to_string());
        path
    };

    match tree {
        syn::UseTree::Path(p) => expand_use_tree(&p.tree, &with(&p.ident)),
        syn::UseTree::Name(n) if n.ident == "self" => match prefix.last() {
            Some(last) => vec![Import::Named {
                alias: last.clone(),
                path: prefix.to_vec(),
            }],
            None => vec![],
        },
        syn::UseTree::Name(n) => vec![Import::Named {
            alias: n.ident.to_string(),
            path: with(&n.ident),
        }],
        syn::UseTree::Rename(r) => {
            let path = if r.ident == "self" {
                prefix.to_vec()
            } else {
                with(&r.ident)
            };
            vec![Import::Named {
                alias: r.rename.to_string(),
                path,
            }]
        }
        syn::UseTree::Glob(_) => vec![Import::Glob(prefix.to_vec())],
        syn::UseTree::Group(g) => g
            .items
            .iter()
            .flat_map(|item| expand_use_tree(item, prefix))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc_id::DeclKind;

    fn segs(path: &str) -> Vec<String> {
        path.split("::").map(String::from).collect()
    }

    fn use_tree(code: &str) -> syn::UseTree {
        let item: syn::ItemUse = syn::parse_str(code).expect("valid use item");
        item.tree
    }

    fn program() -> ProgramBuilder {
        let mut b = ProgramBuilder::new();
        let root = b.declare("crate", DeclKind::Module, None);
        let legacy = b.declare("crate::legacy", DeclKind::Module, Some(root));
        b.declare("crate::legacy::Client", DeclKind::Type, Some(legacy));
        let app = b.declare("crate::app", DeclKind::Module, Some(root));
        b.declare("crate::app::run", DeclKind::Function, Some(app));
        b
    }

    #[test]
    fn expands_groups_renames_and_self() {
        let imports = expand_use_tree(
            &use_tree("use std::{fs::File, io::{self, Read as R}, collections::*};"),
            &[],
        );
        assert_eq!(
            imports,
            vec![
                Import::Named {
                    alias: "File".into(),
                    path: segs("std::fs::File")
                },
                Import::Named {
                    alias: "io".into(),
                    path: segs("std::io")
                },
                Import::Named {
                    alias: "R".into(),
                    path: segs("std::io::Read")
                },
                Import::Glob(segs("std::collections")),
            ]
        );
    }

    #[test]
    fn resolves_imports_relative_to_module() {
        let program = program();
        let mut scopes = Scopes::new();
        scopes.record_use("crate::app", &use_tree("use crate::legacy::Client;"));
        scopes.record_use("crate::app", &use_tree("use std::fs::File as Handle;"));

        let resolve = |p: &str| scopes.resolve(&segs(p), false, "crate::app", None, &program);
        assert_eq!(
            resolve("Client::new").as_deref(),
            Some("crate::legacy::Client::new")
        );
        assert_eq!(resolve("Handle::open").as_deref(), Some("std::fs::File::open"));
        assert_eq!(resolve("run").as_deref(), Some("crate::app::run"));
        assert_eq!(resolve("local_var"), None);
    }

    #[test]
    fn resolves_super_self_and_crate() {
        let program = program();
        let scopes = Scopes::new();
        let resolve = |p: &str, ty: Option<&str>| {
            scopes.resolve(&segs(p), false, "crate::app::inner", ty, &program)
        };
        assert_eq!(
            resolve("super::super::legacy::Client", None).as_deref(),
            Some("crate::legacy::Client")
        );
        assert_eq!(resolve("super::run", None).as_deref(), Some("crate::app::run"));
        assert_eq!(
            resolve("self::helper", None).as_deref(),
            Some("crate::app::inner::helper")
        );
        assert_eq!(
            resolve("Self::new", Some("crate::legacy::Client")).as_deref(),
            Some("crate::legacy::Client::new")
        );
        assert_eq!(resolve("Self::new", None), None);
    }

    #[test]
    fn glob_imports_of_local_modules() {
        let program = program();
        let mut scopes = Scopes::new();
        scopes.record_use("crate", &use_tree("use legacy::*;"));
        assert_eq!(
            scopes
                .resolve(&segs("Client"), false, "crate", None, &program)
                .as_deref(),
            Some("crate::legacy::Client")
        );
    }

    #[test]
    fn prelude_and_external_paths() {
        let program = program();
        let scopes = Scopes::new();
        let resolve = |p: &str| scopes.resolve(&segs(p), false, "crate", None, &program);
        assert_eq!(resolve("Vec::new").as_deref(), Some("std::vec::Vec::new"));
        assert_eq!(
            resolve("std::thread::sleep").as_deref(),
            Some("std::thread::sleep")
        );
        assert_eq!(
            scopes
                .resolve(&segs("std::process::exit"), true, "crate::app", None, &program)
                .as_deref(),
            Some("std::process::exit")
        );
    }
}
