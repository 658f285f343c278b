//! Declaration indexing: the first pass over every file.
//!
//! Items are declared under their module as they are met. `impl` blocks are
//! collected and attached to their self type once every file has been seen,
//! because the type may be declared in a later file.

use syn::visit::Visit;
use tracing::debug;

use crate::doc_id::DeclKind;
use crate::program::{ProgramBuilder, SymbolId};
use crate::scope::Scopes;
use crate::source::SourceFile;

/// An `impl` block whose members wait for their self type to be resolved.
struct PendingImpl {
    module: String,
    self_ty: Vec<String>,
    leading_colon: bool,
    members: Vec<(String, DeclKind)>,
}

/// Declares every item of `files` and records their imports.
pub fn index(files: &[SourceFile], program: &mut ProgramBuilder, scopes: &mut Scopes) {
    let mut pending = Vec::new();

    for file in files {
        let module = declare_module_path(program, &file.module);
        let mut indexer = Indexer {
            program: &mut *program,
            scopes: &mut *scopes,
            module: file.module.clone(),
            module_id: module,
            pending: &mut pending,
        };
        indexer.visit_file(&file.ast);
    }

    for imp in pending {
        attach_impl(program, scopes, imp);
    }
}

/// Declares a module and all its ancestors, returning the innermost.
fn declare_module_path(program: &mut ProgramBuilder, module: &str) -> SymbolId {
    let mut parent = None;
    let mut path = String::new();
    for segment in module.split("::") {
        if !path.is_empty() {
            path.push_str("::");
        }
        path.push_str(segment);
        parent = Some(program.declare(&path, DeclKind::Module, parent));
    }
    // `module` always starts with `crate`, so the loop ran at least once.
    parent.unwrap_or_else(|| program.declare("crate", DeclKind::Module, None))
}

fn attach_impl(program: &mut ProgramBuilder, scopes: &Scopes, imp: PendingImpl) {
    let Some(path) = scopes.resolve(&imp.self_ty, imp.leading_colon, &imp.module, None, program)
    else {
        return;
    };

    let ty = program
        .locals(&path)
        .into_iter()
        .find(|id| program.symbol(*id).kind() == Some(DeclKind::Type));
    let Some(ty) = ty else {
        debug!("impl for non-local type {path}; members not indexed");
        return;
    };

    for (name, kind) in imp.members {
        program.declare(&format!("{path}::{name}"), kind, Some(ty));
    }
}

struct Indexer<'a> {
    program: &'a mut ProgramBuilder,
    scopes: &'a mut Scopes,
    module: String,
    module_id: SymbolId,
    pending: &'a mut Vec<PendingImpl>,
}

impl Indexer<'_> {
    fn item(&mut self, ident: &syn::Ident, kind: DeclKind) -> SymbolId {
        let path = format!("{}::{ident}", self.module);
        self.program.declare(&path, kind, Some(self.module_id))
    }

    fn member(&mut self, parent: SymbolId, name: &str, kind: DeclKind) {
        let path = format!("{}::{name}", self.program.symbol(parent).path);
        self.program.declare(&path, kind, Some(parent));
    }

    fn fields(&mut self, parent: SymbolId, fields: &syn::Fields) {
        for (i, field) in fields.iter().enumerate() {
            let name = field
                .ident
                .as_ref()
                .map_or_else(|| i.to_string(), ToString::to_string);
            self.member(parent, &name, DeclKind::Value);
        }
    }
}

impl<'ast> Visit<'ast> for Indexer<'_> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        let id = self.item(&node.ident, DeclKind::Module);
        if node.content.is_some() {
            let inner = format!("{}::{}", self.module, node.ident);
            let outer = std::mem::replace(&mut self.module, inner);
            let outer_id = std::mem::replace(&mut self.module_id, id);
            syn::visit::visit_item_mod(self, node);
            self.module = outer;
            self.module_id = outer_id;
        }
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        let id = self.item(&node.ident, DeclKind::Type);
        self.fields(id, &node.fields);
        syn::visit::visit_item_struct(self, node);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        let id = self.item(&node.ident, DeclKind::Type);
        for variant in &node.variants {
            self.member(id, &variant.ident.to_string(), DeclKind::Value);
        }
        syn::visit::visit_item_enum(self, node);
    }

    fn visit_item_union(&mut self, node: &'ast syn::ItemUnion) {
        let id = self.item(&node.ident, DeclKind::Type);
        for field in &node.fields.named {
            if let Some(ident) = &field.ident {
                self.member(id, &ident.to_string(), DeclKind::Value);
            }
        }
        syn::visit::visit_item_union(self, node);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        let id = self.item(&node.ident, DeclKind::Type);
        for item in &node.items {
            match item {
                syn::TraitItem::Fn(f) => {
                    self.member(id, &f.sig.ident.to_string(), DeclKind::Function);
                }
                syn::TraitItem::Const(c) => {
                    self.member(id, &c.ident.to_string(), DeclKind::Value);
                }
                syn::TraitItem::Type(t) => {
                    self.member(id, &t.ident.to_string(), DeclKind::Type);
                }
                _ => {}
            }
        }
        syn::visit::visit_item_trait(self, node);
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        self.item(&node.ident, DeclKind::Type);
        syn::visit::visit_item_type(self, node);
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.item(&node.sig.ident, DeclKind::Function);
        syn::visit::visit_item_fn(self, node);
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        self.item(&node.ident, DeclKind::Value);
        syn::visit::visit_item_const(self, node);
    }

    fn visit_item_static(&mut self, node: &'ast syn::ItemStatic) {
        self.item(&node.ident, DeclKind::Value);
        syn::visit::visit_item_static(self, node);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        if let syn::Type::Path(ty) = &*node.self_ty {
            if ty.qself.is_none() {
                let members = node
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        syn::ImplItem::Fn(f) => Some((f.sig.ident.to_string(), DeclKind::Function)),
                        syn::ImplItem::Const(c) => Some((c.ident.to_string(), DeclKind::Value)),
                        syn::ImplItem::Type(t) => Some((t.ident.to_string(), DeclKind::Type)),
                        _ => None,
                    })
                    .collect();
                self.pending.push(PendingImpl {
                    module: self.module.clone(),
                    self_ty: ty.path.segments.iter().map(|s| s.ident.to_string()).collect(),
                    leading_colon: ty.path.leading_colon.is_some(),
                    members,
                });
            }
        }
        syn::visit::visit_item_impl(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.scopes.record_use(&self.module, &node.tree);
    }
}
