//! Usage discovery: the second pass over every file.
//!
//! Produces one usage per struct literal, path expression (which covers
//! calls and references to functions, consts and variants) and struct or
//! tuple-struct pattern. `use` items are not uses; method-call syntax is
//! skipped because its receiver type is unknown without type inference.
//! Macro arguments are visited when they parse as comma-separated
//! expressions.

use std::collections::HashSet;

use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::Visit;

use banned_api_core::Span;

use crate::doc_id::DeclKind;
use crate::program::{ProgramBuilder, SymbolId};
use crate::scope::Scopes;
use crate::source::SourceFile;

/// A use whose containing chain is filled in once the program is frozen.
#[derive(Debug, Clone)]
pub struct RawUsage {
    /// The symbol referenced.
    pub symbol: SymbolId,
    /// Where it is referenced.
    pub span: Span,
    /// Whether the use is a struct literal or struct pattern, which names a
    /// type even when the symbol is external.
    pub constructs: bool,
}

/// Collects the uses in one file, interning external symbols as needed.
pub fn collect(file: &SourceFile, program: &mut ProgramBuilder, scopes: &Scopes) -> Vec<RawUsage> {
    let mut collector = UsageCollector {
        file,
        program,
        scopes,
        module: file.module.clone(),
        self_ty: None,
        locals: Vec::new(),
        usages: Vec::new(),
    };
    collector.visit_file(&file.ast);
    collector.usages
}

/// Picks the symbol a resolved path refers to.
///
/// Local paths prefer values and functions over types and modules, since the
/// path sits in expression position. A local path naming nothing declared
/// (e.g., a derived or trait-provided associated function) falls back to its
/// longest declared prefix.
fn symbol_for(program: &mut ProgramBuilder, path: &str) -> Option<SymbolId> {
    if path != "crate" && !path.starts_with("crate::") {
        return Some(program.external(path));
    }

    let mut candidate = path;
    loop {
        let found = program.locals(candidate).into_iter().min_by_key(|id| {
            match program.symbol(*id).kind() {
                Some(DeclKind::Function) => 0,
                Some(DeclKind::Value) => 1,
                Some(DeclKind::Type) => 2,
                _ => 3,
            }
        });
        if found.is_some() {
            return found;
        }
        candidate = candidate.rsplit_once("::")?.0;
    }
}

struct UsageCollector<'a> {
    file: &'a SourceFile,
    program: &'a mut ProgramBuilder,
    scopes: &'a Scopes,
    module: String,
    self_ty: Option<String>,
    /// Local bindings by block, innermost last.
    locals: Vec<HashSet<String>>,
    usages: Vec<RawUsage>,
}

/// Names bound by a pattern. Capitalized identifiers are left out since in
/// pattern position they name unit structs, variants or constants.
#[derive(Default)]
struct Bindings(Vec<String>);

impl<'ast> Visit<'ast> for Bindings {
    fn visit_pat_ident(&mut self, node: &'ast syn::PatIdent) {
        let name = node.ident.to_string();
        if !name.starts_with(char::is_uppercase) {
            self.0.push(name);
        }
        syn::visit::visit_pat_ident(self, node);
    }
}

impl UsageCollector<'_> {
    fn record(&mut self, path: &syn::Path, constructs: bool) {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let Some(resolved) = self.scopes.resolve(
            &segments,
            path.leading_colon.is_some(),
            &self.module,
            self.self_ty.as_deref(),
            self.program,
        ) else {
            return;
        };

        if let Some(symbol) = symbol_for(self.program, &resolved) {
            self.usages.push(RawUsage {
                symbol,
                span: self.file.span(path.span()),
                constructs,
            });
        }
    }

    fn is_local(&self, path: &syn::Path) -> bool {
        if path.leading_colon.is_some() || path.segments.len() != 1 {
            return false;
        }
        let name = path.segments[0].ident.to_string();
        self.locals.iter().rev().any(|scope| scope.contains(&name))
    }

    fn bind(&mut self, pat: &syn::Pat) {
        let mut bindings = Bindings::default();
        bindings.visit_pat(pat);
        if let Some(scope) = self.locals.last_mut() {
            scope.extend(bindings.0);
        }
    }

    /// Runs `body` in a fresh block scope.
    fn scoped(&mut self, body: impl FnOnce(&mut Self)) {
        self.locals.push(HashSet::new());
        body(self);
        self.locals.pop();
    }

    /// Runs `body` as a function body, where enclosing locals are not
    /// visible.
    fn function<'a>(
        &mut self,
        inputs: impl IntoIterator<Item = &'a syn::FnArg>,
        body: impl FnOnce(&mut Self),
    ) {
        let outer = std::mem::take(&mut self.locals);
        self.locals.push(HashSet::new());
        for input in inputs {
            if let syn::FnArg::Typed(arg) = input {
                self.bind(&arg.pat);
            }
        }
        body(self);
        self.locals = outer;
    }

    fn resolve_type(&self, ty: &syn::Type) -> Option<String> {
        let syn::Type::Path(ty) = ty else {
            return None;
        };
        let segments: Vec<String> = ty.path.segments.iter().map(|s| s.ident.to_string()).collect();
        self.scopes.resolve(
            &segments,
            ty.path.leading_colon.is_some(),
            &self.module,
            self.self_ty.as_deref(),
            self.program,
        )
    }
}

impl<'ast> Visit<'ast> for UsageCollector<'_> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if node.content.is_none() {
            return;
        }
        let inner = format!("{}::{}", self.module, node.ident);
        let outer = std::mem::replace(&mut self.module, inner);
        syn::visit::visit_item_mod(self, node);
        self.module = outer;
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let self_ty = self.resolve_type(&node.self_ty);
        let outer = std::mem::replace(&mut self.self_ty, self_ty);
        syn::visit::visit_item_impl(self, node);
        self.self_ty = outer;
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        let self_ty = Some(format!("{}::{}", self.module, node.ident));
        let outer = std::mem::replace(&mut self.self_ty, self_ty);
        syn::visit::visit_item_trait(self, node);
        self.self_ty = outer;
    }

    fn visit_item_use(&mut self, _node: &'ast syn::ItemUse) {}

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.function(&node.sig.inputs, |this| syn::visit::visit_item_fn(this, node));
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.function(&node.sig.inputs, |this| {
            syn::visit::visit_impl_item_fn(this, node);
        });
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        self.function(&node.sig.inputs, |this| {
            syn::visit::visit_trait_item_fn(this, node);
        });
    }

    fn visit_expr_closure(&mut self, node: &'ast syn::ExprClosure) {
        self.scoped(|this| {
            for input in &node.inputs {
                this.visit_pat(input);
                this.bind(input);
            }
            this.visit_expr(&node.body);
        });
    }

    fn visit_block(&mut self, node: &'ast syn::Block) {
        self.scoped(|this| syn::visit::visit_block(this, node));
    }

    fn visit_local(&mut self, node: &'ast syn::Local) {
        // The initializer is evaluated before the new bindings exist.
        if let Some(init) = &node.init {
            self.visit_expr(&init.expr);
            if let Some((_, diverge)) = &init.diverge {
                self.visit_expr(diverge);
            }
        }
        self.visit_pat(&node.pat);
        self.bind(&node.pat);
    }

    fn visit_arm(&mut self, node: &'ast syn::Arm) {
        self.scoped(|this| {
            this.bind(&node.pat);
            syn::visit::visit_arm(this, node);
        });
    }

    fn visit_expr_let(&mut self, node: &'ast syn::ExprLet) {
        self.visit_expr(&node.expr);
        self.visit_pat(&node.pat);
        self.bind(&node.pat);
    }

    fn visit_expr_if(&mut self, node: &'ast syn::ExprIf) {
        self.scoped(|this| {
            this.visit_expr(&node.cond);
            this.visit_block(&node.then_branch);
        });
        if let Some((_, otherwise)) = &node.else_branch {
            self.visit_expr(otherwise);
        }
    }

    fn visit_expr_while(&mut self, node: &'ast syn::ExprWhile) {
        self.scoped(|this| syn::visit::visit_expr_while(this, node));
    }

    fn visit_expr_for_loop(&mut self, node: &'ast syn::ExprForLoop) {
        self.visit_expr(&node.expr);
        self.scoped(|this| {
            this.visit_pat(&node.pat);
            this.bind(&node.pat);
            this.visit_block(&node.body);
        });
    }

    fn visit_item_macro(&mut self, node: &'ast syn::ItemMacro) {
        // `macro_rules!` bodies are templates, not code.
        if node.ident.is_none() {
            syn::visit::visit_item_macro(self, node);
        }
    }

    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        let parser = Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated;
        if let Ok(args) = node.parse_body_with(parser) {
            for arg in &args {
                self.visit_expr(arg);
            }
        }
        syn::visit::visit_macro(self, node);
    }

    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        if node.qself.is_none() && !self.is_local(&node.path) {
            self.record(&node.path, false);
        }
        syn::visit::visit_expr_path(self, node);
    }

    fn visit_expr_struct(&mut self, node: &'ast syn::ExprStruct) {
        if node.qself.is_none() {
            self.record(&node.path, true);
        }
        syn::visit::visit_expr_struct(self, node);
    }

    fn visit_pat_struct(&mut self, node: &'ast syn::PatStruct) {
        if node.qself.is_none() {
            self.record(&node.path, true);
        }
        syn::visit::visit_pat_struct(self, node);
    }

    fn visit_pat_tuple_struct(&mut self, node: &'ast syn::PatTupleStruct) {
        if node.qself.is_none() {
            self.record(&node.path, false);
        }
        syn::visit::visit_pat_tuple_struct(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::index;
    use std::path::PathBuf;

    fn usages(code: &str) -> Vec<String> {
        let files = vec![SourceFile::parse(PathBuf::from("src/lib.rs"), code.to_string())
            .expect("valid Rust")];
        let mut program = ProgramBuilder::new();
        let mut scopes = Scopes::new();
        index(&files, &mut program, &mut scopes);
        collect(&files[0], &mut program, &scopes)
            .into_iter()
            .map(|u| program.symbol(u.symbol).path.clone())
            .collect()
    }

    #[test]
    fn finds_construction_calls_and_patterns() {
        let found = usages(
            r"
pub struct Client { pub url: String }
impl Client { pub fn new() -> Self { Self { url: String::new() } } }
pub enum Mode { Fast(u8) }

fn run(mode: Mode) {
    let c = Client::new();
    let d = Client { url: c.url };
    match mode { Mode::Fast(n) => drop(n) }
}
",
        );
        assert!(found.contains(&"crate::Client::new".to_string()));
        assert!(found.contains(&"std::string::String::new".to_string()));
        assert!(found.contains(&"crate::Mode::Fast".to_string()));
        assert_eq!(found.iter().filter(|p| *p == "crate::Client").count(), 2);
    }

    #[test]
    fn local_bindings_are_not_uses() {
        let found = usages("fn f(x: u8) -> u8 { let y = x; y }\n");
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn use_items_and_method_calls_are_skipped() {
        let found = usages("use std::fs::File;\nfn f(p: &std::path::Path) -> bool { p.exists() }\n");
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn imported_external_paths_are_canonical() {
        let found = usages("use std::fs::File;\nfn f() { let _ = File::open(\"x\"); }\n");
        assert_eq!(found, vec!["std::fs::File::open".to_string()]);
    }

    #[test]
    fn unknown_associated_functions_fall_back_to_the_type() {
        let found = usages(
            "#[derive(Default)]\npub struct Config;\nfn f() { let _ = Config::default(); }\n",
        );
        assert_eq!(found, vec!["crate::Config".to_string()]);
    }

    #[test]
    fn spans_point_at_the_path() {
        let code = "fn f() {\n    std::process::exit(1);\n}\n";
        let files = vec![
            SourceFile::parse(PathBuf::from("src/lib.rs"), code.to_string()).expect("valid Rust"),
        ];
        let mut program = ProgramBuilder::new();
        let scopes = Scopes::new();
        let found = collect(&files[0], &mut program, &scopes);
        assert_eq!(found.len(), 1);
        let span = &found[0].span;
        assert_eq!((span.line, span.column), (2, 5));
        assert_eq!(
            &code[span.offset..span.offset + span.length],
            "std::process::exit"
        );
    }

    #[test]
    fn bindings_shadow_module_items() {
        let found = usages(
            "pub fn connect() {}\npub fn g() -> u8 { let connect = 5u8; connect }\nfn h(connect: u8) -> u8 { connect }\n",
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn shadowing_ends_with_its_block() {
        let found = usages(
            "pub fn connect() {}\nfn g() { { let connect = 1; drop(connect); } connect(); }\nfn h() { let connect = connect(); drop(connect); }\n",
        );
        assert_eq!(found.iter().filter(|p| *p == "crate::connect").count(), 2, "{found:?}");
    }

    #[test]
    fn closure_and_match_bindings_shadow() {
        let found = usages(
            "pub fn f() {}\nfn g(x: Option<u8>) { let _ = |f: u8| f; match x { Some(f) => drop(f), None => f() } }\n",
        );
        assert_eq!(found.iter().filter(|p| *p == "crate::f").count(), 1, "{found:?}");
    }

    #[test]
    fn macro_arguments_are_visited() {
        let found = usages(
            "use std::fs::File;\nfn f() { let _ = vec![File::open(\"a\")]; assert!(File::open(\"b\").is_ok()); }\n",
        );
        assert_eq!(
            found,
            vec!["std::fs::File::open".to_string(), "std::fs::File::open".to_string()]
        );
    }

    #[test]
    fn macro_definitions_are_not_visited() {
        let found = usages("macro_rules! open { () => { std::fs::File::open(\"a\") }; }\n");
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn only_literals_and_struct_patterns_construct() {
        let files = vec![SourceFile::parse(
            PathBuf::from("src/lib.rs"),
            "fn f(r: std::ops::Range<u8>) { let _ = std::ops::Range { start: 0, end: 1 }; let _ = std::mem::drop(r); }\n".to_string(),
        )
        .expect("valid Rust")];
        let mut program = ProgramBuilder::new();
        let scopes = Scopes::new();
        let found = collect(&files[0], &mut program, &scopes);
        let constructs: Vec<_> = found
            .iter()
            .map(|u| (program.symbol(u.symbol).path.clone(), u.constructs))
            .collect();
        assert_eq!(
            constructs,
            vec![
                ("std::ops::Range".to_string(), true),
                ("std::mem::drop".to_string(), false),
            ]
        );
    }
}
