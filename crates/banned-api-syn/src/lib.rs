//! # banned-api-syn
//!
//! Enforces a banned-API policy over Rust source trees.
//!
//! Files are parsed with `syn` and indexed into a frozen [`Program`], which
//! resolves declaration ids such as `T:crate::legacy::Client` or
//! `M:std::process::exit`. Every path expression, struct literal and struct
//! pattern is then checked against the policy.
//!
//! ## Example
//!
//! ```ignore
//! use banned_api_syn::Analyzer;
//!
//! let report = Analyzer::builder()
//!     .root("./my-project")
//!     .build()?
//!     .analyze()?;
//!
//! for diagnostic in &report.diagnostics {
//!     println!("{diagnostic}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod index;
mod scope;
mod source;
mod usage;

/// Declaration id syntax.
pub mod doc_id;

/// The frozen symbol table.
pub mod program;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError, LoadedProgram};
pub use doc_id::{DeclKind, DocId};
pub use program::{Origin, Program, ProgramBuilder, Symbol, SymbolId};
pub use source::{module_path, SourceFile};
