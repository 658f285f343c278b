//! Resolve command implementation.

use anyhow::{Context, Result};
use banned_api_core::{Config, SymbolResolver};
use banned_api_syn::{Analyzer, Program};
use std::path::Path;

/// Runs the resolve command.
pub fn run(path: &Path, ids: &[String], config: Config) -> Result<()> {
    let analyzer = Analyzer::builder()
        .root(path)
        .config(config)
        .build()
        .context("Failed to build analyzer")?;

    let loaded = analyzer.load().context("Failed to index sources")?;
    tracing::info!(
        "Indexed {} symbols from {} files",
        loaded.program.len(),
        loaded.files
    );

    for id in ids {
        println!("{}", describe(&loaded.program, id));
    }

    Ok(())
}

/// Formats what one declaration id resolves to.
fn describe(program: &Program, id: &str) -> String {
    let symbols = program.resolve(id);
    if symbols.is_empty() {
        return format!("{id}\n  (no symbols; this entry bans nothing)");
    }

    let mut out = id.to_string();
    for symbol in symbols {
        out.push_str("\n  ");
        out.push_str(&program.symbol(symbol).doc_id());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use banned_api_syn::{DeclKind, ProgramBuilder};

    #[test]
    fn describes_matches_and_misses() {
        let mut builder = ProgramBuilder::new();
        let root = builder.declare("crate", DeclKind::Module, None);
        builder.declare("crate::Client", DeclKind::Type, Some(root));
        builder.external("std::fs::File");
        let program = builder.freeze();

        assert_eq!(describe(&program, "crate::Client"), "crate::Client\n  T:crate::Client");
        assert_eq!(describe(&program, "T:std::fs::File"), "T:std::fs::File\n  std::fs::File");
        assert!(describe(&program, "M:crate::Client").contains("bans nothing"));
    }
}
