//! Check command implementation.

use anyhow::{Context, Result};
use banned_api_core::Config;
use banned_api_syn::Analyzer;
use std::path::{Path, PathBuf};

use crate::OutputFormat;

/// Runs the check command.
pub fn run(
    path: &Path,
    format: OutputFormat,
    policy: Vec<PathBuf>,
    exclude: Vec<String>,
    config: Config,
) -> Result<()> {
    let fail_on = config.fail_on();

    let mut builder = Analyzer::builder().root(path).config(config);

    for pattern in exclude {
        builder = builder.exclude(pattern);
    }

    for file in policy {
        builder = builder.policy_file(file);
    }

    let analyzer = builder.build().context("Failed to build analyzer")?;

    tracing::info!(
        "Checking {:?} against {}",
        analyzer.root(),
        analyzer
            .policy_files()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&report, analyzer.root(), format)?;

    // Exit with error code if anything reaches the failure threshold
    if report.has_diagnostics_at(fail_on) {
        std::process::exit(1);
    }

    Ok(())
}
