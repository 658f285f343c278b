//! Shared output formatting for check reports.

use anyhow::Result;
use banned_api_core::{Diagnostic, RenderedDiagnostic, Report};
use std::fmt::Write as _;
use std::path::Path;

use crate::OutputFormat;

/// Print a report in the specified format.
///
/// Span files are relative to `root`, which is where sources are read from
/// for the text format's excerpts.
pub fn print(report: &Report, root: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report, root),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => print!("{}", render_compact(report)),
    }
    Ok(())
}

fn print_text(report: &Report, root: &Path) {
    let (errors, warnings, _) = report.count_by_severity();

    for diagnostic in &report.diagnostics {
        match rendered(diagnostic, root) {
            Some(rich) => println!("{:?}", miette::Report::new(rich)),
            None => println!("{}", diagnostic.format()),
        }
    }

    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!("{}{}\x1b[0m", summary_color, report.summary());
}

/// Attaches the source text when the whole diagnostic fits in one file.
fn rendered(diagnostic: &Diagnostic, root: &Path) -> Option<RenderedDiagnostic> {
    if diagnostic
        .related
        .iter()
        .any(|r| r.file != diagnostic.span.file)
    {
        return None;
    }
    let source = std::fs::read_to_string(root.join(&diagnostic.span.file)).ok()?;
    if diagnostic.span.offset + diagnostic.span.length > source.len() {
        return None;
    }
    Some(RenderedDiagnostic::new(diagnostic, source))
}

fn print_json(report: &Report) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

/// One line per diagnostic, followed by the summary.
fn render_compact(report: &Report) -> String {
    let mut out = String::new();
    for diagnostic in &report.diagnostics {
        let _ = writeln!(out, "{diagnostic}");
    }
    let _ = writeln!(out, "{}", report.summary());
    out
}
