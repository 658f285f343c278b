//! Orchestrates a banned-API check over a Rust source tree.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use banned_api_core::{
    CancellationToken, Cancelled, Config, ConfigError, Diagnostic, PolicySource, Report,
    RuleEngine, RunContext, RunOutcome, UsageEvent,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::doc_id::DeclKind;
use crate::index;
use crate::program::{Program, ProgramBuilder, SymbolId};
use crate::scope::Scopes;
use crate::source::SourceFile;
use crate::usage::{self, RawUsage};

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error walking the source tree.
    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// Error parsing Rust source file.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The run was cancelled.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Builder for configuring an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    exclude_patterns: Vec<String>,
    policy_files: Vec<PathBuf>,
    parallelism: Option<usize>,
    config: Option<Config>,
    fail_on_parse_error: Option<bool>,
    cancel: Option<CancellationToken>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory to analyze.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds a policy file, replacing the configured ones.
    #[must_use]
    pub fn policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_files.push(path.into());
        self
    }

    /// Sets the number of threads checking uses.
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets whether to fail on parse errors (default: from config, else false).
    #[must_use]
    pub fn fail_on_parse_error(mut self, fail: bool) -> Self {
        self.fail_on_parse_error = Some(fail);
        self
    }

    /// Sets the token the host uses to cancel the run.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory is needed and unavailable.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();

        let root = self
            .root
            .unwrap_or_else(|| config.analyzer.root.clone());
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };

        let mut exclude_patterns = self.exclude_patterns;
        exclude_patterns.extend(config.analyzer.exclude.iter().cloned());

        let policy_files = if self.policy_files.is_empty() {
            config.policy.files.clone()
        } else {
            self.policy_files
        };

        let parallelism = self
            .parallelism
            .or(config.analyzer.parallelism)
            .or_else(|| std::thread::available_parallelism().ok().map(NonZeroUsize::get))
            .unwrap_or(1)
            .max(1);

        Ok(Analyzer {
            root,
            exclude_patterns,
            policy_files,
            parallelism,
            respect_gitignore: config.analyzer.respect_gitignore,
            fail_on_parse_error: self
                .fail_on_parse_error
                .unwrap_or(config.analyzer.fail_on_parse_error),
            engine: RuleEngine::from_config(&config),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// A Rust source tree indexed into a frozen program, with its uses.
pub struct LoadedProgram {
    /// The frozen symbol table.
    pub program: Program,
    /// Every use found, with containing chains.
    pub usages: Vec<UsageEvent<SymbolId>>,
    /// Number of files indexed.
    pub files: usize,
}

/// The main analyzer that orchestrates a check.
///
/// Use [`Analyzer::builder()`] to construct an instance.
pub struct Analyzer {
    root: PathBuf,
    exclude_patterns: Vec<String>,
    policy_files: Vec<PathBuf>,
    parallelism: usize,
    respect_gitignore: bool,
    fail_on_parse_error: bool,
    engine: RuleEngine,
    cancel: CancellationToken,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory being analyzed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the policy files, relative to the root unless absolute.
    #[must_use]
    pub fn policy_files(&self) -> &[PathBuf] {
        &self.policy_files
    }

    /// Runs a full check and returns the report.
    ///
    /// A policy with duplicate entries yields only `BA0002` diagnostics; an
    /// empty or missing policy yields an empty report without reading any
    /// source file.
    ///
    /// # Errors
    ///
    /// Returns an error if files cannot be read, parsing fails with
    /// `fail_on_parse_error`, or the run is cancelled.
    pub fn analyze(&self) -> Result<Report, AnalyzerError> {
        info!("Starting analysis at {:?}", self.root);

        let policies = self.read_policies()?;
        let has_entries = policies
            .iter()
            .any(|(path, text)| !PolicySource::new(path, text).parse().is_empty());
        if !has_entries {
            info!("No banned symbols configured; skipping analysis");
            return Ok(Report::new());
        }

        let loaded = self.load()?;

        let mut report = Report::new();
        report.files_checked = loaded.files;

        let sources = policies
            .iter()
            .map(|(path, text)| PolicySource::new(path, text));
        match self
            .engine
            .begin_run_many(sources, &loaded.program, &self.cancel)?
        {
            RunOutcome::Invalid(errors) => {
                report
                    .diagnostics
                    .extend(self.engine.policy_diagnostics(&errors));
            }
            RunOutcome::Ready(ctx) => {
                report.policy_entries = ctx.entry_count();
                if ctx.is_active() {
                    report.usages_checked = loaded.usages.len();
                    report.diagnostics = self.check_all(&ctx, &loaded);
                } else {
                    info!("No policy entry names a symbol; skipping usage checks");
                }
            }
        }

        report.sort();
        info!(
            "Analysis complete: {} diagnostics in {} files",
            report.diagnostics.len(),
            report.files_checked
        );
        Ok(report)
    }

    /// Parses, indexes and collects uses of every file under the root.
    ///
    /// # Errors
    ///
    /// Returns an error if files cannot be read, parsing fails with
    /// `fail_on_parse_error`, or the run is cancelled.
    pub fn load(&self) -> Result<LoadedProgram, AnalyzerError> {
        let files = self.parse_files()?;
        self.cancel.check()?;

        let mut builder = ProgramBuilder::new();
        let mut scopes = Scopes::new();
        index::index(&files, &mut builder, &mut scopes);

        let mut raw = Vec::new();
        for file in &files {
            self.cancel.check()?;
            raw.extend(usage::collect(file, &mut builder, &scopes));
        }

        let program = builder.freeze();
        let usages = raw
            .into_iter()
            .map(|u| event_for(&program, u))
            .collect::<Vec<_>>();
        debug!(
            "Indexed {} symbols and {} uses",
            program.len(),
            usages.len()
        );

        Ok(LoadedProgram {
            program,
            usages,
            files: files.len(),
        })
    }

    /// Checks every use, split across worker threads.
    fn check_all(&self, ctx: &RunContext<SymbolId>, loaded: &LoadedProgram) -> Vec<Diagnostic> {
        let chunk = loaded.usages.len().div_ceil(self.parallelism).max(1);
        debug!(
            "Checking {} uses on {} thread(s)",
            loaded.usages.len(),
            self.parallelism
        );

        std::thread::scope(|scope| {
            let workers: Vec<_> = loaded
                .usages
                .chunks(chunk)
                .map(|events| {
                    scope.spawn(move || {
                        events
                            .iter()
                            .filter_map(|event| ctx.check_usage(event, &loaded.program))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            workers
                .into_iter()
                .flat_map(|worker| match worker.join() {
                    Ok(found) => found,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Reads the policy files; a missing file contributes nothing.
    fn read_policies(&self) -> Result<Vec<(PathBuf, String)>, AnalyzerError> {
        let mut policies = Vec::new();
        for file in &self.policy_files {
            self.cancel.check()?;
            let path = self.root.join(file);
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("Loaded policy {}", path.display());
                    policies.push((file.clone(), text));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("No policy at {}", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(policies)
    }

    fn parse_files(&self) -> Result<Vec<SourceFile>, AnalyzerError> {
        let paths = self.discover_files()?;
        info!("Found {} files to analyze", paths.len());

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            self.cancel.check()?;
            let content = std::fs::read_to_string(&path)?;
            let relative = path
                .strip_prefix(&self.root)
                .map_or_else(|_| path.clone(), Path::to_path_buf);

            match SourceFile::parse(relative, content) {
                Ok(file) => files.push(file),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    if self.fail_on_parse_error {
                        return Err(AnalyzerError::Parse {
                            path,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(files)
    }

    /// Discovers all Rust source files to analyze.
    fn discover_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .require_git(false);

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("rs") || !path.is_file() {
                continue;
            }

            if self.should_exclude(path) {
                debug!("Excluding: {}", path.display());
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Checks if a path should be excluded.
    fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        self.exclude_patterns.iter().any(|pattern| {
            if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
                if glob_pattern.matches(&path_str) {
                    return true;
                }
            }

            // Also check as substring for patterns like "**/target/**"
            let normalized_pattern = pattern.replace("**", "");
            !normalized_pattern.is_empty() && path_str.contains(&normalized_pattern)
        })
    }
}

/// Builds the event for one use. Uses of a type (constructions, patterns and
/// associated items falling back to it) start their chain at the type;
/// everything else starts at its declaring type or module.
fn event_for(program: &Program, usage: RawUsage) -> UsageEvent<SymbolId> {
    let containing = program.containing(usage.symbol);
    let is_type = match program.symbol(usage.symbol).kind() {
        Some(kind) => kind == DeclKind::Type,
        None => usage.constructs,
    };
    if is_type {
        UsageEvent::construction(usage.symbol, containing, usage.span)
    } else {
        UsageEvent::new(usage.symbol, containing, usage.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let analyzer = Analyzer::builder()
            .root(".")
            .exclude("**/target/**")
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.root().exists());
        assert_eq!(
            analyzer.policy_files(),
            &[PathBuf::from("BannedSymbols.txt")]
        );
    }

    #[test]
    fn test_policy_file_overrides_config() {
        let analyzer = Analyzer::builder()
            .root(".")
            .policy_file("policy/Banned.txt")
            .build()
            .expect("Failed to build analyzer");
        assert_eq!(analyzer.policy_files(), &[PathBuf::from("policy/Banned.txt")]);
    }

    #[test]
    fn test_exclude_patterns() {
        let analyzer = Analyzer::builder()
            .root(".")
            .exclude("**/generated/**")
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.should_exclude(Path::new("/foo/target/debug/main.rs")));
        assert!(analyzer.should_exclude(Path::new("/foo/generated/lib.rs")));
        assert!(!analyzer.should_exclude(Path::new("/foo/src/lib.rs")));
    }

    #[test]
    fn test_empty_policy_reads_no_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.rs"), "fn (").unwrap();
        std::fs::write(dir.path().join("BannedSymbols.txt"), "\n  \n").unwrap();

        let report = Analyzer::builder()
            .root(dir.path())
            .fail_on_parse_error(true)
            .build()
            .expect("Failed to build analyzer")
            .analyze()
            .expect("no source is parsed");
        assert_eq!(report.files_checked, 0);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_member_uses_start_at_the_declaring_type() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("lib.rs"),
            "pub struct Pool;\nimpl Pool { pub fn get() {} }\nfn f() { Pool::get(); let _ = Pool; }\n",
        )
        .unwrap();
        let analyzer = Analyzer::builder()
            .root(dir.path())
            .build()
            .expect("Failed to build analyzer");
        let loaded = analyzer.load().expect("loads");

        let names = |event: &UsageEvent<SymbolId>| -> Vec<String> {
            event
                .containing
                .iter()
                .map(|id| loaded.program.symbol(*id).path.clone())
                .collect()
        };
        let chains: Vec<_> = loaded.usages.iter().map(names).collect();
        assert!(chains.contains(&vec!["crate::Pool".to_string(), "crate".to_string()]));
        assert_eq!(
            chains
                .iter()
                .filter(|c| c.first().map(String::as_str) == Some("crate::Pool"))
                .count(),
            2,
            "{chains:?}"
        );
    }
}
