//! Configuration types for banned-api.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::policy::DEFAULT_POLICY_FILE;
use crate::types::{DiagnosticId, Severity};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Severity at or above which `check` fails (default: error).
    #[serde(default)]
    pub fail_on: Option<Severity>,

    /// Analyzer configuration.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Where the banned symbol lists live.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Per-diagnostic settings, keyed by code ("BA0001") or name.
    #[serde(default)]
    pub diagnostics: HashMap<String, DiagnosticConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_files(&[path])
    }

    /// Loads and layers several TOML files, later files overriding earlier
    /// ones key by key.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or parsed.
    pub fn from_files(paths: &[&Path]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for path in paths {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            merge(&mut merged, parse_table(&content)?);
        }
        Self::from_table(merged)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, names an unknown diagnostic,
    /// or configures one diagnostic under both its code and its name.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::from_table(parse_table(content)?)
    }

    fn from_table(table: toml::Table) -> Result<Self, ConfigError> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                message: e.to_string(),
            })
    }

    /// Severity overrides by diagnostic id.
    #[must_use]
    pub fn severity_overrides(&self) -> HashMap<DiagnosticId, Severity> {
        self.diagnostics
            .iter()
            .filter_map(|(key, c)| Some((DiagnosticId::from_key(key)?, c.severity?)))
            .collect()
    }

    /// Severity threshold for a failing check.
    #[must_use]
    pub fn fail_on(&self) -> Severity {
        self.fail_on.unwrap_or(Severity::Error)
    }
}

/// Parses one TOML document, keying `[diagnostics.*]` tables by code.
fn parse_table(content: &str) -> Result<toml::Table, ConfigError> {
    let mut table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })?;

    let Some(toml::Value::Table(diagnostics)) = table.get_mut("diagnostics") else {
        return Ok(table);
    };
    let mut by_code = toml::Table::new();
    for (key, value) in std::mem::take(diagnostics) {
        let id = DiagnosticId::from_key(&key)
            .ok_or_else(|| ConfigError::UnknownDiagnostic { key: key.clone() })?;
        if by_code.insert(id.code().to_string(), value).is_some() {
            return Err(ConfigError::DuplicateDiagnostic {
                code: id.code().to_string(),
            });
        }
    }
    *diagnostics = by_code;
    Ok(table)
}

/// Deep-merges `over` into `base`; tables merge, other values replace.
fn merge(base: &mut toml::Table, over: toml::Table) {
    for (key, value) in over {
        if let toml::Value::Table(inner) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge(existing, inner);
                continue;
            }
            base.insert(key, toml::Value::Table(inner));
        } else {
            base.insert(key, value);
        }
    }
}

/// Analyzer-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Root directory to analyze (default: current directory).
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Glob patterns to exclude from analysis.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether to respect .gitignore files.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Maximum number of threads checking uses.
    #[serde(default)]
    pub parallelism: Option<usize>,

    /// Abort instead of skipping files that fail to parse.
    #[serde(default)]
    pub fail_on_parse_error: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude: vec!["**/target/**".to_string(), "**/vendor/**".to_string()],
            respect_gitignore: true,
            parallelism: None,
            fail_on_parse_error: false,
        }
    }
}

/// Policy file locations, relative to the analyzed root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy files, validated together in this order.
    #[serde(default = "default_policy_files")]
    pub files: Vec<PathBuf>,

    /// Also match member ids (`M:`, `F:`) against the used symbol itself.
    /// Off by default: bans apply through declaring types and containers.
    #[serde(default)]
    pub match_members: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            files: default_policy_files(),
            match_members: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_policy_files() -> Vec<PathBuf> {
    vec![PathBuf::from(DEFAULT_POLICY_FILE)]
}

/// Per-diagnostic configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticConfig {
    /// Severity override for this diagnostic.
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A `[diagnostics.*]` table names no known diagnostic.
    #[error("Unknown diagnostic `{key}`, expected BA0001, BA0002 or their names")]
    UnknownDiagnostic {
        /// The offending key.
        key: String,
    },

    /// One file configures a diagnostic under both its code and its name.
    #[error("Diagnostic {code} is configured more than once")]
    DuplicateDiagnostic {
        /// Code of the diagnostic.
        code: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.analyzer.respect_gitignore);
        assert!(config.diagnostics.is_empty());
        assert_eq!(
            config.policy.files,
            vec![PathBuf::from("BannedSymbols.txt")]
        );
        assert_eq!(config.fail_on(), Severity::Error);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
fail_on = "warning"

[analyzer]
root = "./src"
exclude = ["**/generated/**"]
parallelism = 2

[policy]
files = ["BannedSymbols.txt", "BannedSymbols.Legacy.txt"]

[diagnostics.BA0001]
severity = "warning"

[diagnostics.duplicate-banned-symbol]
severity = "info"
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.analyzer.root, PathBuf::from("./src"));
        assert_eq!(config.analyzer.parallelism, Some(2));
        assert_eq!(config.policy.files.len(), 2);
        assert_eq!(config.fail_on(), Severity::Warning);

        let overrides = config.severity_overrides();
        assert_eq!(
            overrides.get(&DiagnosticId::SymbolIsBanned),
            Some(&Severity::Warning)
        );
        assert_eq!(
            overrides.get(&DiagnosticId::DuplicateBannedSymbol),
            Some(&Severity::Info)
        );
    }

    #[test]
    fn test_unknown_diagnostic_is_rejected() {
        let err = Config::parse("[diagnostics.AL001]\nseverity = \"info\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDiagnostic { key } if key == "AL001"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            Config::parse("[analyzer"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_code_and_name_for_one_diagnostic_is_rejected() {
        let toml = "[diagnostics.BA0001]\nseverity = \"info\"\n\n[diagnostics.symbol-is-banned]\nseverity = \"warning\"\n";
        let err = Config::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDiagnostic { code } if code == "BA0001"));
    }

    #[test]
    fn test_diagnostics_are_keyed_by_code() {
        let config = Config::parse("[diagnostics.symbol-is-banned]\nseverity = \"info\"\n")
            .expect("valid");
        assert!(config.diagnostics.contains_key("BA0001"));
        assert!(!config.policy.match_members);
    }

    #[test]
    fn test_later_files_override_earlier_ones() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(
            &global,
            "fail_on = \"warning\"\n[analyzer]\nparallelism = 8\nexclude = [\"**/gen/**\"]\n[diagnostics.BA0001]\nseverity = \"info\"\n",
        )
        .unwrap();
        std::fs::write(
            &project,
            "[analyzer]\nparallelism = 2\n[diagnostics.symbol-is-banned]\nseverity = \"warning\"\n[policy]\nmatch_members = true\n",
        )
        .unwrap();

        let config = Config::from_files(&[&global, &project]).expect("valid layers");
        assert_eq!(config.fail_on(), Severity::Warning);
        assert_eq!(config.analyzer.parallelism, Some(2));
        assert_eq!(config.analyzer.exclude, vec!["**/gen/**".to_string()]);
        assert!(config.policy.match_members);
        assert_eq!(
            config.severity_overrides().get(&DiagnosticId::SymbolIsBanned),
            Some(&Severity::Warning)
        );
    }

    #[test]
    fn test_missing_layer_is_io_error() {
        let err = Config::from_files(&[Path::new("/nonexistent/banned-api.toml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
