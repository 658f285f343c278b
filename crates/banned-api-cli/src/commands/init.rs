//! Init command implementation.

use anyhow::{bail, Result};
use banned_api_core::DEFAULT_POLICY_FILE;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# banned-api configuration

[analyzer]
# Root directory to analyze (default: current directory)
# root = "."

# Glob patterns to exclude from analysis
exclude = [
    "**/target/**",
    "**/vendor/**",
]

# Respect .gitignore files
respect_gitignore = true

# Threads checking uses (default: available parallelism)
# parallelism = 4

# Abort instead of skipping files that fail to parse
fail_on_parse_error = false

[policy]
# Banned symbol lists, relative to the analyzed root
files = ["BannedSymbols.txt"]
# Let M: and F: entries ban individual members, not just types and modules
match_members = false

# Severity overrides, by code or name
# [diagnostics.BA0001]
# severity = "warning"
"#;

const DEFAULT_POLICY: &str = "";

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    init_in(Path::new("."), force)?;

    println!("Created banned-api.toml and {DEFAULT_POLICY_FILE}");
    println!("\nNext steps:");
    println!("  1. Add one declaration id per line to {DEFAULT_POLICY_FILE}, e.g. T:std::fs::File");
    println!("  2. Run: banned-api check");

    Ok(())
}

fn init_in(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join("banned-api.toml");
    let policy_path = dir.join(DEFAULT_POLICY_FILE);

    for path in [&config_path, &policy_path] {
        if path.exists() && !force {
            bail!(
                "{} already exists. Use --force to overwrite.",
                path.display()
            );
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    std::fs::write(&policy_path, DEFAULT_POLICY)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use banned_api_core::Config;
    use tempfile::TempDir;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert!(config.analyzer.respect_gitignore);
        assert_eq!(config.policy.files.len(), 1);
    }

    #[test]
    fn writes_both_files() {
        let tmp = TempDir::new().unwrap();
        init_in(tmp.path(), false).unwrap();
        assert!(tmp.path().join("banned-api.toml").exists());
        assert!(tmp.path().join("BannedSymbols.txt").exists());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("BannedSymbols.txt"), "T:std::fs::File\n").unwrap();

        assert!(init_in(tmp.path(), false).is_err());
        let kept = std::fs::read_to_string(tmp.path().join("BannedSymbols.txt")).unwrap();
        assert_eq!(kept, "T:std::fs::File\n");

        init_in(tmp.path(), true).unwrap();
        let replaced = std::fs::read_to_string(tmp.path().join("BannedSymbols.txt")).unwrap();
        assert!(replaced.is_empty());
    }
}
