//! Layered configuration for one run.
//!
//! The user-wide file is read first and the project file on top of it, so a
//! project only states what it changes. `--config` stands in for the project
//! file; the user-wide layer still applies beneath it. Relative policy paths
//! are always taken relative to the checked project.

use anyhow::{Context, Result};
use banned_api_core::Config;
use std::path::{Path, PathBuf};

/// Project config file names, in order of preference.
const PROJECT_FILES: &[&str] = &["banned-api.toml", ".banned-api.toml"];

/// Overrides the user config directory (default `~/.banned-api`).
const USER_DIR_VAR: &str = "BANNED_API_CONFIG_DIR";

/// Loads the configuration for checking `project_dir`.
///
/// # Errors
///
/// Returns an error if a layer cannot be read or is not valid configuration,
/// including an explicit file that does not exist.
pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    load_with(project_dir, explicit, user_dir().as_deref())
}

fn user_dir() -> Option<PathBuf> {
    std::env::var_os(USER_DIR_VAR)
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".banned-api")))
}

fn load_with(project_dir: &Path, explicit: Option<&Path>, user_dir: Option<&Path>) -> Result<Config> {
    let layers = layers(project_dir, explicit, user_dir);
    if layers.is_empty() {
        tracing::debug!("No config files found; using defaults");
        return Ok(Config::default());
    }
    for layer in &layers {
        tracing::debug!("Config layer: {}", layer.display());
    }

    let paths: Vec<&Path> = layers.iter().map(PathBuf::as_path).collect();
    Config::from_files(&paths).with_context(|| {
        let names: Vec<_> = layers.iter().map(|p| p.display().to_string()).collect();
        format!("Failed to load config from {}", names.join(", "))
    })
}

/// Config files to merge, lowest precedence first.
fn layers(project_dir: &Path, explicit: Option<&Path>, user_dir: Option<&Path>) -> Vec<PathBuf> {
    let user = user_dir
        .map(|dir| dir.join("config.toml"))
        .filter(|path| path.is_file());
    let project = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => PROJECT_FILES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|path| path.is_file()),
    };
    user.into_iter().chain(project).collect()
}
