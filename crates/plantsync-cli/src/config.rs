//! Configuration discovery for the CLI.
//!
//! A configuration file is taken from `--config` when given. Otherwise the
//! workspace's own `.plantsync/config.toml` wins over the per-user file in the
//! platform configuration directory. Without any file the defaults apply.

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use plantsync::{PlantsyncError, config::AppConfig, workspace::STATE_DIR};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for PlantsyncError {
    fn from(err: ConfigError) -> Self {
        PlantsyncError::Config(err.to_string())
    }
}

/// Loads the configuration for the workspace at `root`.
///
/// An explicit path must exist. Discovered files are only used if present.
///
/// # Errors
///
/// Returns an error if the explicit file is missing, or if the chosen file
/// cannot be read or parsed.
pub fn load_config(
    explicit_path: Option<impl AsRef<Path>>,
    root: &Path,
) -> Result<AppConfig, PlantsyncError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    match discovered_paths(root).into_iter().find(|path| path.is_file()) {
        Some(path) => {
            info!(path = path.display().to_string(); "Loading configuration");
            load_config_file(&path)
        }
        None => {
            debug!("No configuration file found, using default configuration");
            Ok(AppConfig::default())
        }
    }
}

/// Candidate configuration files, most specific first.
fn discovered_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths = vec![root.join(STATE_DIR).join(CONFIG_FILE_NAME)];

    match ProjectDirs::from("com", "plantsync", "plantsync") {
        Some(dirs) => paths.push(dirs.config_dir().join(CONFIG_FILE_NAME)),
        None => debug!("Could not determine platform-specific config directory"),
    }

    paths
}

fn load_config_file(path: &Path) -> Result<AppConfig, PlantsyncError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        match load_config(Some(&missing), dir.path()) {
            Err(PlantsyncError::Config(message)) => {
                assert!(message.contains("Missing configuration file"));
            }
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[renderer]\ncommand = \"my-plantuml\"\n").unwrap();

        let config = load_config(Some(&path), dir.path()).unwrap();
        assert_eq!(config.renderer().command(), "my-plantuml");
    }

    #[test]
    fn test_workspace_config_is_found_from_root() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(STATE_DIR)).unwrap();
        fs::write(
            root.path().join(STATE_DIR).join(CONFIG_FILE_NAME),
            "[watch]\ndebounce_ms = 50\n",
        )
        .unwrap();

        let config = load_config(None::<&Path>, root.path()).unwrap();
        assert_eq!(config.watch().debounce_ms(), 50);
        assert_eq!(
            discovered_paths(root.path())[0],
            root.path().join(".plantsync/config.toml")
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[watch]\ndebounce_ms = \"soon\"\n").unwrap();

        assert!(matches!(
            load_config(Some(&path), dir.path()),
            Err(PlantsyncError::Config(_))
        ));
    }
}
