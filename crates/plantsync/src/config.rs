//! Configuration types for Plantsync.
//!
//! This module provides the configuration structures that control how
//! diagrams are found, rendered and watched. All types implement
//! [`serde::Deserialize`] for loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining all sections.
//! - [`RendererConfig`] - Which renderer command to run and with which arguments.
//! - [`ProvidersConfig`] - Which files may contain diagram text.
//! - [`WatchConfig`] - Filesystem watching settings.
//! - [`MarkersConfig`] - Where markers are persisted.
//!
//! # Example
//!
//! ```
//! # use plantsync::config::AppConfig;
//! let config: AppConfig = toml::from_str(
//!     r#"
//!     [renderer]
//!     command = "java"
//!     args = ["-jar", "plantuml.jar"]
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.renderer().command(), "java");
//! assert_eq!(config.watch().debounce_ms(), 500);
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::workspace::STATE_DIR;

const DEFAULT_COMMAND: &str = "plantuml";
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_EMBEDDED_EXTENSIONS: &[&str] = &["md", "txt", "java", "rs", "py", "adoc"];

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Renderer configuration section.
    #[serde(default)]
    renderer: RendererConfig,

    /// Provider configuration section.
    #[serde(default)]
    providers: ProvidersConfig,

    /// Watch configuration section.
    #[serde(default)]
    watch: WatchConfig,

    /// Marker persistence section.
    #[serde(default)]
    markers: MarkersConfig,
}

impl AppConfig {
    pub fn renderer(&self) -> &RendererConfig {
        &self.renderer
    }

    pub fn providers(&self) -> &ProvidersConfig {
        &self.providers
    }

    pub fn watch(&self) -> &WatchConfig {
        &self.watch
    }

    pub fn markers(&self) -> &MarkersConfig {
        &self.markers
    }
}

/// External renderer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// Program to run, looked up on `PATH` when not absolute.
    #[serde(default = "default_command")]
    command: String,

    /// Arguments placed before the pipe-mode flags.
    #[serde(default)]
    args: Vec<String>,
}

impl RendererConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new(default_command(), Vec::new())
    }
}

/// Diagram-text provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Extensions of files scanned for an embedded `@start…`/`@end…` block.
    #[serde(default = "default_embedded_extensions")]
    embedded_extensions: Vec<String>,
}

impl ProvidersConfig {
    pub fn new(embedded_extensions: Vec<String>) -> Self {
        Self {
            embedded_extensions,
        }
    }

    pub fn embedded_extensions(&self) -> &[String] {
        &self.embedded_extensions
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self::new(default_embedded_extensions())
    }
}

/// Filesystem watching settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Window in which bursts of filesystem events are merged into one batch.
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,
}

impl WatchConfig {
    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Marker persistence settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkersConfig {
    /// Marker file location, relative to the workspace root unless absolute.
    #[serde(default = "default_markers_path")]
    path: PathBuf,
}

impl MarkersConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            path: default_markers_path(),
        }
    }
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_embedded_extensions() -> Vec<String> {
    DEFAULT_EMBEDDED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_markers_path() -> PathBuf {
    Path::new(STATE_DIR).join("markers.toml")
}
