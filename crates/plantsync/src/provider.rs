//! Diagram-text providers.
//!
//! A provider knows how to pull diagram source text out of some kind of file.
//! Providers are consulted through a [`ProviderRegistry`] in the order they
//! were registered; the first provider that supports a path *and* yields text
//! wins.

use std::path::Path;

use log::{debug, trace};

use crate::{config::ProvidersConfig, workspace::Workspace};

/// Extensions of standalone PlantUML files.
pub const PLANTUML_EXTENSIONS: &[&str] = &["puml", "plantuml", "pu", "iuml", "wsd"];

/// A source of diagram textual definitions for workspace paths.
pub trait DiagramTextProvider {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Returns `true` if this provider can handle `path`.
    fn supports_path(&self, path: &Path) -> bool;

    /// Returns the diagram text for `path`, or `None` if there is none.
    fn diagram_text(&self, workspace: &Workspace, path: &Path) -> Option<String>;
}

/// Ordered collection of providers.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn DiagramTextProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in provider set: standalone PlantUML files first,
    /// then embedded diagrams in the configured file types.
    pub fn with_defaults(config: &ProvidersConfig) -> Self {
        let mut registry = Self::new();
        registry.register(PlantUmlFileProvider);
        registry.register(EmbeddedDiagramProvider::new(
            config.embedded_extensions().to_vec(),
        ));
        registry
    }

    /// Appends a provider; it is consulted after all earlier ones.
    pub fn register(&mut self, provider: impl DiagramTextProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn DiagramTextProvider> {
        self.providers.iter().map(|provider| provider.as_ref())
    }

    /// Returns the text of the first provider that supports `path` and has text for it.
    pub fn diagram_text(&self, workspace: &Workspace, path: &Path) -> Option<String> {
        for provider in self.iter() {
            if !provider.supports_path(path) {
                continue;
            }
            if let Some(text) = provider.diagram_text(workspace, path) {
                debug!(provider = provider.name(), path = path.display().to_string(); "Diagram text found");
                return Some(text);
            }
            trace!(provider = provider.name(), path = path.display().to_string(); "Provider had no diagram text");
        }
        None
    }
}

/// Provides the content of standalone PlantUML files.
///
/// Files without a `@start` tag are treated as a bare diagram body and
/// wrapped in `@startuml`/`@enduml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlantUmlFileProvider;

impl DiagramTextProvider for PlantUmlFileProvider {
    fn name(&self) -> &str {
        "plantuml-file"
    }

    fn supports_path(&self, path: &Path) -> bool {
        has_extension(path, PLANTUML_EXTENSIONS)
    }

    fn diagram_text(&self, workspace: &Workspace, path: &Path) -> Option<String> {
        let content = read(workspace, path)?;
        if content.trim().is_empty() {
            return None;
        }
        if content.contains("@start") {
            Some(content)
        } else {
            Some(format!("@startuml\n{}\n@enduml\n", content.trim_end()))
        }
    }
}

/// Extracts the first diagram block embedded in another kind of file.
///
/// Recognizes blocks inside Markdown fences, doc comments and the like:
/// whatever precedes `@start…` on its line is taken as the block's line
/// prefix and stripped from every line up to the matching `@end…`.
#[derive(Debug, Clone)]
pub struct EmbeddedDiagramProvider {
    extensions: Vec<String>,
}

impl EmbeddedDiagramProvider {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

impl DiagramTextProvider for EmbeddedDiagramProvider {
    fn name(&self) -> &str {
        "embedded"
    }

    fn supports_path(&self, path: &Path) -> bool {
        has_extension(path, self.extensions.as_slice())
    }

    fn diagram_text(&self, workspace: &Workspace, path: &Path) -> Option<String> {
        extract_diagram_block(&read(workspace, path)?)
    }
}

/// Returns the first `@start…` … `@end…` block of `text`, prefixes removed.
pub fn extract_diagram_block(text: &str) -> Option<String> {
    let mut lines = text.lines();

    let (prefix, first) = lines.by_ref().find_map(|line| {
        let start = line.find("@start")?;
        let prefix = &line[..start];
        is_comment_prefix(prefix).then(|| (prefix, line[start..].trim_end()))
    })?;

    let mut block = vec![first.to_string()];
    for line in lines {
        let body = strip_prefix(line, prefix).trim_end();
        block.push(body.to_string());
        if body.trim_start().starts_with("@end") {
            block.push(String::new());
            return Some(block.join("\n"));
        }
    }

    // Unterminated block.
    None
}

fn is_comment_prefix(prefix: &str) -> bool {
    prefix
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '*' | '/' | '#' | '\'' | ';' | '-' | '!'))
}

fn strip_prefix<'a>(line: &'a str, prefix: &str) -> &'a str {
    if let Some(rest) = line.strip_prefix(prefix) {
        return rest;
    }
    let marker = prefix.trim();
    let trimmed = line.trim_start();
    match trimmed.strip_prefix(marker) {
        Some(rest) if !marker.is_empty() => rest.strip_prefix(' ').unwrap_or(rest),
        _ => trimmed,
    }
}

fn has_extension(path: &Path, extensions: &[impl AsRef<str>]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(ext))
        })
}

fn read(workspace: &Workspace, path: &Path) -> Option<String> {
    match workspace.read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            debug!(path = path.display().to_string(), err:%; "Failed to read diagram file");
            None
        }
    }
}
