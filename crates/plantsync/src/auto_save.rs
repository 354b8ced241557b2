//! Re-rendering diagrams when their sources change.
//!
//! [`AutoSaveListener`] receives batches of [`ResourceDelta`]s. For every
//! file whose content changed and whose marker records a target, it fetches
//! the current diagram text through the provider registry, renders it and
//! rewrites the target.
//!
//! Batches must be delivered one at a time; `resource_changed` takes
//! `&mut self` so overlapping deliveries cannot compile.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, error, info};

use plantsync_core::{marker::TARGET_PATH_ATTRIBUTE, store::MarkerStore};

use crate::{
    diagram::Diagram,
    marker::get_marker,
    provider::ProviderRegistry,
    render::DiagramRenderer,
    save::save_diagram_image,
    workspace::Workspace,
};

/// What happened to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Added,
    Removed,
    Changed,
}

/// A single entry of a change batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDelta {
    path: PathBuf,
    kind: DeltaKind,
    content: bool,
}

impl ResourceDelta {
    /// Creates a delta; `content` tells whether the file's bytes changed.
    pub fn new(path: impl Into<PathBuf>, kind: DeltaKind, content: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            content,
        }
    }

    /// Shorthand for a content modification of an existing file.
    pub fn content_changed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DeltaKind::Changed, true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    /// Returns `true` for modifications of file content.
    pub fn is_content_change(&self) -> bool {
        self.kind == DeltaKind::Changed && self.content
    }
}

/// Outcome counts for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Targets rewritten.
    pub rendered: usize,
    /// Deltas that needed no work.
    pub skipped: usize,
    /// Deltas whose render or write failed.
    pub failed: usize,
}

/// Keeps marked targets in sync with their diagram sources.
pub struct AutoSaveListener {
    providers: ProviderRegistry,
    renderer: Rc<dyn DiagramRenderer>,
    diagram: Option<Diagram>,
}

impl AutoSaveListener {
    pub fn new(providers: ProviderRegistry, renderer: Rc<dyn DiagramRenderer>) -> Self {
        Self {
            providers,
            renderer,
            diagram: None,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn renderer(&self) -> Rc<dyn DiagramRenderer> {
        Rc::clone(&self.renderer)
    }

    /// Processes one change batch.
    ///
    /// Failures are logged and counted; they never stop the remaining
    /// deltas from being processed.
    pub fn resource_changed(
        &mut self,
        workspace: &mut Workspace,
        markers: &mut dyn MarkerStore,
        deltas: &[ResourceDelta],
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for delta in deltas {
            match self.visit(workspace, markers, delta) {
                Visit::Rendered => report.rendered += 1,
                Visit::Skipped => report.skipped += 1,
                Visit::Failed => report.failed += 1,
            }
        }

        if report.rendered > 0 || report.failed > 0 {
            info!(rendered = report.rendered, skipped = report.skipped, failed = report.failed; "Change batch processed");
        }
        report
    }

    fn visit(
        &mut self,
        workspace: &mut Workspace,
        markers: &mut dyn MarkerStore,
        delta: &ResourceDelta,
    ) -> Visit {
        if !delta.is_content_change() {
            return Visit::Skipped;
        }
        let path = delta.path();
        if !workspace.is_file(path) {
            return Visit::Skipped;
        }

        let Some(marker) = get_marker(markers, path, false) else {
            return Visit::Skipped;
        };
        let target = match markers.attribute(marker.id(), TARGET_PATH_ATTRIBUTE) {
            Ok(Some(value)) => match value
                .as_str()
                .and_then(|target| workspace.relativize(Path::new(target)))
            {
                Some(target) => target,
                None => {
                    debug!(path = path.display().to_string(), target:? = value; "Marker target is not a workspace path");
                    return Visit::Skipped;
                }
            },
            Ok(None) => return Visit::Skipped,
            Err(err) => {
                debug!(path = path.display().to_string(), err:%; "Could not read marker target");
                return Visit::Skipped;
            }
        };

        debug!(path = path.display().to_string(), target = target.display().to_string(); "Updating diagram output");

        let Some(text) = self.providers.diagram_text(workspace, path) else {
            debug!(path = path.display().to_string(); "No provider produced diagram text");
            return Visit::Skipped;
        };

        let renderer = &self.renderer;
        let diagram = self
            .diagram
            .get_or_insert_with(|| Diagram::new(Rc::clone(renderer)));
        diagram.set_text(text);

        match save_diagram_image(workspace, markers, Some(path), diagram, &target, false) {
            Ok(true) => Visit::Rendered,
            Ok(false) => Visit::Skipped,
            Err(err) => {
                error!(
                    path = path.display().to_string(),
                    target = target.display().to_string();
                    "Failed to update diagram output: {err}"
                );
                Visit::Failed
            }
        }
    }
}

enum Visit {
    Rendered,
    Skipped,
    Failed,
}
