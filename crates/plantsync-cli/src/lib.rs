//! CLI logic for the Plantsync tool.
//!
//! This module wires the command-line arguments to the Plantsync library:
//! it opens the workspace and marker file, builds the listener from the
//! configuration and dispatches to the selected command.

pub mod error_adapter;
pub mod watch;

mod args;
mod config;

pub use args::{Args, Command};

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::info;

use plantsync::{
    AutoSaveListener, PlantsyncError, ResourceDelta, Workspace, config::AppConfig,
    create_resource_listener, diagram::Diagram, render_to_target, workspace::path_string,
};
use plantsync_core::{
    marker::{Marker, PLANTUML_MARKER},
    store::{MarkerStore, TomlMarkerStore},
};

/// Run the Plantsync CLI application
///
/// Output of listing commands is written to standard output.
///
/// # Errors
///
/// Returns `PlantsyncError` for:
/// - Configuration loading errors
/// - Marker file errors
/// - Rendering and writing errors of an explicit render request
/// - Watcher start-up errors
pub fn run(args: &Args) -> Result<(), PlantsyncError> {
    run_with_output(args, &mut io::stdout().lock())
}

/// Run the CLI, writing listing output to `out`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_output(args: &Args, out: &mut dyn Write) -> Result<(), PlantsyncError> {
    let root = fs::canonicalize(&args.root)?;
    info!(root = root.display().to_string(); "Opening workspace");
    let app_config = config::load_config(args.config.as_ref(), &root)?;
    let mut workspace = Workspace::new(root);

    let markers_path = workspace.resolve(app_config.markers().path());
    let mut markers = TomlMarkerStore::open(markers_path)?;

    match &args.command {
        Command::Render { source, target } => {
            let source = workspace_path(&workspace, source)?;
            let target = workspace_path(&workspace, target)?;
            render(&mut workspace, &mut markers, &app_config, &source, &target)
        }
        Command::Watch => {
            let mut listener = create_resource_listener(&app_config);
            mark_targets_derived(&mut workspace, &markers)?;
            watch::watch(&mut workspace, &mut markers, &mut listener, app_config.watch())
        }
        Command::Sync => {
            let mut listener = create_resource_listener(&app_config);
            sync(&mut workspace, &mut markers, &mut listener, out)
        }
        Command::Markers => list_markers(&markers, out),
        Command::Forget { source } => {
            let source = workspace_path(&workspace, source)?;
            forget(&mut markers, &source)
        }
    }
}

fn render(
    workspace: &mut Workspace,
    markers: &mut dyn MarkerStore,
    config: &AppConfig,
    source: &Path,
    target: &Path,
) -> Result<(), PlantsyncError> {
    let listener = create_resource_listener(config);
    let mut diagram = Diagram::new(listener.renderer());
    render_to_target(
        workspace,
        markers,
        listener.providers(),
        &mut diagram,
        source,
        target,
    )
}

/// Treats every marked file as changed once.
fn sync(
    workspace: &mut Workspace,
    markers: &mut dyn MarkerStore,
    listener: &mut AutoSaveListener,
    out: &mut dyn Write,
) -> Result<(), PlantsyncError> {
    mark_targets_derived(workspace, markers)?;

    let deltas: Vec<_> = markers
        .markers()?
        .iter()
        .map(|marker| ResourceDelta::content_changed(marker.resource()))
        .collect();

    let report = listener.resource_changed(workspace, markers, &deltas);
    writeln!(
        out,
        "{} rendered, {} skipped, {} failed",
        report.rendered, report.skipped, report.failed
    )?;
    Ok(())
}

fn list_markers(markers: &dyn MarkerStore, out: &mut dyn Write) -> Result<(), PlantsyncError> {
    for marker in markers.markers()? {
        writeln!(out, "{}", describe(&marker))?;
    }
    Ok(())
}

fn describe(marker: &Marker) -> String {
    format!(
        "{} {} {} -> {}",
        marker.id(),
        PLANTUML_MARKER,
        path_string(marker.resource()),
        marker.target().unwrap_or("(no target)")
    )
}

fn forget(markers: &mut dyn MarkerStore, source: &Path) -> Result<(), PlantsyncError> {
    let found = markers.find(source)?;
    if found.is_empty() {
        return Err(PlantsyncError::NotFound(path_string(source)));
    }
    for marker in found {
        markers.remove(marker.id())?;
        info!(source = path_string(source), id:% = marker.id(); "Marker removed");
    }
    Ok(())
}

/// Flags all recorded targets as derived so their changes are not watched.
fn mark_targets_derived(
    workspace: &mut Workspace,
    markers: &dyn MarkerStore,
) -> Result<(), PlantsyncError> {
    for marker in markers.markers()? {
        if let Some(target) = marker.target() {
            workspace.set_derived(Path::new(target), true);
        }
    }
    Ok(())
}

/// Interprets a command-line path as a workspace path.
fn workspace_path(workspace: &Workspace, path: &str) -> Result<PathBuf, PlantsyncError> {
    workspace
        .relativize(Path::new(path))
        .ok_or_else(|| PlantsyncError::OutsideWorkspace(path.to_string()))
}
