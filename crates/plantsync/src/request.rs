//! Explicit render requests that link a source file to a new target.

use std::path::{Path, PathBuf};

use log::info;

use plantsync_core::store::MarkerStore;

use crate::{
    PlantsyncError,
    diagram::Diagram,
    marker::update_marker,
    provider::ProviderRegistry,
    save::save_diagram_image,
    workspace::{Workspace, path_string},
};

/// Renders `source` into `target` and records the link in a marker.
///
/// This is the first-render path: the target is created if missing and the
/// source's marker is created if it has none yet. Later content changes of
/// `source` are picked up by the auto-save listener.
///
/// Both paths are normalized first, so the marker records the same target
/// that is written.
///
/// # Errors
///
/// Returns an error if either path leaves the workspace, `source` is not a
/// file, no provider yields diagram text for it, or rendering or writing the
/// target fails. The marker is only touched after the target was written.
pub fn render_to_target(
    workspace: &mut Workspace,
    markers: &mut dyn MarkerStore,
    providers: &ProviderRegistry,
    diagram: &mut Diagram,
    source: &Path,
    target: &Path,
) -> Result<(), PlantsyncError> {
    let source = workspace_path(workspace, source)?;
    let target = workspace_path(workspace, target)?;
    let (source, target) = (source.as_path(), target.as_path());

    if !workspace.is_file(source) {
        return Err(PlantsyncError::NotFound(path_string(source)));
    }

    let text = providers
        .diagram_text(workspace, source)
        .ok_or_else(|| PlantsyncError::NoDiagramText(path_string(source)))?;
    diagram.set_text(text);

    save_diagram_image(workspace, markers, Some(source), diagram, target, true)?;
    update_marker(markers, source, diagram.text(), Some(target), true, None);

    info!(source = path_string(source), target = path_string(target); "Diagram linked");
    Ok(())
}

fn workspace_path(workspace: &Workspace, path: &Path) -> Result<PathBuf, PlantsyncError> {
    workspace
        .relativize(path)
        .ok_or_else(|| PlantsyncError::OutsideWorkspace(path.display().to_string()))
}
