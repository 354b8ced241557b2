//! Filesystem watching for the `watch` command.
//!
//! A debounced watcher thread collects filesystem events and forwards each
//! batch over a channel. The calling thread turns every batch into resource
//! deltas and hands it to the listener, one batch at a time.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use log::{debug, info, warn};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};

use plantsync::{
    AutoSaveListener, DeltaKind, PlantsyncError, ResourceDelta, Workspace, config::WatchConfig,
};
use plantsync_core::store::MarkerStore;

/// Watches the workspace until the event channel closes.
///
/// # Errors
///
/// Returns [`PlantsyncError::Watch`] if the watcher cannot be started.
pub fn watch(
    workspace: &mut Workspace,
    markers: &mut dyn MarkerStore,
    listener: &mut AutoSaveListener,
    config: &WatchConfig,
) -> Result<(), PlantsyncError> {
    let (tx, rx) = mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms()), tx)
        .map_err(|e| PlantsyncError::Watch(format!("failed to create filesystem watcher: {e}")))?;
    debouncer
        .watcher()
        .watch(workspace.root(), RecursiveMode::Recursive)
        .map_err(|e| PlantsyncError::Watch(format!("failed to watch workspace root: {e}")))?;

    info!(
        path = workspace.root().display().to_string(),
        debounce_ms = config.debounce_ms();
        "Watching workspace"
    );

    for result in rx {
        match result {
            Ok(events) => {
                let deltas = to_deltas(workspace, events.iter().map(|event| event.path.as_path()));
                if deltas.is_empty() {
                    continue;
                }
                debug!(count = deltas.len(); "Change batch received");
                listener.resource_changed(workspace, markers, &deltas);
            }
            Err(err) => warn!(err:%; "Filesystem watch error"),
        }
    }

    debug!("Event channel closed, stopping watcher");
    Ok(())
}

/// Converts changed filesystem paths into workspace deltas.
///
/// Paths outside the workspace, inside the state directory, or flagged as
/// derived are dropped, as are directories. Each path appears at most once.
pub fn to_deltas<'a>(
    workspace: &Workspace,
    paths: impl IntoIterator<Item = &'a Path>,
) -> Vec<ResourceDelta> {
    let paths: BTreeSet<PathBuf> = paths
        .into_iter()
        .filter_map(|path| workspace.relativize(path))
        .filter(|path| !workspace.is_state_path(path) && !workspace.is_derived(path))
        .collect();

    paths
        .into_iter()
        .filter_map(|path| {
            if workspace.is_file(&path) {
                Some(ResourceDelta::content_changed(path))
            } else if !workspace.exists(&path) {
                Some(ResourceDelta::new(path, DeltaKind::Removed, false))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_to_deltas_classifies_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join(".plantsync")).unwrap();
        fs::write(root.join("docs/a.puml"), "x").unwrap();
        fs::write(root.join("docs/a.svg"), "x").unwrap();
        fs::write(root.join(".plantsync/markers.toml"), "").unwrap();

        let mut workspace = Workspace::new(&root);
        workspace.set_derived(Path::new("docs/a.svg"), true);

        let changed = root.join("docs/a.puml");
        let removed = root.join("docs/gone.puml");
        let derived = root.join("docs/a.svg");
        let state = root.join(".plantsync/markers.toml");
        let directory = root.join("docs");
        let outside = PathBuf::from("/somewhere/else.puml");

        let deltas = to_deltas(
            &workspace,
            [
                changed.as_path(),
                changed.as_path(),
                removed.as_path(),
                derived.as_path(),
                state.as_path(),
                directory.as_path(),
                outside.as_path(),
            ],
        );

        assert_eq!(
            deltas,
            vec![
                ResourceDelta::content_changed("docs/a.puml"),
                ResourceDelta::new("docs/gone.puml", DeltaKind::Removed, false),
            ]
        );
    }
}
