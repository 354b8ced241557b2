//! Find-or-create lookup and attribute merging for diagram markers.
//!
//! Marker bookkeeping is best-effort: a store that fails to answer simply
//! leaves the marker state as it was. Neither function here reports errors.

use std::path::{Path, PathBuf};

use log::{debug, trace};

use plantsync_core::{
    marker::{
        Attributes, DIAGRAM_SOURCE_ATTRIBUTE, Marker, ORIGINAL_PATH_ATTRIBUTE, PLANTUML_MARKER,
        TARGET_PATH_ATTRIBUTE,
    },
    store::MarkerStore,
};

use crate::workspace::path_string;

/// Returns the diagram marker of `file`, creating one if asked to.
///
/// An existing marker is only used when it is the single marker on the file.
/// When there is none and `create` is set, a fresh marker is attached.
/// Files carrying several markers are left alone and yield `None`.
pub fn get_marker(store: &mut dyn MarkerStore, file: &Path, create: bool) -> Option<Marker> {
    let markers = match store.find(file) {
        Ok(markers) => markers,
        Err(err) => {
            debug!(kind = PLANTUML_MARKER, file = file.display().to_string(), err:%; "Marker lookup failed");
            return None;
        }
    };

    match markers.len() {
        1 => markers.into_iter().next(),
        0 if create => match store.create(file) {
            Ok(marker) => {
                debug!(file = file.display().to_string(), id:% = marker.id(); "Marker created");
                Some(marker)
            }
            Err(err) => {
                debug!(file = file.display().to_string(), err:%; "Marker creation failed");
                None
            }
        },
        0 => None,
        count => {
            debug!(file = file.display().to_string(), count; "Ambiguous markers, ignoring file");
            None
        }
    }
}

/// Records that `file` was rendered from `text` into `target`.
///
/// `extra` attributes are written first; the bookkeeping fields `original`,
/// `diagramSource` and `target` always take precedence over them. When no
/// `target` is given, the target already recorded on the marker is kept.
/// The marker's previous attribute set is replaced as a whole.
pub fn update_marker(
    store: &mut dyn MarkerStore,
    file: &Path,
    text: &str,
    target: Option<&Path>,
    create: bool,
    extra: Option<&Attributes>,
) {
    let Some(marker) = get_marker(store, file, create) else {
        return;
    };

    let target = match target {
        Some(target) => Some(target.to_path_buf()),
        None => recorded_target(store, &marker),
    };

    let attributes = merge_attributes(file, text, target.as_deref(), extra);
    trace!(file = file.display().to_string(), attributes:?; "Updating marker");

    if let Err(err) = store.set_attributes(marker.id(), attributes) {
        debug!(file = file.display().to_string(), err:%; "Marker update failed");
    }
}

/// Builds a marker attribute set: `extra` overlaid with the bookkeeping fields.
pub fn merge_attributes(
    file: &Path,
    text: &str,
    target: Option<&Path>,
    extra: Option<&Attributes>,
) -> Attributes {
    let mut attributes = extra.cloned().unwrap_or_default();
    attributes.insert(ORIGINAL_PATH_ATTRIBUTE.to_string(), path_string(file).into());
    attributes.insert(DIAGRAM_SOURCE_ATTRIBUTE.to_string(), text.into());
    match target {
        Some(target) => {
            attributes.insert(TARGET_PATH_ATTRIBUTE.to_string(), path_string(target).into());
        }
        None => {
            attributes.remove(TARGET_PATH_ATTRIBUTE);
        }
    }
    attributes
}

fn recorded_target(store: &dyn MarkerStore, marker: &Marker) -> Option<PathBuf> {
    match store.attribute(marker.id(), TARGET_PATH_ATTRIBUTE) {
        Ok(value) => value
            .as_ref()
            .and_then(|value| value.as_str())
            .map(PathBuf::from),
        Err(err) => {
            debug!(id:% = marker.id(), err:%; "Could not read recorded target");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use plantsync_core::{
        MarkerError,
        marker::{AttributeValue, MarkerId},
        store::MemoryMarkerStore,
    };

    use super::*;

    /// A store whose every operation fails.
    struct BrokenStore;

    impl MarkerStore for BrokenStore {
        fn find(&self, _resource: &Path) -> Result<Vec<Marker>, MarkerError> {
            Err(MarkerError::Serialize("broken".into()))
        }

        fn create(&mut self, _resource: &Path) -> Result<Marker, MarkerError> {
            Err(MarkerError::Serialize("broken".into()))
        }

        fn attribute(
            &self,
            id: MarkerId,
            _key: &str,
        ) -> Result<Option<AttributeValue>, MarkerError> {
            Err(MarkerError::NotFound(id))
        }

        fn set_attributes(
            &mut self,
            id: MarkerId,
            _attributes: Attributes,
        ) -> Result<(), MarkerError> {
            Err(MarkerError::NotFound(id))
        }

        fn markers(&self) -> Result<Vec<Marker>, MarkerError> {
            Err(MarkerError::Serialize("broken".into()))
        }

        fn remove(&mut self, id: MarkerId) -> Result<(), MarkerError> {
            Err(MarkerError::NotFound(id))
        }
    }

    /// Wraps a memory store but fails attribute reads.
    #[derive(Default)]
    struct UnreadableAttributes {
        inner: MemoryMarkerStore,
    }

    impl MarkerStore for UnreadableAttributes {
        fn find(&self, resource: &Path) -> Result<Vec<Marker>, MarkerError> {
            self.inner.find(resource)
        }

        fn create(&mut self, resource: &Path) -> Result<Marker, MarkerError> {
            self.inner.create(resource)
        }

        fn attribute(
            &self,
            id: MarkerId,
            _key: &str,
        ) -> Result<Option<AttributeValue>, MarkerError> {
            Err(MarkerError::NotFound(id))
        }

        fn set_attributes(
            &mut self,
            id: MarkerId,
            attributes: Attributes,
        ) -> Result<(), MarkerError> {
            self.inner.set_attributes(id, attributes)
        }

        fn markers(&self) -> Result<Vec<Marker>, MarkerError> {
            self.inner.markers()
        }

        fn remove(&mut self, id: MarkerId) -> Result<(), MarkerError> {
            self.inner.remove(id)
        }
    }

    fn single_marker(store: &dyn MarkerStore, file: &str) -> Marker {
        let mut markers = store.find(Path::new(file)).unwrap();
        assert_eq!(markers.len(), 1, "expected exactly one marker on {file}");
        markers.remove(0)
    }

    #[test]
    fn test_get_marker_without_create() {
        let mut store = MemoryMarkerStore::new();
        assert!(get_marker(&mut store, Path::new("a.puml"), false).is_none());
        assert!(store.markers().unwrap().is_empty());
    }

    #[test]
    fn test_get_marker_is_idempotent() {
        let mut store = MemoryMarkerStore::new();
        let file = Path::new("a.puml");

        let first = get_marker(&mut store, file, true).unwrap();
        let second = get_marker(&mut store, file, true).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(store.markers().unwrap().len(), 1);
    }

    #[test]
    fn test_get_marker_ignores_ambiguous_files() {
        let mut store = MemoryMarkerStore::new();
        let file = Path::new("a.puml");
        store.create(file).unwrap();
        store.create(file).unwrap();

        assert!(get_marker(&mut store, file, true).is_none());
        assert_eq!(store.markers().unwrap().len(), 2);
    }

    #[test]
    fn test_get_marker_swallows_store_failures() {
        assert!(get_marker(&mut BrokenStore, Path::new("a.puml"), true).is_none());
    }

    #[test]
    fn test_update_marker_records_target() {
        let mut store = MemoryMarkerStore::new();
        update_marker(
            &mut store,
            Path::new("docs/a.puml"),
            "@startuml\n@enduml\n",
            Some(Path::new("docs/a.png")),
            true,
            None,
        );

        let marker = single_marker(&store, "docs/a.puml");
        assert_eq!(marker.target(), Some("docs/a.png"));
        assert_eq!(
            marker.attribute(ORIGINAL_PATH_ATTRIBUTE),
            Some(&AttributeValue::from("docs/a.puml"))
        );
        assert_eq!(
            marker.attribute(DIAGRAM_SOURCE_ATTRIBUTE),
            Some(&AttributeValue::from("@startuml\n@enduml\n"))
        );
    }

    #[test]
    fn test_update_marker_keeps_recorded_target() {
        let mut store = MemoryMarkerStore::new();
        let file = Path::new("a.puml");
        update_marker(&mut store, file, "v1", Some(Path::new("a.svg")), true, None);
        update_marker(&mut store, file, "v2", None, false, None);

        let marker = single_marker(&store, "a.puml");
        assert_eq!(marker.target(), Some("a.svg"));
        assert_eq!(
            marker.attribute(DIAGRAM_SOURCE_ATTRIBUTE),
            Some(&AttributeValue::from("v2"))
        );
    }

    #[test]
    fn test_update_marker_without_any_target() {
        let mut store = MemoryMarkerStore::new();
        update_marker(&mut store, Path::new("a.puml"), "v1", None, true, None);

        let marker = single_marker(&store, "a.puml");
        assert_eq!(marker.target(), None);
        assert!(marker.attribute(TARGET_PATH_ATTRIBUTE).is_none());
    }

    #[test]
    fn test_update_marker_without_create_needs_existing_marker() {
        let mut store = MemoryMarkerStore::new();
        update_marker(&mut store, Path::new("a.puml"), "v1", Some(Path::new("a.svg")), false, None);
        assert!(store.markers().unwrap().is_empty());
    }

    #[test]
    fn test_update_marker_unreadable_target_is_dropped() {
        let mut store = UnreadableAttributes::default();
        let file = Path::new("a.puml");
        update_marker(&mut store, file, "v1", Some(Path::new("a.svg")), true, None);
        update_marker(&mut store, file, "v2", None, false, None);

        let marker = single_marker(&store, "a.puml");
        assert_eq!(marker.target(), None);
        assert_eq!(
            marker.attribute(DIAGRAM_SOURCE_ATTRIBUTE),
            Some(&AttributeValue::from("v2"))
        );
    }

    #[test]
    fn test_update_marker_swallows_store_failures() {
        update_marker(&mut BrokenStore, Path::new("a.puml"), "v1", None, true, None);
    }

    #[test]
    fn test_extra_attributes_are_kept_but_overridden() {
        let mut extra = Attributes::new();
        extra.insert("author".to_string(), "ada".into());
        extra.insert(TARGET_PATH_ATTRIBUTE.to_string(), "elsewhere.png".into());
        extra.insert(DIAGRAM_SOURCE_ATTRIBUTE.to_string(), 1i64.into());

        let mut store = MemoryMarkerStore::new();
        update_marker(
            &mut store,
            Path::new("a.puml"),
            "text",
            Some(Path::new("a.svg")),
            true,
            Some(&extra),
        );

        let marker = single_marker(&store, "a.puml");
        assert_eq!(marker.attribute("author"), Some(&AttributeValue::from("ada")));
        assert_eq!(marker.target(), Some("a.svg"));
        assert_eq!(
            marker.attribute(DIAGRAM_SOURCE_ATTRIBUTE),
            Some(&AttributeValue::from("text"))
        );
    }
}
