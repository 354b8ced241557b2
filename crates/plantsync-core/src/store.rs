//! Marker persistence.
//!
//! [`MarkerStore`] is the capability the sync layer needs from whatever keeps
//! markers: find the markers of a file, create one, read a single attribute
//! and replace an attribute set. Two stores are provided:
//!
//! - [`MemoryMarkerStore`] keeps everything in memory.
//! - [`TomlMarkerStore`] mirrors every mutation to a TOML file.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    error::MarkerError,
    marker::{AttributeValue, Attributes, Marker, MarkerId},
};

/// Storage capability for markers.
///
/// Implementations are not expected to enforce the one-marker-per-file rule;
/// callers maintain it through find-or-create lookups.
pub trait MarkerStore {
    /// Returns all markers attached to `resource`, in creation order.
    fn find(&self, resource: &Path) -> Result<Vec<Marker>, MarkerError>;

    /// Attaches a new, empty marker to `resource`.
    fn create(&mut self, resource: &Path) -> Result<Marker, MarkerError>;

    /// Reads one attribute of the marker `id`.
    fn attribute(&self, id: MarkerId, key: &str) -> Result<Option<AttributeValue>, MarkerError>;

    /// Replaces the attribute set of the marker `id`.
    fn set_attributes(&mut self, id: MarkerId, attributes: Attributes) -> Result<(), MarkerError>;

    /// Returns every marker in the store, in creation order.
    fn markers(&self) -> Result<Vec<Marker>, MarkerError>;

    /// Deletes the marker `id`.
    fn remove(&mut self, id: MarkerId) -> Result<(), MarkerError>;
}

/// Serialized form shared by both stores.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct MarkerTable {
    #[serde(default)]
    next_id: u64,

    #[serde(default)]
    markers: Vec<Marker>,
}

impl MarkerTable {
    fn find(&self, resource: &Path) -> Vec<Marker> {
        self.markers
            .iter()
            .filter(|marker| marker.resource() == resource)
            .cloned()
            .collect()
    }

    fn create(&mut self, resource: &Path) -> Marker {
        self.next_id += 1;
        let marker = Marker::new(MarkerId::new(self.next_id), resource);
        self.markers.push(marker.clone());
        marker
    }

    fn get(&self, id: MarkerId) -> Result<&Marker, MarkerError> {
        self.markers
            .iter()
            .find(|marker| marker.id() == id)
            .ok_or(MarkerError::NotFound(id))
    }

    fn get_mut(&mut self, id: MarkerId) -> Result<&mut Marker, MarkerError> {
        self.markers
            .iter_mut()
            .find(|marker| marker.id() == id)
            .ok_or(MarkerError::NotFound(id))
    }

    fn remove(&mut self, id: MarkerId) -> Result<(), MarkerError> {
        let index = self
            .markers
            .iter()
            .position(|marker| marker.id() == id)
            .ok_or(MarkerError::NotFound(id))?;
        self.markers.remove(index);
        Ok(())
    }
}

/// A [`MarkerStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    table: MarkerTable,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn find(&self, resource: &Path) -> Result<Vec<Marker>, MarkerError> {
        Ok(self.table.find(resource))
    }

    fn create(&mut self, resource: &Path) -> Result<Marker, MarkerError> {
        Ok(self.table.create(resource))
    }

    fn attribute(&self, id: MarkerId, key: &str) -> Result<Option<AttributeValue>, MarkerError> {
        Ok(self.table.get(id)?.attribute(key).cloned())
    }

    fn set_attributes(&mut self, id: MarkerId, attributes: Attributes) -> Result<(), MarkerError> {
        self.table.get_mut(id)?.set_attributes(attributes);
        Ok(())
    }

    fn markers(&self) -> Result<Vec<Marker>, MarkerError> {
        Ok(self.table.markers.clone())
    }

    fn remove(&mut self, id: MarkerId) -> Result<(), MarkerError> {
        self.table.remove(id)
    }
}

/// A [`MarkerStore`] persisted to a TOML file.
///
/// The file is the only copy of the markers: every operation reads it again,
/// and every mutation is applied to the freshly read contents before being
/// written back. Several processes sharing one file therefore see each
/// other's markers. Writes go through a temporary file in the same directory
/// that is renamed over the old one, so a crash never leaves a half-written
/// file.
#[derive(Debug)]
pub struct TomlMarkerStore {
    path: PathBuf,
}

impl TomlMarkerStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MarkerError> {
        let store = Self { path: path.into() };
        if store.path.exists() {
            store.load()?;
        } else {
            debug!(path = store.path.display().to_string(); "Marker file not found, starting empty");
        }
        Ok(store)
    }

    /// Returns the location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<MarkerTable, MarkerError> {
        if !self.path.exists() {
            return Ok(MarkerTable::default());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|err| MarkerError::io(&self.path, err))?;
        toml::from_str(&content).map_err(|err| MarkerError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    /// Applies `change` to the current file contents and writes the result.
    fn update<T>(
        &mut self,
        change: impl FnOnce(&mut MarkerTable) -> Result<T, MarkerError>,
    ) -> Result<T, MarkerError> {
        let mut table = self.load()?;
        let result = change(&mut table)?;
        self.save(&table)?;
        Ok(result)
    }

    fn save(&self, table: &MarkerTable) -> Result<(), MarkerError> {
        let content =
            toml::to_string_pretty(table).map_err(|err| MarkerError::Serialize(err.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| MarkerError::io(&dir, err))?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|err| MarkerError::io(&dir, err))?;
        file.write_all(content.as_bytes())
            .map_err(|err| MarkerError::io(file.path(), err))?;
        file.persist(&self.path)
            .map_err(|err| MarkerError::io(&self.path, err.error))?;

        trace!(path = self.path.display().to_string(), markers = table.markers.len(); "Marker file written");
        Ok(())
    }
}

impl MarkerStore for TomlMarkerStore {
    fn find(&self, resource: &Path) -> Result<Vec<Marker>, MarkerError> {
        Ok(self.load()?.find(resource))
    }

    fn create(&mut self, resource: &Path) -> Result<Marker, MarkerError> {
        self.update(|table| Ok(table.create(resource)))
    }

    fn attribute(&self, id: MarkerId, key: &str) -> Result<Option<AttributeValue>, MarkerError> {
        Ok(self.load()?.get(id)?.attribute(key).cloned())
    }

    fn set_attributes(&mut self, id: MarkerId, attributes: Attributes) -> Result<(), MarkerError> {
        self.update(|table| {
            table.get_mut(id)?.set_attributes(attributes);
            Ok(())
        })
    }

    fn markers(&self) -> Result<Vec<Marker>, MarkerError> {
        Ok(self.load()?.markers)
    }

    fn remove(&mut self, id: MarkerId) -> Result<(), MarkerError> {
        self.update(|table| table.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{DIAGRAM_SOURCE_ATTRIBUTE, TARGET_PATH_ATTRIBUTE};

    fn target_attributes(target: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(TARGET_PATH_ATTRIBUTE.to_string(), target.into());
        attributes
    }

    #[test]
    fn test_memory_store_create_and_find() {
        let mut store = MemoryMarkerStore::new();
        let path = Path::new("docs/a.puml");

        assert!(store.find(path).unwrap().is_empty());

        let marker = store.create(path).unwrap();
        let found = store.find(path).unwrap();
        assert_eq!(found, vec![marker]);
        assert!(store.find(Path::new("docs/b.puml")).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_ids_are_unique() {
        let mut store = MemoryMarkerStore::new();
        let first = store.create(Path::new("a.puml")).unwrap();
        let second = store.create(Path::new("b.puml")).unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_memory_store_attributes() {
        let mut store = MemoryMarkerStore::new();
        let marker = store.create(Path::new("a.puml")).unwrap();

        store
            .set_attributes(marker.id(), target_attributes("a.svg"))
            .unwrap();

        assert_eq!(
            store.attribute(marker.id(), TARGET_PATH_ATTRIBUTE).unwrap(),
            Some(AttributeValue::from("a.svg"))
        );
        assert_eq!(
            store.attribute(marker.id(), DIAGRAM_SOURCE_ATTRIBUTE).unwrap(),
            None
        );
    }

    #[test]
    fn test_memory_store_unknown_marker() {
        let mut store = MemoryMarkerStore::new();
        let missing = MarkerId::new(42);

        assert!(matches!(
            store.attribute(missing, TARGET_PATH_ATTRIBUTE),
            Err(MarkerError::NotFound(id)) if id == missing
        ));
        assert!(store.set_attributes(missing, Attributes::new()).is_err());
        assert!(store.remove(missing).is_err());
    }

    #[test]
    fn test_memory_store_remove() {
        let mut store = MemoryMarkerStore::new();
        let marker = store.create(Path::new("a.puml")).unwrap();
        store.remove(marker.id()).unwrap();
        assert!(store.markers().unwrap().is_empty());
    }

    #[test]
    fn test_toml_store_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("markers.toml");

        let id = {
            let mut store = TomlMarkerStore::open(&path).unwrap();
            let marker = store.create(Path::new("docs/a.puml")).unwrap();
            let mut attributes = target_attributes("docs/a.png");
            attributes.insert(DIAGRAM_SOURCE_ATTRIBUTE.to_string(), "@startuml\n@enduml".into());
            attributes.insert("revision".to_string(), 3i64.into());
            store.set_attributes(marker.id(), attributes).unwrap();
            marker.id()
        };

        assert!(path.exists());

        let mut store = TomlMarkerStore::open(&path).unwrap();
        let markers = store.find(Path::new("docs/a.puml")).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id(), id);
        assert_eq!(markers[0].target(), Some("docs/a.png"));
        assert_eq!(
            markers[0].attribute("revision"),
            Some(&AttributeValue::Integer(3))
        );

        // Ids keep increasing after a reload.
        let next = store.create(Path::new("docs/b.puml")).unwrap();
        assert!(next.id() > id);
    }

    #[test]
    fn test_toml_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlMarkerStore::open(dir.path().join("markers.toml")).unwrap();
        assert!(store.markers().unwrap().is_empty());
    }

    #[test]
    fn test_toml_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.toml");
        fs::write(&path, "markers = 12").unwrap();

        assert!(matches!(
            TomlMarkerStore::open(&path),
            Err(MarkerError::Parse { .. })
        ));
    }

    #[test]
    fn test_toml_stores_sharing_a_file_keep_each_others_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.toml");

        let mut first = TomlMarkerStore::open(&path).unwrap();
        let mut second = TomlMarkerStore::open(&path).unwrap();

        let a = first.create(Path::new("a.puml")).unwrap();
        let b = second.create(Path::new("b.puml")).unwrap();
        assert_ne!(a.id(), b.id());

        first
            .set_attributes(a.id(), target_attributes("a.svg"))
            .unwrap();

        // Links made by the other store are visible without reopening.
        assert_eq!(first.find(Path::new("b.puml")).unwrap(), vec![b.clone()]);

        let reopened = TomlMarkerStore::open(&path).unwrap();
        let resources: Vec<_> = reopened
            .markers()
            .unwrap()
            .iter()
            .map(|marker| marker.resource().to_path_buf())
            .collect();
        assert_eq!(
            resources,
            vec![PathBuf::from("a.puml"), PathBuf::from("b.puml")]
        );
        assert_eq!(
            reopened.attribute(a.id(), TARGET_PATH_ATTRIBUTE).unwrap(),
            Some(AttributeValue::from("a.svg"))
        );

        second.remove(a.id()).unwrap();
        assert!(first.find(Path::new("a.puml")).unwrap().is_empty());
    }
}
