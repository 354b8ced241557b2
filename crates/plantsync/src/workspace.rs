//! The directory tree Plantsync operates on.
//!
//! Every path handed to the sync layer is relative to the [`Workspace`] root.
//! The workspace also remembers which files it generated itself ("derived"
//! files), so the watcher can ignore changes to rendered outputs.

use std::{
    collections::BTreeSet,
    fs, io,
    io::Write,
    path::{Component, Path, PathBuf},
};

use log::trace;

/// Name of the directory holding Plantsync's own state inside a workspace.
pub const STATE_DIR: &str = ".plantsync";

/// A workspace rooted at a directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    derived: BTreeSet<PathBuf>,
}

impl Workspace {
    /// Creates a workspace rooted at `root`.
    ///
    /// The root is used as given; callers that compare against absolute
    /// filesystem paths (such as watcher events) should canonicalize it first.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            derived: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the filesystem location of a workspace path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Converts a filesystem path into a normalized workspace path.
    ///
    /// Relative paths are taken as already relative to the root. Absolute
    /// paths outside the root, and paths whose `..` climbs above it, yield
    /// `None`.
    pub fn relativize(&self, path: &Path) -> Option<PathBuf> {
        if path.is_relative() {
            return normalize(path);
        }
        normalize(path.strip_prefix(&self.root).ok()?)
    }

    /// Returns `true` for paths inside the state directory.
    pub fn is_state_path(&self, path: &Path) -> bool {
        matches!(path.components().next(), Some(Component::Normal(first)) if first == STATE_DIR)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    pub fn is_file(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    pub fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.resolve(path))
    }

    /// Creates or replaces the file at `path` with `bytes` and flags it derived.
    ///
    /// Missing parent directories are created. The new content is written to a
    /// temporary file next to the target and renamed into place, so readers
    /// never observe a partially written file.
    pub fn write_file(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let full_path = self.resolve(path);
        let dir = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(bytes)?;
        file.persist(&full_path).map_err(|err| err.error)?;

        trace!(path = path.display().to_string(), bytes = bytes.len(); "File written");
        self.set_derived(path, true);
        Ok(())
    }

    /// Flags or unflags `path` as a generated artifact.
    pub fn set_derived(&mut self, path: &Path, derived: bool) {
        if derived {
            self.derived.insert(path.to_path_buf());
        } else {
            self.derived.remove(path);
        }
    }

    pub fn is_derived(&self, path: &Path) -> bool {
        self.derived.contains(path)
    }
}

/// Resolves `.` and `..` in a relative workspace path without touching the
/// filesystem.
///
/// Returns `None` for absolute paths and for paths that leave the root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

/// Formats a workspace path with `/` separators, as stored in marker attributes.
///
/// The path is expected to be normalized; see [`normalize`].
pub fn path_string(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
