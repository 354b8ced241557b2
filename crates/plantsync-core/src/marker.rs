//! Marker records attached to workspace files.
//!
//! A [`Marker`] is a small key-value record attached to a single file. Plantsync
//! uses one marker per diagram source to remember where its rendered output
//! lives, so that later edits to the source can regenerate that output.
//!
//! # Example
//!
//! ```
//! # use plantsync_core::marker::{AttributeValue, Marker, MarkerId, TARGET_PATH_ATTRIBUTE};
//! let mut marker = Marker::new(MarkerId::new(1), "docs/flow.puml");
//! marker
//!     .attributes_mut()
//!     .insert(TARGET_PATH_ATTRIBUTE.to_string(), "docs/flow.svg".into());
//!
//! assert_eq!(marker.target(), Some("docs/flow.svg"));
//! ```

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Kind name of the markers maintained by Plantsync.
pub const PLANTUML_MARKER: &str = "plantumlmarker";

/// Attribute holding the workspace path of the file the marker belongs to.
pub const ORIGINAL_PATH_ATTRIBUTE: &str = "original";

/// Attribute holding the diagram source text last rendered for the file.
pub const DIAGRAM_SOURCE_ATTRIBUTE: &str = "diagramSource";

/// Attribute holding the workspace path of the rendered output.
pub const TARGET_PATH_ATTRIBUTE: &str = "target";

/// Attribute set of a marker, ordered by key.
///
/// An absent key means the attribute is undefined; there is no explicit null.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Identifier of a marker, unique within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(u64);

impl MarkerId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single marker attribute value.
///
/// Mirrors the value kinds a marker attribute may carry: text, integers
/// and booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl AttributeValue {
    /// Returns the contained string, or `None` for non-string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value:?}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A marker attached to a workspace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    id: MarkerId,

    /// Workspace-relative path of the file carrying this marker.
    resource: PathBuf,

    #[serde(default)]
    attributes: Attributes,
}

impl Marker {
    /// Creates a marker with no attributes.
    pub fn new(id: MarkerId, resource: impl Into<PathBuf>) -> Self {
        Self {
            id,
            resource: resource.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Returns the path of the file this marker is attached to.
    pub fn resource(&self) -> &Path {
        &self.resource
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Returns the value stored under `key`, if any.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Returns the recorded target path when it is a string attribute.
    pub fn target(&self) -> Option<&str> {
        self.attribute(TARGET_PATH_ATTRIBUTE)
            .and_then(AttributeValue::as_str)
    }

    /// Replaces the whole attribute set.
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }
}
