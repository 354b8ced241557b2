//! Error type for marker store operations.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::marker::MarkerId;

/// Errors raised by a [`MarkerStore`](crate::store::MarkerStore).
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker {0} does not exist")]
    NotFound(MarkerId),

    #[error("failed to access marker file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse marker file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize markers: {0}")]
    Serialize(String),
}

impl MarkerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
