//! Error types for Plantsync operations.
//!
//! This module provides the main error type [`PlantsyncError`] which wraps
//! the error conditions of the individual stages.

use std::io;

use thiserror::Error;

use plantsync_core::MarkerError;

use crate::{render::RenderError, save::SaveError};

/// The main error type for Plantsync operations.
#[derive(Debug, Error)]
pub enum PlantsyncError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Marker error: {0}")]
    Marker(#[from] MarkerError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("File not found in workspace: {0}")]
    NotFound(String),

    #[error("Path is outside the workspace: {0}")]
    OutsideWorkspace(String),

    #[error("No diagram text found in {0}")]
    NoDiagramText(String),
}
