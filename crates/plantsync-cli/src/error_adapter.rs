//! Error adapter for converting PlantsyncError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use plantsync::{PlantsyncError, render::RenderError, save::SaveError};

/// Adapter giving a [`PlantsyncError`] a diagnostic code and, where useful, a hint.
pub struct ErrorAdapter<'a>(pub &'a PlantsyncError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            PlantsyncError::Io(_) => "plantsync::io",
            PlantsyncError::Config(_) => "plantsync::config",
            PlantsyncError::Marker(_) => "plantsync::marker",
            PlantsyncError::Render(_) => "plantsync::render",
            PlantsyncError::Save(SaveError::Render(_)) => "plantsync::render",
            PlantsyncError::Save(_) => "plantsync::save",
            PlantsyncError::Watch(_) => "plantsync::watch",
            PlantsyncError::NotFound(_) => "plantsync::not_found",
            PlantsyncError::OutsideWorkspace(_) => "plantsync::outside_workspace",
            PlantsyncError::NoDiagramText(_) => "plantsync::no_diagram",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            PlantsyncError::Render(RenderError::Spawn { .. })
            | PlantsyncError::Save(SaveError::Render(RenderError::Spawn { .. })) => {
                "install PlantUML or point `[renderer] command` at it in the configuration"
            }
            PlantsyncError::Save(SaveError::UnsupportedFormat { .. }) => {
                "use `svg`, `puml`, `plantuml` or an image extension such as `png`"
            }
            PlantsyncError::NoDiagramText(_) => {
                "the file needs a `@startuml` … `@enduml` block or a PlantUML extension"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}
