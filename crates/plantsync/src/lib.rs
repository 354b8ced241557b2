//! Plantsync - keeps rendered PlantUML outputs in sync with their sources.
//!
//! A source file is linked to a rendered target once, through
//! [`render_to_target`]. The link is stored as a marker on the source file.
//! From then on, content changes of the source delivered to an
//! [`AutoSaveListener`] re-render the target in the format its extension
//! names (SVG, a raster codec, or the raw diagram source).
//!
//! Diagram layout and drawing are delegated to an external renderer behind
//! the [`render::DiagramRenderer`] trait.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use plantsync::{
//!     ResourceDelta, Workspace, config::AppConfig, create_resource_listener,
//! };
//! use plantsync_core::store::MemoryMarkerStore;
//!
//! let config = AppConfig::default();
//! let mut workspace = Workspace::new("/path/to/project");
//! let mut markers = MemoryMarkerStore::new();
//! let mut listener = create_resource_listener(&config);
//!
//! let report = listener.resource_changed(
//!     &mut workspace,
//!     &mut markers,
//!     &[ResourceDelta::content_changed(Path::new("docs/flow.puml"))],
//! );
//! println!("{} target(s) updated", report.rendered);
//! ```

pub mod auto_save;
pub mod config;
pub mod diagram;
pub mod marker;
pub mod provider;
pub mod render;
pub mod request;
pub mod save;
pub mod workspace;

mod error;

pub use auto_save::{AutoSaveListener, BatchReport, DeltaKind, ResourceDelta};
pub use error::PlantsyncError;
pub use request::render_to_target;
pub use workspace::Workspace;

use std::rc::Rc;

use log::debug;

use config::AppConfig;
use provider::ProviderRegistry;
use render::CommandRenderer;

/// Creates a listener using the built-in providers and the configured renderer command.
pub fn create_resource_listener(config: &AppConfig) -> AutoSaveListener {
    let renderer = CommandRenderer::from_config(config.renderer());
    let providers = ProviderRegistry::with_defaults(config.providers());
    debug!(command = renderer.command(), providers = providers.len(); "Creating resource listener");

    AutoSaveListener::new(providers, Rc::new(renderer))
}
