//! Writing rendered diagrams to their target files.
//!
//! The output format is chosen from the target's extension:
//!
//! - `svg` is rendered afresh from the diagram source as a vector document.
//! - `puml` and `plantuml` receive the diagram source itself.
//! - Anything else names the raster codec used to encode the rendered image.
//!
//! Output is fully encoded in memory before the target is touched, so a
//! failed render or an unknown codec leaves the target as it was.

use std::{
    io::{self, Cursor},
    path::Path,
};

use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use thiserror::Error;

use plantsync_core::store::MarkerStore;

use crate::{
    diagram::Diagram,
    marker::update_marker,
    render::RenderError,
    workspace::{Workspace, path_string},
};

/// Errors raised while writing a diagram to its target.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no image codec for extension `{extension}`")]
    UnsupportedFormat { extension: String },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// How a target file is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Vector document regenerated from the source.
    Svg,
    /// The diagram source, verbatim.
    Source,
    /// Raster image encoded with the given codec.
    Raster(ImageFormat),
}

impl OutputFormat {
    /// Chooses the output format for `path` from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::UnsupportedFormat`] when the extension names no
    /// image codec that can be written.
    pub fn for_path(path: &Path) -> Result<Self, SaveError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        // Case-insensitive on purpose: `flow.SVG` is an SVG, not an unknown codec.
        match extension.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "puml" | "plantuml" => Ok(Self::Source),
            _ => ImageFormat::from_extension(extension)
                .filter(|format| format.writing_enabled())
                .map(Self::Raster)
                .ok_or_else(|| SaveError::UnsupportedFormat {
                    extension: extension.to_string(),
                }),
        }
    }
}

/// Writes `diagram` to `target` in the format its extension asks for.
///
/// When `create` is false the target is only rewritten if it already exists.
/// After a successful write, the marker of `source` (if given, existing and
/// marked) is refreshed with the new text and target.
///
/// Returns `true` if the target was written.
///
/// # Errors
///
/// Returns an error if rendering or encoding fails, if the extension names
/// no known codec, or if the file cannot be written.
pub fn save_diagram_image(
    workspace: &mut Workspace,
    markers: &mut dyn MarkerStore,
    source: Option<&Path>,
    diagram: &mut Diagram,
    target: &Path,
    create: bool,
) -> Result<bool, SaveError> {
    if !create && !workspace.exists(target) {
        debug!(target = target.display().to_string(); "Target missing, not recreating it");
        return Ok(false);
    }

    let bytes = match OutputFormat::for_path(target)? {
        OutputFormat::Svg => diagram.svg()?,
        OutputFormat::Source => diagram.text().as_bytes().to_vec(),
        OutputFormat::Raster(format) => encode_image(diagram.image()?, format)?,
    };

    workspace
        .write_file(target, &bytes)
        .map_err(|source| SaveError::Write {
            path: path_string(target),
            source,
        })?;
    info!(target = path_string(target), bytes = bytes.len(); "Diagram saved");

    if let Some(source) = source.filter(|source| workspace.is_file(source)) {
        update_marker(markers, source, diagram.text(), Some(target), false, None);
    }

    Ok(true)
}

/// Encodes `image` with the codec `format`.
///
/// Codecs without an alpha channel get the image flattened to RGB first.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, SaveError> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);

    match format {
        ImageFormat::Jpeg | ImageFormat::Pnm => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut cursor, format)?
        }
        _ => image.write_to(&mut cursor, format)?,
    }

    Ok(bytes)
}
