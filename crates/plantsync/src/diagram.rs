//! A diagram's source text together with its rendered forms.

use std::{fmt, rc::Rc};

use image::DynamicImage;
use log::debug;

use crate::render::{DiagramRenderer, RenderError};

/// Holds the current diagram source and renders it on demand.
///
/// The raster image is rendered the first time it is asked for and cached
/// until the source text changes. Vector output is never cached; it is
/// regenerated from the source on every call.
pub struct Diagram {
    renderer: Rc<dyn DiagramRenderer>,
    text: String,
    image: Option<DynamicImage>,
}

impl Diagram {
    /// Creates an empty diagram rendered by `renderer`.
    pub fn new(renderer: Rc<dyn DiagramRenderer>) -> Self {
        Self {
            renderer,
            text: String::new(),
            image: None,
        }
    }

    /// Creates a diagram with the given source text.
    pub fn with_text(renderer: Rc<dyn DiagramRenderer>, text: impl Into<String>) -> Self {
        let mut diagram = Self::new(renderer);
        diagram.set_text(text);
        diagram
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the source text, dropping the cached image if it changed.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.image = None;
        }
    }

    /// Returns the raster rendering of the current text.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error if the image cannot be produced.
    pub fn image(&mut self) -> Result<&DynamicImage, RenderError> {
        let image = match self.image.take() {
            Some(image) => image,
            None => {
                debug!(bytes = self.text.len(); "Rendering diagram image");
                self.renderer.render_image(&self.text)?
            }
        };
        Ok(self.image.insert(image))
    }

    /// Renders the current text as SVG.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error if the document cannot be produced.
    pub fn svg(&self) -> Result<Vec<u8>, RenderError> {
        debug!(bytes = self.text.len(); "Rendering diagram SVG");
        self.renderer.render_svg(&self.text)
    }
}

impl fmt::Debug for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagram")
            .field("text", &self.text)
            .field("image_cached", &self.image.is_some())
            .finish()
    }
}
