//! Diagram rendering.
//!
//! Layout and drawing are left to an external renderer. The sync layer only
//! needs two things from it: a raster image for a piece of diagram source,
//! and a vector (SVG) document for the same source. [`DiagramRenderer`] is
//! that seam; [`CommandRenderer`] fulfils it by piping the source through the
//! PlantUML command-line tool.

use std::{
    io::{self, Write},
    process::{ChildStdin, Command, ExitStatus, Stdio},
    thread,
};

use image::{DynamicImage, ImageFormat};
use log::{debug, trace};
use thiserror::Error;

use crate::config::RendererConfig;

/// Errors raised while rendering a diagram.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start renderer `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while talking to the renderer: {0}")]
    Io(#[from] io::Error),

    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("renderer produced no output")]
    EmptyOutput,

    #[error("failed to decode rendered image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Something that can turn diagram source text into images.
pub trait DiagramRenderer {
    /// Renders `source` to a raster image.
    fn render_image(&self, source: &str) -> Result<DynamicImage, RenderError>;

    /// Renders `source` to an SVG document.
    fn render_svg(&self, source: &str) -> Result<Vec<u8>, RenderError>;
}

/// Renders diagrams by running the PlantUML command in pipe mode.
///
/// The source is written to the child's stdin and the rendered document is
/// read from its stdout. Raster output is requested as PNG and decoded.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: String,
    args: Vec<String>,
}

impl CommandRenderer {
    /// Creates a renderer running `command` with extra `args` before the pipe flags.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Creates a renderer from the `[renderer]` configuration section.
    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.command(), config.args().to_vec())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn run(&self, source: &str, output_type: &str) -> Result<Vec<u8>, RenderError> {
        debug!(command = self.command, output_type; "Running renderer");

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg("-pipe")
            .arg(format!("-t{output_type}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // The input is fed from its own thread while this one drains stdout
        // and stderr; the renderer may emit output before reading all input.
        let stdin = child.stdin.take();
        let (output, fed) = thread::scope(|scope| {
            let writer = scope.spawn(move || feed(stdin, source.as_bytes()));
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output?;
        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        match fed {
            Ok(result) => result?,
            Err(_) => return Err(io::Error::other("renderer input thread panicked").into()),
        }
        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        trace!(bytes = output.stdout.len(); "Renderer output received");
        Ok(output.stdout)
    }
}

/// Writes `input` to the renderer and closes the pipe.
///
/// A renderer that exits early closes its end first; its exit status is the
/// more useful error in that case, so a broken pipe is not reported here.
fn feed(stdin: Option<ChildStdin>, input: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(input) {
        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => Err(err),
        _ => Ok(()),
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default())
    }
}

impl DiagramRenderer for CommandRenderer {
    fn render_image(&self, source: &str) -> Result<DynamicImage, RenderError> {
        let bytes = self.run(source, "png")?;
        Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Png)?)
    }

    fn render_svg(&self, source: &str) -> Result<Vec<u8>, RenderError> {
        self.run(source, "svg")
    }
}
