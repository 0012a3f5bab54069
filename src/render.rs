//! External Renderer Bridge.
//!
//! Converts Graphviz DOT or Mermaid markup into an image by running `dot` or
//! `mmdc` against a scoped temporary input file.

use crate::log_debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Command;

/// Which external renderer a diagram needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    /// Node/edge graphs through Graphviz `dot`
    Graphviz,
    /// Sequence and flow diagrams through the Mermaid CLI
    Mermaid,
}

impl RenderEngine {
    pub const ALL: &'static [RenderEngine] = &[RenderEngine::Graphviz, RenderEngine::Mermaid];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Graphviz => "graphviz",
            Self::Mermaid => "mermaid",
        }
    }

    /// Executable looked up on `PATH` when none is configured
    pub const fn default_program(&self) -> &'static str {
        match self {
            Self::Graphviz => "dot",
            Self::Mermaid => "mmdc",
        }
    }

    const fn input_suffix(&self) -> &'static str {
        match self {
            Self::Graphviz => ".dot",
            Self::Mermaid => ".mmd",
        }
    }

    /// Where users get the renderer from
    pub const fn install_hint(&self) -> &'static str {
        match self {
            Self::Graphviz => "install Graphviz (https://graphviz.org/download/)",
            Self::Mermaid => "install the Mermaid CLI: npm install -g @mermaid-js/mermaid-cli",
        }
    }
}

impl fmt::Display for RenderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output format for rendered diagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    /// Get file extension for this format
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(format!(
                "Unknown image format: {s}. Supported: png, svg, pdf"
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{engine} renderer '{program}' was not found on PATH; {}", engine.install_hint())]
    RendererMissing {
        engine: RenderEngine,
        program: String,
    },
    #[error("{engine} rejected the diagram markup: {stderr}")]
    Syntax {
        engine: RenderEngine,
        stderr: String,
    },
    #[error("Renderer finished but produced no file at '{}'", .0.display())]
    MissingArtifact(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// One rendering request; the output path's extension is taken from `format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub markup: String,
    pub engine: RenderEngine,
    pub format: ImageFormat,
    pub output_path: PathBuf,
}

impl RenderJob {
    /// Build a job writing to `output_base` plus the format's extension
    pub fn new(
        markup: impl Into<String>,
        engine: RenderEngine,
        format: ImageFormat,
        output_base: &Path,
    ) -> Self {
        Self {
            markup: markup.into(),
            engine,
            format,
            output_path: output_base.with_extension(format.extension()),
        }
    }
}

/// Runs renderer executables; holds no per-request state
#[derive(Debug, Clone)]
pub struct Renderer {
    graphviz_program: String,
    mermaid_program: String,
    background: String,
    temp_dir: Option<PathBuf>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            graphviz_program: RenderEngine::Graphviz.default_program().to_string(),
            mermaid_program: RenderEngine::Mermaid.default_program().to_string(),
            background: "white".to_string(),
            temp_dir: None,
        }
    }
}

impl Renderer {
    #[must_use]
    pub fn with_program(mut self, engine: RenderEngine, program: impl Into<String>) -> Self {
        let program = program.into();
        if !program.trim().is_empty() {
            match engine {
                RenderEngine::Graphviz => self.graphviz_program = program,
                RenderEngine::Mermaid => self.mermaid_program = program,
            }
        }
        self
    }

    /// Background colour passed to `mmdc -b`
    #[must_use]
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Directory for temporary markup files (the system temp dir when unset)
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn program(&self, engine: RenderEngine) -> &str {
        match engine {
            RenderEngine::Graphviz => &self.graphviz_program,
            RenderEngine::Mermaid => &self.mermaid_program,
        }
    }

    /// Locate the executable for `engine` without running it
    pub fn locate(&self, engine: RenderEngine) -> Result<PathBuf, RenderError> {
        let program = self.program(engine);
        which::which(program).map_err(|_| RenderError::RendererMissing {
            engine,
            program: program.to_string(),
        })
    }

    /// Render `job`, returning the path of the produced image.
    ///
    /// The temporary markup file is removed on every return path.
    pub async fn render(&self, job: &RenderJob) -> Result<PathBuf, RenderError> {
        let executable = self.locate(job.engine)?;

        if let Some(parent) = job.output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                RenderError::io(
                    format!("Failed to create output directory {}", parent.display()),
                    e,
                )
            })?;
        }

        let input = self.write_input(job)?;
        let args = self.arguments(job, input.path());
        log_debug!("Running {} {:?}", executable.display(), args);

        let output = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::RendererMissing {
                        engine: job.engine,
                        program: self.program(job.engine).to_string(),
                    }
                } else {
                    RenderError::io(format!("Failed to run {}", executable.display()), e)
                }
            })?;
        drop(input);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            log_debug!("{} exited with {}: {}", job.engine, output.status, detail);
            return Err(RenderError::Syntax {
                engine: job.engine,
                stderr: detail,
            });
        }

        if !job.output_path.is_file() {
            return Err(RenderError::MissingArtifact(job.output_path.clone()));
        }

        log_debug!("Rendered {}", job.output_path.display());
        Ok(job.output_path.clone())
    }

    fn write_input(&self, job: &RenderJob) -> Result<tempfile::NamedTempFile, RenderError> {
        let mut builder = tempfile::Builder::new();
        builder
            .prefix("code-explainer-")
            .suffix(job.engine.input_suffix());
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| RenderError::io("Failed to create temporary markup file", e))?;

        file.write_all(job.markup.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| RenderError::io("Failed to write temporary markup file", e))?;
        Ok(file)
    }

    fn arguments(&self, job: &RenderJob, input: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = job.output_path.display().to_string();
        match job.engine {
            RenderEngine::Graphviz => vec![
                format!("-T{}", job.format.extension()),
                input,
                "-o".to_string(),
                output,
            ],
            RenderEngine::Mermaid => vec![
                "-i".to_string(),
                input,
                "-o".to_string(),
                output,
                "-b".to_string(),
                self.background.clone(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_output_path_takes_format_extension() {
        let job = RenderJob::new(
            "digraph G {}",
            RenderEngine::Graphviz,
            ImageFormat::Svg,
            Path::new("out/call_graph_image_1a2b3c4d"),
        );
        assert_eq!(job.output_path, PathBuf::from("out/call_graph_image_1a2b3c4d.svg"));
    }

    #[test]
    fn test_arguments_per_engine() {
        let renderer = Renderer::default().with_background("transparent");
        let dot = RenderJob::new("", RenderEngine::Graphviz, ImageFormat::Png, Path::new("g"));
        assert_eq!(
            renderer.arguments(&dot, Path::new("in.dot")),
            vec!["-Tpng", "in.dot", "-o", "g.png"]
        );

        let mermaid = RenderJob::new("", RenderEngine::Mermaid, ImageFormat::Svg, Path::new("m"));
        assert_eq!(
            renderer.arguments(&mermaid, Path::new("in.mmd")),
            vec!["-i", "in.mmd", "-o", "m.svg", "-b", "transparent"]
        );
    }

    #[test]
    fn test_image_format_parse() {
        assert_eq!("SVG".parse::<ImageFormat>(), Ok(ImageFormat::Svg));
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_renderer_missing() {
        let renderer = Renderer::default()
            .with_program(RenderEngine::Graphviz, "definitely-not-a-real-dot-binary");
        let job = RenderJob::new(
            "digraph G { a -> b }",
            RenderEngine::Graphviz,
            ImageFormat::Png,
            &std::env::temp_dir().join("never_written"),
        );
        let err = renderer.render(&job).await.expect_err("renderer is missing");
        assert!(matches!(
            err,
            RenderError::RendererMissing {
                engine: RenderEngine::Graphviz,
                ..
            }
        ));
    }
}
