// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export coordination.
//!
//! The [`Exporter`] refreshes connection tracking, resolves the graph, renders
//! every artifact in memory and only then hands them to an [`ArtifactSink`].
//! A render failure therefore never reaches the sink. [`FileSink`] stages
//! every artifact of an export in a temporary sibling and renames them into
//! place only once all of them are written, so a failed export leaves no
//! partial output behind.

use crate::render::{ExportFormat, RenderContext, RenderError, Rendered, Script};
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use storyweave_graph::{Graph, NodeId, RevisitPolicy, SequenceResolver, TooManyRoutes};

/// How the graph is turned into sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Follow single outputs from the start node; stop at the first branch
    #[default]
    Linear,
    /// One artifact per root-to-leaf route through the branches
    Routes,
}

/// What to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Output format
    pub format: ExportFormat,
    /// Linear or per-route
    pub mode: ExportMode,
    /// Renderer inputs
    pub context: RenderContext,
}

impl ExportRequest {
    /// Linear export with default render settings
    pub fn new(format: ExportFormat, generated: NaiveDateTime) -> Self {
        Self {
            format,
            mode: ExportMode::Linear,
            context: RenderContext::new(generated),
        }
    }

    /// Set the mode
    pub fn with_mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the render context
    pub fn with_context(mut self, context: RenderContext) -> Self {
        self.context = context;
        self
    }
}

/// A fully rendered artifact waiting to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Format of the content
    pub format: ExportFormat,
    /// 1-based route number in [`ExportMode::Routes`]
    pub route: Option<usize>,
    /// Content
    pub bytes: Vec<u8>,
}

/// Where artifacts end up
pub trait ArtifactSink {
    /// Store one artifact, returning a description of where it went
    fn write(&mut self, artifact: &Artifact) -> Result<String, ExportError>;

    /// Store every artifact of one export, or none of them
    fn write_all(&mut self, artifacts: &[Artifact]) -> Result<Vec<String>, ExportError> {
        artifacts.iter().map(|artifact| self.write(artifact)).collect()
    }
}

/// Keeps artifacts in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Stored artifacts, in write order
    pub artifacts: Vec<Artifact>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of the first artifact as text
    pub fn text(&self) -> Option<String> {
        self.artifacts
            .first()
            .map(|a| String::from_utf8_lossy(&a.bytes).into_owned())
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, artifact: &Artifact) -> Result<String, ExportError> {
        self.artifacts.push(artifact.clone());
        Ok(format!("memory:{}", self.artifacts.len()))
    }
}

/// Writes artifacts to disk
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Sink writing to `path` (or `stem_route{n}.ext` next to it for routes)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Final location of an artifact
    pub fn target(&self, artifact: &Artifact) -> PathBuf {
        let path = with_extension(&self.path, artifact.format.extension());
        let Some(route) = artifact.route else {
            return path;
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(
            "{stem}_route{route}.{}",
            artifact.format.extension()
        ))
    }
}

impl ArtifactSink for FileSink {
    fn write(&mut self, artifact: &Artifact) -> Result<String, ExportError> {
        let target = self.target(artifact);
        let location = target.display().to_string();
        write_atomic(&target, &artifact.bytes).map_err(|source| ExportError::Io {
            location: location.clone(),
            source,
        })?;
        tracing::debug!("Wrote {} bytes to {}", artifact.bytes.len(), location);
        Ok(location)
    }

    fn write_all(&mut self, artifacts: &[Artifact]) -> Result<Vec<String>, ExportError> {
        let targets: Vec<PathBuf> = artifacts.iter().map(|a| self.target(a)).collect();
        let io_error = |target: &Path, source: io::Error| ExportError::Io {
            location: target.display().to_string(),
            source,
        };

        let mut staged = Vec::with_capacity(targets.len());
        for (artifact, target) in artifacts.iter().zip(&targets) {
            match stage(target, &artifact.bytes) {
                Ok(temp) => staged.push(temp),
                Err(source) => {
                    discard(&staged);
                    return Err(io_error(target.as_path(), source));
                }
            }
        }

        for (index, (temp, target)) in staged.iter().zip(&targets).enumerate() {
            if let Err(source) = fs::rename(temp, target) {
                // Committed targets were overwritten; remove them too
                discard(&targets[..index]);
                discard(&staged[index..]);
                return Err(io_error(target.as_path(), source));
            }
        }

        Ok(targets.iter().map(|t| t.display().to_string()).collect())
    }
}

/// Append `.{extension}` unless the path already ends with it
fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let matches = path
        .extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
    if matches {
        return path.to_path_buf();
    }

    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = stage(target, bytes)?;
    let result = fs::rename(&temp, target);
    if result.is_err() {
        discard(&[temp]);
    }
    result
}

/// Write `bytes` to a hidden sibling of `target`, returning its path
fn stage(target: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    if let Err(e) = fs::write(&temp, bytes) {
        discard(&[temp]);
        return Err(e);
    }
    Ok(temp)
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            tracing::debug!("Could not remove {}: {e}", path.display());
        }
    }
}

/// Outcome of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Format written
    pub format: ExportFormat,
    /// Nodes rendered, summed over routes
    pub nodes: usize,
    /// Scene headings emitted, summed over routes
    pub scenes: usize,
    /// Number of artifacts
    pub routes: usize,
    /// Bytes written
    pub bytes: usize,
    /// Where each artifact went
    pub locations: Vec<String>,
}

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A renderer failed
    #[error("Failed to render: {0}")]
    Render(#[from] RenderError),

    /// Too many routes to export one file per route
    #[error(transparent)]
    TooManyRoutes(#[from] TooManyRoutes),

    /// Storing an artifact failed
    #[error("Failed to write {location}: {source}")]
    Io {
        /// Target location
        location: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Runs exports
#[derive(Debug, Clone, Copy, Default)]
pub struct Exporter {
    resolver: SequenceResolver,
}

impl Exporter {
    /// Exporter with a revisit policy for route exports
    pub fn new(policy: RevisitPolicy) -> Self {
        Self {
            resolver: SequenceResolver::new(policy),
        }
    }

    /// Set the most routes a route export may produce
    pub fn with_max_routes(mut self, max_routes: usize) -> Self {
        self.resolver = self.resolver.with_max_routes(max_routes);
        self
    }

    /// Refresh, resolve, render and store.
    ///
    /// Only the connection-tracking cache of `graph` is updated; nodes and
    /// edges are left untouched.
    pub fn export(
        &self,
        graph: &mut Graph,
        request: &ExportRequest,
        sink: &mut dyn ArtifactSink,
    ) -> Result<ExportReport, ExportError> {
        let duplicates = graph.duplicate_names();
        if !duplicates.is_empty() {
            tracing::warn!("Duplicate node names: {}", duplicates.join(", "));
        }

        let tracked = graph.refresh_connections();
        let routes: Vec<Vec<NodeId>> = match request.mode {
            ExportMode::Linear => vec![self.resolver.resolve_linear(&tracked).nodes],
            ExportMode::Routes => self.resolver.resolve_tree(&tracked)?.routes(),
        };

        let renderer = request.format.renderer();
        let rendered: Vec<Rendered> = routes
            .iter()
            .map(|route| renderer.render(&Script::from_sequence(&tracked, route), &request.context))
            .collect::<Result<_, _>>()?;

        let mut report = ExportReport {
            format: request.format,
            nodes: 0,
            scenes: 0,
            routes: rendered.len(),
            bytes: 0,
            locations: Vec::new(),
        };
        let mut artifacts = Vec::with_capacity(rendered.len());
        for (index, output) in rendered.into_iter().enumerate() {
            report.nodes += output.nodes;
            report.scenes += output.scenes;
            report.bytes += output.bytes.len();

            artifacts.push(Artifact {
                format: request.format,
                route: (request.mode == ExportMode::Routes).then_some(index + 1),
                bytes: output.bytes,
            });
        }
        report.locations = sink.write_all(&artifacts)?;

        tracing::info!(
            "Exported {} to {} ({} routes, {} nodes, {} scenes, {} bytes)",
            report.format,
            report.locations.join(", "),
            report.routes,
            report.nodes,
            report.scenes,
            report.bytes
        );
        Ok(report)
    }
}
