// SPDX-License-Identifier: MIT OR Apache-2.0
//! Screenplay export for `StoryWeave`.
//!
//! Turns a resolved scene sequence into artifacts:
//! - Plain-text screenplay with fixed-width layout
//! - JSON node sequence
//! - CSV with one row per content item
//! - Page layout model (RON) for a typesetter
//!
//! [`Exporter`] drives a whole export: refresh tracking, resolve, render in
//! memory, then store through an [`ArtifactSink`].

pub mod wrap;
pub mod scene;
pub mod render;
pub mod coordinator;
pub mod settings;

pub use scene::{SceneHeading, SceneTracker};
pub use render::{
    ExportFormat, LayoutDocument, RenderContext, RenderError, Rendered, Renderer, Script,
};
pub use coordinator::{
    Artifact, ArtifactSink, ExportError, ExportMode, ExportReport, ExportRequest, Exporter,
    FileSink, MemorySink,
};
pub use settings::ExportSettings;
