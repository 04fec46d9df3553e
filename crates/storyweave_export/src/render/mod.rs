// SPDX-License-Identifier: MIT OR Apache-2.0
//! Format renderers.
//!
//! Every renderer turns one resolved [`Script`] into a complete in-memory
//! artifact. Renderers never touch the filesystem; output is a pure function
//! of the script and the [`RenderContext`], timestamp included.

pub mod csv;
pub mod json;
pub mod layout;
pub mod text;

use crate::scene::{SceneHeading, SceneTracker};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use storyweave_graph::{ContentItem, Graph, Node, NodeId};

pub use self::csv::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::layout::{LayoutDocument, LayoutRenderer};
pub use self::text::TextRenderer;

/// Title line of the text and layout screenplay
pub const DEFAULT_TITLE: &str = "VISUAL NOVEL SCREENPLAY";

/// `metadata.title` of the JSON export
pub const DEFAULT_JSON_TITLE: &str = "Visual Novel Node Sequence";

/// `metadata.version` of the JSON export
pub const DEFAULT_FORMAT_VERSION: &str = "1.0";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain-text screenplay
    #[default]
    Text,
    /// Structured node sequence
    Json,
    /// One row per content item
    Csv,
    /// Paginated layout model (RON)
    Layout,
}

impl ExportFormat {
    /// All formats
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Text,
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Layout,
    ];

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Layout => "ron",
        }
    }

    /// File name used when no output path is given
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ExportFormat::Text => "screenplay.txt",
            ExportFormat::Json => "node_sequence.json",
            ExportFormat::Csv => "node_sequence.csv",
            ExportFormat::Layout => "screenplay.layout.ron",
        }
    }

    /// Renderer for this format
    pub fn renderer(&self) -> Box<dyn Renderer> {
        match self {
            ExportFormat::Text => Box::new(TextRenderer),
            ExportFormat::Json => Box::new(JsonRenderer),
            ExportFormat::Csv => Box::new(CsvRenderer),
            ExportFormat::Layout => Box::new(LayoutRenderer),
        }
    }

    /// Short name
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Layout => "layout",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "layout" | "pdf" | "ron" => Ok(ExportFormat::Layout),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Format name that is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown export format '{0}' (expected text, json, csv or layout)")]
pub struct UnknownFormat(pub String);

/// The ordered nodes of one resolved sequence
#[derive(Debug, Clone, Default)]
pub struct Script<'a> {
    nodes: Vec<&'a Node>,
}

impl<'a> Script<'a> {
    /// Wrap an ordered node list
    pub fn new(nodes: Vec<&'a Node>) -> Self {
        Self { nodes }
    }

    /// Look up a sequence of node IDs, skipping any that are gone
    pub fn from_sequence(graph: &'a Graph, ids: &[NodeId]) -> Self {
        Self::new(ids.iter().filter_map(|id| graph.node(*id)).collect())
    }

    /// Nodes in export order
    pub fn nodes(&self) -> &[&'a Node] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the script has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Inputs every renderer shares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Screenplay title
    pub title: String,
    /// JSON metadata title
    pub json_title: String,
    /// JSON metadata version
    pub format_version: String,
    /// Generation timestamp printed in the artifacts
    pub generated: NaiveDateTime,
    /// Dialog wrap width (text only)
    pub dialog_width: usize,
    /// Action wrap width (text only)
    pub action_width: usize,
}

impl RenderContext {
    /// Default context stamped with `generated`
    pub fn new(generated: NaiveDateTime) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            json_title: DEFAULT_JSON_TITLE.to_string(),
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            generated,
            dialog_width: crate::wrap::DIALOG_WIDTH,
            action_width: crate::wrap::ACTION_WIDTH,
        }
    }
}

/// A rendered artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Artifact content
    pub bytes: Vec<u8>,
    /// Nodes rendered
    pub nodes: usize,
    /// Scene headings emitted
    pub scenes: usize,
}

/// Error while rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Text formatting failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] fmt::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// RON serialization failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
}

/// Renders a script into one format
pub trait Renderer {
    /// Format produced
    fn format(&self) -> ExportFormat;

    /// Render the whole script in memory
    fn render(&self, script: &Script<'_>, ctx: &RenderContext) -> Result<Rendered, RenderError>;
}

/// One element of the screenplay, shared by the text and layout renderers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    /// Transition into a scene, e.g. `FADE IN:`
    TransitionIn(String),
    /// New scene heading
    Heading(SceneHeading),
    /// Setting description
    Background(&'a str),
    /// A spoken line
    Dialog {
        /// Character name, upper-cased
        character: String,
        /// Delivery note without parentheses, possibly empty
        parenthetical: &'a str,
        /// Spoken text, possibly empty
        text: &'a str,
    },
    /// Action description
    Action(&'a str),
    /// Transition out of a scene, e.g. `CUT TO:`
    TransitionOut(String),
    /// Gap between two nodes
    NodeBreak,
}

/// Walk a script into screenplay blocks.
///
/// Returns the blocks and the number of scene headings emitted. Nodes with a
/// blank form contribute nothing but the break after them; dialog without a
/// character is skipped.
pub fn screenplay_blocks<'a>(script: &Script<'a>) -> (Vec<Block<'a>>, usize) {
    let mut blocks = Vec::new();
    let mut scenes = SceneTracker::new();
    let count = script.len();

    for (index, node) in script.nodes().iter().copied().enumerate() {
        let form = &node.form;
        if !form.is_blank() {
            if let Some(cue) = form.in_scene.cue() {
                blocks.push(Block::TransitionIn(cue));
            }
            if let Some(heading) = scenes.heading(form) {
                blocks.push(Block::Heading(heading));
            }
            if !form.background.is_empty() {
                blocks.push(Block::Background(&form.background));
            }

            for item in &form.items {
                match item {
                    ContentItem::Dialog {
                        character,
                        parentheticals,
                        text,
                        ..
                    } => {
                        if character.is_empty() {
                            continue;
                        }
                        blocks.push(Block::Dialog {
                            character: character.to_uppercase(),
                            parenthetical: parentheticals,
                            text,
                        });
                    }
                    ContentItem::Action { text, .. } => {
                        if !text.is_empty() {
                            blocks.push(Block::Action(text));
                        }
                    }
                }
            }

            if let Some(cue) = form.out_scene.cue() {
                blocks.push(Block::TransitionOut(cue));
            }
        }

        if index + 1 < count {
            blocks.push(Block::NodeBreak);
        }
    }

    (blocks, scenes.scenes())
}

/// `input_from` name of a node
pub(crate) fn input_from(node: &Node) -> Option<&str> {
    node.input_connected_node()
}

/// `output_to` names of a node: all outputs for a branch, at most one otherwise
pub(crate) fn output_to(node: &Node) -> Vec<&str> {
    if node.kind.is_branch() {
        node.output_connected_nodes()
    } else {
        node.output_connected_node().into_iter().collect()
    }
}

/// Scene type column: empty for a blank form
pub(crate) fn scene_type_label(node: &Node) -> &'static str {
    if node.form.is_blank() {
        ""
    } else {
        node.form.scene_type.as_str()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use storyweave_graph::{OutTransition, SceneForm, SceneType};

    #[test]
    fn test_format_names() {
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Layout);
        assert!("docx".parse::<ExportFormat>().is_err());
        for format in ExportFormat::ALL {
            assert_eq!(format.name().parse::<ExportFormat>().unwrap(), format);
            assert_eq!(format.renderer().format(), format);
            assert!(format.default_file_name().ends_with(format.extension()));
        }
    }

    #[test]
    fn test_blocks_follow_item_order() {
        let node = node_with_items(
            "Scene",
            vec![
                ContentItem::action("First."),
                ContentItem::dialog("bob", "Second.").with_parentheticals("quietly"),
                ContentItem::action("Third."),
            ],
        );
        let script = Script::new(vec![&node]);
        let (blocks, scenes) = screenplay_blocks(&script);

        assert_eq!(scenes, 1);
        assert_eq!(
            blocks,
            vec![
                Block::Heading(SceneHeading {
                    number: 1,
                    text: "EXT. STREET".to_string()
                }),
                Block::Background("Rain."),
                Block::Action("First."),
                Block::Dialog {
                    character: "BOB".to_string(),
                    parenthetical: "quietly",
                    text: "Second.",
                },
                Block::Action("Third."),
            ]
        );
    }

    #[test]
    fn test_blank_nodes_only_break() {
        let blank = Node::linear("Blank");
        let custom = Node::linear("Custom").with_form(
            SceneForm::new(SceneType::Int, "")
                .with_transitions(Default::default(), OutTransition::Custom("SMASH CUT".into())),
        );
        let script = Script::new(vec![&blank, &custom, &blank]);
        let (blocks, scenes) = screenplay_blocks(&script);

        assert_eq!(scenes, 0);
        assert_eq!(
            blocks,
            vec![
                Block::NodeBreak,
                Block::TransitionOut("SMASH CUT:".to_string()),
                Block::NodeBreak,
            ]
        );
    }

    #[test]
    fn test_dialog_without_character_is_skipped() {
        let node = node_with_items("Scene", vec![ContentItem::dialog("", "Who said that?")]);
        let (blocks, _) = screenplay_blocks(&Script::new(vec![&node]));
        assert!(!blocks.iter().any(|b| matches!(b, Block::Dialog { .. })));
    }

    #[test]
    fn test_script_from_sequence() {
        let (graph, ids) = two_scenes();
        let script = Script::from_sequence(&graph, &ids);
        assert_eq!(script.len(), 3);
        assert_eq!(script.nodes()[1].name, "SceneA");
    }
}
