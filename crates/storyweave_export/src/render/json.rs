// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON node-sequence renderer.

use super::{
    input_from, output_to, scene_type_label, ExportFormat, RenderContext, RenderError, Rendered,
    Renderer, Script,
};
use serde::Serialize;
use storyweave_graph::{ContentItem, Node};

/// Renders the structured node sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct Export<'a> {
    metadata: Metadata<'a>,
    sequence: Vec<Entry<'a>>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    title: &'a str,
    generated: String,
    total_nodes: usize,
    version: &'a str,
}

#[derive(Serialize)]
struct Entry<'a> {
    sequence_number: usize,
    name: &'a str,
    #[serde(rename = "type")]
    node_type: &'static str,
    scene_type: &'static str,
    scene_name: &'a str,
    time_description: &'a str,
    in_scene: &'a str,
    out_scene: &'a str,
    background: &'a str,
    content: &'a [ContentItem],
    connections: Connections<'a>,
}

#[derive(Serialize)]
struct Connections<'a> {
    input_from: Option<&'a str>,
    output_to: OutputTo<'a>,
}

/// A single name (or null) for linear nodes, a list for branches
#[derive(Serialize)]
#[serde(untagged)]
enum OutputTo<'a> {
    Single(Option<&'a str>),
    Many(Vec<&'a str>),
}

impl<'a> Entry<'a> {
    fn new(sequence_number: usize, node: &'a Node) -> Self {
        let form = &node.form;
        let output_to = if node.kind.is_branch() {
            OutputTo::Many(output_to(node))
        } else {
            OutputTo::Single(output_to(node).first().copied())
        };

        Self {
            sequence_number,
            name: &node.name,
            node_type: node.kind.label(),
            scene_type: scene_type_label(node),
            scene_name: &form.name,
            time_description: &form.time_description,
            in_scene: form.in_scene.as_str(),
            out_scene: form.out_scene.as_str(),
            background: &form.background,
            content: &form.items,
            connections: Connections {
                input_from: input_from(node),
                output_to,
            },
        }
    }
}

impl Renderer for JsonRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, script: &Script<'_>, ctx: &RenderContext) -> Result<Rendered, RenderError> {
        let export = Export {
            metadata: Metadata {
                title: &ctx.json_title,
                generated: ctx.generated.format("%Y-%m-%d %H:%M:%S").to_string(),
                total_nodes: script.len(),
                version: &ctx.format_version,
            },
            sequence: script
                .nodes()
                .iter()
                .copied()
                .enumerate()
                .map(|(index, node)| Entry::new(index + 1, node))
                .collect(),
        };

        let bytes = serde_json::to_vec_pretty(&export)?;
        Ok(Rendered {
            bytes,
            nodes: script.len(),
            scenes: 0,
        })
    }
}
