// SPDX-License-Identifier: MIT OR Apache-2.0
//! CSV renderer, one row per content item.

use super::{
    input_from, output_to, scene_type_label, ExportFormat, RenderContext, RenderError, Rendered,
    Renderer, Script,
};
use csv::{Terminator, WriterBuilder};
use storyweave_graph::ContentItem;

/// Column header
pub const HEADER: [&str; 16] = [
    "Sequence",
    "Node Name",
    "Type",
    "Scene Type",
    "Scene Name",
    "Time Description",
    "In Scene",
    "Out Scene",
    "Background",
    "Item Order",
    "Item Type",
    "Character",
    "Parentheticals",
    "Text",
    "Input From",
    "Output To",
];

/// Renders the denormalized spreadsheet view
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl Renderer for CsvRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, script: &Script<'_>, _ctx: &RenderContext) -> Result<Rendered, RenderError> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());
        writer.write_record(HEADER)?;

        for (index, node) in script.nodes().iter().enumerate() {
            let form = &node.form;
            let sequence = (index + 1).to_string();
            let scene = [
                sequence.as_str(),
                node.name.as_str(),
                node.kind.label(),
                scene_type_label(node),
                form.name.as_str(),
                form.time_description.as_str(),
                form.in_scene.as_str(),
                form.out_scene.as_str(),
                form.background.as_str(),
            ];
            let input = input_from(node).unwrap_or_default();
            let output = output_to(node).join("; ");

            if form.items.is_empty() {
                let blank = ["", "", "", "", ""];
                writer.write_record(scene.iter().chain(&blank).chain(&[input, output.as_str()]))?;
                continue;
            }

            for item in &form.items {
                let order = item.order().map(|o| o.to_string()).unwrap_or_default();
                let (character, parentheticals) = match item {
                    ContentItem::Dialog {
                        character,
                        parentheticals,
                        ..
                    } => (character.as_str(), parentheticals.as_str()),
                    ContentItem::Action { .. } => ("", ""),
                };
                let columns = [
                    order.as_str(),
                    item.type_label(),
                    character,
                    parentheticals,
                    item.text(),
                    input,
                    output.as_str(),
                ];
                writer.write_record(scene.iter().chain(&columns))?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| RenderError::Csv(e.into_error().into()))?;
        Ok(Rendered {
            bytes,
            nodes: script.len(),
            scenes: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use storyweave_graph::Node;

    fn rows(script: &Script<'_>) -> Vec<Vec<String>> {
        let rendered = CsvRenderer.render(script, &RenderContext::new(generated())).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(rendered.bytes.as_slice());
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_header() {
        let rows = rows(&Script::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], HEADER.map(str::to_string).to_vec());
    }

    #[test]
    fn test_one_row_per_item() {
        let node = node_with_items(
            "Scene",
            vec![
                ContentItem::dialog("Bob", "Hi, \"you\"").with_order(1).with_parentheticals("grins"),
                ContentItem::action("He sits.").with_order(2),
                ContentItem::action("Line one\nline two").with_order(3),
            ],
        );
        let rows = rows(&Script::new(vec![&node]));
        assert_eq!(rows.len(), 4);

        let body = &rows[1..];
        for row in body {
            assert_eq!(row.len(), 16);
            assert_eq!(row[..9], body[0][..9]);
        }
        assert_eq!(body[0][9..14], ["1", "dialog", "Bob", "grins", "Hi, \"you\""]);
        assert_eq!(body[1][9..14], ["2", "action", "", "", "He sits."]);
        assert_eq!(body[2][13], "Line one\nline two");
    }

    #[test]
    fn test_node_without_items_has_one_blank_row() {
        let (graph, ids) = two_scenes();
        let rows = rows(&Script::from_sequence(&graph, &ids));
        assert_eq!(rows.len(), 4);

        let start = &rows[1];
        assert_eq!(start[..4], ["1", "Start", "Start Node", ""]);
        assert!(start[9..14].iter().all(String::is_empty));
        assert_eq!(start[14], "");
        assert_eq!(start[15], "SceneA");

        assert_eq!(rows[3][14], "SceneA");
        assert_eq!(rows[3][15], "");
    }

    #[test]
    fn test_branch_outputs_joined() {
        let mut graph = storyweave_graph::Graph::with_start_node("Story");
        let start = graph.start_node().unwrap().id;
        let branch = graph.add_node(Node::branch("Choice", 2)).unwrap();
        graph.connect_nodes(start, 0, branch).unwrap();
        graph.create_connected_node(branch, 0, "Stay").unwrap();
        graph.create_connected_node(branch, 1, "Go").unwrap();
        graph.refresh_connections();

        let rows = rows(&Script::from_sequence(&graph, &[start, branch]));
        assert_eq!(rows[2][15], "Stay; Go");
    }

    #[test]
    fn test_crlf_terminator() {
        let rendered = CsvRenderer
            .render(&Script::default(), &RenderContext::new(generated()))
            .unwrap();
        assert!(rendered.bytes.ends_with(b"Output To\r\n"));
    }
}
