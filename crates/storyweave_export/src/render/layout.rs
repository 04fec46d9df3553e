// SPDX-License-Identifier: MIT OR Apache-2.0
//! Paginated layout renderer.
//!
//! Produces a [`LayoutDocument`]: page geometry, named paragraph styles and
//! the ordered `(style, text)` paragraphs of the screenplay. Line breaking and
//! pagination are left to whatever typesetter consumes the document, so no
//! fixed-width wrapping happens here. Paragraph text is NFC-normalized so
//! decomposed input (combining marks, Thai vowel and tone signs) reaches the
//! typesetter in composed form.

use super::{screenplay_blocks, Block, ExportFormat, RenderContext, RenderError, Rendered, Renderer, Script};
use indexmap::IndexMap;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Points per inch
pub const INCH: f32 = 72.0;

/// Paragraph style names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleTag {
    /// Document title
    Title,
    /// Line under the title
    Subtitle,
    /// Scene heading
    SceneHeading,
    /// Speaking character
    Character,
    /// Delivery note
    Parenthetical,
    /// Spoken line
    Dialog,
    /// Action and background description
    Action,
    /// Transition into a scene
    TransitionIn,
    /// Transition out of a scene
    TransitionOut,
    /// Closing `END`
    End,
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Flush left
    Left,
    /// Centered
    Center,
    /// Flush right
    Right,
}

/// Typographic attributes of a paragraph style. Lengths are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    /// Font family
    pub font: String,
    /// Font size
    pub size: f32,
    /// Bold face
    pub bold: bool,
    /// Italic face
    pub italic: bool,
    /// Alignment
    pub alignment: Alignment,
    /// Left indent
    pub left_indent: f32,
    /// Right indent
    pub right_indent: f32,
    /// Space above the paragraph
    pub space_before: f32,
    /// Space below the paragraph
    pub space_after: f32,
    /// Baseline-to-baseline distance
    pub leading: f32,
}

impl ParagraphStyle {
    fn body(size: f32) -> Self {
        Self {
            font: "Helvetica".to_string(),
            size,
            bold: false,
            italic: false,
            alignment: Alignment::Left,
            left_indent: 0.0,
            right_indent: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            leading: size * 1.2,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    fn indented(mut self, left: f32, right: f32) -> Self {
        self.left_indent = left;
        self.right_indent = right;
        self
    }

    fn spaced(mut self, before: f32, after: f32) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }
}

/// Page geometry in points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    /// Page width
    pub width: f32,
    /// Page height
    pub height: f32,
    /// Top margin
    pub margin_top: f32,
    /// Bottom margin
    pub margin_bottom: f32,
    /// Left margin
    pub margin_left: f32,
    /// Right margin
    pub margin_right: f32,
}

impl Default for PageSetup {
    /// A4 with a wider binding margin on the left
    fn default() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin_top: INCH,
            margin_bottom: INCH,
            margin_left: 1.5 * INCH,
            margin_right: INCH,
        }
    }
}

/// One styled paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Style name
    pub style: StyleTag,
    /// Paragraph text
    pub text: String,
}

/// A screenplay ready for typesetting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Page geometry
    pub page: PageSetup,
    /// Style sheet
    pub styles: IndexMap<StyleTag, ParagraphStyle>,
    /// Paragraphs in reading order
    pub paragraphs: Vec<Paragraph>,
}

impl Default for LayoutDocument {
    fn default() -> Self {
        Self {
            page: PageSetup::default(),
            styles: screenplay_styles(),
            paragraphs: Vec::new(),
        }
    }
}

impl LayoutDocument {
    /// Append a paragraph, NFC-normalizing its text
    pub fn push(&mut self, style: StyleTag, text: impl AsRef<str>) {
        self.paragraphs.push(Paragraph {
            style,
            text: text.as_ref().nfc().collect(),
        });
    }

    /// Paragraph texts carrying a style
    pub fn texts(&self, style: StyleTag) -> impl Iterator<Item = &str> {
        self.paragraphs
            .iter()
            .filter(move |p| p.style == style)
            .map(|p| p.text.as_str())
    }

    /// Pretty RON text
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        let config = PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config)
    }

    /// Parse RON text
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

/// The screenplay style sheet
pub fn screenplay_styles() -> IndexMap<StyleTag, ParagraphStyle> {
    let regular = ParagraphStyle::body(12.0);

    let mut styles = IndexMap::new();
    styles.insert(
        StyleTag::Title,
        ParagraphStyle::body(16.0)
            .bold()
            .aligned(Alignment::Center)
            .spaced(0.0, 30.0),
    );
    styles.insert(StyleTag::Subtitle, ParagraphStyle::body(10.0).spaced(0.0, 20.0));
    styles.insert(StyleTag::SceneHeading, regular.clone().bold().spaced(6.0, 0.0));
    styles.insert(
        StyleTag::Character,
        regular
            .clone()
            .aligned(Alignment::Center)
            .indented(2.2 * INCH, INCH)
            .spaced(6.0, 0.0),
    );
    styles.insert(
        StyleTag::Parenthetical,
        ParagraphStyle::body(11.0).indented(2.5 * INCH, 1.5 * INCH),
    );
    styles.insert(StyleTag::Dialog, regular.clone().indented(1.5 * INCH, INCH));
    styles.insert(StyleTag::Action, regular.clone().spaced(6.0, 0.0));
    styles.insert(StyleTag::TransitionIn, regular.clone().spaced(6.0, 0.0));
    styles.insert(
        StyleTag::TransitionOut,
        regular.clone().aligned(Alignment::Right).spaced(6.0, 0.0),
    );
    styles.insert(StyleTag::End, regular.aligned(Alignment::Center).spaced(20.0, 0.0));
    styles
}

/// Renders the layout document as RON
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRenderer;

impl LayoutRenderer {
    /// Build the document without serializing it
    pub fn document(&self, script: &Script<'_>, ctx: &RenderContext) -> (LayoutDocument, usize) {
        let (blocks, scenes) = screenplay_blocks(script);
        let mut doc = LayoutDocument::default();

        doc.push(StyleTag::Title, ctx.title.as_str());
        doc.push(
            StyleTag::Subtitle,
            format!("Generated: {}", ctx.generated.format("%B %d, %Y")),
        );

        for block in blocks {
            match block {
                Block::TransitionIn(cue) => doc.push(StyleTag::TransitionIn, cue),
                Block::Heading(heading) => doc.push(
                    StyleTag::SceneHeading,
                    format!("{}. {}", heading.number, heading.text).to_uppercase(),
                ),
                Block::Background(text) | Block::Action(text) => doc.push(StyleTag::Action, text),
                Block::Dialog {
                    character,
                    parenthetical,
                    text,
                } => {
                    doc.push(StyleTag::Character, character);
                    if !parenthetical.is_empty() {
                        doc.push(StyleTag::Parenthetical, format!("({parenthetical})"));
                    }
                    if !text.is_empty() {
                        doc.push(StyleTag::Dialog, text);
                    }
                }
                Block::TransitionOut(cue) => doc.push(StyleTag::TransitionOut, cue),
                Block::NodeBreak => {}
            }
        }

        doc.push(StyleTag::TransitionOut, "FADE OUT.");
        doc.push(StyleTag::End, "END");
        (doc, scenes)
    }
}

impl Renderer for LayoutRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Layout
    }

    fn render(&self, script: &Script<'_>, ctx: &RenderContext) -> Result<Rendered, RenderError> {
        let (doc, scenes) = self.document(script, ctx);
        let text = doc.to_ron()?;
        Ok(Rendered {
            bytes: text.into_bytes(),
            nodes: script.len(),
            scenes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use storyweave_graph::{ContentItem, Node, OutTransition, SceneForm, SceneType};

    #[test]
    fn test_paragraph_mapping() {
        let (graph, ids) = two_scenes();
        let (doc, scenes) = LayoutRenderer.document(
            &Script::from_sequence(&graph, &ids),
            &RenderContext::new(generated()),
        );

        assert_eq!(scenes, 1);
        let tags: Vec<StyleTag> = doc.paragraphs.iter().map(|p| p.style).collect();
        assert_eq!(
            tags,
            vec![
                StyleTag::Title,
                StyleTag::Subtitle,
                StyleTag::TransitionIn,
                StyleTag::SceneHeading,
                StyleTag::Character,
                StyleTag::Dialog,
                StyleTag::TransitionOut,
                StyleTag::Action,
                StyleTag::TransitionOut,
                StyleTag::End,
            ]
        );
        assert_eq!(doc.texts(StyleTag::SceneHeading).next(), Some("1. INT. KITCHEN - NIGHT"));
        assert_eq!(doc.texts(StyleTag::Character).next(), Some("ALICE"));
        assert_eq!(doc.paragraphs[1].text, "Generated: May 01, 2024");
    }

    #[test]
    fn test_no_fixed_width_wrapping() {
        let long = "word ".repeat(40).trim_end().to_string();
        let node = node_with_items(
            "Scene",
            vec![ContentItem::dialog("Eve", long.clone()).with_parentheticals("softly")],
        );
        let (doc, _) = LayoutRenderer.document(&Script::new(vec![&node]), &RenderContext::new(generated()));

        assert_eq!(doc.texts(StyleTag::Dialog).collect::<Vec<_>>(), vec![long.as_str()]);
        assert_eq!(doc.texts(StyleTag::Parenthetical).next(), Some("(softly)"));
    }

    #[test]
    fn test_custom_out_transition_kept() {
        let node = Node::linear("Scene").with_form(
            SceneForm::new(SceneType::Ext, "ROOF")
                .with_transitions(Default::default(), OutTransition::Custom("WHIP PAN".into())),
        );
        let (doc, _) = LayoutRenderer.document(&Script::new(vec![&node]), &RenderContext::new(generated()));
        assert!(doc.texts(StyleTag::TransitionOut).any(|t| t == "WHIP PAN:"));
    }

    #[test]
    fn test_styles_and_ron() {
        let doc = LayoutDocument::default();
        assert_eq!(doc.styles.len(), 10);
        assert_eq!(doc.styles[&StyleTag::Character].left_indent, 2.2 * INCH);
        assert_eq!(doc.styles[&StyleTag::TransitionOut].alignment, Alignment::Right);
        assert!(doc.styles[&StyleTag::Title].bold);
        assert_eq!(doc.page.margin_left, 108.0);

        let rendered = LayoutRenderer
            .render(&Script::default(), &RenderContext::new(generated()))
            .unwrap();
        let text = String::from_utf8(rendered.bytes).unwrap();
        assert!(text.starts_with("LayoutDocument("));

        let parsed = LayoutDocument::from_ron(&text).unwrap();
        assert_eq!(parsed.paragraphs.len(), 4);
        assert_eq!(parsed.styles.keys().next(), Some(&StyleTag::Title));
    }

    #[test]
    fn test_text_is_composed() {
        let node = node_with_items(
            "Scene",
            vec![
                ContentItem::action("Cafe\u{301} opens."),
                ContentItem::dialog("Zoe\u{308}", "Ole\u{301}!").with_parentheticals("a\u{300} part"),
            ],
        );
        let (doc, _) = LayoutRenderer.document(
            &Script::new(vec![&node]),
            &RenderContext::new(generated()),
        );

        assert!(doc.texts(StyleTag::Action).any(|t| t == "Caf\u{e9} opens."));
        assert_eq!(doc.texts(StyleTag::Character).collect::<Vec<_>>(), vec!["ZO\u{cb}"]);
        assert_eq!(doc.texts(StyleTag::Parenthetical).collect::<Vec<_>>(), vec!["(\u{e0} part)"]);
        assert_eq!(doc.texts(StyleTag::Dialog).collect::<Vec<_>>(), vec!["Ol\u{e9}!"]);
    }
}
