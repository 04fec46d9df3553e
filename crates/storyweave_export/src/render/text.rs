// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain-text screenplay renderer.
//!
//! Fixed-width layout: character names at column 20, parentheticals at 17,
//! dialog at 14, transitions out at 30. Dialog and action are word-wrapped.

use super::{screenplay_blocks, Block, ExportFormat, RenderContext, RenderError, Rendered, Renderer, Script};
use crate::wrap::wrap;
use std::fmt::Write;

const CHARACTER_INDENT: usize = 20;
const PARENTHETICAL_INDENT: usize = 17;
const DIALOG_INDENT: usize = 14;
const TRANSITION_INDENT: usize = 30;
const END_INDENT: usize = 32;
const RULE_WIDTH: usize = 60;

/// Renders the fixed-width text screenplay
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn render(&self, script: &Script<'_>, ctx: &RenderContext) -> Result<Rendered, RenderError> {
        let (blocks, scenes) = screenplay_blocks(script);
        let mut out = String::new();

        write!(out, "{}\n\n", ctx.title)?;
        writeln!(out, "Generated: {}", ctx.generated.format("%B %d, %Y"))?;
        write!(out, "\n{}\n\n", "=".repeat(RULE_WIDTH))?;

        for block in &blocks {
            match block {
                Block::TransitionIn(cue) => write!(out, "{cue}\n\n")?,
                Block::Heading(heading) => write!(out, "{}. {}\n\n", heading.number, heading.text)?,
                Block::Background(text) => write!(out, "{text}\n\n")?,
                Block::Dialog {
                    character,
                    parenthetical,
                    text,
                } => {
                    writeln!(out, "{:CHARACTER_INDENT$}{character}", "")?;
                    if !parenthetical.is_empty() {
                        writeln!(out, "{:PARENTHETICAL_INDENT$}({parenthetical})", "")?;
                    }
                    for line in wrap(text, ctx.dialog_width) {
                        writeln!(out, "{:DIALOG_INDENT$}{line}", "")?;
                    }
                    out.push('\n');
                }
                Block::Action(text) => {
                    for line in wrap(text, ctx.action_width) {
                        writeln!(out, "{line}")?;
                    }
                    out.push('\n');
                }
                Block::TransitionOut(cue) => write!(out, "{:TRANSITION_INDENT$}{cue}\n\n", "")?,
                Block::NodeBreak => out.push('\n'),
            }
        }

        write!(out, "\n{:TRANSITION_INDENT$}FADE OUT.\n\n", "")?;
        writeln!(out, "{:END_INDENT$}END", "")?;

        Ok(Rendered {
            bytes: out.into_bytes(),
            nodes: script.len(),
            scenes,
        })
    }
}
