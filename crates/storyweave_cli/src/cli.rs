// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line interface definitions using clap

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storyweave_export::ExportFormat;

/// Timestamp format accepted by `--generated`
pub const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `StoryWeave` - export branching visual-novel scripts as screenplays
#[derive(Parser)]
#[command(name = "storyweave")]
#[command(version)]
#[command(about = "Export branching visual-novel scripts as linear screenplays", long_about = None)]
pub struct Cli {
    /// Settings file (RON)
    #[arg(long, short = 's', global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Export a graph file as a screenplay
    Export {
        /// Graph file (JSON)
        graph: PathBuf,

        /// Output format: text, json, csv or layout
        #[arg(long, short = 'f')]
        format: Option<ExportFormat>,

        /// Output path (default depends on the format)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write one artifact per branch route
        #[arg(long)]
        routes: bool,

        /// Generation timestamp, "YYYY-MM-DD HH:MM:SS" (default: now)
        #[arg(long, value_parser = parse_generated)]
        generated: Option<NaiveDateTime>,
    },

    /// Print the resolved node sequence of a graph file
    Inspect {
        /// Graph file (JSON)
        graph: PathBuf,

        /// Show the full branch tree
        #[arg(long)]
        tree: bool,
    },

    /// Write default settings
    InitSettings {
        /// Settings file, or a directory to place `storyweave.ron` in
        path: PathBuf,
    },
}

fn parse_generated(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, GENERATED_FORMAT)
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {e}"))
}
