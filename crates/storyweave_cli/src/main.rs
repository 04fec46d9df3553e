// SPDX-License-Identifier: MIT OR Apache-2.0
//! `StoryWeave` command line.
//!
//! Loads a node graph saved by the editor and exports it as:
//! - A plain-text screenplay
//! - A JSON or CSV node sequence
//! - A page layout document for typesetting
//!
//! Log output goes to stderr; `RUST_LOG` overrides the default filter.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "storyweave_cli=info,storyweave_export=info,storyweave_graph=warn";

fn main() {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting StoryWeave v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = commands::run(cli) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
