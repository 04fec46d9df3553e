// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command handlers.

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use storyweave_export::{
    ExportFormat, ExportMode, ExportReport, ExportRequest, ExportSettings, FileSink,
};
use storyweave_graph::{Graph, GraphDocument, SequenceResolver, SequenceTree};

/// Arguments of the `export` command
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub graph: PathBuf,
    pub format: Option<ExportFormat>,
    pub output: Option<PathBuf>,
    pub routes: bool,
    pub generated: Option<NaiveDateTime>,
}

/// Run a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Export { graph, format, output, routes, generated } => {
            let report = export(
                &settings,
                ExportArgs { graph, format, output, routes, generated },
            )?;
            for location in &report.locations {
                println!("{location}");
            }
        }
        Commands::Inspect { graph, tree } => {
            print!("{}", inspect(&settings, &graph, tree)?);
        }
        Commands::InitSettings { path } => {
            let written = init_settings(&path)?;
            println!("{}", written.display());
        }
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<ExportSettings> {
    match path {
        Some(path) => ExportSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(ExportSettings::default()),
    }
}

/// Load a graph file and write its screenplay
pub fn export(settings: &ExportSettings, args: ExportArgs) -> Result<ExportReport> {
    let mut graph = load_graph(&args.graph)?;

    let format = args.format.unwrap_or(settings.default_format);
    let generated = args.generated.unwrap_or_else(|| Local::now().naive_local());
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format.default_file_name()));
    let mode = if args.routes { ExportMode::Routes } else { ExportMode::Linear };

    let request = ExportRequest::new(format, generated)
        .with_mode(mode)
        .with_context(settings.render_context(generated));
    let mut sink = FileSink::new(output);

    settings
        .exporter()
        .export(&mut graph, &request, &mut sink)
        .with_context(|| format!("Failed to export {}", args.graph.display()))
}

/// Describe the resolved sequence (or branch tree) of a graph file
pub fn inspect(settings: &ExportSettings, path: &Path, tree: bool) -> Result<String> {
    let mut graph = load_graph(path)?;
    let mut out = String::new();

    for name in graph.duplicate_names() {
        writeln!(out, "warning: several nodes are named '{name}'")?;
    }

    let resolver =
        SequenceResolver::new(settings.revisit_policy).with_max_routes(settings.max_routes);
    let tracked = graph.refresh_connections();

    if tree {
        let root = resolver.resolve_tree(&tracked)?;
        if root.segment.is_empty() {
            writeln!(out, "(no start node)")?;
        } else {
            write_tree(&mut out, &tracked, &root, 0)?;
            writeln!(out, "{} route(s)", root.route_count())?;
        }
        return Ok(out);
    }

    let sequence = resolver.resolve_linear(&tracked);
    if sequence.is_empty() {
        writeln!(out, "(no start node)")?;
        return Ok(out);
    }
    for (index, node) in sequence.resolve_nodes(&tracked).iter().enumerate() {
        writeln!(out, "{:>3}. {} [{}]", index + 1, node.name, node.kind.label())?;
    }
    if let Some(id) = sequence.cycle_at {
        writeln!(out, "     (loops back to {})", node_name(&tracked, id))?;
    }
    if sequence.stopped_at_branch.is_some() {
        writeln!(out, "     (stops at branch, use --tree for every route)")?;
    }
    Ok(out)
}

fn write_tree(
    out: &mut String,
    graph: &Graph,
    tree: &SequenceTree,
    depth: usize,
) -> std::fmt::Result {
    let indent = "  ".repeat(depth);
    for id in &tree.segment {
        writeln!(out, "{indent}{}", node_name(graph, *id))?;
    }
    if let Some(id) = tree.cycle_at {
        writeln!(out, "{indent}(loops back to {})", node_name(graph, id))?;
    }
    for (slot, branch) in tree.branches.iter().enumerate() {
        writeln!(out, "{indent}[{}]", slot + 1)?;
        write_tree(out, graph, branch, depth + 1)?;
    }
    Ok(())
}

fn node_name(graph: &Graph, id: storyweave_graph::NodeId) -> &str {
    graph.node(id).map_or("?", |node| node.name.as_str())
}

fn load_graph(path: &Path) -> Result<Graph> {
    GraphDocument::load(path).with_context(|| format!("Failed to load graph {}", path.display()))
}

/// Write default settings, returning the file written
pub fn init_settings(path: &Path) -> Result<PathBuf> {
    let target = if path.is_dir() {
        ExportSettings::file_path(path)
    } else {
        path.to_path_buf()
    };
    ExportSettings::default()
        .save(&target)
        .with_context(|| format!("Failed to write settings to {}", target.display()))?;
    tracing::info!("Wrote default settings to {}", target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storyweave_graph::Node;

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|d| d.and_hms_opt(14, 5, 9))
            .unwrap()
    }

    fn write_story(dir: &Path) -> PathBuf {
        let mut graph = Graph::with_start_node("story");
        let start = graph.start_node().unwrap().id;
        let a = graph.create_connected_node(start, 0, "Intro").unwrap();
        let branch = graph.add_node(Node::branch("Choice", 2)).unwrap();
        graph.connect_nodes(a, 0, branch).unwrap();
        graph.create_connected_node(branch, 0, "Stay").unwrap();
        let leave = graph.create_connected_node(branch, 1, "Leave").unwrap();
        graph.connect_nodes(leave, 0, a).unwrap();

        let path = dir.join("story.json");
        GraphDocument::from_graph(&graph, generated()).save(&path).unwrap();
        path
    }

    fn args(graph: PathBuf, output: PathBuf) -> ExportArgs {
        ExportArgs {
            graph,
            format: None,
            output: Some(output),
            routes: false,
            generated: Some(generated()),
        }
    }

    #[test]
    fn test_export_uses_settings_format() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_story(dir.path());
        let settings = ExportSettings {
            default_format: ExportFormat::Json,
            ..Default::default()
        };

        let report = export(&settings, args(graph, dir.path().join("out"))).unwrap();
        assert_eq!(report.format, ExportFormat::Json);
        assert_eq!(report.nodes, 3);
        assert!(dir.path().join("out.json").exists());
    }

    #[test]
    fn test_export_routes() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_story(dir.path());
        let mut request = args(graph, dir.path().join("play.txt"));
        request.routes = true;

        let report = export(&ExportSettings::default(), request).unwrap();
        assert_eq!(report.routes, 2);
        assert!(dir.path().join("play_route1.txt").exists());
        assert!(dir.path().join("play_route2.txt").exists());
    }

    #[test]
    fn test_export_missing_graph_fails() {
        let dir = tempfile::tempdir().unwrap();
        let request = args(dir.path().join("missing.json"), dir.path().join("out"));
        let err = export(&ExportSettings::default(), request).unwrap_err();
        assert!(err.to_string().contains("Failed to load graph"));
    }

    #[test]
    fn test_inspect_linear() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_story(dir.path());

        let out = inspect(&ExportSettings::default(), &graph, false).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  1. Start [Start Node]");
        assert_eq!(lines[1], "  2. Intro [Regular Node]");
        assert_eq!(lines[2], "  3. Choice [Branch Node]");
        assert!(lines[3].contains("stops at branch"));
    }

    #[test]
    fn test_inspect_tree() {
        let dir = tempfile::tempdir().unwrap();
        let graph = write_story(dir.path());

        let out = inspect(&ExportSettings::default(), &graph, true).unwrap();
        let expected = [
            "Start",
            "Intro",
            "Choice",
            "[1]",
            "  Stay",
            "[2]",
            "  Leave",
            "  (loops back to Intro)",
            "2 route(s)",
        ];
        assert_eq!(out.lines().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_init_settings_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let written = init_settings(dir.path()).unwrap();
        assert_eq!(written, dir.path().join("storyweave.ron"));
        assert_eq!(ExportSettings::load(&written).unwrap(), ExportSettings::default());
    }
}
