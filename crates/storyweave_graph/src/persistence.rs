// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph file persistence.
//!
//! The graph file is pretty-printed JSON:
//!
//! ```json
//! { "version": "1.0", "created_at": "2024-05-01 10:00:00",
//!   "nodes": [ { "id": "...", "name": "Start", "x": 100.0, "y": 100.0, "type": "start",
//!                "input_connected_node": null, "output_connected_node": "Scene 1",
//!                "form_data": { } } ],
//!   "edges": [ { "id": "...", "start_node": "...", "end_node": "...",
//!                "start_point": "output", "end_point": "input" } ] }
//! ```
//!
//! Node ids are opaque strings. Files written by older editors use the node
//! name as the id, which loads fine as long as names are unique.

use crate::content::SceneForm;
use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId, NodeKind, MAX_BRANCH_OUTPUTS};
use crate::tracking::ConnectionTracker;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Current graph file format version
pub const GRAPH_FILE_VERSION: &str = "1.0";

/// Timestamp format of `created_at`
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn default_version() -> String {
    GRAPH_FILE_VERSION.to_string()
}

/// Node type tag in the graph file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeTypeTag {
    /// Start node
    Start,
    /// Linear scene node
    #[default]
    Normal,
    /// Branch node
    Branch,
}

/// One node in the graph file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Opaque id referenced by edges
    pub id: String,
    /// Display name
    pub name: String,
    /// Canvas x
    #[serde(default)]
    pub x: f32,
    /// Canvas y
    #[serde(default)]
    pub y: f32,
    /// Node type
    #[serde(rename = "type", default)]
    pub node_type: NodeTypeTag,
    /// Branch output count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<usize>,
    /// Name of the node feeding the input
    #[serde(default)]
    pub input_connected_node: Option<String>,
    /// Name of the node fed by the output
    #[serde(default)]
    pub output_connected_node: Option<String>,
    /// Names of the nodes fed by branch outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_connected_nodes: Option<Vec<String>>,
    /// Scene content
    #[serde(default)]
    pub form_data: SceneForm,
}

/// One edge in the graph file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Edge id
    pub id: String,
    /// Source node id
    pub start_node: String,
    /// Target node id
    pub end_node: String,
    /// `"output"` or `"output_{n}"` (1-based branch slot)
    #[serde(default = "default_start_point")]
    pub start_point: String,
    /// Always `"input"`
    #[serde(default = "default_end_point")]
    pub end_point: String,
}

fn default_start_point() -> String {
    "output".to_string()
}

fn default_end_point() -> String {
    "input".to_string()
}

/// Output slot named by an edge's `start_point`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartPoint {
    /// Unnumbered output: the first free slot
    Any,
    /// Zero-based slot index
    Slot(usize),
}

impl StartPoint {
    fn parse(point: &str) -> Option<Self> {
        if point == "output" {
            return Some(StartPoint::Any);
        }
        let n: usize = point.strip_prefix("output_")?.parse().ok()?;
        (1..=MAX_BRANCH_OUTPUTS).contains(&n).then_some(StartPoint::Slot(n - 1))
    }
}

/// Serialized form of a [`Graph`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Save time (`%Y-%m-%d %H:%M:%S`)
    #[serde(default)]
    pub created_at: String,
    /// Nodes in graph order
    pub nodes: Vec<NodeRecord>,
    /// Edges in graph order
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl GraphDocument {
    /// Build a document from a graph.
    ///
    /// Connection names are recomputed from the edges rather than taken from
    /// the node caches, so the file never carries stale names.
    pub fn from_graph(graph: &Graph, created_at: NaiveDateTime) -> Self {
        let key = |id: NodeId| id.0.to_string();

        let nodes = graph
            .nodes()
            .map(|node| {
                let tracked = ConnectionTracker::track_node(graph, node.id).unwrap_or_default();
                let names: Vec<String> = tracked.outputs.iter().map(|l| l.name.clone()).collect();
                let (outputs, output_connected_node, output_connected_nodes) = match &node.kind {
                    NodeKind::Branch { outputs, .. } => (Some(outputs.len()), None, Some(names)),
                    _ => (None, names.into_iter().next(), None),
                };

                NodeRecord {
                    id: key(node.id),
                    name: node.name.clone(),
                    x: node.position[0],
                    y: node.position[1],
                    node_type: match node.kind {
                        NodeKind::Start { .. } => NodeTypeTag::Start,
                        NodeKind::Linear { .. } => NodeTypeTag::Normal,
                        NodeKind::Branch { .. } => NodeTypeTag::Branch,
                    },
                    outputs,
                    input_connected_node: tracked.input.map(|l| l.name),
                    output_connected_node,
                    output_connected_nodes,
                    form_data: node.form.clone(),
                }
            })
            .collect();

        let edges = graph
            .connections()
            .map(|connection| {
                let start_point = match graph.node(connection.from_node) {
                    Some(source) if source.kind.is_branch() => {
                        let slot = source.output_slot(connection.from_port).unwrap_or(0);
                        format!("output_{}", slot + 1)
                    }
                    _ => default_start_point(),
                };
                EdgeRecord {
                    id: connection.id.0.to_string(),
                    start_node: key(connection.from_node),
                    end_node: key(connection.to_node),
                    start_point,
                    end_point: default_end_point(),
                }
            })
            .collect();

        Self {
            version: default_version(),
            created_at: created_at.format(CREATED_AT_FORMAT).to_string(),
            nodes,
            edges,
        }
    }

    /// Rebuild the graph.
    ///
    /// Saved connection names are ignored; the returned graph has its tracking
    /// refreshed from the edges.
    pub fn into_graph(self, name: impl Into<String>) -> Result<Graph, PersistenceError> {
        check_version(&self.version)?;

        let mut plain_edges: HashMap<&str, usize> = HashMap::new();
        let mut highest_slot: HashMap<&str, usize> = HashMap::new();
        for edge in &self.edges {
            match StartPoint::parse(&edge.start_point) {
                Some(StartPoint::Any) => *plain_edges.entry(edge.start_node.as_str()).or_default() += 1,
                Some(StartPoint::Slot(slot)) => {
                    let highest = highest_slot.entry(edge.start_node.as_str()).or_default();
                    *highest = (*highest).max(slot + 1);
                }
                None => {
                    return Err(PersistenceError::BadStartPoint {
                        edge: edge.id.clone(),
                        point: edge.start_point.clone(),
                    })
                }
            }
        }

        let mut graph = Graph::new(name);
        let mut ids: HashMap<String, NodeId> = HashMap::new();
        for record in &self.nodes {
            if ids.contains_key(&record.id) {
                return Err(PersistenceError::DuplicateId(record.id.clone()));
            }

            let kind = match record.node_type {
                NodeTypeTag::Start => NodeKind::start(),
                NodeTypeTag::Normal => NodeKind::linear(),
                NodeTypeTag::Branch => {
                    let key = record.id.as_str();
                    let needed = highest_slot.get(key).copied().unwrap_or(0)
                        + plain_edges.get(key).copied().unwrap_or(0);
                    NodeKind::branch(record.outputs.unwrap_or(needed))
                }
            };
            let node = Node::new(record.name.clone(), kind)
                .with_position(record.x, record.y)
                .with_form(record.form_data.clone());
            ids.insert(record.id.clone(), graph.add_node(node)?);
        }

        for edge in &self.edges {
            let endpoint = |key: &String| {
                ids.get(key).copied().ok_or_else(|| PersistenceError::UnknownEndpoint {
                    edge: edge.id.clone(),
                    node: key.clone(),
                })
            };
            let from = endpoint(&edge.start_node)?;
            let to = endpoint(&edge.end_node)?;

            let slot = match StartPoint::parse(&edge.start_point) {
                Some(StartPoint::Slot(slot)) => slot,
                _ => first_free_slot(&graph, from),
            };
            graph
                .connect_nodes(from, slot, to)
                .map_err(GraphError::from)?;
        }

        graph.refresh_connections();
        tracing::debug!(
            "Loaded graph with {} nodes and {} edges",
            graph.node_count(),
            graph.connection_count()
        );
        Ok(graph)
    }

    /// Parse a document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty JSON text (2-space indent, non-ASCII kept as is)
    pub fn to_json_string(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a graph file, naming the graph after the file stem
    pub fn load(path: &Path) -> Result<Graph, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::from_json_str(&content)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        document.into_graph(name)
    }

    /// Save a graph file
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let content = self.to_json_string()?;
        std::fs::write(path, content)?;
        tracing::info!(
            "Saved graph to {} ({} nodes, {} edges)",
            path.display(),
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }
}

fn first_free_slot(graph: &Graph, node_id: NodeId) -> usize {
    graph
        .node(node_id)
        .and_then(|node| {
            node.output_ports()
                .iter()
                .position(|port| !graph.is_port_connected(port.id))
        })
        .unwrap_or(0)
}

fn check_version(version: &str) -> Result<(), PersistenceError> {
    let major = |v: &str| v.split('.').next().and_then(|m| m.parse::<u32>().ok());
    match (major(version), major(GRAPH_FILE_VERSION)) {
        (Some(found), Some(supported)) if found <= supported => Ok(()),
        _ => Err(PersistenceError::UnsupportedVersion(version.to_string())),
    }
}

/// Error loading or saving a graph file
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid graph JSON
    #[error("Invalid graph file: {0}")]
    Json(#[from] serde_json::Error),

    /// The file was written by a newer format
    #[error("Graph file version {0} is newer than supported version {GRAPH_FILE_VERSION}")]
    UnsupportedVersion(String),

    /// Two nodes share an id
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    /// An edge references a node that is not in the file
    #[error("Edge {edge} references unknown node {node}")]
    UnknownEndpoint {
        /// Edge id
        edge: String,
        /// Missing node id
        node: String,
    },

    /// An edge names an output that cannot exist
    #[error("Edge {edge} has invalid start point {point}")]
    BadStartPoint {
        /// Edge id
        edge: String,
        /// Offending start point
        point: String,
    },

    /// The nodes or edges break a graph rule
    #[error(transparent)]
    Graph(#[from] GraphError),
}
