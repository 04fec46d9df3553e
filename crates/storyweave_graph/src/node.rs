// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the scene graph.

use crate::content::SceneForm;
use crate::port::{Port, PortId};
use serde::{Deserialize, Serialize};
use std::slice;
use uuid::Uuid;

/// Maximum number of outputs a branch node can have
pub const MAX_BRANCH_OUTPUTS: usize = 8;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Node variant, carrying the ports each variant is allowed to have
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry point of the script; has no input
    Start {
        /// Output port
        output: Port,
    },
    /// Ordinary scene with one input and one output
    Linear {
        /// Input port
        input: Port,
        /// Output port
        output: Port,
    },
    /// Story choice with one input and up to [`MAX_BRANCH_OUTPUTS`] outputs
    Branch {
        /// Input port
        input: Port,
        /// Output ports, in slot order
        outputs: Vec<Port>,
    },
}

impl NodeKind {
    /// Start node ports
    pub fn start() -> Self {
        NodeKind::Start {
            output: Port::output("Out"),
        }
    }

    /// Linear node ports
    pub fn linear() -> Self {
        NodeKind::Linear {
            input: Port::input("In"),
            output: Port::output("Out"),
        }
    }

    /// Branch node ports with `outputs` slots (clamped to `1..=8`)
    pub fn branch(outputs: usize) -> Self {
        let count = outputs.clamp(1, MAX_BRANCH_OUTPUTS);
        NodeKind::Branch {
            input: Port::input("In"),
            outputs: (1..=count).map(branch_output_port).collect(),
        }
    }

    /// Same port layout with fresh port IDs
    pub fn renewed(&self) -> Self {
        match self {
            NodeKind::Start { output } => NodeKind::Start { output: output.renewed() },
            NodeKind::Linear { input, output } => NodeKind::Linear {
                input: input.renewed(),
                output: output.renewed(),
            },
            NodeKind::Branch { input, outputs } => NodeKind::Branch {
                input: input.renewed(),
                outputs: outputs.iter().map(Port::renewed).collect(),
            },
        }
    }

    /// Display label used in exports
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Start { .. } => "Start Node",
            NodeKind::Linear { .. } => "Regular Node",
            NodeKind::Branch { .. } => "Branch Node",
        }
    }

    /// Type tag used in the graph file
    pub fn file_tag(&self) -> &'static str {
        match self {
            NodeKind::Start { .. } => "start",
            NodeKind::Linear { .. } => "normal",
            NodeKind::Branch { .. } => "branch",
        }
    }

    /// Is this the start node kind
    pub fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start { .. })
    }

    /// Is this a branch node kind
    pub fn is_branch(&self) -> bool {
        matches!(self, NodeKind::Branch { .. })
    }
}

pub(crate) fn branch_output_port(slot: usize) -> Port {
    Port::output(format!("Choice {slot}"))
}

/// A neighbor reference resolved by the connection tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLink {
    /// Neighbor identity (the join key)
    pub id: NodeId,
    /// Neighbor label at the time of tracking
    pub name: String,
}

/// Cached neighbor state of a node.
///
/// Written only by the connection tracker. It can go stale after edits until
/// the next [`Graph::refresh_connections`](crate::Graph::refresh_connections).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedConnections {
    /// Node feeding the input port
    pub input: Option<NodeLink>,
    /// Nodes fed by the output port(s), in slot order
    pub outputs: Vec<NodeLink>,
}

/// A scene node in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Position in the editor canvas
    pub position: [f32; 2],
    /// Variant and ports
    pub kind: NodeKind,
    /// Authored scene content
    pub form: SceneForm,
    /// Tracked neighbors
    connections: TrackedConnections,
}

impl Node {
    /// Create a node of the given kind
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            position: [0.0, 0.0],
            kind,
            form: SceneForm::default(),
            connections: TrackedConnections::default(),
        }
    }

    /// Create a start node
    pub fn start(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::start())
    }

    /// Create a linear scene node
    pub fn linear(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::linear())
    }

    /// Create a branch node with `outputs` slots
    pub fn branch(name: impl Into<String>, outputs: usize) -> Self {
        Self::new(name, NodeKind::branch(outputs))
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set the scene form
    pub fn with_form(mut self, form: SceneForm) -> Self {
        self.form = form;
        self
    }

    /// Input port, if this kind has one
    pub fn input_port(&self) -> Option<&Port> {
        match &self.kind {
            NodeKind::Start { .. } => None,
            NodeKind::Linear { input, .. } | NodeKind::Branch { input, .. } => Some(input),
        }
    }

    /// Output ports in slot order
    pub fn output_ports(&self) -> &[Port] {
        match &self.kind {
            NodeKind::Start { output } | NodeKind::Linear { output, .. } => slice::from_ref(output),
            NodeKind::Branch { outputs, .. } => outputs,
        }
    }

    /// Output port for a slot index
    pub fn output(&self, slot: usize) -> Option<&Port> {
        self.output_ports().get(slot)
    }

    /// Slot index of an output port
    pub fn output_slot(&self, port_id: PortId) -> Option<usize> {
        self.output_ports().iter().position(|p| p.id == port_id)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.input_port()
            .filter(|p| p.id == *port_id)
            .or_else(|| self.output_ports().iter().find(|p| p.id == *port_id))
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.input_port().into_iter().chain(self.output_ports().iter())
    }

    /// Tracked neighbor cache
    pub fn connections(&self) -> &TrackedConnections {
        &self.connections
    }

    pub(crate) fn set_connections(&mut self, connections: TrackedConnections) {
        self.connections = connections;
    }

    /// Name of the tracked input neighbor
    pub fn input_connected_node(&self) -> Option<&str> {
        self.connections.input.as_ref().map(|link| link.name.as_str())
    }

    /// Name of the tracked output neighbor (single-output kinds only)
    pub fn output_connected_node(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Branch { .. } => None,
            _ => self.connections.outputs.first().map(|link| link.name.as_str()),
        }
    }

    /// Names of all tracked output neighbors
    pub fn output_connected_nodes(&self) -> Vec<&str> {
        self.connections.outputs.iter().map(|link| link.name.as_str()).collect()
    }

    /// The next node of a linear walk (never set for branch nodes)
    pub fn next_linear(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Branch { .. } => None,
            _ => self.connections.outputs.first().map(|link| link.id),
        }
    }
}
