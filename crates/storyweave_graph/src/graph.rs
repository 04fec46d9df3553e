// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::connection::{Connection, ConnectionId};
use crate::content::SceneForm;
use crate::node::{branch_output_port, Node, NodeId, NodeKind, MAX_BRANCH_OUTPUTS};
use crate::port::PortId;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Offset applied to duplicated nodes, in canvas units
const DUPLICATE_OFFSET: f32 = 150.0;

/// Horizontal distance between a node and a node created from its output
const CONNECTED_NODE_SPACING: f32 = 200.0;

/// A scene graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph, in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Connections touching each port
    incidence: HashMap<PortId, Vec<ConnectionId>>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            incidence: HashMap::new(),
        }
    }

    /// Create a graph holding a single start node named "Start"
    pub fn with_start_node(name: impl Into<String>) -> Self {
        let mut graph = Self::new(name);
        let start = Node::start("Start").with_position(100.0, 100.0);
        graph.nodes.insert(start.id, start);
        graph
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if node.kind.is_start() && self.start_node().is_some() {
            return Err(GraphError::DuplicateStart);
        }
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        if let Some(port) = node
            .ports()
            .find(|port| self.nodes.values().any(|n| n.port(&port.id).is_some()))
        {
            return Err(GraphError::DuplicatePort(port.id));
        }

        let id = node.id;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let port_ids: Vec<PortId> = self.nodes.get(&node_id)?.ports().map(|p| p.id).collect();
        let incident: Vec<ConnectionId> = port_ids
            .iter()
            .flat_map(|port| self.incidence.get(port).into_iter().flatten().copied())
            .collect();

        for connection_id in incident {
            self.disconnect(connection_id);
        }

        tracing::debug!("Removed node {:?} and its connections", node_id);
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The start node, if the graph has one
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.kind.is_start())
    }

    /// Nodes carrying a given display name
    pub fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.name == name)
    }

    /// Display names used by more than one node
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.name.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Mutable access to a node's scene form
    pub fn form_mut(&mut self, node_id: NodeId) -> Option<&mut SceneForm> {
        self.nodes.get_mut(&node_id).map(|n| &mut n.form)
    }

    /// Rename a node
    pub fn rename(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        let node = self.node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        node.name = name.into();
        Ok(())
    }

    /// Move a node on the canvas
    pub fn set_position(&mut self, node_id: NodeId, x: f32, y: f32) -> Result<(), GraphError> {
        let node = self.node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        node.position = [x, y];
        Ok(())
    }

    /// Add a connection between ports
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, ConnectionError> {
        // Validate nodes exist
        let source_node = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        // Validate ports exist on their nodes
        let source_port = source_node.port(&from_port)
            .ok_or(ConnectionError::PortNotFound(from_port))?;
        let target_port = target_node.port(&to_port)
            .ok_or(ConnectionError::PortNotFound(to_port))?;

        if !source_port.can_connect(target_port) {
            return Err(ConnectionError::IncompatiblePorts);
        }

        // Prevent self-loops
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        // Check for existing connections on single-connect ports
        for port in [source_port, target_port] {
            if !port.multi_connect && self.is_port_connected(port.id) {
                return Err(ConnectionError::PortAlreadyConnected(port.id));
            }
        }

        let connection = Connection::new(from_node, from_port, to_node, to_port);
        let id = connection.id;
        self.incidence.entry(from_port).or_default().push(id);
        self.incidence.entry(to_port).or_default().push(id);
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Connect an output slot of one node to the input of another
    pub fn connect_nodes(
        &mut self,
        from_node: NodeId,
        slot: usize,
        to_node: NodeId,
    ) -> Result<ConnectionId, ConnectionError> {
        let source = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let from_port = source.output(slot)
            .ok_or(ConnectionError::NoOutputSlot { node: from_node, slot })?
            .id;
        let target = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;
        let to_port = target.input_port()
            .ok_or(ConnectionError::NoInputPort(to_node))?
            .id;

        self.connect(from_node, from_port, to_node, to_port)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&connection_id)?;
        for port in [connection.from_port, connection.to_port] {
            if let Some(ids) = self.incidence.get_mut(&port) {
                ids.retain(|id| *id != connection_id);
                if ids.is_empty() {
                    self.incidence.remove(&port);
                }
            }
        }
        Some(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections incident on a port
    pub fn connections_at(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.incidence
            .get(&port_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }

    /// Whether a port has an edge attached
    pub fn is_port_connected(&self, port_id: PortId) -> bool {
        self.incidence.get(&port_id).is_some_and(|ids| !ids.is_empty())
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Copy a node (form included) as `"{name}_copy"`, offset on the canvas.
    ///
    /// The copy gets fresh IDs and no connections. Start nodes cannot be
    /// duplicated.
    pub fn duplicate_node(&mut self, node_id: NodeId) -> Result<NodeId, GraphError> {
        let source = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if source.kind.is_start() {
            return Err(GraphError::DuplicateStart);
        }

        let [x, y] = source.position;
        let copy = Node::new(format!("{}_copy", source.name), source.kind.renewed())
            .with_position(x + DUPLICATE_OFFSET, y + DUPLICATE_OFFSET)
            .with_form(source.form.clone());

        tracing::debug!("Duplicated node '{}' as '{}'", source.name, copy.name);
        self.add_node(copy)
    }

    /// Create a linear node wired to an output slot of `from_node`
    pub fn create_connected_node(
        &mut self,
        from_node: NodeId,
        slot: usize,
        name: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        let source = self.nodes.get(&from_node).ok_or(GraphError::NodeNotFound(from_node))?;
        let [x, y] = source.position;
        let node = Node::linear(name).with_position(x + CONNECTED_NODE_SPACING, y);
        let new_id = self.add_node(node)?;

        if let Err(e) = self.connect_nodes(from_node, slot, new_id) {
            self.nodes.shift_remove(&new_id);
            return Err(e.into());
        }
        Ok(new_id)
    }

    /// Add an output slot to a branch node, returning the new slot count
    pub fn add_branch_output(&mut self, node_id: NodeId) -> Result<usize, GraphError> {
        let node = self.node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let NodeKind::Branch { outputs, .. } = &mut node.kind else {
            return Err(GraphError::NotABranch(node_id));
        };
        if outputs.len() >= MAX_BRANCH_OUTPUTS {
            return Err(GraphError::BranchOutputLimit(MAX_BRANCH_OUTPUTS));
        }

        outputs.push(branch_output_port(outputs.len() + 1));
        Ok(outputs.len())
    }

    /// Remove the last output slot of a branch node, severing its edge.
    ///
    /// Returns the new slot count.
    pub fn remove_branch_output(&mut self, node_id: NodeId) -> Result<usize, GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let NodeKind::Branch { outputs, .. } = &node.kind else {
            return Err(GraphError::NotABranch(node_id));
        };
        let Some(last) = outputs.last().filter(|_| outputs.len() > 1) else {
            return Err(GraphError::BranchNeedsOutput);
        };

        let port_id = last.id;
        let incident: Vec<ConnectionId> = self.connections_at(port_id).map(|c| c.id).collect();
        for connection_id in incident {
            self.disconnect(connection_id);
        }

        let node = self.node_mut(node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let NodeKind::Branch { outputs, .. } = &mut node.kind else {
            return Err(GraphError::NotABranch(node_id));
        };
        outputs.pop();
        Ok(outputs.len())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::with_start_node("Untitled")
    }
}

/// Error when editing the graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Node ID already present
    #[error("Node already exists: {0:?}")]
    DuplicateNode(NodeId),

    /// A port ID is already used by another node
    #[error("Port already exists: {0:?}")]
    DuplicatePort(PortId),

    /// The graph already has a start node
    #[error("Graph already has a start node")]
    DuplicateStart,

    /// Operation requires a branch node
    #[error("Node is not a branch: {0:?}")]
    NotABranch(NodeId),

    /// Branch already has the maximum number of outputs
    #[error("Branch nodes support at most {0} outputs")]
    BranchOutputLimit(usize),

    /// Branch must keep one output
    #[error("Branch nodes need at least one output")]
    BranchNeedsOutput,

    /// Connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// Ports cannot be joined (must run output to input)
    #[error("Incompatible ports: connections run from an output to an input")]
    IncompatiblePorts,

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Output slot does not exist
    #[error("Node {node:?} has no output slot {slot}")]
    NoOutputSlot {
        /// Source node
        node: NodeId,
        /// Requested slot
        slot: usize,
    },

    /// Target has no input port
    #[error("Node {0:?} has no input port")]
    NoInputPort(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Graph, NodeId, NodeId, NodeId) {
        let mut graph = Graph::new("Test");
        let start = graph.add_node(Node::start("Start")).unwrap();
        let a = graph.add_node(Node::linear("A")).unwrap();
        let b = graph.add_node(Node::linear("B")).unwrap();
        graph.connect_nodes(start, 0, a).unwrap();
        graph.connect_nodes(a, 0, b).unwrap();
        (graph, start, a, b)
    }

    #[test]
    fn test_default_graph_has_start() {
        let graph = Graph::default();
        assert_eq!(graph.node_count(), 1);
        let start = graph.start_node().unwrap();
        assert_eq!(start.name, "Start");
        assert!(graph.node(start.id).is_some());
    }

    #[test]
    fn test_shared_port_ids_rejected() {
        let (mut graph, _, a, _) = chain();
        let mut clone = graph.node(a).unwrap().clone();
        clone.id = NodeId::new();

        assert!(matches!(graph.add_node(clone.clone()), Err(GraphError::DuplicatePort(_))));
        clone.kind = clone.kind.renewed();
        assert!(graph.add_node(clone).is_ok());
    }

    #[test]
    fn test_second_start_rejected() {
        let mut graph = Graph::with_start_node("Test");
        assert!(matches!(
            graph.add_node(Node::start("Other")),
            Err(GraphError::DuplicateStart)
        ));
    }

    #[test]
    fn test_connect_validation() {
        let (mut graph, start, a, b) = chain();

        // A's output is taken
        let c = graph.add_node(Node::linear("C")).unwrap();
        assert!(matches!(
            graph.connect_nodes(a, 0, c),
            Err(ConnectionError::PortAlreadyConnected(_))
        ));
        assert!(matches!(
            graph.connect_nodes(start, 0, c),
            Err(ConnectionError::PortAlreadyConnected(_))
        ));
        // Start has no input
        assert!(matches!(
            graph.connect_nodes(b, 0, start),
            Err(ConnectionError::NoInputPort(_))
        ));
        // No slot 1 on a linear node
        assert!(matches!(
            graph.connect_nodes(b, 1, a),
            Err(ConnectionError::NoOutputSlot { slot: 1, .. })
        ));

        let c_out = graph.node(c).unwrap().output(0).unwrap().id;
        let c_in = graph.node(c).unwrap().input_port().unwrap().id;
        assert!(matches!(graph.connect(c, c_out, c, c_in), Err(ConnectionError::SelfLoop)));
        assert!(matches!(
            graph.connect(c, c_in, b, c_out),
            Err(ConnectionError::PortNotFound(_))
        ));
    }

    #[test]
    fn test_cycles_and_converging_paths_are_allowed() {
        let (mut graph, _, a, b) = chain();
        // B loops back into A, whose input already has Start's edge
        graph.connect_nodes(b, 0, a).unwrap();
        assert_eq!(graph.connection_count(), 3);

        let a_in = graph.node(a).unwrap().input_port().unwrap().id;
        assert_eq!(graph.connections_at(a_in).count(), 2);
    }

    #[test]
    fn test_remove_node_severs_edges() {
        let (mut graph, start, a, b) = chain();
        let a_in = graph.node(a).unwrap().input_port().unwrap().id;

        let removed = graph.remove_node(a).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(graph.connection_count(), 0);
        assert!(!graph.is_port_connected(a_in));

        // Start's output is free again
        graph.connect_nodes(start, 0, b).unwrap();
        assert_eq!(graph.connections_for_node(b).count(), 1);
    }

    #[test]
    fn test_incidence_index() {
        let (mut graph, start, a, _) = chain();
        let start_out = graph.node(start).unwrap().output(0).unwrap().id;

        let edges: Vec<_> = graph.connections_at(start_out).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].opposite_node(start_out), Some(a));

        let id = edges[0].id;
        graph.disconnect(id);
        assert_eq!(graph.connections_at(start_out).count(), 0);
        assert!(graph.connection(id).is_none());
    }

    #[test]
    fn test_branch_outputs() {
        let mut graph = Graph::with_start_node("Test");
        let branch = graph.add_node(Node::branch("Choice", 1)).unwrap();

        for expected in 2..=MAX_BRANCH_OUTPUTS {
            assert_eq!(graph.add_branch_output(branch).unwrap(), expected);
        }
        assert!(matches!(
            graph.add_branch_output(branch),
            Err(GraphError::BranchOutputLimit(8))
        ));

        let target = graph.add_node(Node::linear("Last")).unwrap();
        graph.connect_nodes(branch, 7, target).unwrap();
        assert_eq!(graph.remove_branch_output(branch).unwrap(), 7);
        assert_eq!(graph.connection_count(), 0);

        for _ in 0..6 {
            graph.remove_branch_output(branch).unwrap();
        }
        assert!(matches!(
            graph.remove_branch_output(branch),
            Err(GraphError::BranchNeedsOutput)
        ));

        let start = graph.start_node().unwrap().id;
        assert!(matches!(graph.add_branch_output(start), Err(GraphError::NotABranch(_))));
    }

    #[test]
    fn test_duplicate_node() {
        let (mut graph, start, a, _) = chain();
        graph.form_mut(a).unwrap().name = "KITCHEN".to_string();
        graph.set_position(a, 10.0, 20.0).unwrap();

        let copy_id = graph.duplicate_node(a).unwrap();
        let copy = graph.node(copy_id).unwrap();
        assert_eq!(copy.name, "A_copy");
        assert_eq!(copy.position, [160.0, 170.0]);
        assert_eq!(copy.form.name, "KITCHEN");
        assert_eq!(graph.connections_for_node(copy_id).count(), 0);

        assert!(matches!(graph.duplicate_node(start), Err(GraphError::DuplicateStart)));
    }

    #[test]
    fn test_create_connected_node() {
        let mut graph = Graph::with_start_node("Test");
        let start = graph.start_node().unwrap().id;

        let scene = graph.create_connected_node(start, 0, "Scene 1").unwrap();
        assert_eq!(graph.node(scene).unwrap().position, [300.0, 100.0]);
        assert_eq!(graph.connection_count(), 1);

        // Output already used: the new node is rolled back
        let count = graph.node_count();
        assert!(graph.create_connected_node(start, 0, "Scene 2").is_err());
        assert_eq!(graph.node_count(), count);
    }

    #[test]
    fn test_duplicate_names() {
        let mut graph = Graph::with_start_node("Test");
        graph.add_node(Node::linear("Scene")).unwrap();
        graph.add_node(Node::linear("Scene")).unwrap();
        graph.add_node(Node::linear("Other")).unwrap();

        assert_eq!(graph.duplicate_names(), vec!["Scene".to_string()]);
        assert_eq!(graph.nodes_named("Scene").count(), 2);
    }
}
