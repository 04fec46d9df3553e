// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection tracking.
//!
//! Each node caches the neighbors it is wired to ([`TrackedConnections`]).
//! The cache is recomputed from the live edge set on demand; nothing
//! invalidates it eagerly. [`Graph::refresh_connections`] is the only way to
//! obtain a [`TrackedGraph`], and sequence resolution only accepts a
//! `TrackedGraph`, so exports always run on fresh neighbor data.

use crate::graph::Graph;
use crate::node::{NodeId, NodeLink, TrackedConnections};
use std::ops::Deref;

/// Recomputes node neighbor links from the edge set
pub struct ConnectionTracker;

impl ConnectionTracker {
    /// Resolve the neighbors of one node from the edges incident on its ports.
    ///
    /// The input link is the first edge on the input port. Output links follow
    /// slot order; branch nodes keep every distinct target, other kinds keep at
    /// most one.
    pub fn track_node(graph: &Graph, node_id: NodeId) -> Option<TrackedConnections> {
        let node = graph.node(node_id)?;
        let link = |id: NodeId| {
            graph.node(id).map(|n| NodeLink {
                id,
                name: n.name.clone(),
            })
        };

        let input = node.input_port().and_then(|port| {
            graph
                .connections_at(port.id)
                .find_map(|c| c.opposite_node(port.id))
                .and_then(link)
        });

        let mut outputs: Vec<NodeLink> = Vec::new();
        for port in node.output_ports() {
            for connection in graph.connections_at(port.id) {
                let Some(target) = connection.opposite_node(port.id).and_then(link) else {
                    continue;
                };
                if !outputs.iter().any(|o| o.id == target.id) {
                    outputs.push(target);
                }
            }
        }
        if !node.kind.is_branch() {
            outputs.truncate(1);
        }

        Some(TrackedConnections { input, outputs })
    }
}

impl Graph {
    /// Recompute every node's tracked connections.
    ///
    /// Idempotent: a second call without edits changes nothing.
    pub fn refresh_connections(&mut self) -> TrackedGraph<'_> {
        let ids: Vec<NodeId> = self.node_ids().collect();
        let mut changed = 0usize;

        for id in &ids {
            let Some(tracked) = ConnectionTracker::track_node(self, *id) else {
                continue;
            };
            let Some(node) = self.node_mut(*id) else {
                continue;
            };
            if node.connections() != &tracked {
                tracing::debug!(
                    "Connections of '{}': input {:?} -> {:?}, outputs {:?} -> {:?}",
                    node.name,
                    node.input_connected_node(),
                    tracked.input.as_ref().map(|l| l.name.as_str()),
                    node.output_connected_nodes(),
                    tracked.outputs.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
                );
                node.set_connections(tracked);
                changed += 1;
            }
        }

        tracing::debug!(
            "Updated connection tracking for {} nodes ({} changed)",
            ids.len(),
            changed
        );
        TrackedGraph { graph: self }
    }
}

/// A graph whose connection caches were just refreshed.
///
/// Holds a shared borrow, so the graph cannot be edited while it is alive.
#[derive(Debug, Clone, Copy)]
pub struct TrackedGraph<'a> {
    graph: &'a Graph,
}

impl<'a> TrackedGraph<'a> {
    /// The underlying graph
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }
}

impl Deref for TrackedGraph<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_refresh_tracks_names() {
        let mut graph = Graph::new("Test");
        let start = graph.add_node(Node::start("Start")).unwrap();
        let a = graph.add_node(Node::linear("A")).unwrap();
        let b = graph.add_node(Node::linear("B")).unwrap();
        graph.connect_nodes(start, 0, a).unwrap();
        graph.connect_nodes(a, 0, b).unwrap();

        let tracked = graph.refresh_connections();
        let start_node = tracked.node(start).unwrap();
        assert_eq!(start_node.input_connected_node(), None);
        assert_eq!(start_node.output_connected_node(), Some("A"));

        let a_node = tracked.node(a).unwrap();
        assert_eq!(a_node.input_connected_node(), Some("Start"));
        assert_eq!(a_node.output_connected_node(), Some("B"));

        let b_node = tracked.node(b).unwrap();
        assert_eq!(b_node.input_connected_node(), Some("A"));
        assert_eq!(b_node.output_connected_node(), None);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut graph = Graph::with_start_node("Test");
        let start = graph.start_node().unwrap().id;
        let a = graph.create_connected_node(start, 0, "A").unwrap();
        graph.create_connected_node(a, 0, "B").unwrap();

        let first: Vec<_> = graph
            .refresh_connections()
            .nodes()
            .map(|n| n.connections().clone())
            .collect();
        let second: Vec<_> = graph
            .refresh_connections()
            .nodes()
            .map(|n| n.connections().clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cache_goes_stale_until_refresh() {
        let mut graph = Graph::with_start_node("Test");
        let start = graph.start_node().unwrap().id;
        let a = graph.create_connected_node(start, 0, "A").unwrap();
        graph.refresh_connections();

        graph.remove_node(a);
        // Cache still names the removed node
        assert_eq!(graph.node(start).unwrap().output_connected_node(), Some("A"));

        let tracked = graph.refresh_connections();
        assert_eq!(tracked.node(start).unwrap().output_connected_node(), None);
    }

    #[test]
    fn test_branch_tracks_every_output() {
        let mut graph = Graph::with_start_node("Test");
        let start = graph.start_node().unwrap().id;
        let branch = graph.add_node(Node::branch("Choice", 3)).unwrap();
        graph.connect_nodes(start, 0, branch).unwrap();
        for (slot, name) in ["Left", "Middle", "Right"].into_iter().enumerate() {
            graph.create_connected_node(branch, slot, name).unwrap();
        }

        let tracked = graph.refresh_connections();
        let node = tracked.node(branch).unwrap();
        assert_eq!(node.output_connected_nodes(), vec!["Left", "Middle", "Right"]);
        assert_eq!(node.output_connected_node(), None);
        assert_eq!(node.input_connected_node(), Some("Start"));
        assert_eq!(node.next_linear(), None);
    }

    #[test]
    fn test_links_use_identity_not_name() {
        let mut graph = Graph::with_start_node("Test");
        let start = graph.start_node().unwrap().id;
        let first = graph.add_node(Node::linear("Twin")).unwrap();
        let second = graph.create_connected_node(start, 0, "Twin").unwrap();

        let tracked = graph.refresh_connections();
        let link = tracked.node(start).unwrap().connections().outputs[0].clone();
        assert_eq!(link.id, second);
        assert_ne!(link.id, first);
    }

    #[test]
    fn test_track_missing_node() {
        let graph = Graph::new("Empty");
        assert!(ConnectionTracker::track_node(&graph, NodeId::new()).is_none());
    }
}
