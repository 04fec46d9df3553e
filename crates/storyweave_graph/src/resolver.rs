// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence resolution.
//!
//! Turns a tracked graph into the order in which scenes are exported. The
//! linear walk follows single output links from the start node; the tree walk
//! additionally fans out at branch nodes. Both stop at a node they have
//! already visited, so cyclic graphs always terminate.

use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::tracking::TrackedGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which earlier visits stop the tree walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RevisitPolicy {
    /// A node may appear on several routes but only once per route
    #[default]
    PerPath,
    /// A node appears at most once in the whole tree
    Global,
}

/// Result of a linear walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSequence {
    /// Visited nodes, start first
    pub nodes: Vec<NodeId>,
    /// Node the walk refused to visit twice
    pub cycle_at: Option<NodeId>,
    /// Branch node that ended the walk
    pub stopped_at_branch: Option<NodeId>,
}

impl ResolvedSequence {
    /// Number of nodes in the sequence
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the sequence is empty (no start node)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look the sequence up in a graph
    pub fn resolve_nodes<'a>(&self, graph: &'a Graph) -> Vec<&'a Node> {
        self.nodes.iter().filter_map(|id| graph.node(*id)).collect()
    }
}

/// Branch-aware walk result.
///
/// `segment` is a maximal linear run ending at a branch node or a leaf. A
/// segment ending at a branch has one sub-tree per connected output, in slot
/// order, each starting at the node right after the branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceTree {
    /// Linear run of nodes
    pub segment: Vec<NodeId>,
    /// Sub-trees after a trailing branch node
    pub branches: Vec<SequenceTree>,
    /// Node the walk refused to revisit at the end of this segment
    pub cycle_at: Option<NodeId>,
}

impl SequenceTree {
    /// Every root-to-leaf route as a flat sequence
    pub fn routes(&self) -> Vec<Vec<NodeId>> {
        if self.branches.is_empty() {
            return vec![self.segment.clone()];
        }

        self.branches
            .iter()
            .flat_map(|branch| branch.routes())
            .map(|tail| {
                let mut route = self.segment.clone();
                route.extend(tail);
                route
            })
            .collect()
    }

    /// Nodes in the tree, counting shared tails once per occurrence
    pub fn node_count(&self) -> usize {
        self.segment.len() + self.branches.iter().map(SequenceTree::node_count).sum::<usize>()
    }

    /// Number of root-to-leaf routes
    pub fn route_count(&self) -> usize {
        if self.branches.is_empty() {
            1
        } else {
            self.branches.iter().map(SequenceTree::route_count).sum()
        }
    }
}

/// Default cap on the routes a tree walk may produce
pub const DEFAULT_MAX_ROUTES: usize = 256;

/// The tree walk found more routes than allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Graph has more than {limit} routes")]
pub struct TooManyRoutes {
    /// Configured route cap
    pub limit: usize,
}

/// Resolves export order from a tracked graph
#[derive(Debug, Clone, Copy)]
pub struct SequenceResolver {
    /// Revisit policy for tree walks
    pub policy: RevisitPolicy,
    /// Most routes a tree walk may produce
    pub max_routes: usize,
}

impl Default for SequenceResolver {
    fn default() -> Self {
        Self::new(RevisitPolicy::default())
    }
}

impl SequenceResolver {
    /// Create a resolver with a revisit policy
    pub fn new(policy: RevisitPolicy) -> Self {
        Self {
            policy,
            max_routes: DEFAULT_MAX_ROUTES,
        }
    }

    /// Set the route cap
    pub fn with_max_routes(mut self, max_routes: usize) -> Self {
        self.max_routes = max_routes;
        self
    }

    /// Follow single output links from the start node.
    ///
    /// A graph without a start node yields an empty sequence.
    pub fn resolve_linear(&self, graph: &TrackedGraph<'_>) -> ResolvedSequence {
        let mut resolved = ResolvedSequence::default();
        let Some(start) = graph.start_node() else {
            tracing::debug!("No start node; nothing to resolve");
            return resolved;
        };

        let mut visited = HashSet::new();
        let mut current = Some(start.id);
        while let Some(id) = current {
            let Some(node) = graph.node(id) else {
                break;
            };
            if !visited.insert(id) {
                tracing::debug!("Cycle detected at '{}'; sequence truncated", node.name);
                resolved.cycle_at = Some(id);
                break;
            }

            resolved.nodes.push(id);
            if node.kind.is_branch() {
                resolved.stopped_at_branch = Some(id);
                break;
            }
            current = node.next_linear();
        }

        resolved
    }

    /// Walk the graph from the start node, fanning out at branches.
    ///
    /// A graph without a start node yields an empty tree. The walk gives up
    /// once it has completed more than `max_routes` routes, since
    /// reconverging branches multiply the route count.
    pub fn resolve_tree(&self, graph: &TrackedGraph<'_>) -> Result<SequenceTree, TooManyRoutes> {
        let Some(start) = graph.start_node() else {
            tracing::debug!("No start node; nothing to resolve");
            return Ok(SequenceTree::default());
        };

        let mut walk = TreeWalk::default();
        self.grow(graph, start.id, &mut walk)
    }

    fn grow(
        &self,
        graph: &TrackedGraph<'_>,
        first: NodeId,
        walk: &mut TreeWalk,
    ) -> Result<SequenceTree, TooManyRoutes> {
        let mut tree = SequenceTree::default();
        let mut current = Some(first);

        while let Some(id) = current {
            let Some(node) = graph.node(id) else {
                break;
            };
            let blocked = match self.policy {
                RevisitPolicy::PerPath => walk.path.contains(&id),
                RevisitPolicy::Global => walk.seen.contains(&id),
            };
            if blocked {
                tracing::debug!("Revisit of '{}' stopped a route", node.name);
                tree.cycle_at = Some(id);
                break;
            }

            walk.path.insert(id);
            walk.seen.insert(id);
            tree.segment.push(id);

            if node.kind.is_branch() {
                for link in &node.connections().outputs {
                    let branch = self.grow(graph, link.id, walk)?;
                    tree.branches.push(branch);
                }
                break;
            }
            current = node.next_linear();
        }

        for id in &tree.segment {
            walk.path.remove(id);
        }

        if tree.branches.is_empty() {
            walk.routes += 1;
            if walk.routes > self.max_routes {
                tracing::warn!("Route limit of {} exceeded", self.max_routes);
                return Err(TooManyRoutes { limit: self.max_routes });
            }
        }
        Ok(tree)
    }
}

#[derive(Default)]
struct TreeWalk {
    path: HashSet<NodeId>,
    seen: HashSet<NodeId>,
    routes: usize,
}
