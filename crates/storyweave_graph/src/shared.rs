// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph handle for multi-threaded hosts.

use crate::graph::Graph;
use crate::tracking::TrackedGraph;
use parking_lot::RwLock;
use std::sync::Arc;

/// A graph shared between threads.
///
/// Exports go through [`SharedGraph::with_tracked`], which holds the write
/// lock for refresh and resolution, so they never interleave with edits.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<Graph>>,
}

impl SharedGraph {
    /// Wrap a graph
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Mutate the graph under the write lock
    pub fn edit<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Read the graph under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&self.inner.read())
    }

    /// Refresh connection tracking and work on the tracked graph
    pub fn with_tracked<R>(&self, f: impl FnOnce(&TrackedGraph<'_>) -> R) -> R {
        let mut graph = self.inner.write();
        let tracked = graph.refresh_connections();
        f(&tracked)
    }
}

impl From<Graph> for SharedGraph {
    fn from(graph: Graph) -> Self {
        Self::new(graph)
    }
}
