// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph model for `StoryWeave`.
//!
//! A script is a directed graph of scene nodes. This crate owns:
//! - Nodes with structural ports (start, linear, branch)
//! - Connections validated output to input
//! - Connection tracking, the cached neighbor links used for export
//! - Sequence resolution into linear runs and branch trees
//! - The graph file format
//!
//! ## Flow
//!
//! Edits go through [`Graph`]. Before anything is exported the graph is
//! refreshed with [`Graph::refresh_connections`], which yields a
//! [`TrackedGraph`] for the [`SequenceResolver`].

pub mod port;
pub mod connection;
pub mod content;
pub mod node;
pub mod graph;
pub mod tracking;
pub mod resolver;
pub mod persistence;
pub mod shared;

pub use port::{Port, PortId, PortDirection};
pub use connection::{Connection, ConnectionId};
pub use content::{ContentItem, InTransition, OutTransition, SceneForm, SceneType};
pub use node::{Node, NodeId, NodeKind, NodeLink, TrackedConnections, MAX_BRANCH_OUTPUTS};
pub use graph::{ConnectionError, Graph, GraphError};
pub use tracking::{ConnectionTracker, TrackedGraph};
pub use resolver::{
    ResolvedSequence, RevisitPolicy, SequenceResolver, SequenceTree, TooManyRoutes,
    DEFAULT_MAX_ROUTES,
};
pub use persistence::{GraphDocument, PersistenceError};
pub use shared::SharedGraph;
