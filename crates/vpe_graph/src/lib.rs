// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed node graph model for the visual programming environment.
//!
//! This crate holds everything that describes the *structure* of a graph:
//! - Node type descriptors and the registry that builds nodes from them
//! - Nodes with named input/output slots
//! - Connectors between slots, with the compatibility protocol
//! - Graph variables and owned subgraphs
//! - The serialized form used for saving and the clipboard
//!
//! ## Architecture
//!
//! A [`Graph`] is created with a [`SharedRegistry`]. Nodes are built detached
//! by the registry and only receive a [`NodeId`] once inserted. Ids for nodes
//! and connectors come from one counter owned by the graph.

pub mod connector;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod library;
pub mod node;
pub mod registry;
pub mod serialized;
pub mod slot;
pub mod variable;

pub use connector::{Connector, ConnectorId, Endpoint};
pub use error::{GraphError, RegistryError};
pub use geometry::{CubicBezier, Point, Rect, Size};
pub use graph::{ConnectOutcome, Graph, GraphListener, RemovedNode};
pub use node::{Node, NodeId, NodeKind, VisualState};
pub use registry::{
    default_registry, Appearance, CategoryTree, NodeHooks, SharedRegistry, TypeDescriptor,
    TypeRegistry,
};
pub use serialized::{
    SerializedConnector, SerializedGraph, SerializedNode, SerializedSubgraph, SerializedVariable,
    SlotConnectionCounts,
};
pub use slot::{NodeSlot, SlotCategory, SlotConnection, SlotDecl, SlotDirection, SlotVerdict};
pub use variable::{Variable, VariableScope};
