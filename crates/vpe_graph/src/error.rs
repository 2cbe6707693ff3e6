// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the graph model.

use crate::node::NodeId;
use thiserror::Error;

/// Graph operation errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Slot not found on a node
    #[error("Slot '{slot}' not found on node {node}")]
    SlotNotFound {
        /// Node that was searched
        node: NodeId,
        /// Missing slot name
        slot: String,
    },

    /// Slots cannot be connected
    #[error("Cannot connect: {0}")]
    Incompatible(String),

    /// Node or connector id already in use
    #[error("Id already in use: {0}")]
    IdInUse(u64),

    /// A node or connector without an id was passed where a previously
    /// inserted one is required
    #[error("Node or connector has no id")]
    MissingId,

    /// Variable name already taken in some scope
    #[error("Variable name already used: {0}")]
    DuplicateName(String),

    /// Variable not found
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    /// Subgraph name already taken
    #[error("Subgraph already exists: {0}")]
    DuplicateSubgraph(String),

    /// Node type is not registered
    #[error("Unknown node type: {0}")]
    UnknownType(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Descriptor does not have the minimum shape
    #[error("Invalid node type descriptor '{type_name}': {reason}")]
    InvalidDescriptor {
        /// Offending type name
        type_name: String,
        /// Why it was rejected
        reason: String,
    },
}
