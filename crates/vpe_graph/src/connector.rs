// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connectors between node slots.

use crate::node::{NodeId, VisualState};
use crate::serialized::SerializedConnector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a connector; shares the id counter with nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorId(pub u64);

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slot on a specific node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Owning node
    pub node: NodeId,
    /// Slot name
    pub slot: String,
}

impl Endpoint {
    /// Create an endpoint
    pub fn new(node: NodeId, slot: impl Into<String>) -> Self {
        Self {
            node,
            slot: slot.into(),
        }
    }
}

/// A connector from an output slot to an input slot
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    /// Id, assigned when added to a graph
    pub id: Option<ConnectorId>,
    /// Output end
    pub out: Endpoint,
    /// Input end
    pub input: Endpoint,
    /// Visual state
    pub state: VisualState,
}

impl Connector {
    /// Create a detached connector; endpoints are normalized by the graph
    pub fn new(out: Endpoint, input: Endpoint) -> Self {
        Self {
            id: None,
            out,
            input,
            state: VisualState::Normal,
        }
    }

    /// Whether either end is on `node`
    pub fn involves_node(&self, node: NodeId) -> bool {
        self.out.node == node || self.input.node == node
    }

    /// Whether either end is `endpoint`
    pub fn involves(&self, endpoint: &Endpoint) -> bool {
        self.out == *endpoint || self.input == *endpoint
    }

    /// Whether the connector links `a` and `b` in either order
    pub fn links(&self, a: &Endpoint, b: &Endpoint) -> bool {
        (self.out == *a && self.input == *b) || (self.out == *b && self.input == *a)
    }

    /// The end opposite to `endpoint`
    pub fn other_end(&self, endpoint: &Endpoint) -> Option<&Endpoint> {
        if self.out == *endpoint {
            Some(&self.input)
        } else if self.input == *endpoint {
            Some(&self.out)
        } else {
            None
        }
    }

    /// Serialized array form; detached connectors serialize with id 0
    pub fn to_serialized(&self) -> SerializedConnector {
        SerializedConnector(
            self.id.map_or(0, |id| id.0),
            self.out.node.0,
            self.out.slot.clone(),
            self.input.node.0,
            self.input.slot.clone(),
        )
    }

    /// Rebuild from the serialized form, keeping the stored id
    pub fn from_serialized(data: &SerializedConnector) -> Self {
        let SerializedConnector(id, out_node, out_slot, in_node, in_slot) = data;
        Self {
            id: Some(ConnectorId(*id)),
            out: Endpoint::new(NodeId(*out_node), out_slot.clone()),
            input: Endpoint::new(NodeId(*in_node), in_slot.clone()),
            state: VisualState::Normal,
        }
    }
}
