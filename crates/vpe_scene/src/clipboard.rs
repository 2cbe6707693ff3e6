// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clipboard bundle and the host key-value store it is persisted in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vpe_graph::{Graph, NodeId, SerializedConnector, SerializedNode, SlotConnectionCounts};

/// Copied nodes and the connectors between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardBundle {
    /// Whether nothing was copied
    pub is_empty: bool,
    /// Serialized nodes keyed by their id at copy time
    pub nodes: IndexMap<String, SerializedNode>,
    /// Connectors whose both ends were copied
    pub connectors: Vec<SerializedConnector>,
    /// Smallest x of the copied nodes
    pub min_x_of_nodes: f64,
    /// Smallest y of the copied nodes
    pub min_y_of_nodes: f64,
}

impl Default for ClipboardBundle {
    fn default() -> Self {
        Self::empty()
    }
}

impl ClipboardBundle {
    /// Bundle with nothing in it
    pub fn empty() -> Self {
        Self {
            is_empty: true,
            nodes: IndexMap::new(),
            connectors: Vec::new(),
            min_x_of_nodes: 0.0,
            min_y_of_nodes: 0.0,
        }
    }

    /// Capture nodes of a graph. Connection counts are dropped; they are
    /// rebuilt from the connectors when pasting.
    pub fn capture(graph: &Graph, node_ids: &[NodeId]) -> Self {
        let registry = graph.registry().read();
        let mut nodes = IndexMap::new();
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        for id in node_ids {
            let Some(node) = graph.node(*id) else {
                tracing::warn!("Cannot copy missing node {id}");
                continue;
            };
            let mut data = registry.serialize_node(node);
            data.connections = SlotConnectionCounts::default();
            min_x = min_x.min(data.translate[0]);
            min_y = min_y.min(data.translate[1]);
            nodes.insert(id.0.to_string(), data);
        }
        if nodes.is_empty() {
            return Self::empty();
        }

        let copied: HashSet<NodeId> = node_ids.iter().copied().collect();
        let connectors = graph
            .connectors()
            .filter(|c| copied.contains(&c.out.node) && copied.contains(&c.input.node))
            .map(|c| c.to_serialized())
            .collect();

        Self {
            is_empty: false,
            nodes,
            connectors,
            min_x_of_nodes: min_x,
            min_y_of_nodes: min_y,
        }
    }

    /// JSON text
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Persistent key-value store provided by the host
pub trait ClipboardStore {
    /// Read a value
    fn load(&self, key: &str) -> Option<String>;
    /// Write a value
    fn store(&mut self, key: &str, value: String);
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl ClipboardStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}
