// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialized graph format.
//!
//! ```json
//! {
//!   "nodes": [{"id": 1, "type": "Image.Read", "translate": [10, 30], "connections": {"out_exec": 1}}],
//!   "connectors": [[3, 1, "out_exec", 2, "in_exec"]],
//!   "local_vars": [["threshold", "number", 0.5]],
//!   "inputs": [], "outputs": [], "subgraphs": []
//! }
//! ```

use crate::node::Node;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-slot connection counts of a serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotConnectionCounts {
    /// Counts keyed by slot name (written by this crate)
    Named(IndexMap<String, usize>),
    /// Legacy counts aligned to inputs-then-outputs order
    Positional(Vec<usize>),
}

impl Default for SlotConnectionCounts {
    fn default() -> Self {
        Self::Named(IndexMap::new())
    }
}

impl SlotConnectionCounts {
    /// Stored count for `slot` of `node`, resolving positional entries
    /// against the node's current slot order.
    pub fn count_for(&self, node: &Node, slot: &str) -> Option<usize> {
        match self {
            Self::Named(counts) => counts.get(slot).copied(),
            Self::Positional(counts) => node
                .slots()
                .position(|s| s.name == slot)
                .and_then(|index| counts.get(index).copied()),
        }
    }
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    /// Id in the graph it was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Registered type name
    #[serde(rename = "type")]
    pub node_type: String,
    /// Position `[x, y]`
    pub translate: [f64; 2],
    /// Connection counts per slot
    #[serde(default)]
    pub connections: SlotConnectionCounts,
    /// Width of resizable nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height of resizable nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Per-node data, extended by type hooks
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

/// Serialized connector `[id, out_node_id, out_slot, in_node_id, in_slot]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedConnector(pub u64, pub u64, pub String, pub u64, pub String);

/// Serialized variable `[name, type, value]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedVariable(pub String, pub String, pub Value);

/// Named subgraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSubgraph {
    /// Name within the parent
    pub name: String,
    /// Graph content
    #[serde(flatten)]
    pub graph: SerializedGraph,
}

/// Serialized graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedGraph {
    /// Nodes in insertion order
    pub nodes: Vec<SerializedNode>,
    /// Connectors in insertion order
    pub connectors: Vec<SerializedConnector>,
    /// Local variables
    pub local_vars: Vec<SerializedVariable>,
    /// Graph inputs
    pub inputs: Vec<SerializedVariable>,
    /// Graph outputs
    pub outputs: Vec<SerializedVariable>,
    /// Owned child graphs
    pub subgraphs: Vec<SerializedSubgraph>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_is_a_json_array() {
        let c = SerializedConnector(3, 1, "image".into(), 2, "input".into());
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"[3,1,"image",2,"input"]"#);
    }

    #[test]
    fn test_legacy_positional_counts_parse() {
        let data: SerializedNode = serde_json::from_str(
            r#"{"id": 4, "type": "Image.Show", "translate": [1, 2], "connections": [1, 0]}"#,
        )
        .unwrap();
        assert_eq!(data.connections, SlotConnectionCounts::Positional(vec![1, 0]));
        assert_eq!(data.translate, [1.0, 2.0]);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let graph: SerializedGraph = serde_json::from_str(r#"{"nodes": []}"#).unwrap();
        assert!(graph.connectors.is_empty());
        assert!(graph.subgraphs.is_empty());
    }

    #[test]
    fn test_subgraph_is_flattened() {
        let sub = SerializedSubgraph {
            name: "inner".into(),
            graph: SerializedGraph::default(),
        };
        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(value["name"], "inner");
        assert!(value["nodes"].is_array());
    }
}
