// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node instances.

use crate::geometry::{Point, Size};
use crate::serialized::{SerializedNode, SlotConnectionCounts};
use crate::slot::{NodeSlot, SlotConnection, SlotDirection};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Smallest width or height a resizable node may take
pub const MIN_NODE_SIZE: f64 = 10.0;

/// Unique identifier of a node within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a node participates in layering and hit testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// Ordinary node with slots
    #[default]
    Regular,
    /// Resizable annotation drawn behind every regular node
    Comment,
}

/// Visual state shared by nodes, slots and connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VisualState {
    /// Nothing special
    #[default]
    Normal,
    /// Under the pointer
    Hovered,
    /// Part of the selection
    Selected,
}

/// A node, detached or owned by a graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Id, assigned when the node is added to a graph
    pub id: Option<NodeId>,
    /// Registered type name
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Regular or comment
    pub kind: NodeKind,
    /// Scene position of the body's top-left corner
    pub position: Point,
    /// Explicit size for resizable nodes
    pub size: Option<Size>,
    /// Input slots in declaration order
    pub inputs: IndexMap<String, NodeSlot>,
    /// Output slots in declaration order
    pub outputs: IndexMap<String, NodeSlot>,
    /// Visual state
    pub state: VisualState,
    /// Free-form per-node data
    pub properties: Map<String, Value>,
}

impl Node {
    /// Create an empty detached node
    pub fn new(node_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            node_type: node_type.into(),
            title: title.into(),
            kind: NodeKind::Regular,
            position: Point::ZERO,
            size: None,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            state: VisualState::Normal,
            properties: Map::new(),
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Whether this is a comment node
    pub fn is_comment(&self) -> bool {
        self.kind == NodeKind::Comment
    }

    /// Whether the node carries an explicit, user-resizable size
    pub fn is_resizable(&self) -> bool {
        self.size.is_some()
    }

    /// Set the size of a resizable node, clamped to the minimum
    pub fn set_size(&mut self, size: Size) {
        if self.size.is_some() {
            self.size = Some(Size::new(
                size.width.max(MIN_NODE_SIZE),
                size.height.max(MIN_NODE_SIZE),
            ));
        }
    }

    /// Look up a slot by name in inputs then outputs
    pub fn slot(&self, name: &str) -> Option<&NodeSlot> {
        self.inputs.get(name).or_else(|| self.outputs.get(name))
    }

    /// Mutable slot lookup
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut NodeSlot> {
        if self.inputs.contains_key(name) {
            self.inputs.get_mut(name)
        } else {
            self.outputs.get_mut(name)
        }
    }

    /// All slots, inputs first
    pub fn slots(&self) -> impl Iterator<Item = &NodeSlot> {
        self.inputs.values().chain(self.outputs.values())
    }

    /// Mutable iteration over all slots
    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut NodeSlot> {
        self.inputs.values_mut().chain(self.outputs.values_mut())
    }

    /// Reset every slot's connection count
    pub fn strip_connections(&mut self) {
        for slot in self.slots_mut() {
            slot.connections = 0;
        }
    }

    /// Check whether `slot` on this node may connect to `other_slot` on `other`
    pub fn check_connection(&self, slot: &str, other: &Node, other_slot: &str) -> SlotConnection {
        let Some(this_slot) = self.slot(slot) else {
            return SlotConnection::reject(format!("{} has no slot {slot}", self.title));
        };
        let Some(that_slot) = other.slot(other_slot) else {
            return SlotConnection::reject(format!("{} has no slot {other_slot}", other.title));
        };
        if self.id.is_some() && self.id == other.id {
            return SlotConnection::reject("Both are on the same node.");
        }
        this_slot.check_connection(that_slot)
    }

    /// Direction of a named slot
    pub fn slot_direction(&self, name: &str) -> Option<SlotDirection> {
        self.slot(name).map(|s| s.direction)
    }

    /// Base serialized form, before type hooks run
    pub fn to_serialized(&self) -> SerializedNode {
        let counts = self
            .slots()
            .map(|s| (s.name.clone(), s.connections))
            .collect();
        SerializedNode {
            id: self.id.map(|id| id.0),
            node_type: self.node_type.clone(),
            translate: self.position.to_array(),
            connections: SlotConnectionCounts::Named(counts),
            width: self.size.map(|s| s.width),
            height: self.size.map(|s| s.height),
            properties: self.properties.clone(),
        }
    }

    /// Apply the base serialized fields. Connection counts are rebuilt from
    /// connectors by the graph, so they are not read here.
    pub fn apply_serialized(&mut self, data: &SerializedNode) {
        self.position = Point::from(data.translate);
        if let Some(size) = self.size {
            self.set_size(Size::new(
                data.width.unwrap_or(size.width),
                data.height.unwrap_or(size.height),
            ));
        }
        for (key, value) in &data.properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{SlotDecl, SlotVerdict};

    fn node_with_slots() -> Node {
        let mut node = Node::new("Test.Node", "Test");
        let input = NodeSlot::from_decl(&SlotDecl::data("a", "number"), SlotDirection::In);
        let output = NodeSlot::from_decl(&SlotDecl::data("b", "number"), SlotDirection::Out);
        node.inputs.insert("a".into(), input);
        node.outputs.insert("b".into(), output);
        node
    }

    #[test]
    fn test_slot_lookup_spans_inputs_and_outputs() {
        let node = node_with_slots();
        assert_eq!(node.slot_direction("a"), Some(SlotDirection::In));
        assert_eq!(node.slot_direction("b"), Some(SlotDirection::Out));
        assert!(node.slot("c").is_none());
        assert_eq!(node.slots().count(), 2);
    }

    #[test]
    fn test_same_node_is_rejected() {
        let mut node = node_with_slots();
        node.id = Some(NodeId(3));
        let verdict = node.check_connection("b", &node.clone(), "a");
        assert_eq!(verdict.verdict, SlotVerdict::Reject);
        assert_eq!(verdict.reason, "Both are on the same node.");
    }

    #[test]
    fn test_resize_is_clamped() {
        let mut node = Node::new("Comment", "Comment");
        node.set_size(Size::new(50.0, 50.0));
        assert!(node.size.is_none());

        node.size = Some(Size::new(200.0, 200.0));
        node.set_size(Size::new(2.0, 40.0));
        assert_eq!(node.size, Some(Size::new(MIN_NODE_SIZE, 40.0)));
    }

    #[test]
    fn test_serialized_counts_are_keyed_by_name() {
        let mut node = node_with_slots().with_position(4.0, 5.0);
        node.id = Some(NodeId(7));
        if let Some(slot) = node.slot_mut("b") {
            slot.add_connection();
        }

        let data = node.to_serialized();
        assert_eq!(data.id, Some(7));
        assert_eq!(data.translate, [4.0, 5.0]);
        assert_eq!(data.connections.count_for(&node, "b"), Some(1));
        assert_eq!(data.connections.count_for(&node, "a"), Some(0));
    }
}
