// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node slots and the connection compatibility protocol.

use crate::node::VisualState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data type name used by control-flow slots
pub const EXEC_TYPE: &str = "exec";

/// Slot direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotDirection {
    /// Input slot
    In,
    /// Output slot
    Out,
}

impl SlotDirection {
    /// The complementary direction
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

/// Slot category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotCategory {
    /// Control flow
    Exec,
    /// Data flow
    Data,
}

/// Slot declaration inside a type descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDecl {
    /// Slot name, unique within the node
    pub name: String,
    /// Exec or data
    pub category: SlotCategory,
    /// Data type name; must match exactly to connect
    pub data_type: String,
    /// Default value shown by the host for unconnected data inputs
    #[serde(default)]
    pub default: Option<Value>,
}

impl SlotDecl {
    /// Declare an exec slot
    pub fn exec(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: SlotCategory::Exec,
            data_type: EXEC_TYPE.to_string(),
            default: None,
        }
    }

    /// Declare a data slot
    pub fn data(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: SlotCategory::Data,
            data_type: data_type.into(),
            default: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Outcome of a compatibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotVerdict {
    /// The slots cannot be connected
    Reject,
    /// Connect without touching existing connectors
    Add,
    /// Connect after removing the connector occupying a single-connection slot
    Replace,
}

/// Compatibility verdict with a reason for UI feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConnection {
    /// The verdict
    pub verdict: SlotVerdict,
    /// Human-readable explanation
    pub reason: String,
}

impl SlotConnection {
    /// Rejection with a reason
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            verdict: SlotVerdict::Reject,
            reason: reason.into(),
        }
    }

    fn add() -> Self {
        Self {
            verdict: SlotVerdict::Add,
            reason: "Add a connection".to_string(),
        }
    }

    fn replace() -> Self {
        Self {
            verdict: SlotVerdict::Replace,
            reason: "Replace the existing connections".to_string(),
        }
    }

    /// Whether a connection may be made
    pub fn is_allowed(&self) -> bool {
        self.verdict != SlotVerdict::Reject
    }
}

/// A slot instance on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSlot {
    /// Slot name
    pub name: String,
    /// In or out
    pub direction: SlotDirection,
    /// Exec or data
    pub category: SlotCategory,
    /// Data type name
    pub data_type: String,
    /// Default value from the declaration
    pub default: Option<Value>,
    /// Number of connectors attached
    pub connections: usize,
    /// Visual state
    #[serde(skip)]
    pub state: VisualState,
}

impl NodeSlot {
    /// Instantiate a declared slot
    pub fn from_decl(decl: &SlotDecl, direction: SlotDirection) -> Self {
        Self {
            name: decl.name.clone(),
            direction,
            category: decl.category,
            data_type: decl.data_type.clone(),
            default: decl.default.clone(),
            connections: 0,
            state: VisualState::Normal,
        }
    }

    /// Exec inputs and data outputs fan in/out freely; the others take one connector
    pub fn allows_multiple_connections(&self) -> bool {
        matches!(
            (self.direction, self.category),
            (SlotDirection::In, SlotCategory::Exec) | (SlotDirection::Out, SlotCategory::Data)
        )
    }

    /// Whether the slot has any connector
    pub fn is_connected(&self) -> bool {
        self.connections > 0
    }

    /// Whether a single-connection slot is already occupied
    pub fn is_at_limit(&self) -> bool {
        !self.allows_multiple_connections() && self.is_connected()
    }

    /// Record a new connector
    pub fn add_connection(&mut self) {
        if self.allows_multiple_connections() {
            self.connections += 1;
        } else {
            self.connections = 1;
        }
    }

    /// Record a removed connector
    pub fn break_connection(&mut self) {
        self.connections = self.connections.saturating_sub(1);
    }

    /// Check whether this slot may connect to `other`, ignoring node identity
    pub fn check_connection(&self, other: &NodeSlot) -> SlotConnection {
        if self.direction == other.direction {
            return SlotConnection::reject(format!(
                "Both slots are {}puts.",
                match self.direction {
                    SlotDirection::In => "in",
                    SlotDirection::Out => "out",
                }
            ));
        }
        if self.category != other.category || self.data_type != other.data_type {
            return SlotConnection::reject(format!(
                "{} is not compatible with {}",
                self.data_type, other.data_type
            ));
        }
        if self.is_at_limit() || other.is_at_limit() {
            SlotConnection::replace()
        } else {
            SlotConnection::add()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(decl: SlotDecl, direction: SlotDirection) -> NodeSlot {
        NodeSlot::from_decl(&decl, direction)
    }

    #[test]
    fn test_cardinality() {
        assert!(slot(SlotDecl::exec("in"), SlotDirection::In).allows_multiple_connections());
        assert!(!slot(SlotDecl::exec("out"), SlotDirection::Out).allows_multiple_connections());
        assert!(!slot(SlotDecl::data("x", "number"), SlotDirection::In).allows_multiple_connections());
        assert!(slot(SlotDecl::data("x", "number"), SlotDirection::Out).allows_multiple_connections());
    }

    #[test]
    fn test_single_slot_count_stays_at_one() {
        let mut s = slot(SlotDecl::data("x", "number"), SlotDirection::In);
        s.add_connection();
        s.add_connection();
        assert_eq!(s.connections, 1);
        s.break_connection();
        s.break_connection();
        assert_eq!(s.connections, 0);
    }

    #[test]
    fn test_compatibility_verdicts() {
        let out = slot(SlotDecl::data("image", "numpy.ndarray"), SlotDirection::Out);
        let mut input = slot(SlotDecl::data("input", "numpy.ndarray"), SlotDirection::In);
        let wrong = slot(SlotDecl::data("sigma", "number"), SlotDirection::In);

        assert_eq!(out.check_connection(&input).verdict, SlotVerdict::Add);
        assert_eq!(out.check_connection(&wrong).verdict, SlotVerdict::Reject);
        assert_eq!(
            out.check_connection(&wrong).reason,
            "numpy.ndarray is not compatible with number"
        );
        assert_eq!(out.check_connection(&out.clone()).verdict, SlotVerdict::Reject);

        input.add_connection();
        assert_eq!(out.check_connection(&input).verdict, SlotVerdict::Replace);
    }

    #[test]
    fn test_exec_and_data_never_mix() {
        let exec_out = slot(SlotDecl::exec("out_exec"), SlotDirection::Out);
        let data_in = slot(SlotDecl::data("in", EXEC_TYPE), SlotDirection::In);
        assert_eq!(exec_out.check_connection(&data_in).verdict, SlotVerdict::Reject);
    }
}
