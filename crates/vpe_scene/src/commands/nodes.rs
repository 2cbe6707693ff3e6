// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adding and removing nodes.

use super::{Command, CommandInput};
use crate::error::Result;
use crate::state::SceneState;
use std::collections::HashSet;
use std::sync::Arc;
use vpe_graph::{GraphError, Node, NodeId, Point, RemovedNode};

/// Add a prepared node
#[derive(Debug, Clone)]
pub struct AddNodeCommand {
    node: Node,
    added: Option<NodeId>,
}

impl AddNodeCommand {
    /// Add `node` at its own position
    pub fn new(node: Node) -> Self {
        Self { node, added: None }
    }

    /// Id given to the node once executed
    pub fn node_id(&self) -> Option<NodeId> {
        self.added
    }
}

impl Command for AddNodeCommand {
    fn description(&self) -> String {
        format!("Add {}", self.node.title)
    }

    fn exec(&mut self, state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        let id = state.add_node(self.node.clone())?;
        if let Some(node) = state.graph.node(id) {
            self.node = node.clone();
        }
        self.added = Some(id);
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        if let Some(id) = self.added {
            state.remove_node(id);
        }
        Ok(())
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        state.restore_node(self.node.clone())?;
        Ok(())
    }
}

/// Create a node of a registered type
#[derive(Debug, Clone)]
pub struct CreateNodeCommand {
    node_type: String,
    position: Option<Point>,
    title: String,
    inner: Option<AddNodeCommand>,
}

impl CreateNodeCommand {
    /// Create a node of `node_type` at the pointer
    pub fn new(node_type: impl Into<String>) -> Self {
        let node_type = node_type.into();
        Self {
            title: node_type.clone(),
            node_type,
            position: None,
            inner: None,
        }
    }

    /// Place the node at `position` instead of the pointer
    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Id of the created node
    pub fn node_id(&self) -> Option<NodeId> {
        self.inner.as_ref().and_then(AddNodeCommand::node_id)
    }
}

impl Command for CreateNodeCommand {
    fn description(&self) -> String {
        format!("Create {}", self.title)
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        let registry = Arc::clone(state.graph.registry());
        let mut node = registry
            .read()
            .create(&self.node_type)
            .ok_or_else(|| GraphError::UnknownType(self.node_type.clone()))?;
        node.position = self.position.unwrap_or_else(|| state.pointer());
        self.title = node.title.clone();

        let mut inner = AddNodeCommand::new(node);
        inner.exec(state, input)?;
        self.inner = Some(inner);
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.undo(state),
            None => Ok(()),
        }
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.redo(state),
            None => Ok(()),
        }
    }

    fn support_undo(&self) -> bool {
        self.inner.is_some()
    }
}

/// Delete the selected nodes and everything connected to them
#[derive(Debug, Clone, Default)]
pub struct RemoveSelectedNodesCommand {
    removed: Vec<RemovedNode>,
}

impl RemoveSelectedNodesCommand {
    /// New removal of whatever is selected at exec
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes removed by the last exec
    pub fn removed(&self) -> &[RemovedNode] {
        &self.removed
    }
}

impl Command for RemoveSelectedNodesCommand {
    fn description(&self) -> String {
        format!("Remove {} node(s)", self.removed.len())
    }

    fn exec(&mut self, state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        let ids = state.selected_ids();
        self.removed = ids.into_iter().filter_map(|id| state.remove_node(id)).collect();
        tracing::debug!("Removed {} node(s)", self.removed.len());
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        for removed in &self.removed {
            state.restore_node(removed.node.clone())?;
        }
        let mut restored = HashSet::new();
        for connector in self.removed.iter().flat_map(|r| r.connectors.iter()) {
            if connector.id.is_some_and(|id| !restored.insert(id)) {
                continue;
            }
            state.restore_connector(connector.clone())?;
        }
        Ok(())
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        for removed in &self.removed {
            if let Some(id) = removed.node.id {
                state.remove_node(id);
            }
        }
        Ok(())
    }

    fn support_undo(&self) -> bool {
        !self.removed.is_empty()
    }
}
