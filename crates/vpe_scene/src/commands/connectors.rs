// SPDX-License-Identifier: MIT OR Apache-2.0
//! Breaking connectors.

use super::{Command, CommandInput};
use crate::error::Result;
use crate::state::SceneState;
use vpe_graph::{Connector, ConnectorId, Endpoint, NodeId};

#[derive(Debug, Clone)]
enum Targets {
    Ids(Vec<ConnectorId>),
    Node(NodeId),
    Slot(Endpoint),
}

/// Remove a set of connectors as one undoable step
#[derive(Debug, Clone)]
pub struct RemoveConnectorsCommand {
    targets: Targets,
    removed: Vec<Connector>,
}

impl RemoveConnectorsCommand {
    /// Remove the given connectors
    pub fn new(ids: Vec<ConnectorId>) -> Self {
        Self {
            targets: Targets::Ids(ids),
            removed: Vec::new(),
        }
    }

    /// Remove every connector touching a node
    pub fn for_node(node: NodeId) -> Self {
        Self {
            targets: Targets::Node(node),
            removed: Vec::new(),
        }
    }

    /// Remove every connector attached to a slot
    pub fn for_slot(slot: Endpoint) -> Self {
        Self {
            targets: Targets::Slot(slot),
            removed: Vec::new(),
        }
    }

    /// Connectors removed by the last exec or redo
    pub fn removed(&self) -> &[Connector] {
        &self.removed
    }
}

impl Command for RemoveConnectorsCommand {
    fn description(&self) -> String {
        match self.targets {
            Targets::Ids(_) => "Remove connector(s)".to_string(),
            Targets::Node(_) => "Break Node Link(s)".to_string(),
            Targets::Slot(_) => "Break All Pin Link(s)".to_string(),
        }
    }

    fn exec(&mut self, state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        let ids: Vec<ConnectorId> = match &self.targets {
            Targets::Ids(ids) => ids.clone(),
            Targets::Node(node) => state.graph.connectors_of_node(*node).filter_map(|c| c.id).collect(),
            Targets::Slot(slot) => state.graph.connectors_of_slot(slot).filter_map(|c| c.id).collect(),
        };
        self.removed = ids.into_iter().filter_map(|id| state.remove_connector(id)).collect();
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        for connector in self.removed.iter().rev() {
            state.restore_connector(connector.clone())?;
        }
        Ok(())
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        for connector in &self.removed {
            if let Some(id) = connector.id {
                state.remove_connector(id);
            }
        }
        Ok(())
    }

    fn support_undo(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{add, endpoint, state};

    #[test]
    fn test_break_slot_links() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        let b = add(&mut state, "Image.GaussianFilter", 200.0, 100.0);
        let c = add(&mut state, "Image.Show", 200.0, 300.0);
        state.connect(endpoint(a, "image"), endpoint(b, "input")).unwrap();
        state.connect(endpoint(a, "image"), endpoint(c, "image")).unwrap();
        state.connect(endpoint(a, "out_exec"), endpoint(b, "in_exec")).unwrap();

        let mut command = RemoveConnectorsCommand::for_slot(endpoint(a, "image"));
        command.exec(&mut state, &CommandInput::default()).unwrap();
        assert_eq!(command.removed().len(), 2);
        assert_eq!(state.graph.connector_count(), 1);
        assert_eq!(state.graph.node(a).unwrap().slot("image").unwrap().connections, 0);

        command.undo(&mut state).unwrap();
        assert_eq!(state.graph.connector_count(), 3);
        assert_eq!(state.graph.node(a).unwrap().slot("image").unwrap().connections, 2);
        command.redo(&mut state).unwrap();
        assert_eq!(state.graph.connector_count(), 1);
    }

    #[test]
    fn test_break_node_links() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        let b = add(&mut state, "Image.GaussianFilter", 200.0, 100.0);
        state.connect(endpoint(a, "image"), endpoint(b, "input")).unwrap();
        state.connect(endpoint(a, "out_exec"), endpoint(b, "in_exec")).unwrap();

        let mut command = RemoveConnectorsCommand::for_node(b);
        assert_eq!(command.description(), "Break Node Link(s)");
        command.exec(&mut state, &CommandInput::default()).unwrap();
        assert_eq!(state.graph.connector_count(), 0);
        assert!(command.support_undo());
    }

    #[test]
    fn test_nothing_to_break_is_not_recorded() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        let mut command = RemoveConnectorsCommand::for_node(a);
        command.exec(&mut state, &CommandInput::default()).unwrap();
        assert!(!command.support_undo());
    }
}
