// SPDX-License-Identifier: MIT OR Apache-2.0
//! Copy, cut, paste and duplicate.

use super::{Command, CommandInput, RemoveSelectedNodesCommand};
use crate::clipboard::ClipboardBundle;
use crate::error::Result;
use crate::state::SceneState;
use vpe_graph::{Connector, Node, NodeId, Point};

/// Store the selection in the host clipboard
#[derive(Debug, Clone, Default)]
pub struct CopyCommand;

impl CopyCommand {
    /// New copy
    pub fn new() -> Self {
        Self
    }
}

impl Command for CopyCommand {
    fn description(&self) -> String {
        "Copy".to_string()
    }

    fn exec(&mut self, state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        state.copy_selection_to_clipboard()?;
        Ok(())
    }

    fn undo(&mut self, _state: &mut SceneState) -> Result<()> {
        Ok(())
    }

    fn redo(&mut self, _state: &mut SceneState) -> Result<()> {
        Ok(())
    }

    fn support_undo(&self) -> bool {
        false
    }
}

/// Copy the selection, then delete it
#[derive(Debug, Clone, Default)]
pub struct CutCommand {
    remove: RemoveSelectedNodesCommand,
}

impl CutCommand {
    /// New cut
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for CutCommand {
    fn description(&self) -> String {
        format!("Cut {} node(s)", self.remove.removed().len())
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        state.copy_selection_to_clipboard()?;
        self.remove.exec(state, input)
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        self.remove.undo(state)
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        self.remove.redo(state)
    }

    fn support_undo(&self) -> bool {
        self.remove.support_undo()
    }
}

/// Insert a clipboard bundle so its top-left corner lands on a point
#[derive(Debug, Clone)]
pub struct PasteCommand {
    at: Point,
    bundle: Option<ClipboardBundle>,
    nodes: Vec<Node>,
    connectors: Vec<Connector>,
}

impl PasteCommand {
    /// Paste the host clipboard content at `at`
    pub fn new(at: Point) -> Self {
        Self {
            at,
            bundle: None,
            nodes: Vec::new(),
            connectors: Vec::new(),
        }
    }

    /// Paste a given bundle, leaving the host clipboard alone
    pub fn with_bundle(bundle: ClipboardBundle, at: Point) -> Self {
        Self {
            bundle: Some(bundle),
            ..Self::new(at)
        }
    }

    /// Ids of the pasted nodes
    pub fn pasted(&self) -> Vec<NodeId> {
        self.nodes.iter().filter_map(|n| n.id).collect()
    }
}

impl Command for PasteCommand {
    fn description(&self) -> String {
        format!("Paste {} node(s)", self.nodes.len())
    }

    fn exec(&mut self, state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        let bundle = match self.bundle.take() {
            Some(bundle) => bundle,
            None => state.load_clipboard(),
        };
        let ids = state.paste_bundle(&bundle, self.at)?;
        self.nodes = ids.iter().filter_map(|id| state.graph.node(*id).cloned()).collect();
        self.connectors = state.graph.connectors_of_nodes(&ids).cloned().collect();
        self.bundle = Some(bundle);
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        for id in self.pasted() {
            state.remove_node(id);
        }
        Ok(())
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        for node in &self.nodes {
            state.restore_node(node.clone())?;
        }
        for connector in &self.connectors {
            state.restore_connector(connector.clone())?;
        }
        state.set_selection(&self.pasted());
        Ok(())
    }

    fn support_undo(&self) -> bool {
        !self.nodes.is_empty()
    }
}

/// Paste a copy of the selection next to the originals without touching the
/// host clipboard
#[derive(Debug, Clone, Default)]
pub struct DuplicateCommand {
    paste: Option<PasteCommand>,
}

impl DuplicateCommand {
    /// New duplicate
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the copies
    pub fn duplicated(&self) -> Vec<NodeId> {
        self.paste.as_ref().map(PasteCommand::pasted).unwrap_or_default()
    }
}

impl Command for DuplicateCommand {
    fn description(&self) -> String {
        format!("Duplicate {} node(s)", self.duplicated().len())
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        let bundle = ClipboardBundle::capture(&state.graph, &state.selected_ids());
        if bundle.is_empty {
            return Ok(());
        }
        let offset = state.config.duplicate_offset;
        let at = Point::new(bundle.min_x_of_nodes + offset, bundle.min_y_of_nodes + offset);
        let mut paste = PasteCommand::with_bundle(bundle, at);
        paste.exec(state, input)?;
        self.paste = Some(paste);
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        match self.paste.as_mut() {
            Some(paste) => paste.undo(state),
            None => Ok(()),
        }
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        match self.paste.as_mut() {
            Some(paste) => paste.redo(state),
            None => Ok(()),
        }
    }

    fn support_undo(&self) -> bool {
        self.paste.as_ref().is_some_and(PasteCommand::support_undo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{add, endpoint, state};

    #[test]
    fn test_copy_then_paste_offsets_nodes() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        let b = add(&mut state, "Image.GaussianFilter", 200.0, 100.0);
        state.connect(endpoint(a, "image"), endpoint(b, "input")).unwrap();
        state.select_nodes(&[a, b]);

        let mut copy = CopyCommand::new();
        copy.exec(&mut state, &CommandInput::default()).unwrap();
        assert!(!copy.support_undo());

        let mut paste = PasteCommand::new(Point::new(60.0, 80.0));
        paste.exec(&mut state, &CommandInput::default()).unwrap();
        let pasted = paste.pasted();
        assert_eq!(pasted.len(), 2);
        assert_eq!(state.graph.node_count(), 4);
        assert_eq!(state.graph.connector_count(), 2);
        assert_eq!(state.selected_ids(), pasted);
        assert_eq!(state.graph.node(pasted[0]).unwrap().position, Point::new(60.0, 80.0));
        assert_eq!(state.graph.node(pasted[1]).unwrap().position, Point::new(250.0, 150.0));

        paste.undo(&mut state).unwrap();
        assert_eq!(state.graph.node_count(), 2);
        assert_eq!(state.graph.connector_count(), 1);
        paste.redo(&mut state).unwrap();
        assert_eq!(state.graph.node_count(), 4);
        assert_eq!(state.graph.connector_count(), 2);
        assert_eq!(state.selected_ids(), pasted);
    }

    #[test]
    fn test_paste_empty_clipboard_is_not_recorded() {
        let mut state = state();
        let mut paste = PasteCommand::new(Point::ZERO);
        paste.exec(&mut state, &CommandInput::default()).unwrap();
        assert!(!paste.support_undo());
        assert_eq!(state.graph.node_count(), 0);
    }

    #[test]
    fn test_cut_removes_and_fills_clipboard() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        state.select_node(a);
        let mut cut = CutCommand::new();
        cut.exec(&mut state, &CommandInput::default()).unwrap();
        assert_eq!(state.graph.node_count(), 0);
        assert!(cut.support_undo());
        assert_eq!(state.load_clipboard().nodes.len(), 1);

        cut.undo(&mut state).unwrap();
        assert!(state.graph.contains_node(a));
    }

    #[test]
    fn test_duplicate_uses_offset_and_keeps_clipboard() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        state.select_node(a);
        let mut duplicate = DuplicateCommand::new();
        duplicate.exec(&mut state, &CommandInput::default()).unwrap();

        let copies = duplicate.duplicated();
        assert_eq!(copies.len(), 1);
        let offset = state.config.duplicate_offset;
        assert_eq!(
            state.graph.node(copies[0]).unwrap().position,
            Point::new(10.0 + offset, 30.0 + offset)
        );
        assert!(state.load_clipboard().is_empty);
    }
}
