// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resizing comment nodes by their borders.

use super::{Command, CommandInput};
use crate::error::Result;
use crate::layout::ResizeBorder;
use crate::state::SceneState;
use vpe_graph::node::MIN_NODE_SIZE;
use vpe_graph::{NodeId, Point, Rect};

/// Drag one border of a resizable node
#[derive(Debug, Clone)]
pub struct ResizeCommand {
    node: NodeId,
    border: ResizeBorder,
    start: Point,
    original: Rect,
    current: Rect,
}

impl ResizeCommand {
    /// Resize `node` by dragging `border`
    pub fn new(node: NodeId, border: ResizeBorder) -> Self {
        Self {
            node,
            border,
            start: Point::ZERO,
            original: Rect::default(),
            current: Rect::default(),
        }
    }
}

impl Command for ResizeCommand {
    fn description(&self) -> String {
        "Resize node".to_string()
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.start = input.pos;
        self.original = state.node_bounds(self.node).unwrap_or_default();
        self.current = self.original;
        Ok(())
    }

    fn update(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        let rect = self.border.apply(self.original, input.pos - self.start, MIN_NODE_SIZE);
        if rect != self.current {
            self.current = rect;
            state.set_node_rect(self.node, rect)?;
        }
        Ok(())
    }

    fn end(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.update(state, input)
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        state.set_node_rect(self.node, self.original)
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        state.set_node_rect(self.node, self.current)
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn support_undo(&self) -> bool {
        self.current != self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{add, state};
    use vpe_graph::Size;

    #[test]
    fn test_resize_bottom_right_and_undo() {
        let mut state = state();
        let comment = add(&mut state, "Comment", 0.0, 25.0);
        let mut command = ResizeCommand::new(comment, ResizeBorder::BottomRight);
        command.exec(&mut state, &CommandInput::at(Point::new(200.0, 200.0))).unwrap();
        command.update(&mut state, &CommandInput::at(Point::new(250.0, 220.0))).unwrap();
        command.end(&mut state, &CommandInput::at(Point::new(300.0, 240.0))).unwrap();

        assert!(command.support_undo());
        assert_eq!(state.graph.node(comment).unwrap().size, Some(Size::new(300.0, 240.0)));
        command.undo(&mut state).unwrap();
        assert_eq!(state.graph.node(comment).unwrap().size, Some(Size::new(200.0, 200.0)));
        command.redo(&mut state).unwrap();
        assert_eq!(state.graph.node(comment).unwrap().size, Some(Size::new(300.0, 240.0)));
    }

    #[test]
    fn test_resize_left_moves_position_and_clamps() {
        let mut state = state();
        let comment = add(&mut state, "Comment", 0.0, 25.0);
        let mut command = ResizeCommand::new(comment, ResizeBorder::Left);
        command.exec(&mut state, &CommandInput::at(Point::new(0.0, 100.0))).unwrap();
        command.end(&mut state, &CommandInput::at(Point::new(1000.0, 100.0))).unwrap();

        let node = state.graph.node(comment).unwrap();
        assert_eq!(node.size, Some(Size::new(MIN_NODE_SIZE, 200.0)));
        assert_eq!(node.position, Point::new(190.0, 25.0));
    }
}
