// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dragging and nudging nodes.

use super::{Command, CommandInput};
use crate::collision::{ItemId, ItemKind};
use crate::error::Result;
use crate::state::SceneState;
use indexmap::IndexSet;
use vpe_graph::{NodeId, Point};

/// Move the selected nodes. Plain nodes lying entirely inside a moved
/// comment travel with it.
#[derive(Debug, Clone, Default)]
pub struct MoveCommand {
    nodes: Vec<NodeId>,
    start: Point,
    delta: Point,
    nudge: Option<Point>,
    support_undo: bool,
}

impl MoveCommand {
    /// Drag gesture starting at the exec position
    pub fn new() -> Self {
        Self {
            support_undo: true,
            ..Self::default()
        }
    }

    /// Single step by a fixed delta
    pub fn nudge(delta: Point) -> Self {
        Self {
            nudge: Some(delta),
            support_undo: true,
            ..Self::default()
        }
    }

    /// Nodes being moved
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Total displacement so far
    pub fn delta(&self) -> Point {
        self.delta
    }

    fn collect_nodes(state: &SceneState) -> Vec<NodeId> {
        let mut nodes: IndexSet<NodeId> = state.selected_ids().into_iter().collect();
        let comments: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|id| state.graph.node(*id).is_some_and(|n| n.is_comment()))
            .collect();
        for comment in comments {
            let Some(bounds) = state.node_bounds(comment) else {
                continue;
            };
            let inside = state.collision.items_inside(bounds, Some(ItemKind::Node));
            nodes.extend(inside.into_iter().filter_map(ItemId::node));
        }
        nodes.into_iter().collect()
    }

    fn move_to(&mut self, state: &mut SceneState, delta: Point) -> Result<()> {
        let step = delta - self.delta;
        self.delta = delta;
        if step == Point::ZERO {
            return Ok(());
        }
        state.translate_nodes(&self.nodes, step)
    }
}

impl Command for MoveCommand {
    fn description(&self) -> String {
        format!("Move {} node(s)", self.nodes.len())
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.nodes = Self::collect_nodes(state);
        self.start = input.pos;
        self.delta = Point::ZERO;
        if self.nodes.is_empty() {
            self.support_undo = false;
            return Ok(());
        }
        match self.nudge {
            Some(step) => self.move_to(state, step),
            None => Ok(()),
        }
    }

    fn update(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        if self.nudge.is_some() || self.nodes.is_empty() {
            return Ok(());
        }
        self.move_to(state, input.pos - self.start)
    }

    fn end(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.update(state, input)?;
        if self.delta == Point::ZERO {
            self.support_undo = false;
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        state.translate_nodes(&self.nodes, -self.delta)
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        state.translate_nodes(&self.nodes, self.delta)
    }

    fn is_continuous(&self) -> bool {
        self.nudge.is_none()
    }

    fn support_undo(&self) -> bool {
        self.support_undo
    }
}
