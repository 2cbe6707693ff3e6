// SPDX-License-Identifier: MIT OR Apache-2.0
//! Marquee selection.

use super::{Command, CommandInput};
use crate::collision::{ItemId, ItemKind};
use crate::error::Result;
use crate::renderer::Layer;
use crate::state::SceneState;
use crate::surface::DrawContext;
use indexmap::IndexSet;
use vpe_graph::{NodeId, Point, Rect};

/// How the marquee combines with the existing selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionMode {
    /// Select exactly what the marquee covers
    #[default]
    Replace,
    /// Add covered nodes (Shift)
    Add,
    /// Flip covered nodes (Ctrl)
    Toggle,
}

/// Drag a rectangle to select nodes. Regular nodes are picked when they
/// overlap the rectangle, comments only when fully inside it.
#[derive(Debug, Clone, Default)]
pub struct MarqueeSelectionCommand {
    start: Point,
    current: Point,
    mode: SelectionMode,
    before: Vec<NodeId>,
}

impl MarqueeSelectionCommand {
    /// New marquee; the mode is taken from the modifiers at exec
    pub fn new() -> Self {
        Self::default()
    }

    /// Covered area in scene space
    pub fn area(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }

    /// Combination mode
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    fn apply(&self, state: &mut SceneState) {
        let area = self.area();
        let mut covered: Vec<NodeId> = state
            .collision
            .items_overlapping(area, Some(ItemKind::Node), None, false)
            .into_iter()
            .filter_map(ItemId::node)
            .collect();
        covered.extend(
            state
                .collision
                .items_inside(area, Some(ItemKind::Comment))
                .into_iter()
                .filter_map(ItemId::node),
        );

        let selection: Vec<NodeId> = match self.mode {
            SelectionMode::Replace => covered,
            SelectionMode::Add => {
                let mut set: IndexSet<NodeId> = self.before.iter().copied().collect();
                set.extend(covered);
                set.into_iter().collect()
            }
            SelectionMode::Toggle => {
                let mut set: IndexSet<NodeId> = self.before.iter().copied().collect();
                for id in covered {
                    if !set.shift_remove(&id) {
                        set.insert(id);
                    }
                }
                set.into_iter().collect()
            }
        };
        state.set_selection(&selection);
    }
}

impl Command for MarqueeSelectionCommand {
    fn description(&self) -> String {
        "Select".to_string()
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.start = input.pos;
        self.current = input.pos;
        self.before = state.selected_ids();
        self.mode = if input.modifiers.command() {
            SelectionMode::Toggle
        } else if input.modifiers.shift {
            SelectionMode::Add
        } else {
            SelectionMode::Replace
        };
        if self.mode == SelectionMode::Replace {
            state.deselect_selected_nodes();
        }
        state.invalidate(Layer::Action);
        Ok(())
    }

    fn update(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.current = input.pos;
        self.apply(state);
        state.invalidate(Layer::Action);
        Ok(())
    }

    fn end(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        if input.pos != self.start {
            self.update(state, input)?;
        }
        state.invalidate(Layer::Action);
        Ok(())
    }

    fn undo(&mut self, _state: &mut SceneState) -> Result<()> {
        Ok(())
    }

    fn redo(&mut self, _state: &mut SceneState) -> Result<()> {
        Ok(())
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn support_undo(&self) -> bool {
        false
    }

    fn draw(&self, ctx: &mut dyn DrawContext, state: &SceneState) {
        let overlay = &state.style_sheet().overlay;
        let area = self.area();
        ctx.fill_rect(area, 0.0, overlay.marquee_fill);
        ctx.stroke_rect(area, 0.0, overlay.marquee_border, 1.0 / state.view.scale());
    }
}
