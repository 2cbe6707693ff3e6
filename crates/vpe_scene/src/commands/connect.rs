// SPDX-License-Identifier: MIT OR Apache-2.0
//! Creating connectors by dragging from a slot, and moving existing ones.

use super::{Command, CommandInput};
use crate::error::Result;
use crate::renderer::Layer;
use crate::state::SceneState;
use crate::surface::DrawContext;
use vpe_graph::{Connector, CubicBezier, Endpoint, Point, SlotConnection, SlotDirection};

/// Slot under the pointer, on another node than `from`
fn target_slot(from: &[Endpoint], input: &CommandInput) -> Option<Endpoint> {
    let hit = input.hit.as_ref()?;
    let node = hit.node()?;
    let slot = hit.component.as_ref()?;
    if from.iter().any(|e| e.node == node) {
        return None;
    }
    Some(Endpoint::new(node, slot.clone()))
}

fn check(state: &SceneState, from: &Endpoint, to: &Endpoint) -> Option<SlotConnection> {
    let a = state.graph.node(from.node)?;
    let b = state.graph.node(to.node)?;
    Some(a.check_connection(&from.slot, b, &to.slot))
}

/// Curve between a slot and a free point, oriented out → in
fn pending_curve(state: &SceneState, from: &Endpoint, to: Point) -> Option<CubicBezier> {
    let anchor = state.slot_anchor(from)?;
    let direction = state.graph.node(from.node)?.slot_direction(&from.slot)?;
    Some(match direction {
        SlotDirection::Out => CubicBezier::connector(anchor, to),
        SlotDirection::In => CubicBezier::connector(to, anchor),
    })
}

fn undo_connections(state: &mut SceneState, created: &[Connector], replaced: &[Connector]) -> Result<()> {
    for connector in created.iter().rev() {
        if let Some(id) = connector.id {
            state.remove_connector(id);
        }
    }
    for connector in replaced {
        state.restore_connector(connector.clone())?;
    }
    Ok(())
}

fn redo_connections(state: &mut SceneState, created: &[Connector], replaced: &[Connector]) -> Result<()> {
    for connector in replaced {
        if let Some(id) = connector.id {
            state.remove_connector(id);
        }
    }
    for connector in created {
        state.restore_connector(connector.clone())?;
    }
    Ok(())
}

/// Connect two slots. Interactive when started from a slot press,
/// immediate when built with [`ConnectCommand::between`].
#[derive(Debug, Clone)]
pub struct ConnectCommand {
    from: Endpoint,
    target: Option<Endpoint>,
    interactive: bool,
    pointer: Point,
    verdict: Option<SlotConnection>,
    created: Vec<Connector>,
    replaced: Vec<Connector>,
}

impl ConnectCommand {
    /// Drag a new connector out of `from`
    pub fn new(from: Endpoint) -> Self {
        Self {
            from,
            target: None,
            interactive: true,
            pointer: Point::ZERO,
            verdict: None,
            created: Vec::new(),
            replaced: Vec::new(),
        }
    }

    /// Connect two slots without a gesture
    pub fn between(a: Endpoint, b: Endpoint) -> Self {
        Self {
            target: Some(b),
            interactive: false,
            ..Self::new(a)
        }
    }

    fn apply(&mut self, state: &mut SceneState) -> Result<()> {
        let Some(target) = self.target.clone() else {
            return Ok(());
        };
        match check(state, &self.from, &target) {
            Some(verdict) if verdict.is_allowed() => {}
            Some(verdict) => {
                state.warn(verdict.reason);
                return Ok(());
            }
            None => {
                state.warn(format!("Cannot connect {:?} to {:?}", self.from, target));
                return Ok(());
            }
        }
        let outcome = state.connect(self.from.clone(), target)?;
        if let Some(connector) = state.graph.connector(outcome.id) {
            self.created.push(connector.clone());
        }
        self.replaced = outcome.replaced;
        Ok(())
    }
}

impl Command for ConnectCommand {
    fn description(&self) -> String {
        match &self.target {
            Some(target) => format!("Connect {} to {}", self.from.slot, target.slot),
            None => format!("Connect {}", self.from.slot),
        }
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.pointer = input.pos;
        if self.interactive {
            state.invalidate(Layer::Action);
            Ok(())
        } else {
            self.apply(state)
        }
    }

    fn update(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.pointer = input.pos;
        self.target = target_slot(std::slice::from_ref(&self.from), input);
        self.verdict = self.target.as_ref().and_then(|t| check(state, &self.from, t));
        state.invalidate(Layer::Action);
        Ok(())
    }

    fn end(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        if !self.interactive {
            return Ok(());
        }
        self.update(state, input)?;
        state.invalidate(Layer::Action);
        self.apply(state)
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        undo_connections(state, &self.created, &self.replaced)
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        redo_connections(state, &self.created, &self.replaced)
    }

    fn is_continuous(&self) -> bool {
        self.interactive
    }

    fn support_undo(&self) -> bool {
        !self.created.is_empty()
    }

    fn draw(&self, ctx: &mut dyn DrawContext, state: &SceneState) {
        let style = &state.style_sheet().connector;
        let end = self
            .target
            .as_ref()
            .and_then(|t| state.slot_anchor(t))
            .unwrap_or(self.pointer);
        let color = match &self.verdict {
            Some(verdict) if !verdict.is_allowed() => style.rejected,
            _ => style.normal,
        };
        if let Some(curve) = pending_curve(state, &self.from, end) {
            ctx.stroke_bezier(&curve, color, style.width);
        }
    }
}

/// Detach every connector of a slot and drop their far ends on another
/// slot. Dropping on empty space leaves them disconnected.
#[derive(Debug, Clone)]
pub struct ReconnectCommand {
    slot: Endpoint,
    detached: Vec<Connector>,
    far_ends: Vec<Endpoint>,
    pointer: Point,
    target: Option<Endpoint>,
    created: Vec<Connector>,
    replaced: Vec<Connector>,
}

impl ReconnectCommand {
    /// Pick up the connectors of `slot`
    pub fn new(slot: Endpoint) -> Self {
        Self {
            slot,
            detached: Vec::new(),
            far_ends: Vec::new(),
            pointer: Point::ZERO,
            target: None,
            created: Vec::new(),
            replaced: Vec::new(),
        }
    }
}

impl Command for ReconnectCommand {
    fn description(&self) -> String {
        format!("Reconnect {}", self.slot.slot)
    }

    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.pointer = input.pos;
        let ids: Vec<_> = state.graph.connectors_of_slot(&self.slot).filter_map(|c| c.id).collect();
        for id in ids {
            if let Some(connector) = state.remove_connector(id) {
                if let Some(far) = connector.other_end(&self.slot) {
                    self.far_ends.push(far.clone());
                }
                self.detached.push(connector);
            }
        }
        state.invalidate(Layer::Action);
        Ok(())
    }

    fn update(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.pointer = input.pos;
        self.target = target_slot(&self.far_ends, input);
        state.invalidate(Layer::Action);
        Ok(())
    }

    fn end(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()> {
        self.update(state, input)?;
        let Some(target) = self.target.clone() else {
            return Ok(());
        };
        for far in self.far_ends.clone() {
            let allowed = check(state, &far, &target).is_some_and(|v| v.is_allowed());
            if !allowed {
                state.warn(format!("Cannot reconnect {} to {}", far.slot, target.slot));
                continue;
            }
            let outcome = state.connect(far, target.clone())?;
            if let Some(connector) = state.graph.connector(outcome.id) {
                self.created.push(connector.clone());
            }
            self.replaced.extend(outcome.replaced);
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut SceneState) -> Result<()> {
        undo_connections(state, &self.created, &self.replaced)?;
        for connector in &self.detached {
            state.restore_connector(connector.clone())?;
        }
        Ok(())
    }

    fn redo(&mut self, state: &mut SceneState) -> Result<()> {
        for connector in &self.detached {
            if let Some(id) = connector.id {
                state.remove_connector(id);
            }
        }
        redo_connections(state, &self.created, &self.replaced)
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn support_undo(&self) -> bool {
        !self.detached.is_empty()
    }

    fn draw(&self, ctx: &mut dyn DrawContext, state: &SceneState) {
        let style = &state.style_sheet().connector;
        let end = self
            .target
            .as_ref()
            .and_then(|t| state.slot_anchor(t))
            .unwrap_or(self.pointer);
        for far in &self.far_ends {
            if let Some(curve) = pending_curve(state, far, end) {
                ctx.stroke_bezier(&curve, style.normal, style.width);
            }
        }
    }
}
