// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undoable units of interactive mutation.
//!
//! A command is driven through `exec`, then `update` for every pointer move
//! while it is continuous, then `end`. Finished commands that report
//! [`Command::support_undo`] are pushed onto the undo history.

mod clipboard;
mod connect;
mod connectors;
mod move_node;
mod nodes;
mod resize;
mod select;

pub use clipboard::{CopyCommand, CutCommand, DuplicateCommand, PasteCommand};
pub use connect::{ConnectCommand, ReconnectCommand};
pub use connectors::RemoveConnectorsCommand;
pub use move_node::MoveCommand;
pub use nodes::{AddNodeCommand, CreateNodeCommand, RemoveSelectedNodesCommand};
pub use resize::ResizeCommand;
pub use select::{MarqueeSelectionCommand, SelectionMode};

use crate::collision::HitResult;
use crate::error::Result;
use crate::input::Modifiers;
use crate::state::SceneState;
use crate::surface::DrawContext;
use vpe_graph::Point;

/// Arguments handed to a command at each step of a gesture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandInput {
    /// Pointer position in scene space
    pub pos: Point,
    /// Held modifiers
    pub modifiers: Modifiers,
    /// What lies under the pointer
    pub hit: Option<HitResult>,
}

impl CommandInput {
    /// Input at a scene position with nothing under it
    pub fn at(pos: Point) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    /// Same input with a hit result
    pub fn with_hit(mut self, hit: Option<HitResult>) -> Self {
        self.hit = hit;
        self
    }

    /// Same input with modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// An interactive, usually undoable, mutation of the scene
pub trait Command {
    /// Text for undo/redo menu entries
    fn description(&self) -> String;

    /// Start the command
    fn exec(&mut self, state: &mut SceneState, input: &CommandInput) -> Result<()>;

    /// Follow the pointer; only called on continuous commands
    fn update(&mut self, _state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        Ok(())
    }

    /// Finish the command
    fn end(&mut self, _state: &mut SceneState, _input: &CommandInput) -> Result<()> {
        Ok(())
    }

    /// Revert the effect
    fn undo(&mut self, state: &mut SceneState) -> Result<()>;

    /// Re-apply the effect after an undo
    fn redo(&mut self, state: &mut SceneState) -> Result<()>;

    /// Whether the command keeps running until the pointer is released
    fn is_continuous(&self) -> bool {
        false
    }

    /// Whether the finished command belongs in the undo history. May turn
    /// false while running, e.g. when nothing changed.
    fn support_undo(&self) -> bool {
        true
    }

    /// Draw transient feedback on the action layer, in scene coordinates
    fn draw(&self, _ctx: &mut dyn DrawContext, _state: &SceneState) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::clipboard::MemoryStore;
    use crate::config::SceneConfig;
    use crate::state::SceneState;
    use vpe_graph::library::create_builtin_registry;
    use vpe_graph::{Endpoint, Graph, NodeId};

    pub fn state() -> SceneState {
        let graph = Graph::new(create_builtin_registry().into_shared());
        SceneState::new(graph, SceneConfig::default(), Box::new(MemoryStore::default()))
    }

    pub fn add(state: &mut SceneState, node_type: &str, x: f64, y: f64) -> NodeId {
        let node = state
            .graph
            .registry()
            .read()
            .create(node_type)
            .unwrap()
            .with_position(x, y);
        state.add_node(node).unwrap()
    }

    pub fn endpoint(node: NodeId, slot: &str) -> Endpoint {
        Endpoint::new(node, slot)
    }
}
