// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene orchestrator.
//!
//! A [`Scene`] binds a graph to host input, the layered renderer, the
//! selection and the undo history. At most one command runs at a time:
//! `exec`, then `update` for every pointer move while it is continuous,
//! then `end`, after which it is pushed onto the history if it reports
//! [`Command::support_undo`].
//!
//! Event handlers never return errors. Failures are logged and queued as
//! diagnostics for the host, see [`Scene::take_diagnostics`].

use crate::clipboard::{ClipboardStore, MemoryStore};
use crate::collision::HitResult;
use crate::commands::{
    Command, CommandInput, ConnectCommand, CopyCommand, CreateNodeCommand, CutCommand, DuplicateCommand,
    MarqueeSelectionCommand, MoveCommand, PasteCommand, ReconnectCommand, RemoveConnectorsCommand,
    RemoveSelectedNodesCommand, ResizeCommand,
};
use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::history::UndoHistory;
use crate::input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent, WheelEvent};
use crate::renderer::{Frame, Layer, LayerSet, Renderer};
use crate::state::{Diagnostic, SceneState};
use crate::surface::Surface;
use crate::view::{Lod, SerializedView};
use serde::{Deserialize, Serialize};
use std::fmt;
use vpe_graph::{Endpoint, Graph, NodeId, Point, SerializedGraph, SharedRegistry};

/// A graph together with its view state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SerializedScene {
    /// Graph content
    #[serde(flatten)]
    pub graph: SerializedGraph,
    /// Zoom and pan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<SerializedView>,
}

/// A command the host can offer in a context menu
#[derive(Clone, Copy)]
pub struct ContextCommand {
    /// Name passed to [`Scene::exec_context_command`]
    pub name: &'static str,
    /// Menu label
    pub label: &'static str,
    applies: fn(&SceneState, Option<&HitResult>) -> bool,
}

impl ContextCommand {
    /// Whether the command makes sense for `hit`
    pub fn applies(&self, state: &SceneState, hit: Option<&HitResult>) -> bool {
        (self.applies)(state, hit)
    }
}

impl fmt::Debug for ContextCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCommand")
            .field("name", &self.name)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn on_node(_state: &SceneState, hit: Option<&HitResult>) -> bool {
    hit.is_some_and(|h| h.node().is_some() && !h.is_slot())
}

fn on_slot(_state: &SceneState, hit: Option<&HitResult>) -> bool {
    hit.is_some_and(|h| h.node().is_some() && h.is_slot())
}

fn on_nothing(_state: &SceneState, hit: Option<&HitResult>) -> bool {
    hit.is_none()
}

static CONTEXT_COMMANDS: [ContextCommand; 7] = [
    ContextCommand {
        name: "delete",
        label: "Delete",
        applies: on_node,
    },
    ContextCommand {
        name: "cut",
        label: "Cut",
        applies: on_node,
    },
    ContextCommand {
        name: "copy",
        label: "Copy",
        applies: on_node,
    },
    ContextCommand {
        name: "duplicate",
        label: "Duplicate",
        applies: on_node,
    },
    ContextCommand {
        name: "break_node_links",
        label: "Break Node Link(s)",
        applies: on_node,
    },
    ContextCommand {
        name: "break_pin_links",
        label: "Break All Pin Link(s)",
        applies: on_slot,
    },
    ContextCommand {
        name: "create_node",
        label: "Create Node",
        applies: on_nothing,
    },
];

struct ActiveCommand {
    command: Box<dyn Command>,
    selection_before: Vec<NodeId>,
}

/// Primary press on a node body that has not moved yet
#[derive(Debug, Clone, Copy)]
struct PendingPress {
    node: NodeId,
    at: Point,
    modifiers: Modifiers,
}

/// Interactive editor over one graph
pub struct Scene<S: Surface> {
    state: SceneState,
    renderer: Renderer<S>,
    history: UndoHistory,
    active: Option<ActiveCommand>,
    press: Option<PendingPress>,
    pan: Option<Point>,
    last_hit: Option<HitResult>,
}

impl<S: Surface> fmt::Debug for Scene<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("state", &self.state)
            .field("history", &self.history)
            .field("active", &self.active.as_ref().map(|a| a.command.description()))
            .field("last_hit", &self.last_hit)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Scene<S> {
    /// Create a scene drawing into `surface`
    pub fn new(graph: Graph, surface: S, config: SceneConfig, clipboard: Box<dyn ClipboardStore>) -> Result<Self> {
        let renderer = Renderer::new(surface)?;
        let history = UndoHistory::new(config.max_history);
        let mut state = SceneState::new(graph, config, clipboard);
        let (width, height) = (renderer.target().width(), renderer.target().height());
        state.view.resize(f64::from(width), f64::from(height));
        tracing::debug!("Scene created with {} node(s) on a {}x{} surface", state.graph.node_count(), width, height);
        Ok(Self {
            state,
            renderer,
            history,
            active: None,
            press: None,
            pan: None,
            last_hit: None,
        })
    }

    /// Empty scene with default config and an in-memory clipboard
    pub fn with_registry(registry: SharedRegistry, surface: S) -> Result<Self> {
        Self::new(
            Graph::new(registry),
            surface,
            SceneConfig::default(),
            Box::new(MemoryStore::default()),
        )
    }

    /// Graph, view, index and selection
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Mutable access for programmatic edits outside the command system
    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    /// The edited graph
    pub fn graph(&self) -> &Graph {
        &self.state.graph
    }

    /// The renderer
    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }

    /// Undo history
    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// The running gesture, if any
    pub fn active_command(&self) -> Option<&dyn Command> {
        self.active.as_ref().map(|a| a.command.as_ref())
    }

    /// Item under the last primary or secondary press
    pub fn last_hit(&self) -> Option<&HitResult> {
        self.last_hit.as_ref()
    }

    // ------------------------------------------------------------------
    // Command lifecycle
    // ------------------------------------------------------------------

    /// Run a command at the last pointer position
    pub fn exec_command(&mut self, command: Box<dyn Command>) -> Result<()> {
        let input = CommandInput::at(self.state.pointer()).with_hit(self.last_hit.clone());
        self.exec_command_with(command, &input)
    }

    /// Run a command with explicit input. A running gesture is ended first;
    /// non-continuous commands finish immediately.
    pub fn exec_command_with(&mut self, mut command: Box<dyn Command>, input: &CommandInput) -> Result<()> {
        self.end_active(input)?;
        let selection_before = self.state.selected_ids();
        tracing::debug!("Exec: {}", command.description());
        command.exec(&mut self.state, input)?;
        let active = ActiveCommand {
            command,
            selection_before,
        };
        if active.command.is_continuous() {
            self.active = Some(active);
            self.state.invalidate(Layer::Action);
            Ok(())
        } else {
            self.finish(active, input)
        }
    }

    fn update_active(&mut self, input: &CommandInput) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.command.update(&mut self.state, input)?;
            self.state.invalidate(Layer::Action);
        }
        Ok(())
    }

    fn end_active(&mut self, input: &CommandInput) -> Result<()> {
        match self.active.take() {
            Some(active) => self.finish(active, input),
            None => Ok(()),
        }
    }

    fn finish(&mut self, mut active: ActiveCommand, input: &CommandInput) -> Result<()> {
        let ended = active.command.end(&mut self.state, input);
        self.state.invalidate(Layer::Action);
        ended?;
        if active.command.support_undo() {
            tracing::debug!("Recorded: {}", active.command.description());
            let selection_after = self.state.selected_ids();
            self.history
                .push(active.command, active.selection_before, selection_after);
        } else {
            tracing::debug!("Not recorded: {}", active.command.description());
        }
        Ok(())
    }

    /// Undo the last recorded command. Returns false when there is none.
    pub fn undo(&mut self) -> Result<bool> {
        self.end_active(&CommandInput::at(self.state.pointer()))?;
        let undone = self.history.undo(&mut self.state)?;
        if undone {
            self.state.invalidate(Layer::Debug);
        }
        Ok(undone)
    }

    /// Redo the last undone command. Returns false when there is none.
    pub fn redo(&mut self) -> Result<bool> {
        self.end_active(&CommandInput::at(self.state.pointer()))?;
        let redone = self.history.redo(&mut self.state)?;
        if redone {
            self.state.invalidate(Layer::Debug);
        }
        Ok(redone)
    }

    /// Menu text for undo
    pub fn undo_description(&self) -> String {
        self.history.undo_description()
    }

    /// Menu text for redo
    pub fn redo_description(&self) -> String {
        self.history.redo_description()
    }

    // ------------------------------------------------------------------
    // Pointer and wheel
    // ------------------------------------------------------------------

    /// Pointer button pressed
    pub fn pointer_down(&mut self, event: PointerEvent) {
        let pos = self.state.view.map_to_scene(event.position);
        self.state.set_pointer(pos);
        if let Err(err) = self.route_pointer_down(event, pos) {
            self.state.report(&err);
        }
    }

    fn route_pointer_down(&mut self, event: PointerEvent, pos: Point) -> Result<()> {
        let hit = self.state.hit_test(pos);
        if event.button != MouseButton::Primary {
            if event.button == MouseButton::Secondary {
                self.last_hit = hit;
            }
            self.pan = Some(event.position);
            return Ok(());
        }

        self.last_hit = hit.clone();
        self.press = None;
        self.state.clear_hover();
        let input = CommandInput::at(pos)
            .with_hit(hit.clone())
            .with_modifiers(event.modifiers);

        let Some((node, hit)) = hit.and_then(|h| h.node().map(|n| (n, h))) else {
            return self.exec_command_with(Box::new(MarqueeSelectionCommand::new()), &input);
        };
        if let Some(border) = self.state.border_at(node, hit.local) {
            return self.exec_command_with(Box::new(ResizeCommand::new(node, border)), &input);
        }
        if let Some(slot) = hit.component {
            return self.press_slot(Endpoint::new(node, slot), &input);
        }
        self.press = Some(PendingPress {
            node,
            at: pos,
            modifiers: event.modifiers,
        });
        Ok(())
    }

    fn press_slot(&mut self, slot: Endpoint, input: &CommandInput) -> Result<()> {
        let modifiers = input.modifiers;
        if modifiers.shift {
            return Ok(());
        }
        if modifiers.alt {
            return self.exec_command_with(Box::new(RemoveConnectorsCommand::for_slot(slot)), input);
        }
        let connected = self.state.graph.connectors_of_slot(&slot).next().is_some();
        if modifiers.command() && connected {
            self.exec_command_with(Box::new(ReconnectCommand::new(slot)), input)
        } else {
            self.exec_command_with(Box::new(ConnectCommand::new(slot)), input)
        }
    }

    /// Pointer moved
    pub fn pointer_move(&mut self, event: PointerEvent) {
        let pos = self.state.view.map_to_scene(event.position);
        self.state.set_pointer(pos);
        if let Err(err) = self.route_pointer_move(event, pos) {
            self.state.report(&err);
        }
    }

    fn route_pointer_move(&mut self, event: PointerEvent, pos: Point) -> Result<()> {
        if let Some(last) = self.pan {
            self.state.view.pan_by_device(event.position - last);
            self.pan = Some(event.position);
            self.state.invalidate_all();
            return Ok(());
        }
        if let Some(press) = self.press.take() {
            return self.start_move(press, pos);
        }
        if self.active.is_some() {
            let input = CommandInput::at(pos)
                .with_hit(self.state.hit_test(pos))
                .with_modifiers(event.modifiers);
            return self.update_active(&input);
        }
        self.state.update_hover(pos);
        Ok(())
    }

    fn start_move(&mut self, press: PendingPress, pos: Point) -> Result<()> {
        let selection_before = self.state.selected_ids();
        if !self.state.is_selected(press.node) {
            if press.modifiers.command() {
                self.state.select_node(press.node);
            } else {
                self.state.set_selection(&[press.node]);
            }
        }
        let start = CommandInput::at(press.at).with_modifiers(press.modifiers);
        self.exec_command_with(Box::new(MoveCommand::new()), &start)?;
        if let Some(active) = self.active.as_mut() {
            active.selection_before = selection_before;
        }
        self.update_active(&CommandInput::at(pos).with_modifiers(press.modifiers))
    }

    /// Pointer button released
    pub fn pointer_up(&mut self, event: PointerEvent) {
        let pos = self.state.view.map_to_scene(event.position);
        self.state.set_pointer(pos);
        if let Err(err) = self.route_pointer_up(event, pos) {
            self.state.report(&err);
        }
    }

    fn route_pointer_up(&mut self, event: PointerEvent, pos: Point) -> Result<()> {
        if event.button != MouseButton::Primary {
            self.pan = None;
            return Ok(());
        }
        if let Some(press) = self.press.take() {
            let m = press.modifiers;
            if m.command() && !m.shift {
                self.state.toggle_node_selection(press.node);
            } else if m.shift {
                self.state.select_node(press.node);
            } else {
                self.state.set_selection(&[press.node]);
            }
            return Ok(());
        }
        let input = CommandInput::at(pos)
            .with_hit(self.state.hit_test(pos))
            .with_modifiers(event.modifiers);
        self.end_active(&input)
    }

    /// Wheel turned; zooms about the pointer. Returns whether the scale changed.
    pub fn wheel(&mut self, event: WheelEvent) -> bool {
        let factor = self.state.config.wheel_zoom_factor;
        let changed = self.state.view.zoom_by_wheel(event.delta_y, factor, event.position);
        if changed {
            tracing::debug!("Zoom to {:.3}", self.state.view.scale());
            self.state.invalidate_all();
        }
        changed
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    /// Key pressed. Returns whether the key was handled.
    pub fn key_down(&mut self, event: KeyEvent) -> bool {
        match self.route_key(event) {
            Ok(handled) => handled,
            Err(err) => {
                self.state.report(&err);
                true
            }
        }
    }

    fn route_key(&mut self, event: KeyEvent) -> Result<bool> {
        let m = event.modifiers;
        let step = self.state.config.nudge_step;
        let nudge = |delta: Point| -> Box<dyn Command> { Box::new(MoveCommand::nudge(delta)) };
        let command: Box<dyn Command> = match event.key {
            Key::Escape => {
                self.state.deselect_selected_nodes();
                return Ok(true);
            }
            Key::Delete | Key::Backspace => Box::new(RemoveSelectedNodesCommand::new()),
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight if m.command() || m.shift => {
                return Ok(false);
            }
            Key::ArrowUp => nudge(Point::new(0.0, -step)),
            Key::ArrowDown => nudge(Point::new(0.0, step)),
            Key::ArrowLeft => nudge(Point::new(-step, 0.0)),
            Key::ArrowRight => nudge(Point::new(step, 0.0)),
            Key::Char(c) if m.command() => match (c.to_ascii_lowercase(), m.shift) {
                ('z', false) => return self.undo().map(|_| true),
                ('y', false) => return self.redo().map(|_| true),
                ('a', false) => {
                    self.state.select_all_nodes();
                    return Ok(true);
                }
                ('c', false) => Box::new(CopyCommand::new()),
                ('x', false) => Box::new(CutCommand::new()),
                ('v', false) => Box::new(PasteCommand::new(self.state.pointer())),
                ('d', false) => Box::new(DuplicateCommand::new()),
                ('d', true) => {
                    self.toggle_debug();
                    return Ok(true);
                }
                _ => return Ok(false),
            },
            Key::Char(_) => return Ok(false),
        };
        self.exec_command(command)?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Context commands
    // ------------------------------------------------------------------

    /// Every context command the scene knows
    pub fn all_context_commands() -> &'static [ContextCommand] {
        &CONTEXT_COMMANDS
    }

    /// Context commands applying to the last pressed item
    pub fn context_commands(&self) -> Vec<ContextCommand> {
        CONTEXT_COMMANDS
            .iter()
            .filter(|c| c.applies(&self.state, self.last_hit.as_ref()))
            .copied()
            .collect()
    }

    /// Run a context command by name. `create_node` takes the node type as
    /// its argument.
    pub fn exec_context_command(&mut self, name: &str, arg: Option<&str>) -> Result<()> {
        let entry = CONTEXT_COMMANDS
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SceneError::UnknownCommand(name.to_string()))?;
        let hit = self.last_hit.clone();
        if !entry.applies(&self.state, hit.as_ref()) {
            return Err(SceneError::NotApplicable(name.to_string()));
        }
        let node = hit.as_ref().and_then(HitResult::node);
        if let Some(node) = node {
            if on_node(&self.state, hit.as_ref()) && !self.state.is_selected(node) {
                self.state.set_selection(&[node]);
            }
        }

        let command: Box<dyn Command> = match (entry.name, node, hit) {
            ("delete", ..) => Box::new(RemoveSelectedNodesCommand::new()),
            ("cut", ..) => Box::new(CutCommand::new()),
            ("copy", ..) => Box::new(CopyCommand::new()),
            ("duplicate", ..) => Box::new(DuplicateCommand::new()),
            ("break_node_links", Some(node), _) => Box::new(RemoveConnectorsCommand::for_node(node)),
            ("break_pin_links", Some(node), Some(HitResult { component: Some(slot), .. })) => {
                Box::new(RemoveConnectorsCommand::for_slot(Endpoint::new(node, slot)))
            }
            ("create_node", ..) => {
                let node_type = arg.ok_or_else(|| SceneError::MissingArgument(name.to_string()))?;
                Box::new(CreateNodeCommand::new(node_type))
            }
            _ => return Err(SceneError::NotApplicable(name.to_string())),
        };
        self.exec_command(command)
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Graph and view state
    pub fn serialize(&self) -> SerializedScene {
        SerializedScene {
            graph: self.state.graph.serialize(),
            view: Some(self.state.view.serialize()),
        }
    }

    /// Replace the content. The history is cleared and any gesture dropped.
    pub fn configure(&mut self, data: &SerializedScene) -> Result<()> {
        self.active = None;
        self.press = None;
        self.pan = None;
        self.last_hit = None;
        self.history.clear();
        self.state.clear();
        self.state.graph.configure(&data.graph)?;
        if let Some(view) = &data.view {
            self.state.view.configure(view);
        }
        self.state.rebuild_index()?;
        self.state.invalidate_all();
        tracing::debug!(
            "Configured scene with {} node(s) and {} connector(s)",
            self.state.graph.node_count(),
            self.state.graph.connector_count()
        );
        Ok(())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.serialize())?)
    }

    /// Configure from JSON
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let data: SerializedScene = serde_json::from_str(json)?;
        self.configure(&data)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Start continuous rendering
    pub fn start(&mut self) {
        self.renderer.start();
    }

    /// Stop continuous rendering
    pub fn stop(&mut self) {
        self.renderer.stop();
    }

    /// Animation tick from the host; renders only while running
    pub fn tick(&mut self) -> Result<LayerSet> {
        if !self.renderer.is_running() {
            return Ok(LayerSet::empty());
        }
        self.render_now()
    }

    /// Render dirty layers immediately
    pub fn render_now(&mut self) -> Result<LayerSet> {
        let dirty = self.state.take_dirty();
        if self.renderer.debug_enabled() && !dirty.is_empty() {
            self.renderer.invalidate(dirty.with(Layer::Debug));
        } else {
            self.renderer.invalidate(dirty);
        }
        let frame = Frame {
            state: &self.state,
            active: self.active.as_ref().map(|a| a.command.as_ref()),
            history: &self.history,
        };
        self.renderer.render(&frame)
    }

    /// The host surface changed size; re-renders right away
    pub fn resize(&mut self, width: u32, height: u32) -> Result<LayerSet> {
        tracing::debug!("Resize to {}x{}", width, height);
        self.renderer.resize(width, height);
        self.state.view.resize(f64::from(width), f64::from(height));
        self.render_now()
    }

    /// Show or hide the debug layer
    pub fn set_debug(&mut self, enabled: bool) {
        self.renderer.set_debug(enabled);
    }

    /// Flip the debug layer
    pub fn toggle_debug(&mut self) {
        let enabled = !self.renderer.debug_enabled();
        self.set_debug(enabled);
    }

    /// Override the level of detail; `None` follows the zoom
    pub fn set_force_lod(&mut self, lod: Option<Lod>) {
        self.state.set_force_lod(lod);
    }

    /// Drain diagnostics meant for the user
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.state.take_diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ItemId;
    use crate::surface::RecordingSurface;
    use vpe_graph::library::create_builtin_registry;

    fn scene() -> Scene<RecordingSurface> {
        Scene::with_registry(create_builtin_registry().into_shared(), RecordingSurface::new(800, 600)).unwrap()
    }

    fn add(scene: &mut Scene<RecordingSurface>, node_type: &str, x: f64, y: f64) -> NodeId {
        let node = scene
            .graph()
            .registry()
            .read()
            .create(node_type)
            .unwrap()
            .with_position(x, y);
        scene.state_mut().add_node(node).unwrap()
    }

    #[test]
    fn test_zero_size_surface_fails_render() {
        let mut scene = Scene::with_registry(create_builtin_registry().into_shared(), RecordingSurface::new(0, 10)).unwrap();
        assert!(matches!(scene.render_now(), Err(SceneError::ZeroSizeSurface { .. })));
    }

    #[test]
    fn test_non_drawable_surface_is_an_error() {
        let result = Scene::new(
            Graph::new(create_builtin_registry().into_shared()),
            RecordingSurface::detached(800, 600),
            SceneConfig::default(),
            Box::new(MemoryStore::default()),
        );
        assert!(matches!(result, Err(SceneError::InvalidSurface)));
    }

    #[test]
    fn test_key_table() {
        let mut scene = scene();
        let a = add(&mut scene, "Image.Read", 10.0, 30.0);
        let b = add(&mut scene, "Image.Show", 300.0, 30.0);

        assert!(scene.key_down(KeyEvent::new(Key::Char('a'), Modifiers::CTRL)));
        assert_eq!(scene.state().selected_ids(), vec![a, b]);
        assert!(scene.key_down(KeyEvent::new(Key::Escape, Modifiers::NONE)));
        assert_eq!(scene.state().selection_len(), 0);

        scene.state_mut().select_node(a);
        assert!(scene.key_down(KeyEvent::new(Key::ArrowRight, Modifiers::NONE)));
        assert_eq!(scene.graph().node(a).unwrap().position, Point::new(11.0, 30.0));
        assert!(scene.key_down(KeyEvent::new(Key::Delete, Modifiers::NONE)));
        assert!(!scene.graph().contains_node(a));
        assert_eq!(scene.undo_description(), "Undo Remove 1 node(s)");

        assert!(scene.key_down(KeyEvent::new(Key::Char('z'), Modifiers::CTRL)));
        assert!(scene.graph().contains_node(a));
        assert!(scene.key_down(KeyEvent::new(Key::Char('z'), Modifiers::CTRL)));
        assert_eq!(scene.graph().node(a).unwrap().position, Point::new(10.0, 30.0));
        assert!(scene.key_down(KeyEvent::new(Key::Char('y'), Modifiers::CTRL)));
        assert_eq!(scene.graph().node(a).unwrap().position, Point::new(11.0, 30.0));

        assert!(!scene.key_down(KeyEvent::new(Key::Char('q'), Modifiers::NONE)));
    }

    #[test]
    fn test_arrows_with_modifiers_do_not_nudge() {
        let mut scene = scene();
        let a = add(&mut scene, "Image.Read", 10.0, 30.0);
        scene.state_mut().select_node(a);

        assert!(!scene.key_down(KeyEvent::new(Key::ArrowRight, Modifiers::CTRL)));
        assert!(!scene.key_down(KeyEvent::new(Key::ArrowDown, Modifiers::SHIFT)));
        assert!(!scene.key_down(KeyEvent::new(Key::ArrowLeft, Modifiers::CTRL_SHIFT)));
        assert_eq!(scene.graph().node(a).unwrap().position, Point::new(10.0, 30.0));
        assert!(scene.history().is_empty());

        assert!(scene.key_down(KeyEvent::new(Key::ArrowDown, Modifiers::NONE)));
        assert_eq!(scene.graph().node(a).unwrap().position, Point::new(10.0, 31.0));
    }

    #[test]
    fn test_debug_toggle() {
        let mut scene = scene();
        assert!(!scene.renderer().debug_enabled());
        scene.key_down(KeyEvent::new(Key::Char('d'), Modifiers::CTRL_SHIFT));
        assert!(scene.renderer().debug_enabled());
        let redrawn = scene.render_now().unwrap();
        assert!(redrawn.contains(Layer::Debug));
    }

    #[test]
    fn test_context_commands_follow_last_hit() {
        let mut scene = scene();
        let a = add(&mut scene, "Image.Read", 10.0, 30.0);

        scene.pointer_down(PointerEvent::primary(600.0, 500.0).with_button(MouseButton::Secondary));
        scene.pointer_up(PointerEvent::primary(600.0, 500.0).with_button(MouseButton::Secondary));
        let names: Vec<&str> = scene.context_commands().iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["create_node"]);

        scene.exec_context_command("create_node", Some("Image.Show")).unwrap();
        assert_eq!(scene.graph().node_count(), 2);
        assert!(matches!(
            scene.exec_context_command("create_node", None),
            Err(SceneError::MissingArgument(_))
        ));
        assert!(matches!(
            scene.exec_context_command("delete", None),
            Err(SceneError::NotApplicable(_))
        ));
        assert!(matches!(
            scene.exec_context_command("explode", None),
            Err(SceneError::UnknownCommand(_))
        ));

        scene.pointer_down(PointerEvent::primary(15.0, 18.0).with_button(MouseButton::Secondary));
        scene.pointer_up(PointerEvent::primary(15.0, 18.0).with_button(MouseButton::Secondary));
        let names: Vec<&str> = scene.context_commands().iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["delete", "cut", "copy", "duplicate", "break_node_links"]);
        scene.exec_context_command("delete", None).unwrap();
        assert!(!scene.graph().contains_node(a));
    }

    #[test]
    fn test_wheel_zooms_about_pointer() {
        let mut scene = scene();
        let pivot = Point::new(200.0, 150.0);
        let before = scene.state().view.map_to_scene(pivot);
        assert!(scene.wheel(WheelEvent {
            delta_y: -250.0,
            position: pivot,
            modifiers: Modifiers::NONE,
        }));
        assert!((scene.state().view.scale() - 1.5).abs() < 1e-9);
        let after = scene.state().view.map_to_scene(pivot);
        assert!(before.distance(after) < 1e-9);
    }

    #[test]
    fn test_secondary_drag_pans() {
        let mut scene = scene();
        scene.pointer_down(PointerEvent::primary(100.0, 100.0).with_button(MouseButton::Secondary));
        scene.pointer_move(PointerEvent::primary(130.0, 90.0).with_button(MouseButton::Secondary));
        scene.pointer_up(PointerEvent::primary(130.0, 90.0).with_button(MouseButton::Secondary));
        assert_eq!(scene.state().view.translate(), Point::new(30.0, -10.0));
    }

    #[test]
    fn test_scene_json_round_trip() {
        let mut scene = scene();
        let a = add(&mut scene, "Image.Read", 10.0, 30.0);
        let b = add(&mut scene, "Image.GaussianFilter", 200.0, 100.0);
        scene
            .state_mut()
            .connect(Endpoint::new(a, "image"), Endpoint::new(b, "input"))
            .unwrap();
        scene.state_mut().view.set_translate(Point::new(5.0, 7.0));
        let json = scene.to_json().unwrap();

        let mut other = self::scene();
        other.load_json(&json).unwrap();
        assert_eq!(other.graph().node_count(), 2);
        assert_eq!(other.graph().connector_count(), 1);
        assert_eq!(other.state().view.translate(), Point::new(5.0, 7.0));
        assert!(other.state().collision.contains(ItemId::Node(a)));
        assert!(!other.history().can_undo());
    }

    #[test]
    fn test_tick_renders_only_when_running() {
        let mut scene = scene();
        assert!(scene.tick().unwrap().is_empty());
        scene.start();
        assert!(!scene.tick().unwrap().is_empty());
        assert!(scene.tick().unwrap().is_empty());
        scene.stop();
        let redrawn = scene.resize(640, 480).unwrap();
        assert!(redrawn.contains(Layer::Background));
        assert_eq!(scene.renderer().target().width(), 640);
    }
}
