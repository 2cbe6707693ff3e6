// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mutable scene state shared by commands and the renderer.
//!
//! Every structural change goes through [`SceneState`] so the graph, the
//! collision index, cached node layouts and dirty layers stay in step.

use crate::clipboard::{ClipboardBundle, ClipboardStore};
use crate::collision::{BoundingRect, CollisionDetector, HitResult, ItemId, ItemKind};
use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::layout::{CursorIcon, NodeLayout, ResizeBorder};
use crate::renderer::{Layer, LayerSet};
use crate::style::{EffectiveNodeStyle, StyleCache, StyleSheet};
use crate::view::{Lod, View};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vpe_graph::{
    ConnectOutcome, Connector, ConnectorId, CubicBezier, Endpoint, Graph, Node, NodeId, Point, Rect,
    RemovedNode, Size, VisualState,
};

/// Severity of a host-visible diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The operation was refused
    Warning,
    /// Something went wrong while handling input
    Error,
}

/// Message for the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Message
    pub message: String,
}

/// Cached geometry and style of a node
#[derive(Debug, Clone)]
pub struct NodeVisual {
    /// Layout in node-local coordinates
    pub layout: NodeLayout,
    /// Effective style of the node's type
    pub style: Arc<EffectiveNodeStyle>,
}

/// What the pointer is over while no gesture runs
#[derive(Debug, Clone, PartialEq)]
pub enum Hover {
    /// A node body
    Node(NodeId),
    /// A slot
    Slot(Endpoint),
    /// A connector
    Connector(ConnectorId),
    /// The resize border of a node
    Border(NodeId, ResizeBorder),
}

/// Graph, view, index and selection of a scene
pub struct SceneState {
    /// The edited graph
    pub graph: Graph,
    /// Zoom and pan
    pub view: View,
    /// Hit-test index
    pub collision: CollisionDetector,
    /// Tunables
    pub config: SceneConfig,
    selection: IndexSet<NodeId>,
    visuals: HashMap<NodeId, NodeVisual>,
    styles: StyleCache,
    clipboard: Box<dyn ClipboardStore>,
    dirty: LayerSet,
    diagnostics: Vec<Diagnostic>,
    pointer: Point,
    hover: Option<Hover>,
    cursor: CursorIcon,
    force_lod: Option<Lod>,
}

impl fmt::Debug for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneState")
            .field("graph", &self.graph)
            .field("view", &self.view)
            .field("selection", &self.selection)
            .field("dirty", &self.dirty)
            .field("hover", &self.hover)
            .finish_non_exhaustive()
    }
}

impl SceneState {
    /// Wrap a graph; nodes and connectors already in it are indexed
    pub fn new(graph: Graph, config: SceneConfig, clipboard: Box<dyn ClipboardStore>) -> Self {
        let mut state = Self {
            graph,
            view: View::new(&config),
            collision: CollisionDetector::new(config.connector_hit_tolerance),
            styles: StyleCache::new(config.style.clone()),
            config,
            selection: IndexSet::new(),
            visuals: HashMap::new(),
            clipboard,
            dirty: LayerSet::all(),
            diagnostics: Vec::new(),
            pointer: Point::ZERO,
            hover: None,
            cursor: CursorIcon::Default,
            force_lod: None,
        };
        if let Err(err) = state.rebuild_index() {
            state.report(&err);
        }
        state
    }

    // ------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------

    /// Re-index every node and connector of the graph and clear the selection
    pub fn rebuild_index(&mut self) -> Result<()> {
        self.collision.clear();
        self.visuals.clear();
        self.selection.clear();
        self.hover = None;
        self.cursor = CursorIcon::Default;
        let node_ids: Vec<NodeId> = self.graph.node_ids().collect();
        for id in node_ids {
            if let Some(node) = self.graph.node_mut(id) {
                node.state = VisualState::Normal;
            }
            self.index_node(id)?;
        }
        let connector_ids: Vec<ConnectorId> = self.graph.connectors().filter_map(|c| c.id).collect();
        for id in connector_ids {
            self.index_connector(id)?;
        }
        self.invalidate_all();
        Ok(())
    }

    fn compute_visual(&mut self, id: NodeId) -> Option<NodeVisual> {
        let node = self.graph.node(id)?;
        let style = {
            let registry = self.graph.registry().read();
            self.styles.style_for(&registry, &node.node_type)
        };
        Some(NodeVisual {
            layout: NodeLayout::compute(node, &style),
            style,
        })
    }

    fn node_bounding_rect(&self, node: &Node, visual: &NodeVisual) -> BoundingRect {
        let bounds = visual.layout.scene_bounds(node.position);
        let (kind, rect) = if node.is_comment() {
            (ItemKind::Comment, bounds.expanded(self.config.resize_detection_distance))
        } else {
            (ItemKind::Node, bounds)
        };
        let components = visual
            .layout
            .slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.rect))
            .collect();
        BoundingRect::node(kind, rect, node.position, components)
    }

    fn index_node(&mut self, id: NodeId) -> Result<()> {
        let Some(visual) = self.compute_visual(id) else {
            return Ok(());
        };
        if let Some(node) = self.graph.node(id) {
            let rect = self.node_bounding_rect(node, &visual);
            self.collision.add_bounding_rect(ItemId::Node(id), rect)?;
        }
        self.visuals.insert(id, visual);
        Ok(())
    }

    fn index_connector(&mut self, id: ConnectorId) -> Result<()> {
        let Some(curve) = self.graph.connector(id).and_then(|c| self.connector_curve(c)) else {
            return Ok(());
        };
        let rect = BoundingRect::connector(curve, self.collision.tolerance());
        self.collision.add_bounding_rect(ItemId::Connector(id), rect)
    }

    /// Recompute layout and bounds of nodes and of the connectors touching them
    pub fn refresh_nodes(&mut self, ids: &[NodeId]) -> Result<()> {
        let mut connectors = IndexSet::new();
        for id in ids {
            let Some(visual) = self.compute_visual(*id) else {
                continue;
            };
            if let Some(node) = self.graph.node(*id) {
                let rect = self.node_bounding_rect(node, &visual);
                self.collision.update_bounding_rect(ItemId::Node(*id), rect)?;
            }
            self.visuals.insert(*id, visual);
            self.invalidate(self.layer_of(*id));
            connectors.extend(self.graph.connectors_of_node(*id).filter_map(|c| c.id));
        }
        for id in connectors {
            if let Some(curve) = self.graph.connector(id).and_then(|c| self.connector_curve(c)) {
                let rect = BoundingRect::connector(curve, self.collision.tolerance());
                self.collision.update_bounding_rect(ItemId::Connector(id), rect)?;
            }
            self.invalidate(Layer::Connectors);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Geometry queries
    // ------------------------------------------------------------------

    /// Cached layout and style of a node
    pub fn node_visual(&self, id: NodeId) -> Option<&NodeVisual> {
        self.visuals.get(&id)
    }

    /// Scene bounds of a node, title bar included
    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> {
        let node = self.graph.node(id)?;
        Some(self.visuals.get(&id)?.layout.scene_bounds(node.position))
    }

    /// Scene position where connectors attach to a slot
    pub fn slot_anchor(&self, endpoint: &Endpoint) -> Option<Point> {
        let node = self.graph.node(endpoint.node)?;
        self.visuals.get(&endpoint.node)?.layout.anchor(&endpoint.slot, node.position)
    }

    /// Path of a connector
    pub fn connector_curve(&self, connector: &Connector) -> Option<CubicBezier> {
        Some(CubicBezier::connector(
            self.slot_anchor(&connector.out)?,
            self.slot_anchor(&connector.input)?,
        ))
    }

    /// Resize border of a resizable node under a node-local point
    pub fn border_at(&self, id: NodeId, local: Point) -> Option<ResizeBorder> {
        if !self.graph.node(id)?.is_resizable() {
            return None;
        }
        let bounds = self.visuals.get(&id)?.layout.bounds;
        ResizeBorder::detect(local, bounds, self.config.resize_detection_distance)
    }

    /// Front-most item at a scene point
    pub fn hit_test(&self, p: Point) -> Option<HitResult> {
        self.collision.hit_test(p)
    }

    /// Layer a node is drawn on
    pub fn layer_of(&self, id: NodeId) -> Layer {
        match self.graph.node(id) {
            Some(node) if node.is_comment() => Layer::Comments,
            _ => Layer::Nodes,
        }
    }

    // ------------------------------------------------------------------
    // Structural mutations
    // ------------------------------------------------------------------

    /// Add a detached node to the graph
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        let id = self.graph.add_node(node)?;
        self.index_node(id)?;
        self.invalidate(self.layer_of(id));
        Ok(id)
    }

    /// Re-insert a removed node under its id
    pub fn restore_node(&mut self, mut node: Node) -> Result<NodeId> {
        node.state = VisualState::Normal;
        let id = self.graph.restore_node(node)?;
        self.index_node(id)?;
        self.invalidate(self.layer_of(id));
        Ok(id)
    }

    /// Remove a node with its connectors
    pub fn remove_node(&mut self, id: NodeId) -> Option<RemovedNode> {
        if !self.graph.contains_node(id) {
            return None;
        }
        self.clear_hover();
        self.deselect_node(id);
        let layer = self.layer_of(id);
        let connector_ids: Vec<ConnectorId> = self.graph.connectors_of_node(id).filter_map(|c| c.id).collect();
        for connector in connector_ids {
            self.collision.remove_bounding_rect(ItemId::Connector(connector));
        }
        let removed = self.graph.remove_node(id)?;
        self.collision.remove_bounding_rect(ItemId::Node(id));
        self.visuals.remove(&id);
        self.invalidate(layer);
        self.invalidate(Layer::Connectors);
        Some(removed)
    }

    /// Connect two slots given in either order
    pub fn connect(&mut self, a: Endpoint, b: Endpoint) -> Result<ConnectOutcome> {
        let outcome = self.graph.connect(a, b)?;
        self.index_connect_outcome(&outcome)?;
        Ok(outcome)
    }

    /// Re-insert a removed connector under its id
    pub fn restore_connector(&mut self, connector: Connector) -> Result<ConnectOutcome> {
        let mut connector = connector;
        connector.state = VisualState::Normal;
        let outcome = self.graph.restore_connector(connector)?;
        self.index_connect_outcome(&outcome)?;
        Ok(outcome)
    }

    fn index_connect_outcome(&mut self, outcome: &ConnectOutcome) -> Result<()> {
        for replaced in &outcome.replaced {
            if let Some(id) = replaced.id {
                if self.hover == Some(Hover::Connector(id)) {
                    self.clear_hover();
                }
                self.collision.remove_bounding_rect(ItemId::Connector(id));
            }
        }
        self.index_connector(outcome.id)?;
        self.invalidate(Layer::Connectors);
        self.invalidate(Layer::Nodes);
        Ok(())
    }

    /// Remove a connector
    pub fn remove_connector(&mut self, id: ConnectorId) -> Option<Connector> {
        if self.hover == Some(Hover::Connector(id)) {
            self.clear_hover();
        }
        let connector = self.graph.remove_connector(id)?;
        self.collision.remove_bounding_rect(ItemId::Connector(id));
        self.invalidate(Layer::Connectors);
        self.invalidate(Layer::Nodes);
        Some(connector)
    }

    /// Move nodes by a scene-space delta
    pub fn translate_nodes(&mut self, ids: &[NodeId], delta: Point) -> Result<()> {
        for id in ids {
            if let Some(node) = self.graph.node_mut(*id) {
                node.position += delta;
            }
        }
        self.refresh_nodes(ids)
    }

    /// Give a resizable node new scene bounds, title bar included
    pub fn set_node_rect(&mut self, id: NodeId, rect: Rect) -> Result<()> {
        let title_height = self.visuals.get(&id).map_or(0.0, |v| v.layout.title_height);
        let Some(node) = self.graph.node_mut(id) else {
            return Ok(());
        };
        if !node.is_resizable() {
            return Ok(());
        }
        node.position = Point::new(rect.x, rect.y + title_height);
        node.set_size(Size::new(rect.width, rect.height));
        self.refresh_nodes(&[id])
    }

    /// Drop the graph content and every derived structure
    pub fn clear(&mut self) {
        self.selection.clear();
        self.hover = None;
        self.cursor = CursorIcon::Default;
        self.graph.clear();
        self.collision.clear();
        self.visuals.clear();
        self.invalidate_all();
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    fn run_selection_hook(&mut self, id: NodeId, selected: bool) {
        let Some(node_type) = self.graph.node(id).map(|n| n.node_type.clone()) else {
            return;
        };
        let hooks = self.graph.registry().read().hooks(&node_type);
        if let Some(node) = self.graph.node_mut(id) {
            node.state = if selected {
                VisualState::Selected
            } else {
                VisualState::Normal
            };
            if let Some(hooks) = hooks {
                if selected {
                    hooks.on_selected(node);
                } else {
                    hooks.on_deselected(node);
                }
            }
        }
    }

    /// Selected node ids in selection order
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.selection.iter().copied().collect()
    }

    /// Whether a node is selected
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// Number of selected nodes
    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Add a node to the selection and bring it to the front
    pub fn select_node(&mut self, id: NodeId) -> bool {
        if !self.graph.contains_node(id) || !self.selection.insert(id) {
            return false;
        }
        self.run_selection_hook(id, true);
        self.collision.set_top_z_order(ItemId::Node(id));
        self.invalidate(self.layer_of(id));
        true
    }

    /// Remove a node from the selection
    pub fn deselect_node(&mut self, id: NodeId) -> bool {
        if !self.selection.shift_remove(&id) {
            return false;
        }
        self.run_selection_hook(id, false);
        self.invalidate(self.layer_of(id));
        true
    }

    /// Flip a node's selection
    pub fn toggle_node_selection(&mut self, id: NodeId) {
        if self.is_selected(id) {
            self.deselect_node(id);
        } else {
            self.select_node(id);
        }
    }

    /// Select several nodes
    pub fn select_nodes(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.select_node(*id);
        }
    }

    /// Deselect several nodes
    pub fn deselect_nodes(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.deselect_node(*id);
        }
    }

    /// Flip the selection of several nodes
    pub fn toggle_nodes_selection(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.toggle_node_selection(*id);
        }
    }

    /// Select every node of the graph
    pub fn select_all_nodes(&mut self) {
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        self.select_nodes(&ids);
    }

    /// Empty the selection
    pub fn deselect_selected_nodes(&mut self) {
        let ids = self.selected_ids();
        self.deselect_nodes(&ids);
    }

    /// Make the selection exactly `ids`
    pub fn set_selection(&mut self, ids: &[NodeId]) {
        let stale: Vec<NodeId> = self.selection.iter().filter(|id| !ids.contains(*id)).copied().collect();
        self.deselect_nodes(&stale);
        self.select_nodes(ids);
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    /// Copy the selection into the host store
    pub fn copy_selection_to_clipboard(&mut self) -> Result<ClipboardBundle> {
        let bundle = ClipboardBundle::capture(&self.graph, &self.selected_ids());
        let json = bundle.to_json()?;
        self.clipboard.store(&self.config.clipboard_key, json);
        tracing::debug!("Copied {} node(s) to the clipboard", bundle.nodes.len());
        Ok(bundle)
    }

    /// Read the bundle from the host store; unreadable content counts as empty
    pub fn load_clipboard(&mut self) -> ClipboardBundle {
        let Some(json) = self.clipboard.load(&self.config.clipboard_key) else {
            return ClipboardBundle::empty();
        };
        match ClipboardBundle::from_json(&json) {
            Ok(bundle) => bundle,
            Err(err) => {
                self.warn(format!("Clipboard content is not a node bundle: {err}"));
                ClipboardBundle::empty()
            }
        }
    }

    /// Add the bundle's nodes and connectors with fresh ids so that the
    /// bundle's top-left corner lands on `at`, then select them.
    pub fn paste_bundle(&mut self, bundle: &ClipboardBundle, at: Point) -> Result<Vec<NodeId>> {
        if bundle.is_empty {
            return Ok(Vec::new());
        }
        let offset = at - Point::new(bundle.min_x_of_nodes, bundle.min_y_of_nodes);
        let registry = Arc::clone(self.graph.registry());
        let mut id_map: HashMap<u64, NodeId> = HashMap::new();
        let mut pasted = Vec::new();

        for (old_id, data) in &bundle.nodes {
            let created = {
                let registry = registry.read();
                registry.create(&data.node_type).map(|mut node| {
                    registry.configure_node(&mut node, data);
                    node
                })
            };
            let Some(mut node) = created else {
                self.warn(format!("Cannot paste node of unknown type {}", data.node_type));
                continue;
            };
            node.id = None;
            node.strip_connections();
            node.position = Point::from(data.translate) + offset;
            let new_id = self.add_node(node)?;
            if let Ok(old_id) = old_id.parse::<u64>() {
                id_map.insert(old_id, new_id);
            }
            pasted.push(new_id);
        }

        for connector in &bundle.connectors {
            let (Some(out), Some(input)) = (id_map.get(&connector.1), id_map.get(&connector.3)) else {
                self.warn(format!("Skipping pasted connector {} with a missing end", connector.0));
                continue;
            };
            let result = self.connect(
                Endpoint::new(*out, connector.2.clone()),
                Endpoint::new(*input, connector.4.clone()),
            );
            if let Err(err) = result {
                self.warn(format!("Skipping pasted connector {}: {err}", connector.0));
            }
        }

        self.set_selection(&pasted);
        Ok(pasted)
    }

    // ------------------------------------------------------------------
    // Pointer feedback
    // ------------------------------------------------------------------

    /// Last pointer position in scene space
    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Record the pointer position in scene space
    pub fn set_pointer(&mut self, p: Point) {
        self.pointer = p;
    }

    /// Current hover target
    pub fn hover(&self) -> Option<&Hover> {
        self.hover.as_ref()
    }

    /// Cursor the host should show
    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    /// Recompute the hover target for a scene point
    pub fn update_hover(&mut self, p: Point) {
        let hover = self.hit_test(p).map(|hit| match hit.item {
            ItemId::Connector(id) => Hover::Connector(id),
            ItemId::Node(id) => {
                if let Some(border) = self.border_at(id, hit.local) {
                    Hover::Border(id, border)
                } else if let Some(slot) = hit.component {
                    Hover::Slot(Endpoint::new(id, slot))
                } else {
                    Hover::Node(id)
                }
            }
        });
        if hover == self.hover {
            return;
        }
        self.clear_hover();
        self.cursor = match &hover {
            Some(Hover::Border(_, border)) => border.cursor(),
            Some(Hover::Slot(_)) => CursorIcon::Pointer,
            _ => CursorIcon::Default,
        };
        if let Some(target) = &hover {
            self.apply_hover_state(target, true);
        }
        self.hover = hover;
    }

    /// Drop hover feedback
    pub fn clear_hover(&mut self) {
        if let Some(old) = self.hover.take() {
            self.apply_hover_state(&old, false);
        }
        self.cursor = CursorIcon::Default;
    }

    fn apply_hover_state(&mut self, target: &Hover, hovered: bool) {
        let state = if hovered {
            VisualState::Hovered
        } else {
            VisualState::Normal
        };
        match target {
            Hover::Node(id) | Hover::Border(id, _) => {
                if let Some(node) = self.graph.node_mut(*id) {
                    if node.state != VisualState::Selected {
                        node.state = state;
                    }
                }
                self.invalidate(self.layer_of(*id));
            }
            Hover::Slot(endpoint) => {
                if let Some(slot) = self
                    .graph
                    .node_mut(endpoint.node)
                    .and_then(|n| n.slot_mut(&endpoint.slot))
                {
                    slot.state = state;
                }
                self.invalidate(self.layer_of(endpoint.node));
            }
            Hover::Connector(id) => {
                if let Some(connector) = self.graph.connector_mut(*id) {
                    connector.state = state;
                }
                self.invalidate(Layer::Connectors);
            }
        }
    }

    // ------------------------------------------------------------------
    // Rendering support
    // ------------------------------------------------------------------

    /// Level of detail used for drawing
    pub fn lod(&self) -> Lod {
        self.force_lod.unwrap_or_else(|| self.view.lod())
    }

    /// Override the level of detail; `None` follows the zoom
    pub fn set_force_lod(&mut self, lod: Option<Lod>) {
        self.force_lod = lod;
        self.invalidate_all();
    }

    /// The base style sheet
    pub fn style_sheet(&self) -> &StyleSheet {
        self.styles.sheet()
    }

    /// Replace the style sheet and re-layout every node
    pub fn set_style_sheet(&mut self, sheet: StyleSheet) -> Result<()> {
        self.config.style = sheet.clone();
        self.styles.set_sheet(sheet);
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        self.refresh_nodes(&ids)?;
        self.invalidate_all();
        Ok(())
    }

    /// Mark a layer for re-rendering
    pub fn invalidate(&mut self, layer: Layer) {
        self.dirty.insert(layer);
    }

    /// Mark every layer for re-rendering
    pub fn invalidate_all(&mut self) {
        self.dirty = LayerSet::all();
    }

    /// Layers marked since the last call
    pub fn take_dirty(&mut self) -> LayerSet {
        std::mem::take(&mut self.dirty)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Log a refused operation and queue it for the host
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    /// Log an error raised while handling input and queue it for the host
    pub fn report(&mut self, err: &SceneError) {
        tracing::error!("{err}");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: err.to_string(),
        });
    }

    /// Queued diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain queued diagnostics
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
