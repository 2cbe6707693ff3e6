// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layered renderer.
//!
//! One offscreen surface per [`Layer`]. Only dirty layers are redrawn; the
//! visible surface is then rebuilt by compositing every layer bottom to top.

use crate::collision::ItemId;
use crate::commands::Command;
use crate::error::{Result, SceneError};
use crate::history::UndoHistory;
use crate::state::{NodeVisual, SceneState};
use crate::surface::{DrawContext, Surface};
use crate::view::Lod;
use vpe_graph::{Node, Point, Rect, SlotCategory, VisualState};

/// Rendering layers, bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Background fill and grid
    Background,
    /// Comment nodes
    Comments,
    /// Connectors
    Connectors,
    /// Regular nodes
    Nodes,
    /// Feedback of the running gesture
    Action,
    /// Debug overlay, only composited when enabled
    Debug,
}

impl Layer {
    /// Every layer in compositing order
    pub const ALL: [Layer; 6] = [
        Layer::Background,
        Layer::Comments,
        Layer::Connectors,
        Layer::Nodes,
        Layer::Action,
        Layer::Debug,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerSet(u8);

impl LayerSet {
    /// No layer
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every layer
    pub fn all() -> Self {
        Layer::ALL.into_iter().fold(Self::empty(), |set, layer| set.with(layer))
    }

    /// Set with one more layer
    pub fn with(mut self, layer: Layer) -> Self {
        self.insert(layer);
        self
    }

    /// Add a layer
    pub fn insert(&mut self, layer: Layer) {
        self.0 |= layer.bit();
    }

    /// Remove a layer
    pub fn remove(&mut self, layer: Layer) {
        self.0 &= !layer.bit();
    }

    /// Whether a layer is in the set
    pub fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }

    /// Whether the set is empty
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Layers of both sets
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Layers in compositing order
    pub fn iter(self) -> impl Iterator<Item = Layer> {
        Layer::ALL.into_iter().filter(move |layer| self.contains(*layer))
    }
}

/// What a frame is drawn from
pub struct Frame<'a> {
    /// Scene state
    pub state: &'a SceneState,
    /// Running gesture, drawn on the action layer
    pub active: Option<&'a dyn Command>,
    /// History, listed by the debug overlay
    pub history: &'a UndoHistory,
}

/// Layered renderer over a host surface
#[derive(Debug)]
pub struct Renderer<S: Surface> {
    target: S,
    layers: Vec<S>,
    dirty: LayerSet,
    running: bool,
    debug: bool,
    frames: u64,
}

impl<S: Surface> Renderer<S> {
    /// Create a renderer drawing into `target`
    pub fn new(target: S) -> Result<Self> {
        if !target.is_drawable() {
            return Err(SceneError::InvalidSurface);
        }
        let (width, height) = (target.width(), target.height());
        let layers = Layer::ALL
            .iter()
            .map(|_| target.create_offscreen(width, height))
            .collect();
        Ok(Self {
            target,
            layers,
            dirty: LayerSet::all(),
            running: false,
            debug: false,
            frames: 0,
        })
    }

    /// The visible surface
    pub fn target(&self) -> &S {
        &self.target
    }

    /// The offscreen surface of a layer
    pub fn layer(&self, layer: Layer) -> &S {
        &self.layers[layer as usize]
    }

    /// Mark layers for re-rendering
    pub fn invalidate(&mut self, layers: LayerSet) {
        self.dirty = self.dirty.union(layers);
    }

    /// Layers waiting for the next frame
    pub fn dirty(&self) -> LayerSet {
        self.dirty
    }

    /// Start continuous rendering
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop continuous rendering
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether continuous rendering is on
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the debug overlay is composited
    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Show or hide the debug overlay
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        self.dirty.insert(Layer::Debug);
    }

    /// Number of frames composited so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Resize the visible surface and every layer
    pub fn resize(&mut self, width: u32, height: u32) {
        self.target.resize(width, height);
        for layer in &mut self.layers {
            layer.resize(width, height);
        }
        self.dirty = LayerSet::all();
    }

    /// Redraw dirty layers and composite. Returns the layers redrawn; an
    /// empty set means nothing was dirty and the surface is untouched.
    pub fn render(&mut self, frame: &Frame<'_>) -> Result<LayerSet> {
        let (width, height) = (self.target.width(), self.target.height());
        if width == 0 || height == 0 {
            return Err(SceneError::ZeroSizeSurface { width, height });
        }
        let dirty = std::mem::take(&mut self.dirty);
        if dirty.is_empty() {
            return Ok(dirty);
        }

        let mut redrawn = LayerSet::empty();
        for layer in dirty.iter() {
            if layer == Layer::Debug && !self.debug {
                continue;
            }
            let surface = &mut self.layers[layer as usize];
            surface.clear();
            draw_layer(surface, layer, frame);
            redrawn.insert(layer);
        }

        self.target.clear();
        for layer in Layer::ALL {
            if layer == Layer::Debug && !self.debug {
                continue;
            }
            self.target.composite(&self.layers[layer as usize]);
        }
        self.frames += 1;
        tracing::trace!("Frame {} redrew {:?}", self.frames, redrawn);
        Ok(redrawn)
    }
}

fn draw_layer(ctx: &mut dyn DrawContext, layer: Layer, frame: &Frame<'_>) {
    let state = frame.state;
    match layer {
        Layer::Background => draw_background(ctx, state),
        Layer::Comments => {
            scene_transform(ctx, state);
            for_each_node_back_to_front(state, true, |node, visual| draw_node(ctx, state, node, visual));
        }
        Layer::Connectors => {
            scene_transform(ctx, state);
            draw_connectors(ctx, state);
        }
        Layer::Nodes => {
            scene_transform(ctx, state);
            for_each_node_back_to_front(state, false, |node, visual| draw_node(ctx, state, node, visual));
        }
        Layer::Action => {
            if let Some(command) = frame.active {
                scene_transform(ctx, state);
                command.draw(ctx, state);
            }
        }
        Layer::Debug => draw_debug(ctx, frame),
    }
}

fn scene_transform(ctx: &mut dyn DrawContext, state: &SceneState) {
    ctx.set_transform(state.view.scale(), state.view.translate());
}

fn for_each_node_back_to_front(state: &SceneState, comments: bool, mut f: impl FnMut(&Node, &NodeVisual)) {
    for item in state.collision.z_ordered().rev() {
        let ItemId::Node(id) = item else {
            continue;
        };
        let (Some(node), Some(visual)) = (state.graph.node(id), state.node_visual(id)) else {
            continue;
        };
        if node.is_comment() == comments {
            f(node, visual);
        }
    }
}

fn draw_background(ctx: &mut dyn DrawContext, state: &SceneState) {
    let style = &state.style_sheet().background;
    ctx.set_transform(1.0, Point::ZERO);
    ctx.fill_rect(state.view.viewport(), 0.0, style.color);
    if state.lod() == Lod::Low || style.grid_spacing <= 0.0 {
        return;
    }

    scene_transform(ctx, state);
    let area = state.view.scene_rect();
    let width = 1.0 / state.view.scale();
    let mut x = (area.left() / style.grid_spacing).floor() * style.grid_spacing;
    while x <= area.right() {
        ctx.stroke_line(Point::new(x, area.top()), Point::new(x, area.bottom()), style.grid_color, width);
        x += style.grid_spacing;
    }
    let mut y = (area.top() / style.grid_spacing).floor() * style.grid_spacing;
    while y <= area.bottom() {
        ctx.stroke_line(Point::new(area.left(), y), Point::new(area.right(), y), style.grid_color, width);
        y += style.grid_spacing;
    }
}

fn draw_connectors(ctx: &mut dyn DrawContext, state: &SceneState) {
    let style = &state.style_sheet().connector;
    let lod = state.lod();
    for connector in state.graph.connectors() {
        let Some(curve) = state.connector_curve(connector) else {
            continue;
        };
        let color = match connector.state {
            VisualState::Hovered | VisualState::Selected => style.hovered,
            VisualState::Normal => style.normal,
        };
        match lod {
            Lod::High => ctx.stroke_bezier(&curve, color, style.width),
            Lod::Low => ctx.stroke_line(curve.p0, curve.p3, color, style.width),
        }
    }
}

fn draw_node(ctx: &mut dyn DrawContext, state: &SceneState, node: &Node, visual: &NodeVisual) {
    let style = &visual.style;
    let m = &style.metrics;
    let colors = &style.colors;
    let lod = state.lod();
    let bounds = visual.layout.scene_bounds(node.position);

    ctx.fill_rect(bounds, m.corner_radius, colors.body);
    if visual.layout.title_height > 0.0 {
        let title = Rect::new(bounds.x, bounds.y, bounds.width, visual.layout.title_height);
        ctx.fill_rect(title, m.corner_radius, colors.title_bar);
        if lod == Lod::High {
            let baseline = Point::new(
                bounds.x + m.text_to_border,
                bounds.y + (visual.layout.title_height + m.title_font_size) / 2.0,
            );
            ctx.fill_text(&node.title, baseline, m.title_font_size, colors.title_text);
        }
    }
    if node.is_comment() && lod == Lod::High {
        if let Some(text) = node.properties.get("text").and_then(|v| v.as_str()) {
            let origin = node.position + Point::new(m.text_to_border, m.title_font_size + m.text_to_border);
            ctx.fill_text(text, origin, m.title_font_size, colors.title_text);
        }
    }

    let border = match node.state {
        VisualState::Selected => colors.border_selected,
        VisualState::Hovered => colors.border_hovered,
        VisualState::Normal => colors.border,
    };
    ctx.stroke_rect(bounds, m.corner_radius, border, m.border_width);

    let slot_colors = &state.style_sheet().slot;
    for slot in node.slots() {
        let Some(layout) = visual.layout.slots.get(&slot.name) else {
            continue;
        };
        let icon = layout.icon.translated(node.position);
        let color = if slot.state == VisualState::Hovered {
            slot_colors.hovered
        } else {
            slot_colors.color_for(&slot.data_type, slot.category == SlotCategory::Exec)
        };
        match (slot.category, slot.is_connected()) {
            (SlotCategory::Exec, true) => ctx.fill_rect(icon, 0.0, color),
            (SlotCategory::Exec, false) => ctx.stroke_rect(icon, 0.0, color, m.border_width),
            (SlotCategory::Data, true) => ctx.fill_circle(icon.center(), icon.width / 2.0, color),
            (SlotCategory::Data, false) => ctx.stroke_rect(icon, icon.width / 2.0, color, m.border_width),
        }
        if lod == Lod::High {
            if let Some(label) = layout.label {
                ctx.fill_text(&slot.name, label + node.position, m.slot_font_size, slot_colors.label);
            }
        }
    }

    if let (Some(text), Some(center)) = (&style.central_text, visual.layout.central_text) {
        let width = ctx.measure_text(text, m.central_font_size);
        let origin = node.position + center + Point::new(-width / 2.0, m.central_font_size / 2.0);
        ctx.fill_text(text, origin, m.central_font_size, colors.central_text);
    }
}

fn draw_debug(ctx: &mut dyn DrawContext, frame: &Frame<'_>) {
    let state = frame.state;
    let color = state.style_sheet().overlay.debug;
    scene_transform(ctx, state);
    for (index, item) in state.collision.z_ordered().enumerate() {
        let Some(rect) = state.collision.bounding_rect(item) else {
            continue;
        };
        ctx.stroke_rect(rect.rect, 0.0, color, 1.0);
        ctx.fill_text(&index.to_string(), rect.rect.origin(), 10.0, color);
    }
    ctx.fill_circle(state.pointer(), 3.0, color);

    ctx.set_transform(1.0, Point::ZERO);
    let pointer = state.pointer();
    ctx.fill_text(&format!("pointer {:.1}, {:.1}", pointer.x, pointer.y), Point::new(10.0, 20.0), 12.0, color);
    let current = frame.history.len() - frame.history.reverse_index();
    for (index, description) in frame.history.descriptions().iter().enumerate() {
        let marker = if index + 1 == current { ">" } else { " " };
        let origin = Point::new(10.0, 40.0 + index as f64 * 14.0);
        ctx.fill_text(&format!("{marker} {description}"), origin, 12.0, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{add, endpoint, state};
    use crate::surface::{DrawOp, RecordingSurface};

    fn frame<'a>(state: &'a SceneState, history: &'a UndoHistory) -> Frame<'a> {
        Frame {
            state,
            active: None,
            history,
        }
    }

    #[test]
    fn test_layer_set() {
        let mut set = LayerSet::empty().with(Layer::Nodes).with(Layer::Connectors);
        assert!(set.contains(Layer::Nodes));
        assert!(!set.contains(Layer::Background));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Layer::Connectors, Layer::Nodes]);
        set.remove(Layer::Nodes);
        assert_eq!(set, LayerSet::empty().with(Layer::Connectors));
        assert_eq!(LayerSet::all().iter().count(), 6);
    }

    #[test]
    fn test_zero_size_surface_is_an_error() {
        let state = state();
        let history = UndoHistory::default();
        let mut renderer = Renderer::new(RecordingSurface::new(0, 10)).unwrap();
        assert!(matches!(
            renderer.render(&frame(&state, &history)),
            Err(SceneError::ZeroSizeSurface { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_non_drawable_surface_is_an_error() {
        assert!(matches!(
            Renderer::new(RecordingSurface::detached(800, 600)),
            Err(SceneError::InvalidSurface)
        ));
        assert!(Renderer::new(RecordingSurface::new(800, 600)).is_ok());
    }

    #[test]
    fn test_only_dirty_layers_are_redrawn() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        let b = add(&mut state, "Image.GaussianFilter", 200.0, 100.0);
        state.connect(endpoint(a, "image"), endpoint(b, "input")).unwrap();
        state.view.resize(800.0, 600.0);
        let history = UndoHistory::default();
        let mut renderer = Renderer::new(RecordingSurface::new(800, 600)).unwrap();

        let first = renderer.render(&frame(&state, &history)).unwrap();
        let mut expected = LayerSet::all();
        expected.remove(Layer::Debug);
        assert_eq!(first, expected);
        assert_eq!(renderer.target().composites(), 5);
        assert_eq!(renderer.target().bezier_count(), 1);
        assert!(renderer.target().texts().contains(&"Read Image"));

        state.take_dirty();
        assert!(renderer.render(&frame(&state, &history)).unwrap().is_empty());
        assert_eq!(renderer.frames(), 1);

        state.translate_nodes(&[b], Point::new(5.0, 0.0)).unwrap();
        renderer.invalidate(state.take_dirty());
        let redrawn = renderer.render(&frame(&state, &history)).unwrap();
        assert_eq!(redrawn, LayerSet::empty().with(Layer::Nodes).with(Layer::Connectors));
        assert_eq!(renderer.frames(), 2);
    }

    #[test]
    fn test_low_lod_draws_straight_connectors_without_labels() {
        let mut state = state();
        let a = add(&mut state, "Image.Read", 10.0, 30.0);
        let b = add(&mut state, "Image.GaussianFilter", 200.0, 100.0);
        state.connect(endpoint(a, "image"), endpoint(b, "input")).unwrap();
        state.view.resize(800.0, 600.0);
        state.set_force_lod(Some(Lod::Low));
        let history = UndoHistory::default();
        let mut renderer = Renderer::new(RecordingSurface::new(800, 600)).unwrap();

        renderer.render(&frame(&state, &history)).unwrap();
        assert_eq!(renderer.target().bezier_count(), 0);
        assert!(renderer.target().texts().is_empty());
    }

    #[test]
    fn test_debug_overlay_is_composited_when_enabled() {
        let mut state = state();
        add(&mut state, "Image.Read", 10.0, 30.0);
        state.view.resize(400.0, 300.0);
        let history = UndoHistory::default();
        let mut renderer = Renderer::new(RecordingSurface::new(400, 300)).unwrap();
        renderer.set_debug(true);

        let redrawn = renderer.render(&frame(&state, &history)).unwrap();
        assert!(redrawn.contains(Layer::Debug));
        assert_eq!(renderer.target().composites(), 6);
        assert!(renderer
            .layer(Layer::Debug)
            .ops()
            .iter()
            .any(|op| matches!(op, DrawOp::Text { text, .. } if text.starts_with("pointer"))));

        renderer.set_debug(false);
        renderer.render(&frame(&state, &history)).unwrap();
        assert_eq!(renderer.target().composites(), 5);
    }

    #[test]
    fn test_resize_marks_everything_dirty() {
        let state = state();
        let history = UndoHistory::default();
        let mut renderer = Renderer::new(RecordingSurface::new(100, 100)).unwrap();
        renderer.render(&frame(&state, &history)).unwrap();
        renderer.resize(200, 50);
        assert_eq!(renderer.dirty(), LayerSet::all());
        assert_eq!(renderer.target().width(), 200);
    }
}
