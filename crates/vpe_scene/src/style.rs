// SPDX-License-Identifier: MIT OR Apache-2.0
//! Style sheet and per-type style resolution.
//!
//! The sheet holds one base record per visual class. Each node type's
//! [`Appearance`] overrides are merged into a flat [`EffectiveNodeStyle`]
//! once, then cached by type name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use vpe_graph::{Appearance, NodeKind, TypeRegistry};

/// RGBA color
pub type Rgba = [u8; 4];

/// Node geometry constants in scene units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    /// Title bar height
    pub title_height: f64,
    /// Title font size
    pub title_font_size: f64,
    /// Padding between title text and the node border
    pub text_to_border: f64,
    /// Gap above the first slot row
    pub slot_to_top_border: f64,
    /// Gap between slots and the side borders
    pub slot_to_side_border: f64,
    /// Gap between input and output columns
    pub slot_margin_right: f64,
    /// Gap between slot rows
    pub slot_margin_bottom: f64,
    /// Slot label font size
    pub slot_font_size: f64,
    /// Slot icon width
    pub icon_width: f64,
    /// Slot icon height
    pub icon_height: f64,
    /// Gap between slot icon and label
    pub icon_text_margin: f64,
    /// Minimum width reserved for central text
    pub central_text_width: f64,
    /// Central text font size
    pub central_font_size: f64,
    /// Average glyph width relative to the font size
    pub char_width_ratio: f64,
    /// Corner radius of node bodies
    pub corner_radius: f64,
    /// Border stroke width
    pub border_width: f64,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            title_height: 25.0,
            title_font_size: 12.0,
            text_to_border: 5.0,
            slot_to_top_border: 6.0,
            slot_to_side_border: 6.0,
            slot_margin_right: 20.0,
            slot_margin_bottom: 10.0,
            slot_font_size: 10.0,
            icon_width: 10.0,
            icon_height: 10.0,
            icon_text_margin: 3.0,
            central_text_width: 10.0,
            central_font_size: 20.0,
            char_width_ratio: 0.6,
            corner_radius: 4.0,
            border_width: 1.0,
        }
    }
}

impl NodeMetrics {
    /// Estimated width of `text` at `font_size`
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * self.char_width_ratio
    }
}

/// Colors of a node body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeColors {
    /// Body fill
    pub body: Rgba,
    /// Title bar fill
    pub title_bar: Rgba,
    /// Title text
    pub title_text: Rgba,
    /// Border
    pub border: Rgba,
    /// Border when selected
    pub border_selected: Rgba,
    /// Border when hovered
    pub border_hovered: Rgba,
    /// Central text
    pub central_text: Rgba,
}

impl Default for NodeColors {
    fn default() -> Self {
        Self {
            body: [48, 48, 52, 235],
            title_bar: [70, 90, 120, 255],
            title_text: [230, 230, 230, 255],
            border: [20, 20, 20, 255],
            border_selected: [255, 180, 60, 255],
            border_hovered: [150, 150, 150, 255],
            central_text: [220, 220, 220, 255],
        }
    }
}

impl NodeColors {
    fn comment() -> Self {
        Self {
            body: [60, 70, 60, 110],
            title_bar: [70, 90, 70, 180],
            title_text: [230, 230, 230, 255],
            border: [90, 110, 90, 255],
            border_selected: [255, 180, 60, 255],
            border_hovered: [150, 170, 150, 255],
            central_text: [220, 220, 220, 255],
        }
    }
}

/// Slot icon and label colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotColors {
    /// Exec slot icon
    pub exec: Rgba,
    /// Data slot icon without a type color
    pub data: Rgba,
    /// Icon under the pointer
    pub hovered: Rgba,
    /// Label text
    pub label: Rgba,
    /// Icon color per data type
    pub type_colors: IndexMap<String, Rgba>,
}

impl Default for SlotColors {
    fn default() -> Self {
        let mut type_colors = IndexMap::new();
        type_colors.insert("numpy.ndarray".to_string(), [100, 150, 200, 255]);
        type_colors.insert("number".to_string(), [80, 200, 80, 255]);
        type_colors.insert("string".to_string(), [200, 180, 150, 255]);
        Self {
            exec: [230, 230, 230, 255],
            data: [150, 150, 150, 255],
            hovered: [255, 220, 120, 255],
            label: [200, 200, 200, 255],
            type_colors,
        }
    }
}

impl SlotColors {
    /// Icon color for a data type
    pub fn color_for(&self, data_type: &str, is_exec: bool) -> Rgba {
        if is_exec {
            return self.exec;
        }
        self.type_colors.get(data_type).copied().unwrap_or(self.data)
    }
}

/// Connector stroke style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorStyle {
    /// Normal stroke
    pub normal: Rgba,
    /// Stroke under the pointer
    pub hovered: Rgba,
    /// Stroke of a pending, rejected connection
    pub rejected: Rgba,
    /// Stroke width
    pub width: f64,
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self {
            normal: [180, 180, 180, 255],
            hovered: [255, 220, 120, 255],
            rejected: [220, 60, 60, 255],
            width: 2.0,
        }
    }
}

/// Background style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundStyle {
    /// Fill color
    pub color: Rgba,
    /// Grid line color
    pub grid_color: Rgba,
    /// Grid spacing in scene units
    pub grid_spacing: f64,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            color: [30, 30, 34, 255],
            grid_color: [45, 45, 50, 255],
            grid_spacing: 20.0,
        }
    }
}

/// Base style record per visual class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSheet {
    /// Background
    pub background: BackgroundStyle,
    /// Regular nodes
    pub node: NodeColors,
    /// Comment nodes
    pub comment: NodeColors,
    /// Slots
    pub slot: SlotColors,
    /// Connectors
    pub connector: ConnectorStyle,
    /// Node geometry
    pub metrics: NodeMetrics,
    /// Marquee and debug overlays
    pub overlay: OverlayStyle,
}

/// Colors of transient overlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Marquee fill
    pub marquee_fill: Rgba,
    /// Marquee border
    pub marquee_border: Rgba,
    /// Debug annotations
    pub debug: Rgba,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marquee_fill: [100, 150, 255, 40],
            marquee_border: [100, 150, 255, 200],
            debug: [255, 0, 255, 255],
        }
    }
}

/// Style of one node type after overrides are applied
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveNodeStyle {
    /// Colors
    pub colors: NodeColors,
    /// Whether the title bar is drawn
    pub title_bar: bool,
    /// Central text
    pub central_text: Option<String>,
    /// Geometry
    pub metrics: NodeMetrics,
}

impl StyleSheet {
    /// Merge a type's overrides into the base record of its class
    pub fn resolve(&self, kind: NodeKind, appearance: &Appearance) -> EffectiveNodeStyle {
        let mut colors = match kind {
            NodeKind::Regular => self.node.clone(),
            NodeKind::Comment => self.comment.clone(),
        };
        if let Some(body) = appearance.body_color {
            colors.body = body;
        }
        if let Some(title_bar) = appearance.title_bar_color {
            colors.title_bar = title_bar;
        }
        if let Some(border) = appearance.border_color {
            colors.border = border;
        }
        EffectiveNodeStyle {
            colors,
            title_bar: appearance.title_bar || kind == NodeKind::Comment,
            central_text: appearance.central_text.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Default sheet
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self {
            background: BackgroundStyle::default(),
            node: NodeColors::default(),
            comment: NodeColors::comment(),
            slot: SlotColors::default(),
            connector: ConnectorStyle::default(),
            metrics: NodeMetrics::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

/// Resolved styles cached by node type
#[derive(Debug, Default)]
pub struct StyleCache {
    sheet: StyleSheet,
    resolved: HashMap<String, Arc<EffectiveNodeStyle>>,
}

impl StyleCache {
    /// Create a cache over a sheet
    pub fn new(sheet: StyleSheet) -> Self {
        Self {
            sheet,
            resolved: HashMap::new(),
        }
    }

    /// The base sheet
    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    /// Replace the sheet and drop every resolved style
    pub fn set_sheet(&mut self, sheet: StyleSheet) {
        self.sheet = sheet;
        self.resolved.clear();
    }

    /// Forget resolved styles, e.g. after a type was re-registered
    pub fn invalidate(&mut self) {
        self.resolved.clear();
    }

    /// Effective style of a node type
    pub fn style_for(&mut self, registry: &TypeRegistry, node_type: &str) -> Arc<EffectiveNodeStyle> {
        if let Some(style) = self.resolved.get(node_type) {
            return Arc::clone(style);
        }
        let style = match registry.get(node_type) {
            Some(descriptor) => self.sheet.resolve(descriptor.kind, &descriptor.appearance),
            None => self.sheet.resolve(NodeKind::Regular, &Appearance::default()),
        };
        let style = Arc::new(style);
        self.resolved.insert(node_type.to_string(), Arc::clone(&style));
        style
    }
}
