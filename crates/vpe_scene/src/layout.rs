// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node geometry in node-local coordinates.
//!
//! The origin is the node position: the top-left corner of the body, just
//! below the title bar. The title bar occupies negative y.

use crate::style::EffectiveNodeStyle;
use indexmap::IndexMap;
use vpe_graph::{Node, Point, Rect, SlotCategory, SlotDirection};

/// Geometry of one slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotLayout {
    /// Input or output
    pub direction: SlotDirection,
    /// Hit rect of icon and label
    pub rect: Rect,
    /// Icon rect
    pub icon: Rect,
    /// Where connectors attach
    pub anchor: Point,
    /// Label baseline origin, if a label is drawn
    pub label: Option<Point>,
}

/// Geometry of a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    /// Full bounds including the title bar
    pub bounds: Rect,
    /// Title bar height, zero when hidden
    pub title_height: f64,
    /// Slots by name
    pub slots: IndexMap<String, SlotLayout>,
    /// Center of the central text
    pub central_text: Option<Point>,
}

impl NodeLayout {
    /// Compute the layout of a node
    pub fn compute(node: &Node, style: &EffectiveNodeStyle) -> Self {
        let m = &style.metrics;
        let title_height = if style.title_bar { m.title_height } else { 0.0 };

        if let Some(size) = node.size {
            return Self {
                bounds: Rect::new(0.0, -title_height, size.width, size.height),
                title_height,
                slots: IndexMap::new(),
                central_text: None,
            };
        }

        let row_height = m.icon_height.max(m.slot_font_size);
        let slot_width = |name: &str, category: SlotCategory| match category {
            SlotCategory::Exec => m.icon_width,
            SlotCategory::Data => m.icon_width + m.icon_text_margin + m.text_width(name, m.slot_font_size),
        };
        let column_height = |rows: usize| {
            if rows == 0 {
                0.0
            } else {
                2.0 * m.slot_to_top_border
                    + rows as f64 * row_height
                    + (rows - 1) as f64 * m.slot_margin_bottom
            }
        };
        let row_y = |index: usize| m.slot_to_top_border + index as f64 * (row_height + m.slot_margin_bottom);

        let in_widths: Vec<f64> = node.inputs.values().map(|s| slot_width(&s.name, s.category)).collect();
        let out_widths: Vec<f64> = node.outputs.values().map(|s| slot_width(&s.name, s.category)).collect();
        let rows = in_widths.len().max(out_widths.len());
        let widest_row = (0..rows)
            .map(|i| in_widths.get(i).copied().unwrap_or(0.0) + out_widths.get(i).copied().unwrap_or(0.0))
            .fold(0.0, f64::max);

        let central = style.central_text.as_deref().map(|text| {
            let width = m.central_text_width.max(m.text_width(text, m.central_font_size));
            let height = m.central_font_size + 2.0 * m.slot_to_side_border;
            (width, height)
        });
        let middle = central.map_or(m.slot_margin_right, |(w, _)| w);

        let title_width = if style.title_bar {
            m.text_width(&node.title, m.title_font_size) + 2.0 * m.text_to_border
        } else {
            0.0
        };
        let width = (widest_row + 2.0 * m.slot_to_side_border + middle).max(title_width);
        let body_height = column_height(in_widths.len())
            .max(column_height(out_widths.len()))
            .max(central.map_or(0.0, |(_, h)| h))
            .max(2.0 * m.slot_to_top_border);

        let mut slots = IndexMap::new();
        for (i, slot) in node.inputs.values().enumerate() {
            let y = row_y(i);
            let x = m.slot_to_side_border;
            let w = in_widths[i];
            let icon = Rect::new(x, y + (row_height - m.icon_height) / 2.0, m.icon_width, m.icon_height);
            slots.insert(
                slot.name.clone(),
                SlotLayout {
                    direction: SlotDirection::In,
                    rect: Rect::new(x, y, w, row_height),
                    icon,
                    anchor: Point::new(x, icon.y + m.icon_height / 2.0),
                    label: (slot.category == SlotCategory::Data)
                        .then(|| Point::new(x + m.icon_width + m.icon_text_margin, y + row_height)),
                },
            );
        }
        for (i, slot) in node.outputs.values().enumerate() {
            let y = row_y(i);
            let right = width - m.slot_to_side_border;
            let w = out_widths[i];
            let icon = Rect::new(right - m.icon_width, y + (row_height - m.icon_height) / 2.0, m.icon_width, m.icon_height);
            slots.insert(
                slot.name.clone(),
                SlotLayout {
                    direction: SlotDirection::Out,
                    rect: Rect::new(right - w, y, w, row_height),
                    icon,
                    anchor: Point::new(right, icon.y + m.icon_height / 2.0),
                    label: (slot.category == SlotCategory::Data).then(|| Point::new(right - w, y + row_height)),
                },
            );
        }

        Self {
            bounds: Rect::new(0.0, -title_height, width, body_height + title_height),
            title_height,
            slots,
            central_text: central.map(|_| Point::new(width / 2.0, body_height / 2.0)),
        }
    }

    /// Bounds in scene space for a node at `position`
    pub fn scene_bounds(&self, position: Point) -> Rect {
        self.bounds.translated(position)
    }

    /// Connector anchor of a slot in scene space
    pub fn anchor(&self, slot: &str, position: Point) -> Option<Point> {
        self.slots.get(slot).map(|s| s.anchor + position)
    }

    /// Slot whose rect contains a node-local point
    pub fn slot_at(&self, local: Point) -> Option<&str> {
        self.slots
            .iter()
            .find(|(_, s)| s.rect.contains(local))
            .map(|(name, _)| name.as_str())
    }
}

/// Which border of a resizable node is being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeBorder {
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
    /// Left edge
    Left,
    /// Right edge
    Right,
    /// Top-left corner
    TopLeft,
    /// Top-right corner
    TopRight,
    /// Bottom-left corner
    BottomLeft,
    /// Bottom-right corner
    BottomRight,
}

/// Pointer cursor requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorIcon {
    /// Regular arrow
    #[default]
    Default,
    /// Pointing hand over slots
    Pointer,
    /// Vertical resize
    NsResize,
    /// Horizontal resize
    EwResize,
    /// Diagonal resize, top-left to bottom-right
    NwseResize,
    /// Diagonal resize, top-right to bottom-left
    NeswResize,
}

impl CursorIcon {
    /// CSS cursor name
    pub fn css_name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pointer => "pointer",
            Self::NsResize => "ns-resize",
            Self::EwResize => "ew-resize",
            Self::NwseResize => "nwse-resize",
            Self::NeswResize => "nesw-resize",
        }
    }
}

impl ResizeBorder {
    /// Border of `bounds` within `distance` of a node-local point
    pub fn detect(local: Point, bounds: Rect, distance: f64) -> Option<Self> {
        if !bounds.expanded(distance).contains(local) {
            return None;
        }
        let left = (local.x - bounds.left()).abs() <= distance;
        let right = (local.x - bounds.right()).abs() <= distance;
        let top = (local.y - bounds.top()).abs() <= distance;
        let bottom = (local.y - bounds.bottom()).abs() <= distance;
        match (top, bottom, left, right) {
            (true, _, true, _) => Some(Self::TopLeft),
            (true, _, _, true) => Some(Self::TopRight),
            (_, true, true, _) => Some(Self::BottomLeft),
            (_, true, _, true) => Some(Self::BottomRight),
            (true, ..) => Some(Self::Top),
            (_, true, ..) => Some(Self::Bottom),
            (_, _, true, _) => Some(Self::Left),
            (_, _, _, true) => Some(Self::Right),
            _ => None,
        }
    }

    /// Cursor to show while hovering or dragging this border
    pub fn cursor(self) -> CursorIcon {
        match self {
            Self::Top | Self::Bottom => CursorIcon::NsResize,
            Self::Left | Self::Right => CursorIcon::EwResize,
            Self::TopLeft | Self::BottomRight => CursorIcon::NwseResize,
            Self::TopRight | Self::BottomLeft => CursorIcon::NeswResize,
        }
    }

    /// Move the dragged edges of `rect` by `delta`, keeping at least `min`
    /// in each dimension by pinning the opposite edge.
    pub fn apply(self, rect: Rect, delta: Point, min: f64) -> Rect {
        let (mut left, mut top, mut right, mut bottom) = (rect.left(), rect.top(), rect.right(), rect.bottom());
        let (moves_left, moves_right, moves_top, moves_bottom) = match self {
            Self::Top => (false, false, true, false),
            Self::Bottom => (false, false, false, true),
            Self::Left => (true, false, false, false),
            Self::Right => (false, true, false, false),
            Self::TopLeft => (true, false, true, false),
            Self::TopRight => (false, true, true, false),
            Self::BottomLeft => (true, false, false, true),
            Self::BottomRight => (false, true, false, true),
        };
        if moves_left {
            left = (left + delta.x).min(right - min);
        }
        if moves_right {
            right = (right + delta.x).max(left + min);
        }
        if moves_top {
            top = (top + delta.y).min(bottom - min);
        }
        if moves_bottom {
            bottom = (bottom + delta.y).max(top + min);
        }
        Rect::new(left, top, right - left, bottom - top)
    }
}
