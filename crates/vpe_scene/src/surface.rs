// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drawing surface contract consumed from the host.
//!
//! The host supplies the visible [`Surface`]; the renderer asks it for
//! same-typed offscreen surfaces, one per layer. [`RecordingSurface`] is an
//! in-memory implementation used by tests and the headless tool.

use crate::style::Rgba;
use vpe_graph::{CubicBezier, Point, Rect};

/// Immediate-mode 2D drawing context
pub trait DrawContext {
    /// Push the transform and clip state
    fn save(&mut self);
    /// Pop the transform and clip state
    fn restore(&mut self);
    /// Replace the transform with `device = (p + translate) * scale`
    fn set_transform(&mut self, scale: f64, translate: Point);
    /// Intersect the clip with a rect in current coordinates
    fn clip_rect(&mut self, rect: Rect);
    /// Fill a rect, optionally with rounded corners
    fn fill_rect(&mut self, rect: Rect, radius: f64, color: Rgba);
    /// Stroke a rect outline
    fn stroke_rect(&mut self, rect: Rect, radius: f64, color: Rgba, width: f64);
    /// Stroke a straight line
    fn stroke_line(&mut self, from: Point, to: Point, color: Rgba, width: f64);
    /// Stroke a cubic Bézier
    fn stroke_bezier(&mut self, curve: &CubicBezier, color: Rgba, width: f64);
    /// Fill a circle
    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba);
    /// Width of `text` at `font_size`
    fn measure_text(&self, text: &str, font_size: f64) -> f64;
    /// Draw text with its baseline starting at `origin`
    fn fill_text(&mut self, text: &str, origin: Point, font_size: f64, color: Rgba);
}

/// A resizable drawable surface
pub trait Surface: DrawContext + Sized {
    /// Width in pixels
    fn width(&self) -> u32;
    /// Height in pixels
    fn height(&self) -> u32;
    /// Change the pixel size; contents are lost
    fn resize(&mut self, width: u32, height: u32);
    /// Clear to transparent
    fn clear(&mut self);
    /// Create an offscreen surface of the same kind
    fn create_offscreen(&self, width: u32, height: u32) -> Self;
    /// Draw `layer` on top of this surface
    fn composite(&mut self, layer: &Self);
    /// Whether this object can actually be drawn into
    fn is_drawable(&self) -> bool {
        true
    }
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `save`
    Save,
    /// `restore`
    Restore,
    /// `set_transform`
    Transform {
        /// Scale
        scale: f64,
        /// Translation
        translate: Point,
    },
    /// `clip_rect`
    Clip(Rect),
    /// `fill_rect`
    FillRect {
        /// Rect
        rect: Rect,
        /// Color
        color: Rgba,
    },
    /// `stroke_rect`
    StrokeRect {
        /// Rect
        rect: Rect,
        /// Color
        color: Rgba,
    },
    /// `stroke_line`
    Line {
        /// Start
        from: Point,
        /// End
        to: Point,
        /// Color
        color: Rgba,
    },
    /// `stroke_bezier`
    Bezier {
        /// Curve
        curve: CubicBezier,
        /// Color
        color: Rgba,
    },
    /// `fill_circle`
    Circle {
        /// Center
        center: Point,
        /// Radius
        radius: f64,
        /// Color
        color: Rgba,
    },
    /// `fill_text`
    Text {
        /// Text
        text: String,
        /// Baseline origin
        origin: Point,
        /// Color
        color: Rgba,
    },
}

/// Surface that records drawing calls instead of rasterizing them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
    composites: usize,
    detached: bool,
}

impl RecordingSurface {
    /// Create a surface of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            composites: 0,
            detached: false,
        }
    }

    /// A surface that is not backed by anything drawable, like a host
    /// element that was never attached
    pub fn detached(width: u32, height: u32) -> Self {
        Self {
            detached: true,
            ..Self::new(width, height)
        }
    }

    /// Calls recorded since the last clear
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of layers composited since the last clear
    pub fn composites(&self) -> usize {
        self.composites
    }

    /// Texts drawn since the last clear
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of Bézier strokes since the last clear
    pub fn bezier_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Bezier { .. })).count()
    }
}

impl DrawContext for RecordingSurface {
    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn set_transform(&mut self, scale: f64, translate: Point) {
        self.ops.push(DrawOp::Transform { scale, translate });
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::Clip(rect));
    }

    fn fill_rect(&mut self, rect: Rect, _radius: f64, color: Rgba) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, _radius: f64, color: Rgba, _width: f64) {
        self.ops.push(DrawOp::StrokeRect { rect, color });
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: Rgba, _width: f64) {
        self.ops.push(DrawOp::Line { from, to, color });
    }

    fn stroke_bezier(&mut self, curve: &CubicBezier, color: Rgba, _width: f64) {
        self.ops.push(DrawOp::Bezier { curve: *curve, color });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba) {
        self.ops.push(DrawOp::Circle { center, radius, color });
    }

    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * 0.6
    }

    fn fill_text(&mut self, text: &str, origin: Point, _font_size: f64, color: Rgba) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            origin,
            color,
        });
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.clear();
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.composites = 0;
    }

    fn create_offscreen(&self, width: u32, height: u32) -> Self {
        Self::new(width, height)
    }

    fn composite(&mut self, layer: &Self) {
        self.ops.extend(layer.ops.iter().cloned());
        self.composites += 1;
    }

    fn is_drawable(&self) -> bool {
        !self.detached
    }
}
