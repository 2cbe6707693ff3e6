// SPDX-License-Identifier: MIT OR Apache-2.0
//! View transform between device space and scene space.
//!
//! `scene = device / scale - translate` and `device = (scene + translate) * scale`.

use crate::config::SceneConfig;
use serde::{Deserialize, Serialize};
use vpe_graph::{Point, Rect};

/// Scale values within this distance of 1 snap to 1
const SNAP_TO_ONE: f64 = 0.01;

/// Level of detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lod {
    /// Full detail
    High,
    /// Zoomed far out; labels and curves are simplified
    Low,
}

/// Serialized view state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SerializedView {
    /// Translation `[x, y]` in scene units
    pub translate: [f64; 2],
    /// Zoom factor
    pub scale: f64,
}

/// Zoom and pan state of a scene
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    translate: Point,
    scale: f64,
    min_scale: f64,
    max_scale: f64,
    lod_threshold: f64,
    width: f64,
    height: f64,
}

impl View {
    /// Create an identity view with the configured zoom range
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            translate: Point::ZERO,
            scale: 1.0,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            lod_threshold: config
                .lod_threshold
                .unwrap_or((config.max_scale - config.min_scale) / 5.0),
            width: 0.0,
            height: 0.0,
        }
    }

    /// Current translation
    pub fn translate(&self) -> Point {
        self.translate
    }

    /// Current zoom factor
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Allowed zoom range
    pub fn scale_range(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    /// Device point to scene point
    pub fn map_to_scene(&self, p: Point) -> Point {
        p / self.scale - self.translate
    }

    /// Scene point to device point
    pub fn map_from_scene(&self, p: Point) -> Point {
        (p + self.translate) * self.scale
    }

    /// Device rect to scene rect
    pub fn map_rect_to_scene(&self, r: Rect) -> Rect {
        let origin = self.map_to_scene(r.origin());
        Rect::new(origin.x, origin.y, r.width / self.scale, r.height / self.scale)
    }

    /// Scene rect to device rect
    pub fn map_rect_from_scene(&self, r: Rect) -> Rect {
        let origin = self.map_from_scene(r.origin());
        Rect::new(origin.x, origin.y, r.width * self.scale, r.height * self.scale)
    }

    /// Set the zoom factor keeping the scene point under `pivot` (device
    /// space) fixed. Returns whether the scale changed.
    pub fn set_scale(&mut self, scale: f64, pivot: Point) -> bool {
        let mut scale = scale.clamp(self.min_scale, self.max_scale);
        if (scale - 1.0).abs() < SNAP_TO_ONE {
            scale = 1.0;
        }
        if scale == self.scale {
            return false;
        }
        let before = self.map_to_scene(pivot);
        self.scale = scale;
        let after = self.map_to_scene(pivot);
        self.translate += after - before;
        true
    }

    /// Apply a wheel delta as a zoom about `pivot`
    pub fn zoom_by_wheel(&mut self, delta_y: f64, factor: f64, pivot: Point) -> bool {
        self.set_scale(self.scale + delta_y * factor, pivot)
    }

    /// Set the translation
    pub fn set_translate(&mut self, translate: Point) {
        self.translate = translate;
    }

    /// Pan by a scene-space delta
    pub fn translate_by(&mut self, delta: Point) {
        self.translate += delta;
    }

    /// Pan by a device-space delta
    pub fn pan_by_device(&mut self, delta: Point) {
        self.translate += delta / self.scale;
    }

    /// Level of detail derived from the zoom factor
    pub fn lod(&self) -> Lod {
        if self.scale > self.lod_threshold {
            Lod::High
        } else {
            Lod::Low
        }
    }

    /// Viewport size in device pixels
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Viewport size in device pixels
    pub fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Visible part of the scene
    pub fn scene_rect(&self) -> Rect {
        self.map_rect_to_scene(self.viewport())
    }

    /// Serialized form
    pub fn serialize(&self) -> SerializedView {
        SerializedView {
            translate: self.translate.to_array(),
            scale: self.scale,
        }
    }

    /// Apply a serialized form; the scale is clamped to the allowed range
    pub fn configure(&mut self, data: &SerializedView) {
        self.translate = Point::from(data.translate);
        self.scale = data.scale.clamp(self.min_scale, self.max_scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        View::new(&SceneConfig::default())
    }

    fn close(a: Point, b: Point) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn test_mapping_is_inverse() {
        let mut v = view();
        v.set_translate(Point::new(30.0, -12.0));
        v.set_scale(2.0, Point::ZERO);
        let p = Point::new(123.0, 45.0);
        assert!(close(v.map_from_scene(v.map_to_scene(p)), p));
    }

    #[test]
    fn test_zoom_keeps_pivot_fixed() {
        let mut v = view();
        v.set_translate(Point::new(15.0, 7.0));
        let pivot = Point::new(400.0, 300.0);
        for scale in [2.5, 0.4, 1.7, 0.9] {
            let before = v.map_to_scene(pivot);
            assert!(v.set_scale(scale, pivot));
            assert!(close(v.map_to_scene(pivot), before));
        }
    }

    #[test]
    fn test_scale_clamps_and_snaps() {
        let mut v = view();
        assert!(v.set_scale(10.0, Point::ZERO));
        assert_eq!(v.scale(), 3.0);
        assert!(!v.set_scale(4.0, Point::ZERO));
        v.set_scale(1.005, Point::ZERO);
        assert_eq!(v.scale(), 1.0);
        assert!(!v.set_scale(0.995, Point::ZERO));
    }

    #[test]
    fn test_lod_threshold() {
        let mut v = view();
        assert_eq!(v.lod(), Lod::High);
        v.set_scale(0.5, Point::ZERO);
        assert_eq!(v.lod(), Lod::Low);
        v.set_scale(0.6, Point::ZERO);
        assert_eq!(v.lod(), Lod::High);
    }

    #[test]
    fn test_wheel_zoom_direction() {
        let mut v = view();
        v.zoom_by_wheel(-100.0, -0.002, Point::new(10.0, 10.0));
        assert!((v.scale() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_scene_rect_follows_zoom() {
        let mut v = view();
        v.resize(800.0, 600.0);
        v.set_scale(2.0, Point::ZERO);
        assert_eq!(v.scene_rect(), Rect::new(0.0, 0.0, 400.0, 300.0));
    }
}
