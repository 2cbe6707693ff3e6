// SPDX-License-Identifier: MIT OR Apache-2.0
//! Z-ordered bounding-rect index for hit testing and area queries.
//!
//! Two independent lists are kept, front first: one for regular nodes and
//! connectors, one for comments. Comments always rank behind the first list.

use crate::error::{Result, SceneError};
use std::collections::HashMap;
use vpe_graph::{ConnectorId, CubicBezier, NodeId, Point, Rect};

/// Samples used when measuring distance to a connector curve
const CURVE_SAMPLES: usize = 20;

/// Indexed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// A node (regular or comment)
    Node(NodeId),
    /// A connector
    Connector(ConnectorId),
}

impl ItemId {
    /// The node id, if this is a node
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Connector(_) => None,
        }
    }
}

/// Item class, used to filter queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Regular node
    Node,
    /// Comment node
    Comment,
    /// Connector
    Connector,
}

/// Exact shape tested after the bounding rect matched
#[derive(Debug, Clone, PartialEq)]
pub enum HitShape {
    /// The rect itself
    Rect,
    /// A stroke around a curve
    Curve(CubicBezier),
}

/// Indexed geometry of one item
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingRect {
    /// Scene-space bounds
    pub rect: Rect,
    /// Item class
    pub kind: ItemKind,
    /// Exact shape
    pub shape: HitShape,
    /// Origin of the item's local coordinates
    pub origin: Point,
    /// Named sub-components in local coordinates
    pub components: Vec<(String, Rect)>,
}

impl BoundingRect {
    /// Geometry of a node
    pub fn node(kind: ItemKind, rect: Rect, origin: Point, components: Vec<(String, Rect)>) -> Self {
        Self {
            rect,
            kind,
            shape: HitShape::Rect,
            origin,
            components,
        }
    }

    /// Geometry of a connector curve, padded by the hit tolerance
    pub fn connector(curve: CubicBezier, tolerance: f64) -> Self {
        Self {
            rect: curve.bounding_rect().expanded(tolerance),
            kind: ItemKind::Connector,
            shape: HitShape::Curve(curve),
            origin: Point::ZERO,
            components: Vec::new(),
        }
    }
}

/// Result of a point query
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    /// The item hit
    pub item: ItemId,
    /// Its class
    pub kind: ItemKind,
    /// Query point in the item's local coordinates
    pub local: Point,
    /// Sub-component hit, e.g. a slot name
    pub component: Option<String>,
}

impl HitResult {
    /// Node id when a node was hit
    pub fn node(&self) -> Option<NodeId> {
        self.item.node()
    }

    /// Whether a node's sub-component was hit
    pub fn is_slot(&self) -> bool {
        self.component.is_some()
    }
}

/// Bounding-rect index
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    rects: HashMap<ItemId, BoundingRect>,
    z_order: Vec<ItemId>,
    comment_z_order: Vec<ItemId>,
    tolerance: f64,
}

impl CollisionDetector {
    /// Create an empty index; `tolerance` is the connector hit distance
    pub fn new(tolerance: f64) -> Self {
        Self {
            rects: HashMap::new(),
            z_order: Vec::new(),
            comment_z_order: Vec::new(),
            tolerance,
        }
    }

    /// Connector hit distance
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Register an item. Nodes and comments enter at the front of their
    /// list, connectors at the back.
    pub fn add_bounding_rect(&mut self, item: ItemId, rect: BoundingRect) -> Result<()> {
        if self.rects.contains_key(&item) {
            tracing::error!("Bounding rect for {item:?} registered twice");
            return Err(SceneError::DuplicateBoundingRect(item));
        }
        match rect.kind {
            ItemKind::Node => self.z_order.insert(0, item),
            ItemKind::Connector => self.z_order.push(item),
            ItemKind::Comment => self.comment_z_order.insert(0, item),
        }
        self.rects.insert(item, rect);
        Ok(())
    }

    /// Unregister an item
    pub fn remove_bounding_rect(&mut self, item: ItemId) -> Option<BoundingRect> {
        let rect = self.rects.remove(&item)?;
        self.z_order.retain(|i| *i != item);
        self.comment_z_order.retain(|i| *i != item);
        Some(rect)
    }

    /// Replace an item's geometry, keeping its z-order position. Unknown
    /// items are added.
    pub fn update_bounding_rect(&mut self, item: ItemId, rect: BoundingRect) -> Result<()> {
        match self.rects.get_mut(&item) {
            Some(existing) if existing.kind == rect.kind => {
                *existing = rect;
                Ok(())
            }
            _ => {
                self.remove_bounding_rect(item);
                self.add_bounding_rect(item, rect)
            }
        }
    }

    /// Move an item to the front of its list
    pub fn set_top_z_order(&mut self, item: ItemId) -> bool {
        for list in [&mut self.z_order, &mut self.comment_z_order] {
            if let Some(index) = list.iter().position(|i| *i == item) {
                let id = list.remove(index);
                list.insert(0, id);
                return true;
            }
        }
        false
    }

    /// Geometry of an item
    pub fn bounding_rect(&self, item: ItemId) -> Option<&BoundingRect> {
        self.rects.get(&item)
    }

    /// Whether the item is indexed
    pub fn contains(&self, item: ItemId) -> bool {
        self.rects.contains_key(&item)
    }

    /// Number of indexed items
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.rects.clear();
        self.z_order.clear();
        self.comment_z_order.clear();
    }

    /// All items, front first
    pub fn z_ordered(&self) -> impl DoubleEndedIterator<Item = ItemId> + '_ {
        self.z_order.iter().chain(self.comment_z_order.iter()).copied()
    }

    /// Front-most item at a scene point
    pub fn hit_test(&self, p: Point) -> Option<HitResult> {
        self.z_ordered().find_map(|item| {
            let rect = self.rects.get(&item)?;
            if !rect.rect.contains(p) {
                return None;
            }
            let local = p - rect.origin;
            match &rect.shape {
                HitShape::Curve(curve) => (curve.distance_to(p, CURVE_SAMPLES) <= self.tolerance).then(|| HitResult {
                    item,
                    kind: rect.kind,
                    local,
                    component: None,
                }),
                HitShape::Rect => Some(HitResult {
                    item,
                    kind: rect.kind,
                    local,
                    component: rect
                        .components
                        .iter()
                        .find(|(_, r)| r.contains(local))
                        .map(|(name, _)| name.clone()),
                }),
            }
        })
    }

    fn matches(kind: ItemKind, include: Option<ItemKind>, exclude: Option<ItemKind>) -> bool {
        include.map_or(true, |k| k == kind) && exclude != Some(kind)
    }

    /// Items whose bounds intersect `area`, front first unless `ascending`
    pub fn items_overlapping(
        &self,
        area: Rect,
        include: Option<ItemKind>,
        exclude: Option<ItemKind>,
        ascending: bool,
    ) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self
            .z_ordered()
            .filter(|item| {
                self.rects.get(item).is_some_and(|r| {
                    Self::matches(r.kind, include, exclude) && r.rect.intersects(&area)
                })
            })
            .collect();
        if ascending {
            items.reverse();
        }
        items
    }

    /// Items whose bounds lie entirely inside `area`, front first
    pub fn items_inside(&self, area: Rect, include: Option<ItemKind>) -> Vec<ItemId> {
        self.z_ordered()
            .filter(|item| {
                self.rects
                    .get(item)
                    .is_some_and(|r| Self::matches(r.kind, include, None) && area.contains_rect(&r.rect))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f64, y: f64) -> BoundingRect {
        BoundingRect::node(
            ItemKind::Node,
            Rect::new(x, y, 100.0, 50.0),
            Point::new(x, y),
            vec![("in".to_string(), Rect::new(0.0, 0.0, 10.0, 10.0))],
        )
    }

    fn comment(x: f64, y: f64) -> BoundingRect {
        BoundingRect::node(ItemKind::Comment, Rect::new(x, y, 300.0, 300.0), Point::new(x, y), Vec::new())
    }

    #[test]
    fn test_latest_node_is_in_front() {
        let mut index = CollisionDetector::new(5.0);
        index.add_bounding_rect(ItemId::Node(NodeId(1)), node(0.0, 0.0)).unwrap();
        index.add_bounding_rect(ItemId::Node(NodeId(2)), node(50.0, 20.0)).unwrap();

        let hit = index.hit_test(Point::new(60.0, 30.0)).unwrap();
        assert_eq!(hit.item, ItemId::Node(NodeId(2)));
        assert_eq!(hit.local, Point::new(10.0, 10.0));

        index.set_top_z_order(ItemId::Node(NodeId(1)));
        assert_eq!(index.hit_test(Point::new(60.0, 30.0)).unwrap().item, ItemId::Node(NodeId(1)));
    }

    #[test]
    fn test_comments_stay_behind_nodes() {
        let mut index = CollisionDetector::new(5.0);
        index.add_bounding_rect(ItemId::Node(NodeId(1)), node(10.0, 10.0)).unwrap();
        index.add_bounding_rect(ItemId::Node(NodeId(2)), comment(0.0, 0.0)).unwrap();
        index.set_top_z_order(ItemId::Node(NodeId(2)));

        assert_eq!(index.hit_test(Point::new(20.0, 20.0)).unwrap().item, ItemId::Node(NodeId(1)));
        assert_eq!(index.hit_test(Point::new(250.0, 250.0)).unwrap().kind, ItemKind::Comment);
        assert_eq!(index.z_ordered().last(), Some(ItemId::Node(NodeId(2))));
    }

    #[test]
    fn test_component_hit_uses_local_coordinates() {
        let mut index = CollisionDetector::new(5.0);
        index.add_bounding_rect(ItemId::Node(NodeId(1)), node(100.0, 100.0)).unwrap();
        let hit = index.hit_test(Point::new(105.0, 105.0)).unwrap();
        assert_eq!(hit.component.as_deref(), Some("in"));
        assert!(index.hit_test(Point::new(150.0, 130.0)).unwrap().component.is_none());
    }

    #[test]
    fn test_connector_hit_follows_curve() {
        let mut index = CollisionDetector::new(5.0);
        let curve = CubicBezier::connector(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        index
            .add_bounding_rect(ItemId::Connector(ConnectorId(7)), BoundingRect::connector(curve, 5.0))
            .unwrap();

        let on_curve = curve.eval(0.5);
        assert_eq!(index.hit_test(on_curve).unwrap().item, ItemId::Connector(ConnectorId(7)));
        assert!(index.hit_test(Point::new(190.0, 5.0)).is_none());
    }

    #[test]
    fn test_duplicate_is_an_error() {
        let mut index = CollisionDetector::new(5.0);
        index.add_bounding_rect(ItemId::Node(NodeId(1)), node(0.0, 0.0)).unwrap();
        assert!(matches!(
            index.add_bounding_rect(ItemId::Node(NodeId(1)), node(0.0, 0.0)),
            Err(SceneError::DuplicateBoundingRect(_))
        ));
        index.update_bounding_rect(ItemId::Node(NodeId(1)), node(5.0, 5.0)).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_area_queries() {
        let mut index = CollisionDetector::new(5.0);
        index.add_bounding_rect(ItemId::Node(NodeId(1)), node(10.0, 10.0)).unwrap();
        index.add_bounding_rect(ItemId::Node(NodeId(2)), node(500.0, 500.0)).unwrap();
        index.add_bounding_rect(ItemId::Node(NodeId(3)), comment(0.0, 0.0)).unwrap();

        let overlap = index.items_overlapping(Rect::new(0.0, 0.0, 50.0, 50.0), None, None, false);
        assert_eq!(overlap, vec![ItemId::Node(NodeId(1)), ItemId::Node(NodeId(3))]);
        let ascending = index.items_overlapping(Rect::new(0.0, 0.0, 50.0, 50.0), None, None, true);
        assert_eq!(ascending, vec![ItemId::Node(NodeId(3)), ItemId::Node(NodeId(1))]);
        let no_comments = index.items_overlapping(Rect::new(0.0, 0.0, 50.0, 50.0), None, Some(ItemKind::Comment), false);
        assert_eq!(no_comments, vec![ItemId::Node(NodeId(1))]);

        let inside = index.items_inside(Rect::new(0.0, 0.0, 300.0, 300.0), Some(ItemKind::Node));
        assert_eq!(inside, vec![ItemId::Node(NodeId(1))]);
    }
}
