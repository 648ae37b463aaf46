/*
 * Quadtree Module
 *
 * This module defines the QuadTree used as the neighbor index for the flock.
 * It replaces a uniform grid with a region-subdividing tree so dense clusters
 * split into small leaves while empty space stays a single node.
 *
 * Optimized for performance by:
 * - Storing nodes in a flat arena that survives `reset`, so a rebuild every
 *   frame reuses both the node slots and their point buffers
 * - Keeping exact min/max bounds per node so pruning never drops a match
 * - Recursing on the query instead of allocating a traversal stack
 */

use glam::Vec2;

use crate::boid::AgentId;
use crate::error::ConfigError;

pub const DEFAULT_NODE_CAPACITY: usize = 8;
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// A snapshot of one agent copied out of the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    pub position: Vec2,
    pub velocity: Vec2,
    pub agent: AgentId,
}

/// Closed axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn from_center(center: Vec2, half_size: f32) -> Self {
        Self {
            min: center - Vec2::splat(half_size),
            max: center + Vec2::splat(half_size),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    // Never larger than the distance from `p` to any point inside the box
    #[inline]
    fn distance_to(&self, p: Vec2) -> f32 {
        let dx = (self.min.x - p.x).max(p.x - self.max.x).max(0.0);
        let dy = (self.min.y - p.y).max(p.y - self.max.y).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    // Quadrant layout: bit 0 = east, bit 1 = north
    #[inline]
    fn quadrant_of(&self, p: Vec2) -> usize {
        let mid = self.center();
        let east = (p.x >= mid.x) as usize;
        let north = (p.y >= mid.y) as usize;
        (north << 1) | east
    }

    fn quadrant(&self, quadrant: usize) -> Bounds {
        let mid = self.center();
        let (min_x, max_x) = if quadrant & 1 == 1 { (mid.x, self.max.x) } else { (self.min.x, mid.x) };
        let (min_y, max_y) = if quadrant & 2 == 2 { (mid.y, self.max.y) } else { (self.min.y, mid.y) };
        Bounds {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Bounds,
    depth: u32,
    points: Vec<QueryPoint>,
    // Index of the first of four contiguous children
    children: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<Node>,
    live: usize,
    capacity: usize,
    max_depth: u32,
    len: usize,
    dropped: usize,
}

impl QuadTree {
    pub fn new(origin: Vec2, half_size: f32, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroNodeCapacity);
        }

        let mut tree = Self {
            nodes: Vec::new(),
            live: 0,
            capacity,
            max_depth: DEFAULT_MAX_DEPTH,
            len: 0,
            dropped: 0,
        };
        tree.reset(origin, half_size)?;
        Ok(tree)
    }

    /// Caps subdivision. Leaves at this depth accept points past capacity.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Discards every point and subdivision, leaving one empty leaf.
    /// Node slots and their point buffers are kept for reuse.
    pub fn reset(&mut self, origin: Vec2, half_size: f32) -> Result<(), ConfigError> {
        if !(half_size > 0.0) || !half_size.is_finite() {
            return Err(ConfigError::NonPositiveBounds(half_size));
        }
        if !origin.is_finite() {
            return Err(ConfigError::invalid("quadtree origin must be finite"));
        }

        self.live = 0;
        self.len = 0;
        self.dropped = 0;
        self.alloc_node(Bounds::from_center(origin, half_size), 0);
        Ok(())
    }

    /// Adds a point. Positions outside the root region are clamped onto its
    /// border; non-finite positions are dropped. Returns whether it was stored.
    pub fn insert(&mut self, position: Vec2, agent: AgentId, velocity: Vec2) -> bool {
        if !position.is_finite() {
            self.dropped += 1;
            return false;
        }

        let point = QueryPoint {
            position: self.nodes[0].bounds.clamp(position),
            velocity,
            agent,
        };

        let mut idx = 0;
        loop {
            if let Some(first) = self.nodes[idx].children {
                idx = first + self.nodes[idx].bounds.quadrant_of(point.position);
                continue;
            }

            let node = &self.nodes[idx];
            if node.points.len() < self.capacity || node.depth >= self.max_depth {
                self.nodes[idx].points.push(point);
                self.len += 1;
                return true;
            }

            self.subdivide(idx);
        }
    }

    /// Appends every stored point within `radius` of `center` to `out` and
    /// returns how many were appended. A non-positive radius matches nothing.
    pub fn query_radius(&self, center: Vec2, radius: f32, out: &mut Vec<QueryPoint>) -> usize {
        if !(radius > 0.0) || !radius.is_finite() || !center.is_finite() || self.len == 0 {
            return 0;
        }

        let start = out.len();
        self.visit_radius(0, center, radius, out);
        out.len() - start
    }

    /// Appends every stored point inside the closed rectangle `[min, max]`.
    pub fn query_rect(&self, min: Vec2, max: Vec2, out: &mut Vec<QueryPoint>) -> usize {
        if self.len == 0 {
            return 0;
        }

        let area = Bounds { min, max };
        let start = out.len();
        self.visit_rect(0, &area, out);
        out.len() - start
    }

    fn visit_radius(&self, idx: usize, center: Vec2, radius: f32, out: &mut Vec<QueryPoint>) {
        let node = &self.nodes[idx];
        if node.bounds.distance_to(center) > radius {
            return;
        }

        match node.children {
            Some(first) => {
                for child in first..first + 4 {
                    self.visit_radius(child, center, radius, out);
                }
            }
            None => {
                out.extend(
                    node.points
                        .iter()
                        .filter(|p| p.position.distance(center) <= radius),
                );
            }
        }
    }

    fn visit_rect(&self, idx: usize, area: &Bounds, out: &mut Vec<QueryPoint>) {
        let node = &self.nodes[idx];
        if !node.bounds.intersects(area) {
            return;
        }

        match node.children {
            Some(first) => {
                for child in first..first + 4 {
                    self.visit_rect(child, area, out);
                }
            }
            None => out.extend(node.points.iter().filter(|p| area.contains(p.position))),
        }
    }

    fn alloc_node(&mut self, bounds: Bounds, depth: u32) -> usize {
        let idx = self.live;
        if let Some(node) = self.nodes.get_mut(idx) {
            node.bounds = bounds;
            node.depth = depth;
            node.points.clear();
            node.children = None;
        } else {
            self.nodes.push(Node {
                bounds,
                depth,
                points: Vec::with_capacity(self.capacity),
                children: None,
            });
        }
        self.live += 1;
        idx
    }

    fn subdivide(&mut self, idx: usize) {
        let bounds = self.nodes[idx].bounds;
        let depth = self.nodes[idx].depth + 1;

        let first = self.live;
        for quadrant in 0..4 {
            self.alloc_node(bounds.quadrant(quadrant), depth);
        }

        let mut points = std::mem::take(&mut self.nodes[idx].points);
        for point in &points {
            let child = first + bounds.quadrant_of(point.position);
            self.nodes[child].points.push(*point);
        }

        // Hand the emptied buffer back so its allocation survives
        points.clear();
        self.nodes[idx].points = points;
        self.nodes[idx].children = Some(first);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Points rejected by `insert` since the last reset.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn bounds(&self) -> Bounds {
        self.nodes[0].bounds
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn node_count(&self) -> usize {
        self.live
    }

    pub fn depth(&self) -> u32 {
        self.nodes[..self.live].iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Every stored point, leaf by leaf.
    pub fn iter(&self) -> impl Iterator<Item = &QueryPoint> + '_ {
        self.nodes[..self.live]
            .iter()
            .filter(|n| n.children.is_none())
            .flat_map(|n| n.points.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> QuadTree {
        QuadTree::new(Vec2::ZERO, 128.0, 4).expect("valid tree")
    }

    fn ids(points: &[QueryPoint]) -> Vec<u32> {
        let mut ids: Vec<u32> = points.iter().map(|p| p.agent.0).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn reset_rejects_non_positive_half_size() {
        let mut t = tree();
        assert_eq!(t.reset(Vec2::ZERO, 0.0), Err(ConfigError::NonPositiveBounds(0.0)));
        assert_eq!(t.reset(Vec2::ZERO, -5.0), Err(ConfigError::NonPositiveBounds(-5.0)));
        assert!(t.reset(Vec2::ZERO, f32::NAN).is_err());
        assert_eq!(QuadTree::new(Vec2::ZERO, 10.0, 0).unwrap_err(), ConfigError::ZeroNodeCapacity);
    }

    #[test]
    fn three_agent_scenario_returns_only_close_pair() {
        let mut t = tree();
        t.insert(Vec2::new(0.0, 0.0), AgentId(0), Vec2::ZERO);
        t.insert(Vec2::new(5.0, 0.0), AgentId(1), Vec2::ZERO);
        t.insert(Vec2::new(100.0, 100.0), AgentId(2), Vec2::ZERO);

        let mut out = Vec::new();
        let found = t.query_radius(Vec2::ZERO, 20.0, &mut out);
        assert_eq!(found, 2);
        assert_eq!(ids(&out), vec![0, 1]);
    }

    #[test]
    fn subdivides_past_capacity_and_keeps_every_point() {
        let mut t = tree();
        for i in 0..40 {
            let p = Vec2::new((i % 8) as f32 * 20.0 - 70.0, (i / 8) as f32 * 20.0 - 40.0);
            assert!(t.insert(p, AgentId(i), Vec2::ZERO));
        }
        assert_eq!(t.len(), 40);
        assert!(t.node_count() > 1);
        assert_eq!(t.iter().count(), 40);

        let mut out = Vec::new();
        t.query_radius(Vec2::ZERO, 1000.0, &mut out);
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn leaves_respect_capacity_below_max_depth() {
        let mut t = tree();
        for i in 0..200 {
            let p = Vec2::new((i as f32 * 7.3) % 250.0 - 125.0, (i as f32 * 3.1) % 250.0 - 125.0);
            t.insert(p, AgentId(i), Vec2::ZERO);
        }
        for node in &t.nodes[..t.live] {
            if node.children.is_none() && node.depth < t.max_depth {
                assert!(node.points.len() <= t.capacity);
            }
            if node.children.is_some() {
                assert!(node.points.is_empty());
            }
            for p in &node.points {
                assert!(node.bounds.contains(p.position));
            }
        }
    }

    #[test]
    fn out_of_bounds_points_are_clamped() {
        let mut t = tree();
        assert!(t.insert(Vec2::new(500.0, -900.0), AgentId(7), Vec2::X));
        let stored: Vec<_> = t.iter().copied().collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].position, Vec2::new(128.0, -128.0));
        assert_eq!(stored[0].velocity, Vec2::X);
    }

    #[test]
    fn non_finite_points_are_dropped() {
        let mut t = tree();
        assert!(!t.insert(Vec2::new(f32::NAN, 0.0), AgentId(0), Vec2::ZERO));
        assert_eq!(t.len(), 0);
        assert_eq!(t.dropped(), 1);
    }

    #[test]
    fn degenerate_radius_returns_nothing() {
        let mut t = tree();
        t.insert(Vec2::ZERO, AgentId(0), Vec2::ZERO);
        let mut out = Vec::new();
        assert_eq!(t.query_radius(Vec2::ZERO, 0.0, &mut out), 0);
        assert_eq!(t.query_radius(Vec2::ZERO, -1.0, &mut out), 0);
        assert_eq!(t.query_radius(Vec2::ZERO, f32::NAN, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn coincident_points_stop_at_max_depth() {
        let mut t = QuadTree::new(Vec2::ZERO, 64.0, 2).expect("valid").with_max_depth(5);
        for i in 0..50 {
            t.insert(Vec2::new(3.0, 3.0), AgentId(i), Vec2::ZERO);
        }
        assert_eq!(t.len(), 50);
        assert_eq!(t.depth(), 5);
        let mut out = Vec::new();
        assert_eq!(t.query_radius(Vec2::new(3.0, 3.0), 0.5, &mut out), 50);
    }

    #[test]
    fn reset_reuses_node_storage() {
        let mut t = tree();
        for i in 0..100 {
            t.insert(Vec2::new(i as f32 - 50.0, (i * 2) as f32 - 100.0), AgentId(i), Vec2::ZERO);
        }
        let slots = t.nodes.len();
        assert!(slots > 1);

        t.reset(Vec2::ZERO, 128.0).expect("valid reset");
        assert!(t.is_empty());
        assert_eq!(t.node_count(), 1);
        assert_eq!(t.nodes.len(), slots);

        let mut out = Vec::new();
        assert_eq!(t.query_radius(Vec2::ZERO, 1000.0, &mut out), 0);
    }

    #[test]
    fn query_rect_filters_by_area() {
        let mut t = tree();
        t.insert(Vec2::new(-10.0, -10.0), AgentId(0), Vec2::ZERO);
        t.insert(Vec2::new(10.0, 10.0), AgentId(1), Vec2::ZERO);
        t.insert(Vec2::new(60.0, 60.0), AgentId(2), Vec2::ZERO);

        let mut out = Vec::new();
        t.query_rect(Vec2::new(-20.0, -20.0), Vec2::new(20.0, 20.0), &mut out);
        assert_eq!(ids(&out), vec![0, 1]);
    }
}
