/*
 * Boid Module
 *
 * This module defines the Agent record and its per-frame motion integration.
 * Each agent is steered by a weighted blend of four rules (see steering.rs):
 * 1. Seek/Flee: Move toward or away from the host's target point
 * 2. Separation: Avoid crowding neighbors
 * 3. Alignment: Steer towards the average heading of neighbors
 * 4. Cohesion: Steer towards the average position of neighbors
 */

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::quadtree::Bounds;

/// Stable handle of an agent. Equal to its index in the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happens to agents that leave the world bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    /// Agents roam freely; the index clamps them onto its border.
    #[default]
    Open,
    /// Agents re-enter from the opposite edge.
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec2,
    pub velocity: Vec2,
    // Per-frame scratch, overwritten by every `integrate`
    pub acceleration: Vec2,
    pub drag: f32,
    pub max_speed: f32,
    pub heading: f32,
}

impl Agent {
    pub fn new(id: AgentId, position: Vec2, drag: f32, max_speed: f32) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            drag,
            max_speed,
            heading: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self.heading = velocity.y.atan2(velocity.x);
        self
    }

    /// Advances one frame. Acceleration is scaled by `dt` so the flock moves
    /// the same at any frame rate; velocity is then clamped, damped by drag
    /// and added to the position.
    pub fn integrate(&mut self, steering: Vec2, speed_multiplier: f32, dt: f32) {
        self.acceleration = steering * speed_multiplier;

        // Update velocity
        self.velocity += self.acceleration * dt;

        // Limit speed
        if self.velocity.length() > self.max_speed {
            self.velocity = self.velocity.normalize_or_zero() * self.max_speed;
        }

        // Apply drag
        self.velocity *= self.drag;

        // Update position
        self.position += self.velocity;

        self.heading = self.velocity.y.atan2(self.velocity.x);
    }

    // Wrap the agent around the world edges
    pub fn wrap_edges(&mut self, bounds: Bounds) {
        if self.position.x > bounds.max.x {
            self.position.x = bounds.min.x;
        } else if self.position.x < bounds.min.x {
            self.position.x = bounds.max.x;
        }

        if self.position.y > bounds.max.y {
            self.position.y = bounds.min.y;
        } else if self.position.y < bounds.min.y {
            self.position.y = bounds.max.y;
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn integrate_scales_by_delta_time() {
        let mut agent = Agent::new(AgentId(0), Vec2::ZERO, 1.0, 100.0);
        agent.integrate(Vec2::X, 10.0, 0.5);
        assert_relative_eq!(agent.velocity.x, 5.0);
        assert_relative_eq!(agent.position.x, 5.0);
        assert_eq!(agent.acceleration, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn integrate_clamps_then_applies_drag() {
        let mut agent = Agent::new(AgentId(0), Vec2::ZERO, 0.5, 4.0);
        agent.integrate(Vec2::new(3.0, 4.0), 10.0, 1.0);
        assert_relative_eq!(agent.speed(), 2.0, epsilon = 1e-5);
        assert_relative_eq!(agent.heading, 4.0_f32.atan2(3.0), epsilon = 1e-6);
    }

    #[test]
    fn zero_velocity_keeps_zero_heading() {
        let mut agent = Agent::new(AgentId(0), Vec2::new(1.0, 1.0), 0.9, 10.0);
        agent.integrate(Vec2::ZERO, 100.0, 1.0);
        assert_eq!(agent.velocity, Vec2::ZERO);
        assert_eq!(agent.position, Vec2::new(1.0, 1.0));
        assert_eq!(agent.heading, 0.0);
    }

    #[test]
    fn wrap_edges_moves_to_opposite_side() {
        let bounds = Bounds::from_center(Vec2::ZERO, 10.0);
        let mut agent = Agent::new(AgentId(0), Vec2::new(12.0, -11.0), 1.0, 1.0);
        agent.wrap_edges(bounds);
        assert_eq!(agent.position, Vec2::new(-10.0, 10.0));
    }
}
