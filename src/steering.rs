/*
 * Steering Module
 *
 * This module contains the flocking rules. Every rule yields a unit vector,
 * or zero when it has nothing to say, and the rules are blended by weight
 * into the acceleration applied to an agent.
 *
 * Optimized for performance by:
 * - Classifying one neighbor query into all three neighborhoods in a single
 *   pass instead of querying once per radius
 * - Accumulating sums only and normalizing once per rule
 */

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::boid::{Agent, AgentId};
use crate::quadtree::QueryPoint;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    #[default]
    Seek,
    Flee,
}

impl TargetMode {
    pub fn toggled(self) -> Self {
        match self {
            TargetMode::Seek => TargetMode::Flee,
            TargetMode::Flee => TargetMode::Seek,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringWeights {
    pub target: f32,
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
}

impl Default for SteeringWeights {
    fn default() -> Self {
        Self {
            target: 0.3,
            separation: 1.0,
            alignment: 0.3,
            cohesion: 0.15,
        }
    }
}

/// Neighborhood radii, nested as separation < alignment < cohesion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Radii {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
}

impl Default for Radii {
    fn default() -> Self {
        Self {
            separation: 10.0,
            alignment: 15.0,
            cohesion: 20.0,
        }
    }
}

impl Radii {
    /// The single radius a worker queries the index at.
    pub fn max(&self) -> f32 {
        self.separation.max(self.alignment).max(self.cohesion)
    }
}

pub fn seek(agent: Vec2, target: Vec2) -> Vec2 {
    (target - agent).normalize_or_zero()
}

pub fn flee(agent: Vec2, target: Vec2) -> Vec2 {
    -seek(agent, target)
}

/// Direction of the mean neighbor velocity.
pub fn alignment(neighbors: &[QueryPoint]) -> Vec2 {
    let sum: Vec2 = neighbors.iter().map(|n| n.velocity).sum();
    mean(sum, neighbors.len()).normalize_or_zero()
}

/// Direction from the agent to the neighbors' center of mass.
pub fn cohesion(agent: Vec2, neighbors: &[QueryPoint]) -> Vec2 {
    if neighbors.is_empty() {
        return Vec2::ZERO;
    }
    let sum: Vec2 = neighbors.iter().map(|n| n.position).sum();
    (mean(sum, neighbors.len()) - agent).normalize_or_zero()
}

/// Direction away from the summed offsets to every neighbor.
pub fn separation(agent: Vec2, neighbors: &[QueryPoint]) -> Vec2 {
    let sum: Vec2 = neighbors.iter().map(|n| agent - n.position).sum();
    sum.normalize_or_zero()
}

#[inline]
fn mean(sum: Vec2, count: usize) -> Vec2 {
    if count == 0 {
        Vec2::ZERO
    } else {
        sum / count as f32
    }
}

/// Running sums for the three neighborhoods of one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Neighborhood {
    pub velocity_sum: Vec2,
    pub alignment_count: usize,
    pub position_sum: Vec2,
    pub cohesion_count: usize,
    pub offset_sum: Vec2,
    pub separation_count: usize,
}

impl Neighborhood {
    /// Sorts `candidates` into the neighborhoods of the agent at `position`.
    /// The agent itself is skipped by id.
    pub fn gather(agent: AgentId, position: Vec2, candidates: &[QueryPoint], radii: &Radii) -> Self {
        let mut hood = Self::default();

        for point in candidates {
            if point.agent == agent {
                continue;
            }

            let distance = point.position.distance(position);
            if distance <= radii.cohesion {
                hood.position_sum += point.position;
                hood.cohesion_count += 1;
            }
            if distance <= radii.alignment {
                hood.velocity_sum += point.velocity;
                hood.alignment_count += 1;
            }
            if distance <= radii.separation {
                hood.offset_sum += position - point.position;
                hood.separation_count += 1;
            }
        }

        hood
    }

    pub fn alignment(&self) -> Vec2 {
        mean(self.velocity_sum, self.alignment_count).normalize_or_zero()
    }

    pub fn cohesion(&self, position: Vec2) -> Vec2 {
        if self.cohesion_count == 0 {
            return Vec2::ZERO;
        }
        (mean(self.position_sum, self.cohesion_count) - position).normalize_or_zero()
    }

    pub fn separation(&self) -> Vec2 {
        self.offset_sum.normalize_or_zero()
    }
}

/// The weighted blend of all rules.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringModel {
    pub radii: Radii,
    pub weights: SteeringWeights,
    pub target_mode: TargetMode,
}

impl SteeringModel {
    pub fn new(radii: Radii, weights: SteeringWeights, target_mode: TargetMode) -> Self {
        Self {
            radii,
            weights,
            target_mode,
        }
    }

    /// Steering for `agent` given every index point near it.
    pub fn steer(&self, agent: &Agent, target: Vec2, candidates: &[QueryPoint]) -> Vec2 {
        let hood = Neighborhood::gather(agent.id, agent.position, candidates, &self.radii);
        self.blend(agent.position, target, &hood)
    }

    pub fn blend(&self, position: Vec2, target: Vec2, hood: &Neighborhood) -> Vec2 {
        let toward = match self.target_mode {
            TargetMode::Seek => seek(position, target),
            TargetMode::Flee => flee(position, target),
        };

        toward * self.weights.target
            + hood.alignment() * self.weights.alignment
            + hood.cohesion(position) * self.weights.cohesion
            + hood.separation() * self.weights.separation
    }
}
