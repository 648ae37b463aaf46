/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that holds every setting
 * of a run. The tuning values can be changed between frames (see
 * `Simulation::retune`); the structural ones (population size, world bounds,
 * node capacity) are fixed once the simulation is built.
 *
 * Parameters deserialize with defaults filled in, so a config file only needs
 * the fields it overrides.
 */

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::boid::EdgeMode;
use crate::error::{ConfigError, SimError};
use crate::quadtree::{DEFAULT_MAX_DEPTH, DEFAULT_NODE_CAPACITY};
use crate::scheduler::FailurePolicy;
use crate::steering::{Radii, SteeringModel, SteeringWeights, TargetMode};
use crate::DEFAULT_WORLD_HALF_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub num_agents: usize,
    pub world_center: Vec2,
    pub world_half_size: f32,
    // Agents spawn uniformly in a square of this half-size around the center
    pub spawn_half_extent: f32,
    pub seed: u64,
    pub worker_count: usize,
    pub radii: Radii,
    pub weights: SteeringWeights,
    pub speed_multiplier: f32,
    pub drag: f32,
    pub max_speed: f32,
    pub node_capacity: usize,
    pub max_depth: u32,
    pub target_mode: TargetMode,
    pub edge_mode: EdgeMode,
    pub failure_policy: FailurePolicy,
    pub frame_deadline_ms: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            num_agents: 10_000,
            world_center: Vec2::ZERO,
            world_half_size: DEFAULT_WORLD_HALF_SIZE,
            spawn_half_extent: 640.0,
            seed: 42,
            worker_count: default_worker_count(),
            radii: Radii::default(),
            weights: SteeringWeights::default(),
            speed_multiplier: 100.0,
            drag: 0.95,
            max_speed: 40.0,
            node_capacity: DEFAULT_NODE_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
            target_mode: TargetMode::Seek,
            edge_mode: EdgeMode::Open,
            failure_policy: FailurePolicy::Abort,
            frame_deadline_ms: None,
        }
    }
}

pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

impl SimulationParams {
    /// Loads a JSON config, falling back to defaults for missing fields.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_agents == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if !(self.world_half_size > 0.0) || !self.world_half_size.is_finite() {
            return Err(ConfigError::NonPositiveBounds(self.world_half_size));
        }
        if !self.world_center.is_finite() {
            return Err(ConfigError::invalid("world center must be finite"));
        }
        if !(self.spawn_half_extent >= 0.0) || !self.spawn_half_extent.is_finite() {
            return Err(ConfigError::invalid(format!(
                "spawn half-extent must be non-negative, got {}",
                self.spawn_half_extent
            )));
        }

        for (name, value) in [
            ("separation", self.radii.separation),
            ("alignment", self.radii.alignment),
            ("cohesion", self.radii.cohesion),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::NonPositiveRadius { name, value });
            }
        }

        if !(self.drag > 0.0 && self.drag <= 1.0) {
            return Err(ConfigError::DragOutOfRange(self.drag));
        }
        if !(self.max_speed >= 0.0) || !self.max_speed.is_finite() {
            return Err(ConfigError::NegativeMaxSpeed(self.max_speed));
        }
        if !self.speed_multiplier.is_finite() {
            return Err(ConfigError::invalid("speed multiplier must be finite"));
        }
        if self.node_capacity == 0 {
            return Err(ConfigError::ZeroNodeCapacity);
        }
        if self.num_agents > u32::MAX as usize {
            return Err(ConfigError::invalid("population exceeds the agent id range"));
        }

        Ok(())
    }

    pub fn steering_model(&self) -> SteeringModel {
        SteeringModel::new(self.radii, self.weights, self.target_mode)
    }

    pub fn frame_deadline(&self) -> Option<Duration> {
        self.frame_deadline_ms.map(Duration::from_millis)
    }

    // Get parameter ranges for UI sliders
    pub fn get_num_agents_range() -> std::ops::RangeInclusive<usize> {
        10..=200_000
    }

    pub fn get_max_speed_range() -> std::ops::RangeInclusive<f32> {
        1.0..=100.0
    }

    pub fn get_weight_range() -> std::ops::RangeInclusive<f32> {
        0.0..=3.0
    }

    pub fn get_radius_range() -> std::ops::RangeInclusive<f32> {
        1.0..=100.0
    }

    pub fn get_speed_multiplier_range() -> std::ops::RangeInclusive<f32> {
        1.0..=500.0
    }

    pub fn get_drag_range() -> std::ops::RangeInclusive<f32> {
        0.5..=1.0
    }

    pub fn get_worker_count_range() -> std::ops::RangeInclusive<usize> {
        1..=64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_reference_tuning() {
        let params = SimulationParams::default();
        params.validate().expect("defaults validate");
        assert_eq!(params.radii.separation, 10.0);
        assert_eq!(params.radii.alignment, 15.0);
        assert_eq!(params.radii.cohesion, 20.0);
        assert_eq!(params.weights.target, 0.3);
        assert_eq!(params.weights.separation, 1.0);
        assert_eq!(params.weights.alignment, 0.3);
        assert_eq!(params.weights.cohesion, 0.15);
        assert_eq!(params.speed_multiplier, 100.0);
        assert_eq!(params.drag, 0.95);
    }

    #[test]
    fn validate_rejects_each_bad_field() {
        let base = SimulationParams::default();

        let cases: Vec<(SimulationParams, ConfigError)> = vec![
            (SimulationParams { num_agents: 0, ..base.clone() }, ConfigError::EmptyPopulation),
            (SimulationParams { worker_count: 0, ..base.clone() }, ConfigError::ZeroWorkers),
            (
                SimulationParams { world_half_size: 0.0, ..base.clone() },
                ConfigError::NonPositiveBounds(0.0),
            ),
            (
                SimulationParams { world_half_size: -3.0, ..base.clone() },
                ConfigError::NonPositiveBounds(-3.0),
            ),
            (
                SimulationParams {
                    radii: Radii { alignment: 0.0, ..Radii::default() },
                    ..base.clone()
                },
                ConfigError::NonPositiveRadius { name: "alignment", value: 0.0 },
            ),
            (SimulationParams { drag: 0.0, ..base.clone() }, ConfigError::DragOutOfRange(0.0)),
            (SimulationParams { drag: 1.5, ..base.clone() }, ConfigError::DragOutOfRange(1.5)),
            (SimulationParams { max_speed: -1.0, ..base.clone() }, ConfigError::NegativeMaxSpeed(-1.0)),
            (SimulationParams { node_capacity: 0, ..base.clone() }, ConfigError::ZeroNodeCapacity),
        ];

        for (params, expected) in cases {
            assert_eq!(params.validate(), Err(expected));
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params: SimulationParams = serde_json::from_str(
            r#"{ "num_agents": 250, "worker_count": 3, "weights": { "target": 1.0 }, "target_mode": "flee" }"#,
        )
        .expect("valid json");
        assert_eq!(params.num_agents, 250);
        assert_eq!(params.worker_count, 3);
        assert_eq!(params.weights.target, 1.0);
        assert_eq!(params.weights.separation, 1.0);
        assert_eq!(params.target_mode, TargetMode::Flee);
        assert_eq!(params.radii, Radii::default());
        assert_eq!(params.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn from_json_file_validates() {
        let path = std::env::temp_dir().join(format!("flocking-params-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "worker_count": 0 }"#).expect("write temp config");
        let err = SimulationParams::from_json_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, SimError::Config(ConfigError::ZeroWorkers)));
    }
}
