/*
 * Error Module
 *
 * This module defines the error types for the flocking engine.
 * Configuration problems are reported once at setup time, frame problems
 * are reported per call to `Simulation::step`.
 */

use std::ops::Range;

use thiserror::Error;

/// Invalid initialization parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("world half-size must be positive and finite, got {0}")]
    NonPositiveBounds(f32),

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("population size must be at least 1")]
    EmptyPopulation,

    #[error("{name} radius must be positive and finite, got {value}")]
    NonPositiveRadius { name: &'static str, value: f32 },

    #[error("drag must lie in (0, 1], got {0}")]
    DragOutOfRange(f32),

    #[error("max speed must be non-negative and finite, got {0}")]
    NegativeMaxSpeed(f32),

    #[error("node capacity must be at least 1")]
    ZeroNodeCapacity,

    #[error("invalid parameter: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Errors surfaced by the simulation controller.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A worker did not complete its range. The frame was rolled back.
    #[error("partition {partition} ({}..{}) failed: {reason}", range.start, range.end)]
    PartitionFailure {
        partition: usize,
        range: Range<usize>,
        reason: String,
    },

    #[error("delta time must be finite and non-negative, got {0}")]
    InvalidDeltaTime(f32),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_failure_message_names_range() {
        let err = SimError::PartitionFailure {
            partition: 2,
            range: 10..20,
            reason: "worker panicked".into(),
        };
        assert_eq!(err.to_string(), "partition 2 (10..20) failed: worker panicked");
    }

    #[test]
    fn config_error_converts_into_sim_error() {
        let err: SimError = ConfigError::ZeroWorkers.into();
        assert!(matches!(err, SimError::Config(ConfigError::ZeroWorkers)));
    }
}
