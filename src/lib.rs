/*
 * Flocking Engine - Module Definitions
 *
 * This file defines the module structure of the flocking engine. The core
 * (index, steering, scheduler, controller) has no rendering or windowing
 * dependency; the optional `viewer` module is one host built on top of it.
 */

// Re-export key components for easier access
pub use boid::{Agent, AgentId, EdgeMode};
pub use double_buffer::DoubleBuffer;
pub use error::{ConfigError, SimError};
pub use params::SimulationParams;
pub use population::AgentPopulation;
pub use quadtree::{Bounds, QuadTree, QueryPoint};
pub use scheduler::{partition_ranges, FailurePolicy, FrameStats, ParallelUpdateScheduler};
pub use simulation::Simulation;
pub use steering::{Neighborhood, Radii, SteeringModel, SteeringWeights, TargetMode};

pub use glam::Vec2;

// Define modules
pub mod boid;
pub mod double_buffer;
pub mod error;
pub mod params;
pub mod population;
pub mod quadtree;
pub mod scheduler;
pub mod simulation;
pub mod steering;

#[cfg(feature = "viewer")]
pub mod viewer;

// Constants
pub const DEFAULT_WORLD_HALF_SIZE: f32 = 2560.0;
