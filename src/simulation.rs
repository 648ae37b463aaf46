/*
 * Simulation Module
 *
 * The controller that owns the flock for the whole run: the population, the
 * double-buffered quadtree and the scheduler. Hosts call `step` once per
 * frame with a target point and a delta time.
 *
 * Frame protocol:
 * 1. "current" holds last frame's final positions, "next" is empty
 * 2. Workers update agents from "current"
 * 3. The coordinator fills "next" with the new positions
 * 4. The buffers swap and the new "next" is reset
 */

use glam::Vec2;
use tracing::info;

use crate::boid::Agent;
use crate::double_buffer::DoubleBuffer;
use crate::error::{ConfigError, SimError};
use crate::params::SimulationParams;
use crate::population::AgentPopulation;
use crate::quadtree::QuadTree;
use crate::scheduler::{FrameStats, ParallelUpdateScheduler};

pub struct Simulation {
    params: SimulationParams,
    population: AgentPopulation,
    buffers: DoubleBuffer<QuadTree>,
    scheduler: ParallelUpdateScheduler,
    last_stats: Option<FrameStats>,
}

impl Simulation {
    /// Builds a simulation with a freshly spawned population.
    pub fn new(params: SimulationParams) -> Result<Self, SimError> {
        let population = AgentPopulation::spawn(&params)?;
        Self::with_population(params, population)
    }

    /// Builds a simulation around host-provided agents. `params.num_agents`
    /// is overwritten with the population size.
    pub fn with_population(mut params: SimulationParams, population: AgentPopulation) -> Result<Self, SimError> {
        params.num_agents = population.len();
        params.validate()?;

        let index = || -> Result<QuadTree, ConfigError> {
            Ok(QuadTree::new(params.world_center, params.world_half_size, params.node_capacity)?
                .with_max_depth(params.max_depth))
        };
        let buffers = DoubleBuffer::new(index()?, index()?);
        let scheduler = ParallelUpdateScheduler::new(&params)?;

        let mut sim = Self {
            params,
            population,
            buffers,
            scheduler,
            last_stats: None,
        };
        sim.rebuild_index()?;

        info!(
            agents = sim.population.len(),
            workers = sim.scheduler.worker_count(),
            half_size = sim.params.world_half_size,
            "simulation ready"
        );
        Ok(sim)
    }

    /// Runs one frame across the worker pool.
    pub fn step(&mut self, target: Vec2, dt: f32) -> Result<FrameStats, SimError> {
        let (current, next) = self.buffers.split_mut();
        let stats = self
            .scheduler
            .run_frame(self.population.as_mut_slice(), current, next, target, dt)?;
        self.finish_frame(stats)
    }

    /// Runs one frame on the calling thread only.
    pub fn step_serial(&mut self, target: Vec2, dt: f32) -> Result<FrameStats, SimError> {
        let (current, next) = self.buffers.split_mut();
        let stats = self
            .scheduler
            .run_frame_serial(self.population.as_mut_slice(), current, next, target, dt)?;
        self.finish_frame(stats)
    }

    fn finish_frame(&mut self, stats: FrameStats) -> Result<FrameStats, SimError> {
        self.buffers.swap();
        self.reset_next()?;
        self.last_stats = Some(stats.clone());
        Ok(stats)
    }

    fn reset_next(&mut self) -> Result<(), ConfigError> {
        self.buffers
            .next_mut()
            .reset(self.params.world_center, self.params.world_half_size)
    }

    /// Re-indexes the population as it is now. Call after editing agents
    /// through `population_mut` so neighbors see the edits next frame.
    pub fn rebuild_index(&mut self) -> Result<(), SimError> {
        self.reset_next()?;
        let next = self.buffers.next_mut();
        for agent in self.population.iter() {
            next.insert(agent.position, agent.id, agent.velocity);
        }
        self.buffers.swap();
        self.reset_next()?;
        Ok(())
    }

    /// Applies new tuning between frames. Population size, world bounds and
    /// node capacity cannot change on a live simulation.
    pub fn retune(&mut self, params: SimulationParams) -> Result<(), SimError> {
        let params = SimulationParams {
            num_agents: self.params.num_agents,
            world_center: self.params.world_center,
            world_half_size: self.params.world_half_size,
            node_capacity: self.params.node_capacity,
            max_depth: self.params.max_depth,
            ..params
        };
        params.validate()?;

        self.scheduler.retune(&params)?;
        if params.drag != self.params.drag || params.max_speed != self.params.max_speed {
            self.population.set_motion_limits(params.drag, params.max_speed);
        }
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn population(&self) -> &AgentPopulation {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut AgentPopulation {
        &mut self.population
    }

    pub fn agents(&self) -> &[Agent] {
        self.population.as_slice()
    }

    /// The index built at the end of the last frame.
    pub fn index(&self) -> &QuadTree {
        self.buffers.current()
    }

    pub fn scheduler(&self) -> &ParallelUpdateScheduler {
        &self.scheduler
    }

    pub fn frame(&self) -> u64 {
        self.scheduler.frames_run()
    }

    pub fn last_stats(&self) -> Option<&FrameStats> {
        self.last_stats.as_ref()
    }
}
