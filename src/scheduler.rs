/*
 * Scheduler Module
 *
 * This module runs one frame of the flock across a fixed pool of workers.
 * The population is cut into contiguous partitions, one per worker. Each
 * worker reads the shared "current" index and writes only its own agents,
 * so the parallel phase needs no locks. Once every worker has joined, the
 * coordinating thread inserts all agents into the "next" index on its own.
 *
 * Optimized for performance by:
 * - Reusing one rayon pool for the whole run instead of spawning per frame
 * - One index query per agent at the largest radius, classified afterwards
 * - A per-partition candidate buffer that is cleared, not reallocated
 */

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::boid::{Agent, EdgeMode};
use crate::error::{ConfigError, SimError};
use crate::params::SimulationParams;
use crate::quadtree::{Bounds, QuadTree, QueryPoint};
use crate::steering::SteeringModel;

/// What to do when a partition fails. The failed frame is always rolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return `SimError::PartitionFailure` to the caller.
    #[default]
    Abort,
    /// Re-run the whole frame on the coordinating thread.
    SerialFallback,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub agents: usize,
    pub partitions: usize,
    // Partitions that hit the frame deadline before starting
    pub skipped_partitions: usize,
    // Index points examined across all agents
    pub neighbors_visited: usize,
    pub dropped_points: usize,
    pub fallback_used: bool,
    pub elapsed: Duration,
}

/// Splits `0..len` into at most `workers` contiguous ranges of `len / workers`
/// agents each, the last range absorbing the remainder. Never returns an
/// empty range.
pub fn partition_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let count = workers.min(len);
    if count == 0 {
        return Vec::new();
    }

    let size = len / count;
    (0..count)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == count { len } else { start + size };
            start..end
        })
        .collect()
}

// Carves `agents` into one exclusive slice per range
fn split_partitions<'a>(
    mut agents: &'a mut [Agent],
    ranges: &[Range<usize>],
) -> Vec<(Range<usize>, &'a mut [Agent])> {
    let mut slices = Vec::with_capacity(ranges.len());
    for range in ranges {
        let (head, tail) = agents.split_at_mut(range.len());
        slices.push((range.clone(), head));
        agents = tail;
    }
    slices
}

// Everything a worker reads during a frame
struct FrameContext<'a> {
    index: &'a QuadTree,
    model: SteeringModel,
    target: Vec2,
    dt: f32,
    speed_multiplier: f32,
    edge_mode: EdgeMode,
    bounds: Bounds,
}

enum PartitionOutcome {
    Completed { visited: usize },
    Skipped,
    Failed { partition: usize, range: Range<usize>, reason: String },
}

// Updates every agent of one partition. Returns the number of index points visited.
fn update_partition(agents: &mut [Agent], ctx: &FrameContext<'_>) -> Result<usize, String> {
    let radius = ctx.model.radii.max();
    let mut candidates: Vec<QueryPoint> = Vec::with_capacity(64);
    let mut visited = 0;

    for agent in agents.iter_mut() {
        candidates.clear();
        visited += ctx.index.query_radius(agent.position, radius, &mut candidates);

        let steering = ctx.model.steer(agent, ctx.target, &candidates);
        agent.integrate(steering, ctx.speed_multiplier, ctx.dt);

        if ctx.edge_mode == EdgeMode::Wrap {
            agent.wrap_edges(ctx.bounds);
        }

        if !agent.is_finite() {
            return Err(format!("agent {} produced a non-finite state", agent.id));
        }
    }

    Ok(visited)
}

// Runs one partition, turning a panic into a failure
fn run_guarded(
    partition: usize,
    range: Range<usize>,
    agents: &mut [Agent],
    ctx: &FrameContext<'_>,
) -> PartitionOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| update_partition(agents, ctx))) {
        Ok(Ok(visited)) => PartitionOutcome::Completed { visited },
        Ok(Err(reason)) => PartitionOutcome::Failed { partition, range, reason },
        Err(payload) => PartitionOutcome::Failed {
            partition,
            range,
            reason: panic_message(payload.as_ref()),
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("worker panicked: {msg}")
    } else {
        "worker panicked".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Parallel,
    Serial,
}

pub struct ParallelUpdateScheduler {
    worker_count: usize,
    pool: rayon::ThreadPool,
    model: SteeringModel,
    speed_multiplier: f32,
    edge_mode: EdgeMode,
    failure_policy: FailurePolicy,
    deadline: Option<Duration>,
    // Pre-frame copy of the agents, restored when a frame fails
    rollback: Vec<Agent>,
    frame: u64,
}

impl ParallelUpdateScheduler {
    pub fn new(params: &SimulationParams) -> Result<Self, SimError> {
        let pool = build_pool(params.worker_count)?;
        Ok(Self {
            worker_count: params.worker_count,
            pool,
            model: params.steering_model(),
            speed_multiplier: params.speed_multiplier,
            edge_mode: params.edge_mode,
            failure_policy: params.failure_policy,
            deadline: params.frame_deadline(),
            rollback: Vec::new(),
            frame: 0,
        })
    }

    /// Fixes the number of workers, rebuilding the pool if it changed.
    pub fn configure(&mut self, worker_count: usize) -> Result<(), SimError> {
        if worker_count == self.worker_count {
            return Ok(());
        }
        self.pool = build_pool(worker_count)?;
        self.worker_count = worker_count;
        debug!(worker_count, "worker pool rebuilt");
        Ok(())
    }

    /// Copies the tunable settings out of `params`.
    pub fn retune(&mut self, params: &SimulationParams) -> Result<(), SimError> {
        self.configure(params.worker_count)?;
        self.model = params.steering_model();
        self.speed_multiplier = params.speed_multiplier;
        self.edge_mode = params.edge_mode;
        self.failure_policy = params.failure_policy;
        self.deadline = params.frame_deadline();
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn partitions(&self, len: usize) -> Vec<Range<usize>> {
        partition_ranges(len, self.worker_count)
    }

    pub fn steering(&self) -> &SteeringModel {
        &self.model
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.failure_policy = policy;
    }

    pub fn set_deadline(&mut self, deadline: Option<Duration>) {
        self.deadline = deadline;
    }

    pub fn frames_run(&self) -> u64 {
        self.frame
    }

    /// Updates every agent in parallel from `current`, then inserts them all
    /// into `next`. On failure the agents are restored and `next` is untouched.
    pub fn run_frame(
        &mut self,
        agents: &mut [Agent],
        current: &QuadTree,
        next: &mut QuadTree,
        target: Vec2,
        dt: f32,
    ) -> Result<FrameStats, SimError> {
        self.execute(agents, current, next, target, dt, Dispatch::Parallel)
    }

    /// Same frame on the calling thread only, as a single partition.
    pub fn run_frame_serial(
        &mut self,
        agents: &mut [Agent],
        current: &QuadTree,
        next: &mut QuadTree,
        target: Vec2,
        dt: f32,
    ) -> Result<FrameStats, SimError> {
        self.execute(agents, current, next, target, dt, Dispatch::Serial)
    }

    fn execute(
        &mut self,
        agents: &mut [Agent],
        current: &QuadTree,
        next: &mut QuadTree,
        target: Vec2,
        dt: f32,
        dispatch: Dispatch,
    ) -> Result<FrameStats, SimError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimError::InvalidDeltaTime(dt));
        }
        if !target.is_finite() {
            return Err(ConfigError::invalid("target point must be finite").into());
        }

        let started = Instant::now();
        let ctx = FrameContext {
            index: current,
            model: self.model,
            target,
            dt,
            speed_multiplier: self.speed_multiplier,
            edge_mode: self.edge_mode,
            bounds: current.bounds(),
        };

        self.rollback.clear();
        self.rollback.extend_from_slice(agents);

        let ranges = match dispatch {
            Dispatch::Parallel => partition_ranges(agents.len(), self.worker_count),
            Dispatch::Serial => partition_ranges(agents.len(), 1),
        };
        let outcomes = match dispatch {
            Dispatch::Parallel => {
                let deadline = self.deadline.map(|d| started + d);
                self.dispatch_parallel(agents, &ranges, &ctx, deadline)
            }
            Dispatch::Serial => vec![run_guarded(0, 0..agents.len(), agents, &ctx)],
        };

        let mut stats = FrameStats {
            frame: self.frame,
            agents: agents.len(),
            partitions: ranges.len(),
            ..FrameStats::default()
        };

        match tally(&outcomes, &mut stats) {
            None => {}
            Some(failure) => {
                agents.copy_from_slice(&self.rollback);
                error!(frame = self.frame, error = %failure, "partition failed, frame rolled back");

                if self.failure_policy == FailurePolicy::Abort || dispatch == Dispatch::Serial {
                    return Err(failure);
                }

                warn!(frame = self.frame, "re-running frame on the coordinating thread");
                stats = FrameStats {
                    frame: self.frame,
                    agents: agents.len(),
                    partitions: 1,
                    fallback_used: true,
                    ..FrameStats::default()
                };
                let outcome = [run_guarded(0, 0..agents.len(), agents, &ctx)];
                if let Some(failure) = tally(&outcome, &mut stats) {
                    agents.copy_from_slice(&self.rollback);
                    error!(frame = self.frame, error = %failure, "serial fallback failed");
                    return Err(failure);
                }
            }
        }

        if stats.skipped_partitions > 0 {
            warn!(
                frame = self.frame,
                skipped = stats.skipped_partitions,
                "frame deadline expired, skipped partitions hold position"
            );
        }

        // Single writer: only this thread ever inserts into `next`
        debug_assert!(next.is_empty(), "next index must be reset before a frame");
        for agent in agents.iter() {
            if !next.insert(agent.position, agent.id, agent.velocity) {
                stats.dropped_points += 1;
            }
        }

        stats.elapsed = started.elapsed();
        debug!(
            frame = stats.frame,
            agents = stats.agents,
            partitions = stats.partitions,
            visited = stats.neighbors_visited,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "frame complete"
        );

        self.frame += 1;
        Ok(stats)
    }

    fn dispatch_parallel(
        &self,
        agents: &mut [Agent],
        ranges: &[Range<usize>],
        ctx: &FrameContext<'_>,
        deadline: Option<Instant>,
    ) -> Vec<PartitionOutcome> {
        let slices = split_partitions(agents, ranges);

        self.pool.install(|| {
            slices
                .into_par_iter()
                .enumerate()
                .map(|(partition, (range, slice))| {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return PartitionOutcome::Skipped;
                    }
                    run_guarded(partition, range, slice, ctx)
                })
                .collect()
        })
    }
}

// Folds outcomes into `stats`, returning the first failure if any
fn tally(outcomes: &[PartitionOutcome], stats: &mut FrameStats) -> Option<SimError> {
    let mut failure = None;
    for outcome in outcomes {
        match outcome {
            PartitionOutcome::Completed { visited } => stats.neighbors_visited += visited,
            PartitionOutcome::Skipped => stats.skipped_partitions += 1,
            PartitionOutcome::Failed { partition, range, reason } => {
                if failure.is_none() {
                    failure = Some(SimError::PartitionFailure {
                        partition: *partition,
                        range: range.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }
    }
    failure
}

fn build_pool(worker_count: usize) -> Result<rayon::ThreadPool, SimError> {
    if worker_count == 0 {
        return Err(ConfigError::ZeroWorkers.into());
    }
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("flock-worker-{i}"))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::AgentId;

    #[test]
    fn partitions_absorb_remainder_in_last_range() {
        assert_eq!(partition_ranges(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(partition_ranges(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
        assert_eq!(partition_ranges(3, 8), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition_ranges(5, 1), vec![0..5]);
        assert!(partition_ranges(0, 4).is_empty());
    }

    #[test]
    fn split_partitions_hands_out_disjoint_slices() {
        let mut agents: Vec<Agent> = (0..7)
            .map(|i| Agent::new(AgentId(i), Vec2::ZERO, 1.0, 1.0))
            .collect();
        let ranges = partition_ranges(agents.len(), 3);
        let slices = split_partitions(&mut agents, &ranges);
        assert_eq!(slices.len(), 3);
        for (range, slice) in &slices {
            assert_eq!(range.len(), slice.len());
            assert_eq!(slice[0].id.index(), range.start);
        }
    }

    #[test]
    fn configure_rejects_zero_workers() {
        let mut scheduler = ParallelUpdateScheduler::new(&SimulationParams {
            worker_count: 2,
            ..SimulationParams::default()
        })
        .expect("pool builds");
        assert!(matches!(scheduler.configure(0), Err(SimError::Config(ConfigError::ZeroWorkers))));
        assert_eq!(scheduler.worker_count(), 2);
        scheduler.configure(3).expect("pool rebuilds");
        assert_eq!(scheduler.partitions(9), vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "worker panicked: boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "worker panicked: bang");
    }
}
