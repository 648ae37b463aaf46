/*
 * Flocking Simulation - Headless Driver
 *
 * Runs the flocking engine without a window. The steering target orbits the
 * world center so the flock keeps moving, and frame timings are logged at a
 * fixed interval. Useful for profiling worker counts and population sizes.
 *
 * Logging honours RUST_LOG; --verbose raises the default level to debug.
 */

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use flocking::{SimError, Simulation, SimulationParams, TargetMode, Vec2};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Headless flocking engine driver
#[derive(Parser, Debug)]
#[command(name = "flocking")]
#[command(about = "Run the flocking engine headless and report frame timings", long_about = None)]
struct Args {
    /// JSON parameter file; the flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of agents
    #[arg(short, long)]
    agents: Option<usize>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Frames to simulate
    #[arg(short, long, default_value = "600")]
    frames: u64,

    /// Frame delta time in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Seed for the spawn positions
    #[arg(short, long)]
    seed: Option<u64>,

    /// Flee from the target instead of seeking it
    #[arg(long)]
    flee: bool,

    /// Run every frame on the main thread only
    #[arg(long)]
    serial: bool,

    /// Log statistics every N frames (0 = only the summary)
    #[arg(long, default_value = "60")]
    stats_every: u64,

    /// Radius of the target's orbit around the world center
    #[arg(long, default_value = "300")]
    orbit: f32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_params(args: &Args) -> Result<SimulationParams, SimError> {
    let mut params = match &args.config {
        Some(path) => {
            info!("Loading parameters from {}", path.display());
            SimulationParams::from_json_file(path)?
        }
        None => SimulationParams::default(),
    };

    if let Some(agents) = args.agents {
        params.num_agents = agents;
    }
    if let Some(workers) = args.workers {
        params.worker_count = workers;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if args.flee {
        params.target_mode = TargetMode::Flee;
    }

    params.validate()?;
    Ok(params)
}

fn run(args: &Args) -> Result<(), SimError> {
    let params = load_params(args)?;
    let mut sim = Simulation::new(params)?;
    let center = sim.params().world_center;

    let mut busy = Duration::ZERO;
    let mut worst = Duration::ZERO;
    let wall = Instant::now();

    for frame in 0..args.frames {
        let angle = frame as f32 * args.dt * 0.5;
        let target = center + Vec2::from_angle(angle) * args.orbit;

        let stats = if args.serial {
            sim.step_serial(target, args.dt)?
        } else {
            sim.step(target, args.dt)?
        };

        busy += stats.elapsed;
        worst = worst.max(stats.elapsed);

        if args.stats_every > 0 && frame % args.stats_every == 0 {
            let index = sim.index();
            info!(
                frame = stats.frame,
                elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0,
                visited = stats.neighbors_visited,
                skipped = stats.skipped_partitions,
                nodes = index.node_count(),
                depth = index.depth(),
                "frame"
            );
        }
    }

    let agents = sim.agents();
    let mean_speed = agents.iter().map(|a| a.speed()).sum::<f32>() / agents.len() as f32;
    let centroid = agents.iter().map(|a| a.position).sum::<Vec2>() / agents.len() as f32;

    info!(
        frames = args.frames,
        agents = agents.len(),
        workers = sim.scheduler().worker_count(),
        mean_frame_ms = busy.as_secs_f64() * 1000.0 / args.frames.max(1) as f64,
        worst_frame_ms = worst.as_secs_f64() * 1000.0,
        wall_s = wall.elapsed().as_secs_f64(),
        mean_speed,
        centroid_x = centroid.x,
        centroid_y = centroid.y,
        "run complete"
    );

    Ok(())
}
