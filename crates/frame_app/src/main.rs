//! # frame_app: frame driver
//!
//! Populates a world of players and the tanks chasing them, then runs the
//! fixed-timestep frame loop on a work-stealing executor.
//!
//! ## Startup Sequence
//!
//! 1. Load the executor configuration (`--config`, or one worker per core).
//! 2. Register the demo component systems.
//! 3. Spawn `--players` players with `--tanks` tanks each.
//! 4. Run `--frames` frames.

use std::f32::consts::TAU;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use tracing::info;
use tracing_subscriber::EnvFilter;

use components::{FacePlayer, MoveForward, PlayerData, Transform};
use frame_app::{TickConfig, TickLoop, World};
use frame_sched::{ExecutorConfig, HazardMode, WorkStealingExecutor};
use frame_system::SystemRegistry;

#[derive(Parser)]
#[command(name = "frame_app", about = "Runs the per-frame job graph over the demo world")]
struct Args {
    /// JSON executor configuration; overrides --workers and --no-steal
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads besides the main thread (default: one per core, minus one)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Keep workers on their own queues
    #[arg(long)]
    no_steal: bool,

    /// Also order writers after earlier readers
    #[arg(long)]
    strict_hazards: bool,

    #[arg(long, default_value_t = 100)]
    players: usize,

    /// Tanks spawned per player
    #[arg(long, default_value_t = 100)]
    tanks: usize,

    /// Frames to run (0 = until game over)
    #[arg(short, long, default_value_t = 100)]
    frames: u64,

    /// Target frames per second
    #[arg(long, default_value_t = 30.0, value_parser = parse_tick_rate)]
    tick_rate: f64,
}

fn parse_tick_rate(arg: &str) -> Result<f64, String> {
    let tick_rate: f64 = arg.parse().map_err(|err| format!("{err}"))?;
    TickConfig {
        tick_rate,
        ..TickConfig::default()
    }
    .tick_duration()
    .map_err(|err| err.to_string())?;
    Ok(tick_rate)
}

impl Args {
    fn executor_config(&self) -> Result<ExecutorConfig> {
        let mut config = match &self.config {
            Some(path) => ExecutorConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => {
                let mut config =
                    self.workers.map_or_else(ExecutorConfig::default, ExecutorConfig::uniform);
                for worker in &mut config.workers {
                    worker.enable_work_stealing = !self.no_steal;
                }
                config
            }
        };
        if self.strict_hazards {
            config = config.with_hazard_mode(HazardMode::ReadersAndWriter);
        }
        Ok(config)
    }
}

fn populate(world: &mut World, players: usize, tanks: usize) -> Result<()> {
    for p in 0..players {
        let player = world.spawn()?;
        let angle = TAU * p as f32 / players.max(1) as f32;
        world.attach_with(player, Transform::from_position(Vec2::from_angle(angle) * 50.0))?;
        world.attach_with(
            player,
            PlayerData {
                name: format!("player-{p}"),
                ..PlayerData::default()
            },
        )?;

        for t in 0..tanks {
            let tank = world.spawn()?;
            let offset = Vec2::new((t % 10) as f32, (t / 10) as f32);
            world.attach_with(tank, Transform::from_position(offset))?;
            world.attach_with(
                tank,
                MoveForward {
                    speed: 1.0 + (t % 5) as f32,
                    ..MoveForward::default()
                },
            )?;
            world.attach_with(tank, FacePlayer::chasing(player))?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("frame_app=info".parse()?))
        .init();

    let args = Args::parse();
    let executor = WorkStealingExecutor::new(args.executor_config()?);

    let mut registry = SystemRegistry::new();
    components::register_all(&mut registry)?;
    let mut world = World::with_registry(registry);
    populate(&mut world, args.players, args.tanks)?;
    info!(
        entities = world.entity_count(),
        systems = world.registry().len(),
        workers = executor.worker_count(),
        "world populated"
    );

    let config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.frames,
        ..TickConfig::default()
    };
    let mut tick_loop = TickLoop::new(config, world, executor);
    let frames = tick_loop.run()?;

    let travelled: f32 = tick_loop
        .world()
        .registry()
        .read::<MoveForward>()
        .map(|store| store.iter_slots().map(|(_, m)| m.distance).sum())
        .unwrap_or_default();
    info!(frames, travelled, "frame driver shut down");
    Ok(())
}
