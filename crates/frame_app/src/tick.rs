//! Fixed-timestep frame loop.
//!
//! Each tick:
//!
//! 1. Build the frame graph from the registered task descriptors.
//! 2. Hand the finished graph to the executor; every job runs its system's
//!    phase over the whole store.
//! 3. Advance the tick counter.
//!
//! A graph that fails to build skips the frame: nothing runs and the counter
//! stays put.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use frame_sched::{DependencyResolutionError, FrameGraphBuilder, FrameReport, WorkStealingExecutor};
use frame_system::FrameContext;

use crate::error::TickError;
use crate::world::World;

/// Configuration for the frame loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = until game over).
    pub max_ticks: u64,
    /// Simulation step handed to tasks, independent of wall-clock time.
    pub dt: f32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            max_ticks: 0,
            dt: FrameContext::DEFAULT_DT,
        }
    }
}

impl TickConfig {
    /// Wall-clock budget of one tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::InvalidTickRate`] unless `tick_rate` is finite,
    /// above zero and large enough for its period to fit a [`Duration`].
    pub fn tick_duration(&self) -> Result<Duration, TickError> {
        let rate = self.tick_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TickError::InvalidTickRate(rate));
        }
        Duration::try_from_secs_f64(rate.recip()).map_err(|_| TickError::InvalidTickRate(rate))
    }
}

#[derive(Debug)]
pub struct TickLoop {
    /// Completed frames.
    tick_id: u64,
    config: TickConfig,
    world: World,
    executor: WorkStealingExecutor,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: TickConfig, world: World, executor: WorkStealingExecutor) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
            executor,
        }
    }

    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Run one frame.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyResolutionError`] if a task declares a dependency
    /// on an unregistered system. No job of the frame runs in that case.
    pub fn tick(&mut self) -> Result<FrameReport, DependencyResolutionError> {
        let registry = self.world.registry();
        let graph = FrameGraphBuilder::new(registry)
            .with_mode(self.executor.config().hazard_mode)
            .build()
            .inspect_err(|err| error!(tick_id = self.tick_id + 1, %err, "frame skipped"))?;

        let ctx = FrameContext {
            is_game_over: self.world.is_game_over(),
            ..FrameContext::new(self.tick_id + 1, self.config.dt)
        };
        let report = self.executor.run(&graph, |job| {
            if let Some(system) = registry.system(job.system) {
                system.run_phase(job.phase, &ctx, registry);
            }
        });

        self.tick_id += 1;
        debug!(
            tick_id = self.tick_id,
            jobs = report.jobs_executed,
            steals = report.steals,
            "tick complete"
        );
        Ok(report)
    }

    /// Run until `max_ticks` frames have completed or the world is over.
    /// Returns the number of frames run.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::InvalidTickRate`] before the first frame if the
    /// configured rate is unusable, and stops at the first frame whose graph
    /// fails to build.
    pub fn run(&mut self) -> Result<u64, TickError> {
        let tick_duration = self.config.tick_duration()?;
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            workers = self.executor.worker_count(),
            "starting frame loop"
        );

        while !self.world.is_game_over() {
            let start = Instant::now();
            self.tick()?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "frame exceeded time budget"
                );
            }
        }

        info!(ticks = tick_count, "frame loop complete");
        Ok(tick_count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    use components::{FacePlayer, MoveForward, Transform};
    use frame_component::{Direction, EntityId, Phase, TaskDescriptor};
    use frame_sched::{ExecutorConfig, HazardMode};
    use frame_system::{Component, SystemRegistry};

    use super::*;

    /// Read-only system that peeks at another store while holding its own.
    macro_rules! peeking_reader {
        ($ty:ident reads $other:ident) => {
            #[derive(Debug, Default)]
            struct $ty {
                peeked: AtomicUsize,
            }

            impl Component for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }
                fn tasks() -> Vec<TaskDescriptor> {
                    vec![
                        TaskDescriptor::for_phase(Phase::Update)
                            .own(Direction::In)
                            .component(Direction::In, stringify!($other)),
                    ]
                }
                fn update_ref(&self, _phase: Phase, _ctx: &FrameContext, systems: &SystemRegistry) {
                    std::thread::sleep(Duration::from_millis(20));
                    let seen = systems.read::<$other>().map_or(0, |store| store.count());
                    self.peeked.fetch_add(seen, Ordering::Relaxed);
                }
            }
        };
    }

    peeking_reader!(Left reads Right);
    peeking_reader!(Right reads Left);
    peeking_reader!(Reader reads Copier);

    /// Writes itself from a read of `Reader`, which reads it back.
    #[derive(Debug, Default)]
    struct Copier {
        copied: usize,
    }

    impl Component for Copier {
        fn type_name() -> &'static str {
            "Copier"
        }
        fn tasks() -> Vec<TaskDescriptor> {
            vec![
                TaskDescriptor::for_phase(Phase::Update)
                    .own(Direction::InOut)
                    .component(Direction::In, "Reader"),
            ]
        }
        fn update(&mut self, _phase: Phase, _ctx: &FrameContext, systems: &SystemRegistry) {
            std::thread::sleep(Duration::from_millis(20));
            self.copied = systems.read::<Reader>().map_or(0, |store| store.count());
        }
    }

    #[derive(Debug, Default)]
    struct Orphan;

    impl Component for Orphan {
        fn type_name() -> &'static str {
            "Orphan"
        }
        fn tasks() -> Vec<TaskDescriptor> {
            vec![
                TaskDescriptor::for_phase(Phase::Update)
                    .own(Direction::InOut)
                    .component(Direction::In, "Missing"),
            ]
        }
    }

    fn demo_loop(workers: usize, max_ticks: u64) -> TickLoop {
        let mut world = World::new();
        components::register_all(world.registry_mut()).unwrap();
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks,
            ..TickConfig::default()
        };
        TickLoop::new(
            config,
            world,
            WorkStealingExecutor::new(ExecutorConfig::uniform(workers)),
        )
    }

    /// Two-thread loop over one entity carrying `A` and `B`.
    fn pair_loop<A: Component, B: Component>(mode: HazardMode) -> (TickLoop, EntityId) {
        let mut world = World::new();
        world.register::<A>().unwrap();
        world.register::<B>().unwrap();
        let e = world.spawn().unwrap();
        world.attach::<A>(e).unwrap();
        world.attach::<B>(e).unwrap();
        let executor = WorkStealingExecutor::new(ExecutorConfig::uniform(1).with_hazard_mode(mode));
        (TickLoop::new(TickConfig::default(), world, executor), e)
    }

    /// Run one tick on another thread so a stuck frame fails the test.
    fn tick_within(mut tick_loop: TickLoop, limit: Duration) -> (TickLoop, FrameReport) {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let report = tick_loop.tick();
            let _ = tx.send((tick_loop, report));
        });
        let (tick_loop, report) = rx.recv_timeout(limit).expect("frame did not finish");
        (tick_loop, report.unwrap())
    }

    fn graph_of(tick_loop: &TickLoop) -> frame_sched::FrameGraph {
        FrameGraphBuilder::new(tick_loop.world().registry())
            .with_mode(tick_loop.executor.config().hazard_mode)
            .build()
            .unwrap()
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = demo_loop(1, 0);
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick().unwrap();
        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_transform_move_forward_face_player_frame() {
        let mut tick_loop = demo_loop(2, 0);
        let world = tick_loop.world_mut();
        let player = world.spawn().unwrap();
        let tank = world.spawn().unwrap();
        let other = world.spawn().unwrap();
        world.attach::<Transform>(player).unwrap();
        world.attach::<MoveForward>(tank).unwrap();
        world.attach_with(other, FacePlayer::chasing(player)).unwrap();

        let graph = FrameGraphBuilder::new(tick_loop.world().registry())
            .build()
            .unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.roots().count(), 3);
        assert_eq!(graph.edge_count(), 0);
        let face = graph.find("FacePlayer", Phase::Update).unwrap();
        assert!(graph.incoming(face).is_empty());

        let report = tick_loop.tick().unwrap();
        assert_eq!(report.jobs_executed, 3);
    }

    #[test]
    fn test_tasks_see_fixed_dt() {
        let mut tick_loop = demo_loop(2, 0);
        let tank = tick_loop.world_mut().spawn().unwrap();
        tick_loop
            .world()
            .attach_with(tank, MoveForward { speed: 3.0, distance: 0.0 })
            .unwrap();

        for _ in 0..30 {
            tick_loop.tick().unwrap();
        }

        let store = tick_loop.world().registry().read::<MoveForward>().unwrap();
        assert!((store.get(tank).unwrap().distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_unresolved_dependency_skips_frame() {
        let mut tick_loop = demo_loop(1, 0);
        let world = tick_loop.world_mut();
        world.register::<Orphan>().unwrap();
        let tank = world.spawn().unwrap();
        world.attach::<MoveForward>(tank).unwrap();

        let err = tick_loop.tick().unwrap_err();
        assert_eq!(err.system, "Orphan");
        assert_eq!(tick_loop.tick_id(), 0);
        let store = tick_loop.world().registry().read::<MoveForward>().unwrap();
        assert_eq!(store.get(tank).unwrap().distance, 0.0);
    }

    #[test]
    fn test_run_limited_ticks() {
        let mut tick_loop = demo_loop(1, 5);
        assert_eq!(tick_loop.run().unwrap(), 5);
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_cross_reading_readers_share_a_frame() {
        let (tick_loop, e) = pair_loop::<Left, Right>(HazardMode::LastWriter);
        assert_eq!(graph_of(&tick_loop).edge_count(), 0);

        let (tick_loop, report) = tick_within(tick_loop, Duration::from_secs(10));
        assert_eq!(report.jobs_executed, 2);
        let registry = tick_loop.world().registry();
        let left = registry.read::<Left>().unwrap();
        let right = registry.read::<Right>().unwrap();
        assert_eq!(left.get(e).unwrap().peeked.load(Ordering::Relaxed), 1);
        assert_eq!(right.get(e).unwrap().peeked.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_writer_reading_its_reader_finishes() {
        let (tick_loop, e) = pair_loop::<Reader, Copier>(HazardMode::LastWriter);
        assert_eq!(graph_of(&tick_loop).edge_count(), 0);

        let (tick_loop, report) = tick_within(tick_loop, Duration::from_secs(10));
        assert_eq!(report.jobs_executed, 2);
        let copier = tick_loop.world().registry().read::<Copier>().unwrap();
        assert_eq!(copier.get(e).unwrap().copied, 1);
    }

    #[test]
    fn test_readers_and_writer_orders_reader_first() {
        let (tick_loop, e) = pair_loop::<Reader, Copier>(HazardMode::ReadersAndWriter);
        let graph = graph_of(&tick_loop);
        let reader = graph.find("Reader", Phase::Update).unwrap();
        let copier = graph.find("Copier", Phase::Update).unwrap();
        assert!(graph.has_edge(reader, copier));
        assert_eq!(graph.edge_count(), 1);

        let (mut tick_loop, report) = tick_within(tick_loop, Duration::from_secs(10));
        assert_eq!(report.jobs_executed, 2);
        assert_eq!(tick_loop.tick_id(), 1);
        {
            let registry = tick_loop.world().registry();
            let reader = registry.read::<Reader>().unwrap();
            assert_eq!(reader.get(e).unwrap().peeked.load(Ordering::Relaxed), 1);
        }
        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_tick_duration_rejects_unusable_rates() {
        for tick_rate in [0.0, -30.0, f64::NAN, f64::INFINITY, 1e-300] {
            let config = TickConfig {
                tick_rate,
                ..TickConfig::default()
            };
            assert!(
                matches!(config.tick_duration(), Err(TickError::InvalidTickRate(_))),
                "{tick_rate} accepted"
            );
        }
        let config = TickConfig {
            tick_rate: 4.0,
            ..TickConfig::default()
        };
        assert_eq!(config.tick_duration().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_run_rejects_zero_tick_rate() {
        let config = TickConfig {
            tick_rate: 0.0,
            max_ticks: 5,
            ..TickConfig::default()
        };
        let mut tick_loop = TickLoop::new(config, World::new(), WorkStealingExecutor::default());
        assert_eq!(tick_loop.run(), Err(TickError::InvalidTickRate(0.0)));
        assert_eq!(tick_loop.tick_id(), 0);
    }

    #[test]
    fn test_run_surfaces_unresolved_dependency() {
        let mut tick_loop = demo_loop(1, 5);
        tick_loop.world_mut().register::<Orphan>().unwrap();
        assert!(matches!(
            tick_loop.run(),
            Err(TickError::Resolution(DependencyResolutionError { .. }))
        ));
    }

    #[test]
    fn test_run_stops_when_game_over() {
        let mut tick_loop = demo_loop(1, 5);
        tick_loop.world_mut().set_game_over(true);
        assert_eq!(tick_loop.run().unwrap(), 0);
    }
}
