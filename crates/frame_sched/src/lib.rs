//! # frame_sched
//!
//! Turns the task descriptors of a [`SystemRegistry`](frame_system::SystemRegistry)
//! into a per-frame job DAG and runs it on a pool of work-stealing threads.
//!
//! ```rust,no_run
//! use frame_sched::{ExecutorConfig, FrameGraphBuilder, WorkStealingExecutor};
//! use frame_system::{FrameContext, SystemRegistry};
//!
//! let registry = SystemRegistry::new();
//! let executor = WorkStealingExecutor::new(ExecutorConfig::uniform(3));
//! let ctx = FrameContext::default();
//!
//! let graph = FrameGraphBuilder::new(&registry).build()?;
//! executor.run(&graph, |job| {
//!     if let Some(system) = registry.system(job.system) {
//!         system.run_phase(job.phase, &ctx, &registry);
//!     }
//! });
//! # Ok::<(), frame_sched::DependencyResolutionError>(())
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;

pub use config::{ExecutorConfig, WorkerDescriptor};
pub use error::{ConfigError, DependencyResolutionError};
pub use executor::{FrameReport, WorkStealingExecutor};
pub use graph::{FrameGraph, FrameGraphBuilder, HazardMode, JobId, JobNode};
