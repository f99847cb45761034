//! Work-stealing executor for one [`FrameGraph`].
//!
//! Queue 0 belongs to the initiating thread; queues `1..` belong to the
//! configured workers. Roots are dealt round-robin across all queues before
//! any thread starts. A job that finishes decrements the counters of its
//! dependents and pushes every dependent that reaches zero onto its own
//! queue's tail. Owners pop from the tail; thieves take from the head.
//!
//! The frame is complete when the last job finishes. A job that panics also
//! ends the frame: the remaining threads stop picking up work and the panic
//! resumes on the initiating thread once every worker has joined.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::ExecutorConfig;
use crate::graph::{FrameGraph, JobId, JobNode};

/// Statistics for one executed frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub jobs_executed: usize,
    /// Jobs taken from a queue other than the executing thread's own.
    pub steals: usize,
    /// Jobs run by each thread. Index 0 is the initiating thread.
    pub per_worker: Vec<usize>,
    pub elapsed: Duration,
}

/// Runs frame graphs on a fixed set of worker threads plus the caller.
#[derive(Debug, Clone, Default)]
pub struct WorkStealingExecutor {
    config: ExecutorConfig,
}

impl WorkStealingExecutor {
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Configured workers, not counting the initiating thread.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.config.workers.len()
    }

    /// Execute every job of `graph`, calling `body` once per job.
    ///
    /// Returns when all jobs have run. The calling thread works through the
    /// graph alongside the workers.
    ///
    /// # Panics
    ///
    /// Re-raises the first panic from `body` after all workers have stopped.
    pub fn run<F>(&self, graph: &FrameGraph, body: F) -> FrameReport
    where
        F: Fn(&JobNode) + Sync,
    {
        let start = Instant::now();
        let threads = self.worker_count() + 1;
        if graph.is_empty() {
            return FrameReport {
                per_worker: vec![0; threads],
                ..FrameReport::default()
            };
        }

        let state = FrameState::new(graph, &self.config);
        let mut per_worker = vec![0; threads];

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.worker_count());
            for (i, worker) in self.config.workers.iter().enumerate() {
                let queue = i + 1;
                let state = &state;
                let body = &body;
                let spawned = thread::Builder::new()
                    .name(worker.name.clone())
                    .spawn_scoped(scope, move || state.work(queue, body));
                match spawned {
                    Ok(handle) => handles.push((queue, handle)),
                    // Its queue is still drained by stealers.
                    Err(err) => warn!(worker = %worker.name, %err, "failed to spawn worker"),
                }
            }

            per_worker[0] = state.work(0, &body);

            for (queue, handle) in handles {
                match handle.join() {
                    Ok(executed) => per_worker[queue] = executed,
                    Err(payload) => state.fail(payload),
                }
            }
        });

        if let Some(payload) = state.panic.into_inner() {
            panic::resume_unwind(payload);
        }

        let report = FrameReport {
            jobs_executed: per_worker.iter().sum(),
            steals: state.steals.into_inner(),
            per_worker,
            elapsed: start.elapsed(),
        };
        debug!(
            jobs = report.jobs_executed,
            steals = report.steals,
            elapsed_us = report.elapsed.as_micros() as u64,
            "frame executed"
        );
        report
    }
}

struct FrameState<'g> {
    graph: &'g FrameGraph,
    counters: Vec<AtomicUsize>,
    queues: Vec<Mutex<VecDeque<JobId>>>,
    stealing: Vec<bool>,
    idle_spins: u32,
    remaining: AtomicUsize,
    done: AtomicBool,
    steals: AtomicUsize,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<'g> FrameState<'g> {
    fn new(graph: &'g FrameGraph, config: &ExecutorConfig) -> Self {
        let threads = config.workers.len() + 1;
        let queues: Vec<_> = (0..threads).map(|_| Mutex::new(VecDeque::new())).collect();
        for (n, root) in graph.roots().enumerate() {
            queues[n % threads].lock().push_back(root);
        }

        let stealing = std::iter::once(true)
            .chain(config.workers.iter().map(|w| w.enable_work_stealing))
            .collect();

        Self {
            graph,
            counters: graph
                .jobs()
                .iter()
                .map(|job| AtomicUsize::new(job.dependency_count()))
                .collect(),
            queues,
            stealing,
            idle_spins: config.idle_spins,
            remaining: AtomicUsize::new(graph.len()),
            done: AtomicBool::new(false),
            steals: AtomicUsize::new(0),
            panic: Mutex::new(None),
        }
    }

    /// Process jobs until the frame is done. Returns how many ran here.
    fn work<F>(&self, queue: usize, body: &F) -> usize
    where
        F: Fn(&JobNode) + Sync,
    {
        let mut executed = 0;
        let mut idle = 0;
        while !self.done.load(Ordering::Acquire) {
            match self.next_job(queue) {
                Some(job) => {
                    idle = 0;
                    self.execute(queue, job, body);
                    executed += 1;
                }
                None if idle < self.idle_spins => {
                    idle += 1;
                    std::hint::spin_loop();
                }
                None => thread::yield_now(),
            }
        }
        executed
    }

    fn next_job(&self, queue: usize) -> Option<JobId> {
        if let Some(job) = self.queues[queue].lock().pop_back() {
            return Some(job);
        }
        if !self.stealing[queue] {
            return None;
        }
        let n = self.queues.len();
        (1..n)
            .map(|offset| (queue + offset) % n)
            .find_map(|victim| self.queues[victim].lock().pop_front())
            .inspect(|job| {
                self.steals.fetch_add(1, Ordering::Relaxed);
                trace!(thief = queue, job = job.0, "stole job");
            })
    }

    fn execute<F>(&self, queue: usize, id: JobId, body: &F)
    where
        F: Fn(&JobNode) + Sync,
    {
        let job = self.graph.job(id);
        trace!(job = id.0, system = %job.system_name, phase = %job.phase, "running job");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body(job))) {
            warn!(job = id.0, system = %job.system_name, phase = %job.phase, "job panicked");
            self.fail(payload);
            return;
        }

        for &dependent in job.dependents() {
            if self.counters[dependent.0].fetch_sub(1, Ordering::AcqRel) == 1 {
                self.queues[queue].lock().push_back(dependent);
            }
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done.store(true, Ordering::Release);
        }
    }

    /// Keep the first panic and stop the frame.
    fn fail(&self, payload: Box<dyn Any + Send>) {
        self.panic.lock().get_or_insert(payload);
        self.done.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use frame_component::Phase;
    use frame_system::SystemId;

    use super::*;
    use crate::config::WorkerDescriptor;

    /// `layers` rows of `width` jobs; each job depends on two jobs of the
    /// previous row.
    fn layered(layers: usize, width: usize) -> FrameGraph {
        let mut graph = FrameGraph::default();
        let mut prev: Vec<JobId> = Vec::new();
        for layer in 0..layers {
            let row: Vec<JobId> = (0..width)
                .map(|i| graph.push_job(SystemId(i), &format!("s{layer}.{i}"), Phase::Update))
                .collect();
            if !prev.is_empty() {
                for (i, &job) in row.iter().enumerate() {
                    graph.add_edge(prev[i], job);
                    graph.add_edge(prev[(i + 1) % width], job);
                }
            }
            prev = row;
        }
        graph
    }

    #[test]
    fn test_every_job_runs_exactly_once() {
        let graph = layered(10, 16);
        let runs: Vec<AtomicUsize> = (0..graph.len()).map(|_| AtomicUsize::new(0)).collect();
        let executor = WorkStealingExecutor::new(ExecutorConfig::uniform(3));

        let report = executor.run(&graph, |job| {
            runs[job.id.0].fetch_add(1, Ordering::Relaxed);
        });

        assert!(runs.iter().all(|r| r.load(Ordering::Relaxed) == 1));
        assert_eq!(report.jobs_executed, graph.len());
        assert_eq!(report.per_worker.len(), 4);
        assert_eq!(report.per_worker.iter().sum::<usize>(), graph.len());
    }

    #[test]
    fn test_dependents_start_after_predecessors_finish() {
        let graph = layered(8, 12);
        let executor = WorkStealingExecutor::new(ExecutorConfig::uniform(4).with_idle_spins(4));

        for _ in 0..50 {
            let clock = AtomicUsize::new(0);
            let started: Vec<AtomicUsize> = (0..graph.len()).map(|_| AtomicUsize::new(0)).collect();
            let finished: Vec<AtomicUsize> = (0..graph.len()).map(|_| AtomicUsize::new(0)).collect();

            executor.run(&graph, |job| {
                started[job.id.0].store(clock.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
                std::hint::black_box((0..100).sum::<u64>());
                finished[job.id.0].store(clock.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
            });

            for job in graph.jobs() {
                for &dependent in job.dependents() {
                    assert!(
                        finished[job.id.0].load(Ordering::SeqCst)
                            < started[dependent.0].load(Ordering::SeqCst)
                    );
                }
            }
        }
    }

    #[test]
    fn test_non_stealing_workers_finish_the_frame() {
        let graph = layered(4, 6);
        let config = ExecutorConfig::new()
            .with_worker(WorkerDescriptor::new("pinned-a").with_work_stealing(false))
            .with_worker(WorkerDescriptor::new("pinned-b").with_work_stealing(false));
        let count = AtomicUsize::new(0);

        let report = WorkStealingExecutor::new(config).run(&graph, |_| {
            count.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(count.into_inner(), graph.len());
        assert_eq!(report.jobs_executed, graph.len());
    }

    #[test]
    fn test_without_workers_the_caller_runs_everything() {
        let graph = layered(3, 5);
        let report = WorkStealingExecutor::new(ExecutorConfig::new()).run(&graph, |_| {});
        assert_eq!(report.per_worker, vec![graph.len()]);
        assert_eq!(report.steals, 0);
    }

    #[test]
    fn test_empty_graph() {
        let executor = WorkStealingExecutor::new(ExecutorConfig::uniform(2));
        let report = executor.run(&FrameGraph::default(), |_| panic!("no jobs expected"));
        assert_eq!(report.jobs_executed, 0);
        assert_eq!(report.per_worker, vec![0, 0, 0]);
    }

    #[test]
    fn test_single_chain_is_sequential() {
        let graph = layered(20, 1);
        let order = Mutex::new(Vec::new());
        WorkStealingExecutor::new(ExecutorConfig::uniform(3)).run(&graph, |job| {
            order.lock().push(job.id.0);
        });
        assert_eq!(order.into_inner(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_job_panic_resumes_on_caller() {
        let graph = layered(3, 4);
        WorkStealingExecutor::new(ExecutorConfig::uniform(2)).run(&graph, |job| {
            if job.id.0 == 5 {
                panic!("boom");
            }
        });
    }
}
