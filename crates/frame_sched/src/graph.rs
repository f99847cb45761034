//! Frame graph construction by hazard tracking over declared access.
//!
//! The builder visits the phases in frame order and, within a phase, the
//! systems in registration order. Every matching task becomes a job. For each
//! declared dependency the builder resolves a resource key and adds an edge
//! from the key's writer of record to the new job:
//!
//! ```text
//! for phase in [PreUpdate, Update, PostUpdate]:
//!     for system in registry:
//!         for task in system.tasks where task.name == phase:
//!             job = new node
//!             for dep in task.dependencies:
//!                 key = resolve(dep)            # context -> no key
//!                 if last_writer[key]: edge last_writer[key] -> job
//!                 if dep writes:       last_writer[key] = job
//! ```
//!
//! `last_writer` lives for the whole frame, so hazards across phases are
//! honoured. Tracking only the last writer orders read-after-write and
//! write-after-write but leaves write-after-read open: a writer does not wait
//! for earlier readers it has no edge to. [`HazardMode::ReadersAndWriter`]
//! closes that gap by also fanning edges from every reader since the last
//! write into the next writer.
//!
//! The finished [`FrameGraph`] is immutable. The executor only ever sees a
//! fully wired graph, so no job can start before all of its edges exist.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use frame_component::{Dependency, Direction, Phase, Scope, TaskDescriptor};
use frame_system::{ComponentSystem, SystemId, SystemRegistry};

use crate::error::DependencyResolutionError;

/// Index of a job in its [`FrameGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub usize);

/// Which hazards the builder turns into edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HazardMode {
    /// Edges from the last writer only.
    #[default]
    LastWriter,
    /// Edges from the last writer and from every reader since that write.
    ReadersAndWriter,
}

/// One task instance bound to one system.
#[derive(Debug, Clone)]
pub struct JobNode {
    pub id: JobId,
    pub system: SystemId,
    pub system_name: String,
    pub phase: Phase,
    dependents: Vec<JobId>,
    dependency_count: usize,
}

impl JobNode {
    /// Jobs to notify when this one completes.
    #[must_use]
    pub fn dependents(&self) -> &[JobId] {
        &self.dependents
    }

    /// Number of incoming edges; the executor's initial counter.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.dependency_count
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.dependency_count == 0
    }
}

/// A fully built, immutable job DAG for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameGraph {
    jobs: Vec<JobNode>,
    edge_count: usize,
}

impl FrameGraph {
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[must_use]
    pub fn jobs(&self) -> &[JobNode] {
        &self.jobs
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    #[must_use]
    pub fn job(&self, id: JobId) -> &JobNode {
        &self.jobs[id.0]
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Jobs with no incoming edges, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = JobId> + '_ {
        self.jobs.iter().filter(|j| j.is_root()).map(|j| j.id)
    }

    /// The first job of `system` in `phase`.
    #[must_use]
    pub fn find(&self, system: &str, phase: Phase) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|j| j.phase == phase && j.system_name == system)
            .map(|j| j.id)
    }

    #[must_use]
    pub fn has_edge(&self, from: JobId, to: JobId) -> bool {
        self.jobs[from.0].dependents.contains(&to)
    }

    /// Predecessors of `id`.
    #[must_use]
    pub fn incoming(&self, id: JobId) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|j| j.dependents.contains(&id))
            .map(|j| j.id)
            .collect()
    }

    /// Returns `true` if `to` is reachable from `from` along edges.
    #[must_use]
    pub fn has_path(&self, from: JobId, to: JobId) -> bool {
        let mut seen = vec![false; self.jobs.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            stack.extend_from_slice(&self.jobs[id.0].dependents);
        }
        false
    }

    pub(crate) fn push_job(&mut self, system: SystemId, system_name: &str, phase: Phase) -> JobId {
        let id = JobId(self.jobs.len());
        self.jobs.push(JobNode {
            id,
            system,
            system_name: system_name.to_string(),
            phase,
            dependents: Vec::new(),
            dependency_count: 0,
        });
        id
    }

    /// Record `from -> to`. Self edges and repeated edges are dropped.
    pub(crate) fn add_edge(&mut self, from: JobId, to: JobId) {
        if from == to || self.jobs[from.0].dependents.contains(&to) {
            return;
        }
        self.jobs[from.0].dependents.push(to);
        self.jobs[to.0].dependency_count += 1;
        self.edge_count += 1;
    }
}

/// Builds the [`FrameGraph`] for one frame from a [`SystemRegistry`].
#[derive(Debug)]
pub struct FrameGraphBuilder<'r> {
    registry: &'r SystemRegistry,
    mode: HazardMode,
    include_empty: bool,
}

impl<'r> FrameGraphBuilder<'r> {
    #[must_use]
    pub fn new(registry: &'r SystemRegistry) -> Self {
        Self {
            registry,
            mode: HazardMode::default(),
            include_empty: false,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: HazardMode) -> Self {
        self.mode = mode;
        self
    }

    /// Also create jobs for systems that hold no components. Off by default:
    /// an empty system has nothing to update.
    #[must_use]
    pub fn include_empty(mut self, include: bool) -> Self {
        self.include_empty = include;
        self
    }

    /// Build the whole frame.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyResolutionError`] if any task names a component
    /// system that is not registered. Descriptors of empty systems are
    /// resolved too, so a bad declaration fails every frame, not only the
    /// ones where its system happens to hold data.
    pub fn build(&self) -> Result<FrameGraph, DependencyResolutionError> {
        let mut graph = FrameGraph::default();
        let mut last_writer: HashMap<SystemId, JobId> = HashMap::new();
        let mut readers: HashMap<SystemId, Vec<JobId>> = HashMap::new();

        for phase in Phase::ALL {
            for (system_id, system) in self.registry.iter() {
                for task in system.tasks().iter().filter(|t| t.phase() == Some(phase)) {
                    let accesses = self.resolve(system_id, system, task)?;
                    if !self.include_empty && system.count() == 0 {
                        trace!(system = system.name(), %phase, "skipping empty system");
                        continue;
                    }

                    let job = graph.push_job(system_id, system.name(), phase);
                    for (key, direction) in accesses {
                        if let Some(&writer) = last_writer.get(&key) {
                            graph.add_edge(writer, job);
                        }
                        if direction.writes() {
                            if self.mode == HazardMode::ReadersAndWriter {
                                for reader in readers.remove(&key).unwrap_or_default() {
                                    graph.add_edge(reader, job);
                                }
                            }
                            last_writer.insert(key, job);
                        } else if self.mode == HazardMode::ReadersAndWriter {
                            readers.entry(key).or_default().push(job);
                        }
                    }
                }
            }
        }

        debug!(
            jobs = graph.len(),
            edges = graph.edge_count(),
            roots = graph.roots().count(),
            mode = ?self.mode,
            "built frame graph"
        );
        Ok(graph)
    }

    /// Map every hazard-relevant dependency of `task` to a resource key.
    fn resolve(
        &self,
        system_id: SystemId,
        system: &dyn ComponentSystem,
        task: &TaskDescriptor,
    ) -> Result<Vec<(SystemId, Direction)>, DependencyResolutionError> {
        let mut accesses = Vec::with_capacity(task.dependencies.len());
        for dep in &task.dependencies {
            let key = match dep.scope {
                Scope::Context => continue,
                Scope::Own | Scope::AllOwn => system_id,
                Scope::Named => self
                    .registry
                    .id_of(&dep.resource)
                    .ok_or_else(|| unresolved(system, task, dep))?,
            };
            accesses.push((key, dep.direction));
        }
        Ok(accesses)
    }
}

fn unresolved(
    system: &dyn ComponentSystem,
    task: &TaskDescriptor,
    dep: &Dependency,
) -> DependencyResolutionError {
    DependencyResolutionError {
        system: system.name().to_string(),
        task: task.name.clone(),
        dependency: dep.to_string(),
    }
}
