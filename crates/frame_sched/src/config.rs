//! Worker pool configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::HazardMode;

fn enabled() -> bool {
    true
}

fn default_idle_spins() -> u32 {
    64
}

/// One pool worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    /// Thread name.
    pub name: String,
    /// Whether the worker takes jobs from other workers' queues when its own
    /// queue is empty.
    #[serde(default = "enabled")]
    pub enable_work_stealing: bool,
}

impl WorkerDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enable_work_stealing: true,
        }
    }

    #[must_use]
    pub fn with_work_stealing(mut self, enabled: bool) -> Self {
        self.enable_work_stealing = enabled;
        self
    }
}

/// Configuration for a [`WorkStealingExecutor`](crate::WorkStealingExecutor).
///
/// The initiating thread always assists in addition to the workers listed
/// here, so an empty worker list still runs frames (single-threaded).
///
/// ```json
/// { "workers": [ { "name": "worker-0" }, { "name": "io", "enable_work_stealing": false } ],
///   "idle_spins": 64, "hazard_mode": "LastWriter" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub workers: Vec<WorkerDescriptor>,
    /// Empty polls a worker spins through before it starts yielding.
    #[serde(default = "default_idle_spins")]
    pub idle_spins: u32,
    /// Hazard tracking used when building frame graphs.
    #[serde(default)]
    pub hazard_mode: HazardMode,
}

impl ExecutorConfig {
    /// No workers; the initiating thread runs everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: Vec::new(),
            idle_spins: default_idle_spins(),
            hazard_mode: HazardMode::default(),
        }
    }

    /// `count` stealing workers named `worker-<n>`.
    #[must_use]
    pub fn uniform(count: usize) -> Self {
        (0..count).fold(Self::new(), |config, i| {
            config.with_worker(WorkerDescriptor::new(format!("worker-{i}")))
        })
    }

    #[must_use]
    pub fn with_worker(mut self, worker: WorkerDescriptor) -> Self {
        self.workers.push(worker);
        self
    }

    #[must_use]
    pub fn with_idle_spins(mut self, spins: u32) -> Self {
        self.idle_spins = spins;
        self
    }

    #[must_use]
    pub fn with_hazard_mode(mut self, mode: HazardMode) -> Self {
        self.hazard_mode = mode;
        self
    }

    /// Parse a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] on malformed JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for ExecutorConfig {
    /// One worker per available core, minus the initiating thread.
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, usize::from);
        Self::uniform(cores.saturating_sub(1))
    }
}
