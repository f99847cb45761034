//! Scheduler error types.

/// A task declared a dependency the builder cannot map to a resource.
///
/// Fatal to the frame build: no job of the frame is released.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task `{task}` of system `{system}` has unresolved dependency `{dependency}`")]
pub struct DependencyResolutionError {
    /// System that owns the task.
    pub system: String,
    /// Task (phase) name.
    pub task: String,
    /// The offending dependency entry.
    pub dependency: String,
}

/// Errors raised while loading executor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read executor config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse executor config: {0}")]
    Parse(#[from] serde_json::Error),
}
