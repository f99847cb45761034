//! Frame loop error types.

use frame_sched::DependencyResolutionError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    /// The tick rate must be a finite number of ticks per second above zero.
    #[error("invalid tick rate {0}: expected a positive number of ticks per second")]
    InvalidTickRate(f64),

    #[error(transparent)]
    Resolution(#[from] DependencyResolutionError),
}
