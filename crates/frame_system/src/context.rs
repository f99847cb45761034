//! Per-frame context handed to every task.

use frame_component::EntityId;

/// Read-only state shared by every task in a frame.
///
/// Tasks receive a copy with [`FrameContext::this_entity`] set to the entity
/// being processed. Declaring `in context` never produces a hazard edge, so
/// tasks must not rely on observing each other through it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Entity the current update call is for. [`EntityId::NULL`] outside
    /// per-entity dispatch.
    pub this_entity: EntityId,
    /// Fixed simulation time step, in seconds.
    pub dt: f32,
    /// Set once the simulation should stop after this frame.
    pub is_game_over: bool,
    /// Frame counter, starting at 1 for the first frame.
    pub frame: u64,
}

impl FrameContext {
    /// Default fixed step: 30 frames per second.
    pub const DEFAULT_DT: f32 = 1.0 / 30.0;

    /// Create a context for the given frame.
    #[must_use]
    pub fn new(frame: u64, dt: f32) -> Self {
        Self {
            this_entity: EntityId::NULL,
            dt,
            is_game_over: false,
            frame,
        }
    }

    /// Copy of this context bound to `entity`.
    #[must_use]
    pub fn for_entity(&self, entity: EntityId) -> Self {
        Self {
            this_entity: entity,
            ..*self
        }
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_DT)
    }
}
