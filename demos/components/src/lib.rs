//! Demo components: players and the tanks that chase them.
//!
//! Each type publishes its task descriptor feed through [`Component::tasks`].
//! [`register_all`] installs them in the order the frame driver expects.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use frame_component::{ComponentStore, Direction, EntityId, Phase, TaskDescriptor};
use frame_system::{Component, FrameContext, RegistryError, SystemRegistry};

/// Position and facing in the plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    /// Radians, counter-clockwise from +x.
    pub rotation: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
    };

    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Unit vector the transform is facing.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }

    // Runs in Update but declares no data access.
    fn tasks() -> Vec<TaskDescriptor> {
        vec![TaskDescriptor::for_phase(Phase::Update)]
    }
}

/// Marks an entity as a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerData {
    pub name: String,
    pub lives: u32,
}

impl Default for PlayerData {
    fn default() -> Self {
        Self {
            name: String::from("player"),
            lives: 3,
        }
    }
}

impl Component for PlayerData {
    fn type_name() -> &'static str {
        "PlayerData"
    }

    fn tasks() -> Vec<TaskDescriptor> {
        Vec::new()
    }
}

/// Constant forward motion, accumulated as travelled distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MoveForward {
    /// World units per second.
    pub speed: f32,
    pub distance: f32,
}

impl Default for MoveForward {
    fn default() -> Self {
        Self {
            speed: 1.0,
            distance: 0.0,
        }
    }
}

impl Component for MoveForward {
    fn type_name() -> &'static str {
        "MoveForward"
    }

    fn tasks() -> Vec<TaskDescriptor> {
        vec![
            TaskDescriptor::for_phase(Phase::Update)
                .own(Direction::InOut)
                .context(),
        ]
    }

    fn update(&mut self, _phase: Phase, ctx: &FrameContext, _systems: &SystemRegistry) {
        self.distance += self.speed * ctx.dt;
    }
}

/// Turns an entity towards the player it is chasing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FacePlayer {
    pub target: EntityId,
    /// Radians towards `target`, as of the last update.
    pub heading: f32,
}

impl FacePlayer {
    #[must_use]
    pub fn chasing(target: EntityId) -> Self {
        Self {
            target,
            heading: 0.0,
        }
    }

    fn face(&mut self, from: &Transform, to: &Transform) {
        let offset = to.position - from.position;
        if offset.length_squared() > f32::EPSILON {
            self.heading = offset.y.atan2(offset.x);
        }
    }
}

impl Component for FacePlayer {
    fn type_name() -> &'static str {
        "FacePlayer"
    }

    fn tasks() -> Vec<TaskDescriptor> {
        vec![
            TaskDescriptor::for_phase(Phase::Update)
                .own(Direction::InOut)
                .component(Direction::In, Transform::type_name()),
        ]
    }

    // One read guard for the whole store instead of one per entity.
    fn run_phase(
        _phase: Phase,
        store: &mut ComponentStore<Self>,
        _ctx: &FrameContext,
        systems: &SystemRegistry,
    ) {
        let Some(transforms) = systems.read::<Transform>() else {
            return;
        };
        for (entity, face) in store.iter_slots_mut() {
            if let (Some(from), Some(to)) = (transforms.get(entity), transforms.get(face.target)) {
                face.face(from, to);
            }
        }
    }
}

/// Register every demo component system.
///
/// # Errors
///
/// Fails if any of the systems is already registered.
pub fn register_all(registry: &mut SystemRegistry) -> Result<(), RegistryError> {
    registry.register::<Transform>()?;
    registry.register::<PlayerData>()?;
    registry.register::<MoveForward>()?;
    registry.register::<FacePlayer>()?;
    Ok(())
}
