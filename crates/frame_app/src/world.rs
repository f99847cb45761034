//! World state owned by the frame driver.
//!
//! The [`World`] pairs the entity table with the system registry. Outside a
//! frame it is the only path through which stores are mutated.

use frame_component::{ComponentError, EntityId, EntityTable, SlotRef};
use frame_system::{Component, RegistryError, SystemId, SystemRegistry};
use tracing::debug;

/// Entities plus the component systems that hold their data.
#[derive(Debug, Default)]
pub struct World {
    entities: EntityTable,
    registry: SystemRegistry,
    game_over: bool,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already populated registry.
    #[must_use]
    pub fn with_registry(registry: SystemRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::Exhausted`] when no entity index is left.
    pub fn spawn(&mut self) -> Result<EntityId, ComponentError> {
        self.entities.allocate()
    }

    /// Detach every component of `entity` and free its id. Returns how many
    /// components were removed.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::StaleEntity`] if `entity` is not alive.
    pub fn despawn(&mut self, entity: EntityId) -> Result<usize, ComponentError> {
        if !self.entities.resolve(entity) {
            return Err(ComponentError::StaleEntity { entity });
        }
        let removed = self.registry.detach_all(entity);
        self.entities.free(entity)?;
        debug!(%entity, removed, "despawned entity");
        Ok(removed)
    }

    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.resolve(entity)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Register the system for `T`.
    ///
    /// # Errors
    ///
    /// See [`SystemRegistry::register`].
    pub fn register<T: Component>(&mut self) -> Result<SystemId, RegistryError> {
        self.registry.register::<T>()
    }

    /// # Errors
    ///
    /// Rejects dead entities with [`ComponentError::StaleEntity`], otherwise
    /// as [`SystemRegistry::attach`].
    pub fn attach<T: Component>(&self, entity: EntityId) -> Result<SlotRef, RegistryError> {
        self.check_alive(entity)?;
        self.registry.attach::<T>(entity)
    }

    /// # Errors
    ///
    /// Same as [`World::attach`].
    pub fn attach_with<T: Component>(
        &self,
        entity: EntityId,
        value: T,
    ) -> Result<SlotRef, RegistryError> {
        self.check_alive(entity)?;
        self.registry.attach_with(entity, value)
    }

    /// # Errors
    ///
    /// Same as [`World::attach`], plus [`RegistryError::UnknownSystem`].
    pub fn attach_by_name(&self, name: &str, entity: EntityId) -> Result<SlotRef, RegistryError> {
        self.check_alive(entity)?;
        self.registry.attach_by_name(name, entity)
    }

    #[must_use]
    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SystemRegistry {
        &mut self.registry
    }

    pub fn set_game_over(&mut self, game_over: bool) {
        self.game_over = game_over;
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    fn check_alive(&self, entity: EntityId) -> Result<(), ComponentError> {
        if self.entities.resolve(entity) {
            Ok(())
        } else {
            Err(ComponentError::StaleEntity { entity })
        }
    }
}
