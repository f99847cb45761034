//! System registry: the set of component systems reachable by name.
//!
//! The registry is an explicit value owned by the frame driver and passed by
//! reference to the graph builder and to every task body. Systems
//! keep their registration order, which is the order the graph builder visits
//! them within a phase.

use std::any::TypeId;
use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use frame_component::{ComponentStore, EntityId, SlotRef};

use crate::error::RegistryError;
use crate::system::{Component, ComponentSystem, TypedSystem};

/// Position of a system in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub usize);

/// Every registered component system, in registration order.
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<Box<dyn ComponentSystem>>,
    by_name: HashMap<String, SystemId>,
    by_type: HashMap<TypeId, SystemId>,
}

impl SystemRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the system for component type `T` under [`Component::type_name`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateSystem`] if the name or the type is
    /// already registered, [`RegistryError::InvalidDescriptor`] if one of
    /// `T`'s task descriptors is malformed, or [`RegistryError::DuplicateTask`]
    /// if two of them name the same phase.
    pub fn register<T: Component>(&mut self) -> Result<SystemId, RegistryError> {
        self.register_as::<T>(T::type_name())
    }

    /// Register the system for component type `T` under an explicit name.
    ///
    /// # Errors
    ///
    /// Same as [`SystemRegistry::register`].
    pub fn register_as<T: Component>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<SystemId, RegistryError> {
        let name = name.into();
        if self.by_type.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::DuplicateSystem(name));
        }
        let id = self.insert(Box::new(TypedSystem::<T>::new(name)))?;
        self.by_type.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Register an already constructed system.
    ///
    /// # Errors
    ///
    /// Same as [`SystemRegistry::register`].
    pub fn register_system(
        &mut self,
        system: Box<dyn ComponentSystem>,
    ) -> Result<SystemId, RegistryError> {
        self.insert(system)
    }

    fn insert(&mut self, system: Box<dyn ComponentSystem>) -> Result<SystemId, RegistryError> {
        let name = system.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateSystem(name));
        }
        let mut phases = Vec::new();
        for task in system.tasks() {
            task.validate()
                .map_err(|source| RegistryError::InvalidDescriptor {
                    system: name.clone(),
                    source,
                })?;
            if let Some(phase) = task.phase() {
                if phases.contains(&phase) {
                    return Err(RegistryError::DuplicateTask {
                        system: name,
                        task: task.name.clone(),
                    });
                }
                phases.push(phase);
            }
        }

        let id = SystemId(self.systems.len());
        debug!(
            system = name,
            id = id.0,
            tasks = system.tasks().len(),
            "registered component system"
        );
        self.by_name.insert(name, id);
        self.systems.push(system);
        Ok(id)
    }

    /// Look up a system by name. Unknown names yield `None`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ComponentSystem> {
        self.id_of(name).and_then(|id| self.system(id))
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<SystemId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn system(&self, id: SystemId) -> Option<&dyn ComponentSystem> {
        self.systems.get(id.0).map(|s| &**s)
    }

    /// The locked store of component type `T`.
    #[must_use]
    pub fn store<T: Component>(&self) -> Option<&RwLock<ComponentStore<T>>> {
        let id = self.by_type.get(&TypeId::of::<T>())?;
        self.systems[id.0]
            .as_any()
            .downcast_ref::<TypedSystem<T>>()
            .map(TypedSystem::store)
    }

    /// Shared access to the store of `T`, for tasks that declared `in` access.
    #[must_use]
    pub fn read<T: Component>(&self) -> Option<RwLockReadGuard<'_, ComponentStore<T>>> {
        self.store::<T>().map(|store| store.read())
    }

    /// Exclusive access to the store of `T`.
    #[must_use]
    pub fn write<T: Component>(&self) -> Option<RwLockWriteGuard<'_, ComponentStore<T>>> {
        self.store::<T>().map(|store| store.write())
    }

    /// Attach a default `T` to `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSystem`] if `T` was never registered,
    /// or the store's [`ComponentError`](frame_component::ComponentError).
    pub fn attach<T: Component>(&self, entity: EntityId) -> Result<SlotRef, RegistryError> {
        self.attach_with(entity, T::default())
    }

    /// Attach `value` to `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`SystemRegistry::attach`].
    pub fn attach_with<T: Component>(
        &self,
        entity: EntityId,
        value: T,
    ) -> Result<SlotRef, RegistryError> {
        let store = self
            .store::<T>()
            .ok_or_else(|| RegistryError::UnknownSystem(T::type_name().to_string()))?;
        Ok(store.write().attach_with(entity, value)?)
    }

    /// Attach a default component to `entity` in the system called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSystem`] if no such system exists, or
    /// the store's error.
    pub fn attach_by_name(&self, name: &str, entity: EntityId) -> Result<SlotRef, RegistryError> {
        let system = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSystem(name.to_string()))?;
        Ok(system.attach(entity)?)
    }

    /// Remove the entity from every system. Returns how many held it.
    pub fn detach_all(&self, entity: EntityId) -> usize {
        self.systems.iter().filter(|s| s.detach(entity)).count()
    }

    /// Systems in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (SystemId, &dyn ComponentSystem)> {
        self.systems
            .iter()
            .enumerate()
            .map(|(i, s)| (SystemId(i), &**s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.systems.iter().map(|s| (s.name(), s.count())))
            .finish()
    }
}
