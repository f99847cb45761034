//! Dense per-type component storage.
//!
//! A [`ComponentStore`] keeps its values packed in slot order with a forward
//! `entity -> slot` map and a `slot -> entity` inverse. Iteration walks the
//! dense vector, so per-frame updates touch contiguous memory.

use std::collections::HashMap;

use crate::entity::EntityId;
use crate::error::ComponentError;

/// Position of a component value inside its store.
///
/// Slot references are only stable until the next [`ComponentStore::detach`],
/// which moves the last value into the vacated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef(pub usize);

impl SlotRef {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Dense storage for every instance of one component type.
///
/// ## Invariants
///
/// * slots are exactly `[0, count)`;
/// * every entity in the forward map owns exactly one slot;
/// * `entities[slots[e]] == e` for every stored entity `e`.
#[derive(Debug)]
pub struct ComponentStore<T> {
    data: Vec<T>,
    slots: HashMap<EntityId, usize>,
    entities: Vec<EntityId>,
}

impl<T> ComponentStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            slots: HashMap::new(),
            entities: Vec::new(),
        }
    }

    /// Attaches `value` to `entity` in a new slot at the end of the store.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::DuplicateAttach`] if the entity already has a
    /// slot. The store is left untouched.
    pub fn attach_with(&mut self, entity: EntityId, value: T) -> Result<SlotRef, ComponentError> {
        if self.slots.contains_key(&entity) {
            return Err(ComponentError::DuplicateAttach { entity });
        }
        let slot = self.data.len();
        self.data.push(value);
        self.entities.push(entity);
        self.slots.insert(entity, slot);
        Ok(SlotRef(slot))
    }

    /// Removes the entity's component and returns it.
    ///
    /// The last slot is moved into the hole so slots stay contiguous.
    pub fn detach(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.slots.remove(&entity)?;
        let value = self.data.swap_remove(slot);
        self.entities.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.slots.insert(moved, slot);
        }
        Some(value)
    }

    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.slots.get(&entity).map(|&slot| &self.data[slot])
    }

    #[must_use]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.slots.get(&entity).map(|&slot| &mut self.data[slot])
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slots.contains_key(&entity)
    }

    /// Number of stored components.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Slot currently holding the entity's component.
    #[must_use]
    pub fn slot_of(&self, entity: EntityId) -> Option<SlotRef> {
        self.slots.get(&entity).copied().map(SlotRef)
    }

    /// Entity owning the given slot.
    #[must_use]
    pub fn entity_at(&self, slot: SlotRef) -> Option<EntityId> {
        self.entities.get(slot.0).copied()
    }

    /// Entities in slot order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// `(entity, &value)` pairs in slot order.
    pub fn iter_slots(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.entities.iter().copied().zip(self.data.iter())
    }

    /// `(entity, &mut value)` pairs in slot order. Every call starts over at
    /// slot zero.
    pub fn iter_slots_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> + '_ {
        self.entities.iter().copied().zip(self.data.iter_mut())
    }

    pub fn for_each_slot(&mut self, mut f: impl FnMut(EntityId, &mut T)) {
        for (entity, value) in self.iter_slots_mut() {
            f(entity, value);
        }
    }
}

impl<T: Default> ComponentStore<T> {
    /// Attaches a default-initialised component to `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::DuplicateAttach`] if the entity already has a
    /// slot.
    pub fn attach(&mut self, entity: EntityId) -> Result<SlotRef, ComponentError> {
        self.attach_with(entity, T::default())
    }
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
