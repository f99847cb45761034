//! Entity identifiers and the generation table that issues them.
//!
//! An [`EntityId`] is an `(index, generation)` pair. The index selects a row in
//! the [`EntityTable`]; the generation detects handles that outlived the
//! entity they were issued for. Freed indices are recycled with a bumped
//! generation so stale handles never resolve to the new occupant.

use serde::{Deserialize, Serialize};

use crate::error::ComponentError;

/// A versioned entity handle.
///
/// The wire form is a single `u64`: generation in the high 32 bits, index in
/// the low 32 bits. [`EntityId::to_bits`] and [`EntityId::from_bits`] are exact
/// inverses and serde uses the same encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Handle that never resolves. Matches a default-constructed id.
    pub const NULL: EntityId = EntityId {
        index: u32::MAX,
        generation: 0,
    };

    /// Create an id from its parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Decode the 64-bit wire form.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }

    /// Encode as `generation << 32 | index`.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Returns `true` unless this is [`EntityId::NULL`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !(self.index == u32::MAX && self.generation == 0)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl From<u64> for EntityId {
    fn from(bits: u64) -> Self {
        Self::from_bits(bits)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.to_bits()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

fn next_index(rows: usize) -> Result<u32, ComponentError> {
    u32::try_from(rows)
        .ok()
        .filter(|&index| index != EntityId::NULL.index())
        .ok_or(ComponentError::Exhausted)
}

#[derive(Debug, Clone, Copy)]
struct Row {
    generation: u32,
    alive: bool,
}

/// Issues entity ids and tracks the current generation of every index.
///
/// Fresh indices start at generation 1. Freeing an entity bumps the
/// generation of its index and parks the index on a free list; the next
/// [`EntityTable::allocate`] reuses it.
#[derive(Debug, Default)]
pub struct EntityTable {
    rows: Vec<Row>,
    free: Vec<u32>,
    live: usize,
}

impl EntityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an entity, recycling a freed index when one is available.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Exhausted`] once every index below
    /// `u32::MAX` is in use. `u32::MAX` itself belongs to [`EntityId::NULL`].
    pub fn allocate(&mut self) -> Result<EntityId, ComponentError> {
        if let Some(index) = self.free.pop() {
            let row = &mut self.rows[index as usize];
            row.alive = true;
            self.live += 1;
            return Ok(EntityId::new(index, row.generation));
        }

        let index = next_index(self.rows.len())?;
        self.rows.push(Row {
            generation: 1,
            alive: true,
        });
        self.live += 1;
        Ok(EntityId::new(index, 1))
    }

    /// Frees a live entity, invalidating every outstanding handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::StaleEntity`] if `id` does not name a live
    /// entity.
    pub fn free(&mut self, id: EntityId) -> Result<(), ComponentError> {
        if !self.resolve(id) {
            return Err(ComponentError::StaleEntity { entity: id });
        }
        let row = &mut self.rows[id.index() as usize];
        row.alive = false;
        // Generation 0 is reserved for NULL, so skip it on wrap.
        row.generation = row.generation.checked_add(1).unwrap_or(1);
        self.free.push(id.index());
        self.live -= 1;
        Ok(())
    }

    /// Reports whether `id` names a live entity of the current generation.
    #[must_use]
    pub fn resolve(&self, id: EntityId) -> bool {
        self.rows
            .get(id.index() as usize)
            .is_some_and(|row| row.alive && row.generation == id.generation())
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_roundtrip() {
        let pairs = [
            (0, 1),
            (1, 1),
            (u32::MAX, 0),
            (0, u32::MAX),
            (u32::MAX, u32::MAX),
            (0xdead_beef, 0x1234_5678),
        ];
        for (index, generation) in pairs {
            let id = EntityId::new(index, generation);
            let decoded = EntityId::from_bits(id.to_bits());
            assert_eq!(decoded.index(), index);
            assert_eq!(decoded.generation(), generation);
            assert_eq!(decoded.to_bits(), id.to_bits());
        }
    }

    #[test]
    fn test_bit_layout() {
        let id = EntityId::new(7, 3);
        assert_eq!(id.to_bits(), (3u64 << 32) | 7);
        assert_eq!(EntityId::from_bits(0x0000_0002_0000_0005), EntityId::new(5, 2));
    }

    #[test]
    fn test_null_is_default_and_invalid() {
        assert_eq!(EntityId::default(), EntityId::NULL);
        assert!(!EntityId::NULL.is_valid());
        assert!(EntityId::new(0, 1).is_valid());
    }

    #[test]
    fn test_serializes_as_u64() {
        let id = EntityId::new(42, 9);
        let bytes = rmp_serde::to_vec(&id).unwrap();
        let raw: u64 = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(raw, id.to_bits());
        let restored: EntityId = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, id);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.to_bits().to_string());
    }

    #[test]
    fn test_index_space_stops_below_null() {
        assert_eq!(next_index(0), Ok(0));
        assert_eq!(next_index(u32::MAX as usize - 1), Ok(u32::MAX - 1));
        assert_eq!(next_index(u32::MAX as usize), Err(ComponentError::Exhausted));
        assert_eq!(next_index(usize::MAX), Err(ComponentError::Exhausted));
    }

    #[test]
    fn test_allocate_starts_at_generation_one() {
        let mut table = EntityTable::new();
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        assert_eq!((a.index(), a.generation()), (0, 1));
        assert_eq!((b.index(), b.generation()), (1, 1));
        assert_eq!(table.len(), 2);
        assert!(table.resolve(a));
        assert!(table.resolve(b));
    }

    #[test]
    fn test_recycled_index_bumps_generation() {
        let mut table = EntityTable::new();
        let old = table.allocate().unwrap();
        table.free(old).unwrap();
        assert!(!table.resolve(old));

        let new = table.allocate().unwrap();
        assert_eq!(new.index(), old.index());
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(table.resolve(new));
        assert!(!table.resolve(old), "stale handle must not resolve to the reused slot");
    }

    #[test]
    fn test_free_stale_is_rejected() {
        let mut table = EntityTable::new();
        let id = table.allocate().unwrap();
        table.free(id).unwrap();
        assert!(matches!(
            table.free(id),
            Err(ComponentError::StaleEntity { .. })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_resolve_unknown_index() {
        let table = EntityTable::new();
        assert!(!table.resolve(EntityId::new(3, 1)));
        assert!(!table.resolve(EntityId::NULL));
    }
}
