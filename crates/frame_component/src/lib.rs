//! # frame_component
//!
//! Storage and declarations the frame scheduler operates on.
//!
//! This crate provides:
//!
//! - [`EntityId`]: versioned `(index, generation)` entity handles.
//! - [`EntityTable`]: allocation with index recycling.
//! - [`ComponentStore`]: dense per-type storage with an entity → slot index.
//! - [`TaskDescriptor`]: declared read/write access of an update task.

pub mod entity;
pub mod error;
pub mod store;
pub mod task;

pub use entity::{EntityId, EntityTable};
pub use error::{ComponentError, DescriptorError};
pub use store::{ComponentStore, SlotRef};
pub use task::{Dependency, Direction, Phase, SELF_RESOURCE, Scope, TaskDescriptor};
