//! # frame_system
//!
//! Component systems and the registry the frame scheduler drives.
//!
//! This crate provides:
//!
//! - [`Component`]: what a component type implements to be scheduled.
//! - [`ComponentSystem`] / [`TypedSystem`]: polymorphic, owning wrappers
//!   around one component store.
//! - [`SystemRegistry`]: every registered system, reachable by name or type.
//! - [`FrameContext`]: read-only per-frame state handed to tasks.

pub mod context;
pub mod error;
pub mod registry;
pub mod system;

pub use context::FrameContext;
pub use error::RegistryError;
pub use registry::{SystemId, SystemRegistry};
pub use system::{Component, ComponentSystem, TypedSystem};
