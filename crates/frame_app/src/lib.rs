//! # frame_app
//!
//! The frame driver: a [`World`](world::World) of entities and component
//! systems, and the [`TickLoop`](tick::TickLoop) that builds and runs one job
//! graph per frame.

pub mod error;
pub mod tick;
pub mod world;

pub use error::TickError;
pub use tick::{TickConfig, TickLoop};
pub use world::World;
