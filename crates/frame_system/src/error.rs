//! Registry error types.

use frame_component::{ComponentError, DescriptorError};

/// Errors raised by [`SystemRegistry`](crate::SystemRegistry) operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A system with this name, or for this component type, already exists.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// No system is registered under this name.
    #[error("no system named `{0}` is registered")]
    UnknownSystem(String),

    /// One of the system's task descriptors failed validation.
    #[error("system `{system}` declares an invalid task: {source}")]
    InvalidDescriptor {
        system: String,
        #[source]
        source: DescriptorError,
    },

    /// Two task descriptors of one system name the same phase.
    #[error("system `{system}` declares more than one `{task}` task")]
    DuplicateTask { system: String, task: String },

    /// The underlying store rejected the operation.
    #[error(transparent)]
    Component(#[from] ComponentError),
}
