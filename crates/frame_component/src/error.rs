//! Storage and descriptor error types.

use crate::entity::EntityId;

/// Errors raised by entity and component storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// The entity already owns a slot in this store.
    #[error("{entity} already has a component in this store")]
    DuplicateAttach { entity: EntityId },

    /// The handle's generation does not match the live entity at its index.
    #[error("{entity} is stale or was never allocated")]
    StaleEntity { entity: EntityId },
    /// Every entity index is in use.
    #[error("entity index space exhausted")]
    Exhausted,
}

/// Errors raised while parsing or validating a task descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// The dependency direction is not one of `in`, `out`, `inout`.
    #[error("unknown dependency direction `{0}`")]
    UnknownDirection(String),

    /// The dependency scope is not one of the recognised scopes.
    #[error("unknown dependency scope `{0}`")]
    UnknownScope(String),

    /// A named-component dependency did not say which component it reads.
    #[error("task `{task}` has a named-component dependency without a resource name")]
    MissingResource { task: String },
}
