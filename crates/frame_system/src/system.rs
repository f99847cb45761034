//! The [`Component`] contract and its type-erased system wrapper.
//!
//! A component type supplies its task descriptor feed and a per-entity update
//! routine. [`TypedSystem`] owns the dense store for one
//! such type and exposes it to the registry as a [`ComponentSystem`] trait
//! object, so the scheduler can drive every system without knowing its type.

use std::any::Any;

use parking_lot::RwLock;

use frame_component::{
    ComponentError, ComponentStore, EntityId, Phase, Scope, SlotRef, TaskDescriptor,
};

use crate::context::FrameContext;
use crate::registry::SystemRegistry;

/// The contract every component type must satisfy.
///
/// # Examples
///
/// ```rust
/// use frame_component::{Direction, Phase, TaskDescriptor};
/// use frame_system::{Component, FrameContext, SystemRegistry};
///
/// #[derive(Debug, Default)]
/// struct Lifetime {
///     seconds: f32,
/// }
///
/// impl Component for Lifetime {
///     fn type_name() -> &'static str {
///         "Lifetime"
///     }
///
///     fn tasks() -> Vec<TaskDescriptor> {
///         vec![TaskDescriptor::for_phase(Phase::Update)
///             .own(Direction::InOut)
///             .context()]
///     }
///
///     fn update(&mut self, _phase: Phase, ctx: &FrameContext, _systems: &SystemRegistry) {
///         self.seconds += ctx.dt;
///     }
/// }
/// ```
pub trait Component: Default + Send + Sync + 'static {
    /// Name the system is registered under and that other tasks use in
    /// `named-component` dependencies.
    fn type_name() -> &'static str;

    /// The task descriptor feed. One descriptor per phase the type runs in.
    fn tasks() -> Vec<TaskDescriptor>;

    /// Per-entity update for a phase whose task declares a write to `self`
    /// or `all-of-own-type`. `ctx.this_entity` is the entity owning `self`.
    ///
    /// Only data covered by the matching descriptor may be touched through
    /// `systems`.
    fn update(&mut self, phase: Phase, ctx: &FrameContext, systems: &SystemRegistry) {
        let _ = (phase, ctx, systems);
    }

    /// Per-entity update for a phase whose task only reads its own type.
    /// The store is shared with other readers while this runs.
    fn update_ref(&self, phase: Phase, ctx: &FrameContext, systems: &SystemRegistry) {
        let _ = (phase, ctx, systems);
    }

    /// Whole-store update for a writing phase.
    ///
    /// The default walks the store in slot order and calls
    /// [`Component::update`] for each entity. Types whose tasks declare
    /// `all-of-own-type` access override this to range over every instance.
    fn run_phase(
        phase: Phase,
        store: &mut ComponentStore<Self>,
        ctx: &FrameContext,
        systems: &SystemRegistry,
    ) {
        store.for_each_slot(|entity, value| value.update(phase, &ctx.for_entity(entity), systems));
    }

    /// Whole-store update for a read-only phase. Calls
    /// [`Component::update_ref`] in slot order by default.
    fn run_phase_ref(
        phase: Phase,
        store: &ComponentStore<Self>,
        ctx: &FrameContext,
        systems: &SystemRegistry,
    ) {
        for (entity, value) in store.iter_slots() {
            value.update_ref(phase, &ctx.for_entity(entity), systems);
        }
    }
}

/// Type-erased view of one component system, as stored in the registry.
pub trait ComponentSystem: Send + Sync + 'static {
    /// Registered name.
    fn name(&self) -> &str;

    /// Number of component instances held.
    fn count(&self) -> usize;

    /// Validated task descriptors, in declaration order.
    fn tasks(&self) -> &[TaskDescriptor];

    /// Attach a default-initialised component to `entity`.
    fn attach(&self, entity: EntityId) -> Result<SlotRef, ComponentError>;

    /// Remove the entity's component. Returns `false` if it had none.
    fn detach(&self, entity: EntityId) -> bool;

    fn contains(&self, entity: EntityId) -> bool;

    /// Run this system's task for `phase` over its whole store.
    ///
    /// The store is locked for writing only if the task declares a write to
    /// its own type; otherwise it is locked shared.
    fn run_phase(&self, phase: Phase, ctx: &FrameContext, systems: &SystemRegistry);

    fn as_any(&self) -> &dyn Any;
}

/// Owning wrapper around the [`ComponentStore`] of one component type.
///
/// The store sits behind a [`RwLock`]. The frame graph orders every declared
/// conflicting access, so a correctly declared task never waits on it.
#[derive(Debug)]
pub struct TypedSystem<T: Component> {
    name: String,
    tasks: Vec<TaskDescriptor>,
    /// Indexed by `Phase as usize`.
    writes_own: [bool; Phase::ALL.len()],
    store: RwLock<ComponentStore<T>>,
}

impl<T: Component> TypedSystem<T> {
    /// Create an empty system named `name` with `T`'s task descriptors.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let tasks = T::tasks();
        let writes_own = Phase::ALL.map(|phase| {
            tasks
                .iter()
                .filter(|task| task.phase() == Some(phase))
                .flat_map(|task| &task.dependencies)
                .any(|dep| matches!(dep.scope, Scope::Own | Scope::AllOwn) && dep.direction.writes())
        });
        Self {
            name: name.into(),
            tasks,
            writes_own,
            store: RwLock::new(ComponentStore::new()),
        }
    }

    /// Whether the task for `phase` declares a write to its own store.
    #[must_use]
    pub fn writes_own(&self, phase: Phase) -> bool {
        self.writes_own[phase as usize]
    }

    #[must_use]
    pub fn store(&self) -> &RwLock<ComponentStore<T>> {
        &self.store
    }
}

impl<T: Component> ComponentSystem for TypedSystem<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self) -> usize {
        self.store.read().count()
    }

    fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    fn attach(&self, entity: EntityId) -> Result<SlotRef, ComponentError> {
        self.store.write().attach(entity)
    }

    fn detach(&self, entity: EntityId) -> bool {
        self.store.write().detach(entity).is_some()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.store.read().contains(entity)
    }

    fn run_phase(&self, phase: Phase, ctx: &FrameContext, systems: &SystemRegistry) {
        if self.writes_own(phase) {
            T::run_phase(phase, &mut self.store.write(), ctx, systems);
        } else {
            T::run_phase_ref(phase, &self.store.read(), ctx, systems);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
