//! Task descriptors: declarative data access for component update routines.
//!
//! A component type publishes one [`TaskDescriptor`] per phase it wants to run
//! in. Each descriptor lists the data the task touches as ordered
//! [`Dependency`] entries. The frame scheduler turns these declarations into
//! hazard edges; the task bodies themselves never lock anything.
//!
//! Descriptors are plain data. They are usually produced by a code generator,
//! so they also deserialise from JSON:
//!
//! ```json
//! { "name": "Update",
//!   "dependencies": [
//!     { "direction": "inout", "scope": "self", "resource": "_" },
//!     { "direction": "in", "scope": "named-component", "resource": "Transform" } ] }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

/// Resource name the generator writes for `self` dependencies.
pub const SELF_RESOURCE: &str = "_";

/// The fixed stages of a frame, run strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    PreUpdate,
    Update,
    PostUpdate,
}

impl Phase {
    /// Every phase in frame order.
    pub const ALL: [Phase; 3] = [Phase::PreUpdate, Phase::Update, Phase::PostUpdate];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::PreUpdate => "PreUpdate",
            Phase::Update => "Update",
            Phase::PostUpdate => "PostUpdate",
        }
    }

    /// Exact, case-sensitive match against a task name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.as_str() == name)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a task accesses a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    InOut,
}

impl Direction {
    /// `out` and `inout` make the task the resource's writer of record.
    #[must_use]
    pub const fn writes(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
        }
    }
}

impl FromStr for Direction {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "inout" => Ok(Direction::InOut),
            other => Err(DescriptorError::UnknownDirection(other.to_string())),
        }
    }
}

/// Which resource a dependency resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The task's own component, for the entity being processed.
    #[serde(rename = "self")]
    Own,
    /// The shared per-frame context. Read-only, never a hazard.
    #[serde(rename = "context")]
    Context,
    /// Another component type, accessed per entity.
    #[serde(rename = "named-component")]
    Named,
    /// Every instance of the task's own component type.
    #[serde(rename = "all-of-own-type")]
    AllOwn,
}

impl Scope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::Own => "self",
            Scope::Context => "context",
            Scope::Named => "named-component",
            Scope::AllOwn => "all-of-own-type",
        }
    }
}

impl FromStr for Scope {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(Scope::Own),
            "context" => Ok(Scope::Context),
            "named-component" => Ok(Scope::Named),
            "all-of-own-type" => Ok(Scope::AllOwn),
            other => Err(DescriptorError::UnknownScope(other.to_string())),
        }
    }
}

/// One declared access of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub direction: Direction,
    pub scope: Scope,
    /// Component type name the access resolves against. Ignored for `self`,
    /// `all-of-own-type`, and `context`.
    #[serde(default)]
    pub resource: String,
    /// Declared parameter name, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl Dependency {
    #[must_use]
    pub fn new(direction: Direction, scope: Scope, resource: impl Into<String>) -> Self {
        Self {
            direction,
            scope,
            resource: resource.into(),
            param: None,
        }
    }

    /// Attach the declared parameter name.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Parse the textual `(direction, scope, resource)` triple a generator
    /// emits.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] for an unknown direction or scope spelling.
    pub fn parse(direction: &str, scope: &str, resource: &str) -> Result<Self, DescriptorError> {
        Ok(Self::new(direction.parse()?, scope.parse()?, resource))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction.as_str(), self.scope.as_str())?;
        if self.scope == Scope::Named {
            write!(f, " {}", self.resource)?;
        }
        if let Some(param) = &self.param {
            write!(f, " ({param})")?;
        }
        Ok(())
    }
}

/// A named task and the ordered list of data it accesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Matched exactly against [`Phase::as_str`]; other names never run.
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl TaskDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Descriptor for one of the fixed phases.
    #[must_use]
    pub fn for_phase(phase: Phase) -> Self {
        Self::new(phase.as_str())
    }

    /// The phase this task runs in, if its name is a phase name.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        Phase::from_name(&self.name)
    }

    #[must_use]
    pub fn depends(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// `direction self`: the task's own component for the current entity.
    #[must_use]
    pub fn own(self, direction: Direction) -> Self {
        self.depends(Dependency::new(direction, Scope::Own, SELF_RESOURCE))
    }

    /// `in context`.
    #[must_use]
    pub fn context(self) -> Self {
        self.depends(Dependency::new(Direction::In, Scope::Context, ""))
    }

    /// `direction named-component <resource>`.
    #[must_use]
    pub fn component(self, direction: Direction, resource: impl Into<String>) -> Self {
        self.depends(Dependency::new(direction, Scope::Named, resource))
    }

    /// `direction all-of-own-type`.
    #[must_use]
    pub fn all_own(self, direction: Direction) -> Self {
        self.depends(Dependency::new(direction, Scope::AllOwn, SELF_RESOURCE))
    }

    /// Checks the structural rules a descriptor must satisfy before it is
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MissingResource`] if a named-component
    /// dependency has no resource name.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        for dep in &self.dependencies {
            if dep.scope == Scope::Named && dep.resource.trim().is_empty() {
                return Err(DescriptorError::MissingResource {
                    task: self.name.clone(),
                });
            }
        }
        Ok(())
    }
}
