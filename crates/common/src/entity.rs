use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Coordinate, EntityId};

/// Anything stored in a registry: carries a unique, immutable id.
pub trait Identified {
    fn id(&self) -> &EntityId;
}

/// Explicit variant tag used to route an entity to its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Agent,
    Task,
    Target,
    Hazard,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Agent => "agent",
            Self::Task => "task",
            Self::Target => "target",
            Self::Hazard => "hazard",
        };
        f.write_str(name)
    }
}

/// A simulated agent (UAV, ground unit, ...).
///
/// The id is fixed at construction; read it through [`Identified::id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    id: EntityId,
    pub location: Coordinate,
    /// Heading in degrees clockwise from north.
    pub heading: f64,
    /// Set when the agent has dropped out of contact.
    pub timed_out: bool,
}

impl Agent {
    pub fn new(location: Coordinate, heading: f64) -> Self {
        Self::with_id(EntityId::new(), location, heading)
    }

    pub fn with_id(id: EntityId, location: Coordinate, heading: f64) -> Self {
        Self {
            id,
            location,
            heading,
            timed_out: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: EntityId,
    pub location: Coordinate,
}

impl Task {
    pub fn new(location: Coordinate) -> Self {
        Self::with_id(EntityId::new(), location)
    }

    pub fn with_id(id: EntityId, location: Coordinate) -> Self {
        Self { id, location }
    }
}

/// A scenario target, only present in scenario games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    id: EntityId,
    pub location: Coordinate,
}

impl Target {
    pub fn new(location: Coordinate) -> Self {
        Self::with_id(EntityId::new(), location)
    }

    pub fn with_id(id: EntityId, location: Coordinate) -> Self {
        Self { id, location }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    id: EntityId,
    pub location: Coordinate,
    pub category: HazardCategory,
}

impl Hazard {
    pub fn new(location: Coordinate, category: HazardCategory) -> Self {
        Self::with_id(EntityId::new(), location, category)
    }

    pub fn with_id(id: EntityId, location: Coordinate, category: HazardCategory) -> Self {
        Self {
            id,
            location,
            category,
        }
    }
}

macro_rules! impl_identified {
    ($($ty:ty),*) => {
        $(impl Identified for $ty {
            fn id(&self) -> &EntityId {
                &self.id
            }
        })*
    };
}

impl_identified!(Agent, Task, Target, Hazard);

/// One entity of any variant, tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Agent(Agent),
    Task(Task),
    Target(Target),
    Hazard(Hazard),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Agent(_) => EntityKind::Agent,
            Self::Task(_) => EntityKind::Task,
            Self::Target(_) => EntityKind::Target,
            Self::Hazard(_) => EntityKind::Hazard,
        }
    }
}

impl Identified for Entity {
    fn id(&self) -> &EntityId {
        match self {
            Self::Agent(a) => a.id(),
            Self::Task(t) => t.id(),
            Self::Target(t) => t.id(),
            Self::Hazard(h) => h.id(),
        }
    }
}

impl From<Agent> for Entity {
    fn from(agent: Agent) -> Self {
        Self::Agent(agent)
    }
}

impl From<Task> for Entity {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

impl From<Target> for Entity {
    fn from(target: Target) -> Self {
        Self::Target(target)
    }
}

impl From<Hazard> for Entity {
    fn from(hazard: Hazard) -> Self {
        Self::Hazard(hazard)
    }
}

/// Returned when an integer hazard code has no matching category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised hazard category {0}")]
pub struct UnrecognizedCategory(pub i32);

/// Hazard categories tracked by the heat-map, with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum HazardCategory {
    /// Ephemeral detection with no confirmed hazard type (code -1). Decays.
    Transient,
    Fire,
    Debris,
}

impl HazardCategory {
    pub const ALL: [HazardCategory; 3] = [Self::Transient, Self::Fire, Self::Debris];

    pub fn code(self) -> i32 {
        match self {
            Self::Transient => -1,
            Self::Fire => 0,
            Self::Debris => 1,
        }
    }

    /// Whether hits in this category fade over time.
    pub fn decays(self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Dense index into per-category storage.
    pub fn index(self) -> usize {
        match self {
            Self::Transient => 0,
            Self::Fire => 1,
            Self::Debris => 2,
        }
    }
}

impl TryFrom<i32> for HazardCategory {
    type Error = UnrecognizedCategory;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Self::Transient),
            0 => Ok(Self::Fire),
            1 => Ok(Self::Debris),
            other => Err(UnrecognizedCategory(other)),
        }
    }
}

impl From<HazardCategory> for i32 {
    fn from(category: HazardCategory) -> Self {
        category.code()
    }
}

/// Session type: free-form sandbox or a scripted scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum GameType {
    #[default]
    Sandbox,
    Scenario,
}

/// Returned when an integer game type code has no matching variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised game type {0}")]
pub struct UnrecognizedGameType(pub i32);

impl TryFrom<i32> for GameType {
    type Error = UnrecognizedGameType;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Sandbox),
            1 => Ok(Self::Scenario),
            other => Err(UnrecognizedGameType(other)),
        }
    }
}

impl From<GameType> for i32 {
    fn from(game_type: GameType) -> Self {
        match game_type {
            GameType::Sandbox => 0,
            GameType::Scenario => 1,
        }
    }
}
