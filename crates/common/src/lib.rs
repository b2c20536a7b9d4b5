//! Shared types for the agentspace session state: identifiers, coordinates,
//! grid cells and the entity variants held by the kernel.

mod entity;
mod types;

pub use entity::{
    Agent, Entity, EntityKind, GameType, Hazard, HazardCategory, Identified, Target, Task,
    UnrecognizedCategory, UnrecognizedGameType,
};
pub use types::{Coordinate, EntityId, GRID_PRECISION, GridKey};
