//! Session kernel: the authoritative in-memory state of a live multi-agent
//! simulation session.
//!
//! # Invariants
//! - No two live entities of one variant share an id.
//! - Allocation tables are only ever replaced wholesale.
//! - At most one hazard hit per rounded grid cell per category.
//! - All mutations flow through [`WorldState`]; every operation either fully
//!   applies or is a no-op.

mod allocation;
mod config;
mod error;
mod hazard;
mod registry;
mod snapshot;
mod sync;
pub mod world;

pub use allocation::{Allocation, AllocationTable, AllocationTables};
pub use config::SessionConfig;
pub use error::StateError;
pub use hazard::{HazardHeatMap, HazardHit};
pub use registry::Registry;
pub use snapshot::{HazardHitsSnapshot, HitRecord, StateSnapshot};
pub use world::WorldState;

pub fn crate_info() -> &'static str {
    "agentspace-kernel v0.1.0"
}
