use serde::{Deserialize, Serialize};

use agentspace_common::{Agent, Coordinate, GameType, Hazard, HazardCategory, Target, Task};

use crate::allocation::Allocation;

/// Wire record for one hazard hit. The decay rate is internal and omitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub location: Coordinate,
    pub weight: f64,
}

/// Hazard hits keyed by category code, as consumed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardHitsSnapshot {
    #[serde(rename = "-1")]
    pub transient: Vec<HitRecord>,
    #[serde(rename = "0")]
    pub fire: Vec<HitRecord>,
    #[serde(rename = "1")]
    pub debris: Vec<HitRecord>,
}

impl HazardHitsSnapshot {
    pub fn category(&self, category: HazardCategory) -> &[HitRecord] {
        match category {
            HazardCategory::Transient => &self.transient,
            HazardCategory::Fire => &self.fire,
            HazardCategory::Debris => &self.debris,
        }
    }

    pub fn total(&self) -> usize {
        self.transient.len() + self.fire.len() + self.debris.len()
    }
}

/// Point-in-time copy of the whole session, decoupled from internal storage.
///
/// Each part is read under its own lock, so the snapshot is consistent per
/// component but not across components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub game_id: Option<String>,
    pub game_description: Option<String>,
    pub game_type: GameType,
    pub game_centre: Option<Coordinate>,
    pub allocation_method: String,
    pub flocking_enabled: bool,
    pub time: f64,
    pub edit_mode: bool,
    pub in_progress: bool,
    pub prov_doc: Option<String>,
    pub allocation_undo_available: bool,
    pub allocation_redo_available: bool,
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    pub completed_tasks: Vec<Task>,
    pub targets: Vec<Target>,
    pub hazards: Vec<Hazard>,
    pub allocation: Allocation,
    pub temp_allocation: Allocation,
    pub dropped_allocation: Allocation,
    pub hazard_hits: HazardHitsSnapshot,
}
