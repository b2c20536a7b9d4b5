use serde::{Deserialize, Serialize};

use agentspace_common::GRID_PRECISION;

/// Session-wide tuning knobs. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Weight lost per tick by transient hazard hits. A fresh hit starts at 1.
    pub transient_decay_rate: f64,
    /// Allocation method name restored on reset.
    pub default_allocation_method: String,
    /// Decimal places hazard hit coordinates are rounded to for deduplication.
    pub grid_precision: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transient_decay_rate: 0.001,
            default_allocation_method: "maxsum".to_owned(),
            grid_precision: GRID_PRECISION,
        }
    }
}
