use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Agent id to task id.
pub type Allocation = BTreeMap<String, String>;

/// Which of the three allocation tables an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationTable {
    /// Committed assignments visible to all consumers.
    Confirmed,
    /// Work-in-progress assignments awaiting user confirmation.
    Provisional,
    /// Assignments synthesized for agents that dropped out.
    Dropped,
}

/// The three independent agent-to-task tables.
///
/// An agent id appears at most once per table but may appear in several
/// tables at once while an allocation is in transition. Tables are only ever
/// replaced wholesale; the allocator computes complete mappings upstream.
#[derive(Debug, Clone, Default)]
pub struct AllocationTables {
    confirmed: Allocation,
    provisional: Allocation,
    dropped: Allocation,
}

impl AllocationTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: AllocationTable) -> &Allocation {
        match table {
            AllocationTable::Confirmed => &self.confirmed,
            AllocationTable::Provisional => &self.provisional,
            AllocationTable::Dropped => &self.dropped,
        }
    }

    /// Install `mapping` as the whole table. `None` clears it.
    pub fn replace(&mut self, table: AllocationTable, mapping: Option<Allocation>) {
        *self.slot(table) = mapping.unwrap_or_default();
    }

    pub fn clear(&mut self) {
        self.confirmed.clear();
        self.provisional.clear();
        self.dropped.clear();
    }

    fn slot(&mut self, table: AllocationTable) -> &mut Allocation {
        match table {
            AllocationTable::Confirmed => &mut self.confirmed,
            AllocationTable::Provisional => &mut self.provisional,
            AllocationTable::Dropped => &mut self.dropped,
        }
    }
}
