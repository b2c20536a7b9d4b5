//! Hazard heat-map: per-category hits deduplicated on a rounded lat/lng grid.
//!
//! Each category partition maps a [`GridKey`] to the latest hit in that cell.
//! The grid key decides presence; the exact coordinate is kept only so the
//! rendered heat-map is smooth rather than blocky.
//!
//! # Invariants
//! - At most one live hit per grid cell per category.
//! - A new hit in an occupied cell replaces the old one (weight back to 1).
//! - Hits are removed once their weight drops below zero.
//! - Partitions are created once and only ever cleared in place.

use std::collections::BTreeMap;
use std::sync::Mutex;

use agentspace_common::{Coordinate, GridKey, HazardCategory};
use tracing::{debug, error, trace};

use crate::config::SessionConfig;
use crate::error::StateError;
use crate::snapshot::{HazardHitsSnapshot, HitRecord};
use crate::sync;

/// One detection at a location, fading by `decay_rate` per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardHit {
    pub location: Coordinate,
    pub weight: f64,
    pub decay_rate: f64,
}

impl HazardHit {
    fn fresh(location: Coordinate, decay_rate: f64) -> Self {
        Self {
            location,
            weight: 1.0,
            decay_rate,
        }
    }

    /// Apply one tick of decay. Returns true once the hit has expired.
    fn decay(&mut self) -> bool {
        self.weight -= self.decay_rate;
        self.weight < 0.0
    }
}

type Partition = BTreeMap<GridKey, HazardHit>;

/// Concurrency-safe heat-map with one lock per category partition.
///
/// Hits in different categories never contend. Hits landing in the same
/// category serialize on its partition, so same-cell writes are
/// last-write-wins in lock acquisition order.
#[derive(Debug)]
pub struct HazardHeatMap {
    precision: u32,
    transient_decay_rate: f64,
    partitions: [Mutex<Partition>; 3],
}

impl Default for HazardHeatMap {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl HazardHeatMap {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            precision: config.grid_precision,
            transient_decay_rate: config.transient_decay_rate,
            partitions: Default::default(),
        }
    }

    fn partition(&self, category: HazardCategory) -> &Mutex<Partition> {
        &self.partitions[category.index()]
    }

    fn decay_rate(&self, category: HazardCategory) -> f64 {
        if category.decays() {
            self.transient_decay_rate
        } else {
            0.0
        }
    }

    /// Register a hit for the hazard `code` at `location`.
    ///
    /// Returns true once the hit is stored. An unrecognized code changes
    /// nothing: it is logged at `error` level and reported to the caller as
    /// `false`.
    pub fn register_hit(&self, code: i32, location: Coordinate) -> bool {
        let category = match HazardCategory::try_from(code) {
            Ok(category) => category,
            Err(e) => {
                let err = StateError::from(e);
                error!(code, %err, "could not register hazard hit");
                return false;
            }
        };
        self.insert(category, location);
        true
    }

    /// Store a fresh hit, replacing whatever occupied the same cell.
    pub fn insert(&self, category: HazardCategory, location: Coordinate) {
        let key = location.grid_key(self.precision);
        let hit = HazardHit::fresh(location, self.decay_rate(category));
        let replaced = sync::lock(self.partition(category))
            .insert(key, hit)
            .is_some();
        debug!(?category, ?key, replaced, "hazard hit registered");
    }

    /// Advance every hit by one tick and drop the expired ones.
    ///
    /// Partitions are locked one at a time. Returns the number of hits removed.
    pub fn decay_tick(&self) -> usize {
        let mut removed = 0;
        for category in HazardCategory::ALL {
            let mut partition = sync::lock(self.partition(category));
            let before = partition.len();
            partition.retain(|_, hit| !hit.decay());
            removed += before - partition.len();
        }
        trace!(removed, "hazard hits decayed");
        removed
    }

    /// The hit occupying `location`'s grid cell, if any.
    pub fn hit_at(&self, category: HazardCategory, location: Coordinate) -> Option<HazardHit> {
        let key = location.grid_key(self.precision);
        sync::lock(self.partition(category)).get(&key).copied()
    }

    pub fn len_in(&self, category: HazardCategory) -> usize {
        sync::lock(self.partition(category)).len()
    }

    pub fn len(&self) -> usize {
        HazardCategory::ALL.iter().map(|c| self.len_in(*c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for partition in &self.partitions {
            sync::lock(partition).clear();
        }
    }

    /// Hits per category, ordered by grid cell.
    pub fn snapshot(&self) -> HazardHitsSnapshot {
        let records = |category| -> Vec<HitRecord> {
            sync::lock(self.partition(category))
                .values()
                .map(|hit| HitRecord {
                    location: hit.location,
                    weight: hit.weight,
                })
                .collect()
        };
        HazardHitsSnapshot {
            transient: records(HazardCategory::Transient),
            fire: records(HazardCategory::Fire),
            debris: records(HazardCategory::Debris),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TRANSIENT: i32 = -1;
    const FIRE: i32 = 0;
    const DEBRIS: i32 = 1;

    #[test]
    fn same_cell_hit_replaces_previous() {
        let map = HazardHeatMap::default();
        let first = Coordinate::new(10.00001, 20.00001);
        let second = Coordinate::new(10.00004, 20.00004);
        assert!(map.register_hit(TRANSIENT, first));
        for _ in 0..100 {
            map.decay_tick();
        }
        assert!(map.register_hit(TRANSIENT, second));

        assert_eq!(map.len_in(HazardCategory::Transient), 1);
        let hit = map.hit_at(HazardCategory::Transient, first).unwrap();
        assert_eq!(hit.location, second);
        assert_eq!(hit.weight, 1.0);
    }

    #[test]
    fn distinct_cells_are_kept_apart() {
        let map = HazardHeatMap::default();
        // Rounds to (10.0000, 20.0001) and (10.0000, 20.0000).
        map.register_hit(TRANSIENT, Coordinate::new(10.00001, 20.00009));
        map.register_hit(TRANSIENT, Coordinate::new(10.00004, 20.00004));
        assert_eq!(map.len_in(HazardCategory::Transient), 2);
    }

    #[test]
    fn same_cell_in_other_category_is_separate() {
        let map = HazardHeatMap::default();
        let loc = Coordinate::new(51.5, -0.12);
        map.register_hit(FIRE, loc);
        map.register_hit(DEBRIS, loc);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn unrecognized_category_is_a_noop() {
        let map = HazardHeatMap::default();
        assert!(!map.register_hit(7, Coordinate::new(1.0, 1.0)));
        assert!(map.is_empty());

        // A rejected code leaves an existing hit in the same cell alone.
        let loc = Coordinate::new(2.0, 2.0);
        assert!(map.register_hit(HazardCategory::Fire.code(), loc));
        for code in [-2, 2, i32::MAX] {
            assert!(!map.register_hit(code, loc));
        }
        assert_eq!(map.len(), 1);
        assert_eq!(map.hit_at(HazardCategory::Fire, loc).map(|h| h.weight), Some(1.0));
    }

    #[test]
    fn transient_hit_expires_after_1000_ticks() {
        let map = HazardHeatMap::default();
        let loc = Coordinate::new(10.0, 20.0);
        map.register_hit(TRANSIENT, loc);
        for _ in 0..999 {
            assert_eq!(map.decay_tick(), 0);
        }
        assert!(map.hit_at(HazardCategory::Transient, loc).is_some());
        assert_eq!(map.decay_tick(), 1);
        assert!(map.hit_at(HazardCategory::Transient, loc).is_none());
    }

    #[test]
    fn permanent_hits_never_decay() {
        let map = HazardHeatMap::default();
        map.register_hit(FIRE, Coordinate::new(1.0, 1.0));
        map.register_hit(DEBRIS, Coordinate::new(2.0, 2.0));
        for _ in 0..5000 {
            map.decay_tick();
        }
        assert_eq!(map.len(), 2);
        let hit = map.hit_at(HazardCategory::Fire, Coordinate::new(1.0, 1.0));
        assert_eq!(hit.map(|h| h.weight), Some(1.0));
    }

    #[test]
    fn custom_decay_rate_applies_to_transient_only() {
        let config = SessionConfig {
            transient_decay_rate: 0.5,
            ..SessionConfig::default()
        };
        let map = HazardHeatMap::new(&config);
        map.register_hit(TRANSIENT, Coordinate::new(0.0, 0.0));
        map.register_hit(FIRE, Coordinate::new(0.0, 0.0));
        map.decay_tick();
        map.decay_tick();
        assert_eq!(map.len_in(HazardCategory::Transient), 1);
        map.decay_tick();
        assert_eq!(map.len_in(HazardCategory::Transient), 0);
        assert_eq!(map.len_in(HazardCategory::Fire), 1);
    }

    #[test]
    fn clear_empties_all_partitions() {
        let map = HazardHeatMap::default();
        map.register_hit(TRANSIENT, Coordinate::new(0.0, 0.0));
        map.register_hit(FIRE, Coordinate::new(0.0, 0.0));
        map.register_hit(DEBRIS, Coordinate::new(0.0, 0.0));
        map.clear();
        assert!(map.is_empty());
        assert!(map.register_hit(FIRE, Coordinate::new(0.0, 0.0)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn snapshot_groups_by_category() {
        let map = HazardHeatMap::default();
        map.register_hit(FIRE, Coordinate::new(3.0, 3.0));
        map.register_hit(FIRE, Coordinate::new(1.0, 1.0));
        map.register_hit(TRANSIENT, Coordinate::new(2.0, 2.0));
        map.decay_tick();

        let snap = map.snapshot();
        assert_eq!(snap.fire.len(), 2);
        assert_eq!(snap.fire[0].location, Coordinate::new(1.0, 1.0));
        assert_eq!(snap.transient.len(), 1);
        assert!(snap.transient[0].weight < 1.0);
        assert!(snap.debris.is_empty());
    }

    #[test]
    fn concurrent_hits_across_cells() {
        let map = Arc::new(HazardHeatMap::default());
        std::thread::scope(|s| {
            for t in 0..4 {
                let map = Arc::clone(&map);
                s.spawn(move || {
                    for i in 0..250 {
                        let loc = Coordinate::new(t as f64, i as f64 * 0.001);
                        map.register_hit(FIRE, loc);
                    }
                });
            }
            let map = Arc::clone(&map);
            s.spawn(move || {
                for _ in 0..100 {
                    map.decay_tick();
                }
            });
        });
        assert_eq!(map.len_in(HazardCategory::Fire), 1000);
    }
}
