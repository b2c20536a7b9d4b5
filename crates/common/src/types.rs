use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of decimal places hazard hits are snapped to (~11 m at the equator).
pub const GRID_PRECISION: u32 = 4;

/// Opaque, immutable identifier for an entity in the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Snap to the grid cell at `precision` decimal places.
    pub fn grid_key(&self, precision: u32) -> GridKey {
        let scale = 10f64.powi(precision as i32);
        GridKey {
            lat: round_half_up(self.latitude * scale),
            lng: round_half_up(self.longitude * scale),
        }
    }
}

/// Rounded grid cell used to deduplicate nearby points.
///
/// Stored as scaled integers so that two coordinates share a cell exactly when
/// their rounded decimal values are equal, without comparing floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey {
    pub lat: i64,
    pub lng: i64,
}

impl GridKey {
    pub fn new(lat: i64, lng: i64) -> Self {
        Self { lat, lng }
    }

    /// Cell centre as a coordinate at the given precision.
    pub fn to_coordinate(self, precision: u32) -> Coordinate {
        let scale = 10f64.powi(precision as i32);
        Coordinate::new(self.lat as f64 / scale, self.lng as f64 / scale)
    }
}

// Ties go towards positive infinity, so -0.5 rounds to 0 rather than -1.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn entity_id_serializes_as_plain_string() {
        let id = EntityId::from("UAV-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"UAV-1\"");
        assert_eq!(id.to_string(), "UAV-1");
    }

    #[test]
    fn grid_key_rounds_to_four_places() {
        let a = Coordinate::new(10.00001, 20.00009).grid_key(GRID_PRECISION);
        assert_eq!(a, GridKey::new(100_000, 200_001));

        let b = Coordinate::new(10.00004, 20.00004).grid_key(GRID_PRECISION);
        assert_eq!(b, GridKey::new(100_000, 200_000));
        assert_ne!(a, b);
    }

    #[test]
    fn nearby_points_share_a_cell() {
        let a = Coordinate::new(10.00001, 20.00001).grid_key(GRID_PRECISION);
        let b = Coordinate::new(10.00004, 20.00004).grid_key(GRID_PRECISION);
        assert_eq!(a, b);
    }

    #[test]
    fn negative_coordinates_round_half_up() {
        let key = Coordinate::new(-0.00005, -1.00004).grid_key(GRID_PRECISION);
        assert_eq!(key, GridKey::new(0, -10_000));
    }

    #[test]
    fn grid_key_back_to_coordinate() {
        let c = GridKey::new(100_000, 200_001).to_coordinate(GRID_PRECISION);
        assert!((c.latitude - 10.0).abs() < 1e-12);
        assert!((c.longitude - 20.0001).abs() < 1e-12);
    }
}
