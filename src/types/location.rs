//! Geographic location shared by jobs, staff homes, and the travel oracle.

use serde::{Deserialize, Serialize};

/// A geocoded point plus the city tag used for soft batching rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both points round to the same coordinates, the case the
    /// travel oracle must still answer with a non-zero duration.
    pub fn is_same_point(&self, other: &Location) -> bool {
        (self.lat - other.lat).abs() < f64::EPSILON && (self.lon - other.lon).abs() < f64::EPSILON
    }
}

/// Case-folded city tag used by the constraint engine's batching rewards.
pub fn normalize_city_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_detects_identical_coordinates() {
        let a = Location::new(50.0755, 14.4378);
        let b = Location::new(50.0755, 14.4378);
        assert!(a.is_same_point(&b));
    }

    #[test]
    fn same_point_rejects_distinct_coordinates() {
        let a = Location::new(50.0755, 14.4378);
        let b = Location::new(49.2, 16.6);
        assert!(!a.is_same_point(&b));
    }

    #[test]
    fn normalize_city_tag_folds_case_and_trims() {
        assert_eq!(normalize_city_tag("  Prague "), "prague");
    }
}
