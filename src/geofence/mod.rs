use serde::{Deserialize, Serialize};

/// Rectangular service-area bounds in decimal degrees.
///
/// Deliberately a flat closed-interval containment check in both axes —
/// no geodesic correction. The service area is a few kilometres across;
/// treating latitude/longitude as a plane is accurate enough here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeofenceBounds {
    #[serde(rename = "minLat")]
    pub min_lat: f64,
    #[serde(rename = "maxLat")]
    pub max_lat: f64,
    #[serde(rename = "minLon")]
    pub min_lon: f64,
    #[serde(rename = "maxLon")]
    pub max_lon: f64,
}

impl GeofenceBounds {
    /// True iff both coordinates fall within the configured bounds,
    /// boundary included.
    pub fn in_service_area(&self, lat: f64, lon: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lon <= lon && lon <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> GeofenceBounds {
        GeofenceBounds {
            min_lat: 7.85,
            max_lat: 8.0,
            min_lon: 38.0,
            max_lon: 38.2,
        }
    }

    #[test]
    fn all_four_corners_are_inside() {
        let b = bounds();
        assert!(b.in_service_area(b.min_lat, b.min_lon));
        assert!(b.in_service_area(b.min_lat, b.max_lon));
        assert!(b.in_service_area(b.max_lat, b.min_lon));
        assert!(b.in_service_area(b.max_lat, b.max_lon));
    }

    #[test]
    fn one_unit_outside_any_single_bound_is_rejected() {
        let b = bounds();
        assert!(!b.in_service_area(b.min_lat - 1.0, 38.1));
        assert!(!b.in_service_area(b.max_lat + 1.0, 38.1));
        assert!(!b.in_service_area(7.9, b.min_lon - 1.0));
        assert!(!b.in_service_area(7.9, b.max_lon + 1.0));
    }

    #[test]
    fn interior_point_is_inside() {
        assert!(bounds().in_service_area(7.9, 38.1));
    }
}
