use std::fmt;

use super::map_tile::Coordinate;

/// Identity of a map location. Two coordinates share a key exactly when
/// their raw longitude and latitude values are equal; no rounding is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoKey {
    lng_bits: u64,
    lat_bits: u64,
}

impl GeoKey {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng_bits: canonical_bits(lng),
            lat_bits: canonical_bits(lat),
        }
    }

    pub fn lng(&self) -> f64 {
        f64::from_bits(self.lng_bits)
    }

    pub fn lat(&self) -> f64 {
        f64::from_bits(self.lat_bits)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lng(), self.lat())
    }
}

impl From<Coordinate> for GeoKey {
    fn from(coordinate: Coordinate) -> Self {
        GeoKey::new(coordinate.lng, coordinate.lat)
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng(), self.lat())
    }
}

// -0.0 == 0.0 numerically, so both must land on the same key.
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_coordinates_share_key() {
        assert_eq!(GeoKey::new(12.5, -3.25), GeoKey::new(12.5, -3.25));
        assert_eq!(GeoKey::new(-0.0, 0.0), GeoKey::new(0.0, -0.0));
        assert_eq!(GeoKey::new(1.0, 2.0).to_string(), "1,2");
    }

    #[test]
    fn test_distinct_coordinates_never_collide() {
        let coords = [
            (0.0, 0.0),
            (0.0, 1e-12),
            (1e-12, 0.0),
            (5.0, 5.0),
            (5.0, -5.0),
            (-5.0, 5.0),
            (179.999_999_9, 89.0),
            (180.0, 89.0),
        ];
        let keys: HashSet<GeoKey> = coords.iter().map(|&(lng, lat)| GeoKey::new(lng, lat)).collect();
        assert_eq!(keys.len(), coords.len());
        // Swapping the axes is a different place.
        assert_ne!(GeoKey::new(1.0, 2.0), GeoKey::new(2.0, 1.0));
    }

    #[test]
    fn test_nan_does_not_panic() {
        let key = GeoKey::new(f64::NAN, 0.0);
        assert!(key.lng().is_nan());
    }
}
