use std::f64::consts::TAU;

use crate::error::MapError;

/// Distance, in degrees, between a fanned-out entity and the shared coordinate.
pub const OFFSET_RADIUS: f64 = 2.0;

/// Deterministic position of slot `slot_index` out of `group_size` co-located
/// entities: evenly spaced on a circle of [`OFFSET_RADIUS`] around the shared
/// coordinate, starting due east. A lone entity is not offset.
pub fn offset(slot_index: usize, group_size: usize) -> Result<(f64, f64), MapError> {
    if group_size == 0 {
        return Err(MapError::InvalidArgument("group size must be at least 1"));
    }
    if group_size == 1 {
        return Ok((0.0, 0.0));
    }
    let angle = slot_index as f64 / group_size as f64 * TAU;
    Ok((angle.cos() * OFFSET_RADIUS, angle.sin() * OFFSET_RADIUS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_member_not_offset() {
        assert_eq!(offset(0, 1), Ok((0.0, 0.0)));
    }

    #[test]
    fn test_zero_group_size_rejected() {
        assert!(matches!(offset(0, 0), Err(MapError::InvalidArgument(_))));
    }

    #[test]
    fn test_offsets_on_circle_and_distinct() {
        for n in 2..=12 {
            let offsets: Vec<(f64, f64)> = (0..n).map(|i| offset(i, n).unwrap()).collect();
            for &(dx, dy) in &offsets {
                assert_relative_eq!(dx.hypot(dy), OFFSET_RADIUS, epsilon = 1e-12);
            }
            for a in 0..n {
                for b in (a + 1)..n {
                    let (ax, ay) = offsets[a];
                    let (bx, by) = offsets[b];
                    assert!((ax - bx).hypot(ay - by) > 1e-6, "slots {a} and {b} of {n} overlap");
                }
            }
        }
    }

    #[test]
    fn test_offsets_are_stable() {
        assert_eq!(offset(3, 7), offset(3, 7));
        let (dx, dy) = offset(1, 4).unwrap();
        assert_relative_eq!(dx, 0.0, epsilon = 1e-12);
        assert_relative_eq!(dy, OFFSET_RADIUS, epsilon = 1e-12);
    }
}
