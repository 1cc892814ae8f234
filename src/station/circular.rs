//! Mean of compass headings.
//!
//! Headings are averaged as unit vectors: the arithmetic mean of 350° and 10°
//! is 180°, the direction the wind was never blowing from.

/// Mean vector components smaller than this are treated as exact zeros.
const ZERO_EPSILON: f64 = 1e-12;

/// Circular mean of `angles` in degrees, in `[0, 360)`.
///
/// Returns `0.0` for an empty slice and for inputs whose vectors cancel out
/// (e.g. `[0, 180]`); in both cases the value is a sentinel, not a heading.
pub fn average(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }

    let (sin_sum, cos_sum) = angles.iter().fold((0.0, 0.0), |(s, c), angle| {
        let r = angle.to_radians();
        (s + r.sin(), c + r.cos())
    });

    let count = angles.len() as f64;
    let s = snap_to_zero(sin_sum / count);
    let c = snap_to_zero(cos_sum / count);

    if s == 0.0 && c == 0.0 {
        return 0.0;
    }

    let mut mean = s.atan2(c).to_degrees();
    if mean < 0.0 {
        mean += 360.0;
    }

    if mean >= 360.0 {
        0.0
    } else {
        mean
    }
}

fn snap_to_zero(value: f64) -> f64 {
    if value.abs() < ZERO_EPSILON {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn angular_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn empty_is_sentinel_zero() {
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn wraparound_pair_averages_to_north() {
        assert_eq!(average(&[350.0, 10.0]), 0.0);
        assert_eq!(average(&[10.0, 350.0]), 0.0);
        assert_eq!(average(&[337.5, 22.5, 0.0]), 0.0);
    }

    #[test]
    fn quadrants() {
        assert!((average(&[30.0, 60.0]) - 45.0).abs() < 1e-9);
        assert!((average(&[120.0, 150.0]) - 135.0).abs() < 1e-9);
        assert!((average(&[210.0, 240.0]) - 225.0).abs() < 1e-9);
        assert!((average(&[300.0, 330.0]) - 315.0).abs() < 1e-9);
    }

    #[test]
    fn axis_cases() {
        assert!((average(&[90.0]) - 90.0).abs() < 1e-9);
        assert!((average(&[180.0]) - 180.0).abs() < 1e-9);
        assert!((average(&[270.0]) - 270.0).abs() < 1e-9);
        assert!((average(&[170.0, 190.0]) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn opposite_headings_cancel_to_sentinel() {
        assert_eq!(average(&[0.0, 180.0]), 0.0);
        assert_eq!(average(&[90.0, 270.0]), 0.0);
    }

    #[test]
    fn result_is_never_360() {
        assert_eq!(average(&[359.9999999999999]), 0.0);
        assert_eq!(average(&[360.0]), 0.0);
    }

    proptest! {
        #[test]
        fn constant_sequence_averages_to_itself(a in 0.0f64..360.0, n in 1usize..50) {
            let angles = vec![a; n];
            let mean = average(&angles);
            prop_assert!((0.0..360.0).contains(&mean));
            prop_assert!(angular_distance(mean, a) < 1e-6, "a = {}, mean = {}", a, mean);
        }

        #[test]
        fn symmetric_about_north_averages_to_zero(d in 0.0f64..80.0) {
            let mean = average(&[360.0 - d, d]);
            prop_assert!(angular_distance(mean, 0.0) < 1e-9, "d = {}, mean = {}", d, mean);
        }

        #[test]
        fn result_in_range(angles in proptest::collection::vec(0.0f64..360.0, 0..40)) {
            let mean = average(&angles);
            prop_assert!((0.0..360.0).contains(&mean));
        }
    }
}
