use std::f64::consts::PI;

const CM_IN_A_MILE: f64 = 160934.4;
const SECS_IN_AN_HOUR: f64 = 3600.0;

pub const DEFAULT_RADIUS_CM: f64 = 9.0;
/// Scales raw cup speed to the datasheet's 1.492 mph per closure per second.
pub const DEFAULT_CALIBRATION: f64 = 2.3589722140805094;

/// Converts half-rotation counts of a cup anemometer into miles per hour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedCalculator {
    radius_cm: f64,
    calibration: f64,
}

impl SpeedCalculator {
    pub fn new(radius_cm: f64, calibration: f64) -> SpeedCalculator {
        SpeedCalculator {
            radius_cm,
            calibration,
        }
    }

    pub fn circumference_cm(&self) -> f64 {
        2.0 * PI * self.radius_cm
    }

    /// `pulse_count` half rotations observed over `elapsed_seconds`.
    pub fn speed(&self, pulse_count: u64, elapsed_seconds: f64) -> f64 {
        if elapsed_seconds <= 0.0 {
            return 0.0;
        }

        let rotations = pulse_count as f64 / 2.0;
        let dist_mile = self.circumference_cm() * rotations / CM_IN_A_MILE;
        let miles_per_hour = dist_mile / elapsed_seconds * SECS_IN_AN_HOUR;

        miles_per_hour * self.calibration
    }
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        SpeedCalculator::new(DEFAULT_RADIUS_CM, DEFAULT_CALIBRATION)
    }
}
