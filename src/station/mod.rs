pub mod anemometer;
pub mod atmosphere;
pub mod circular;
pub mod hardware;
pub mod pulse;
pub mod rain;
pub mod station;
pub mod vane;

use chrono::{DateTime, Local};

/// The 16 points of the compass, in ascending heading order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindDirection {
    North,
    NorthNorthEast,
    NorthEast,
    EastNorthEast,
    East,
    EastSouthEast,
    SouthEast,
    SouthSouthEast,
    South,
    SouthSouthWest,
    SouthWest,
    WestSouthWest,
    West,
    WestNorthWest,
    NorthWest,
    NorthNorthWest,
}

impl WindDirection {
    pub const ALL: [WindDirection; 16] = [
        WindDirection::North,
        WindDirection::NorthNorthEast,
        WindDirection::NorthEast,
        WindDirection::EastNorthEast,
        WindDirection::East,
        WindDirection::EastSouthEast,
        WindDirection::SouthEast,
        WindDirection::SouthSouthEast,
        WindDirection::South,
        WindDirection::SouthSouthWest,
        WindDirection::SouthWest,
        WindDirection::WestSouthWest,
        WindDirection::West,
        WindDirection::WestNorthWest,
        WindDirection::NorthWest,
        WindDirection::NorthNorthWest,
    ];

    pub fn heading(&self) -> f64 {
        *self as u8 as f64 * 22.5
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindDirection::North => "N",
            WindDirection::NorthNorthEast => "NNE",
            WindDirection::NorthEast => "NE",
            WindDirection::EastNorthEast => "ENE",
            WindDirection::East => "E",
            WindDirection::EastSouthEast => "ESE",
            WindDirection::SouthEast => "SE",
            WindDirection::SouthSouthEast => "SSE",
            WindDirection::South => "S",
            WindDirection::SouthSouthWest => "SSW",
            WindDirection::SouthWest => "SW",
            WindDirection::WestSouthWest => "WSW",
            WindDirection::West => "W",
            WindDirection::WestNorthWest => "WNW",
            WindDirection::NorthWest => "NW",
            WindDirection::NorthNorthWest => "NNW",
        }
    }

    /// Nearest compass point by plain absolute difference of headings.
    /// Ties resolve to the first (lower) heading; 350° and above map to NNW,
    /// not N, because the table is not treated as circular.
    pub fn nearest(angle: f64) -> WindDirection {
        let mut best = WindDirection::North;
        let mut best_diff = f64::INFINITY;
        for dir in WindDirection::ALL {
            let diff = (dir.heading() - angle).abs();
            if diff < best_diff {
                best = dir;
                best_diff = diff;
            }
        }
        best
    }
}

/// Default BCM pin numbers of the station wiring.
#[derive(Clone, Copy, Debug)]
pub enum StationPin {
    Anemometer = 5,
    RainGauge = 6,
}

/// One accumulation tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub angle_degrees: f64,
    pub speed_mph: f64,
}

/// Reduced output of one logging interval.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub sequence_number: u64,
    pub timestamp: DateTime<Local>,
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_dir_degrees: f64,
    pub wind_dir_string: &'static str,
    pub wind_speed_avg: f64,
    pub wind_gust_max: f64,
    pub precipitation_total: f64,
    pub sample_count: usize,
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_are_spaced_by_22_5_degrees() {
        for (i, dir) in WindDirection::ALL.iter().enumerate() {
            assert_eq!(dir.heading(), i as f64 * 22.5);
        }
    }

    #[test]
    fn nearest_name_lookup() {
        assert_eq!(WindDirection::nearest(0.0).as_str(), "N");
        assert_eq!(WindDirection::nearest(91.0).as_str(), "E");
        assert_eq!(WindDirection::nearest(200.0).as_str(), "SSW");
        assert_eq!(WindDirection::nearest(355.0).as_str(), "NNW");
    }

    #[test]
    fn nearest_name_tie_goes_to_lower_heading() {
        assert_eq!(WindDirection::nearest(11.25), WindDirection::North);
        assert_eq!(WindDirection::nearest(101.25), WindDirection::East);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(3.0 * 0.011, 4), 0.033);
    }
}
