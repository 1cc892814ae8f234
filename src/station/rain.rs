use std::sync::Arc;

use chrono::NaiveDate;
use log::info;

use super::pulse::PulseCounter;
use super::round_to;

/// Inches of rain per bucket tip.
pub const DEFAULT_BUCKET_SIZE: f64 = 0.011;

/// Tipping-bucket gauge whose total runs for one local calendar day.
pub struct RainGauge {
    tips: Arc<PulseCounter>,
    bucket_size: f64,
    day: Option<NaiveDate>,
}

impl RainGauge {
    pub fn new(tips: Arc<PulseCounter>, bucket_size: f64) -> RainGauge {
        RainGauge {
            tips,
            bucket_size,
            day: None,
        }
    }

    /// Inches of rain since the last rollover, rounded to 4 decimals.
    pub fn precipitation(&self) -> f64 {
        round_to(self.tips.read() as f64 * self.bucket_size, 4)
    }

    /// Clears the total the first time it is called on a new calendar day.
    /// The first call only remembers the date. Returns whether it reset.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        match self.day {
            Some(day) if day != today => {
                info!("Resetting the accumulated rainfall");
                self.tips.reset();
                self.day = Some(today);
                true
            }
            Some(_) => false,
            None => {
                self.day = Some(today);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn total_is_tips_times_bucket() {
        let tips = Arc::new(PulseCounter::new());
        let gauge = RainGauge::new(tips.clone(), DEFAULT_BUCKET_SIZE);
        assert_eq!(gauge.precipitation(), 0.0);
        for _ in 0..3 {
            tips.on_edge();
        }
        assert_eq!(gauge.precipitation(), 0.033);
    }

    #[test]
    fn resets_once_per_new_day() {
        let tips = Arc::new(PulseCounter::new());
        let mut gauge = RainGauge::new(tips.clone(), DEFAULT_BUCKET_SIZE);

        assert!(!gauge.roll_over(date(1)));
        tips.on_edge();
        assert!(!gauge.roll_over(date(1)));
        assert_eq!(gauge.precipitation(), 0.011);

        assert!(gauge.roll_over(date(2)));
        assert_eq!(gauge.precipitation(), 0.0);
        tips.on_edge();
        assert!(!gauge.roll_over(date(2)));
        assert_eq!(gauge.precipitation(), 0.011);
    }
}
