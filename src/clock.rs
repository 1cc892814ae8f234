use std::time::Duration;

use chrono::{DateTime, Local};

/// Wall clock and sleeping, abstracted so the sampling loop can run without real time passing.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
    fn sleep(&self, duration: Duration);
}

/// The system clock. On the station this is backed by the RTC when offline.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
