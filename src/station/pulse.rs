use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use log::debug;
use rppal::gpio::{Gpio, InputPin, Level, Trigger};

use crate::error::Result;

/// Tally of switch closures, shared between the interrupt thread and the main loop.
#[derive(Debug, Default)]
pub struct PulseCounter {
    count: AtomicU64,
}

impl PulseCounter {
    pub fn new() -> PulseCounter {
        PulseCounter {
            count: AtomicU64::new(0),
        }
    }

    pub fn on_edge(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn read(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }

    /// Reads and zeroes in one step, so an edge landing between the two is
    /// counted in exactly one measurement.
    pub fn take(&self) -> u64 {
        self.count.swap(0, Ordering::AcqRel)
    }
}

/// A reed-switch input whose falling edges feed a [`PulseCounter`].
///
/// Dropping it clears the interrupt, so it has to live as long as the station.
pub struct PulseInput {
    _pin: InputPin,
    counter: Arc<PulseCounter>,
}

impl PulseInput {
    pub fn bind(gpio: &Gpio, bcm_pin: u8, name: &'static str) -> Result<PulseInput> {
        let counter = Arc::new(PulseCounter::new());

        //the switch closes to ground, so a closure is a falling edge on a pulled-up line
        let mut pin = gpio.get(bcm_pin)?.into_input_pullup();
        let callback_counter = counter.clone();
        pin.set_async_interrupt(Trigger::FallingEdge, move |level: Level| {
            callback_counter.on_edge();
            debug!("{name} edge ({level:?})");
        })?;

        Ok(PulseInput { _pin: pin, counter })
    }

    pub fn counter(&self) -> Arc<PulseCounter> {
        self.counter.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn counts_and_resets() {
        let counter = PulseCounter::new();
        counter.on_edge();
        counter.on_edge();
        assert_eq!(counter.read(), 2);
        assert_eq!(counter.read(), 2);
        counter.reset();
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn take_returns_count_and_zeroes() {
        let counter = PulseCounter::new();
        for _ in 0..5 {
            counter.on_edge();
        }
        assert_eq!(counter.take(), 5);
        assert_eq!(counter.read(), 0);
        assert_eq!(counter.take(), 0);
    }

    #[test]
    fn concurrent_edges_are_not_lost() {
        const THREADS: u64 = 8;
        const EDGES: u64 = 10_000;

        let counter = Arc::new(PulseCounter::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..EDGES {
                        counter.on_edge();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.read(), THREADS * EDGES);
    }

    #[test]
    fn take_under_contention_accounts_for_every_edge() {
        const EDGES: u64 = 50_000;

        let counter = Arc::new(PulseCounter::new());
        let producer = {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..EDGES {
                    counter.on_edge();
                }
            })
        };

        let mut taken = 0;
        while !producer.is_finished() {
            taken += counter.take();
        }
        producer.join().unwrap();
        taken += counter.take();

        assert_eq!(taken, EDGES);
    }
}
