//! Monotonic time source.

use std::thread;
use std::time::{Duration, Instant};

/// Microsecond clock that can put the control thread to sleep.
pub trait Clock {
    /// Microseconds since an arbitrary, fixed origin.
    fn now_us(&self) -> u64;

    /// Block the calling thread for `us` microseconds.
    fn sleep_us(&mut self, us: u64);

    fn sleep_ms(&mut self, ms: u64) {
        self.sleep_us(ms * 1_000);
    }
}

/// Wall clock backed by [`Instant`] and [`thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn sleep_us(&mut self, us: u64) {
        if us > 0 {
            thread::sleep(Duration::from_micros(us));
        }
    }
}
