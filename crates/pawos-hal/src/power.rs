//! Battery level sampling.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryLevel {
    Normal,
    Low,
}

pub trait PowerMonitor {
    fn battery_level(&mut self) -> BatteryLevel;
}

/// Thresholds a raw ADC reading of the battery divider.
pub struct AdcBattery<F> {
    read: F,
    low_threshold: u16,
}

impl<F: FnMut() -> u16> AdcBattery<F> {
    /// Readings strictly below `low_threshold` count as [`BatteryLevel::Low`].
    pub fn new(read: F, low_threshold: u16) -> Self {
        Self {
            read,
            low_threshold,
        }
    }
}

impl<F: FnMut() -> u16> PowerMonitor for AdcBattery<F> {
    fn battery_level(&mut self) -> BatteryLevel {
        if (self.read)() < self.low_threshold {
            BatteryLevel::Low
        } else {
            BatteryLevel::Normal
        }
    }
}
