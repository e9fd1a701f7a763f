//! [`PowerGuard`] – low-battery override.
//!
//! Checked once per control-loop iteration, before the scheduled duty. While
//! the battery reads low the guard releases every servo, plays the warning
//! cue and sleeps for the cool-down, and the duty that was due is skipped.

use pawos_hal::{BatteryLevel, Cue, Rig};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStatus {
    Nominal,
    /// The iteration was spent in the cool-down; skip the duty.
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerGuard {
    pub cooldown_ms: u64,
    suspensions: u32,
}

impl PowerGuard {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            suspensions: 0,
        }
    }

    pub fn check(&mut self, rig: &mut Rig) -> PowerStatus {
        match rig.power.battery_level() {
            BatteryLevel::Normal => PowerStatus::Nominal,
            BatteryLevel::Low => {
                self.suspensions += 1;
                warn!(
                    cooldown_ms = self.cooldown_ms,
                    suspensions = self.suspensions,
                    "low power, suspending duties"
                );
                rig.servos.shut_all();
                rig.play(Cue::low_battery());
                rig.clock.sleep_ms(self.cooldown_ms);
                PowerStatus::Suspended
            }
        }
    }

    /// Number of iterations suspended so far.
    pub fn suspensions(&self) -> u32 {
        self.suspensions
    }
}

impl Default for PowerGuard {
    fn default() -> Self {
        Self::new(1_500)
    }
}
