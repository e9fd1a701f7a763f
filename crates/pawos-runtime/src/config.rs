//! [`ControlConfig`] – tunables of the control loop.
//!
//! Every field has a default matching the Bittle reference tuning, so a TOML
//! file only needs the keys it changes:
//!
//! ```toml
//! attitude_period_us = 4000
//!
//! [balance]
//! large_pitch_deg = 70.0
//! ```

use pawos_kernel::BalanceConfig;
use pawos_types::PawError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub attitude_period_us: u64,
    pub input_period_us: u64,
    pub motion_period_us: u64,
    /// Complementary filter coefficient of the attitude estimator.
    pub attitude_alpha: f32,
    /// Longest gyro integration step in seconds.
    pub attitude_max_dt_s: f32,
    pub balance: BalanceConfig,
    /// Low-battery suspension length.
    pub power_cooldown_ms: u64,
    /// IMU reads a behaviour frame may spend waiting for its trigger.
    pub max_trigger_polls: u32,
    /// Hold time of one behaviour `delay` unit.
    pub behaviour_delay_unit_ms: u64,
    /// Compensation scale for non-posture skills.
    pub posture_walking_factor: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            attitude_period_us: 5_000,
            input_period_us: 15_000,
            motion_period_us: 20_000,
            attitude_alpha: 0.98,
            attitude_max_dt_s: 0.05,
            balance: BalanceConfig::default(),
            power_cooldown_ms: 1_500,
            max_trigger_polls: 2_000,
            behaviour_delay_unit_ms: 50,
            posture_walking_factor: 0.5,
        }
    }
}

impl ControlConfig {
    /// # Errors
    ///
    /// [`PawError::Config`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<(), PawError> {
        let periods = [
            ("attitude_period_us", self.attitude_period_us),
            ("input_period_us", self.input_period_us),
            ("motion_period_us", self.motion_period_us),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(PawError::Config(format!("{name} must be positive")));
        }
        if !(0.0..=1.0).contains(&self.attitude_alpha) {
            return Err(PawError::Config(format!(
                "attitude_alpha must be within [0, 1], got {}",
                self.attitude_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.balance.deviation_weight) {
            return Err(PawError::Config(format!(
                "balance.deviation_weight must be within [0, 1], got {}",
                self.balance.deviation_weight
            )));
        }
        if self.balance.grace_ticks == 0 {
            return Err(PawError::Config("balance.grace_ticks must be positive".into()));
        }
        if self.max_trigger_polls == 0 {
            return Err(PawError::Config("max_trigger_polls must be positive".into()));
        }
        Ok(())
    }
}
