//! Attitude Estimator.
//!
//! Fuses body-frame [`OrientationSample`]s into a roll/pitch estimate using a
//! complementary filter.
//!
//! The filter blends:
//! - **Accelerometer tilt** – the direction of gravity; absolute and drift
//!   free but noisy whenever the body accelerates.
//! - **Gyro integration** – the previous estimate advanced by the measured
//!   angular rates; smooth and low latency but drifts with sensor bias.
//!
//! The update formula, per axis, is:
//! ```text
//! estimate = tilt_acc + α · wrap(prev + ω · dt − tilt_acc)
//! ```
//! where α ∈ [0, 1] controls how much the gyro prediction is trusted. The
//! difference is wrapped so the blend never averages across the ±π seam.
//!
//! # Example
//!
//! ```rust
//! use pawos_perception::attitude::AttitudeEstimator;
//! use pawos_types::OrientationSample;
//!
//! let mut attitude = AttitudeEstimator::new(0.98);
//! let angles = attitude.update(&OrientationSample::from_tilt(0.0, 0.3, 0));
//! assert!((angles.pitch - 0.3).abs() < 1e-5);
//! ```

use std::f32::consts::PI;

use pawos_types::{Angles, OrientationSample};
use tracing::trace;

/// Longest gyro integration step (seconds); covers scheduler stalls such as
/// a behaviour playback.
pub const DEFAULT_MAX_DT: f32 = 0.05;

/// Wrap an angle to (-π, π].
pub fn wrap_pi(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Roll and pitch implied by the gravity vector of `sample`.
pub fn accel_tilt(sample: &OrientationSample) -> Angles {
    let [ax, ay, az] = sample.accel;
    Angles {
        roll: ay.atan2(az),
        pitch: (-ax).atan2((ay * ay + az * az).sqrt()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AttitudeEstimator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AttitudeEstimator {
    /// Complementary filter coefficient (0–1). Higher values trust the gyro
    /// prediction more.
    alpha: f32,
    max_dt: f32,
    angles: Angles,
    last_tilt: Angles,
    last_timestamp_us: Option<u64>,
    /// Next update takes the pure accelerometer tilt.
    reanchor: bool,
}

impl AttitudeEstimator {
    /// `alpha` is clamped to `[0, 1]`; `0.98` suits a 200 Hz attitude duty.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            max_dt: DEFAULT_MAX_DT,
            angles: Angles::default(),
            last_tilt: Angles::default(),
            last_timestamp_us: None,
            reanchor: true,
        }
    }

    pub fn with_max_dt(mut self, max_dt_s: f32) -> Self {
        self.max_dt = max_dt_s.max(0.0);
        self
    }

    /// Fuse one sample and return the new estimate.
    pub fn update(&mut self, sample: &OrientationSample) -> Angles {
        let tilt = accel_tilt(sample);
        self.last_tilt = tilt;

        let previous = self.last_timestamp_us.replace(sample.timestamp_us);
        let dt = match previous {
            Some(prev) if !self.reanchor => {
                (sample.timestamp_us.saturating_sub(prev) as f32 * 1e-6).min(self.max_dt)
            }
            _ => {
                self.reanchor = false;
                self.angles = tilt;
                return self.angles;
            }
        };

        let predicted_roll = self.angles.roll + sample.gyro[0] * dt;
        let predicted_pitch = self.angles.pitch + sample.gyro[1] * dt;
        self.angles = Angles {
            roll: wrap_pi(tilt.roll + self.alpha * wrap_pi(predicted_roll - tilt.roll)),
            pitch: wrap_pi(tilt.pitch + self.alpha * wrap_pi(predicted_pitch - tilt.pitch)),
        };
        self.angles
    }

    /// Drop the integrated state and snap to the latest accelerometer tilt.
    pub fn reset(&mut self) {
        trace!(roll = self.last_tilt.roll, pitch = self.last_tilt.pitch, "attitude reset");
        self.angles = self.last_tilt;
        self.reanchor = true;
    }

    pub fn angles(&self) -> Angles {
        self.angles
    }

    pub fn roll(&self) -> f32 {
        self.angles.roll
    }

    pub fn pitch(&self) -> f32 {
        self.angles.pitch
    }

    /// Angle selected by a behaviour trigger axis: `±1` is pitch, `±2` roll.
    ///
    /// The sign is not applied here; callers multiply by the axis to pick the
    /// crossing direction.
    pub fn angle_from_axis(&self, axis: i8) -> Option<f32> {
        match axis.unsigned_abs() {
            1 => Some(self.angles.pitch),
            2 => Some(self.angles.roll),
            _ => None,
        }
    }
}

impl Default for AttitudeEstimator {
    fn default() -> Self {
        Self::new(0.98)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn still(roll: f32, pitch: f32, t: u64) -> OrientationSample {
        OrientationSample::from_tilt(roll, pitch, t)
    }

    #[test]
    fn first_update_takes_accel_tilt() {
        let mut est = AttitudeEstimator::new(0.98);
        let a = est.update(&still(0.2, -0.4, 0));
        assert!((a.roll - 0.2).abs() < EPS);
        assert!((a.pitch + 0.4).abs() < EPS);
    }

    #[test]
    fn gyro_prediction_dominates_with_high_alpha() {
        let mut est = AttitudeEstimator::new(1.0);
        est.update(&still(0.0, 0.0, 0));
        // 1 rad/s about x for 10 ms with the accelerometer still reading level
        let a = est.update(&still(0.0, 0.0, 10_000).with_gyro([1.0, 0.0, 0.0]));
        assert!((a.roll - 0.01).abs() < EPS);
    }

    #[test]
    fn blend_weights_prediction_by_alpha() {
        let mut est = AttitudeEstimator::new(0.5);
        est.update(&still(0.0, 0.0, 0));
        let a = est.update(&still(0.0, 0.1, 5_000));
        // prediction 0, accel 0.1 → 0.1 + 0.5 × (0 − 0.1)
        assert!((a.pitch - 0.05).abs() < EPS);
    }

    #[test]
    fn reset_then_update_is_pure_accel_tilt() {
        let mut est = AttitudeEstimator::new(0.98);
        est.update(&still(0.0, 0.0, 0));
        // accumulate a large gyro bias
        for i in 1..50 {
            est.update(&still(0.0, 0.0, i * 5_000).with_gyro([3.0, -3.0, 0.0]));
        }
        assert!(est.roll().abs() > 0.05);

        est.reset();
        let a = est.update(&still(0.3, 0.1, 300_000).with_gyro([3.0, -3.0, 0.0]));
        assert!((a.roll - 0.3).abs() < EPS);
        assert!((a.pitch - 0.1).abs() < EPS);
    }

    #[test]
    fn reset_snaps_immediately_to_last_tilt() {
        let mut est = AttitudeEstimator::new(1.0);
        est.update(&still(0.0, 0.0, 0));
        est.update(&still(0.0, 0.5, 5_000));
        assert!(est.pitch().abs() < EPS);
        est.reset();
        assert!((est.pitch() - 0.5).abs() < EPS);
    }

    #[test]
    fn dt_is_clamped() {
        let mut est = AttitudeEstimator::new(1.0).with_max_dt(0.01);
        est.update(&still(0.0, 0.0, 0));
        let a = est.update(&still(0.0, 0.0, 2_000_000).with_gyro([1.0, 0.0, 0.0]));
        assert!((a.roll - 0.01).abs() < EPS);
    }

    #[test]
    fn estimate_stays_wrapped_near_half_turn() {
        let mut est = AttitudeEstimator::new(0.98);
        est.update(&still(3.1, 0.0, 0));
        let a = est.update(&still(-3.1, 0.0, 5_000));
        assert!(a.roll.abs() > 3.0);
        assert!(a.roll <= PI && a.roll > -PI);
    }

    #[test]
    fn axis_selection() {
        let mut est = AttitudeEstimator::new(0.98);
        est.update(&still(0.2, -0.3, 0));
        assert!((est.angle_from_axis(1).unwrap() + 0.3).abs() < EPS);
        assert!((est.angle_from_axis(-1).unwrap() + 0.3).abs() < EPS);
        assert!((est.angle_from_axis(-2).unwrap() - 0.2).abs() < EPS);
        assert_eq!(est.angle_from_axis(0), None);
        assert_eq!(est.angle_from_axis(3), None);
    }

    #[test]
    fn wrap_pi_range() {
        assert!((wrap_pi(2.5 * PI) - 0.5 * PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(0.5) - 0.5).abs() < EPS);
        assert!((wrap_pi(-7.0) - (-7.0 + 2.0 * PI)).abs() < EPS);
    }

    #[test]
    fn alpha_clamped_to_unit_interval() {
        assert!((AttitudeEstimator::new(5.0).alpha - 1.0).abs() < EPS);
        assert!(AttitudeEstimator::new(-1.0).alpha.abs() < EPS);
    }
}
