//! Joint actuators and the angle → duty calibration mapping.
//!
//! [`ServoDriver`] is the raw PWM channel writer supplied by the board. The
//! [`ServoBus`] wraps it with the per-joint affine transform
//!
//! ```text
//! duty = 1500 + (middle_shift + calibration + angle) × pulse_per_degree × direction
//! ```
//!
//! clamped to the 500–2500 µs pulse window, and remembers the last angle sent
//! to every joint so that transitions can start from where the joint is.

use pawos_types::{DOF, JointTargets};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Pulse width at the mechanical centre (µs).
pub const DUTY_CENTER: f32 = 1500.0;
pub const DUTY_MIN: u16 = 500;
pub const DUTY_MAX: u16 = 2500;

/// Smallest angle step (degrees) of a stepped transition at speed 1.
const TRANSITION_STEP_DEG: f32 = 1.0;
const MAX_TRANSITION_STEPS: usize = 240;

/// Fire-and-forget PWM channel writer.
pub trait ServoDriver {
    /// Drive `joint` with a pulse of `duty` µs.
    fn set_duty(&mut self, joint: usize, duty: u16);

    /// Stop driving `joint` so it goes limp.
    fn release(&mut self, joint: usize);
}

/// Fixed mechanical properties of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointProfile {
    /// Horn offset of the mounted servo (degrees).
    pub middle_shift: i8,
    /// `1` or `-1` depending on mounting side.
    pub direction: i8,
    /// Full travel of the servo (degrees).
    pub range_deg: u16,
}

impl JointProfile {
    pub const fn new(middle_shift: i8, direction: i8, range_deg: u16) -> Self {
        Self {
            middle_shift,
            direction,
            range_deg,
        }
    }

    pub fn pulse_per_degree(&self) -> f32 {
        f32::from(DUTY_MAX - DUTY_MIN) / f32::from(self.range_deg.max(1))
    }
}

/// Joint table of a Bittle-style quadruped: head pan/tilt, unused torso
/// slots, then shoulders (8–11) and knees (12–15).
pub fn default_profiles() -> [JointProfile; DOF] {
    const DIRECTIONS: [i8; DOF] = [1, -1, 1, 1, 1, -1, 1, -1, 1, -1, -1, 1, -1, 1, 1, -1];
    let mut profiles = [JointProfile::new(0, 1, 180); DOF];
    for (joint, profile) in profiles.iter_mut().enumerate() {
        profile.direction = DIRECTIONS[joint];
        if joint >= DOF / 2 {
            profile.range_deg = 270;
        }
    }
    profiles
}

/// Calibrated access to the whole joint array.
pub struct ServoBus {
    driver: Box<dyn ServoDriver>,
    profiles: [JointProfile; DOF],
    calibration: [i8; DOF],
    current: [f32; DOF],
}

impl ServoBus {
    pub fn new(driver: Box<dyn ServoDriver>, profiles: [JointProfile; DOF]) -> Self {
        Self {
            driver,
            profiles,
            calibration: [0; DOF],
            current: [0.0; DOF],
        }
    }

    pub fn with_calibration(mut self, calibration: [i8; DOF]) -> Self {
        self.calibration = calibration;
        self
    }

    /// Duty value for `angle` (degrees) on `joint` with the current offsets.
    pub fn duty_for(&self, joint: usize, angle: f32) -> u16 {
        let profile = &self.profiles[joint];
        let degrees = f32::from(profile.middle_shift) + f32::from(self.calibration[joint]) + angle;
        let duty = DUTY_CENTER + degrees * profile.pulse_per_degree() * f32::from(profile.direction);
        duty.round().clamp(f32::from(DUTY_MIN), f32::from(DUTY_MAX)) as u16
    }

    /// Send `angle` to `joint` through the calibration mapping.
    pub fn calibrated_pwm(&mut self, joint: usize, angle: f32) {
        let duty = self.duty_for(joint, angle);
        self.driver.set_duty(joint, duty);
        self.current[joint] = angle;
    }

    /// Write every `Some` entry of a joint target table; returns how many
    /// joints were driven.
    pub fn write_targets(&mut self, targets: &JointTargets) -> usize {
        let mut written = 0;
        for (joint, target) in targets.iter().enumerate() {
            if let Some(angle) = target {
                self.calibrated_pwm(joint, *angle);
                written += 1;
            }
        }
        written
    }

    /// Move joints `first_joint..DOF` from their current angles to `target`
    /// in equal steps. Higher `speed` means fewer, larger steps.
    pub fn transition(&mut self, target: &[f32; DOF], first_joint: usize, speed: f32) {
        let step = (TRANSITION_STEP_DEG * speed).max(0.1);
        let max_delta = (first_joint..DOF)
            .map(|j| (target[j] - self.current[j]).abs())
            .fold(0.0f32, f32::max);
        let steps = ((max_delta / step).ceil() as usize).clamp(1, MAX_TRANSITION_STEPS);
        trace!(first_joint, steps, max_delta, "servo transition");

        let start = self.current;
        for s in 1..=steps {
            let t = s as f32 / steps as f32;
            for joint in first_joint..DOF {
                let angle = start[joint] + (target[joint] - start[joint]) * t;
                self.calibrated_pwm(joint, angle);
            }
        }
    }

    /// Walk a single joint to `angle` in increments of `step_deg`.
    pub fn sweep_joint(&mut self, joint: usize, angle: f32, step_deg: f32) {
        let start = self.current[joint];
        let steps = ((angle - start).abs() / step_deg.max(0.01)).floor() as usize;
        let step = step_deg.copysign(angle - start);
        for s in 1..=steps.min(MAX_TRANSITION_STEPS * 4) {
            self.calibrated_pwm(joint, start + step * s as f32);
        }
        self.calibrated_pwm(joint, angle);
    }

    /// Release every joint.
    pub fn shut_all(&mut self) {
        for joint in 0..DOF {
            self.driver.release(joint);
        }
    }

    pub fn calibration(&self) -> &[i8; DOF] {
        &self.calibration
    }

    pub fn set_calibration(&mut self, joint: usize, offset: i8) {
        self.calibration[joint] = offset;
    }

    pub fn replace_calibration(&mut self, calibration: [i8; DOF]) {
        self.calibration = calibration;
    }

    /// Last angle sent to each joint.
    pub fn current_angles(&self) -> &[f32; DOF] {
        &self.current
    }

    pub fn profiles(&self) -> &[JointProfile; DOF] {
        &self.profiles
    }
}
