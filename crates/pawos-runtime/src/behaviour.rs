//! [`BehaviourPlayer`] – synchronous one-shot skill playback.
//!
//! A behaviour blocks the whole control loop until it finishes. Each frame
//! moves the servos to its pose and is then held either for `delay` units or
//! until its attitude trigger fires. A trigger fires when the selected angle
//! crosses the target from the side given by the sign of the trigger axis:
//!
//! ```text
//! π − |current| > 2.0  &&  axis·current < axis·target  &&  axis·previous > axis·target
//! ```
//!
//! The first clause ignores readings near ±π where the angle wraps. The wait
//! is bounded by `max_trigger_polls` IMU reads.

use std::f32::consts::PI;

use pawos_hal::Rig;
use pawos_perception::AttitudeEstimator;
use pawos_types::{DOF, LoopSpan, PawError, Skill, SkillKind, Trigger};
use tracing::{debug, trace};

/// Angle margin (radians) below π under which a reading is trusted.
const WRAP_GUARD_RAD: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviourPlayer {
    pub max_trigger_polls: u32,
    pub delay_unit_ms: u64,
}

impl Default for BehaviourPlayer {
    fn default() -> Self {
        Self {
            max_trigger_polls: 2_000,
            delay_unit_ms: 50,
        }
    }
}

impl BehaviourPlayer {
    pub fn new(max_trigger_polls: u32, delay_unit_ms: u64) -> Self {
        Self {
            max_trigger_polls,
            delay_unit_ms,
        }
    }

    /// Play `skill` to completion and return the number of frames shown.
    ///
    /// Non-behaviour skills play nothing.
    ///
    /// # Errors
    ///
    /// [`PawError::TriggerTimeout`] if a frame's trigger does not fire within
    /// `max_trigger_polls` reads; the remaining frames are skipped.
    pub fn play(
        &self,
        skill: &Skill,
        rig: &mut Rig,
        attitude: &mut AttitudeEstimator,
    ) -> Result<usize, PawError> {
        let SkillKind::Behaviour { frames, loop_span } = &skill.kind else {
            return Ok(0);
        };
        let multiplier = skill.angle_multiplier();
        let span = valid_span(*loop_span, frames.len());
        let mut repeats_left = span.map_or(0, |s| s.count.saturating_sub(1));
        debug!(frames = frames.len(), ?span, "behaviour start");

        let mut played = 0;
        let mut index = 0;
        while index < frames.len() {
            let frame = &frames[index];
            let mut target = [0.0f32; DOF];
            for (joint, angle) in frame.angles.iter().enumerate() {
                target[joint] = f32::from(*angle) * multiplier;
            }
            rig.servos.transition(&target, 0, f32::from(frame.speed) / 4.0);

            match frame.trigger.filter(|t| attitude.angle_from_axis(t.axis).is_some()) {
                Some(trigger) => self.wait_for_trigger(index, trigger, rig, attitude)?,
                None => rig
                    .clock
                    .sleep_ms(u64::from(frame.delay) * self.delay_unit_ms),
            }
            played += 1;

            match span {
                Some(s) if index == usize::from(s.last) && repeats_left > 0 => {
                    repeats_left -= 1;
                    index = usize::from(s.first);
                }
                _ => index += 1,
            }
        }
        debug!(played, "behaviour done");
        Ok(played)
    }

    fn wait_for_trigger(
        &self,
        frame: usize,
        trigger: Trigger,
        rig: &mut Rig,
        attitude: &mut AttitudeEstimator,
    ) -> Result<(), PawError> {
        let axis = f32::from(trigger.axis);
        let target = f32::from(trigger.angle_deg).to_radians();
        let mut previous = attitude.angle_from_axis(trigger.axis).unwrap_or_default();

        for _ in 0..self.max_trigger_polls {
            attitude.update(&rig.imu.read_sample());
            let current = attitude.angle_from_axis(trigger.axis).unwrap_or_default();
            trace!(frame, current, target, "trigger poll");
            if PI - current.abs() > WRAP_GUARD_RAD
                && axis * current < axis * target
                && axis * previous > axis * target
            {
                return Ok(());
            }
            previous = current;
        }
        Err(PawError::TriggerTimeout {
            frame,
            polls: self.max_trigger_polls,
        })
    }
}

/// Loop span if it is usable for a behaviour of `len` frames.
fn valid_span(span: LoopSpan, len: usize) -> Option<LoopSpan> {
    (span.count > 1 && span.first <= span.last && usize::from(span.last) < len).then_some(span)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
