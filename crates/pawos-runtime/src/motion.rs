//! [`MotionEngine`] – joint targets for one motion-duty tick.
//!
//! | Mode | Skill | Head (joint 0) | Other joints |
//! |---|---|---|---|
//! | posture (motion disabled) | `Posture` | roll deviation | angle × multiplier + compensation |
//! | gait (motion enabled) | `Gait` | steering bias + head sweep | frame angle × multiplier |
//!
//! Any other combination leaves every joint untouched. Compensation is only
//! applied while gyro checking is on.

use std::f32::consts::PI;

use pawos_types::{DOF, HEAD_JOINT, JointTargets, SkillKind};
use tracing::trace;

use crate::state::ControlState;

/// Degrees of joint correction per degree of roll deviation.
pub const ROLL_GAIN: [f32; DOF] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
    0.5, -0.5, -0.5, 0.5, 1.0, -1.0, -1.0, 1.0,
];

/// Degrees of joint correction per degree of pitch deviation.
pub const PITCH_GAIN: [f32; DOF] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
    0.5, 0.5, -0.5, -0.5, 0.8, 0.8, -0.8, -0.8,
];

/// Amplitude (degrees) of the head sweep during a gait cycle.
const HEAD_SWEEP_DEG: f32 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct MotionEngine;

impl MotionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute this tick's targets and advance the gait phase.
    pub fn step(&self, state: &mut ControlState) -> JointTargets {
        if state.motion_enabled {
            self.gait_targets(state)
        } else {
            self.posture_targets(state)
        }
    }

    /// Compensation for `joint` from the current deviation terms.
    pub fn compensation(&self, state: &ControlState, joint: usize) -> f32 {
        if !state.check_gyro {
            return 0.0;
        }
        state.compensation_factor
            * (ROLL_GAIN[joint] * state.deviation.roll + PITCH_GAIN[joint] * state.deviation.pitch)
    }

    fn posture_targets(&self, state: &ControlState) -> JointTargets {
        let mut targets: JointTargets = [None; DOF];
        let SkillKind::Posture { angles } = &state.skill.kind else {
            return targets;
        };
        let multiplier = state.skill.angle_multiplier();
        targets[HEAD_JOINT] = Some(state.deviation.roll);
        for joint in (0..DOF).filter(|&j| j != HEAD_JOINT) {
            let base = f32::from(angles[joint]) * multiplier;
            targets[joint] = Some(base + self.compensation(state, joint));
        }
        targets
    }

    fn gait_targets(&self, state: &mut ControlState) -> JointTargets {
        let mut targets: JointTargets = [None; DOF];
        let SkillKind::Gait { frames } = &state.skill.kind else {
            state.frame_index = 0;
            return targets;
        };
        let count = frames.len();
        if count == 0 {
            state.frame_index = 0;
            return targets;
        }
        if state.frame_index >= count {
            state.frame_index = 0;
        }
        let index = state.frame_index;

        if count > 1 {
            let sweep = HEAD_SWEEP_DEG * (2.0 * PI * index as f32 / count as f32).sin();
            targets[HEAD_JOINT] = Some(f32::from(state.offset_lr) + sweep);
        }
        let multiplier = state.skill.angle_multiplier();
        for (offset, angle) in frames[index].iter().enumerate() {
            let joint = state.first_motion_joint + offset;
            if joint < DOF && joint != HEAD_JOINT {
                targets[joint] = Some(f32::from(*angle) * multiplier);
            }
        }
        trace!(frame = index, frames = count, "gait frame");

        state.frame_index = (index + 1) % count;
        targets
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
