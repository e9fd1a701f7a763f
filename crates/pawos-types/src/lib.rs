//! `pawos-types` – shared value types for the PawOS control core.
//!
//! Everything that crosses a crate boundary lives here: the [`Command`] sum
//! type produced by the input decoders, the [`Skill`] motion programs produced
//! by the skill loader, the raw [`OrientationSample`] read from the IMU, the
//! joint-count constants, and the workspace-wide [`PawError`].
//!
//! All types are plain values with fixed capacity (`heapless` collections and
//! arrays) so they can be copied around the control loop without touching the
//! heap.

pub mod command;
pub mod sample;
pub mod skill;

use thiserror::Error;

pub use command::{ArgCommand, ArgOp, Args, Command, Direction, MAX_ARGS, Move, Pace, SimpleCommand};
pub use sample::{Angles, OrientationSample};
pub use skill::{
    BehaviourFrame, GaitFrame, JointAngles, LoopSpan, MAX_BEHAVIOUR_FRAMES, MAX_GAIT_FRAMES,
    Skill, SkillKind, Trigger,
};

// ────────────────────────────────────────────────────────────────────────────
// Joint layout
// ────────────────────────────────────────────────────────────────────────────

/// Number of joint slots addressed by the controller.
pub const DOF: usize = 16;

/// Number of leg joints; they occupy the last `WALKING_DOF` slots.
pub const WALKING_DOF: usize = 8;

/// Index of the steerable head ("look") joint.
pub const HEAD_JOINT: usize = 0;

/// Index of the first leg joint.
pub const FIRST_LEG_JOINT: usize = DOF - WALKING_DOF;

/// Commanded angle (degrees, after compensation) per joint for one motion
/// tick; `None` leaves the joint untouched.
pub type JointTargets = [Option<f32>; DOF];

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by every PawOS crate.
///
/// None of these unwind past the duty that produced them: the control loop
/// logs the error and moves on to the next scheduler tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PawError {
    /// A decoder produced a command whose payload has the wrong shape.
    #[error("malformed {op:?} command: {reason}")]
    MalformedCommand { op: ArgOp, reason: &'static str },

    #[error("scheduler capacity of {capacity} tasks exceeded")]
    TaskCapacityExceeded { capacity: usize },

    #[error("tasks must be registered before the scheduler starts")]
    SchedulerStarted,

    #[error("scheduler has no registered tasks")]
    NoTasksRegistered,

    /// A behaviour frame waited longer than its poll budget for its trigger.
    #[error("behaviour frame {frame} trigger not reached after {polls} polls")]
    TriggerTimeout { frame: usize, polls: u32 },

    /// A skill was built with more frames than its fixed capacity.
    #[error("skill frame capacity of {capacity} exceeded")]
    SkillCapacityExceeded { capacity: usize },

    #[error("calibration store error: {0}")]
    Calibration(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leg_joints_fill_the_tail_of_the_table() {
        assert_eq!(FIRST_LEG_JOINT, 8);
        assert!(HEAD_JOINT < FIRST_LEG_JOINT);
    }

    #[test]
    fn paw_error_display() {
        let err = PawError::MalformedCommand {
            op: ArgOp::MoveSimultaneously,
            reason: "expected one angle per joint",
        };
        assert!(err.to_string().contains("MoveSimultaneously"));
        assert!(err.to_string().contains("one angle per joint"));

        let err = PawError::TaskCapacityExceeded { capacity: 3 };
        assert!(err.to_string().contains('3'));
    }
}
