//! [`ControlState`] – everything the three duties share.
//!
//! Owned by [`ControlLoop`](crate::ControlLoop) and lent `&mut` to one duty at
//! a time; there is no other mutable state in the control path.

use pawos_kernel::{BalanceMonitor, DeviationTerms};
use pawos_perception::AttitudeEstimator;
use pawos_types::{Command, Move, SimpleCommand, Skill};

use crate::config::ControlConfig;

#[derive(Debug, Clone)]
pub struct ControlState {
    /// Command whose skill is currently installed.
    pub last_command: Command,
    /// Active motion program.
    pub skill: Skill,
    /// Last gait selector received.
    pub move_cmd: Move,
    /// Gait playback when true, posture hold when false.
    pub motion_enabled: bool,
    /// Attitude compensation and tip-over monitoring.
    pub check_gyro: bool,
    pub frame_index: usize,
    /// First joint driven by gait frames.
    pub first_motion_joint: usize,
    /// Head bias (degrees) while steering.
    pub offset_lr: i8,
    /// Scale applied to posture compensation; 1 for postures.
    pub compensation_factor: f32,
    pub deviation: DeviationTerms,
    pub balance: BalanceMonitor,
    pub attitude: AttitudeEstimator,
    /// Command that was active when the robot tipped over.
    pub saved_command: Option<Command>,
}

impl ControlState {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            last_command: Command::Simple(SimpleCommand::Rest),
            skill: Skill::invalid(),
            move_cmd: Move::default(),
            motion_enabled: false,
            check_gyro: true,
            frame_index: 0,
            first_motion_joint: 0,
            offset_lr: 0,
            compensation_factor: 1.0,
            deviation: DeviationTerms::default(),
            balance: BalanceMonitor::new(config.balance),
            attitude: AttitudeEstimator::new(config.attitude_alpha)
                .with_max_dt(config.attitude_max_dt_s),
            saved_command: None,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawos_kernel::BalanceState;

    #[test]
    fn starts_resting_with_gyro_checks_on() {
        let state = ControlState::default();
        assert_eq!(state.last_command, SimpleCommand::Rest);
        assert!(state.check_gyro);
        assert!(!state.motion_enabled);
        assert!(state.skill.is_invalid());
        assert_eq!(state.balance.state(), BalanceState::Level);
    }
}
