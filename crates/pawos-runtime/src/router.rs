//! [`Router`] – applies one routed command to the control state.
//!
//! Every command that reaches the router, whether decoded by an input source
//! or synthesized by the attitude duty, goes through [`Router::process`]:
//!
//! 1. command-specific handling (move selection, toggles, calibration,
//!    direct joint moves, sounds);
//! 2. an acknowledgement chirp for anything other than [`Command::None`];
//! 3. when the command differs from the last one, the matching skill is
//!    loaded and installed. Behaviours are played on the spot and always
//!    fall through to the `Balance` posture.

use pawos_hal::{Cue, Rig, SkillLoader};
use pawos_types::{
    ArgCommand, ArgOp, Command, DOF, Direction, FIRST_LEG_JOINT, JointAngles, PawError,
    SimpleCommand, Skill, SkillKind,
};
use tracing::{debug, info, warn};

use crate::behaviour::BehaviourPlayer;
use crate::config::ControlConfig;
use crate::state::ControlState;

/// Head bias (degrees) while steering left; right is the negation.
pub const STEERING_OFFSET_DEG: i8 = 15;

/// Degrees per servo write for sequential joint moves.
const SEQUENTIAL_STEP_DEG: f32 = 0.2;

/// Transition speed for simultaneous joint moves.
const SIMULTANEOUS_SPEED: f32 = 6.0;

/// Calibration arguments at or beyond this magnitude are relative offsets.
const INCREMENTAL_BASE: i16 = 1000;

pub struct Router {
    loader: Box<dyn SkillLoader>,
    player: BehaviourPlayer,
    walking_factor: f32,
}

impl Router {
    pub fn new(loader: Box<dyn SkillLoader>, config: &ControlConfig) -> Self {
        Self {
            loader,
            player: BehaviourPlayer::new(config.max_trigger_polls, config.behaviour_delay_unit_ms),
            walking_factor: config.posture_walking_factor,
        }
    }

    /// Route one command.
    ///
    /// # Errors
    ///
    /// [`PawError::MalformedCommand`] when an argument payload has the wrong
    /// shape; the command is dropped before it touches any state.
    pub fn process(
        &self,
        command: Command,
        state: &mut ControlState,
        rig: &mut Rig,
    ) -> Result<(), PawError> {
        let forward = match &command {
            Command::None => false,
            Command::Move(selected) => {
                state.move_cmd = *selected;
                state.motion_enabled = true;
                true
            }
            Command::Simple(simple) => self.simple(*simple, state, rig),
            Command::WithArgs(args) => {
                validate(args)?;
                state.motion_enabled = false;
                self.with_args(args, state, rig);
                true
            }
        };
        if !forward {
            return Ok(());
        }
        rig.play(Cue::ack());

        if command != state.last_command {
            self.install(command, state, rig);
        }
        Ok(())
    }

    /// Put the robot into its resting pose with the servos released.
    pub fn settle_to_rest(&self, state: &mut ControlState, rig: &mut Rig) {
        self.simple(SimpleCommand::Rest, state, rig);
    }

    /// Returns `false` when the command is consumed and should not go any
    /// further.
    fn simple(&self, command: SimpleCommand, state: &mut ControlState, rig: &mut Rig) -> bool {
        match command {
            SimpleCommand::Rest => {
                state.last_command = Command::Simple(SimpleCommand::Rest);
                self.apply_posture(&state.last_command.clone(), state, rig);
                rig.servos.shut_all();
                state.motion_enabled = false;
            }
            SimpleCommand::GyroToggle => {
                state.check_gyro = !state.check_gyro;
                state.motion_enabled = true;
                if !state.check_gyro {
                    state.balance.cancel();
                    state.saved_command = None;
                    state.deviation.clear();
                }
                info!(check_gyro = state.check_gyro, "gyro checking toggled");
            }
            SimpleCommand::Pause => {
                state.motion_enabled = !state.motion_enabled;
                if state.motion_enabled {
                    debug!("motion resumed");
                    return false;
                }
                rig.servos.shut_all();
                debug!("motion paused");
            }
            SimpleCommand::SaveServoCalibration => {
                if let Err(err) = rig.save_calibration() {
                    warn!(%err, "failed to save calibration");
                }
            }
            SimpleCommand::AbortServoCalibration => {
                if let Err(err) = rig.reload_calibration() {
                    warn!(%err, "failed to reload calibration");
                }
            }
            SimpleCommand::ShowJointAngles => {
                let ranges: Vec<u16> = rig.servos.profiles().iter().map(|p| p.range_deg).collect();
                info!(?ranges, angles = ?rig.servos.current_angles(), "joint angles");
            }
            SimpleCommand::Balance
            | SimpleCommand::Sit
            | SimpleCommand::Stretch
            | SimpleCommand::Greet
            | SimpleCommand::Recover => {}
        }
        true
    }

    fn with_args(&self, command: &ArgCommand, state: &mut ControlState, rig: &mut Rig) {
        match command.op {
            ArgOp::Calibrate => self.calibrate(command, state, rig),
            ArgOp::MoveSequentially => {
                let mut angles = editable_posture(state, rig);
                for pair in command.args.chunks_exact(2) {
                    let (joint, angle) = (pair[0] as usize, pair[1] as i8);
                    rig.servos.sweep_joint(joint, f32::from(angle), SEQUENTIAL_STEP_DEG);
                    angles[joint] = angle;
                }
                commit_posture(state, angles);
            }
            ArgOp::MoveSimultaneously => {
                let mut angles = editable_posture(state, rig);
                let mut target = [0.0f32; DOF];
                for (joint, arg) in command.args.iter().enumerate() {
                    angles[joint] = *arg as i8;
                    target[joint] = f32::from(*arg);
                }
                rig.servos.transition(&target, 0, SIMULTANEOUS_SPEED);
                commit_posture(state, angles);
            }
            ArgOp::Meow => {
                let repeat = command.arg_or(0, 0) as u8;
                let increment = (command.arg_or(1, 0) as u8).saturating_add(1);
                rig.play(Cue::meow(repeat, increment));
            }
            ArgOp::Beep => {
                let note = command.arg_or(0, 0) as i8;
                let duration = command.arg_or(1, 0) as u16;
                rig.play(Cue::beep(note, duration));
            }
        }
    }

    fn calibrate(&self, command: &ArgCommand, state: &mut ControlState, rig: &mut Rig) {
        info!(offsets = ?rig.servos.calibration(), "calibration");
        let entering = state
            .last_command
            .as_args()
            .is_none_or(|last| last.op != ArgOp::Calibrate);
        if entering {
            state.last_command = Command::WithArgs(command.clone());
            self.apply_posture(&state.last_command.clone(), state, rig);
            state.check_gyro = false;
        }

        if let [joint, value] = command.args[..] {
            let joint = joint as usize;
            let current = i16::from(rig.servos.calibration()[joint]);
            let offset = if value > INCREMENTAL_BASE {
                current + (value - INCREMENTAL_BASE)
            } else if value < -INCREMENTAL_BASE {
                current + (value + INCREMENTAL_BASE)
            } else {
                value
            };
            let offset = offset.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8;
            rig.servos.set_calibration(joint, offset);
            let pose = match &state.skill.kind {
                SkillKind::Posture { angles } => f32::from(angles[joint]),
                _ => 0.0,
            };
            rig.servos.calibrated_pwm(joint, pose);
            debug!(joint, offset, "calibration offset set");
        }
    }

    /// Load and install the skill for a command that differs from the last.
    fn install(&self, command: Command, state: &mut ControlState, rig: &mut Rig) {
        let skill = self.loader.load(&command);
        if skill.is_invalid() {
            debug!(?command, "no skill for command");
            return;
        }
        debug!(?command, frames = skill.frame_count(), "skill loaded");

        state.offset_lr = match command.as_move().map(|m| m.direction) {
            Some(Direction::Left) => STEERING_OFFSET_DEG,
            Some(Direction::Right) => -STEERING_OFFSET_DEG,
            _ => 0,
        };
        state.frame_index = 0;
        state.compensation_factor = if skill.is_posture() {
            1.0
        } else {
            self.walking_factor
        };
        state.first_motion_joint = if skill.is_gait() { FIRST_LEG_JOINT } else { 0 };
        state.last_command = command;

        if matches!(skill.kind, SkillKind::Behaviour { .. }) {
            if let Err(err) = self.player.play(&skill, rig, &mut state.attitude) {
                warn!(%err, "behaviour aborted");
            }
            state.last_command = Command::Simple(SimpleCommand::Balance);
            self.apply_posture(&state.last_command.clone(), state, rig);
            state.deviation.clear();
        } else {
            move_to_first_pose(&skill, state.first_motion_joint, rig);
            state.skill = skill;
        }
    }

    /// Load the posture for `command`, install it and move the servos there.
    fn apply_posture(&self, command: &Command, state: &mut ControlState, rig: &mut Rig) {
        let skill = self.loader.load(command);
        if skill.is_invalid() {
            debug!(?command, "no posture for command");
            return;
        }
        move_to_first_pose(&skill, 0, rig);
        state.compensation_factor = 1.0;
        state.first_motion_joint = 0;
        state.skill = skill;
    }
}

/// Transition the servos to the skill's first pose from `first_joint` on.
fn move_to_first_pose(skill: &Skill, first_joint: usize, rig: &mut Rig) {
    let multiplier = skill.angle_multiplier();
    let mut target = *rig.servos.current_angles();
    match &skill.kind {
        SkillKind::Posture { angles } => {
            for (joint, angle) in angles.iter().enumerate().skip(first_joint) {
                target[joint] = f32::from(*angle) * multiplier;
            }
        }
        SkillKind::Gait { frames } => {
            let Some(first) = frames.first() else {
                return;
            };
            for (offset, angle) in first.iter().enumerate() {
                if let Some(slot) = target.get_mut(first_joint + offset) {
                    *slot = f32::from(*angle) * multiplier;
                }
            }
        }
        SkillKind::Behaviour { .. } | SkillKind::Invalid => return,
    }
    rig.servos.transition(&target, first_joint, 1.0);
}

/// Posture angles being edited by direct joint moves: the active posture, or
/// the current servo angles when a gait or behaviour is active.
fn editable_posture(state: &ControlState, rig: &Rig) -> JointAngles {
    if let SkillKind::Posture { angles } = &state.skill.kind {
        return *angles;
    }
    let mut angles = [0i8; DOF];
    for (slot, angle) in angles.iter_mut().zip(rig.servos.current_angles()) {
        *slot = angle.round().clamp(f32::from(i8::MIN), f32::from(i8::MAX)) as i8;
    }
    angles
}

/// Store edited angles, turning a non-posture skill into a posture.
fn commit_posture(state: &mut ControlState, angles: JointAngles) {
    match state.skill.posture_angles_mut() {
        Some(slot) => *slot = angles,
        None => state.skill = Skill::posture(angles),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payload validation
// ────────────────────────────────────────────────────────────────────────────

fn validate(command: &ArgCommand) -> Result<(), PawError> {
    let op = command.op;
    let fail = |reason| Err(PawError::MalformedCommand { op, reason });
    let joint_ok = |j: i16| usize::try_from(j).is_ok_and(|j| j < DOF);
    let angle_ok = |a: i16| i8::try_from(a).is_ok();
    let args = &command.args[..];

    match op {
        ArgOp::Calibrate => match args {
            [] => Ok(()),
            [joint, value] => {
                if !joint_ok(*joint) {
                    fail("joint index out of range")
                } else if (-INCREMENTAL_BASE..=INCREMENTAL_BASE).contains(value) && !angle_ok(*value) {
                    fail("offset out of range")
                } else {
                    Ok(())
                }
            }
            _ => fail("expected no arguments or a joint and an offset"),
        },
        ArgOp::MoveSequentially => {
            if args.is_empty() || args.len() % 2 != 0 {
                return fail("expected joint/angle pairs");
            }
            if args.chunks_exact(2).any(|p| !joint_ok(p[0]) || !angle_ok(p[1])) {
                return fail("joint or angle out of range");
            }
            Ok(())
        }
        ArgOp::MoveSimultaneously => {
            if args.len() != DOF {
                return fail("expected one angle per joint");
            }
            if !args.iter().all(|a| angle_ok(*a)) {
                return fail("angle out of range");
            }
            Ok(())
        }
        ArgOp::Meow => {
            if args.len() > 2 {
                return fail("expected at most repeat and increment");
            }
            if !args.iter().all(|a| u8::try_from(*a).is_ok_and(|a| a < u8::MAX)) {
                return fail("repeat or increment out of range");
            }
            Ok(())
        }
        ArgOp::Beep => match args {
            [] => Ok(()),
            [note] | [note, _] if !angle_ok(*note) => fail("note out of range"),
            [_] => Ok(()),
            [_, duration] if *duration < 0 => fail("negative duration"),
            [_, _] => Ok(()),
            _ => fail("expected at most a note and a duration"),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pawos_hal::sim::{SimProbe, SimRig};
    use pawos_hal::{SkillBook, SkillKey};
    use pawos_types::{BehaviourFrame, LoopSpan, Move, Pace, WALKING_DOF};

    fn rest_pose() -> [i8; DOF] {
        let mut angles = [0; DOF];
        angles[8..].copy_from_slice(&[-60, -60, -60, -60, 60, 60, 60, 60]);
        angles
    }

    fn book() -> SkillBook {
        let walk = Skill::gait(&[[20; WALKING_DOF], [-20; WALKING_DOF]]).unwrap();
        let greet = Skill::behaviour(
            &[BehaviourFrame {
                angles: [30; DOF],
                speed: 8,
                delay: 1,
                trigger: None,
            }],
            LoopSpan::default(),
        )
        .unwrap();
        SkillBook::new()
            .with(SkillKey::Simple(SimpleCommand::Rest), Skill::posture(rest_pose()))
            .with(SkillKey::Simple(SimpleCommand::Balance), Skill::posture([0; DOF]))
            .with(SkillKey::Simple(SimpleCommand::Sit), Skill::posture([10; DOF]))
            .with(SkillKey::Simple(SimpleCommand::Greet), greet)
            .with(SkillKey::Move(Move::default()), walk.clone())
            .with(SkillKey::Move(Move::new(Pace::Medium, Direction::Left)), walk)
            .with(SkillKey::Calibration, Skill::posture([5; DOF]))
    }

    fn setup() -> (Router, ControlState, Rig, SimProbe) {
        let router = Router::new(Box::new(book()), &ControlConfig::default());
        let (rig, probe) = SimRig::new().build();
        (router, ControlState::default(), rig, probe)
    }

    fn args(op: ArgOp, values: &[i16]) -> Command {
        Command::from(ArgCommand::new(op, values).unwrap())
    }

    #[test]
    fn none_does_nothing() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(Command::None, &mut state, &mut rig).unwrap();
        assert!(probe.buzzer.cues().is_empty());
        assert_eq!(probe.servos.writes(), 0);
    }

    #[test]
    fn move_enables_motion_and_installs_gait() {
        let (router, mut state, mut rig, probe) = setup();
        let walk_left = Move::new(Pace::Medium, Direction::Left);
        router.process(walk_left.into(), &mut state, &mut rig).unwrap();

        assert!(state.motion_enabled);
        assert_eq!(state.move_cmd, walk_left);
        assert!(state.skill.is_gait());
        assert_eq!(state.last_command, Command::from(walk_left));
        assert_eq!(state.first_motion_joint, FIRST_LEG_JOINT);
        assert_eq!(state.offset_lr, STEERING_OFFSET_DEG);
        assert_eq!(state.compensation_factor, 0.5);
        assert_eq!(probe.buzzer.cues(), vec![Cue::ack()]);
        assert_eq!(rig.servos.current_angles()[FIRST_LEG_JOINT], 20.0);
    }

    #[test]
    fn repeated_command_only_acknowledges() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(SimpleCommand::Sit.into(), &mut state, &mut rig).unwrap();
        let writes = probe.servos.writes();
        router.process(SimpleCommand::Sit.into(), &mut state, &mut rig).unwrap();
        assert_eq!(probe.servos.writes(), writes);
        assert_eq!(probe.buzzer.cues().len(), 2);
    }

    #[test]
    fn invalid_skill_keeps_previous_motion() {
        let (router, mut state, mut rig, _) = setup();
        router.process(SimpleCommand::Sit.into(), &mut state, &mut rig).unwrap();
        router.process(SimpleCommand::Stretch.into(), &mut state, &mut rig).unwrap();
        assert_eq!(state.last_command, SimpleCommand::Sit);
        assert_eq!(state.skill, Skill::posture([10; DOF]));
    }

    #[test]
    fn rest_applies_pose_then_releases_servos() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(Move::default().into(), &mut state, &mut rig).unwrap();
        router.process(SimpleCommand::Rest.into(), &mut state, &mut rig).unwrap();
        assert!(!state.motion_enabled);
        assert_eq!(state.last_command, SimpleCommand::Rest);
        assert_eq!(state.skill, Skill::posture(rest_pose()));
        assert!(probe.servos.all_released());
        assert_eq!(rig.servos.current_angles()[8], -60.0);
    }

    #[test]
    fn behaviour_plays_then_falls_through_to_balance() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(SimpleCommand::Greet.into(), &mut state, &mut rig).unwrap();
        assert_eq!(state.last_command, SimpleCommand::Balance);
        assert_eq!(state.skill, Skill::posture([0; DOF]));
        assert_eq!(rig.servos.current_angles()[3], 0.0);
        assert_eq!(probe.clock.slept(), 50_000);
    }

    #[test]
    fn pause_toggles_motion_and_resume_is_silent() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(Move::default().into(), &mut state, &mut rig).unwrap();

        router.process(SimpleCommand::Pause.into(), &mut state, &mut rig).unwrap();
        assert!(!state.motion_enabled);
        assert!(probe.servos.all_released());
        let cues = probe.buzzer.cues().len();

        router.process(SimpleCommand::Pause.into(), &mut state, &mut rig).unwrap();
        assert!(state.motion_enabled);
        assert_eq!(probe.buzzer.cues().len(), cues);
        assert!(state.skill.is_gait());
    }

    #[test]
    fn gyro_toggle_flips_checking() {
        let (router, mut state, mut rig, _) = setup();
        state.saved_command = Some(Move::default().into());
        router.process(SimpleCommand::GyroToggle.into(), &mut state, &mut rig).unwrap();
        assert!(!state.check_gyro);
        assert!(state.motion_enabled);
        assert!(state.saved_command.is_none());
        assert_eq!(state.balance.counter(), 0);
        router.process(SimpleCommand::GyroToggle.into(), &mut state, &mut rig).unwrap();
        assert!(state.check_gyro);
    }

    #[test]
    fn calibration_entry_and_offsets() {
        let (router, mut state, mut rig, _) = setup();
        router.process(args(ArgOp::Calibrate, &[]), &mut state, &mut rig).unwrap();
        assert!(!state.check_gyro);
        assert_eq!(state.skill, Skill::posture([5; DOF]));

        router.process(args(ArgOp::Calibrate, &[3, 7]), &mut state, &mut rig).unwrap();
        assert_eq!(rig.servos.calibration()[3], 7);
        router.process(args(ArgOp::Calibrate, &[3, 1002]), &mut state, &mut rig).unwrap();
        assert_eq!(rig.servos.calibration()[3], 9);
        router.process(args(ArgOp::Calibrate, &[3, -1005]), &mut state, &mut rig).unwrap();
        assert_eq!(rig.servos.calibration()[3], 4);
        assert_eq!(rig.servos.current_angles()[3], 5.0);

        router
            .process(SimpleCommand::SaveServoCalibration.into(), &mut state, &mut rig)
            .unwrap();
        assert_eq!(rig.calibration.load().unwrap()[3], 4);
    }

    #[test]
    fn abort_calibration_restores_stored_offsets() {
        let (router, mut state, mut rig, _) = setup();
        router.process(args(ArgOp::Calibrate, &[2, 12]), &mut state, &mut rig).unwrap();
        assert_eq!(rig.servos.calibration()[2], 12);
        router
            .process(SimpleCommand::AbortServoCalibration.into(), &mut state, &mut rig)
            .unwrap();
        assert_eq!(rig.servos.calibration()[2], 0);
    }

    #[test]
    fn malformed_payload_is_rejected_without_state_change() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(Move::default().into(), &mut state, &mut rig).unwrap();
        let cues = probe.buzzer.cues().len();

        let err = router
            .process(args(ArgOp::MoveSimultaneously, &[0; 4]), &mut state, &mut rig)
            .unwrap_err();
        assert!(matches!(err, PawError::MalformedCommand { op: ArgOp::MoveSimultaneously, .. }));
        assert!(state.motion_enabled);
        assert_eq!(probe.buzzer.cues().len(), cues);

        for bad in [
            args(ArgOp::Calibrate, &[16, 0]),
            args(ArgOp::Calibrate, &[1]),
            args(ArgOp::Calibrate, &[1, 300]),
            args(ArgOp::MoveSequentially, &[8]),
            args(ArgOp::MoveSequentially, &[8, 200]),
            args(ArgOp::Meow, &[1, 2, 3]),
            args(ArgOp::Beep, &[1, -5]),
        ] {
            assert!(router.process(bad, &mut state, &mut rig).is_err());
        }
    }

    #[test]
    fn sequential_move_edits_posture() {
        let (router, mut state, mut rig, _) = setup();
        router.process(SimpleCommand::Sit.into(), &mut state, &mut rig).unwrap();
        router
            .process(args(ArgOp::MoveSequentially, &[8, 30, 9, -20]), &mut state, &mut rig)
            .unwrap();
        assert!(!state.motion_enabled);
        assert_eq!(rig.servos.current_angles()[8], 30.0);
        assert_eq!(rig.servos.current_angles()[9], -20.0);
        let SkillKind::Posture { angles } = state.skill.kind else {
            panic!("expected a posture");
        };
        assert_eq!((angles[8], angles[9], angles[10]), (30, -20, 10));
    }

    #[test]
    fn simultaneous_move_from_gait_becomes_posture() {
        let (router, mut state, mut rig, _) = setup();
        router.process(Move::default().into(), &mut state, &mut rig).unwrap();
        let mut pose = [0i16; DOF];
        pose[12] = 45;
        router
            .process(args(ArgOp::MoveSimultaneously, &pose), &mut state, &mut rig)
            .unwrap();
        assert!(!state.motion_enabled);
        assert!(state.skill.is_posture());
        assert_eq!(rig.servos.current_angles()[12], 45.0);
        assert_eq!(rig.servos.current_angles()[8], 0.0);
        assert_eq!(state.skill.posture_angles_mut().map(|a| a[12]), Some(45));
    }

    #[test]
    fn sounds_use_argument_defaults() {
        let (router, mut state, mut rig, probe) = setup();
        router.process(args(ArgOp::Meow, &[]), &mut state, &mut rig).unwrap();
        router.process(args(ArgOp::Meow, &[3, 2]), &mut state, &mut rig).unwrap();
        router.process(args(ArgOp::Beep, &[12, 40]), &mut state, &mut rig).unwrap();
        let cues = probe.buzzer.cues();
        assert_eq!(cues[0], Cue::meow(0, 1));
        assert_eq!(cues[2], Cue::meow(3, 3));
        assert_eq!(cues[4], Cue::beep(12, 40));
    }

    #[test]
    fn settle_to_rest_releases_servos() {
        let (router, mut state, mut rig, probe) = setup();
        router.settle_to_rest(&mut state, &mut rig);
        assert!(probe.servos.all_released());
        assert!(probe.buzzer.cues().is_empty());
        assert_eq!(state.skill, Skill::posture(rest_pose()));
    }
}
