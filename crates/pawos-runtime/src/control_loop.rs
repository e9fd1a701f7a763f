//! [`ControlLoop`] – the single-threaded duty dispatcher.
//!
//! ```text
//!   ┌──────────── wait_until_next_task ────────────┐
//!   │                                              ▼
//!   │                                      PowerGuard::check ── Low ──► suspended
//!   │                                              │ Nominal
//!   │            ┌─────────────────────────────────┼───────────────────────┐
//!   │            ▼                                 ▼                       ▼
//!   │   attitude (5 ms)                     input (15 ms)             motion (20 ms)
//!   │   balance tick → synthesized cmd      first decoded cmd         engine step
//!   │            └────────────► Router::process ◄──┘                   → servo bus
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop owns every piece of mutable state. Each iteration lends
//! [`ControlState`] and the [`Rig`] to exactly one duty.

use std::sync::atomic::{AtomicBool, Ordering};

use pawos_hal::{CommandSource, Cue, Rig, SkillLoader};
use pawos_kernel::{BalanceEvent, PowerGuard, PowerStatus, Scheduler};
use pawos_types::{Command, PawError, SimpleCommand};
use tracing::{debug, info, trace, warn};

use crate::config::ControlConfig;
use crate::motion::MotionEngine;
use crate::router::Router;
use crate::state::ControlState;

const DUTY_COUNT: usize = 3;

/// Periodic duty run by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duty {
    Attitude,
    Input,
    Motion,
}

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ran(Duty),
    /// The duty was due but the low-battery guard took the iteration.
    Suspended(Duty),
}

pub struct ControlLoop {
    scheduler: Scheduler<DUTY_COUNT>,
    duties: [Duty; DUTY_COUNT],
    state: ControlState,
    rig: Rig,
    router: Router,
    sources: Vec<Box<dyn CommandSource>>,
    engine: MotionEngine,
    power: PowerGuard,
    last_dispatch_us: u64,
}

impl ControlLoop {
    /// Register the three duties and settle the robot into its rest pose.
    ///
    /// # Errors
    ///
    /// [`PawError::Config`] if `config` does not validate.
    pub fn new(
        config: &ControlConfig,
        mut rig: Rig,
        loader: Box<dyn SkillLoader>,
        sources: Vec<Box<dyn CommandSource>>,
    ) -> Result<Self, PawError> {
        config.validate()?;

        let mut scheduler = Scheduler::new();
        let duties = [
            (Duty::Attitude, config.attitude_period_us),
            (Duty::Input, config.input_period_us),
            (Duty::Motion, config.motion_period_us),
        ];
        for (_, period_us) in duties {
            scheduler.register_task(period_us)?;
        }

        let mut state = ControlState::new(config);
        let router = Router::new(loader, config);
        router.settle_to_rest(&mut state, &mut rig);
        let last_dispatch_us = rig.clock.now_us();

        info!(
            attitude_us = config.attitude_period_us,
            input_us = config.input_period_us,
            motion_us = config.motion_period_us,
            sources = sources.len(),
            "control loop ready"
        );

        Ok(Self {
            scheduler,
            duties: duties.map(|(duty, _)| duty),
            state,
            rig,
            router,
            sources,
            engine: MotionEngine::new(),
            power: PowerGuard::new(config.power_cooldown_ms),
            last_dispatch_us,
        })
    }

    /// Wait for the next due duty and run it.
    ///
    /// # Errors
    ///
    /// Only scheduler errors are returned; command errors are logged and the
    /// command dropped.
    pub fn run_once(&mut self) -> Result<Dispatch, PawError> {
        let task = self.scheduler.wait_until_next_task(&mut *self.rig.clock)?;
        let now = self.rig.clock.now_us();
        let delta_us = now.saturating_sub(self.last_dispatch_us);
        self.last_dispatch_us = now;
        let duty = self.duties[task];
        debug!(task, ?duty, delta_us, "dispatch");

        if self.power.check(&mut self.rig) == PowerStatus::Suspended {
            return Ok(Dispatch::Suspended(duty));
        }
        match duty {
            Duty::Attitude => self.attitude_duty(),
            Duty::Input => self.input_duty(),
            Duty::Motion => self.motion_duty(),
        }
        Ok(Dispatch::Ran(duty))
    }

    /// Run until `stop` is set.
    ///
    /// # Errors
    ///
    /// See [`ControlLoop::run_once`].
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), PawError> {
        while !stop.load(Ordering::Relaxed) {
            self.run_once()?;
        }
        info!("control loop stopped");
        Ok(())
    }

    /// Route a command outside the input duty (start-up scripts, tests).
    pub fn route(&mut self, command: Command) {
        if command.is_none() {
            return;
        }
        if let Err(err) = self.router.process(command, &mut self.state, &mut self.rig) {
            warn!(%err, "command dropped");
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut Rig {
        &mut self.rig
    }

    pub fn power(&self) -> &PowerGuard {
        &self.power
    }

    // ── duties ───────────────────────────────────────────────────────────────

    fn attitude_duty(&mut self) {
        if !self.state.check_gyro {
            return;
        }
        let state = &mut self.state;
        let event = state.balance.tick(
            &mut state.attitude,
            self.rig.imu.as_mut(),
            &state.skill,
            &mut state.deviation,
        );

        let pending = match event {
            BalanceEvent::Tipped {
                entered,
                roll_exceeded,
            } => {
                if entered {
                    state.saved_command = Some(state.last_command.clone());
                }
                if roll_exceeded {
                    Command::Simple(SimpleCommand::Recover)
                } else {
                    Command::None
                }
            }
            BalanceEvent::Recovered => {
                let restored = state
                    .saved_command
                    .take()
                    .unwrap_or_else(|| state.last_command.clone());
                state.last_command = Command::Simple(SimpleCommand::Balance);
                self.rig.play(Cue::meow(1, 5));
                info!(?restored, "restoring interrupted command");
                restored
            }
            BalanceEvent::Steady | BalanceEvent::Recovering { .. } => Command::None,
        };
        self.route(pending);
    }

    fn input_duty(&mut self) {
        let mut routed = None;
        for source in &mut self.sources {
            let command = source.poll();
            if command.is_none() {
                continue;
            }
            if routed.is_none() {
                debug!(source = source.name(), ?command, "command received");
                routed = Some(command);
            } else {
                debug!(source = source.name(), ?command, "command dropped this tick");
            }
        }
        if let Some(command) = routed {
            self.route(command);
        }
    }

    fn motion_duty(&mut self) {
        let targets = self.engine.step(&mut self.state);
        let written = self.rig.servos.write_targets(&targets);
        trace!(written, frame = self.state.frame_index, "motion tick");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pawos_hal::sim::{ScriptedSource, SimProbe, SimRig};
    use pawos_hal::{BatteryLevel, SkillBook, SkillKey};
    use pawos_kernel::BalanceState;
    use pawos_types::{BehaviourFrame, DOF, LoopSpan, Move, Skill, WALKING_DOF};

    fn book() -> SkillBook {
        let recover = Skill::behaviour(
            &[BehaviourFrame {
                angles: [0; DOF],
                speed: 8,
                delay: 0,
                trigger: None,
            }],
            LoopSpan::default(),
        )
        .unwrap();
        SkillBook::new()
            .with(SkillKey::Simple(SimpleCommand::Rest), Skill::posture([-20; DOF]))
            .with(SkillKey::Simple(SimpleCommand::Balance), Skill::posture([0; DOF]))
            .with(SkillKey::Simple(SimpleCommand::Sit), Skill::posture([10; DOF]))
            .with(SkillKey::Simple(SimpleCommand::Recover), recover)
            .with(
                SkillKey::Move(Move::default()),
                Skill::gait(&[[15; WALKING_DOF], [-15; WALKING_DOF]]).unwrap(),
            )
    }

    fn control(rig: SimRig, sources: Vec<Box<dyn CommandSource>>) -> (ControlLoop, SimProbe) {
        let (rig, probe) = rig.build();
        let ctl = ControlLoop::new(&ControlConfig::default(), rig, Box::new(book()), sources).unwrap();
        (ctl, probe)
    }

    #[test]
    fn starts_at_rest_with_servos_released() {
        let (ctl, probe) = control(SimRig::new(), Vec::new());
        assert_eq!(ctl.state().last_command, SimpleCommand::Rest);
        assert!(probe.servos.all_released());
        assert_eq!(ctl.rig().servos.current_angles()[8], -20.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (rig, _) = SimRig::new().build();
        let config = ControlConfig {
            input_period_us: 0,
            ..ControlConfig::default()
        };
        let err = ControlLoop::new(&config, rig, Box::new(book()), Vec::new()).err();
        assert!(matches!(err, Some(PawError::Config(_))));
    }

    #[test]
    fn duties_follow_their_periods() {
        let (mut ctl, probe) = control(SimRig::new(), Vec::new());
        let order: Vec<Dispatch> = (0..6).map(|_| ctl.run_once().unwrap()).collect();
        assert_eq!(
            order,
            vec![
                Dispatch::Ran(Duty::Attitude),
                Dispatch::Ran(Duty::Attitude),
                Dispatch::Ran(Duty::Attitude),
                Dispatch::Ran(Duty::Input),
                Dispatch::Ran(Duty::Attitude),
                Dispatch::Ran(Duty::Motion),
            ]
        );
        assert_eq!(probe.clock.now(), 20_000);
    }

    #[test]
    fn input_routes_first_command_and_drops_the_rest() {
        let first = ScriptedSource::new("infrared");
        let second = ScriptedSource::new("serial");
        first.push(SimpleCommand::Sit);
        second.push(Move::default());
        let (mut ctl, _) = control(
            SimRig::new(),
            vec![Box::new(first.clone()), Box::new(second.clone())],
        );

        while ctl.run_once().unwrap() != Dispatch::Ran(Duty::Input) {}
        assert_eq!(ctl.state().last_command, SimpleCommand::Sit);
        assert!(!ctl.state().motion_enabled);
        assert_eq!(second.pending(), 0);
    }

    #[test]
    fn motion_duty_drives_every_joint_in_posture_mode() {
        let (mut ctl, probe) = control(SimRig::new(), Vec::new());
        ctl.route(SimpleCommand::Sit.into());
        loop {
            let before = probe.servos.writes();
            if ctl.run_once().unwrap() == Dispatch::Ran(Duty::Motion) {
                assert_eq!(probe.servos.writes() - before, DOF);
                break;
            }
        }
        assert!(!probe.servos.all_released());
    }

    #[test]
    fn low_battery_suspends_the_due_duty() {
        let (mut ctl, probe) = control(SimRig::new().with_battery(BatteryLevel::Low), Vec::new());
        assert_eq!(ctl.run_once().unwrap(), Dispatch::Suspended(Duty::Attitude));
        assert_eq!(probe.clock.now(), 5_000 + 1_500_000);
        assert_eq!(probe.imu.reads(), 0);
        assert_eq!(ctl.power().suspensions(), 1);

        probe.battery.set_level(BatteryLevel::Normal);
        assert!(matches!(ctl.run_once().unwrap(), Dispatch::Ran(_)));
    }

    #[test]
    fn gyro_off_skips_attitude_reads() {
        let (mut ctl, probe) = control(SimRig::new(), Vec::new());
        ctl.route(SimpleCommand::GyroToggle.into());
        assert!(!ctl.state().check_gyro);
        ctl.run_once().unwrap();
        assert_eq!(probe.imu.reads(), 0);
    }

    #[test]
    fn tip_over_recovers_and_restores_interrupted_command() {
        let (mut ctl, probe) = control(SimRig::new().with_tilt_deg(100.0, 0.0), Vec::new());
        ctl.route(Move::default().into());
        assert!(ctl.state().skill.is_gait());

        assert_eq!(ctl.run_once().unwrap(), Dispatch::Ran(Duty::Attitude));
        assert_eq!(ctl.state().balance.state(), BalanceState::Tipped);
        assert_eq!(ctl.state().saved_command, Some(Command::from(Move::default())));
        // the recover behaviour ran and fell through to balance
        assert_eq!(ctl.state().last_command, SimpleCommand::Balance);
        assert!(ctl.state().deviation.is_zero());

        probe.imu.set_tilt_deg(0.0, 0.0);
        for _ in 0..200 {
            ctl.run_once().unwrap();
            if ctl.state().balance.state() == BalanceState::RecoveryComplete {
                break;
            }
        }
        assert_eq!(ctl.state().balance.state(), BalanceState::RecoveryComplete);
        assert_eq!(ctl.state().last_command, Command::from(Move::default()));
        assert!(ctl.state().skill.is_gait());
        assert!(ctl.state().saved_command.is_none());
        assert!(probe.buzzer.cues().contains(&Cue::meow(1, 5)));
    }

    #[test]
    fn pitch_only_tip_does_not_route_recover() {
        let (mut ctl, probe) = control(SimRig::new().with_tilt_deg(0.0, 80.0), Vec::new());
        ctl.route(SimpleCommand::Sit.into());
        let cues = probe.buzzer.cues().len();

        assert_eq!(ctl.run_once().unwrap(), Dispatch::Ran(Duty::Attitude));
        assert_eq!(ctl.state().balance.state(), BalanceState::Tipped);
        assert_eq!(ctl.state().last_command, SimpleCommand::Sit);
        assert_eq!(ctl.state().skill, Skill::posture([10; DOF]));
        assert_eq!(probe.buzzer.cues().len(), cues);

        probe.imu.set_tilt_deg(0.0, 0.0);
        for _ in 0..200 {
            ctl.run_once().unwrap();
            if ctl.state().balance.state() == BalanceState::RecoveryComplete {
                break;
            }
        }
        assert_eq!(ctl.state().balance.state(), BalanceState::RecoveryComplete);
        assert_eq!(ctl.state().last_command, SimpleCommand::Sit);
        assert_eq!(ctl.state().skill, Skill::posture([10; DOF]));
    }

    #[test]
    fn gyro_off_during_recovery_keeps_newer_command() {
        let (mut ctl, probe) = control(SimRig::new().with_tilt_deg(100.0, 0.0), Vec::new());
        ctl.route(Move::default().into());
        assert_eq!(ctl.run_once().unwrap(), Dispatch::Ran(Duty::Attitude));
        assert_eq!(ctl.state().saved_command, Some(Command::from(Move::default())));

        ctl.route(SimpleCommand::GyroToggle.into());
        assert_eq!(ctl.state().balance.state(), BalanceState::Level);
        assert!(ctl.state().saved_command.is_none());
        probe.imu.set_tilt_deg(0.0, 0.0);
        ctl.route(SimpleCommand::Sit.into());
        for _ in 0..50 {
            ctl.run_once().unwrap();
        }

        ctl.route(SimpleCommand::GyroToggle.into());
        assert!(ctl.state().check_gyro);
        for _ in 0..60 {
            ctl.run_once().unwrap();
        }
        assert_eq!(ctl.state().last_command, SimpleCommand::Sit);
        assert!(ctl.state().skill.is_posture());
        assert_eq!(ctl.state().balance.state(), BalanceState::Level);
    }

    #[test]
    fn run_returns_when_stop_is_set() {
        let (mut ctl, probe) = control(SimRig::new(), Vec::new());
        let stop = AtomicBool::new(true);
        ctl.run(&stop).unwrap();
        assert_eq!(probe.clock.now(), 0);
    }
}
