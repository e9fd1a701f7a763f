//! Headless collaborators for tests and host runs.
//!
//! Every simulated part is a cheap `Clone` handle over shared state: box one
//! copy into the [`Rig`] and keep the other to script inputs or inspect what
//! the control loop did. [`SimRig`] wires a full set together.
//!
//! ```rust
//! use pawos_hal::sim::SimRig;
//! use pawos_hal::{Clock, ImuSensor};
//!
//! let (mut rig, probe) = SimRig::new().with_tilt_deg(0.0, 5.0).build();
//! let sample = rig.imu.read_sample();
//! assert!(sample.accel[0] < 0.0);
//! rig.clock.sleep_us(250);
//! assert_eq!(probe.clock.now(), 250);
//! ```
//!
//! The simulation is single threaded, so state is shared through `Rc`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use pawos_types::{Command, DOF, OrientationSample};

use crate::calibration::MemoryCalibrationStore;
use crate::clock::Clock;
use crate::feedback::{Buzzer, Cue};
use crate::imu::ImuSensor;
use crate::input::CommandSource;
use crate::power::{BatteryLevel, PowerMonitor};
use crate::rig::Rig;
use crate::servo::{JointProfile, ServoBus, ServoDriver, default_profiles};

// ────────────────────────────────────────────────────────────────────────────
// Clock
// ────────────────────────────────────────────────────────────────────────────

/// Virtual microsecond clock; sleeping advances it instantly.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<u64>>,
    slept: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Move time forward without counting it as sleep (simulated work).
    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get() + us);
    }

    /// Total time spent in `sleep_us`.
    pub fn slept(&self) -> u64 {
        self.slept.get()
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u64 {
        self.now.get()
    }

    fn sleep_us(&mut self, us: u64) {
        self.advance(us);
        self.slept.set(self.slept.get() + us);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// IMU
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ImuScript {
    steady: (f32, f32),
    queued: VecDeque<(f32, f32)>,
    reads: usize,
}

/// Motionless IMU reporting a settable tilt.
///
/// Queued tilts are consumed one per read before falling back to the steady
/// tilt. Samples are stamped with the [`SimClock`] time.
#[derive(Debug, Clone)]
pub struct SimImu {
    clock: SimClock,
    script: Rc<RefCell<ImuScript>>,
}

impl SimImu {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            script: Rc::default(),
        }
    }

    pub fn set_tilt_deg(&self, roll: f32, pitch: f32) {
        self.script.borrow_mut().steady = (roll.to_radians(), pitch.to_radians());
    }

    /// Report this tilt for exactly one read.
    pub fn push_tilt_deg(&self, roll: f32, pitch: f32) {
        self.script
            .borrow_mut()
            .queued
            .push_back((roll.to_radians(), pitch.to_radians()));
    }

    pub fn reads(&self) -> usize {
        self.script.borrow().reads
    }
}

impl ImuSensor for SimImu {
    fn read_sample(&mut self) -> OrientationSample {
        let mut script = self.script.borrow_mut();
        script.reads += 1;
        let (roll, pitch) = script.queued.pop_front().unwrap_or(script.steady);
        OrientationSample::from_tilt(roll, pitch, self.clock.now())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Servos
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ServoLog {
    duties: [Option<u16>; DOF],
    writes: usize,
    releases: usize,
}

/// PWM driver that records the last duty per channel.
#[derive(Debug, Clone, Default)]
pub struct SimServos {
    log: Rc<RefCell<ServoLog>>,
}

impl SimServos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last duty written to `joint`, `None` if never driven or released since.
    pub fn duty(&self, joint: usize) -> Option<u16> {
        self.log.borrow().duties[joint]
    }

    pub fn writes(&self) -> usize {
        self.log.borrow().writes
    }

    pub fn releases(&self) -> usize {
        self.log.borrow().releases
    }

    pub fn all_released(&self) -> bool {
        self.log.borrow().duties.iter().all(Option::is_none)
    }
}

impl ServoDriver for SimServos {
    fn set_duty(&mut self, joint: usize, duty: u16) {
        let mut log = self.log.borrow_mut();
        log.duties[joint] = Some(duty);
        log.writes += 1;
    }

    fn release(&mut self, joint: usize) {
        let mut log = self.log.borrow_mut();
        log.duties[joint] = None;
        log.releases += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Buzzer, battery, command source
// ────────────────────────────────────────────────────────────────────────────

/// Buzzer that records every cue.
#[derive(Debug, Clone, Default)]
pub struct SimBuzzer {
    cues: Rc<RefCell<Vec<Cue>>>,
}

impl SimBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.borrow().clone()
    }

    pub fn clear(&self) {
        self.cues.borrow_mut().clear();
    }
}

impl Buzzer for SimBuzzer {
    fn play(&mut self, cue: Cue) {
        self.cues.borrow_mut().push(cue);
    }
}

#[derive(Debug, Clone)]
pub struct SimBattery {
    level: Rc<Cell<BatteryLevel>>,
}

impl SimBattery {
    pub fn new(level: BatteryLevel) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
        }
    }

    pub fn set_level(&self, level: BatteryLevel) {
        self.level.set(level);
    }
}

impl PowerMonitor for SimBattery {
    fn battery_level(&mut self) -> BatteryLevel {
        self.level.get()
    }
}

/// Command source fed from a test script.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    name: String,
    queue: Rc<RefCell<VecDeque<Command>>>,
}

impl ScriptedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Rc::default(),
        }
    }

    pub fn push(&self, command: impl Into<Command>) {
        self.queue.borrow_mut().push_back(command.into());
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl CommandSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> Command {
        self.queue.borrow_mut().pop_front().unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRig builder
// ────────────────────────────────────────────────────────────────────────────

/// Handles onto the simulated parts inside a [`Rig`] built by [`SimRig`].
#[derive(Debug, Clone)]
pub struct SimProbe {
    pub clock: SimClock,
    pub imu: SimImu,
    pub servos: SimServos,
    pub buzzer: SimBuzzer,
    pub battery: SimBattery,
}

/// Builder for a [`Rig`] made entirely of simulated parts.
pub struct SimRig {
    calibration: [i8; DOF],
    profiles: [JointProfile; DOF],
    tilt_deg: (f32, f32),
    battery: BatteryLevel,
}

impl Default for SimRig {
    fn default() -> Self {
        Self {
            calibration: [0; DOF],
            profiles: default_profiles(),
            tilt_deg: (0.0, 0.0),
            battery: BatteryLevel::Normal,
        }
    }
}

impl SimRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets held by the calibration store at start-up.
    pub fn with_calibration(mut self, offsets: [i8; DOF]) -> Self {
        self.calibration = offsets;
        self
    }

    pub fn with_profiles(mut self, profiles: [JointProfile; DOF]) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_tilt_deg(mut self, roll: f32, pitch: f32) -> Self {
        self.tilt_deg = (roll, pitch);
        self
    }

    pub fn with_battery(mut self, level: BatteryLevel) -> Self {
        self.battery = level;
        self
    }

    /// Consume the builder. The servo bus starts with the stored offsets
    /// already applied.
    pub fn build(self) -> (Rig, SimProbe) {
        let clock = SimClock::new();
        let imu = SimImu::new(clock.clone());
        imu.set_tilt_deg(self.tilt_deg.0, self.tilt_deg.1);
        let servos = SimServos::new();
        let buzzer = SimBuzzer::new();
        let battery = SimBattery::new(self.battery);

        let rig = Rig {
            imu: Box::new(imu.clone()),
            servos: ServoBus::new(Box::new(servos.clone()), self.profiles)
                .with_calibration(self.calibration),
            buzzer: Box::new(buzzer.clone()),
            calibration: Box::new(MemoryCalibrationStore::new(self.calibration)),
            power: Box::new(battery.clone()),
            clock: Box::new(clock.clone()),
        };
        let probe = SimProbe {
            clock,
            imu,
            servos,
            buzzer,
            battery,
        };
        (rig, probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawos_types::SimpleCommand;

    #[test]
    fn sim_clock_sleep_is_recorded() {
        let mut clock = SimClock::new();
        clock.advance(100);
        clock.sleep_us(400);
        assert_eq!(clock.now_us(), 500);
        assert_eq!(clock.slept(), 400);
    }

    #[test]
    fn queued_tilts_are_read_once_then_steady() {
        let clock = SimClock::new();
        let mut imu = SimImu::new(clock.clone());
        imu.set_tilt_deg(0.0, 0.0);
        imu.push_tilt_deg(0.0, 90.0);

        let tipped = imu.read_sample();
        assert!((tipped.accel[0] + 1.0).abs() < 1e-5);
        let level = imu.read_sample();
        assert!(level.accel[0].abs() < 1e-6);
        assert_eq!(imu.reads(), 2);
    }

    #[test]
    fn imu_samples_carry_clock_time() {
        let clock = SimClock::new();
        let mut imu = SimImu::new(clock.clone());
        clock.advance(1_234);
        assert_eq!(imu.read_sample().timestamp_us, 1_234);
    }

    #[test]
    fn scripted_source_drains_in_order() {
        let handle = ScriptedSource::new("serial");
        let mut source: Box<dyn CommandSource> = Box::new(handle.clone());
        handle.push(SimpleCommand::Sit);
        handle.push(SimpleCommand::Rest);
        assert_eq!(handle.pending(), 2);
        assert_eq!(source.poll(), SimpleCommand::Sit);
        assert_eq!(source.poll(), SimpleCommand::Rest);
        assert!(source.poll().is_none());
    }

    #[test]
    fn sim_rig_probe_observes_rig_parts() {
        let mut offsets = [0; DOF];
        offsets[3] = 2;
        let (mut rig, probe) = SimRig::new()
            .with_calibration(offsets)
            .with_battery(BatteryLevel::Low)
            .build();

        assert_eq!(rig.servos.calibration()[3], 2);
        assert_eq!(rig.power.battery_level(), BatteryLevel::Low);
        probe.battery.set_level(BatteryLevel::Normal);
        assert_eq!(rig.power.battery_level(), BatteryLevel::Normal);

        rig.servos.calibrated_pwm(9, 0.0);
        assert!(probe.servos.duty(9).is_some());
        rig.servos.shut_all();
        assert!(probe.servos.all_released());
        assert_eq!(probe.servos.releases(), DOF);

        rig.play(Cue::ack());
        assert_eq!(probe.buzzer.cues(), vec![Cue::ack()]);
    }
}
