//! [`BalanceMonitor`] – tip-over detection and recovery.
//!
//! One [`tick`](BalanceMonitor::tick) per attitude duty. The monitor reads the
//! IMU, updates the shared [`AttitudeEstimator`], and walks this state
//! machine:
//!
//! | State | Meaning | Next tick |
//! |---|---|---|
//! | `Level` | counter is 0 | `Tipped` when a large angle is seen |
//! | `Tipped` | counter was just set to the grace value | `Tipped` while still over, else `Recovering` |
//! | `Recovering` | counter counting down | `RecoveryComplete` when it reaches 0 |
//! | `RecoveryComplete` | one-tick state after the counter hit 0 | `Level` (or `Tipped`) |
//!
//! While tipped or recovering the attitude estimate is re-anchored every tick
//! and the posture deviation terms are held at zero so the leveling
//! compensation does not fight the recovery.

use pawos_hal::ImuSensor;
use pawos_perception::AttitudeEstimator;
use pawos_perception::filters::{deadband, smooth};
use pawos_types::{Angles, Skill};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Attitude ticks to wait after the last large angle before recovering.
    pub grace_ticks: u8,
    pub large_pitch_deg: f32,
    pub large_roll_deg: f32,
    /// IIR weight of the newest deviation sample.
    pub deviation_weight: f32,
    pub roll_tolerance_deg: f32,
    pub pitch_tolerance_deg: f32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            grace_ticks: 10,
            large_pitch_deg: 75.0,
            large_roll_deg: 90.0,
            deviation_weight: 0.5,
            roll_tolerance_deg: 3.0,
            pitch_tolerance_deg: 2.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Deviation terms
// ────────────────────────────────────────────────────────────────────────────

/// Smoothed difference (degrees) between the body attitude and the attitude
/// the active posture was authored for.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviationTerms {
    pub roll: f32,
    pub pitch: f32,
}

impl DeviationTerms {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fold one attitude estimate into the smoothed terms.
    pub fn update(&mut self, angles: Angles, skill: &Skill, config: &BalanceConfig) {
        let roll_dev = angles.roll_deg() - skill.nominal_roll;
        let pitch_dev = angles.pitch_deg() - skill.nominal_pitch;
        self.roll = deadband(
            smooth(self.roll, roll_dev, config.deviation_weight),
            config.roll_tolerance_deg,
        );
        self.pitch = deadband(
            smooth(self.pitch, pitch_dev, config.deviation_weight),
            config.pitch_tolerance_deg,
        );
    }

    pub fn is_zero(&self) -> bool {
        self.roll == 0.0 && self.pitch == 0.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceState {
    #[default]
    Level,
    Tipped,
    Recovering,
    RecoveryComplete,
}

/// Outcome of one attitude tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEvent {
    Steady,
    /// A large angle was seen this tick. `entered` marks the Level → Tipped
    /// edge; `roll_exceeded` asks the caller to issue the recover override.
    Tipped { entered: bool, roll_exceeded: bool },
    Recovering { remaining: u8 },
    /// The grace period just ran out; the caller restores the interrupted
    /// command.
    Recovered,
}

#[derive(Debug, Clone, Default)]
pub struct BalanceMonitor {
    config: BalanceConfig,
    counter: u8,
    state: BalanceState,
}

impl BalanceMonitor {
    pub fn new(config: BalanceConfig) -> Self {
        Self {
            config,
            counter: 0,
            state: BalanceState::Level,
        }
    }

    /// Run one attitude-duty tick.
    pub fn tick(
        &mut self,
        attitude: &mut AttitudeEstimator,
        imu: &mut dyn ImuSensor,
        skill: &Skill,
        deviation: &mut DeviationTerms,
    ) -> BalanceEvent {
        let angles = attitude.update(&imu.read_sample());
        let pitch_exceeded = angles.pitch.abs() > self.config.large_pitch_deg.to_radians();
        let roll_exceeded = angles.roll.abs() > self.config.large_roll_deg.to_radians();

        let event = if pitch_exceeded || roll_exceeded {
            let entered = self.counter == 0;
            if entered {
                info!(
                    roll = angles.roll_deg(),
                    pitch = angles.pitch_deg(),
                    "tip-over detected"
                );
            }
            self.counter = self.config.grace_ticks.max(1);
            attitude.reset();
            self.state = BalanceState::Tipped;
            BalanceEvent::Tipped {
                entered,
                roll_exceeded,
            }
        } else if self.counter > 0 {
            attitude.reset();
            self.counter -= 1;
            if self.counter == 0 {
                attitude.reset();
                attitude.update(&imu.read_sample());
                self.state = BalanceState::RecoveryComplete;
                info!("recovered from tip-over");
                BalanceEvent::Recovered
            } else {
                self.state = BalanceState::Recovering;
                debug!(remaining = self.counter, "recovering");
                BalanceEvent::Recovering {
                    remaining: self.counter,
                }
            }
        } else {
            self.state = BalanceState::Level;
            BalanceEvent::Steady
        };

        match event {
            BalanceEvent::Tipped { .. } | BalanceEvent::Recovering { .. } => deviation.clear(),
            BalanceEvent::Steady | BalanceEvent::Recovered => {
                deviation.update(attitude.angles(), skill, &self.config)
            }
        }
        event
    }

    pub fn state(&self) -> BalanceState {
        self.state
    }

    /// Drop any pending recovery and return to `Level`.
    pub fn cancel(&mut self) {
        if self.counter > 0 {
            debug!(remaining = self.counter, "recovery cancelled");
        }
        self.counter = 0;
        self.state = BalanceState::Level;
    }

    /// Remaining grace ticks; zero when level.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pawos_hal::sim::{SimClock, SimImu};
    use pawos_types::DOF;

    struct Bench {
        monitor: BalanceMonitor,
        attitude: AttitudeEstimator,
        imu: SimImu,
        skill: Skill,
        deviation: DeviationTerms,
    }

    impl Bench {
        fn new() -> Self {
            let imu = SimImu::new(SimClock::new());
            Self {
                monitor: BalanceMonitor::new(BalanceConfig::default()),
                attitude: AttitudeEstimator::new(0.98),
                imu,
                skill: Skill::posture([0; DOF]),
                deviation: DeviationTerms::default(),
            }
        }

        fn tick(&mut self) -> BalanceEvent {
            let mut imu = self.imu.clone();
            self.monitor
                .tick(&mut self.attitude, &mut imu, &self.skill, &mut self.deviation)
        }
    }

    #[test]
    fn level_body_stays_steady() {
        let mut b = Bench::new();
        for _ in 0..5 {
            assert_eq!(b.tick(), BalanceEvent::Steady);
        }
        assert_eq!(b.monitor.state(), BalanceState::Level);
        assert!(b.deviation.is_zero());
    }

    #[test]
    fn pitch_tip_recovers_after_grace_plus_one_ticks() {
        let mut b = Bench::new();
        b.imu.set_tilt_deg(0.0, 80.0);
        assert_eq!(
            b.tick(),
            BalanceEvent::Tipped {
                entered: true,
                roll_exceeded: false
            }
        );
        assert_eq!(b.monitor.state(), BalanceState::Tipped);

        b.imu.set_tilt_deg(0.0, 0.0);
        for remaining in (1..10).rev() {
            assert_eq!(b.tick(), BalanceEvent::Recovering { remaining });
            assert_eq!(b.monitor.state(), BalanceState::Recovering);
        }
        assert_eq!(b.tick(), BalanceEvent::Recovered);
        assert_eq!(b.monitor.state(), BalanceState::RecoveryComplete);
        // grace + 1 ticks after the tilt returned: level again
        assert_eq!(b.tick(), BalanceEvent::Steady);
        assert_eq!(b.monitor.state(), BalanceState::Level);
    }

    #[test]
    fn roll_tip_requests_recover() {
        let mut b = Bench::new();
        b.imu.set_tilt_deg(120.0, 0.0);
        assert_eq!(
            b.tick(),
            BalanceEvent::Tipped {
                entered: true,
                roll_exceeded: true
            }
        );
        // still over: same request, no new edge
        assert_eq!(
            b.tick(),
            BalanceEvent::Tipped {
                entered: false,
                roll_exceeded: true
            }
        );
        assert_eq!(b.monitor.counter(), 10);
    }

    #[test]
    fn cancel_drops_pending_recovery() {
        let mut b = Bench::new();
        b.imu.set_tilt_deg(0.0, 80.0);
        b.tick();
        b.imu.set_tilt_deg(0.0, 0.0);
        assert_eq!(b.tick(), BalanceEvent::Recovering { remaining: 9 });

        b.monitor.cancel();
        assert_eq!(b.monitor.counter(), 0);
        assert_eq!(b.monitor.state(), BalanceState::Level);
        for _ in 0..12 {
            assert_eq!(b.tick(), BalanceEvent::Steady);
        }
    }

    #[test]
    fn recovered_tick_reads_imu_twice() {
        let mut b = Bench::new();
        b.imu.set_tilt_deg(0.0, 80.0);
        b.tick();
        b.imu.set_tilt_deg(0.0, 0.0);
        for _ in 0..9 {
            b.tick();
        }
        let before = b.imu.reads();
        assert_eq!(b.tick(), BalanceEvent::Recovered);
        assert_eq!(b.imu.reads(), before + 2);
    }

    #[test]
    fn deviation_is_zero_while_recovering_even_if_tilted() {
        let mut b = Bench::new();
        b.imu.set_tilt_deg(0.0, 80.0);
        b.tick();
        // moderate lean that would produce a deviation when level
        b.imu.set_tilt_deg(20.0, 30.0);
        for _ in 0..9 {
            b.tick();
            assert!(b.deviation.is_zero());
        }
    }

    #[test]
    fn deviation_tracks_lean_relative_to_nominal() {
        let mut b = Bench::new();
        b.skill = Skill::posture([0; DOF]).with_nominal(0.0, 10.0);
        b.imu.set_tilt_deg(20.0, 10.0);
        for _ in 0..30 {
            b.tick();
        }
        assert!((b.deviation.roll - 20.0).abs() < 0.1);
        assert_eq!(b.deviation.pitch, 0.0);
    }

    #[test]
    fn deviation_decays_monotonically_into_deadband() {
        let config = BalanceConfig::default();
        let skill = Skill::posture([0; DOF]);
        let mut dev = DeviationTerms {
            roll: 12.0,
            pitch: -9.0,
        };
        let mut prev = dev;
        for _ in 0..10 {
            dev.update(Angles::default(), &skill, &config);
            assert!(dev.roll.abs() <= prev.roll.abs());
            assert!(dev.pitch.abs() <= prev.pitch.abs());
            prev = dev;
        }
        assert!(dev.is_zero());
    }
}
