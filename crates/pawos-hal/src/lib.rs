//! `pawos-hal` – collaborator boundary of the control core.
//!
//! The core never touches registers, files or timers directly. It talks to
//! the traits below, and the board (or the simulator in [`sim`]) provides the
//! implementations.
//!
//! | Module | Contents |
//! |---|---|
//! | [`imu`] | [`ImuSensor`] and the body-frame sign normalizer |
//! | [`input`] | [`CommandSource`] decoders feeding the input duty |
//! | [`loader`] | [`SkillLoader`] and the in-memory [`SkillBook`] |
//! | [`servo`] | [`ServoDriver`] and the calibrated [`ServoBus`] |
//! | [`feedback`] | [`Buzzer`] cues |
//! | [`calibration`] | [`CalibrationStore`] persistence |
//! | [`power`] | [`PowerMonitor`] battery level |
//! | [`clock`] | [`Clock`] time source used by the scheduler |
//! | [`rig`] | [`Rig`], the owned bundle of all of the above |
//! | [`sim`] | headless implementations for tests and host runs |

pub mod calibration;
pub mod clock;
pub mod feedback;
pub mod imu;
pub mod input;
pub mod loader;
pub mod power;
pub mod rig;
pub mod servo;
pub mod sim;

pub use calibration::{CalibrationStore, MemoryCalibrationStore, TomlCalibrationStore};
pub use clock::{Clock, SystemClock};
pub use feedback::{Buzzer, Cue};
pub use imu::{BodyFrameImu, ImuSensor};
pub use input::{ChannelSource, CommandSource};
pub use loader::{SkillBook, SkillKey, SkillLoader};
pub use power::{AdcBattery, BatteryLevel, PowerMonitor};
pub use rig::Rig;
pub use servo::{JointProfile, ServoBus, ServoDriver};
