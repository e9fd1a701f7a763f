//! `pawos-runtime` – the control loop.
//!
//! Wires the kernel, perception and HAL crates into the three periodic
//! duties that keep the robot standing and walking.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: owns the
//!   [`Scheduler`][pawos_kernel::Scheduler], the [`ControlState`] and the
//!   [`Rig`][pawos_hal::Rig], and dispatches the attitude, input and motion
//!   duties under the low-battery override.
//! - [`router`] – [`Router`][router::Router]: interprets every incoming
//!   [`Command`][pawos_types::Command], mutating the control state and
//!   installing the skill it names.
//! - [`motion`] – [`MotionEngine`][motion::MotionEngine]: per-tick joint
//!   targets for posture hold and gait playback.
//! - [`behaviour`] – [`BehaviourPlayer`][behaviour::BehaviourPlayer]:
//!   synchronous one-shot playback with bounded attitude triggers.
//! - [`state`] – [`ControlState`]: the single mutable record shared by the
//!   duties.
//! - [`config`] – [`ControlConfig`]: periods, thresholds and filter
//!   constants.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber.

pub mod behaviour;
pub mod config;
pub mod control_loop;
pub mod motion;
pub mod router;
pub mod state;
pub mod telemetry;

pub use behaviour::BehaviourPlayer;
pub use config::ControlConfig;
pub use control_loop::{ControlLoop, Dispatch, Duty};
pub use motion::MotionEngine;
pub use router::Router;
pub use state::ControlState;
pub use telemetry::init_tracing;
