//! `pawos-perception` – attitude sensing layer.
//!
//! Turns the raw, noisy IMU stream into the roll/pitch estimate the balance
//! monitor and behaviour triggers reason about.
//!
//! # Modules
//!
//! - [`attitude`] – [`AttitudeEstimator`][attitude::AttitudeEstimator]:
//!   complementary filter blending accelerometer tilt with integrated gyro
//!   rates, with an explicit re-anchor for tipped or stationary periods.
//! - [`filters`] – scalar helpers (single-pole IIR smoothing, deadband) used
//!   for the posture deviation terms.

pub mod attitude;
pub mod filters;

pub use attitude::{AttitudeEstimator, accel_tilt, wrap_pi};
