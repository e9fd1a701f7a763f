//! `pawos-kernel` – timing and safety core.
//!
//! Decides *when* each duty runs and *whether* the robot is in a state to
//! move at all. It never chooses joint angles itself.
//!
//! # Modules
//!
//! - [`scheduler`] – [`Scheduler`][scheduler::Scheduler]: fixed-capacity,
//!   earliest-deadline dispatcher for the periodic duties; ties go to the
//!   task registered first.
//! - [`balance`] – [`BalanceMonitor`][balance::BalanceMonitor]: tip-over
//!   detection and the grace-period recovery state machine, plus the
//!   smoothed posture [`DeviationTerms`][balance::DeviationTerms].
//! - [`power_guard`] – [`PowerGuard`][power_guard::PowerGuard]: low-battery
//!   override that suspends every duty for a cool-down interval.

pub mod balance;
pub mod power_guard;
pub mod scheduler;

pub use balance::{BalanceConfig, BalanceEvent, BalanceMonitor, BalanceState, DeviationTerms};
pub use power_guard::{PowerGuard, PowerStatus};
pub use scheduler::{Scheduler, TaskId};
