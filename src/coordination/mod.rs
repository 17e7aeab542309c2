//! Coordination between a running simulation and its controller.

pub mod stepper;

pub use stepper::{CheckPoint, DEFAULT_WATCHDOG, PauseNotifier, RunState, StopChecker, Stepper};
