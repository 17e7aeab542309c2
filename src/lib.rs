//! Looper - nested loop scheduling for iterative simulations
//!
//! A [`Scheduler`] owns one [`Stack`] of nested loops per run mode (for
//! example `train` and `test`). Stacks can be run to completion, stepped a
//! given number of iterations at any level, stopped at a level boundary and
//! continued, with exactly the same callback sequence as an uninterrupted run.
//! [`Stepper`] is a separate pause/resume primitive for a producer running on
//! its own thread.

pub mod coordination;
pub mod error;
pub mod loops;
pub mod scheduler;
pub mod scope;

pub use coordination::{CheckPoint, RunState, Stepper};
pub use error::{LooperError, Result};
pub use loops::{Counter, Event, Loop, NamedFuncs, Stack, StopHandle};
pub use scheduler::{RunOutcome, Scheduler};
pub use scope::{Scope, Token};
