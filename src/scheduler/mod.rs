//! Scheduler for nested loop stacks.
//!
//! # Example
//!
//! ```
//! use looper::Scheduler;
//!
//! let mut sched: Scheduler<&str, &str> = Scheduler::new();
//! sched
//!     .add_stack("train")?
//!     .add_level("epoch", 3)?
//!     .add_level("trial", 4)?;
//! sched.loop_mut(&"train", &"trial")?.add_main("update", || {})?;
//!
//! // one epoch, then the rest
//! assert!(sched.step("train", 1, &"epoch")?.is_stopped());
//! assert!(sched.cont()?.is_complete());
//! # Ok::<(), looper::LooperError>(())
//! ```

mod run;
mod stacks;
mod summary;

pub use stacks::{RunOutcome, Scheduler};
pub use summary::{EventSummary, LevelSummary, StackSummary};
