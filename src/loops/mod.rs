//! Loop building blocks.
//!
//! - `Counter`: current value, max and increment of one level
//! - `NamedFuncs`: ordered, uniquely named callback lists
//! - `Event`: callbacks fired when a counter reaches a given value
//! - `Loop`: one level with its counter, hooks and events
//! - `Stack`: the ordered levels of one mode plus step and stop requests

mod counter;
mod event;
mod funcs;
mod level;
mod stack;

pub use counter::Counter;
pub use event::Event;
pub use funcs::{Callback, NamedFunc, NamedFuncs};
pub use level::Loop;
pub use stack::{Stack, StepRequest, StopHandle};
