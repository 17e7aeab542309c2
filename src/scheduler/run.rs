//! Recursive level runner.
//!
//! `run_level(i)` drives the loop at stack index `i` and recurses into `i + 1`
//! for every iteration. It can stop at any boundary and pick up exactly where
//! it left off on the next call: start callbacks are recorded per scope so an
//! iteration begun before a stop is never started twice.

use std::collections::HashMap;

use log::{Level, log_enabled, trace};

use crate::loops::{Loop, Stack};
use crate::scope::{Scope, Token};

/// Result of running one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LevelResult {
    /// Counter reached max (or there was no level to run).
    Complete,
    /// A stop request halted execution inside this level.
    Stopped,
    /// An is-done callback ended the level early.
    Done,
}

/// Borrowed run state for one `Scheduler::cont` call.
pub(crate) struct LevelRunner<'a, M, L> {
    pub(crate) mode: &'a M,
    pub(crate) stack: &'a mut Stack<M, L>,
    pub(crate) started: &'a mut HashMap<Scope<M, L>, i64>,
    pub(crate) internal_stop: &'a mut bool,
    pub(crate) trace_depth: Option<usize>,
    /// Index of the stop request that halted the run.
    pub(crate) stopped_at: Option<usize>,
}

impl<M: Token, L: Token> LevelRunner<'_, M, L> {
    pub(crate) fn run_level(&mut self, i: usize) -> LevelResult {
        let Some(lp) = self.stack.at(i) else {
            return LevelResult::Complete;
        };
        let counter = lp.counter().clone();
        let level = lp.level().clone();
        let scope = Scope::new(self.mode.clone(), level.clone());

        while counter.max() <= 0 || counter.cur() < counter.max() {
            // Stops are honored before any callback or increment.
            if let Some(target) = self.stack.stop_signal().pending() {
                if i <= target {
                    *self.internal_stop = true;
                    self.stopped_at = Some(target);
                }
            }
            if *self.internal_stop {
                self.stack.stop_signal().clear();
                return LevelResult::Stopped;
            }

            let step = self.stack.step_mut();
            if let Some(req) = step.as_mut() {
                if req.index == i {
                    req.remaining -= 1;
                    if req.remaining <= 0 {
                        *step = None;
                        // halts at the top of the next iteration of this level
                        self.stack.stop_signal().request(i);
                    }
                }
            }

            let cur = counter.cur();
            if self.started.get(&scope) != Some(&cur) {
                self.started.insert(scope.clone(), cur);
                self.trace(i, format_args!("{}: start {}", level, cur));
                self.with_loop(i, |lp| {
                    lp.fire_events();
                    lp.on_start.run();
                });
            } else {
                self.trace(i, format_args!("{}: skipping start {}", level, cur));
            }

            if self.run_level(i + 1) == LevelResult::Stopped {
                return LevelResult::Stopped;
            }

            self.trace(i, format_args!("{}: end {}", level, cur));
            self.with_loop(i, |lp| {
                lp.main.run();
                lp.on_end.run();
            });
            counter.increment();
            self.reset_inner(i + 1);

            let mut done_by = None;
            self.with_loop(i, |lp| done_by = lp.is_done.run_first_true().map(str::to_string));
            if let Some(name) = done_by {
                self.trace(i, format_args!("{}: done at {} from {}", level, counter.cur(), name));
                return LevelResult::Done;
            }
        }
        LevelResult::Complete
    }

    /// Zero the counter one level in and forget that its iteration started,
    /// so the next outer iteration runs the inner level from scratch.
    fn reset_inner(&mut self, inner: usize) {
        if let Some(lp) = self.stack.at(inner) {
            lp.counter().reset();
            self.started.remove(&Scope::new(self.mode.clone(), lp.level().clone()));
        }
    }

    fn with_loop(&mut self, i: usize, f: impl FnOnce(&mut Loop<L>)) {
        if let Some(lp) = self.stack.at_mut(i) {
            f(lp);
        }
    }

    fn trace(&self, i: usize, msg: std::fmt::Arguments<'_>) {
        if !log_enabled!(Level::Trace) || self.trace_depth.is_some_and(|depth| i > depth) {
            return;
        }
        trace!("{}{}", "   ".repeat(i), msg);
    }
}
