//! The scheduler: owns every mode's stack and runs or steps the active one.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use super::run::{LevelResult, LevelRunner};
use super::summary::StackSummary;
use crate::error::{LooperError, Result};
use crate::loops::{Event, Loop, Stack, StopHandle};
use crate::scope::{Scope, Token};

/// How a call to [`Scheduler::cont`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<L> {
    /// The outermost level finished (counter reached max or is-done fired).
    Completed(L),
    /// A stop or step request halted execution at this level.
    Stopped(L),
}

impl<L> RunOutcome<L> {
    /// Level where execution ended
    pub fn level(&self) -> &L {
        match self {
            RunOutcome::Completed(level) | RunOutcome::Stopped(level) => level,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, RunOutcome::Stopped(_))
    }
}

impl<L: fmt::Display> fmt::Display for RunOutcome<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed(level) => write!(f, "completed at {}", level),
            RunOutcome::Stopped(level) => write!(f, "stopped at {}", level),
        }
    }
}

/// Runs nested loops for any number of modes.
///
/// Create one per simulation session, configure a [`Stack`] per mode, then
/// drive it with [`run`](Self::run), [`step`](Self::step) and
/// [`cont`](Self::cont). Stepping N iterations at a time produces exactly the
/// same callback sequence as running straight through.
///
/// All methods run on the calling thread. Use a [`StopHandle`] to request a
/// stop from a callback or another thread.
pub struct Scheduler<M, L> {
    stacks: HashMap<M, Stack<M, L>>,
    mode: Option<M>,
    running: bool,
    /// Counter value whose start callbacks last ran, per scope.
    last_started: HashMap<Scope<M, L>, i64>,
    internal_stop: bool,
    last_outcome: Option<RunOutcome<L>>,
    trace_depth: Option<usize>,
}

impl<M: Token, L: Token> Scheduler<M, L> {
    /// Create a scheduler with no stacks
    pub fn new() -> Self {
        Self {
            stacks: HashMap::new(),
            mode: None,
            running: false,
            last_started: HashMap::new(),
            internal_stop: false,
            last_outcome: None,
            trace_depth: None,
        }
    }

    //////// Config API

    /// Add an empty stack for `mode`.
    pub fn add_stack(&mut self, mode: M) -> Result<&mut Stack<M, L>> {
        if self.stacks.contains_key(&mode) {
            return Err(LooperError::DuplicateMode(mode.to_string()));
        }
        debug!("Adding stack for mode {}", mode);
        Ok(self.stacks.entry(mode.clone()).or_insert_with(|| Stack::new(mode)))
    }

    pub fn stack(&self, mode: &M) -> Result<&Stack<M, L>> {
        self.stacks
            .get(mode)
            .ok_or_else(|| LooperError::ModeNotFound(mode.to_string()))
    }

    pub fn stack_mut(&mut self, mode: &M) -> Result<&mut Stack<M, L>> {
        self.stacks
            .get_mut(mode)
            .ok_or_else(|| LooperError::ModeNotFound(mode.to_string()))
    }

    /// The loop for a mode and level.
    pub fn loop_mut(&mut self, mode: &M, level: &L) -> Result<&mut Loop<L>> {
        self.stack_mut(mode)?.level_mut(level)
    }

    /// Stack of the active mode.
    pub fn mode_stack(&self) -> Result<&Stack<M, L>> {
        let mode = self.mode.as_ref().ok_or(LooperError::NoActiveMode)?;
        self.stack(mode)
    }

    pub fn active_mode(&self) -> Option<&M> {
        self.mode.as_ref()
    }

    /// Configured modes in sorted order
    pub fn modes(&self) -> Vec<&M> {
        let mut modes: Vec<&M> = self.stacks.keys().collect();
        modes.sort();
        modes
    }

    /// Only print control-flow trace lines for levels with index `<= depth`.
    pub fn set_trace_depth(&mut self, depth: Option<usize>) {
        self.trace_depth = depth;
    }

    /// Add an event at `level` to every stack that has that level.
    pub fn add_event_all_modes<F>(&mut self, level: &L, name: &str, at_counter: i64, func: F) -> Result<()>
    where
        F: FnMut() + Clone + Send + 'static,
    {
        let targets = self.modes_with_level(level)?;
        for mode in &targets {
            let lp = self.loop_mut(mode, level)?;
            if lp.event(name).is_some() {
                return Err(LooperError::DuplicateEvent(name.to_string()));
            }
        }
        for mode in &targets {
            self.loop_mut(mode, level)?
                .add_events([Event::new(name, at_counter, func.clone())?])?;
        }
        Ok(())
    }

    /// Add a start callback, given its mode and level, to every loop of every stack.
    pub fn add_on_start_to_all<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: FnMut(&M, &L) + Clone + Send + 'static,
    {
        self.add_to_all(name, func, |lp| &mut lp.on_start)
    }

    /// Add a main callback, given its mode and level, to every loop of every stack.
    pub fn add_main_to_all<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: FnMut(&M, &L) + Clone + Send + 'static,
    {
        self.add_to_all(name, func, |lp| &mut lp.main)
    }

    /// Add an end callback, given its mode and level, to every loop of every stack.
    pub fn add_on_end_to_all<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: FnMut(&M, &L) + Clone + Send + 'static,
    {
        self.add_to_all(name, func, |lp| &mut lp.on_end)
    }

    /// Add a start callback, given its mode, to `level` in every stack that has it.
    pub fn add_on_start_to_loop<F>(&mut self, level: &L, name: &str, func: F) -> Result<()>
    where
        F: FnMut(&M) + Clone + Send + 'static,
    {
        self.add_to_loop(level, name, func, |lp| &mut lp.on_start)
    }

    /// Add an end callback, given its mode, to `level` in every stack that has it.
    pub fn add_on_end_to_loop<F>(&mut self, level: &L, name: &str, func: F) -> Result<()>
    where
        F: FnMut(&M) + Clone + Send + 'static,
    {
        self.add_to_loop(level, name, func, |lp| &mut lp.on_end)
    }

    //////// Run API

    /// Run the stack for `mode` until it completes or a stop is requested.
    /// Clears any pending step request first.
    pub fn run(&mut self, mode: M) -> Result<RunOutcome<L>> {
        self.stack_mut(&mode)?.clear_step();
        debug!("Run {}", mode);
        self.mode = Some(mode);
        self.cont()
    }

    /// Run until `count` iterations of `level` have completed.
    /// A count of zero or less uses the level's default step count.
    pub fn step(&mut self, mode: M, count: i64, level: &L) -> Result<RunOutcome<L>> {
        self.stack_mut(&mode)?.set_step(count, level)?;
        debug!("Step {} {} x{}", mode, level, count);
        self.mode = Some(mode);
        self.cont()
    }

    /// Reset the counters of `mode`, then run it from the start.
    pub fn reset_and_run(&mut self, mode: M) -> Result<RunOutcome<L>> {
        self.reset_counters_by_mode(&mode)?;
        self.run(mode)
    }

    /// Continue running the active mode from wherever it stopped.
    ///
    /// Common path for [`run`](Self::run) and [`step`](Self::step); call it
    /// directly to resume after a programmatic step.
    pub fn cont(&mut self) -> Result<RunOutcome<L>> {
        let mode = self.mode.clone().ok_or(LooperError::NoActiveMode)?;
        let stack = self
            .stacks
            .get_mut(&mode)
            .ok_or_else(|| LooperError::ModeNotFound(mode.to_string()))?;
        let outermost = stack
            .at(0)
            .map(|lp| lp.level().clone())
            .ok_or_else(|| LooperError::EmptyStack(mode.to_string()))?;

        self.running = true;
        self.internal_stop = false;
        let mut runner = LevelRunner {
            mode: &mode,
            stack: &mut *stack,
            started: &mut self.last_started,
            internal_stop: &mut self.internal_stop,
            trace_depth: self.trace_depth,
            stopped_at: None,
        };
        let result = runner.run_level(0);
        let stopped_at = runner.stopped_at;
        self.running = false;

        let outcome = match result {
            LevelResult::Stopped => {
                let level = stopped_at
                    .and_then(|idx| stack.at(idx))
                    .map(|lp| lp.level().clone())
                    .unwrap_or(outermost);
                RunOutcome::Stopped(level)
            }
            LevelResult::Complete | LevelResult::Done => RunOutcome::Completed(outermost),
        };
        debug!("Mode {} {}", mode, outcome);
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Request the active stack to halt at the next boundary of `level` or
    /// any level outside it. Does not block.
    pub fn stop(&self, level: &L) -> Result<()> {
        debug!("Stop requested at {}", level);
        self.mode_stack()?.stop(level)
    }

    /// Handle requesting a stop at `level` of `mode`, usable from callbacks and
    /// other threads.
    pub fn stop_handle(&self, mode: &M, level: &L) -> Result<StopHandle> {
        self.stack(mode)?.stop_handle(level)
    }

    //////// More detailed control API

    /// True while [`cont`](Self::cont) is executing.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Outcome of the most recent run, step or continue.
    pub fn last_outcome(&self) -> Option<&RunOutcome<L>> {
        self.last_outcome.as_ref()
    }

    /// Level at which the most recent run ended.
    pub fn stopped_level(&self) -> Option<&L> {
        self.last_outcome.as_ref().map(RunOutcome::level)
    }

    /// Initialize every stack. See [`init_mode`](Self::init_mode).
    pub fn init(&mut self) {
        self.last_started.clear();
        let modes: Vec<M> = self.modes().into_iter().cloned().collect();
        for mode in modes {
            if let Some(stack) = self.stacks.get_mut(&mode) {
                stack.init();
            }
        }
    }

    /// Reset the counters of `mode`, forget which iterations started and run
    /// each level's end callbacks once so they can reset for a fresh run.
    pub fn init_mode(&mut self, mode: &M) -> Result<()> {
        self.forget_started(mode, |_| true);
        self.stack_mut(mode)?.init();
        debug!("Initialized mode {}", mode);
        Ok(())
    }

    /// Reset every counter of every stack.
    pub fn reset_counters(&mut self) {
        self.last_started.clear();
        for stack in self.stacks.values_mut() {
            stack.reset_counters();
        }
    }

    /// Reset every counter of `mode`.
    pub fn reset_counters_by_mode(&mut self, mode: &M) -> Result<()> {
        self.stack_mut(mode)?.reset_counters();
        self.forget_started(mode, |_| true);
        Ok(())
    }

    /// Reset the counters of `level` and every level inside it.
    pub fn reset_counters_below(&mut self, mode: &M, level: &L) -> Result<()> {
        let stack = self.stack(mode)?;
        let from = stack.index_of(level)?;
        let inner: Vec<L> = stack.levels().skip(from).cloned().collect();
        for lp in stack.loops().skip(from) {
            lp.counter().reset();
        }
        self.forget_started(mode, |lvl| inner.contains(lvl));
        Ok(())
    }

    /// Indented summary of every stack's loops and callbacks.
    pub fn doc_string(&self) -> String {
        self.modes()
            .into_iter()
            .filter_map(|mode| self.stacks.get(mode))
            .map(Stack::doc_string)
            .collect()
    }

    /// Serializable description of every stack, in mode order.
    pub fn summary(&self) -> Vec<StackSummary> {
        self.modes()
            .into_iter()
            .filter_map(|mode| self.stacks.get(mode))
            .map(StackSummary::from)
            .collect()
    }

    fn forget_started(&mut self, mode: &M, mut which: impl FnMut(&L) -> bool) {
        self.last_started
            .retain(|scope, _| !(scope.mode == *mode && which(&scope.level)));
    }

    fn modes_with_level(&self, level: &L) -> Result<Vec<M>> {
        let targets: Vec<M> = self
            .modes()
            .into_iter()
            .filter(|mode| self.stacks.get(*mode).is_some_and(|st| st.index_of(level).is_ok()))
            .cloned()
            .collect();
        if targets.is_empty() {
            return Err(LooperError::LevelNotFound {
                mode: "*".to_string(),
                level: level.to_string(),
            });
        }
        Ok(targets)
    }

    fn add_to_all<F>(
        &mut self,
        name: &str,
        func: F,
        list: impl Fn(&mut Loop<L>) -> &mut crate::loops::NamedFuncs,
    ) -> Result<()>
    where
        F: FnMut(&M, &L) + Clone + Send + 'static,
    {
        for stack in self.stacks.values_mut() {
            if stack.loops_mut().any(|lp| list(lp).contains(name)) {
                return Err(LooperError::DuplicateName(name.to_string()));
            }
        }
        for stack in self.stacks.values_mut() {
            let mode = stack.mode().clone();
            for lp in stack.loops_mut() {
                let mode = mode.clone();
                let level = lp.level().clone();
                let mut func = func.clone();
                list(lp).add(name, move || func(&mode, &level))?;
            }
        }
        Ok(())
    }

    fn add_to_loop<F>(
        &mut self,
        level: &L,
        name: &str,
        func: F,
        list: impl Fn(&mut Loop<L>) -> &mut crate::loops::NamedFuncs,
    ) -> Result<()>
    where
        F: FnMut(&M) + Clone + Send + 'static,
    {
        let targets = self.modes_with_level(level)?;
        for mode in &targets {
            if list(self.loop_mut(mode, level)?).contains(name) {
                return Err(LooperError::DuplicateName(name.to_string()));
            }
        }
        for mode in targets {
            let mut func = func.clone();
            let captured = mode.clone();
            list(self.loop_mut(&mode, level)?).add(name, move || func(&captured))?;
        }
        Ok(())
    }
}

impl<M: Token, L: Token> Default for Scheduler<M, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Token, L: Token> fmt::Debug for Scheduler<M, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("modes", &self.modes())
            .field("mode", &self.mode)
            .field("running", &self.running)
            .field("last_outcome", &self.last_outcome)
            .finish()
    }
}
