//! Ordered stack of loops for one mode, plus its step and stop requests.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::counter::Counter;
use super::level::Loop;
use crate::error::{LooperError, Result};
use crate::scope::Token;

/// A pending request to run `remaining` more iterations at level `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRequest {
    pub index: usize,
    pub remaining: i64,
}

/// Stop request shared between a stack and its [`StopHandle`]s.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    requested: AtomicBool,
    index: AtomicUsize,
}

impl StopSignal {
    pub(crate) fn request(&self, index: usize) {
        self.index.store(index, Ordering::SeqCst);
        self.requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Target index of the pending stop, if any.
    pub(crate) fn pending(&self) -> Option<usize> {
        if self.requested.load(Ordering::SeqCst) {
            Some(self.index.load(Ordering::SeqCst))
        } else {
            None
        }
    }
}

/// Cloneable, thread-safe handle requesting a stop at one level of a stack.
///
/// Move it into a callback (or hand it to another thread) to halt the
/// scheduler at the next boundary of the bound level or any level outside it.
#[derive(Debug, Clone)]
pub struct StopHandle {
    signal: Arc<StopSignal>,
    index: usize,
}

impl StopHandle {
    pub fn stop(&self) {
        self.signal.request(self.index);
    }

    pub fn is_requested(&self) -> bool {
        self.signal.pending().is_some()
    }
}

/// Loops for one mode, ordered from outermost (slowest) to innermost (fastest).
///
/// Levels must be added outer to inner; the order is never re-derived.
#[derive(Debug)]
pub struct Stack<M, L> {
    mode: M,
    loops: Vec<Loop<L>>,
    step: Option<StepRequest>,
    stop: Arc<StopSignal>,
}

impl<M: Token, L: Token> Stack<M, L> {
    /// Create an empty stack for a mode
    pub fn new(mode: M) -> Self {
        Self {
            mode,
            loops: Vec::new(),
            step: None,
            stop: Arc::new(StopSignal::default()),
        }
    }

    pub fn mode(&self) -> &M {
        &self.mode
    }

    /// Append a level (inner to every level added so far) with `max` iterations.
    pub fn add_level(&mut self, level: L, max: i64) -> Result<&mut Self> {
        self.add_level_with_increment(level, max, 1)
    }

    /// Append a level with an explicit counter increment.
    pub fn add_level_with_increment(&mut self, level: L, max: i64, inc: i64) -> Result<&mut Self> {
        if self.loops.iter().any(|lp| *lp.level() == level) {
            return Err(LooperError::DuplicateLevel {
                mode: self.mode.to_string(),
                level: level.to_string(),
            });
        }
        self.loops.push(Loop::new(level, Counter::with_increment(max, inc)));
        Ok(self)
    }

    /// Position of a level, 0 being the outermost.
    pub fn index_of(&self, level: &L) -> Result<usize> {
        self.loops
            .iter()
            .position(|lp| lp.level() == level)
            .ok_or_else(|| self.level_not_found(level))
    }

    pub fn level(&self, level: &L) -> Result<&Loop<L>> {
        let idx = self.index_of(level)?;
        Ok(&self.loops[idx])
    }

    pub fn level_mut(&mut self, level: &L) -> Result<&mut Loop<L>> {
        let idx = self.index_of(level)?;
        Ok(&mut self.loops[idx])
    }

    pub fn at(&self, index: usize) -> Option<&Loop<L>> {
        self.loops.get(index)
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> Option<&mut Loop<L>> {
        self.loops.get_mut(index)
    }

    pub fn loops(&self) -> impl Iterator<Item = &Loop<L>> {
        self.loops.iter()
    }

    pub fn loops_mut(&mut self) -> impl Iterator<Item = &mut Loop<L>> {
        self.loops.iter_mut()
    }

    /// Level tokens, outermost first
    pub fn levels(&self) -> impl Iterator<Item = &L> {
        self.loops.iter().map(|lp| lp.level())
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Request a stop after `count` iterations of `level` have completed.
    ///
    /// A count of zero or less uses the level's default step count.
    pub fn set_step(&mut self, count: i64, level: &L) -> Result<()> {
        let index = self.index_of(level)?;
        let remaining = if count > 0 { count } else { self.loops[index].step_default() };
        self.step = Some(StepRequest { index, remaining });
        self.stop.clear();
        Ok(())
    }

    /// Cancel any pending step and stop request.
    pub fn clear_step(&mut self) {
        self.step = None;
        self.stop.clear();
    }

    pub fn step_request(&self) -> Option<StepRequest> {
        self.step
    }

    /// Request a halt at the next boundary of `level` or any level outside it.
    pub fn stop(&self, level: &L) -> Result<()> {
        let index = self.index_of(level)?;
        self.stop.request(index);
        Ok(())
    }

    /// Handle that requests a stop at `level` from a callback or another thread.
    pub fn stop_handle(&self, level: &L) -> Result<StopHandle> {
        let index = self.index_of(level)?;
        Ok(StopHandle {
            signal: self.stop.clone(),
            index,
        })
    }

    /// Level a pending stop request targets.
    pub fn stop_level(&self) -> Option<&L> {
        self.stop.pending().and_then(|idx| self.at(idx)).map(|lp| lp.level())
    }

    /// True once the outermost counter has reached its max.
    pub fn is_over_max(&self) -> bool {
        self.loops.first().is_some_and(|lp| lp.counter().is_over_max())
    }

    pub(crate) fn step_mut(&mut self) -> &mut Option<StepRequest> {
        &mut self.step
    }

    pub(crate) fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Reset every counter to zero without running any callback.
    pub(crate) fn reset_counters(&mut self) {
        for lp in &self.loops {
            lp.counter().reset();
        }
    }

    /// Reset counters, drop step and stop requests and run every level's end
    /// callbacks once, outermost first.
    pub(crate) fn init(&mut self) {
        self.reset_counters();
        self.clear_step();
        for lp in &mut self.loops {
            lp.on_end.run();
        }
    }

    /// Indented summary of levels and registered callback names.
    pub fn doc_string(&self) -> String {
        const INDENT: usize = 4;
        let mut sb = String::new();
        let _ = writeln!(sb, "Stack: {}", self.mode);
        for (i, lp) in self.loops.iter().enumerate() {
            let pad = " ".repeat(i * INDENT);
            let inner = " ".repeat((i + 1) * INDENT);
            let _ = writeln!(sb, "{}{}:{}: {}", pad, self.mode, lp.level(), lp.counter());
            let _ = writeln!(sb, "{}  Start:  {}", inner, lp.on_start);
            let _ = writeln!(sb, "{}  Main:   {}", inner, lp.main);
            if !lp.is_done.is_empty() {
                let _ = writeln!(sb, "{}  Stop:   {}", inner, lp.is_done);
            }
            let _ = writeln!(sb, "{}  End:    {}", inner, lp.on_end);
            if !lp.events.is_empty() {
                let _ = writeln!(sb, "{}  Events:", inner);
                for ev in &lp.events {
                    let _ = writeln!(sb, "{}{}{}", inner, " ".repeat(INDENT), ev);
                }
            }
        }
        sb
    }

    fn level_not_found(&self, level: &L) -> LooperError {
        LooperError::LevelNotFound {
            mode: self.mode.to_string(),
            level: level.to_string(),
        }
    }
}
