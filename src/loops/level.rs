//! One level of a nested loop stack.

use std::sync::Arc;

use super::counter::Counter;
use super::event::Event;
use super::funcs::NamedFuncs;
use crate::error::{LooperError, Result};

/// Storage for one nesting level: its counter, four hook lists and events.
///
/// A loop with one start, one end and `max = 3` runs
/// `start, inner, main, end` three times, where `inner` is the next level of
/// the stack. The loop never runs itself; ordering is decided by the
/// scheduler.
#[derive(Debug)]
pub struct Loop<L> {
    level: L,
    counter: Arc<Counter>,
    /// Called before the first visit to each counter value.
    pub on_start: NamedFuncs,
    /// Called after the inner levels of the iteration have finished.
    pub main: NamedFuncs,
    /// Called at the end of every iteration, before the counter increments.
    pub on_end: NamedFuncs,
    /// Checked after every completed iteration; any `true` ends the level.
    pub is_done: NamedFuncs<bool>,
    pub events: Vec<Event>,
    step_default: i64,
}

impl<L> Loop<L> {
    pub(crate) fn new(level: L, counter: Counter) -> Self {
        Self {
            level,
            counter: Arc::new(counter),
            on_start: NamedFuncs::new(),
            main: NamedFuncs::new(),
            on_end: NamedFuncs::new(),
            is_done: NamedFuncs::new(),
            events: Vec::new(),
            step_default: 1,
        }
    }

    pub fn level(&self) -> &L {
        &self.level
    }

    /// Shared handle to this level's counter.
    pub fn counter(&self) -> &Arc<Counter> {
        &self.counter
    }

    /// Number of iterations a step request at this level uses when it is given
    /// a count of zero or less.
    pub fn step_default(&self) -> i64 {
        self.step_default
    }

    pub fn set_step_default(&mut self, n: i64) -> &mut Self {
        self.step_default = n.max(1);
        self
    }

    pub fn add_on_start<F>(&mut self, name: impl Into<String>, func: F) -> Result<&mut Self>
    where
        F: FnMut() + Send + 'static,
    {
        self.on_start.add(name, func)?;
        Ok(self)
    }

    pub fn add_main<F>(&mut self, name: impl Into<String>, func: F) -> Result<&mut Self>
    where
        F: FnMut() + Send + 'static,
    {
        self.main.add(name, func)?;
        Ok(self)
    }

    pub fn add_on_end<F>(&mut self, name: impl Into<String>, func: F) -> Result<&mut Self>
    where
        F: FnMut() + Send + 'static,
    {
        self.on_end.add(name, func)?;
        Ok(self)
    }

    pub fn add_is_done<F>(&mut self, name: impl Into<String>, func: F) -> Result<&mut Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.is_done.add(name, func)?;
        Ok(self)
    }

    /// Create an event firing when the counter equals `at_counter` and append it.
    pub fn add_event<F>(&mut self, name: impl Into<String>, at_counter: i64, func: F) -> Result<&mut Event>
    where
        F: FnMut() + Send + 'static,
    {
        let event = Event::new(name, at_counter, func)?;
        self.push_event(event)
    }

    /// Append already-built events. Stops at the first duplicate name.
    pub fn add_events(&mut self, events: impl IntoIterator<Item = Event>) -> Result<()> {
        for event in events {
            self.push_event(event)?;
        }
        Ok(())
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn event_mut(&mut self, name: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.name == name)
    }

    fn push_event(&mut self, event: Event) -> Result<&mut Event> {
        if self.event(&event.name).is_some() {
            return Err(LooperError::DuplicateEvent(event.name));
        }
        self.events.push(event);
        let last = self.events.len() - 1;
        Ok(&mut self.events[last])
    }

    /// Fire all events triggered at the counter's current value.
    pub(crate) fn fire_events(&mut self) {
        let cur = self.counter.cur();
        for event in self.events.iter_mut().filter(|e| e.fires_at(cur)) {
            event.on_event.run();
        }
    }
}
