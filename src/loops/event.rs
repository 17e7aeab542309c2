//! Counter-triggered events.

use std::fmt;

use super::funcs::NamedFuncs;
use crate::error::Result;

/// Callbacks that run at the start of the iteration where the owning loop's
/// counter equals `at_counter`.
///
/// Events fire before the loop's start callbacks, once per pass through that
/// counter value (i.e. again on every outer iteration).
#[derive(Debug)]
pub struct Event {
    pub name: String,
    pub at_counter: i64,
    pub on_event: NamedFuncs,
}

impl Event {
    /// Create an event with a single callback registered under the event's name
    pub fn new<F>(name: impl Into<String>, at_counter: i64, func: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let mut on_event = NamedFuncs::new();
        on_event.add(name.clone(), func)?;
        Ok(Self {
            name,
            at_counter,
            on_event,
        })
    }

    /// Create an event with no callbacks yet
    pub fn empty(name: impl Into<String>, at_counter: i64) -> Self {
        Self {
            name: name.into(),
            at_counter,
            on_event: NamedFuncs::new(),
        }
    }

    pub fn fires_at(&self, counter: i64) -> bool {
        self.at_counter == counter
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [at {}]", self.name, self.at_counter)?;
        if !self.on_event.is_empty() {
            write!(f, " Events: {}", self.on_event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_registers_callback() {
        let event = Event::new("plus phase", 75, || {}).unwrap();
        assert_eq!(event.at_counter, 75);
        assert_eq!(event.on_event.names(), vec!["plus phase"]);
        assert!(event.fires_at(75));
        assert!(!event.fires_at(74));
    }

    #[test]
    fn test_display() {
        let mut event = Event::empty("minus phase", 0);
        assert_eq!(event.to_string(), "minus phase: [at 0]");
        event.on_event.add("clamp", || {}).unwrap();
        assert_eq!(event.to_string(), "minus phase: [at 0] Events: clamp");
    }
}
