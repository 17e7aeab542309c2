//! Serializable snapshot of configured stacks, for diagnostics.

use serde::{Deserialize, Serialize};

use crate::loops::{Loop, Stack};
use crate::scope::Token;

/// One stack: its mode and levels, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSummary {
    pub mode: String,
    pub levels: Vec<LevelSummary>,
}

/// One level: counter state and registered callback names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub level: String,
    pub cur: i64,
    pub max: i64,
    pub inc: i64,
    pub on_start: Vec<String>,
    pub main: Vec<String>,
    pub on_end: Vec<String>,
    pub is_done: Vec<String>,
    pub events: Vec<EventSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub name: String,
    pub at_counter: i64,
    pub callbacks: Vec<String>,
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

impl<L: Token> From<&Loop<L>> for LevelSummary {
    fn from(lp: &Loop<L>) -> Self {
        let ctr = lp.counter();
        Self {
            level: lp.level().to_string(),
            cur: ctr.cur(),
            max: ctr.max(),
            inc: ctr.inc(),
            on_start: owned(lp.on_start.names()),
            main: owned(lp.main.names()),
            on_end: owned(lp.on_end.names()),
            is_done: owned(lp.is_done.names()),
            events: lp
                .events
                .iter()
                .map(|ev| EventSummary {
                    name: ev.name.clone(),
                    at_counter: ev.at_counter,
                    callbacks: owned(ev.on_event.names()),
                })
                .collect(),
        }
    }
}

impl<M: Token, L: Token> From<&Stack<M, L>> for StackSummary {
    fn from(stack: &Stack<M, L>) -> Self {
        Self {
            mode: stack.mode().to_string(),
            levels: stack.loops().map(LevelSummary::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_stack() {
        let mut stack: Stack<String, String> = Stack::new("train".to_string());
        stack
            .add_level("epoch".to_string(), 3)
            .unwrap()
            .add_level_with_increment("trial".to_string(), 10, 2)
            .unwrap();
        stack
            .level_mut(&"trial".to_string())
            .unwrap()
            .add_main("update", || {})
            .unwrap()
            .add_event("halfway", 4, || {})
            .unwrap();

        let summary = StackSummary::from(&stack);
        assert_eq!(summary.mode, "train");
        assert_eq!(summary.levels.len(), 2);
        let trial = &summary.levels[1];
        assert_eq!(trial.level, "trial");
        assert_eq!((trial.cur, trial.max, trial.inc), (0, 10, 2));
        assert_eq!(trial.main, vec!["update"]);
        assert_eq!(
            trial.events,
            vec![EventSummary {
                name: "halfway".to_string(),
                at_counter: 4,
                callbacks: vec!["halfway".to_string()],
            }]
        );
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let mut stack: Stack<&str, &str> = Stack::new("test");
        stack.add_level("trial", 5).unwrap();
        let json = serde_json::to_value(StackSummary::from(&stack)).unwrap();
        assert_eq!(json["mode"], "test");
        assert_eq!(json["levels"][0]["level"], "trial");
        assert_eq!(json["levels"][0]["max"], 5);
    }
}
