//! Mode and level identifiers.
//!
//! Modes (train, test, ...) and levels (run, epoch, trial, ...) are opaque
//! tokens: the scheduler only compares them for equality, hashes them for
//! lookup and sorts modes for stable listing. A [`Scope`] pairs one of each.

use std::fmt;
use std::hash::Hash;

/// Anything usable as a mode or level name.
///
/// Implemented for every type with the required bounds, so `String`, `&'static str`
/// and plain fieldless enums all qualify.
pub trait Token: Clone + Eq + Hash + Ord + fmt::Display + fmt::Debug + Send + 'static {}

impl<T> Token for T where T: Clone + Eq + Hash + Ord + fmt::Display + fmt::Debug + Send + 'static {}

/// A (mode, level) pair identifying one loop across all stacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope<M, L> {
    pub mode: M,
    pub level: L,
}

impl<M: Token, L: Token> Scope<M, L> {
    /// Create a new scope
    pub fn new(mode: M, level: L) -> Self {
        Self { mode, level }
    }
}

impl<M: fmt::Display, L: fmt::Display> fmt::Display for Scope<M, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mode, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_scope_display() {
        let scope = Scope::new("train", "trial");
        assert_eq!(scope.to_string(), "train:trial");
    }

    #[test]
    fn test_scope_as_map_key() {
        let mut started: HashMap<Scope<String, String>, i64> = HashMap::new();
        started.insert(Scope::new("train".to_string(), "epoch".to_string()), 3);
        started.insert(Scope::new("test".to_string(), "epoch".to_string()), 0);

        assert_eq!(started.get(&Scope::new("train".to_string(), "epoch".to_string())), Some(&3));
        assert_eq!(started.get(&Scope::new("test".to_string(), "epoch".to_string())), Some(&0));
        assert!(!started.contains_key(&Scope::new("train".to_string(), "trial".to_string())));
    }
}
