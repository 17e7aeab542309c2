//! Ordered, name-addressable callback lists.
//!
//! Every hook point of a loop (start, main, end, is-done and each event) is a
//! [`NamedFuncs`]. Names are unique within one list so callbacks can be
//! inserted relative to, replaced or deleted by name.

use std::fmt;

use crate::error::{LooperError, Result};

/// A boxed callback taking no arguments.
pub type Callback<R> = Box<dyn FnMut() -> R + Send>;

/// One named entry of a [`NamedFuncs`] list.
pub struct NamedFunc<R> {
    name: String,
    func: Callback<R>,
}

impl<R> NamedFunc<R> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered list of named callbacks returning `R`.
///
/// `R = ()` for plain hook lists, `R = bool` for is-done lists.
pub struct NamedFuncs<R = ()> {
    funcs: Vec<NamedFunc<R>>,
}

impl<R> NamedFuncs<R> {
    /// Create an empty list
    pub fn new() -> Self {
        Self { funcs: Vec::new() }
    }

    /// Append a callback.
    pub fn add<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: FnMut() -> R + Send + 'static,
    {
        let entry = self.entry(name.into(), func)?;
        self.funcs.push(entry);
        Ok(())
    }

    /// Index of the callback with the given name.
    pub fn find_index(&self, name: &str) -> Result<usize> {
        self.funcs
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| LooperError::NameNotFound(name.to_string()))
    }

    /// Insert a callback immediately before `anchor`.
    pub fn insert_before<F>(&mut self, anchor: &str, name: impl Into<String>, func: F) -> Result<()>
    where
        F: FnMut() -> R + Send + 'static,
    {
        let idx = self.find_index(anchor)?;
        let entry = self.entry(name.into(), func)?;
        self.funcs.insert(idx, entry);
        Ok(())
    }

    /// Insert a callback immediately after `anchor`.
    pub fn insert_after<F>(&mut self, anchor: &str, name: impl Into<String>, func: F) -> Result<()>
    where
        F: FnMut() -> R + Send + 'static,
    {
        let idx = self.find_index(anchor)?;
        let entry = self.entry(name.into(), func)?;
        self.funcs.insert(idx + 1, entry);
        Ok(())
    }

    /// Swap the function registered under `name`, keeping its position.
    pub fn replace<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: FnMut() -> R + Send + 'static,
    {
        let idx = self.find_index(name)?;
        self.funcs[idx].func = Box::new(func);
        Ok(())
    }

    /// Remove the callback registered under `name`.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let idx = self.find_index(name)?;
        self.funcs.remove(idx);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.iter().any(|f| f.name == name)
    }

    /// Names in call order
    pub fn names(&self) -> Vec<&str> {
        self.funcs.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    fn entry<F>(&self, name: String, func: F) -> Result<NamedFunc<R>>
    where
        F: FnMut() -> R + Send + 'static,
    {
        if self.contains(&name) {
            return Err(LooperError::DuplicateName(name));
        }
        Ok(NamedFunc {
            name,
            func: Box::new(func),
        })
    }
}

impl NamedFuncs<()> {
    /// Call every callback in order.
    pub fn run(&mut self) {
        for f in &mut self.funcs {
            (f.func)();
        }
    }
}

impl NamedFuncs<bool> {
    /// Call every callback in order and return true if any returned true.
    pub fn run(&mut self) -> bool {
        self.run_first_true().is_some()
    }

    /// Call every callback in order, returning the name of the first one that
    /// returned true.
    pub fn run_first_true(&mut self) -> Option<&str> {
        let mut first = None;
        for (idx, f) in self.funcs.iter_mut().enumerate() {
            if (f.func)() && first.is_none() {
                first = Some(idx);
            }
        }
        first.map(|idx| self.funcs[idx].name.as_str())
    }
}

impl<R> Default for NamedFuncs<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for NamedFuncs<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.funcs.iter().map(|func| &func.name)).finish()
    }
}

impl<R> fmt::Display for NamedFuncs<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut() + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &str| -> Box<dyn FnMut() + Send> {
            let sink = sink.clone();
            let name = name.to_string();
            Box::new(move || sink.lock().unwrap().push(name.clone()))
        };
        (log, make)
    }

    #[test]
    fn test_add_and_run_in_order() -> Result<()> {
        let (log, make) = recorder();
        let mut funcs = NamedFuncs::new();
        funcs.add("a", make("a"))?;
        funcs.add("b", make("b"))?;
        funcs.add("c", make("c"))?;

        funcs.run();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_add_duplicate_name_fails() {
        let mut funcs = NamedFuncs::new();
        funcs.add("count", || {}).unwrap();
        let err = funcs.add("count", || {}).unwrap_err();
        assert_eq!(err, LooperError::DuplicateName("count".to_string()));
        assert_eq!(funcs.len(), 1);
    }

    #[test]
    fn test_find_index() {
        let mut funcs = NamedFuncs::new();
        funcs.add("a", || {}).unwrap();
        funcs.add("b", || {}).unwrap();
        assert_eq!(funcs.find_index("b").unwrap(), 1);
        assert!(matches!(funcs.find_index("z"), Err(LooperError::NameNotFound(_))));
    }

    #[test]
    fn test_insert_before_and_after() -> Result<()> {
        let (log, make) = recorder();
        let mut funcs = NamedFuncs::new();
        funcs.add("b", make("b"))?;
        funcs.insert_before("b", "a", make("a"))?;
        funcs.insert_after("b", "c", make("c"))?;
        funcs.insert_after("a", "a2", make("a2"))?;

        assert_eq!(funcs.names(), vec!["a", "a2", "b", "c"]);
        funcs.run();
        assert_eq!(*log.lock().unwrap(), vec!["a", "a2", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_insert_relative_to_missing_anchor_fails() {
        let mut funcs = NamedFuncs::new();
        funcs.add("a", || {}).unwrap();
        assert!(matches!(
            funcs.insert_before("missing", "b", || {}),
            Err(LooperError::NameNotFound(_))
        ));
        assert!(matches!(
            funcs.insert_after("missing", "b", || {}),
            Err(LooperError::NameNotFound(_))
        ));
        assert_eq!(funcs.names(), vec!["a"]);
    }

    #[test]
    fn test_insert_duplicate_fails_without_change() {
        let mut funcs = NamedFuncs::new();
        funcs.add("a", || {}).unwrap();
        funcs.add("b", || {}).unwrap();
        assert!(matches!(
            funcs.insert_after("a", "b", || {}),
            Err(LooperError::DuplicateName(_))
        ));
        assert_eq!(funcs.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_replace_keeps_position() -> Result<()> {
        let (log, make) = recorder();
        let mut funcs = NamedFuncs::new();
        funcs.add("a", make("a"))?;
        funcs.add("b", make("b"))?;
        funcs.add("c", make("c"))?;
        funcs.replace("b", make("B"))?;

        funcs.run();
        assert_eq!(*log.lock().unwrap(), vec!["a", "B", "c"]);
        assert!(matches!(funcs.replace("z", || {}), Err(LooperError::NameNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let mut funcs = NamedFuncs::new();
        funcs.add("a", || {})?;
        funcs.add("b", || {})?;
        funcs.delete("a")?;
        assert_eq!(funcs.names(), vec!["b"]);
        assert!(matches!(funcs.delete("a"), Err(LooperError::NameNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_bool_run_is_or_of_all() {
        let calls = Arc::new(Mutex::new(0));
        let mut funcs: NamedFuncs<bool> = NamedFuncs::new();
        let c1 = calls.clone();
        funcs
            .add("yes", move || {
                *c1.lock().unwrap() += 1;
                true
            })
            .unwrap();
        let c2 = calls.clone();
        funcs
            .add("no", move || {
                *c2.lock().unwrap() += 1;
                false
            })
            .unwrap();

        assert!(funcs.run());
        // every entry runs even after one returned true
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_bool_run_first_true_name() {
        let mut funcs: NamedFuncs<bool> = NamedFuncs::new();
        funcs.add("never", || false).unwrap();
        funcs.add("enough", || true).unwrap();
        funcs.add("also", || true).unwrap();
        assert_eq!(funcs.run_first_true(), Some("enough"));

        let mut empty: NamedFuncs<bool> = NamedFuncs::new();
        assert!(!empty.run());
    }

    #[test]
    fn test_display_lists_names() {
        let mut funcs = NamedFuncs::new();
        funcs.add("update net", || {}).unwrap();
        funcs.add("log", || {}).unwrap();
        assert_eq!(funcs.to_string(), "update net log");
        assert_eq!(format!("{:?}", funcs), "[\"update net\", \"log\"]");
    }
}
