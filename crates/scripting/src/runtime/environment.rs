//! Lexical environments
//!
//! A chain of name tables. Closures keep their defining environment alive
//! through the shared [`Env`] handle.

use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Shared handle to an environment
pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    /// Outermost environment
    pub fn new_global() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Child scope of `enclosing`
    pub fn new_enclosed(enclosing: Env) -> Env {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Bind `name` in this scope, shadowing or replacing any earlier binding
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then in each enclosing scope
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self.enclosing.as_ref()?.borrow().get(name),
        }
    }

    /// Overwrite the nearest existing binding; false if there is none
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => false,
        }
    }

    /// Environment `distance` hops up the chain
    pub fn ancestor(env: &Env, distance: usize) -> Option<Env> {
        let mut current = env.clone();
        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }
        Some(current)
    }

    /// Read `name` from exactly `distance` hops up
    pub fn get_at(env: &Env, distance: usize, name: &str) -> Option<Value> {
        let target = Self::ancestor(env, distance)?;
        let value = target.borrow().values.get(name).cloned();
        value
    }

    /// Write `name` exactly `distance` hops up; false if it is not bound there
    pub fn assign_at(env: &Env, distance: usize, name: &str, value: Value) -> bool {
        let Some(target) = Self::ancestor(env, distance) else {
            return false;
        };
        let mut target = target.borrow_mut();
        match target.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Remove every binding in this scope, handing them back to the caller
    pub fn clear(&mut self) -> HashMap<String, Value> {
        std::mem::take(&mut self.values)
    }

    /// Sorted copy of the bindings in this scope only
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl fmt::Debug for Environment {
    // Values can reference their own environment, so only names are printed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("enclosed", &self.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing() {
        let globals = Environment::new_global();
        globals.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::new_enclosed(globals.clone());
        inner.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(inner.borrow().get("x"), Some(Value::Number(2.0)));
        assert_eq!(globals.borrow().get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assign_walks_outward() {
        let globals = Environment::new_global();
        globals.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::new_enclosed(globals.clone());

        assert!(inner.borrow_mut().assign("x", Value::Number(5.0)));
        assert_eq!(globals.borrow().get("x"), Some(Value::Number(5.0)));
        assert!(!inner.borrow_mut().assign("missing", Value::Nil));
    }

    #[test]
    fn test_distance_access() {
        let globals = Environment::new_global();
        globals.borrow_mut().define("x", Value::Bool(true));
        let middle = Environment::new_enclosed(globals.clone());
        let inner = Environment::new_enclosed(middle);

        assert_eq!(Environment::get_at(&inner, 2, "x"), Some(Value::Bool(true)));
        assert_eq!(Environment::get_at(&inner, 1, "x"), None);
        assert!(Environment::assign_at(&inner, 2, "x", Value::Bool(false)));
        assert_eq!(globals.borrow().get("x"), Some(Value::Bool(false)));
        assert!(Environment::ancestor(&inner, 3).is_none());
    }
}
