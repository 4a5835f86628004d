use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use log::trace;

use crate::value::Value;

/// Shared handle to a scope. A child holds a strong reference to its parent,
/// so a parent stays alive for as long as any scope chained to it.
pub type EnvironmentRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        trace!("opening child scope");
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    /// Looks `name` up locally, then along the parent chain.
    pub fn get(env: &EnvironmentRef, name: &str) -> Option<Value> {
        let scope = env.borrow();
        if let Some(value) = scope.bindings.get(name) {
            return Some(value.clone());
        }
        let parent = scope.parent.clone()?;
        drop(scope);
        Environment::get(&parent, name)
    }

    /// Binds `name` in this scope only; parents are never written.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Copies every local binding of `other` into this scope, overwriting on conflict.
    pub fn combine(&mut self, other: &Environment) {
        for (name, value) in &other.bindings {
            self.bindings.insert(name.clone(), value.clone());
        }
    }

    pub fn set_parent(&mut self, parent: EnvironmentRef) {
        self.parent = Some(parent);
    }

    pub fn parent(&self) -> Option<&EnvironmentRef> {
        self.parent.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
