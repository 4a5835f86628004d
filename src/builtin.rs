//! Registration of native functions into a root scope.

use indexmap::IndexMap;

use crate::{
    diagnostics::Result,
    environment::EnvironmentRef,
    value::{Builtin, Value},
};

/// Named native functions, keyed by the symbol they are bound to.
#[derive(Default)]
pub struct BuiltinRegistry {
    entries: IndexMap<String, Builtin>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`, replacing any earlier entry.
    pub fn register<F>(&mut self, name: &str, function: F) -> &mut Self
    where
        F: Fn(&[Value], &EnvironmentRef) -> Result<Value> + 'static,
    {
        self.entries
            .insert(name.to_string(), Builtin::new(name, function));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Binds every entry into `env` as a builtin value.
    pub fn install(&self, env: &EnvironmentRef) {
        let mut scope = env.borrow_mut();
        for (name, builtin) in &self.entries {
            scope.set(name.clone(), Value::builtin(builtin.clone()));
        }
    }
}
