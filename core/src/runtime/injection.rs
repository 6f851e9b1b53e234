//! Caller-supplied values referenced positionally from schema text

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::meta::Meta;

/// Function form of an injected value: receives the current value (the
/// error payload for error processors, `null` otherwise) and the metadata.
pub type InjectedFn = Arc<dyn Fn(Value, &Meta) -> Value + Send + Sync>;

/// An element of the injections or errors array
#[derive(Clone)]
pub enum Injected {
    Value(Value),
    Func(InjectedFn),
}

impl Injected {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Value, &Meta) -> Value + Send + Sync + 'static,
    {
        Injected::Func(Arc::new(f))
    }

    /// Resolve to a concrete value. Plain values ignore `input`.
    pub fn resolve(&self, input: Value, meta: &Meta) -> Value {
        match self {
            Injected::Value(value) => value.clone(),
            Injected::Func(f) => f(input, meta),
        }
    }
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injected::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Injected::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<Value> for Injected {
    fn from(value: Value) -> Self {
        Injected::Value(value)
    }
}

impl From<&str> for Injected {
    fn from(value: &str) -> Self {
        Injected::Value(Value::String(value.to_string()))
    }
}

impl From<f64> for Injected {
    fn from(value: f64) -> Self {
        Injected::Value(Value::from(value))
    }
}

/// Injections (`$N`, `{N}`) and errors (`!N`) bound to a compiled template
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub injections: Vec<Injected>,
    pub errors: Vec<Injected>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn injections<I, T>(mut self, injections: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Injected>,
    {
        self.injections = injections.into_iter().map(Into::into).collect();
        self
    }

    pub fn errors<I, T>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Injected>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self
    }

    pub fn injection(&self, index: usize) -> Option<&Injected> {
        self.injections.get(index)
    }

    pub fn error(&self, index: usize) -> Option<&Injected> {
        self.errors.get(index)
    }
}
