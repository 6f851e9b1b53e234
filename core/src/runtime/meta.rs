//! Per-call validation metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// One step of the location of a value inside the validated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Metadata threaded through every validator of one invocation.
///
/// `path` is extended by containers while they validate their children and
/// restored afterwards. `deps` is shared by the whole invocation: fields that
/// other fields compare against publish their validated value here.
/// `validator` and `params` describe the check that failed most recently and
/// are filled in right before the error callback runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub path: Vec<PathSegment>,
    pub deps: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with `segment` appended to the path
    pub fn scoped<R>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Meta) -> R) -> R {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    /// Publish a validated value for later dependency lookups
    pub fn publish(&mut self, name: impl Into<String>, value: Value) {
        self.deps.insert(name.into(), value);
    }

    pub fn dep(&self, name: &str) -> Option<&Value> {
        self.deps.get(name)
    }

    /// Record which check failed and with which params
    pub fn describe(&mut self, validator: &str, params: Vec<Value>) {
        self.validator = Some(validator.to_string());
        self.params = params;
    }

    /// Dotted rendering of the path, e.g. `users.0.name`
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|segment| segment.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}
