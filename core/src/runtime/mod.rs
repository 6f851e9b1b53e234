//! Validator runtime
//!
//! Everything a compiled pipeline calls into at validation time lives here:
//! the calling convention (`Validate`), per-call metadata, caller-supplied
//! bindings, the primitive checks, and a small combinator algebra so compiled
//! pipelines and hand-written validators can be mixed freely.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub mod checks;
pub mod containers;
pub mod groupers;
pub mod injection;
pub mod meta;
pub mod spreaders;


pub use containers::{with_errors, with_meta};
pub use groupers::{consecutive, or, parallel};
pub use injection::{Bindings, Injected, InjectedFn};
pub use meta::{Meta, PathSegment};
pub use spreaders::{get_dep, set_dep, use_default};

/* ===================== Calling Convention ===================== */

/// Error callback: `(payload, meta)`, invoked once per failing node
pub type ErrorCallback<'a> = dyn FnMut(Value, &Meta) + 'a;

/// A validator: returns the (possibly coerced) value, or `None` on failure.
///
/// Failures are reported through `on_error` at the point where they happen,
/// with `meta.path` locating the failing value.
pub trait Validate: Send + Sync {
    fn validate(
        &self,
        value: Value,
        on_error: &mut ErrorCallback<'_>,
        meta: &mut Meta,
    ) -> Option<Value>;
}

impl<F> Validate for F
where
    F: Fn(Value, &mut ErrorCallback<'_>, &mut Meta) -> Option<Value> + Send + Sync,
{
    fn validate(
        &self,
        value: Value,
        on_error: &mut ErrorCallback<'_>,
        meta: &mut Meta,
    ) -> Option<Value> {
        self(value, on_error, meta)
    }
}

/// Shared, type-erased validator
pub type Validator = Arc<dyn Validate>;

/// Wrap a closure with the validator signature
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(Value, &mut ErrorCallback<'_>, &mut Meta) -> Option<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Report `payload` if there is one, then signal failure
pub fn reject(
    on_error: &mut ErrorCallback<'_>,
    meta: &Meta,
    payload: Option<Value>,
) -> Option<Value> {
    if let Some(payload) = payload {
        on_error(payload, meta);
    }
    None
}

/* ===================== Reports ===================== */

/// One reported failure, captured for tooling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub error: Value,
    pub path: Vec<PathSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

/// Outcome of a validation run with every reported failure collected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub value: Option<Value>,
    pub failures: Vec<Failure>,
}

impl Report {
    /// An output was produced and nothing was reported
    pub fn is_valid(&self) -> bool {
        self.value.is_some() && self.failures.is_empty()
    }
}

/// Run `validator` with fresh metadata and collect its failures
pub fn report<V>(validator: &V, value: Value) -> Report
where
    V: Validate + ?Sized,
{
    let mut failures = Vec::new();
    let mut meta = Meta::new();
    let value = validator.validate(
        value,
        &mut |error, meta: &Meta| {
            failures.push(Failure {
                error,
                path: meta.path.clone(),
                validator: meta.validator.clone(),
            })
        },
        &mut meta,
    );

    Report { value, failures }
}
