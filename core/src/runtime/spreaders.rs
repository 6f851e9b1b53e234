//! Spreaders: move values through per-call metadata

use serde_json::Value;

use super::checks;
use super::injection::Injected;
use super::{validator, Validator};

/// Publish the value (or `external`, resolved against it) under `name`
pub fn set_dep(name: impl Into<String>, external: Option<Injected>) -> Validator {
    let name = name.into();
    validator(move |value, _on_error, meta| {
        let published = match &external {
            Some(external) => external.resolve(value.clone(), meta),
            None => value.clone(),
        };
        meta.publish(name.clone(), published);
        Some(value)
    })
}

/// Build validators from a published value and run them in sequence.
///
/// `build` receives `None` when nothing was published under `name`. An empty
/// list accepts the value unchanged.
pub fn get_dep<F>(name: impl Into<String>, build: F) -> Validator
where
    F: Fn(Option<&Value>) -> Vec<Validator> + Send + Sync + 'static,
{
    let name = name.into();
    validator(move |value, on_error, meta| {
        let validators = build(meta.dep(&name));
        validators
            .iter()
            .try_fold(value, |current, next| next.validate(current, on_error, meta))
    })
}

/// Substitute `default` for empty input (`null` or `""`), validate anything else
pub fn use_default(default: Injected, validators: Vec<Validator>) -> Validator {
    validator(move |value, on_error, meta| {
        if checks::empty(&value) {
            return Some(default.resolve(Value::Null, meta));
        }
        validators
            .iter()
            .try_fold(value, |current, next| next.validate(current, on_error, meta))
    })
}
