//! Containers: change how a validator is invoked rather than what it checks

use serde_json::{json, Value};

use super::injection::Injected;
use super::meta::Meta;
use super::{validator, ErrorCallback, Validator};

/// Run every invocation with fresh metadata, ignoring the caller's
pub fn with_meta(inner: Validator) -> Validator {
    validator(move |value, on_error, _meta| inner.validate(value, on_error, &mut Meta::new()))
}

/// Collect reported payloads instead of forwarding them.
///
/// The result is always `{"result": value|null, "errors": [..]|null}`. When
/// a `processor` is given, each payload goes through it first.
pub fn with_errors(inner: Validator, processor: Option<Injected>) -> Validator {
    validator(move |value, _on_error, meta| {
        Some(collect_errors(
            |on_error| inner.validate(value, on_error, meta),
            processor.as_ref(),
        ))
    })
}

pub(crate) fn collect_errors<F>(run: F, processor: Option<&Injected>) -> Value
where
    F: FnOnce(&mut ErrorCallback<'_>) -> Option<Value>,
{
    let mut errors = Vec::new();
    let result = run(&mut |error, meta: &Meta| {
        let error = match processor {
            Some(processor) => processor.resolve(error, meta),
            None => error,
        };
        errors.push(error);
    });

    let errors = if errors.is_empty() {
        Value::Null
    } else {
        Value::Array(errors)
    };
    json!({ "result": result.unwrap_or(Value::Null), "errors": errors })
}
