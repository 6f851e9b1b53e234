//! Groupers: combine several validators into one

use serde_json::Value;

use super::{validator, Meta, Validator};

/// Pass the value through each validator in turn, stopping at the first failure
pub fn consecutive(validators: Vec<Validator>) -> Validator {
    validator(move |value, on_error, meta| {
        validators
            .iter()
            .try_fold(value, |current, next| next.validate(current, on_error, meta))
    })
}

/// Run every validator against the original value.
///
/// All failures are reported. Fails if any validator failed, otherwise
/// returns the output of the last one.
pub fn parallel(validators: Vec<Validator>) -> Validator {
    validator(move |value, on_error, meta| {
        let mut output = Some(value.clone());
        for next in &validators {
            let result = next.validate(value.clone(), on_error, meta);
            if output.is_some() {
                output = result;
            }
        }
        output
    })
}

/// First validator that accepts the value wins.
///
/// Failures of candidates are held back and only reported when every
/// candidate fails, in candidate order.
pub fn or(validators: Vec<Validator>) -> Validator {
    validator(move |value, on_error, meta| {
        if validators.is_empty() {
            return Some(value);
        }

        let mut pending: Vec<(Value, Meta)> = Vec::new();
        for candidate in &validators {
            let mut hold = |payload: Value, at: &Meta| pending.push((payload, at.clone()));
            if let Some(result) = candidate.validate(value.clone(), &mut hold, meta) {
                return Some(result);
            }
        }

        for (payload, at) in &pending {
            on_error(payload.clone(), at);
        }
        None
    })
}
