//! Top-level suffixes: `~error` and `~meta`

use super::{fragment, Fragment};
use crate::error::CompileError;
use crate::parser::{Param, ValidatorData};
use crate::runtime::containers::collect_errors;
use crate::runtime::Meta;

/// Wrap the compiled pipeline with one suffix
pub(super) fn apply(inner: Fragment, suffix: &ValidatorData) -> Result<Fragment, CompileError> {
    if suffix.error.is_some() {
        return Err(CompileError::invalid_params(&suffix.name, "suffixes take no error tag"));
    }

    match suffix.name.as_str() {
        "~error" => {
            let processor = match suffix.params.as_slice() {
                [] => None,
                [Param::Injection(index)] => Some(*index),
                _ => {
                    return Err(CompileError::invalid_params(
                        &suffix.name,
                        "expects an optional injection such as ($0)",
                    ))
                }
            };

            Ok(fragment(move |value, _on_error, meta, env| {
                let processor = processor.and_then(|index| env.bindings.injection(index));
                Some(collect_errors(
                    |on_error| inner(value, on_error, meta, env),
                    processor,
                ))
            }))
        }

        "~meta" => {
            if !suffix.params.is_empty() {
                return Err(CompileError::invalid_params(&suffix.name, "takes no params"));
            }
            Ok(fragment(move |value, on_error, _meta, env| {
                inner(value, on_error, &mut Meta::new(), env)
            }))
        }

        other => Err(CompileError::UnknownValidator(other.to_string())),
    }
}
