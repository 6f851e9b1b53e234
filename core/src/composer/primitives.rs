//! Type checks: `number`, `string`, `bool`, `integer`, `date`, `empty`

use serde_json::Value;

use super::{fail, fragment, ErrorRef, Fragment};
use crate::error::CompileError;
use crate::parser::ValidatorData;
use crate::runtime::checks;

pub(super) fn primitive(data: &ValidatorData, error: ErrorRef) -> Result<Fragment, CompileError> {
    if !data.params.is_empty() {
        return Err(CompileError::invalid_params(&data.name, "takes no params"));
    }

    let check: fn(&Value) -> Option<Value> = match data.name.as_str() {
        "number" => checks::number,
        "string" => checks::string,
        "bool" => checks::boolean,
        "integer" => checks::integer,
        "date" => checks::date,
        "empty" => empty,
        other => return Err(CompileError::UnknownValidator(other.to_string())),
    };

    let name = data.name.clone();
    Ok(fragment(move |value, on_error, meta, env| match check(&value) {
        Some(value) => Some(value),
        None => fail(&name, Vec::new(), &error, on_error, meta, env),
    }))
}

fn empty(value: &Value) -> Option<Value> {
    checks::empty(value).then(|| value.clone())
}
