//! Value relations: `equal`, `notEqual`, `oneOf`, `regex`, `compare`, `length`

use regex::Regex;
use serde_json::Value;

use super::{fail, fragment, Bound, Composer, ErrorRef, Fragment};
use crate::error::CompileError;
use crate::parser::{Comparison, Operand, Param, TokenKind, ValidatorData};
use crate::runtime::checks;

/// A literal or injection written as a validator parameter
fn value_bound(validator: &str, param: &Param) -> Result<Bound, CompileError> {
    match param {
        Param::Token(lexeme) if lexeme.kind == TokenKind::Number => lexeme
            .value
            .parse::<f64>()
            .map(|number| Bound::Literal(checks::number_value(number)))
            .map_err(|_| {
                CompileError::invalid_params(validator, format!("invalid number '{}'", lexeme.value))
            }),
        Param::Token(lexeme) if lexeme.kind == TokenKind::Constant => {
            let constant = match lexeme.value.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::Null,
            };
            Ok(Bound::Literal(constant))
        }
        Param::Text(text) => Ok(Bound::Literal(Value::String(text.clone()))),
        Param::Injection(index) => Ok(Bound::Injection(*index)),
        _ => Err(CompileError::invalid_params(
            validator,
            "expects a number, constant, quoted text or injection",
        )),
    }
}

pub(super) fn equality(data: &ValidatorData, error: ErrorRef) -> Result<Fragment, CompileError> {
    let [param] = data.params.as_slice() else {
        return Err(CompileError::invalid_params(&data.name, "expects exactly one value"));
    };
    let bound = value_bound(&data.name, param)?;
    let expected = data.name == "equal";
    let name = data.name.clone();

    Ok(fragment(move |value, on_error, meta, env| {
        let other = bound.resolve(&value, meta, env);
        if checks::strict_equals(&value, &other) == expected {
            Some(value)
        } else {
            fail(&name, vec![other], &error, on_error, meta, env)
        }
    }))
}

pub(super) fn one_of(data: &ValidatorData, error: ErrorRef) -> Result<Fragment, CompileError> {
    let bounds = data
        .params
        .iter()
        .filter(|param| param.as_token(TokenKind::Comma).is_none())
        .map(|param| value_bound(&data.name, param))
        .collect::<Result<Vec<_>, _>>()?;
    if bounds.is_empty() {
        return Err(CompileError::invalid_params(&data.name, "expects at least one value"));
    }

    Ok(fragment(move |value, on_error, meta, env| {
        let candidates: Vec<Value> = bounds
            .iter()
            .map(|bound| bound.resolve(&value, meta, env))
            .collect();
        if checks::one_of(&value, &candidates) {
            Some(value)
        } else {
            fail("oneOf", candidates, &error, on_error, meta, env)
        }
    }))
}

pub(super) fn regex(data: &ValidatorData, error: ErrorRef) -> Result<Fragment, CompileError> {
    let [Param::Text(pattern)] = data.params.as_slice() else {
        return Err(CompileError::invalid_params(&data.name, "expects one quoted pattern"));
    };
    let compiled = Regex::new(pattern).map_err(|err| CompileError::InvalidRegex {
        pattern: pattern.clone(),
        message: err.to_string(),
    })?;
    let pattern = Value::String(pattern.clone());

    Ok(fragment(move |value, on_error, meta, env| {
        if checks::matches(&compiled, &value) {
            Some(value)
        } else {
            fail("regex", vec![pattern.clone()], &error, on_error, meta, env)
        }
    }))
}

impl Composer {
    /// `compare(<op><operand>)` and `length(<op><operand>)`
    pub(super) fn comparison(
        &self,
        data: &ValidatorData,
        error: ErrorRef,
    ) -> Result<Fragment, CompileError> {
        let [Param::Comparison(Comparison { op, operand })] = data.params.as_slice() else {
            return Err(CompileError::invalid_params(
                &data.name,
                "expects one comparator such as (>=0)",
            ));
        };
        let op = *op;
        let length = data.name == "length";

        let bound = match operand {
            Operand::Number(number) => Bound::Literal(checks::number_value(*number)),
            Operand::Text(_) if length => {
                return Err(CompileError::invalid_params(
                    &data.name,
                    "bound must be a number, injection or field",
                ))
            }
            Operand::Text(text) => Bound::Literal(Value::String(text.clone())),
            Operand::Injection(index) => Bound::Injection(*index),
            Operand::Field(field) => {
                self.resolve_dependency(field)?;
                Bound::Field(field.clone())
            }
        };

        let name = data.name.clone();
        Ok(fragment(move |value, on_error, meta, env| {
            let bound = bound.resolve(&value, meta, env);
            let holds = if length {
                checks::length(&value)
                    .map_or(false, |len| checks::compare(&Value::from(len), &bound, op))
            } else {
                checks::compare(&value, &bound, op)
            };

            if holds {
                Some(value)
            } else {
                let params = vec![Value::from(op.symbol()), bound];
                fail(&name, params, &error, on_error, meta, env)
            }
        }))
    }
}
