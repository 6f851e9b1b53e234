//! Named schemas: `#name(chain)` and `##name`

use tracing::trace;

use super::{fragment, Composer, Fragment};
use crate::error::CompileError;
use crate::parser::{TokenKind, ValidatorData};

/// Name of a `define` / `reference` node
pub(super) fn schema_name(data: &ValidatorData) -> Result<&str, CompileError> {
    data.params
        .first()
        .and_then(|param| param.as_token(TokenKind::Identifier))
        .map(|lexeme| lexeme.value.as_str())
        .ok_or_else(|| CompileError::invalid_params(&data.name, "expects a schema name"))
}

/// Invoke the schema stored in slot `handle`
fn call(handle: usize) -> Fragment {
    fragment(move |value, on_error, meta, env| {
        let schema = env.schemas.get(handle)?;
        schema(value, on_error, meta, env)
    })
}

impl Composer {
    pub(super) fn define(&mut self, data: &ValidatorData) -> Result<Fragment, CompileError> {
        if data.error.is_some() {
            return Err(CompileError::invalid_params(
                &data.name,
                "error tags belong inside the schema body",
            ));
        }
        let name = schema_name(data)?;
        let handle = self
            .registry
            .handle(name)
            .ok_or_else(|| CompileError::UndefinedSchema(name.to_string()))?;

        let entries = data
            .params
            .iter()
            .skip(1)
            .map(|param| {
                param
                    .as_validator()
                    .ok_or_else(|| CompileError::invalid_params(&data.name, "expects a validator chain"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if entries.is_empty() {
            return Err(CompileError::invalid_params(&data.name, "expects a validator chain"));
        }

        let body = self.chain(&entries)?;
        self.registry.fill(handle, body);
        trace!(schema = name, handle, "compiled schema body");

        Ok(call(handle))
    }

    pub(super) fn reference(&mut self, data: &ValidatorData) -> Result<Fragment, CompileError> {
        if data.error.is_some() {
            return Err(CompileError::invalid_params(
                &data.name,
                "error tags belong inside the schema body",
            ));
        }
        let name = schema_name(data)?;
        let handle = self
            .registry
            .handle(name)
            .ok_or_else(|| CompileError::UndefinedSchema(name.to_string()))?;

        Ok(call(handle))
    }
}
