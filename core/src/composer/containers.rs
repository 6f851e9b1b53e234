//! Containers: `object(...)` and `array(...)`

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::{fail, fragment, referenced_fields, sequence, Composer, ErrorRef, Fragment, Scope};
use crate::error::CompileError;
use crate::parser::{Param, TokenKind, ValidatorData};
use crate::runtime::PathSegment;

type FieldChain<'a> = (String, Vec<&'a ValidatorData>);

impl Composer {
    pub(super) fn object(
        &mut self,
        data: &ValidatorData,
        error: ErrorRef,
    ) -> Result<Fragment, CompileError> {
        let declared = split_fields(data)?;
        let mut referenced = HashSet::new();
        referenced_fields(&data.params, &mut referenced);

        self.scopes.push(Scope {
            fields: declared.iter().map(|(name, _)| name.clone()).collect(),
            current: 0,
        });
        let compiled = self.object_fields(&declared, &referenced);
        self.scopes.pop();
        let fields = compiled?;

        Ok(fragment(move |value, on_error, meta, env| {
            let Value::Object(input) = value else {
                return fail("object", Vec::new(), &error, on_error, meta, env);
            };
            if fields.is_empty() {
                return Some(Value::Object(input));
            }

            // A failed field keeps its slot as null
            let mut output = Map::new();
            for (name, field) in &fields {
                let item = input.get(name).cloned().unwrap_or(Value::Null);
                let segment = PathSegment::Key(name.clone());
                let validated = meta.scoped(segment, |meta| field(item, on_error, meta, env));
                output.insert(name.clone(), validated.unwrap_or(Value::Null));
            }

            Some(Value::Object(output))
        }))
    }

    /// Compile each field's chain. Fields other fields depend on get a
    /// trailing step publishing their validated value.
    fn object_fields(
        &mut self,
        declared: &[FieldChain<'_>],
        referenced: &HashSet<String>,
    ) -> Result<Vec<(String, Fragment)>, CompileError> {
        let mut fields = Vec::with_capacity(declared.len());
        for (index, (name, chain)) in declared.iter().enumerate() {
            if let Some(scope) = self.scopes.last_mut() {
                scope.current = index;
            }

            let mut fragments = chain
                .iter()
                .map(|entry| self.validator(entry))
                .collect::<Result<Vec<_>, _>>()?;
            if referenced.contains(name) {
                fragments.push(publish(name.clone()));
            }
            fields.push((name.clone(), sequence(fragments)));
        }
        Ok(fields)
    }

    pub(super) fn array(
        &mut self,
        data: &ValidatorData,
        error: ErrorRef,
    ) -> Result<Fragment, CompileError> {
        let entries = data
            .params
            .iter()
            .map(|param| {
                param
                    .as_validator()
                    .ok_or_else(|| CompileError::invalid_params("array", "expects a validator chain"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let item = if entries.is_empty() {
            None
        } else {
            Some(self.chain(&entries)?)
        };

        Ok(fragment(move |value, on_error, meta, env| {
            let Value::Array(items) = value else {
                return fail("array", Vec::new(), &error, on_error, meta, env);
            };
            let Some(item) = &item else {
                return Some(Value::Array(items));
            };

            let output = items
                .into_iter()
                .enumerate()
                .map(|(index, element)| {
                    meta.scoped(PathSegment::Index(index), |meta| {
                        item(element, on_error, meta, env)
                    })
                    .unwrap_or(Value::Null)
                })
                .collect();

            Some(Value::Array(output))
        }))
    }
}

fn publish(name: String) -> Fragment {
    fragment(move |value, _on_error, meta, _env| {
        meta.publish(name.clone(), value.clone());
        Some(value)
    })
}

/// Group object params into `(name, chain)` pairs
fn split_fields(data: &ValidatorData) -> Result<Vec<FieldChain<'_>>, CompileError> {
    let mut fields: Vec<FieldChain<'_>> = Vec::new();
    for param in &data.params {
        match param {
            Param::Token(lexeme) if lexeme.kind == TokenKind::Comma => {}
            Param::Token(lexeme) => fields.push((lexeme.value.clone(), Vec::new())),
            Param::Text(text) => fields.push((text.clone(), Vec::new())),
            Param::Validator(entry) => match fields.last_mut() {
                Some((_, chain)) => chain.push(entry),
                None => {
                    return Err(CompileError::invalid_params(
                        &data.name,
                        "validator without a field name",
                    ))
                }
            },
            _ => {
                return Err(CompileError::invalid_params(
                    &data.name,
                    "expects `name : chain` fields",
                ))
            }
        }
    }

    let mut seen = HashSet::new();
    for (name, chain) in &fields {
        if !seen.insert(name.as_str()) {
            return Err(CompileError::invalid_params(
                &data.name,
                format!("field '{}' is declared twice", name),
            ));
        }
        if chain.is_empty() {
            return Err(CompileError::invalid_params(
                &data.name,
                format!("field '{}' has no validators", name),
            ));
        }
    }

    Ok(fields)
}
