//! Composer - compiles the AST forest into an executable pipeline
//!
//! Every AST node becomes a closure (`Fragment`) with the runtime calling
//! convention plus an `Env` giving access to the bound injections and the
//! frozen schema table. Fragments are composed once at compile time; no code
//! is generated or interpreted while validating.
//!
//! Named schemas go through a two-pass registry: every `#name` of the compile
//! unit is declared first, so `##name` anywhere (including inside its own
//! body) compiles to a call through the declared handle.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::CompileError;
use crate::parser::{self, ErrorTag, Operand, Param, ValidatorData};
use crate::runtime::{reject, Bindings, ErrorCallback, Meta, Report, Validate};

mod comparators;
mod containers;
mod primitives;
mod schemas;
mod suffixes;

#[cfg(test)]
mod tests;

/* ===================== Fragments ===================== */

/// Compiled node: the validator signature plus the invocation environment
pub type Fragment =
    Arc<dyn Fn(Value, &mut ErrorCallback<'_>, &mut Meta, &Env<'_>) -> Option<Value> + Send + Sync>;

/// What a fragment can see besides its input
pub struct Env<'a> {
    pub bindings: &'a Bindings,
    pub schemas: &'a [Fragment],
}

/// Wrap a closure with the fragment signature
fn fragment<F>(f: F) -> Fragment
where
    F: Fn(Value, &mut ErrorCallback<'_>, &mut Meta, &Env<'_>) -> Option<Value>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Run fragments in order, stopping at the first failure
fn sequence(mut fragments: Vec<Fragment>) -> Fragment {
    if fragments.len() == 1 {
        if let Some(fragment) = fragments.pop() {
            return fragment;
        }
    }
    fragment(move |value, on_error, meta, env| {
        fragments
            .iter()
            .try_fold(value, |current, fragment| fragment(current, on_error, meta, env))
    })
}

/* ===================== Error Resolution ===================== */

/// Payload a node reports when it fails, resolved at failure time
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorRef {
    /// Report nothing (the failure still short-circuits)
    None,
    Literal(Value),
    /// Index into the bound errors array
    Positional(usize),
}

impl ErrorRef {
    fn from_tag(tag: Option<&ErrorTag>) -> Self {
        match tag {
            None => ErrorRef::None,
            Some(ErrorTag::Literal(text)) => ErrorRef::Literal(Value::String(text.clone())),
            Some(ErrorTag::Positional(index)) => ErrorRef::Positional(*index),
        }
    }

    pub fn resolve(&self, meta: &Meta, bindings: &Bindings) -> Option<Value> {
        match self {
            ErrorRef::None => None,
            ErrorRef::Literal(value) => Some(value.clone()),
            ErrorRef::Positional(index) => Some(
                bindings
                    .error(*index)
                    .map_or(Value::Null, |error| error.resolve(Value::Null, meta)),
            ),
        }
    }
}

/// Describe the failed check, then report its error
fn fail(
    name: &str,
    params: Vec<Value>,
    error: &ErrorRef,
    on_error: &mut ErrorCallback<'_>,
    meta: &mut Meta,
    env: &Env<'_>,
) -> Option<Value> {
    meta.describe(name, params);
    let payload = error.resolve(meta, env.bindings);
    reject(on_error, meta, payload)
}

/* ===================== Operands ===================== */

/// A value compared against at validation time
#[derive(Debug, Clone)]
enum Bound {
    Literal(Value),
    Injection(usize),
    Field(String),
}

impl Bound {
    /// Injected functions receive the value under validation
    fn resolve(&self, value: &Value, meta: &Meta, env: &Env<'_>) -> Value {
        match self {
            Bound::Literal(literal) => literal.clone(),
            Bound::Injection(index) => env
                .bindings
                .injection(*index)
                .map_or(Value::Null, |injected| injected.resolve(value.clone(), meta)),
            Bound::Field(name) => meta.dep(name).cloned().unwrap_or(Value::Null),
        }
    }
}

/* ===================== Registry ===================== */

/// Compile-time arena of named schema slots
#[derive(Default)]
struct Registry {
    handles: HashMap<String, usize>,
    slots: Vec<Option<Fragment>>,
}

impl Registry {
    fn declare(&mut self, name: &str) -> Result<usize, CompileError> {
        if self.handles.contains_key(name) {
            return Err(CompileError::DuplicateSchema(name.to_string()));
        }
        let handle = self.slots.len();
        self.slots.push(None);
        self.handles.insert(name.to_string(), handle);
        Ok(handle)
    }

    fn handle(&self, name: &str) -> Option<usize> {
        self.handles.get(name).copied()
    }

    fn fill(&mut self, handle: usize, fragment: Fragment) {
        if let Some(slot) = self.slots.get_mut(handle) {
            *slot = Some(fragment);
        }
    }

    fn freeze(self) -> Result<Arc<[Fragment]>, CompileError> {
        let mut names: Vec<(usize, String)> = self
            .handles
            .into_iter()
            .map(|(name, handle)| (handle, name))
            .collect();
        names.sort();

        names
            .into_iter()
            .zip(self.slots)
            .map(|((_, name), slot)| slot.ok_or(CompileError::UndefinedSchema(name)))
            .collect()
    }
}

/* ===================== Composer ===================== */

/// Fields of one object being compiled, for dependency resolution
struct Scope {
    fields: Vec<String>,
    current: usize,
}

pub struct Composer {
    registry: Registry,
    scopes: Vec<Scope>,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            registry: Registry::default(),
            scopes: Vec::new(),
        }
    }

    /// Compile an AST forest: one validator chain followed by suffixes
    pub fn compose(mut self, forest: &[Param]) -> Result<Template, CompileError> {
        let mut nodes = Vec::with_capacity(forest.len());
        for param in forest {
            match param.as_validator() {
                Some(data) => nodes.push(data),
                None => {
                    return Err(CompileError::invalid_params(
                        "schema",
                        "top level may only contain validators",
                    ))
                }
            }
        }

        let split = nodes
            .iter()
            .position(|data| data.is_suffix())
            .unwrap_or(nodes.len());
        let (chain, trailing) = nodes.split_at(split);
        if trailing.iter().any(|data| !data.is_suffix()) {
            let name = trailing.first().map(|data| data.name.clone()).unwrap_or_default();
            return Err(CompileError::MisplacedSuffix(name));
        }
        if chain.is_empty() {
            return Err(CompileError::invalid_params("schema", "missing validator chain"));
        }

        for data in &nodes {
            self.declare(data)?;
        }

        let mut root = self.chain(chain)?;
        let schemas = self.registry.freeze()?;
        for suffix in trailing {
            root = suffixes::apply(root, suffix)?;
        }

        debug!(
            schemas = schemas.len(),
            suffixes = trailing.len(),
            "composed schema pipeline"
        );
        let collects_errors = trailing.iter().any(|data| data.name == "~error");
        Ok(Template {
            root,
            schemas,
            collects_errors,
        })
    }

    /// Declaration pass: one registry slot per `#name` anywhere in the tree
    fn declare(&mut self, data: &ValidatorData) -> Result<(), CompileError> {
        if data.name == "define" {
            let name = schemas::schema_name(data)?;
            self.registry.declare(name)?;
        }
        for child in data.params.iter().filter_map(Param::as_validator) {
            self.declare(child)?;
        }
        Ok(())
    }

    fn chain(&mut self, entries: &[&ValidatorData]) -> Result<Fragment, CompileError> {
        let fragments = entries
            .iter()
            .map(|data| self.validator(data))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sequence(fragments))
    }

    fn validator(&mut self, data: &ValidatorData) -> Result<Fragment, CompileError> {
        let error = ErrorRef::from_tag(data.error.as_ref());
        match data.name.as_str() {
            "number" | "string" | "bool" | "integer" | "date" | "empty" => {
                primitives::primitive(data, error)
            }
            "equal" | "notEqual" => comparators::equality(data, error),
            "oneOf" => comparators::one_of(data, error),
            "regex" => comparators::regex(data, error),
            "compare" | "length" => self.comparison(data, error),
            "object" => self.object(data, error),
            "array" => self.array(data, error),
            "define" => self.define(data),
            "reference" => self.reference(data),
            name if data.is_suffix() => Err(CompileError::MisplacedSuffix(name.to_string())),
            name => Err(CompileError::UnknownValidator(name.to_string())),
        }
    }

    /// Check that `dependency` names a field declared before the current one.
    ///
    /// The innermost object declaring the name decides.
    fn resolve_dependency(&self, dependency: &str) -> Result<(), CompileError> {
        for scope in self.scopes.iter().rev() {
            if let Some(position) = scope.fields.iter().position(|f| f == dependency) {
                if position < scope.current {
                    return Ok(());
                }
                return Err(CompileError::ForwardDependency {
                    field: scope.fields.get(scope.current).cloned().unwrap_or_default(),
                    dependency: dependency.to_string(),
                });
            }
        }
        Err(CompileError::UnknownDependency(dependency.to_string()))
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

/// Field names referenced by comparators anywhere under `params`
fn referenced_fields(params: &[Param], found: &mut HashSet<String>) {
    for param in params {
        match param {
            Param::Comparison(comparison) => {
                if let Operand::Field(name) = &comparison.operand {
                    found.insert(name.clone());
                }
            }
            Param::Validator(data) => referenced_fields(&data.params, found),
            _ => {}
        }
    }
}

/* ===================== Templates and Pipelines ===================== */

/// Compiled schema, not yet bound to injections and errors
#[derive(Clone)]
pub struct Template {
    root: Fragment,
    schemas: Arc<[Fragment]>,
    collects_errors: bool,
}

impl Template {
    pub fn bind(&self, bindings: Bindings) -> Pipeline {
        Pipeline {
            template: self.clone(),
            bindings: Arc::new(bindings),
        }
    }

    /// Bind with no injections and no errors
    pub fn pipeline(&self) -> Pipeline {
        self.bind(Bindings::default())
    }

    /// Number of named schemas in the compile unit
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// True when a `~error` suffix folds failures into the output
    pub fn collects_errors(&self) -> bool {
        self.collects_errors
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("schemas", &self.schemas.len())
            .field("collects_errors", &self.collects_errors)
            .finish_non_exhaustive()
    }
}

/// Template bound to caller-supplied injections and errors
#[derive(Clone)]
pub struct Pipeline {
    template: Template,
    bindings: Arc<Bindings>,
}

impl Pipeline {
    /// Validate with fresh metadata and collect every reported failure
    pub fn report(&self, value: Value) -> Report {
        crate::runtime::report(self, value)
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl Validate for Pipeline {
    fn validate(
        &self,
        value: Value,
        on_error: &mut ErrorCallback<'_>,
        meta: &mut Meta,
    ) -> Option<Value> {
        let env = Env {
            bindings: &self.bindings,
            schemas: &self.template.schemas,
        };
        (self.template.root)(value, on_error, meta, &env)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("template", &self.template)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/* ===================== Public API ===================== */

/// Compile schema text into a template
pub fn compile(text: &str) -> Result<Template, CompileError> {
    let forest = parser::parse_schema(text)?;
    Composer::new().compose(&forest)
}
