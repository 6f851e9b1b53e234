use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised while compiling schema text
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Unknown validator '{0}'")]
    UnknownValidator(String),

    #[error("Invalid params for '{validator}': {message}")]
    InvalidParams { validator: String, message: String },

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Schema '#{0}' is defined more than once")]
    DuplicateSchema(String),

    #[error("Schema '##{0}' is referenced but never defined")]
    UndefinedSchema(String),

    #[error("Field '{field}' depends on '{dependency}', which is not declared before it")]
    ForwardDependency { field: String, dependency: String },

    #[error("Dependency '{0}' does not name a field in scope")]
    UnknownDependency(String),

    #[error("Suffix '{0}' may only appear at the end of the schema")]
    MisplacedSuffix(String),
}

impl CompileError {
    pub(crate) fn invalid_params(validator: &str, message: impl Into<String>) -> Self {
        CompileError::InvalidParams {
            validator: validator.to_string(),
            message: message.into(),
        }
    }
}
