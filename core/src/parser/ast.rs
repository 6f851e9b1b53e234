//! AST produced by the grammar interpreter

use serde::{Deserialize, Serialize};

use super::tokenizer::{Lexeme, TokenKind};
use crate::runtime::checks::CompareOp;

/// One item of a validator's parameter list (or of the root forest)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum Param {
    Validator(ValidatorData),
    Token(Lexeme),
    Text(String),
    Injection(usize),
    Comparison(Comparison),
}

impl Param {
    pub fn as_validator(&self) -> Option<&ValidatorData> {
        match self {
            Param::Validator(data) => Some(data),
            _ => None,
        }
    }

    /// The lexeme if this is a token of the given kind
    pub fn as_token(&self, kind: TokenKind) -> Option<&Lexeme> {
        match self {
            Param::Token(lexeme) if lexeme.kind == kind => Some(lexeme),
            _ => None,
        }
    }
}

/// One validator invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorTag>,
}

impl ValidatorData {
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
            error: None,
        }
    }

    pub fn is_suffix(&self) -> bool {
        self.name.starts_with('~')
    }
}

/// `!N` or `!'text'`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTag {
    Positional(usize),
    Literal(String),
}

/// `<op><operand>` inside `compare(...)` / `length(...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CompareOp,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Number(f64),
    Text(String),
    Injection(usize),
    /// Name of another field (dependency lookup)
    Field(String),
}
