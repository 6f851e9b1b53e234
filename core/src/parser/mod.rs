//! Schema DSL front end
//!
//! Two stages: a PEST-based tokenizer producing classified lexemes, and a
//! table-driven grammar interpreter turning them into the AST forest consumed
//! by the composer.

use tracing::debug;

pub mod ast;
pub mod grammar;
pub mod interpreter;
pub mod tokenizer;


pub use ast::{Comparison, ErrorTag, Operand, Param, ValidatorData};
pub use interpreter::interpret;
pub use tokenizer::{tokenize, Lexeme, TokenKind};

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Text that does not form a token
    Lexical { offset: usize, message: String },
    /// Tokens that do not derive from the grammar
    Semantic,
}

impl ParseError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Lexical { offset, .. } => Some(*offset),
            ParseError::Semantic => None,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lexical { offset, message } => {
                write!(f, "Lexical error at offset {}: {}", offset, message)
            }
            ParseError::Semantic => write!(f, "Semantic error: could not derive the input in full"),
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

/// Parse schema text into the AST forest
pub fn parse_schema(text: &str) -> ParseResult<Vec<Param>> {
    let lexemes = tokenize(text)?;
    debug!(lexemes = lexemes.len(), "tokenized schema");

    let forest = interpret(&lexemes)?;
    debug!(nodes = forest.len(), "derived schema AST");

    Ok(forest)
}
