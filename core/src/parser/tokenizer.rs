//! Tokenizer - PEST-based lexer for the schema DSL
//!
//! Turns schema text into a flat sequence of classified lexemes. Keyword
//! classification is table-driven so long names and short aliases produce
//! identical lexemes.

use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ParseError;

/* ===================== Token Kinds ===================== */

/// Terminal alphabet of the grammar table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Keywords
    Object,
    Array,
    Primitive,
    Compare,
    Length,
    Regex,
    Equality,
    OneOf,
    Define,
    Reference,
    ErrorSuffix,
    MetaSuffix,

    // Literals
    Identifier,
    Number,
    Constant,
    Text,
    Operator,

    // Structure
    Quote,
    LParen,
    RParen,
    Comma,
    Colon,
    LBrace,
    RBrace,
    Dollar,
    Bang,
}

impl TokenKind {
    /// Whether lexemes of this kind survive into the AST
    pub fn carries_value(&self) -> bool {
        !matches!(
            self,
            TokenKind::Quote
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::Colon
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Dollar
        )
    }
}

/// A classified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub value: String,
    pub carries_value: bool,
    /// Byte offset in the schema text
    pub offset: usize,
}

impl Lexeme {
    pub fn new(kind: TokenKind, value: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            carries_value: kind.carries_value(),
            offset,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}  {:<12} {}", self.offset, format!("{:?}", self.kind), self.value)
    }
}

/* ===================== Keyword Table ===================== */

pub struct Keyword {
    pub long: &'static str,
    pub short: &'static str,
    pub kind: TokenKind,
}

pub static KEYWORDS: &[Keyword] = &[
    Keyword { long: "object", short: "o", kind: TokenKind::Object },
    Keyword { long: "array", short: "a", kind: TokenKind::Array },
    Keyword { long: "number", short: "n", kind: TokenKind::Primitive },
    Keyword { long: "string", short: "s", kind: TokenKind::Primitive },
    Keyword { long: "bool", short: "b", kind: TokenKind::Primitive },
    Keyword { long: "integer", short: "i", kind: TokenKind::Primitive },
    Keyword { long: "date", short: "d", kind: TokenKind::Primitive },
    Keyword { long: "empty", short: "em", kind: TokenKind::Primitive },
    Keyword { long: "compare", short: "c", kind: TokenKind::Compare },
    Keyword { long: "length", short: "l", kind: TokenKind::Length },
    Keyword { long: "regex", short: "r", kind: TokenKind::Regex },
    Keyword { long: "equal", short: "eq", kind: TokenKind::Equality },
    Keyword { long: "notEqual", short: "ne", kind: TokenKind::Equality },
    Keyword { long: "oneOf", short: "of", kind: TokenKind::OneOf },
    Keyword { long: "~error", short: "~e", kind: TokenKind::ErrorSuffix },
    Keyword { long: "~meta", short: "~m", kind: TokenKind::MetaSuffix },
];

/// Look a word up by long name or short alias
pub fn keyword(word: &str) -> Option<&'static Keyword> {
    KEYWORDS.iter().find(|k| k.long == word || k.short == word)
}

/// Look a word up by long name only
fn long_keyword(word: &str) -> Option<&'static Keyword> {
    KEYWORDS.iter().find(|k| k.long == word)
}

/* ===================== PEST Lexer ===================== */

#[derive(Parser)]
#[grammar = "parser/schema.pest"]
struct SchemaLexer;

/// Tokenize schema text
pub fn tokenize(text: &str) -> Result<Vec<Lexeme>, ParseError> {
    let pairs = SchemaLexer::parse(Rule::lexemes, text).map_err(|err| {
        let offset = match err.location {
            InputLocation::Pos(pos) => pos,
            InputLocation::Span((start, _)) => start,
        };
        lexical_error(text, offset)
    })?;

    let mut lexemes = Vec::new();
    for pair in pairs.flat_map(|pair| pair.into_inner()) {
        lex_pair(pair, &mut lexemes)?;
    }

    Ok(lexemes)
}

fn lex_pair(pair: Pair<Rule>, lexemes: &mut Vec<Lexeme>) -> Result<(), ParseError> {
    let offset = pair.as_span().start();
    let text = pair.as_str();

    match pair.as_rule() {
        Rule::quoted => {
            for part in pair.into_inner() {
                let offset = part.as_span().start();
                match part.as_rule() {
                    Rule::quote => lexemes.push(Lexeme::new(TokenKind::Quote, "'", offset)),
                    Rule::text => lexemes.push(Lexeme::new(TokenKind::Text, part.as_str(), offset)),
                    Rule::escape => {
                        lexemes.push(Lexeme::new(TokenKind::Text, unescape(part.as_str()), offset))
                    }
                    _ => {}
                }
            }
        }

        Rule::reference => {
            lexemes.push(Lexeme::new(TokenKind::Reference, "reference", offset));
            lexemes.push(Lexeme::new(
                TokenKind::Identifier,
                text.trim_start_matches('#'),
                offset + 2,
            ));
        }

        Rule::define => {
            lexemes.push(Lexeme::new(TokenKind::Define, "define", offset));
            lexemes.push(Lexeme::new(
                TokenKind::Identifier,
                text.trim_start_matches('#'),
                offset + 1,
            ));
        }

        Rule::suffix => {
            let keyword = keyword(text).ok_or_else(|| ParseError::Lexical {
                offset,
                message: format!("unknown suffix '{}'", text),
            })?;
            lexemes.push(Lexeme::new(keyword.kind, keyword.long, offset));
        }

        Rule::keyword => {
            let word = text.trim_start_matches('@');
            let keyword = keyword(word)
                .filter(|k| !k.long.starts_with('~'))
                .ok_or_else(|| ParseError::Lexical {
                    offset,
                    message: format!("unknown validator '{}'", text),
                })?;
            lexemes.push(Lexeme::new(keyword.kind, keyword.long, offset));
        }

        Rule::word => {
            let lexeme = match text {
                "true" | "false" | "null" => Lexeme::new(TokenKind::Constant, text, offset),
                _ => match long_keyword(text) {
                    Some(keyword) if !keyword.long.starts_with('~') => {
                        Lexeme::new(keyword.kind, keyword.long, offset)
                    }
                    _ => Lexeme::new(TokenKind::Identifier, text, offset),
                },
            };
            lexemes.push(lexeme);
        }

        Rule::number => lexemes.push(Lexeme::new(TokenKind::Number, text, offset)),
        Rule::operator => lexemes.push(Lexeme::new(TokenKind::Operator, text, offset)),

        Rule::symbol => {
            let kind = match text {
                "(" => TokenKind::LParen,
                ")" => TokenKind::RParen,
                "," => TokenKind::Comma,
                ":" => TokenKind::Colon,
                "{" => TokenKind::LBrace,
                "}" => TokenKind::RBrace,
                "$" => TokenKind::Dollar,
                "!" => TokenKind::Bang,
                _ => {
                    return Err(ParseError::Lexical {
                        offset,
                        message: format!("unexpected symbol '{}'", text),
                    })
                }
            };
            lexemes.push(Lexeme::new(kind, text, offset));
        }

        _ => {}
    }

    Ok(())
}

/// Decode a `\x` escape. Unknown escapes keep their backslash (`\d` in patterns).
fn unescape(escape: &str) -> String {
    match escape.chars().nth(1) {
        Some('n') => "\n".to_string(),
        Some('t') => "\t".to_string(),
        Some(c @ ('\\' | '\'')) => c.to_string(),
        Some(other) => format!("\\{}", other),
        None => String::new(),
    }
}

fn lexical_error(text: &str, offset: usize) -> ParseError {
    let message = match text.get(offset..).and_then(|rest| rest.chars().next()) {
        Some(c) => format!("unexpected character '{}'", c),
        None => "unexpected end of input".to_string(),
    };
    ParseError::Lexical { offset, message }
}
