//! Grammar interpreter
//!
//! Generic recursive descent over the grammar table. Rules that declare a
//! construct open an accumulation frame; the frame is reduced into a single
//! AST node and spliced into its parent when the rule derives, or discarded
//! when it does not.

use tracing::trace;

use super::ast::{Comparison, ErrorTag, Operand, Param, ValidatorData};
use super::grammar::{Construct, Item, RuleId, PROGRAM, RULES};
use super::tokenizer::{Lexeme, TokenKind};
use super::ParseError;
use crate::runtime::checks::CompareOp;

/* ===================== Frames ===================== */

#[derive(Debug)]
enum Buffer {
    Nodes(Vec<Param>),
    Text(String),
}

impl Buffer {
    fn len(&self) -> usize {
        match self {
            Buffer::Nodes(nodes) => nodes.len(),
            Buffer::Text(text) => text.len(),
        }
    }

    fn truncate(&mut self, len: usize) {
        match self {
            Buffer::Nodes(nodes) => nodes.truncate(len),
            Buffer::Text(text) => text.truncate(len),
        }
    }
}

#[derive(Debug)]
struct Frame {
    construct: Option<Construct>,
    buffer: Buffer,
}

impl Frame {
    fn root() -> Self {
        Self {
            construct: None,
            buffer: Buffer::Nodes(Vec::new()),
        }
    }

    fn open(construct: Construct) -> Self {
        let buffer = match construct {
            Construct::Text | Construct::Injection => Buffer::Text(String::new()),
            Construct::Comparator | Construct::Params | Construct::Entry => {
                Buffer::Nodes(Vec::new())
            }
        };
        Self {
            construct: Some(construct),
            buffer,
        }
    }
}

/// Frame depth and active buffer length, restored when a branch fails
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    depth: usize,
    len: usize,
}

/* ===================== Parse Context ===================== */

pub struct ParseContext<'a> {
    lexemes: &'a [Lexeme],
    frames: Vec<Frame>,
}

impl<'a> ParseContext<'a> {
    pub fn new(lexemes: &'a [Lexeme]) -> Self {
        Self {
            lexemes,
            frames: vec![Frame::root()],
        }
    }

    /// Derive `rule` starting at `offset`; returns the offset after the match
    pub fn derive(&mut self, rule: RuleId, offset: usize) -> Option<usize> {
        let definition = &RULES[rule];

        let Some(construct) = definition.construct else {
            return self.derive_items(definition.items, offset);
        };

        self.frames.push(Frame::open(construct));
        let result = self.derive_items(definition.items, offset);
        let frame = self.frames.pop()?;

        match result {
            Some(next) if self.reduce(frame) => Some(next),
            _ => {
                trace!(rule = definition.name, offset, "rule did not derive");
                None
            }
        }
    }

    /// The root frame's nodes
    pub fn into_forest(mut self) -> Vec<Param> {
        self.frames.truncate(1);
        match self.frames.pop().map(|frame| frame.buffer) {
            Some(Buffer::Nodes(nodes)) => nodes,
            _ => Vec::new(),
        }
    }

    fn derive_items(&mut self, items: &'static [Item], mut offset: usize) -> Option<usize> {
        for item in items {
            offset = self.derive_item(item, offset)?;
        }
        Some(offset)
    }

    fn derive_item(&mut self, item: &Item, offset: usize) -> Option<usize> {
        match *item {
            Item::Token(kind) => self.terminal(kind, offset),
            Item::Rule(rule) => self.derive(rule, offset),
            Item::Choice(candidates) => {
                let snapshot = self.snapshot();
                for &candidate in candidates {
                    if let Some(next) = self.derive_items(candidate, offset) {
                        return Some(next);
                    }
                    self.restore(snapshot);
                }
                None
            }
            Item::Repeat(body) => {
                let mut offset = offset;
                loop {
                    let snapshot = self.snapshot();
                    match self.derive_items(body, offset) {
                        Some(next) if next > offset => offset = next,
                        _ => {
                            self.restore(snapshot);
                            return Some(offset);
                        }
                    }
                }
            }
        }
    }

    fn terminal(&mut self, kind: TokenKind, offset: usize) -> Option<usize> {
        let lexeme = self.lexemes.get(offset)?;
        if lexeme.kind != kind {
            return None;
        }
        if lexeme.carries_value {
            let frame = self.frames.last_mut()?;
            match &mut frame.buffer {
                Buffer::Nodes(nodes) => nodes.push(Param::Token(lexeme.clone())),
                Buffer::Text(text) => text.push_str(&lexeme.value),
            }
        }
        Some(offset + 1)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            depth: self.frames.len(),
            len: self.frames.last().map_or(0, |frame| frame.buffer.len()),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.frames.truncate(snapshot.depth);
        if let Some(frame) = self.frames.last_mut() {
            frame.buffer.truncate(snapshot.len);
        }
    }

    /* ===================== Reductions ===================== */

    /// Reduce a completed frame into its parent. `false` rejects the derivation.
    fn reduce(&mut self, frame: Frame) -> bool {
        let Some(construct) = frame.construct else {
            return false;
        };

        let node = match (construct, frame.buffer) {
            (Construct::Text, Buffer::Text(text)) => Some(Param::Text(text)),
            (Construct::Injection, Buffer::Text(index)) => {
                index.parse().ok().map(Param::Injection)
            }
            (Construct::Comparator, Buffer::Nodes(nodes)) => reduce_comparator(nodes),
            (Construct::Params, Buffer::Nodes(params)) => self.reduce_params(params),
            (Construct::Entry, Buffer::Nodes(nodes)) => reduce_entry(nodes),
            _ => None,
        };

        match node {
            Some(node) => self.splice(node),
            None => false,
        }
    }

    /// Wrap the keyword preceding the parameter list in the parent frame
    fn reduce_params(&mut self, params: Vec<Param>) -> Option<Param> {
        let Some(Buffer::Nodes(parent)) = self.frames.last_mut().map(|frame| &mut frame.buffer)
        else {
            return None;
        };
        match parent.last() {
            Some(Param::Token(keyword)) if is_keyword(keyword.kind) => {}
            _ => return None,
        }
        match parent.pop() {
            Some(Param::Token(keyword)) => {
                Some(Param::Validator(ValidatorData::new(keyword.value, params)))
            }
            _ => None,
        }
    }

    fn splice(&mut self, node: Param) -> bool {
        match self.frames.last_mut().map(|frame| &mut frame.buffer) {
            Some(Buffer::Nodes(nodes)) => {
                nodes.push(node);
                true
            }
            _ => false,
        }
    }
}

/// `[operator, operand]` → comparison
fn reduce_comparator(nodes: Vec<Param>) -> Option<Param> {
    let mut nodes = nodes.into_iter();
    let op = match nodes.next()? {
        Param::Token(lexeme) if lexeme.kind == TokenKind::Operator => {
            CompareOp::from_symbol(&lexeme.value)?
        }
        _ => return None,
    };
    let operand = match nodes.next()? {
        Param::Token(lexeme) if lexeme.kind == TokenKind::Number => {
            Operand::Number(lexeme.value.parse().ok()?)
        }
        Param::Token(lexeme) if lexeme.kind == TokenKind::Identifier => {
            Operand::Field(lexeme.value)
        }
        // Bare keywords double as field names
        Param::Token(lexeme) if is_keyword(lexeme.kind) => Operand::Field(lexeme.value),
        Param::Text(text) => Operand::Text(text),
        Param::Injection(index) => Operand::Injection(index),
        _ => return None,
    };
    if nodes.next().is_some() {
        return None;
    }
    Some(Param::Comparison(Comparison { op, operand }))
}

/// Keyword or validator, then an optional `!` tag → one validator node
fn reduce_entry(nodes: Vec<Param>) -> Option<Param> {
    let mut nodes = nodes.into_iter();
    let mut data = match nodes.next()? {
        Param::Validator(data) => data,
        Param::Token(keyword) if is_keyword(keyword.kind) => {
            ValidatorData::new(keyword.value, Vec::new())
        }
        _ => return None,
    };

    match nodes.next() {
        None => {}
        Some(Param::Token(bang)) if bang.kind == TokenKind::Bang => {
            data.error = Some(match nodes.next()? {
                Param::Token(number) if number.kind == TokenKind::Number => {
                    ErrorTag::Positional(number.value.parse().ok()?)
                }
                Param::Text(text) => ErrorTag::Literal(text),
                _ => return None,
            });
        }
        Some(_) => return None,
    }

    if nodes.next().is_some() {
        return None;
    }
    Some(Param::Validator(data))
}

fn is_keyword(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Object
            | TokenKind::Array
            | TokenKind::Primitive
            | TokenKind::Compare
            | TokenKind::Length
            | TokenKind::Regex
            | TokenKind::Equality
            | TokenKind::OneOf
            | TokenKind::Define
            | TokenKind::Reference
            | TokenKind::ErrorSuffix
            | TokenKind::MetaSuffix
    )
}

/* ===================== Public API ===================== */

/// Derive the whole lexeme stream into the AST forest
pub fn interpret(lexemes: &[Lexeme]) -> Result<Vec<Param>, ParseError> {
    let mut context = ParseContext::new(lexemes);
    match context.derive(PROGRAM, 0) {
        Some(end) if end == lexemes.len() => Ok(context.into_forest()),
        end => {
            trace!(?end, total = lexemes.len(), "program did not consume all lexemes");
            Err(ParseError::Semantic)
        }
    }
}
