//! Grammar table for the schema DSL
//!
//! Pure data: one entry per rule, indexed by the constants below. The
//! interpreter walks it against the lexeme stream.

use super::tokenizer::TokenKind::{self, *};

pub type RuleId = usize;

/// One element of a rule body
#[derive(Debug, Clone, Copy)]
pub enum Item {
    /// Match one lexeme of this kind
    Token(TokenKind),
    /// Derive another rule
    Rule(RuleId),
    /// Ordered choice: first candidate sequence that derives wins
    Choice(&'static [&'static [Item]]),
    /// Zero or more repetitions of a sequence
    Repeat(&'static [Item]),
}

/// Accumulation frame a rule opens while it is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Comparator,
    Injection,
    Text,
    Params,
    Entry,
}

#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub construct: Option<Construct>,
    pub items: &'static [Item],
}

use self::Item::{Choice, Repeat, Rule as Ref, Token};

pub const PROGRAM: RuleId = 0;
pub const SUFFIX: RuleId = 1;
pub const SUFFIX_ARGS: RuleId = 2;
pub const CHAIN: RuleId = 3;
pub const ENTRY: RuleId = 4;
pub const ERROR_TAG: RuleId = 5;
pub const VALIDATOR: RuleId = 6;
pub const OBJECT_PARAMS: RuleId = 7;
pub const FIELD: RuleId = 8;
pub const ARRAY_PARAMS: RuleId = 9;
pub const COMPARE_PARAMS: RuleId = 10;
pub const COMPARATOR: RuleId = 11;
pub const INJECTION: RuleId = 12;
pub const STRING: RuleId = 13;
pub const REGEX_PARAMS: RuleId = 14;
pub const VALUE_PARAMS: RuleId = 15;
pub const LIST_PARAMS: RuleId = 16;
pub const VALUE: RuleId = 17;
pub const DEFINE_PARAMS: RuleId = 18;
pub const REFERENCE_PARAMS: RuleId = 19;

/// A field name is an identifier or quoted text. Bare long keywords are
/// accepted too so fields like `date` need no quoting.
const FIELD_NAME: &[&[Item]] = &[
    &[Token(Identifier)],
    &[Ref(STRING)],
    &[Token(Constant)],
    &[Token(Primitive)],
    &[Token(Object)],
    &[Token(Array)],
    &[Token(Compare)],
    &[Token(Length)],
    &[Token(Regex)],
    &[Token(Equality)],
    &[Token(OneOf)],
];

pub static RULES: [Rule; 20] = [
    // PROGRAM = CHAIN SUFFIX*
    Rule {
        name: "program",
        construct: None,
        items: &[Ref(CHAIN), Repeat(&[Ref(SUFFIX)])],
    },
    // SUFFIX = <Entry> ( ErrorSuffix SUFFIX_ARGS | ErrorSuffix | MetaSuffix )
    Rule {
        name: "suffix",
        construct: Some(Construct::Entry),
        items: &[Choice(&[
            &[Token(ErrorSuffix), Ref(SUFFIX_ARGS)],
            &[Token(ErrorSuffix)],
            &[Token(MetaSuffix)],
        ])],
    },
    // SUFFIX_ARGS = <Params> "(" INJECTION ")"
    Rule {
        name: "suffix_args",
        construct: Some(Construct::Params),
        items: &[Token(LParen), Ref(INJECTION), Token(RParen)],
    },
    // CHAIN = ENTRY ( ":" ENTRY | ENTRY )*
    Rule {
        name: "chain",
        construct: None,
        items: &[
            Ref(ENTRY),
            Repeat(&[Choice(&[&[Token(Colon), Ref(ENTRY)], &[Ref(ENTRY)]])]),
        ],
    },
    // ENTRY = <Entry> VALIDATOR ERROR_TAG?
    Rule {
        name: "entry",
        construct: Some(Construct::Entry),
        items: &[Ref(VALIDATOR), Choice(&[&[Ref(ERROR_TAG)], &[]])],
    },
    // ERROR_TAG = "!" Number | "!" STRING
    Rule {
        name: "error_tag",
        construct: None,
        items: &[Token(Bang), Choice(&[&[Token(Number)], &[Ref(STRING)]])],
    },
    Rule {
        name: "validator",
        construct: None,
        items: &[Choice(&[
            &[Token(Primitive)],
            &[Token(Object), Ref(OBJECT_PARAMS)],
            &[Token(Object)],
            &[Token(Array), Ref(ARRAY_PARAMS)],
            &[Token(Array)],
            &[Token(Compare), Ref(COMPARE_PARAMS)],
            &[Token(Length), Ref(COMPARE_PARAMS)],
            &[Token(Regex), Ref(REGEX_PARAMS)],
            &[Token(Equality), Ref(VALUE_PARAMS)],
            &[Token(OneOf), Ref(LIST_PARAMS)],
            &[Token(Define), Ref(DEFINE_PARAMS)],
            &[Token(Reference), Ref(REFERENCE_PARAMS)],
        ])],
    },
    // OBJECT_PARAMS = <Params> "(" ( FIELD ( "," FIELD )* ","? )? ")"
    Rule {
        name: "object_params",
        construct: Some(Construct::Params),
        items: &[
            Token(LParen),
            Choice(&[
                &[
                    Ref(FIELD),
                    Repeat(&[Token(Comma), Ref(FIELD)]),
                    Choice(&[&[Token(Comma)], &[]]),
                ],
                &[],
            ]),
            Token(RParen),
        ],
    },
    // FIELD = NAME ":"? CHAIN
    Rule {
        name: "field",
        construct: None,
        items: &[
            Choice(FIELD_NAME),
            Choice(&[&[Token(Colon)], &[]]),
            Ref(CHAIN),
        ],
    },
    // ARRAY_PARAMS = <Params> "(" CHAIN? ")"
    Rule {
        name: "array_params",
        construct: Some(Construct::Params),
        items: &[Token(LParen), Choice(&[&[Ref(CHAIN)], &[]]), Token(RParen)],
    },
    // COMPARE_PARAMS = <Params> "(" COMPARATOR ")"
    Rule {
        name: "compare_params",
        construct: Some(Construct::Params),
        items: &[Token(LParen), Ref(COMPARATOR), Token(RParen)],
    },
    // COMPARATOR = <Comparator> Operator ( Number | STRING | INJECTION | Identifier | keyword )
    // A bare keyword names a field, as in FIELD_NAME.
    Rule {
        name: "comparator",
        construct: Some(Construct::Comparator),
        items: &[
            Token(Operator),
            Choice(&[
                &[Token(Number)],
                &[Ref(STRING)],
                &[Ref(INJECTION)],
                &[Token(Identifier)],
                &[Token(Primitive)],
                &[Token(Object)],
                &[Token(Array)],
                &[Token(Compare)],
                &[Token(Length)],
                &[Token(Regex)],
                &[Token(Equality)],
                &[Token(OneOf)],
            ]),
        ],
    },
    // INJECTION = <Injection> ( "$" Number | "{" Number "}" )
    Rule {
        name: "injection",
        construct: Some(Construct::Injection),
        items: &[Choice(&[
            &[Token(Dollar), Token(Number)],
            &[Token(LBrace), Token(Number), Token(RBrace)],
        ])],
    },
    // STRING = <Text> Quote Text* Quote
    Rule {
        name: "string",
        construct: Some(Construct::Text),
        items: &[Token(Quote), Repeat(&[Token(Text)]), Token(Quote)],
    },
    Rule {
        name: "regex_params",
        construct: Some(Construct::Params),
        items: &[Token(LParen), Ref(STRING), Token(RParen)],
    },
    Rule {
        name: "value_params",
        construct: Some(Construct::Params),
        items: &[Token(LParen), Ref(VALUE), Token(RParen)],
    },
    Rule {
        name: "list_params",
        construct: Some(Construct::Params),
        items: &[
            Token(LParen),
            Ref(VALUE),
            Repeat(&[Token(Comma), Ref(VALUE)]),
            Token(RParen),
        ],
    },
    // VALUE = Number | Constant | STRING | INJECTION
    Rule {
        name: "value",
        construct: None,
        items: &[Choice(&[
            &[Token(Number)],
            &[Token(Constant)],
            &[Ref(STRING)],
            &[Ref(INJECTION)],
        ])],
    },
    // DEFINE_PARAMS = <Params> Identifier "(" CHAIN ")"
    Rule {
        name: "define_params",
        construct: Some(Construct::Params),
        items: &[Token(Identifier), Token(LParen), Ref(CHAIN), Token(RParen)],
    },
    Rule {
        name: "reference_params",
        construct: Some(Construct::Params),
        items: &[Token(Identifier)],
    },
];
