//! Token types produced by the lexer (component C2).

use crate::source::Location;
use crate::word::Word;
use std::str::FromStr;
use strum::EnumString;

/// Reserved words, recognized only in command position by the parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    If,
    Then,
    Else,
    Elif,
    Fi,
    While,
    Until,
    Do,
    Done,
    For,
    In,
    Case,
    Esac,
    Select,
    Function,
    #[strum(serialize = "!")]
    Bang,
    Break,
    Continue,
    Return,
}

/// Fixed operator table, matched longest-first by the lexer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    Pipe,          // |
    PipeAmp,       // |&
    OrOr,          // ||
    Amp,           // &
    AmpAmp,        // &&
    Semi,          // ;
    SemiSemi,      // ;;
    SemiAmp,       // ;&
    SemiSemiAmp,   // ;;&
    Less,          // <
    LessLess,      // <<
    LessLessDash,  // <<-
    LessLessLess,  // <<<
    LessAmp,       // <&
    LessGreater,   // <>
    Greater,       // >
    GreaterGreater,// >>
    GreaterAmp,    // >&
    GreaterPipe,   // >|
    LParen,        // (
    RParen,        // )
    LBrace,        // {
    RBrace,        // }
    DoubleLParen,  // ((
    DoubleRParen,  // ))
    Newline,
}

// `[[`/`]]` are not lexed as operators: like `{`, they are ordinary words
// that the parser recognizes as reserved only in command position. `$(`,
// `${`, `$((` and backquote are never top-level operators either — they only
// ever occur embedded in a word, so the word-scanning routine (not the
// top-level operator recognizer) handles them directly.

/// Ordered longest-match table of operator lexemes. Entries with the same
/// first character are tried longest-first, so `<<-` beats `<<` beats `<`.
pub const OPERATOR_TABLE: &[(&str, Operator)] = &[
    ("<<<", Operator::LessLessLess),
    ("<<-", Operator::LessLessDash),
    ("<<", Operator::LessLess),
    ("<>", Operator::LessGreater),
    ("<&", Operator::LessAmp),
    ("<", Operator::Less),
    (">>", Operator::GreaterGreater),
    (">&", Operator::GreaterAmp),
    (">|", Operator::GreaterPipe),
    (">", Operator::Greater),
    ("&&", Operator::AmpAmp),
    ("&", Operator::Amp),
    (";;&", Operator::SemiSemiAmp),
    (";;", Operator::SemiSemi),
    (";&", Operator::SemiAmp),
    (";", Operator::Semi),
    ("||", Operator::OrOr),
    ("|&", Operator::PipeAmp),
    ("|", Operator::Pipe),
    ("((", Operator::DoubleLParen),
    ("(", Operator::LParen),
    ("))", Operator::DoubleRParen),
    (")", Operator::RParen),
    ("{", Operator::LBrace),
    ("}", Operator::RBrace),
];

impl Operator {
    /// True for the operators that, after whitespace handling, can never
    /// start a word (used by the composite-word adjacency logic).
    pub fn is_separator(self) -> bool {
        !matches!(self, Operator::LParen | Operator::LBrace)
    }
}

pub use crate::word::QuoteChar as QuoteKind;

/// Coarse-grained token classification. The full ~80-tag POSIX lexical
/// taxonomy collapses into this many variants because most of the fine
/// distinctions (IO_NUMBER vs WORD vs a specific keyword) are recovered by
/// the parser from `kind`/`value`/`context` rather than needing their own
/// tag; this mirrors the teacher's `TokenId` design (`Token(Option<Keyword>)
/// | Operator(Operator) | IoNumber | EndOfInput`), generalized to carry the
/// extra expansion/heredoc metadata spec.md requires.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Word,
    KeywordCandidate(Keyword),
    Op(Operator),
    IoNumber,
    HeredocOp { dash: bool },
    Eof,
}

/// Semantic flags attached to a token for use by the parser and by
/// diagnostics; not consumed by the lexer itself.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Context {
    pub command_position: bool,
    pub test_expression: bool,
    pub case_pattern: bool,
}

/// Opaque handle linking a `<<`/`<<-` redirection to its body, collected
/// from subsequent physical lines after the rest of the logical line has
/// been tokenized (§4.2).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct HeredocKey(pub u32);

/// A single lexical token.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token (joined word units, as written).
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub location: Location,
    pub quote_kind: Option<QuoteKind>,
    /// The structural Word AST for this token, already built by the lexer's
    /// word-reading routine (present for `Word`, `IoNumber` and `HeredocOp`
    /// tokens; `None` for pure operators).
    pub word: Option<Word>,
    pub adjacent_to_previous: bool,
    pub heredoc_key: Option<HeredocKey>,
    pub context: Context,
}

impl Token {
    pub fn is_operator(&self, op: Operator) -> bool {
        matches!(&self.kind, TokenKind::Op(o) if *o == op)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::KeywordCandidate(k) => Some(*k),
            _ => None,
        }
    }
}

/// Tries to interpret a literal word as a reserved word. Only meaningful
/// when the parser is in command position (§4.2).
pub fn keyword_from_str(s: &str) -> Option<Keyword> {
    Keyword::from_str(s).ok()
}
