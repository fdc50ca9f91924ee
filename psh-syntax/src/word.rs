//! The Word AST (component C3): a structural representation of one command
//! argument as an ordered list of parts, each carrying its own quote context,
//! built directly from token metadata rather than by re-parsing strings.

use crate::ast::List;
use crate::source::Location;
use std::rc::Rc;

/// How a [`Word`] is written. Needed because the *syntax* of a word (what
/// quotes/backslashes appeared) is distinct from its quoted*ness*, which is a
/// derived, per-part property used by expansion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteChar {
    Single,
    Double,
}

/// Which special parameter an unbraced or braced parameter expansion refers
/// to, precomputed the way the teacher's `ParamType`/`SpecialParam` is, so
/// expansion never has to re-examine the name string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpecialParam {
    At,
    Asterisk,
    Number,
    Question,
    Hyphen,
    Dollar,
    Exclamation,
    Zero,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamType {
    Variable,
    Special(SpecialParam),
    Positional(usize),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    pub id: String,
    pub r#type: ParamType,
}

/// `name[subscript]` on an array parameter, or the whole-array forms `[@]`
/// and `[*]`.
#[derive(Clone, Debug, PartialEq)]
pub enum Subscript {
    All,      // [@]
    Joined,   // [*]
    Index(Box<Word>), // an arithmetic expression word, e.g. arr[i+1]
}

/// `!` prefix on a braced parameter expansion: `${!name}` (indirection),
/// `${!name[@]}` (indices) or `${!name@}` (key list).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Indirection {
    None,
    NameRef,
    Indices,
    Keys,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchType {
    Alter,   // +
    Default, // -
    Assign,  // =
    Error,   // ?
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchCondition {
    Unset,
    UnsetOrEmpty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Switch {
    pub r#type: SwitchType,
    pub condition: SwitchCondition,
    pub word: Word,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrimSide {
    Prefix,
    Suffix,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrimLength {
    Shortest,
    Longest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trim {
    pub side: TrimSide,
    pub length: TrimLength,
    pub pattern: Word,
}

/// `${var/pattern/replacement}` family.
#[derive(Clone, Debug, PartialEq)]
pub struct Replace {
    pub pattern: Word,
    pub replacement: Option<Word>,
    /// `//` replace all occurrences instead of just the first.
    pub all: bool,
    /// `/#` anchor the match at the beginning of the value.
    pub anchor_start: bool,
    /// `/%` anchor the match at the end of the value.
    pub anchor_end: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseOp {
    /// `^` first matching character to uppercase
    FirstUpper,
    /// `^^` all matching characters to uppercase
    AllUpper,
    /// `,` first matching character to lowercase
    FirstLower,
    /// `,,` all matching characters to lowercase
    AllLower,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseConv {
    pub op: CaseOp,
    /// Optional glob pattern restricting which characters are affected.
    pub pattern: Option<Word>,
}

/// Substring extraction `${var:offset[:length]}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Substring {
    pub offset: Word,
    pub length: Option<Word>,
}

/// Attribute that modifies a braced parameter expansion. Earliest-position
/// matching in the lexer (§4.3) decides which of these a given `${...}`
/// parses to, trying the operator table in the fixed order
/// `{:-, :=, :?, :+, ##, #, %%, %, ^^, ^, ,,, ,, /#, /%, //, /, :}` against
/// the text following the (already-parsed) subscript.
#[derive(Clone, Debug, PartialEq)]
pub enum Modifier {
    None,
    /// `${#name}`
    Length,
    Switch(Switch),
    Trim(Trim),
    Replace(Replace),
    CaseConv(CaseConv),
    Substring(Substring),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterExpansion {
    pub param: Param,
    pub subscript: Option<Subscript>,
    pub indirection: Indirection,
    pub modifier: Modifier,
    pub location: Location,
}

/// Element of a backslash-quoted span inside backquote command substitution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackquoteUnit {
    Literal(char),
    Backslashed(char),
}

/// One constituent of a [`Word`], each independently tracking whether *this*
/// sub-span was quoted at the source (§3 invariant: a word may mix quoted
/// and unquoted parts, e.g. `foo"$x"bar`).
#[derive(Clone, Debug, PartialEq)]
pub enum WordPart {
    Literal { text: String, quoted: bool, quote_char: Option<QuoteChar> },
    VariableExpansion { param: Param, quoted: bool, quote_char: Option<QuoteChar>, location: Location },
    ParameterExpansion { expansion: ParameterExpansion, quoted: bool, quote_char: Option<QuoteChar> },
    /// `$(...)`; `backquoted` distinguishes the `` `...` `` spelling, which
    /// additionally needs backslash-unescaping of its raw text before
    /// re-tokenization.
    CommandSubstitution { ast: Rc<List>, quoted: bool, quote_char: Option<QuoteChar>, backquoted: bool },
    ArithmeticExpansion { expr_text: String, quoted: bool, quote_char: Option<QuoteChar> },
    /// `<(...)`/`>(...)`; never quoted per spec.
    ProcessSubstitution { direction: ProcessSubstDirection, ast: Rc<List> },
    /// Only produced when adjacency rules allow (word head, or after `=`/`:`
    /// in an assignment value).
    TildeExpansion { user: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessSubstDirection {
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Word {
    pub parts: Vec<WordPart>,
    pub location: Location,
}

impl Word {
    pub fn new(parts: Vec<WordPart>, location: Location) -> Self {
        Word { parts, location }
    }

    /// A word is quoted if every part that carries content is quoted; a bare
    /// literal backslash escape counts as quoting too.
    pub fn is_quoted(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(WordPart::is_quoted_part)
    }

    /// True if the word is exactly one unquoted literal part (used by the
    /// parser to recognize keywords and assignment names).
    pub fn is_unquoted_literal(&self) -> bool {
        matches!(
            self.parts.as_slice(),
            [WordPart::Literal { quoted: false, .. }]
        )
    }

    pub fn has_expansion_parts(&self) -> bool {
        self.parts.iter().any(|p| !matches!(p, WordPart::Literal { .. }))
    }

    pub fn has_unquoted_expansion(&self) -> bool {
        self.parts
            .iter()
            .any(|p| !matches!(p, WordPart::Literal { .. }) && !p.is_quoted_part())
    }

    /// Returns the word's text if it is composed entirely of unquoted
    /// literal parts (used to recognize keywords without allocating when
    /// there is only one part, and to reject `"FOO"=bar` as an assignment).
    pub fn as_literal(&self) -> Option<String> {
        if self.parts.iter().any(|p| !matches!(p, WordPart::Literal { quoted: false, .. })) {
            return None;
        }
        let mut s = String::new();
        for p in &self.parts {
            if let WordPart::Literal { text, .. } = p {
                s.push_str(text);
            }
        }
        Some(s)
    }
}

impl WordPart {
    pub fn is_quoted_part(&self) -> bool {
        match self {
            WordPart::Literal { quoted, .. } => *quoted,
            WordPart::VariableExpansion { quoted, .. } => *quoted,
            WordPart::ParameterExpansion { quoted, .. } => *quoted,
            WordPart::CommandSubstitution { quoted, .. } => *quoted,
            WordPart::ArithmeticExpansion { quoted, .. } => *quoted,
            WordPart::ProcessSubstitution { .. } => false,
            WordPart::TildeExpansion { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_loc() -> Location {
        Location::dummy("x")
    }

    #[test]
    fn quote_fidelity_for_all_quoted_parts() {
        let w = Word::new(
            vec![WordPart::Literal { text: "a b".into(), quoted: true, quote_char: Some(QuoteChar::Double) }],
            dummy_loc(),
        );
        assert!(w.is_quoted());
        assert!(!w.has_unquoted_expansion());
    }

    #[test]
    fn mixed_quoting_is_not_fully_quoted() {
        let w = Word::new(
            vec![
                WordPart::Literal { text: "foo".into(), quoted: false, quote_char: None },
                WordPart::VariableExpansion {
                    param: Param { id: "x".into(), r#type: ParamType::Variable },
                    quoted: true,
                    quote_char: Some(QuoteChar::Double),
                    location: dummy_loc(),
                },
            ],
            dummy_loc(),
        );
        assert!(!w.is_quoted());
        assert!(w.has_expansion_parts());
        assert!(!w.has_unquoted_expansion());
    }
}
