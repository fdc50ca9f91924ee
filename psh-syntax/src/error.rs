//! Lex and parse error types (§7 items 1 and 2).

use crate::source::Location;
use thiserror::Error;

/// Recoverable lexical errors (§4.2 "Failure modes").
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{}", self.message())]
#[non_exhaustive]
pub enum LexError {
    UnclosedSingleQuote { opening: Location },
    UnclosedDoubleQuote { opening: Location },
    UnclosedDollarSingleQuote { opening: Location },
    UnclosedParamExpansion { opening: Location },
    UnclosedCommandSubstitution { opening: Location },
    UnclosedBackquote { opening: Location },
    UnclosedArithmeticExpansion { opening: Location },
    UnclosedHeredoc { delimiter: String, redir_location: Location },
    InvalidOperatorGlob,
    IncompleteEscape,
}

impl LexError {
    fn message(&self) -> String {
        match self {
            LexError::UnclosedSingleQuote { .. } => "unterminated single-quoted string".into(),
            LexError::UnclosedDoubleQuote { .. } => "unterminated double-quoted string".into(),
            LexError::UnclosedDollarSingleQuote { .. } => "unterminated $'...' string".into(),
            LexError::UnclosedParamExpansion { .. } => "unterminated parameter expansion".into(),
            LexError::UnclosedCommandSubstitution { .. } => "unterminated command substitution".into(),
            LexError::UnclosedBackquote { .. } => "unterminated backquoted command substitution".into(),
            LexError::UnclosedArithmeticExpansion { .. } => "unterminated arithmetic expansion".into(),
            LexError::UnclosedHeredoc { delimiter, .. } => {
                format!("unterminated here-document (expected delimiter `{delimiter}`)")
            }
            LexError::InvalidOperatorGlob => "invalid extended glob operator".into(),
            LexError::IncompleteEscape => "backslash at end of input".into(),
        }
    }
}

/// Severity recorded alongside a [`ParseError`], matching §4.4's
/// `ParseError { message, position, suggestion?, severity }`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// Parser-level syntax errors. One variant per distinguishable malformed
/// construct, in the teacher's style of attaching the opening-token location
/// so diagnostics can point at both ends of an unclosed construct.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{}", self.message())]
#[non_exhaustive]
pub enum SyntaxError {
    Lex(LexError),
    UnexpectedToken,
    MissingSeparator,
    InvalidCommandToken,
    MissingRedirOperand,
    EmptyGrouping { opening: Location },
    UnclosedGrouping { opening: Location },
    UnclosedSubshell { opening: Location },
    EmptySubshell { opening: Location },
    MissingDo { opening: Location },
    UnclosedDoClause { opening: Location },
    EmptyLoopBody { opening: Location },
    MissingForName,
    InvalidForName,
    MissingInOrDo,
    MissingThen { opening: Location },
    EmptyCondition { opening: Location },
    EmptyBody { opening: Location },
    UnclosedIf { opening: Location },
    MissingCaseSubject,
    MissingIn { opening: Location },
    UnclosedCase { opening: Location },
    MissingCaseItemCloseParen,
    UnclosedTestExpr { opening: Location },
    EmptyTestExpr { opening: Location },
    MissingFunctionBody,
    InvalidFunctionName,
    MissingArithClose { opening: Location },
    FdOutOfRange,
}

impl SyntaxError {
    fn message(&self) -> String {
        match self {
            SyntaxError::Lex(e) => e.to_string(),
            SyntaxError::UnexpectedToken => "unexpected token".into(),
            SyntaxError::MissingSeparator => "missing `;` or newline before next command".into(),
            SyntaxError::InvalidCommandToken => "a command cannot start with this token".into(),
            SyntaxError::MissingRedirOperand => "redirection operator is missing its operand".into(),
            SyntaxError::EmptyGrouping { .. } => "a brace group must contain at least one command".into(),
            SyntaxError::UnclosedGrouping { .. } => "`{` is not matched by a `}`".into(),
            SyntaxError::UnclosedSubshell { .. } => "`(` is not matched by a `)`".into(),
            SyntaxError::EmptySubshell { .. } => "a subshell must contain at least one command".into(),
            SyntaxError::MissingDo { .. } => "expected `do` after the loop condition".into(),
            SyntaxError::UnclosedDoClause { .. } => "`do` is not matched by a `done`".into(),
            SyntaxError::EmptyLoopBody { .. } => "a loop body must contain at least one command".into(),
            SyntaxError::MissingForName => "`for` is missing the loop variable name".into(),
            SyntaxError::InvalidForName => "the `for` loop variable name is not a valid word".into(),
            SyntaxError::MissingInOrDo => "expected `in` or `do` after the `for`/`select` name".into(),
            SyntaxError::MissingThen { .. } => "expected `;` or newline before `then`".into(),
            SyntaxError::EmptyCondition { .. } => "condition must contain at least one command".into(),
            SyntaxError::EmptyBody { .. } => "body must contain at least one command".into(),
            SyntaxError::UnclosedIf { .. } => "`if` is not matched by a `fi`".into(),
            SyntaxError::MissingCaseSubject => "`case` is missing its subject word".into(),
            SyntaxError::MissingIn { .. } => "expected `in` after the `case` subject".into(),
            SyntaxError::UnclosedCase { .. } => "`case` is not matched by an `esac`".into(),
            SyntaxError::MissingCaseItemCloseParen => "expected `)` after the case pattern list".into(),
            SyntaxError::UnclosedTestExpr { .. } => "`[[` is not matched by a `]]`".into(),
            SyntaxError::EmptyTestExpr { .. } => "`[[ ]]` must contain an expression".into(),
            SyntaxError::MissingFunctionBody => "function definition is missing its body".into(),
            SyntaxError::InvalidFunctionName => "invalid function name".into(),
            SyntaxError::MissingArithClose { .. } => "`((` is not matched by `))`".into(),
            SyntaxError::FdOutOfRange => "file descriptor is out of range".into(),
        }
    }
}

/// A single parser diagnostic: what went wrong, where, how bad, and
/// (optionally) a catalog suggestion (§4.4 "collect" mode).
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub error: SyntaxError,
    pub location: Location,
    pub suggestion: Option<&'static str>,
    pub severity: Severity,
}

impl ParseError {
    pub fn fatal(error: SyntaxError, location: Location) -> Self {
        ParseError { error, location, suggestion: None, severity: Severity::Fatal }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(s) = self.suggestion {
            write!(f, "\n  help: {s}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

pub type Result<T> = std::result::Result<T, ParseError>;
