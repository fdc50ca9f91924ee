// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2022 WATANABE Yuki
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Arithmetic expansion for `$((...))` and `((...))`.
//!
//! The expression grammar follows C operator precedence: unary `+ - ! ~`
//! and prefix/postfix `++ --`, then the binary ladder `** * / % + -
//! << >> < <= > >= == != & ^ | && ||`, then the ternary `?:`, assignment
//! (`=` and its compound forms), and finally the comma operator. Integers
//! are 64-bit signed and arithmetic overflow is always an error rather
//! than silent wraparound, except for shifts, which wrap the shift
//! distance modulo 64 as the CPU would.

use std::fmt::Display;
use std::iter::Peekable;
use std::ops::Range;

mod token;

use token::Operator;
pub use token::{Term, Token, TokenError, TokenValue, Tokens, Value};

/// Cause of an arithmetic expansion error
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCause<E> {
    /// Error in tokenization
    TokenError(TokenError),
    /// A variable value that is not a valid number
    InvalidVariableValue(String),
    /// Result out of bounds
    Overflow,
    /// Division by zero
    DivisionByZero,
    /// `**` with a negative exponent or an exponent greater than 63
    InvalidExponent,
    /// Assignment or `++`/`--` applied to something other than a variable
    NotAssignable,
    /// Malformed expression (unmatched parenthesis, missing `:` in a
    /// ternary, an operator with no operand, trailing tokens, ...)
    SyntaxError(&'static str),
    /// Error assigning a variable value.
    AssignVariableError(E),
}

impl<E: Display> Display for ErrorCause<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorCause::*;
        match self {
            TokenError(e) => e.fmt(f),
            InvalidVariableValue(v) => {
                write!(f, "variable value {:?} cannot be parsed as a number", v)
            }
            Overflow => "overflow".fmt(f),
            DivisionByZero => "division by zero".fmt(f),
            InvalidExponent => "exponent must be between 0 and 63".fmt(f),
            NotAssignable => "assignment target is not a variable".fmt(f),
            SyntaxError(message) => message.fmt(f),
            AssignVariableError(e) => e.fmt(f),
        }
    }
}

impl<E> From<TokenError> for ErrorCause<E> {
    fn from(e: TokenError) -> Self {
        ErrorCause::TokenError(e)
    }
}

/// Description of an error that occurred during expansion
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Error<E> {
    /// Cause of the error
    pub cause: ErrorCause<E>,
    /// Range of the substring in the evaluated expression string where the error occurred
    pub location: Range<usize>,
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.cause.fmt(f)
    }
}

impl<E: std::fmt::Debug + Display> std::error::Error for Error<E> {}

impl<E> From<token::Error> for Error<E> {
    fn from(e: token::Error) -> Self {
        Error {
            cause: e.cause.into(),
            location: e.location,
        }
    }
}

/// The error type returned by [`eval`], parameterized by the error the
/// host shell's [`Env::assign_variable`] may raise.
pub type ShellArithmeticError<E> = Error<E>;

mod env;

pub use env::Env;

/// Expands a variable to its value.
fn expand_variable<E: Env>(
    name: &str,
    location: &Range<usize>,
    env: &E,
) -> Result<Value, Error<E::AssignVariableError>> {
    match env.get_variable(name) {
        Ok(Some(value)) => match value.parse() {
            Ok(number) => Ok(Value::Integer(number)),
            Err(_) => Err(Error {
                cause: ErrorCause::InvalidVariableValue(value.to_string()),
                location: location.clone(),
            }),
        },
        Ok(None) => Ok(Value::Integer(0)),
        Err(_) => Ok(Value::Integer(0)),
    }
}

/// Specifies the behavior of parse functions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    /// Evaluate the (sub)expression parsed.
    Eval,
    /// Just parse a (sub)expression; don't evaluate. Used for the untaken
    /// branch of `&&`, `||`, and `?:` so side effects (assignments) there
    /// don't happen, matching short-circuit evaluation.
    Skip,
}

impl Term<'_> {
    /// Evaluate the term into a value.
    fn into_value<E: Env>(
        self,
        mode: Mode,
        env: &E,
    ) -> Result<Value, Error<E::AssignVariableError>> {
        match mode {
            Mode::Eval => match self {
                Term::Value(value) => Ok(value),
                Term::Variable { name, location } => expand_variable(name, &location, env),
            },
            Mode::Skip => Ok(Value::Integer(0)),
        }
    }
}

fn unwrap_or_overflow<T, E>(result: Option<T>, location: Range<usize>) -> Result<T, Error<E>> {
    result.ok_or(Error {
        cause: ErrorCause::Overflow,
        location,
    })
}

fn syntax_error<T, E>(message: &'static str, location: Range<usize>) -> Result<T, Error<E>> {
    Err(Error {
        cause: ErrorCause::SyntaxError(message),
        location,
    })
}

fn not_assignable<T, E>(location: Range<usize>) -> Result<T, Error<E>> {
    Err(Error {
        cause: ErrorCause::NotAssignable,
        location,
    })
}

impl Operator {
    /// Binding power used by [`parse_binary`]'s precedence-climbing loop.
    /// Higher binds tighter. Operators that never appear as an infix
    /// operator in that loop (parentheses, unary-only operators) return 0,
    /// which is below the loop's minimum precedence of 1 and so always
    /// stops the loop rather than being consumed by it.
    fn precedence(self) -> u8 {
        use Operator::*;
        match self {
            Comma => 1,
            Equal | PlusEqual | MinusEqual | AsteriskEqual | SlashEqual | PercentEqual
            | LessLessEqual | GreaterGreaterEqual | AndEqual | CaretEqual | BarEqual => 2,
            Question | Colon => 3,
            BarBar => 4,
            AndAnd => 5,
            Bar => 6,
            Caret => 7,
            And => 8,
            EqualEqual | BangEqual => 9,
            Less | LessEqual | Greater | GreaterEqual => 10,
            LessLess | GreaterGreater => 11,
            Plus | Minus => 12,
            Asterisk | Slash | Percent => 13,
            AsteriskAsterisk => 14,
            Tilde | Bang | OpenParen | CloseParen | PlusPlus | MinusMinus => 0,
        }
    }

    /// Whether this operator groups right-to-left, so its right operand is
    /// parsed at the *same* precedence rather than one higher.
    fn is_right_assoc(self) -> bool {
        use Operator::*;
        matches!(
            self,
            Equal
                | PlusEqual
                | MinusEqual
                | AsteriskEqual
                | SlashEqual
                | PercentEqual
                | LessLessEqual
                | GreaterGreaterEqual
                | AndEqual
                | CaretEqual
                | BarEqual
                | AsteriskAsterisk
        )
    }

    /// The plain binary operator a compound-assignment operator applies
    /// before storing the result, e.g. `+=` applies `+`.
    fn compound_base(self) -> Option<Operator> {
        use Operator::*;
        Some(match self {
            PlusEqual => Plus,
            MinusEqual => Minus,
            AsteriskEqual => Asterisk,
            SlashEqual => Slash,
            PercentEqual => Percent,
            LessLessEqual => LessLess,
            GreaterGreaterEqual => GreaterGreater,
            AndEqual => And,
            CaretEqual => Caret,
            BarEqual => Bar,
            _ => return None,
        })
    }
}

/// Applies a binary operator that is not `=`, a compound assignment, or
/// `?:`/`,` (which need access to the parser state and so are handled
/// directly in [`parse_binary`]).
fn apply_binary<E>(
    op: Operator,
    lhs: Value,
    rhs: Value,
    location: Range<usize>,
) -> Result<Value, Error<E>> {
    let (Value::Integer(lhs), Value::Integer(rhs)) = (lhs, rhs);
    use Operator::*;
    Ok(match op {
        BarBar => Value::Integer((lhs != 0 || rhs != 0) as _),
        AndAnd => Value::Integer((lhs != 0 && rhs != 0) as _),
        Bar => Value::Integer(lhs | rhs),
        Caret => Value::Integer(lhs ^ rhs),
        And => Value::Integer(lhs & rhs),
        EqualEqual => Value::Integer((lhs == rhs) as _),
        BangEqual => Value::Integer((lhs != rhs) as _),
        Less => Value::Integer((lhs < rhs) as _),
        Greater => Value::Integer((lhs > rhs) as _),
        LessEqual => Value::Integer((lhs <= rhs) as _),
        GreaterEqual => Value::Integer((lhs >= rhs) as _),
        LessLess => {
            // Shift distance wraps modulo 64, like the CPU's shift instruction.
            let shift = (rhs as u64 % 64) as u32;
            Value::Integer(lhs.wrapping_shl(shift))
        }
        GreaterGreater => {
            let shift = (rhs as u64 % 64) as u32;
            Value::Integer(lhs.wrapping_shr(shift))
        }
        Plus => Value::Integer(unwrap_or_overflow(lhs.checked_add(rhs), location)?),
        Minus => Value::Integer(unwrap_or_overflow(lhs.checked_sub(rhs), location)?),
        Asterisk => Value::Integer(unwrap_or_overflow(lhs.checked_mul(rhs), location)?),
        Slash => {
            if rhs == 0 {
                return Err(Error {
                    cause: ErrorCause::DivisionByZero,
                    location,
                });
            }
            Value::Integer(unwrap_or_overflow(lhs.checked_div(rhs), location)?)
        }
        Percent => {
            if rhs == 0 {
                return Err(Error {
                    cause: ErrorCause::DivisionByZero,
                    location,
                });
            }
            Value::Integer(unwrap_or_overflow(lhs.checked_rem(rhs), location)?)
        }
        AsteriskAsterisk => {
            if rhs < 0 || rhs > 63 {
                return Err(Error {
                    cause: ErrorCause::InvalidExponent,
                    location,
                });
            }
            let mut result: i64 = 1;
            for _ in 0..rhs {
                result = unwrap_or_overflow(result.checked_mul(lhs), location.clone())?;
            }
            Value::Integer(result)
        }
        Equal | PlusEqual | MinusEqual | AsteriskEqual | SlashEqual | PercentEqual
        | LessLessEqual | GreaterGreaterEqual | AndEqual | CaretEqual | BarEqual | Question
        | Colon | Comma => {
            unreachable!("{op:?} is handled directly in parse_binary")
        }
        Tilde | Bang | OpenParen | CloseParen | PlusPlus | MinusMinus => {
            panic!("{op:?} is not a binary operator")
        }
    })
}

/// Applies `++` or `--` to a variable, assigning the new value back through
/// `env`. Returns the value the whole expression evaluates to: the new
/// value for a prefix operator, the old value for a postfix one.
fn apply_incr_decr<'a, E: Env>(
    term: Term<'a>,
    op: Operator,
    prefix: bool,
    mode: Mode,
    location: Range<usize>,
    env: &mut E,
) -> Result<Term<'a>, Error<E::AssignVariableError>> {
    let Term::Variable { name, .. } = term else {
        return not_assignable(location);
    };
    if mode == Mode::Skip {
        return Ok(Term::Value(Value::Integer(0)));
    }
    let Value::Integer(old) = expand_variable(name, &location, env)?;
    let delta = if op == Operator::PlusPlus { 1 } else { -1 };
    let new = unwrap_or_overflow(old.checked_add(delta), location.clone())?;
    env.assign_variable(name, new.to_string(), location.clone())
        .map_err(|e| Error {
            cause: ErrorCause::AssignVariableError(e),
            location,
        })?;
    Ok(Term::Value(Value::Integer(if prefix { new } else { old })))
}

/// Parses a leaf expression.
///
/// A leaf expression is a constant number, variable, or parenthesized
/// expression, optionally modified by a prefix or postfix unary operator.
fn parse_leaf<'a, E: Env>(
    tokens: &mut Peekable<Tokens<'a>>,
    mode: Mode,
    env: &mut E,
) -> Result<Term<'a>, Error<E::AssignVariableError>> {
    let mut term = match tokens.next().transpose()? {
        Some(Token {
            value: TokenValue::Term(term),
            ..
        }) => term,

        Some(Token {
            value: TokenValue::Operator(Operator::OpenParen),
            location: open_location,
        }) => {
            let inner = parse_binary(tokens, 1, mode, env)?;
            match tokens.next().transpose()? {
                Some(Token {
                    value: TokenValue::Operator(Operator::CloseParen),
                    ..
                }) => {}
                _ => return syntax_error("unmatched parenthesis", open_location),
            }
            inner
        }

        Some(Token {
            value: TokenValue::Operator(Operator::Plus),
            ..
        }) => Term::Value(parse_leaf(tokens, mode, env)?.into_value(mode, env)?),

        Some(Token {
            value: TokenValue::Operator(Operator::Minus),
            location,
        }) => {
            let Value::Integer(operand) = parse_leaf(tokens, mode, env)?.into_value(mode, env)?;
            let result = unwrap_or_overflow(operand.checked_neg(), location)?;
            Term::Value(Value::Integer(result))
        }

        Some(Token {
            value: TokenValue::Operator(Operator::Tilde),
            ..
        }) => {
            let Value::Integer(operand) = parse_leaf(tokens, mode, env)?.into_value(mode, env)?;
            Term::Value(Value::Integer(!operand))
        }

        Some(Token {
            value: TokenValue::Operator(Operator::Bang),
            ..
        }) => {
            let Value::Integer(operand) = parse_leaf(tokens, mode, env)?.into_value(mode, env)?;
            Term::Value(Value::Integer((operand == 0) as i64))
        }

        Some(Token {
            value: TokenValue::Operator(op @ (Operator::PlusPlus | Operator::MinusMinus)),
            location,
        }) => {
            let operand = parse_leaf(tokens, mode, env)?;
            apply_incr_decr(operand, op, true, mode, location, env)?
        }

        Some(Token {
            value: TokenValue::Operator(_),
            location,
        }) => return syntax_error("unexpected operator", location),

        None => return syntax_error("expected an operand, found the end of the expression", 0..0),
    };

    // Postfix ++/--
    while let Some(Ok(Token {
        value: TokenValue::Operator(op @ (Operator::PlusPlus | Operator::MinusMinus)),
        ..
    })) = tokens.peek()
    {
        let op = *op;
        let location = tokens.next().unwrap()?.location;
        term = apply_incr_decr(term, op, false, mode, location, env)?;
    }

    Ok(term)
}

/// Parses an expression that may contain binary operators, the ternary
/// `?:`, assignments, and the comma operator.
///
/// This function consumes operators with precedence equal to or greater
/// than the given minimum precedence, which must be greater than 0.
fn parse_binary<'a, E: Env>(
    tokens: &mut Peekable<Tokens<'a>>,
    min_precedence: u8,
    mode: Mode,
    env: &mut E,
) -> Result<Term<'a>, Error<E::AssignVariableError>> {
    let mut term = parse_leaf(tokens, mode, env)?;

    loop {
        let operator = match tokens.peek() {
            Some(Ok(Token {
                value: TokenValue::Operator(operator),
                ..
            })) => *operator,
            Some(Ok(_)) | None => break,
            Some(Err(_)) => return Err(tokens.next().unwrap().unwrap_err().into()),
        };

        let precedence = operator.precedence();
        if precedence == 0 || precedence < min_precedence {
            break;
        }

        let location = tokens.next().unwrap()?.location;
        let next_min_precedence = if operator.is_right_assoc() {
            precedence
        } else {
            precedence + 1
        };

        use Operator::*;
        match operator {
            Equal => match term {
                Term::Value(_) => return not_assignable(location),
                Term::Variable { name, .. } => {
                    let value =
                        parse_binary(tokens, next_min_precedence, mode, env)?.into_value(mode, env)?;
                    if mode == Mode::Eval {
                        env.assign_variable(name, value.to_string(), location.clone())
                            .map_err(|e| Error {
                                cause: ErrorCause::AssignVariableError(e),
                                location,
                            })?;
                    }
                    term = Term::Value(value);
                }
            },

            PlusEqual | MinusEqual | AsteriskEqual | SlashEqual | PercentEqual
            | LessLessEqual | GreaterGreaterEqual | AndEqual | CaretEqual | BarEqual => {
                let base_op = operator.compound_base().unwrap();
                match term {
                    Term::Value(_) => return not_assignable(location),
                    Term::Variable { name, location: var_location } => {
                        let rhs = parse_binary(tokens, next_min_precedence, mode, env)?
                            .into_value(mode, env)?;
                        if mode == Mode::Eval {
                            let lhs = expand_variable(name, &var_location, env)?;
                            let value = apply_binary(base_op, lhs, rhs, location.clone())?;
                            env.assign_variable(name, value.to_string(), location.clone())
                                .map_err(|e| Error {
                                    cause: ErrorCause::AssignVariableError(e),
                                    location,
                                })?;
                            term = Term::Value(value);
                        } else {
                            term = Term::Value(Value::Integer(0));
                        }
                    }
                }
            }

            Question => {
                let Value::Integer(cond) = term.into_value(mode, env)?;
                let take_then = mode == Mode::Eval && cond != 0;
                let then_mode = if mode == Mode::Eval && cond != 0 {
                    Mode::Eval
                } else {
                    Mode::Skip
                };
                // The "then" branch is parsed down to (but not including)
                // the comma operator, matching C's conditional-expression
                // grammar where the middle operand is a full assignment
                // expression.
                let then_term = parse_binary(tokens, 2, then_mode, env)?;

                match tokens.next().transpose()? {
                    Some(Token {
                        value: TokenValue::Operator(Operator::Colon),
                        ..
                    }) => {}
                    _ => return syntax_error("expected `:` in conditional expression", location),
                }

                let else_mode = if mode == Mode::Eval && cond == 0 {
                    Mode::Eval
                } else {
                    Mode::Skip
                };
                // The "else" branch recurses at the ternary's own
                // precedence, so `?:` nests right-associatively.
                let else_term = parse_binary(tokens, precedence, else_mode, env)?;

                term = Term::Value(if mode != Mode::Eval {
                    Value::Integer(0)
                } else if take_then {
                    then_term.into_value(Mode::Eval, env)?
                } else {
                    else_term.into_value(Mode::Eval, env)?
                });
            }

            BarBar | AndAnd => {
                let Value::Integer(lhs) = term.into_value(mode, env)?;
                let skip_rhs = match operator {
                    BarBar => lhs != 0,
                    AndAnd => lhs == 0,
                    _ => unreachable!(),
                };
                let rhs_mode = if mode == Mode::Eval && skip_rhs {
                    Mode::Skip
                } else {
                    mode
                };
                let rhs = parse_binary(tokens, next_min_precedence, rhs_mode, env)?
                    .into_value(rhs_mode, env)?;
                let value = if mode == Mode::Eval {
                    apply_binary(operator, Value::Integer(lhs), rhs, location)?
                } else {
                    Value::Integer(0)
                };
                term = Term::Value(value);
            }

            Comma => {
                // Evaluated for side effects only; the comma operator's
                // value is its right operand.
                term.into_value(mode, env)?;
                term = parse_binary(tokens, next_min_precedence, mode, env)?;
            }

            Bar | Caret | And | EqualEqual | BangEqual | Less | LessEqual | Greater
            | GreaterEqual | LessLess | GreaterGreater | Plus | Minus | Asterisk | Slash
            | Percent | AsteriskAsterisk => {
                let rhs = parse_binary(tokens, next_min_precedence, mode, env)?;
                let (lhs, rhs) = (term.into_value(mode, env)?, rhs.into_value(mode, env)?);
                let value = if mode == Mode::Eval {
                    apply_binary(operator, lhs, rhs, location)?
                } else {
                    Value::Integer(0)
                };
                term = Term::Value(value);
            }

            Colon => return syntax_error("`:` without a matching `?`", location),
            Tilde | Bang | OpenParen | PlusPlus | MinusMinus => unreachable!(
                "precedence() returns 0 for {operator:?}, so the loop should have stopped"
            ),
            CloseParen => {
                return syntax_error("unmatched closing parenthesis", location);
            }
        }
    }

    Ok(term)
}

/// Performs arithmetic expansion, evaluating `expression` in the context of
/// `env` and returning its final integer value.
///
/// `env` provides read/write access to shell variables for bare variable
/// references and assignment operators; see [`Env`].
pub fn eval<E: Env>(
    expression: &str,
    env: &mut E,
) -> Result<Value, ShellArithmeticError<E::AssignVariableError>> {
    let mut tokens = Tokens::new(expression).peekable();
    let term = parse_binary(&mut tokens, 1, Mode::Eval, env)?;
    match tokens.next().transpose()? {
        Some(Token {
            value: TokenValue::EndOfInput,
            ..
        })
        | None => {}
        Some(Token { location, .. }) => {
            return syntax_error("unexpected trailing token", location);
        }
    }
    term.into_value(Mode::Eval, env)
}
