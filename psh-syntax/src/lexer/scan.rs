//! Balanced-scan helpers: single/double quotes, `$'...'`, backquoted and
//! `$(...)`/`$((...))` substitutions, and the `${...}` dispatch. Each scanner
//! assumes its opening delimiter has already been consumed by the caller.

use crate::error::{LexError, ParseError, SyntaxError};
use crate::source::{Location, Source};
use crate::word::{Param, ParamType, QuoteChar, SpecialParam, WordPart};
use std::rc::Rc;

fn is_special_param_char(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '-' | '$' | '!')
}

fn special_param(c: char) -> Param {
    use SpecialParam::*;
    let (id, sp) = match c {
        '@' => ("@", At),
        '*' => ("*", Asterisk),
        '#' => ("#", Number),
        '?' => ("?", Question),
        '-' => ("-", Hyphen),
        '$' => ("$", Dollar),
        '!' => ("!", Exclamation),
        _ => unreachable!("not a special parameter character"),
    };
    Param { id: id.to_owned(), r#type: ParamType::Special(sp) }
}

impl super::Lexer {
    pub(crate) fn scan_single_quote(&mut self, opening: Location) -> Result<String, ParseError> {
        let mut s = String::new();
        loop {
            match self.peek_char()? {
                None => {
                    return Err(ParseError::fatal(
                        SyntaxError::Lex(LexError::UnclosedSingleQuote { opening: opening.clone() }),
                        opening,
                    ))
                }
                Some('\'') => {
                    self.advance(1);
                    break;
                }
                Some(c) => {
                    self.advance(1);
                    s.push(c);
                }
            }
        }
        Ok(s)
    }

    pub(crate) fn scan_dollar_single_quote(&mut self, opening: Location) -> Result<String, ParseError> {
        let mut s = String::new();
        loop {
            match self.peek_char()? {
                None => {
                    return Err(ParseError::fatal(
                        SyntaxError::Lex(LexError::UnclosedDollarSingleQuote { opening: opening.clone() }),
                        opening,
                    ))
                }
                Some('\'') => {
                    self.advance(1);
                    break;
                }
                Some('\\') => {
                    self.advance(1);
                    match self.peek_char()? {
                        Some('n') => {
                            s.push('\n');
                            self.advance(1);
                        }
                        Some('t') => {
                            s.push('\t');
                            self.advance(1);
                        }
                        Some('r') => {
                            s.push('\r');
                            self.advance(1);
                        }
                        Some('a') => {
                            s.push('\u{07}');
                            self.advance(1);
                        }
                        Some('b') => {
                            s.push('\u{08}');
                            self.advance(1);
                        }
                        Some('e') => {
                            s.push('\u{1b}');
                            self.advance(1);
                        }
                        Some('f') => {
                            s.push('\u{0c}');
                            self.advance(1);
                        }
                        Some('v') => {
                            s.push('\u{0b}');
                            self.advance(1);
                        }
                        Some('\\') => {
                            s.push('\\');
                            self.advance(1);
                        }
                        Some('\'') => {
                            s.push('\'');
                            self.advance(1);
                        }
                        Some('"') => {
                            s.push('"');
                            self.advance(1);
                        }
                        Some(other) => {
                            s.push(other);
                            self.advance(1);
                        }
                        None => {
                            return Err(ParseError::fatal(SyntaxError::Lex(LexError::IncompleteEscape), opening))
                        }
                    }
                }
                Some(c) => {
                    self.advance(1);
                    s.push(c);
                }
            }
        }
        Ok(s)
    }

    /// Reads a double-quoted string's contents (the opening `"` has already
    /// been consumed), recursing into `$`/backquote expansions that appear
    /// inside it, each inheriting `quoted = true`.
    pub(crate) fn scan_double_quote(&mut self, opening: Location) -> Result<Vec<WordPart>, ParseError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            match self.peek_char()? {
                None => {
                    return Err(ParseError::fatal(
                        SyntaxError::Lex(LexError::UnclosedDoubleQuote { opening: opening.clone() }),
                        opening,
                    ))
                }
                Some('"') => {
                    self.advance(1);
                    break;
                }
                Some('\\') => {
                    self.advance(1);
                    match self.peek_char()? {
                        Some(c @ ('$' | '`' | '"' | '\\')) => {
                            self.advance(1);
                            literal.push(c);
                        }
                        Some('\n') => {
                            self.advance(1);
                        }
                        Some(c) => {
                            self.advance(1);
                            literal.push('\\');
                            literal.push(c);
                        }
                        None => {
                            return Err(ParseError::fatal(SyntaxError::Lex(LexError::IncompleteEscape), opening))
                        }
                    }
                }
                Some('$') => {
                    if !literal.is_empty() {
                        parts.push(WordPart::Literal {
                            text: std::mem::take(&mut literal),
                            quoted: true,
                            quote_char: Some(QuoteChar::Double),
                        });
                    }
                    self.advance(1);
                    parts.push(self.scan_dollar(true, Some(QuoteChar::Double))?);
                }
                Some('`') => {
                    if !literal.is_empty() {
                        parts.push(WordPart::Literal {
                            text: std::mem::take(&mut literal),
                            quoted: true,
                            quote_char: Some(QuoteChar::Double),
                        });
                    }
                    self.advance(1);
                    parts.push(self.scan_backquote(true, Some(QuoteChar::Double))?);
                }
                Some(c) => {
                    self.advance(1);
                    literal.push(c);
                }
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(WordPart::Literal { text: literal, quoted: true, quote_char: Some(QuoteChar::Double) });
        }
        Ok(parts)
    }

    /// Dispatches on the character following an already-consumed `$`.
    pub(crate) fn scan_dollar(
        &mut self,
        quoted: bool,
        quote_char: Option<QuoteChar>,
    ) -> Result<WordPart, ParseError> {
        let opening = self.here_location();
        match self.peek_char()? {
            Some('(') => {
                if self.peek_char_at(1)? == Some('(') {
                    self.advance(2);
                    let text = self.scan_balanced(2, true)?;
                    Ok(WordPart::ArithmeticExpansion { expr_text: text, quoted, quote_char })
                } else {
                    self.advance(1);
                    let text = self.scan_balanced(1, false)?;
                    let ast = self.parse_nested(&text, Source::CommandSubstitution { original: Box::new(opening) })?;
                    Ok(WordPart::CommandSubstitution { ast: Rc::new(ast), quoted, quote_char, backquoted: false })
                }
            }
            Some('{') => {
                self.advance(1);
                let expansion = self.scan_braced_param(opening)?;
                Ok(WordPart::ParameterExpansion { expansion, quoted, quote_char })
            }
            Some('\'') if !quoted => {
                self.advance(1);
                let text = self.scan_dollar_single_quote(opening)?;
                Ok(WordPart::Literal { text, quoted: true, quote_char: Some(QuoteChar::Single) })
            }
            Some(c) if is_special_param_char(c) => {
                self.advance(1);
                Ok(WordPart::VariableExpansion { param: special_param(c), quoted, quote_char, location: opening })
            }
            Some(c) if c.is_ascii_digit() => {
                self.advance(1);
                let param = Param {
                    id: c.to_string(),
                    r#type: ParamType::Positional(c.to_digit(10).unwrap_or(0) as usize),
                };
                Ok(WordPart::VariableExpansion { param, quoted, quote_char, location: opening })
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.scan_name()?;
                let param = Param { id: name, r#type: ParamType::Variable };
                Ok(WordPart::VariableExpansion { param, quoted, quote_char, location: opening })
            }
            _ => Ok(WordPart::Literal { text: "$".to_owned(), quoted, quote_char }),
        }
    }

    /// Reads a backquoted command substitution body (the opening `` ` `` has
    /// already been consumed), un-escaping `` \` ``, `\$` and `\\` before
    /// re-tokenizing it as a nested program (§3's `backquoted` flag exists
    /// precisely so expansion can still quote-remove it like `$(...)`).
    pub(crate) fn scan_backquote(
        &mut self,
        quoted: bool,
        quote_char: Option<QuoteChar>,
    ) -> Result<WordPart, ParseError> {
        let opening = self.here_location();
        let mut text = String::new();
        loop {
            match self.peek_char()? {
                None => {
                    return Err(ParseError::fatal(
                        SyntaxError::Lex(LexError::UnclosedBackquote { opening: opening.clone() }),
                        opening,
                    ))
                }
                Some('`') => {
                    self.advance(1);
                    break;
                }
                Some('\\') => {
                    self.advance(1);
                    match self.peek_char()? {
                        Some(c @ ('$' | '`' | '\\')) => {
                            self.advance(1);
                            text.push(c);
                        }
                        Some(c) => {
                            self.advance(1);
                            text.push('\\');
                            text.push(c);
                        }
                        None => {
                            return Err(ParseError::fatal(SyntaxError::Lex(LexError::IncompleteEscape), opening))
                        }
                    }
                }
                Some(c) => {
                    self.advance(1);
                    text.push(c);
                }
            }
        }
        let ast = self.parse_nested(&text, Source::CommandSubstitution { original: Box::new(opening) })?;
        Ok(WordPart::CommandSubstitution { ast: Rc::new(ast), quoted, quote_char, backquoted: true })
    }

    /// Generic quote-aware paren counter. `depth` starts at 1 for `$(...)`
    /// (one `(` already consumed) and 2 for `$((...))`/`((...))` (both
    /// opening parens already consumed) — in the latter case the two closing
    /// parens are consumed as an ordinary part of the same depth count, which
    /// is exactly the POSIX rule since arithmetic expansions never contain an
    /// unbalanced single `)`.
    pub(crate) fn scan_balanced(&mut self, mut depth: i32, is_arith: bool) -> Result<String, ParseError> {
        let opening = self.here_location();
        let mut text = String::new();
        let mut in_single = false;
        let mut in_double = false;
        loop {
            let c = match self.peek_char()? {
                Some(c) => c,
                None => {
                    let err = if is_arith {
                        LexError::UnclosedArithmeticExpansion { opening: opening.clone() }
                    } else {
                        LexError::UnclosedCommandSubstitution { opening: opening.clone() }
                    };
                    return Err(ParseError::fatal(SyntaxError::Lex(err), opening));
                }
            };
            if in_single {
                self.advance(1);
                text.push(c);
                if c == '\'' {
                    in_single = false;
                }
                continue;
            }
            match c {
                '\\' => {
                    self.advance(1);
                    text.push(c);
                    if let Some(n) = self.peek_char()? {
                        self.advance(1);
                        text.push(n);
                    }
                }
                '\'' if !in_double => {
                    in_single = true;
                    self.advance(1);
                    text.push(c);
                }
                '"' => {
                    in_double = !in_double;
                    self.advance(1);
                    text.push(c);
                }
                '(' if !in_double => {
                    depth += 1;
                    self.advance(1);
                    text.push(c);
                }
                ')' if !in_double => {
                    depth -= 1;
                    self.advance(1);
                    if depth == 0 {
                        break;
                    }
                    text.push(c);
                }
                _ => {
                    self.advance(1);
                    text.push(c);
                }
            }
        }
        Ok(text)
    }

    /// Same idea as [`Self::scan_balanced`] but for `${...}`'s braces.
    pub(crate) fn scan_balanced_braces(&mut self) -> Result<String, ParseError> {
        let opening = self.here_location();
        let mut depth = 1;
        let mut text = String::new();
        let mut in_single = false;
        let mut in_double = false;
        loop {
            let c = match self.peek_char()? {
                Some(c) => c,
                None => {
                    return Err(ParseError::fatal(
                        SyntaxError::Lex(LexError::UnclosedParamExpansion { opening: opening.clone() }),
                        opening,
                    ))
                }
            };
            if in_single {
                self.advance(1);
                text.push(c);
                if c == '\'' {
                    in_single = false;
                }
                continue;
            }
            match c {
                '\\' => {
                    self.advance(1);
                    text.push(c);
                    if let Some(n) = self.peek_char()? {
                        self.advance(1);
                        text.push(n);
                    }
                }
                '\'' if !in_double => {
                    in_single = true;
                    self.advance(1);
                    text.push(c);
                }
                '"' => {
                    in_double = !in_double;
                    self.advance(1);
                    text.push(c);
                }
                '{' if !in_double => {
                    depth += 1;
                    self.advance(1);
                    text.push(c);
                }
                '}' if !in_double => {
                    depth -= 1;
                    self.advance(1);
                    if depth == 0 {
                        break;
                    }
                    text.push(c);
                }
                _ => {
                    self.advance(1);
                    text.push(c);
                }
            }
        }
        Ok(text)
    }

    pub(crate) fn scan_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        while let Some(c) = self.peek_char()? {
            if c.is_alphanumeric() || c == '_' {
                self.advance(1);
                name.push(c);
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// Consumes a tilde-prefix login name (the `~` itself already consumed).
    /// An empty result means `~` referred to the invoking user's own home.
    pub(crate) fn scan_tilde_prefix(&mut self) -> Result<String, ParseError> {
        let mut user = String::new();
        while let Some(c) = self.peek_char()? {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                self.advance(1);
                user.push(c);
            } else {
                break;
            }
        }
        Ok(user)
    }
}
