//! The top-level word-reading loop. Fuses C2 (lexing) and C3 (Word AST
//! construction): rather than emitting generic character spans that a later
//! pass would reinterpret, each recognized construct is pushed directly as
//! the [`WordPart`] it denotes, exactly as the teacher's own `WordLexer`
//! builds `syntax::Word` while scanning rather than after.

use crate::error::{ParseError, SyntaxError};
use crate::error::LexError;
use crate::source::{Location, Source};
use crate::word::{ProcessSubstDirection, QuoteChar, Word, WordPart};
use std::rc::Rc;

impl super::Lexer {
    /// Reads one word. `allow_process_subst` gates recognition of `<(` and
    /// `>(`: it is on for ordinary command-line words and modifier operands,
    /// off only for restricted spots, such as the `<<`/`<<-` delimiter word,
    /// where `<`/`>` are just ordinary characters.
    pub(crate) fn read_word(&mut self, allow_process_subst: bool) -> Result<Word, ParseError> {
        let start_loc = self.here_location();
        let mut parts: Vec<WordPart> = Vec::new();
        let mut literal = String::new();
        loop {
            let c = match self.peek_char()? {
                Some(c) => c,
                None => break,
            };
            if super::is_token_delimiter_char(c) {
                let is_process_subst_start = (c == '<' || c == '>')
                    && allow_process_subst
                    && self.peek_char_at(1)? == Some('(');
                if !is_process_subst_start {
                    break;
                }
            }
            match c {
                '\'' => {
                    flush_literal(&mut parts, &mut literal);
                    let opening = self.here_location();
                    self.advance(1);
                    let text = self.scan_single_quote(opening)?;
                    parts.push(WordPart::Literal { text, quoted: true, quote_char: Some(QuoteChar::Single) });
                }
                '"' => {
                    flush_literal(&mut parts, &mut literal);
                    let opening = self.here_location();
                    self.advance(1);
                    parts.extend(self.scan_double_quote(opening)?);
                }
                '\\' => {
                    self.advance(1);
                    match self.peek_char()? {
                        Some('\n') => {
                            self.advance(1);
                        }
                        Some(next) => {
                            self.advance(1);
                            flush_literal(&mut parts, &mut literal);
                            parts.push(WordPart::Literal { text: next.to_string(), quoted: true, quote_char: None });
                        }
                        None => return Err(ParseError::fatal(SyntaxError::Lex(LexError::IncompleteEscape), start_loc)),
                    }
                }
                '$' => {
                    flush_literal(&mut parts, &mut literal);
                    self.advance(1);
                    parts.push(self.scan_dollar(false, None)?);
                }
                '`' => {
                    flush_literal(&mut parts, &mut literal);
                    self.advance(1);
                    parts.push(self.scan_backquote(false, None)?);
                }
                '~' if parts.is_empty() && literal.is_empty() => {
                    self.advance(1);
                    let user = self.scan_tilde_prefix()?;
                    parts.push(WordPart::TildeExpansion { user });
                }
                '<' | '>' if allow_process_subst && self.peek_char_at(1)? == Some('(') => {
                    flush_literal(&mut parts, &mut literal);
                    let direction = if c == '<' { ProcessSubstDirection::In } else { ProcessSubstDirection::Out };
                    let opening = self.here_location();
                    self.advance(2);
                    let text = self.scan_balanced(1, false)?;
                    let ast = self.parse_nested(&text, Source::CommandSubstitution { original: Box::new(opening) })?;
                    parts.push(WordPart::ProcessSubstitution { direction, ast: Rc::new(ast) });
                }
                _ => {
                    self.advance(1);
                    literal.push(c);
                }
            }
        }
        flush_literal(&mut parts, &mut literal);
        if parts.is_empty() {
            parts.push(WordPart::Literal { text: String::new(), quoted: false, quote_char: None });
        }
        let end_loc = self.here_location();
        let location = self.span_location(&start_loc, &end_loc);
        Ok(Word::new(parts, location))
    }

    /// Re-lexes a modifier operand (a default value, a glob pattern, a
    /// substring bound...) as its own word so expansions nested inside it —
    /// `${x:-$y}` — still work, without needing a second, string-based
    /// parser just for that case.
    pub(crate) fn lex_word_text(&mut self, text: &str) -> Result<Word, ParseError> {
        if text.is_empty() {
            return Ok(Word::new(
                vec![WordPart::Literal { text: String::new(), quoted: false, quote_char: None }],
                Location::dummy(""),
            ));
        }
        let mut lexer = super::Lexer::new(
            Box::new(crate::input::StringInput::new(text.to_owned())),
            Source::Unknown,
        );
        lexer.options = self.options;
        lexer.read_word(true)
    }

    /// Builds a `Location` spanning from `start` to `end`, both previously
    /// obtained from this lexer. Offsets are stable across re-buffering
    /// (each refill appends to, never rewrites, the accumulated source text)
    /// so it is always safe to anchor the span at the more recently minted
    /// `Code` — `end`'s — even if `start` was captured before more text, and
    /// therefore a new `Code` instance, was fed in.
    pub(crate) fn span_location(&self, start: &Location, end: &Location) -> Location {
        Location { code: Rc::clone(&end.code), range: start.range.start..end.range.start }
    }
}

fn flush_literal(parts: &mut Vec<WordPart>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(WordPart::Literal { text: std::mem::take(literal), quoted: false, quote_char: None });
    }
}
