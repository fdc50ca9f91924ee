//! Component C2: the lexer. A state machine dispatched through a
//! priority-ordered recognizer registry (whitespace, comments, operators,
//! keyword candidates, literals/words — §4.2), built directly on top of the
//! [`CharStream`] primitives from C1.

mod braced_param;
mod heredoc;
mod scan;
mod word;

use crate::ast::List;
use crate::error::{ParseError, Severity};
use crate::input::Input;
use crate::source::{Code, Location, Source};
use crate::token::{
    keyword_from_str, Context as TokContext, HeredocKey, Operator, Token, TokenKind,
    OPERATOR_TABLE,
};
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) use heredoc::PendingHeredoc;

/// True for characters POSIX calls "blank": whitespace other than newline.
pub fn is_blank(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

/// True for the fixed set of characters that can start an operator lexeme.
pub fn is_operator_char(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '<' | '>' | '(' | ')' | '{' | '}')
}

/// A character delimits a token if it is whitespace or an operator-starting
/// character (§4.2 word recognizer).
pub fn is_token_delimiter_char(c: char) -> bool {
    c.is_whitespace() || is_operator_char(c)
}

/// Lexer options that change recognition of certain tokens. These are pushed
/// and popped by the parser around context-sensitive productions, the way
/// §4.4 describes `ParserContext` flags being restored on every exit path.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// `extglob`: recognize `?(`, `*(`, `+(`, `@(`, `!(` as single tokens.
    pub extglob: bool,
}

/// The lexical analyzer. Wraps a growable [`crate::source::CharStream`] and
/// pulls more physical lines from an [`Input`] on demand.
pub struct Lexer {
    pub(crate) stream: crate::source::CharStream,
    input: Box<dyn Input>,
    code: Rc<Code>,
    offset: usize,
    prepass_in_single: bool,
    prepass_in_double: bool,
    pub(crate) pending_heredocs: Vec<PendingHeredoc>,
    pub(crate) heredoc_bodies: HashMap<HeredocKey, String>,
    next_heredoc_key: u32,
    pub options: Options,
    errors: Vec<ParseError>,
    pub collect_errors: bool,
}

impl Lexer {
    pub fn new(input: Box<dyn Input>, source: Source) -> Self {
        Lexer {
            stream: crate::source::CharStream::new(),
            input,
            code: Code::new(String::new(), source),
            offset: 0,
            prepass_in_single: false,
            prepass_in_double: false,
            pending_heredocs: Vec::new(),
            heredoc_bodies: HashMap::new(),
            next_heredoc_key: 0,
            options: Options::default(),
            errors: Vec::new(),
            collect_errors: false,
        }
    }

    pub fn with_str(source_text: &str) -> Self {
        Lexer::new(
            Box::new(crate::input::StringInput::new(source_text.to_owned())),
            Source::CommandString,
        )
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub(crate) fn record_error(&mut self, e: ParseError) -> Result<(), ParseError> {
        if self.collect_errors && e.severity != Severity::Fatal {
            self.errors.push(e);
            Ok(())
        } else {
            Err(e)
        }
    }

    fn allocate_heredoc_key(&mut self) -> HeredocKey {
        let key = HeredocKey(self.next_heredoc_key);
        self.next_heredoc_key += 1;
        key
    }

    /// Applies the line-continuation removal pass (§4.1): `\<newline>`
    /// outside single quotes is deleted before the text is tokenized, while
    /// inside single quotes it is preserved verbatim (backslash has no
    /// special meaning there). Quote-tracking state persists across lines so
    /// a quote spanning multiple physical lines is still handled correctly.
    fn strip_continuations(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if self.prepass_in_single {
                out.push(c);
                if c == '\'' {
                    self.prepass_in_single = false;
                }
                continue;
            }
            if c == '\\' {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    continue;
                }
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
                continue;
            }
            if c == '\'' && !self.prepass_in_double {
                self.prepass_in_single = true;
                out.push(c);
                continue;
            }
            if c == '"' {
                self.prepass_in_double = !self.prepass_in_double;
                out.push(c);
                continue;
            }
            out.push(c);
        }
        out
    }

    /// Ensures the stream has at least one more character buffered beyond
    /// the current position, pulling another physical line if necessary.
    /// Returns `false` at genuine end of input.
    pub(crate) fn fill(&mut self) -> Result<bool, ParseError> {
        if self.stream.peek(0).is_some() {
            return Ok(true);
        }
        if self.stream.is_known_eof() {
            return Ok(false);
        }
        match self.input.next_line() {
            Ok(Some(line)) => {
                let processed = self.strip_continuations(&line);
                // Rebuild the shared Code with the appended text so
                // Locations keep pointing into one contiguous buffer.
                let mut full = self.code.value.clone();
                let start = full.len();
                full.push_str(&processed);
                let source = (*self.code.source).clone();
                self.code = Code::new(full, source);
                self.stream.feed(&self.code, start..start + processed.len());
                self.offset = start + processed.len();
                Ok(true)
            }
            Ok(None) => {
                self.stream.mark_eof();
                Ok(false)
            }
            Err(_) => {
                self.stream.mark_eof();
                Ok(false)
            }
        }
    }

    pub(crate) fn peek_char_at(&mut self, k: usize) -> Result<Option<char>, ParseError> {
        while self.stream.peek(k).is_none() {
            if !self.fill()? {
                return Ok(None);
            }
        }
        Ok(self.stream.peek(k).map(|c| c.value))
    }

    pub(crate) fn peek_char(&mut self) -> Result<Option<char>, ParseError> {
        self.peek_char_at(0)
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.stream.advance(n);
    }

    pub(crate) fn save_pos(&self) -> usize {
        self.stream.save_pos()
    }

    pub(crate) fn restore_pos(&mut self, pos: usize) {
        self.stream.restore_pos(pos);
    }

    pub(crate) fn here_location(&mut self) -> Location {
        let pos = self.stream.save_pos();
        self.stream
            .location_at(pos)
            .or_else(|| self.stream.end_location())
            .unwrap_or_else(|| Location::dummy(""))
    }

    /// Skips blank characters and, if a `#` starts a comment, the rest of
    /// the line (recognizer priorities 1 and 2 of §4.2).
    pub fn skip_blanks_and_comment(&mut self) -> Result<(), ParseError> {
        loop {
            while matches!(self.peek_char()?, Some(c) if is_blank(c)) {
                self.advance(1);
            }
            if self.peek_char()? == Some('#') {
                while !matches!(self.peek_char()?, None | Some('\n')) {
                    self.advance(1);
                }
                continue;
            }
            break;
        }
        Ok(())
    }

    /// Recognizer priority 3: operators, longest match first.
    fn try_operator(&mut self) -> Result<Option<Token>, ParseError> {
        if self.peek_char()? == Some('\n') {
            let start = self.save_pos();
            let loc = self.here_location();
            self.advance(1);
            self.resolve_heredocs()?;
            return Ok(Some(Token {
                kind: TokenKind::Op(Operator::Newline),
                value: "\n".to_owned(),
                start,
                end: start + 1,
                location: loc,
                quote_kind: None,
                word: None,
                adjacent_to_previous: false,
                heredoc_key: None,
                context: TokContext::default(),
            }));
        }
        for (lexeme, op) in OPERATOR_TABLE {
            if self.matches_ahead(lexeme)? {
                let start = self.save_pos();
                let loc = self.here_location();
                self.advance(lexeme.chars().count());
                let end = self.save_pos();
                let mut heredoc_key = None;
                if matches!(op, Operator::LessLess | Operator::LessLessDash) {
                    heredoc_key = Some(self.start_heredoc(*op == Operator::LessLessDash)?);
                }
                return Ok(Some(Token {
                    kind: TokenKind::Op(*op),
                    value: (*lexeme).to_owned(),
                    start,
                    end,
                    location: loc,
                    quote_kind: None,
                    word: None,
                    adjacent_to_previous: false,
                    heredoc_key,
                    context: TokContext::default(),
                }));
            }
        }
        Ok(None)
    }

    fn matches_ahead(&mut self, s: &str) -> Result<bool, ParseError> {
        for (i, expected) in s.chars().enumerate() {
            if self.peek_char_at(i)? != Some(expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Parses the here-doc delimiter word immediately following `<<`/`<<-`
    /// and queues it for body collection once the logical line ends.
    fn start_heredoc(&mut self, remove_tabs: bool) -> Result<HeredocKey, ParseError> {
        self.skip_blanks_and_comment()?;
        let delim_word = self.read_word(false)?;
        let quoted = delim_word.is_quoted() || delim_word.has_expansion_parts();
        let key = self.allocate_heredoc_key();
        self.pending_heredocs.push(PendingHeredoc {
            key,
            delimiter: delim_word,
            remove_tabs,
            quoted_delimiter: quoted,
        });
        Ok(key)
    }

    /// Produces the next token, in priority order: newline/operators, then
    /// keyword candidates (only tagged as such; it is the parser's job to
    /// decide whether command position applies), then a generic word.
    pub fn token(&mut self) -> Result<Token, ParseError> {
        let pos_before_skip = self.save_pos();
        self.skip_blanks_and_comment()?;
        // No blank, comment or line continuation separated this token from
        // the previous one — used by the parser to tell `name=(...)` (array
        // assignment) from `name= (...)` (assignment then subshell).
        let adjacent = self.save_pos() == pos_before_skip;
        let starts_process_subst = matches!(self.peek_char()?, Some('<') | Some('>'))
            && self.peek_char_at(1)? == Some('(');
        if !starts_process_subst {
            if let Some(mut tok) = self.try_operator()? {
                tok.adjacent_to_previous = adjacent;
                return Ok(tok);
            }
        }
        if self.peek_char()?.is_none() {
            let loc = self.here_location();
            return Ok(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                start: self.save_pos(),
                end: self.save_pos(),
                location: loc,
                quote_kind: None,
                word: None,
                adjacent_to_previous: adjacent,
                heredoc_key: None,
                context: TokContext::default(),
            });
        }
        let start = self.save_pos();
        let loc = self.here_location();
        let w = self.read_word(true)?;
        let end = self.save_pos();
        let value = w.location.text().to_owned();
        let kind = if let Some(lit) = w.as_literal() {
            if let Some(kw) = keyword_from_str(&lit) {
                TokenKind::KeywordCandidate(kw)
            } else if !lit.is_empty()
                && lit.chars().all(|c| c.is_ascii_digit())
                && matches!(self.peek_char()?, Some('<' | '>'))
            {
                TokenKind::IoNumber
            } else {
                TokenKind::Word
            }
        } else {
            TokenKind::Word
        };
        Ok(Token {
            kind,
            value,
            start,
            end,
            location: loc,
            quote_kind: None,
            word: Some(w),
            adjacent_to_previous: adjacent,
            heredoc_key: None,
            context: TokContext::default(),
        })
    }

    /// Produces a here-document's body as a `HereDoc` AST value once its key
    /// has been resolved by [`Lexer::resolve_heredocs`].
    pub fn heredoc_body(&self, key: HeredocKey) -> Option<&str> {
        self.heredoc_bodies.get(&key).map(|s| s.as_str())
    }

    /// Recursively parses a nested command string (used for `$(...)`,
    /// `` `...` ``, `<(...)`, `>(...)`) into a `List`.
    pub(crate) fn parse_nested(&mut self, text: &str, source: Source) -> Result<List, ParseError> {
        let mut lexer = Lexer::new(Box::new(crate::input::StringInput::new(text.to_owned())), source);
        lexer.options = self.options;
        crate::parser::Parser::new(&mut lexer).parse_program()
    }
}
