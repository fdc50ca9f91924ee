//! Source code positions.
//!
//! This is component C1 of the core pipeline: an index over the input
//! character stream that supports `peek`/`advance`/`backtrack` and resolves
//! any byte offset to a `(line, column)` pair. [`CharStream`] is the only
//! primitive the lexer uses to read source text; everything above it
//! (quoting, token recognition, heredoc collection) is built out of its
//! `peek`/`advance`/`save_pos`/`restore_pos` operations.

use std::fmt;
use std::rc::Rc;

pub mod pretty;

/// Where a piece of source code came from.
///
/// Unlike the teacher's `Source` enum (which also tracks alias expansion,
/// since yash-rs implements aliases), this core has no alias subsystem, so
/// that variant is dropped; the rest mirror spec's requirement that every
/// token and AST node be traceable back to why it exists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    /// Top-level command string passed to `shell()`.
    CommandString,
    /// A named script file.
    Script { name: Rc<str> },
    /// Body of a command substitution, nested inside another source.
    CommandSubstitution { original: Box<Location> },
    /// Body of a `$((...))`/`((...))` arithmetic expansion.
    Arithmetic { original: Box<Location> },
    /// Unknown origin, used for ASTs built directly from `FromStr` in tests.
    Unknown,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::CommandString => write!(f, "<command string>"),
            Source::Script { name } => write!(f, "{name}"),
            Source::CommandSubstitution { .. } => write!(f, "<command substitution>"),
            Source::Arithmetic { .. } => write!(f, "<arithmetic expansion>"),
            Source::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// The full text of one source unit, shared by every [`Location`] that points
/// into it.
///
/// Line numbers are precomputed once per `Code` instance: `line_starts[i]` is
/// the byte offset of the first character of line `i + 1` (1-indexed lines,
/// 0-indexed `line_starts`).
#[derive(Debug)]
pub struct Code {
    pub value: String,
    pub source: Rc<Source>,
    line_starts: Vec<usize>,
}

impl Code {
    pub fn new(value: String, source: Source) -> Rc<Code> {
        let mut line_starts = vec![0];
        for (i, b) in value.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Rc::new(Code {
            value,
            source: Rc::new(source),
            line_starts,
        })
    }

    /// Resolves a byte offset to a 1-indexed `(line, column)` pair.
    pub fn line_col(&self, offset: usize) -> (u64, u64) {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_index];
        let col = self.value[line_start..offset.min(self.value.len())]
            .chars()
            .count()
            + 1;
        (line_index as u64 + 1, col as u64)
    }

    /// Returns the full text of the line containing `offset`, without the
    /// trailing newline.
    pub fn line_text(&self, offset: usize) -> &str {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts[line_index];
        let end = self.line_starts.get(line_index + 1).copied().unwrap_or(self.value.len());
        self.value[start..end].trim_end_matches('\n')
    }
}

/// A span of source code, as a byte range into a shared [`Code`].
#[derive(Clone, Debug)]
pub struct Location {
    pub code: Rc<Code>,
    pub range: std::ops::Range<usize>,
}

impl Location {
    pub fn dummy(text: impl Into<String>) -> Location {
        let code = Code::new(text.into(), Source::Unknown);
        let end = code.value.len();
        Location { code, range: 0..end }
    }

    pub fn line(&self) -> u64 {
        self.code.line_col(self.range.start).0
    }

    pub fn column(&self) -> u64 {
        self.code.line_col(self.range.start).1
    }

    pub fn text(&self) -> &str {
        &self.code.value[self.range.clone()]
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.code, &other.code) && self.range == other.range
    }
}
impl Eq for Location {}

/// A single character together with the location it was read from.
#[derive(Clone, Debug)]
pub struct SourceChar {
    pub value: char,
    pub location: Location,
}

/// Cursor over a shared, growable buffer of [`SourceChar`]s.
///
/// The buffer can be extended at any time by [`CharStream::feed`] — this is
/// how the lexer asks for more physical lines when it needs to collect a
/// here-document body or continue an unterminated quote (§4.1). Positions are
/// plain `usize` indices into the buffer, so `save_pos`/`restore_pos` are
/// `Copy`.
#[derive(Debug)]
pub struct CharStream {
    chars: Vec<SourceChar>,
    index: usize,
    at_eof: bool,
}

impl CharStream {
    pub fn new() -> Self {
        CharStream { chars: Vec::new(), index: 0, at_eof: false }
    }

    /// Appends more source text, recording it under `code`.
    pub fn feed(&mut self, code: &Rc<Code>, range: std::ops::Range<usize>) {
        for (i, c) in code.value[range.clone()].char_indices() {
            let start = range.start + i;
            self.chars.push(SourceChar {
                value: c,
                location: Location { code: Rc::clone(code), range: start..start + c.len_utf8() },
            });
        }
    }

    pub fn mark_eof(&mut self) {
        self.at_eof = true;
    }

    pub fn is_known_eof(&self) -> bool {
        self.at_eof && self.index >= self.chars.len()
    }

    /// Looks `k` characters ahead without consuming.
    pub fn peek(&self, k: usize) -> Option<&SourceChar> {
        self.chars.get(self.index + k)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.peek(0).map(|c| c.value)
    }

    /// Consumes and returns `n` characters at once, returning fewer if the
    /// buffer runs out.
    pub fn advance(&mut self, n: usize) -> usize {
        let available = self.chars.len().saturating_sub(self.index);
        let taken = n.min(available);
        self.index += taken;
        taken
    }

    pub fn save_pos(&self) -> usize {
        self.index
    }

    pub fn restore_pos(&mut self, pos: usize) {
        self.index = pos;
    }

    pub fn location_at(&self, pos: usize) -> Option<Location> {
        self.chars.get(pos).map(|c| c.location.clone())
    }

    /// Location just past the last buffered character, for end-of-input
    /// diagnostics.
    pub fn end_location(&self) -> Option<Location> {
        self.chars.last().map(|c| Location {
            code: Rc::clone(&c.location.code),
            range: c.location.range.end..c.location.range.end,
        })
    }

    pub fn current_index(&self) -> usize {
        self.index
    }
}

impl Default for CharStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(s: &str) -> CharStream {
        let code = Code::new(s.to_owned(), Source::CommandString);
        let mut cs = CharStream::new();
        cs.feed(&code, 0..code.value.len());
        cs.mark_eof();
        cs
    }

    #[test]
    fn peek_and_advance() {
        let mut cs = stream_of("ab");
        assert_eq!(cs.peek_char(), Some('a'));
        assert_eq!(cs.peek(1).map(|c| c.value), Some('b'));
        cs.advance(1);
        assert_eq!(cs.peek_char(), Some('b'));
        cs.advance(1);
        assert_eq!(cs.peek_char(), None);
        assert!(cs.is_known_eof());
    }

    #[test]
    fn save_and_restore() {
        let mut cs = stream_of("abc");
        cs.advance(1);
        let p = cs.save_pos();
        cs.advance(2);
        assert_eq!(cs.peek_char(), None);
        cs.restore_pos(p);
        assert_eq!(cs.peek_char(), Some('b'));
    }

    #[test]
    fn line_col_tracking() {
        let code = Code::new("ab\ncd".to_owned(), Source::CommandString);
        assert_eq!(code.line_col(0), (1, 1));
        assert_eq!(code.line_col(3), (2, 1));
        assert_eq!(code.line_col(4), (2, 2));
    }
}
