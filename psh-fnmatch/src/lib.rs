//! This crate provides the `fnmatch` function that performs pattern matching
//! based on a globbing pattern.
//!
//! This implementation supports the following syntax in patterns:
//!
//! - Any single character (`?`)
//! - Any character sequence (`*`)
//! - Bracket expression (`[...]`)
//!     - Character literals
//!     - Character ranges (e.g. `a-z`)
//!     - Complement (`[!...]`)
//!     - Collating symbols (e.g. `[.ch.]`)
//!     - Equivalence classes (e.g. `[=a=]`)
//!     - Character classes (`[:alpha:]`)
//! - Extended-glob alternation groups (`?(...)`, `*(...)`, `+(...)`,
//!   `@(...)`, `!(...)`), when enabled via [`Config::extglob`]
//!
//! The current implementation does not support any locale-specific
//! characteristics. Especially, collating symbols and equivalent classes only
//! match the specified character sequence itself, and character classes only
//! match ASCII characters.
//!
//! Patterns are compiled into a [`regex::Regex`] rather than matched
//! character-by-character, so matching a [`Pattern`] many times over is
//! cheap once it has been constructed once.

pub mod ast;
mod char_iter;

pub use char_iter::{with_escape, without_escape, PatternChar, WithEscape, WithoutEscape};

use ast::Ast;
use regex::Regex;
use std::fmt::Write;

/// Whether matching is case-sensitive.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

/// Configuration for [`Pattern::parse_with_config`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    pub case_sensitivity: CaseSensitivity,
    /// Recognize `?(...)`, `*(...)`, `+(...)`, `@(...)`, `!(...)` groups.
    pub extglob: bool,
    /// Anchor the regex at the start of the string. Usually left `true`:
    /// `fnmatch` is meant to test whether a pattern describes the *whole*
    /// string, not a substring of it.
    pub anchor_begin: bool,
    /// Anchor the regex at the end of the string.
    pub anchor_end: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            case_sensitivity: CaseSensitivity::Sensitive,
            extglob: false,
            anchor_begin: true,
            anchor_end: true,
        }
    }
}

/// Error parsing a pattern or converting it to a regular expression.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("undefined character class `{0}`")]
    UndefinedCharClass(String),
    #[error("character class `{0}` cannot be used in a range")]
    CharClassInRange(String),
    #[error("empty collating symbol or equivalence class")]
    EmptyCollatingSymbol,
    #[error("empty bracket expression")]
    EmptyBracket,
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),
}

/// A compiled globbing pattern.
///
/// Constructing a `Pattern` parses the pattern into an [`Ast`] and compiles
/// it down to a [`regex::Regex`]; [`Pattern::is_match`] and friends are then
/// cheap to call repeatedly.
#[derive(Clone, Debug)]
pub struct Pattern {
    ast: Ast,
    regex: Regex,
}

impl Pattern {
    /// Parses a pattern with the default configuration (case-sensitive, no
    /// extglob, anchored at both ends).
    pub fn parse<I>(pattern: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PatternChar>,
        <I as IntoIterator>::IntoIter: Clone,
    {
        Self::parse_with_config(pattern, &Config::default())
    }

    /// Parses a pattern with an explicit configuration.
    pub fn parse_with_config<I>(pattern: I, config: &Config) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PatternChar>,
        <I as IntoIterator>::IntoIter: Clone,
    {
        let ast = Ast::new_with_extglob(pattern, config.extglob)?;
        let mut body = String::new();
        ast.fmt_regex(config, &mut body)?;
        let mut builder = regex::RegexBuilder::new(&body);
        builder.case_insensitive(config.case_sensitivity == CaseSensitivity::Insensitive);
        builder.dot_matches_new_line(true);
        let regex = builder.build().map_err(|e| Error::InvalidRegex(e.to_string()))?;
        Ok(Pattern { ast, regex })
    }

    /// The parsed syntax tree, for introspection (e.g. deciding whether a
    /// pattern is a plain literal that needs no matching at all).
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Tests whether the whole of `text` matches this pattern.
    ///
    /// Only meaningful when the pattern was parsed with both
    /// [`Config::anchor_begin`] and [`Config::anchor_end`] set, which is the
    /// default.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Finds the leftmost match of this pattern in `text`, returning the
    /// byte range matched.
    pub fn find(&self, text: &str) -> Option<std::ops::Range<usize>> {
        self.regex.find(text).map(|m| m.range())
    }
}

/// Tests whether `text` matches `pattern`, using the default configuration
/// and unescaped pattern characters (see [`without_escape`]).
///
/// This is a convenience wrapper around [`Pattern::parse`] for one-shot
/// matches; if the same pattern is tested against many strings, parse it
/// once into a [`Pattern`] instead.
pub fn fnmatch(pattern: &str, text: &str) -> Result<bool, Error> {
    let pattern = Pattern::parse(without_escape(pattern))?;
    Ok(pattern.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_literal_matches_itself() {
        assert!(fnmatch("abc", "abc").unwrap());
        assert!(!fnmatch("abc", "abd").unwrap());
    }

    #[test]
    fn wildcards() {
        assert!(fnmatch("a?c", "abc").unwrap());
        assert!(fnmatch("a*", "abcdef").unwrap());
        assert!(!fnmatch("a*", "xyz").unwrap());
    }

    #[test]
    fn bracket_expression() {
        assert!(fnmatch("[abc]", "b").unwrap());
        assert!(!fnmatch("[!abc]", "b").unwrap());
        assert!(fnmatch("[a-z]", "m").unwrap());
    }

    #[test]
    fn case_insensitive_config() {
        let config = Config { case_sensitivity: CaseSensitivity::Insensitive, ..Config::default() };
        let pattern = Pattern::parse_with_config(without_escape("ABC"), &config).unwrap();
        assert!(pattern.is_match("abc"));
    }

    #[test]
    fn extglob_alternation() {
        let config = Config { extglob: true, ..Config::default() };
        let pattern = Pattern::parse_with_config(without_escape("@(foo|bar)"), &config).unwrap();
        assert!(pattern.is_match("foo"));
        assert!(pattern.is_match("bar"));
        assert!(!pattern.is_match("baz"));
    }

    #[test]
    fn extglob_zero_or_more() {
        let config = Config { extglob: true, ..Config::default() };
        let pattern = Pattern::parse_with_config(without_escape("*(ab)c"), &config).unwrap();
        assert!(pattern.is_match("c"));
        assert!(pattern.is_match("ababc"));
        assert!(!pattern.is_match("ac"));
    }

    #[test]
    fn extglob_disabled_falls_back_to_literal() {
        let pattern = Pattern::parse(without_escape("@(foo|bar)")).unwrap();
        assert!(!pattern.is_match("foo"));
    }
}
