//! `${...}` structural parsing: indirection prefix, name, subscript, and the
//! earliest-position modifier match against the fixed operator table
//! `{:-, :=, :?, :+, ##, #, %%, %, ^^, ^, ,,, ,, /#, /%, //, /, :}` (§4.3).
//!
//! The brace contents are first captured whole by
//! [`super::Lexer::scan_balanced_braces`], then parsed as text here. Operand
//! sub-words (defaults, patterns, replacements, substring bounds) are
//! re-lexed through [`super::Lexer::lex_word_text`] rather than parsed as
//! plain strings, so a default value like `${x:-$y}` still expands `$y`.

use crate::error::{LexError, ParseError, SyntaxError};
use crate::source::Location;
use crate::word::{
    CaseConv, CaseOp, Indirection, Modifier, Param, ParamType, ParameterExpansion, Replace,
    SpecialParam, Subscript, Substring, Switch, SwitchCondition, SwitchType, Trim, TrimLength,
    TrimSide, Word,
};

impl super::Lexer {
    pub(crate) fn scan_braced_param(&mut self, opening: Location) -> Result<ParameterExpansion, ParseError> {
        let raw = self.scan_balanced_braces()?;
        let end_loc = self.here_location();
        let location = self.span_location(&opening, &end_loc);
        self.parse_braced_content(&raw, &location)
    }

    fn parse_braced_content(&mut self, raw: &str, location: &Location) -> Result<ParameterExpansion, ParseError> {
        let mut s = raw;
        let mut indirection = Indirection::None;
        if let Some(rest) = s.strip_prefix('!') {
            if !rest.is_empty() {
                s = rest;
                indirection = Indirection::NameRef;
            }
        }

        if indirection == Indirection::None {
            if let Some(after_hash) = s.strip_prefix('#') {
                let (name_str, rest2) = split_name(after_hash);
                if !name_str.is_empty() && rest2.is_empty() {
                    let param = make_param(name_str);
                    return Ok(ParameterExpansion {
                        param,
                        subscript: None,
                        indirection,
                        modifier: Modifier::Length,
                        location: location.clone(),
                    });
                }
            }
        }

        let (name_str, rest) = split_name(s);
        if name_str.is_empty() {
            return Err(ParseError::fatal(
                SyntaxError::Lex(LexError::UnclosedParamExpansion { opening: location.clone() }),
                location.clone(),
            ));
        }
        let mut rest = rest;
        let mut subscript = None;
        if let Some(r2) = rest.strip_prefix('[') {
            if let Some(end) = r2.find(']') {
                let inner = &r2[..end];
                subscript = Some(match inner {
                    "@" => Subscript::All,
                    "*" => Subscript::Joined,
                    _ => Subscript::Index(Box::new(self.lex_word_text(inner)?)),
                });
                rest = &r2[end + 1..];
            }
        }

        if indirection == Indirection::NameRef {
            if rest == "@" {
                indirection = Indirection::Keys;
                rest = "";
            } else if matches!(subscript, Some(Subscript::All) | Some(Subscript::Joined)) {
                indirection = Indirection::Indices;
            }
        }

        let param = make_param(name_str);
        if rest.is_empty() {
            return Ok(ParameterExpansion { param, subscript, indirection, modifier: Modifier::None, location: location.clone() });
        }
        let modifier = self.match_modifier(rest)?;
        Ok(ParameterExpansion { param, subscript, indirection, modifier, location: location.clone() })
    }

    fn match_modifier(&mut self, rest: &str) -> Result<Modifier, ParseError> {
        if let Some(p) = rest.strip_prefix(":-") {
            return Ok(Modifier::Switch(Switch { r#type: SwitchType::Default, condition: SwitchCondition::UnsetOrEmpty, word: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix(":=") {
            return Ok(Modifier::Switch(Switch { r#type: SwitchType::Assign, condition: SwitchCondition::UnsetOrEmpty, word: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix(":?") {
            return Ok(Modifier::Switch(Switch { r#type: SwitchType::Error, condition: SwitchCondition::UnsetOrEmpty, word: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix(":+") {
            return Ok(Modifier::Switch(Switch { r#type: SwitchType::Alter, condition: SwitchCondition::UnsetOrEmpty, word: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix("##") {
            return Ok(Modifier::Trim(Trim { side: TrimSide::Prefix, length: TrimLength::Longest, pattern: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix('#') {
            return Ok(Modifier::Trim(Trim { side: TrimSide::Prefix, length: TrimLength::Shortest, pattern: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix("%%") {
            return Ok(Modifier::Trim(Trim { side: TrimSide::Suffix, length: TrimLength::Longest, pattern: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix('%') {
            return Ok(Modifier::Trim(Trim { side: TrimSide::Suffix, length: TrimLength::Shortest, pattern: self.lex_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix("^^") {
            return Ok(Modifier::CaseConv(CaseConv { op: CaseOp::AllUpper, pattern: self.opt_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix('^') {
            return Ok(Modifier::CaseConv(CaseConv { op: CaseOp::FirstUpper, pattern: self.opt_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix(",,") {
            return Ok(Modifier::CaseConv(CaseConv { op: CaseOp::AllLower, pattern: self.opt_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix(',') {
            return Ok(Modifier::CaseConv(CaseConv { op: CaseOp::FirstLower, pattern: self.opt_word_text(p)? }));
        }
        if let Some(p) = rest.strip_prefix("/#") {
            return self.parse_replace(p, true, false, false);
        }
        if let Some(p) = rest.strip_prefix("/%") {
            return self.parse_replace(p, false, true, false);
        }
        if let Some(p) = rest.strip_prefix("//") {
            return self.parse_replace(p, false, false, true);
        }
        if let Some(p) = rest.strip_prefix('/') {
            return self.parse_replace(p, false, false, false);
        }
        if let Some(p) = rest.strip_prefix(':') {
            return self.parse_substring(p);
        }
        if rest.is_empty() {
            return Ok(Modifier::None);
        }
        // Anything else left over after a name/subscript we treat leniently
        // as a `${name-default}`-style bare default, rather than rejecting
        // the expansion outright.
        Ok(Modifier::Switch(Switch {
            r#type: SwitchType::Default,
            condition: SwitchCondition::Unset,
            word: self.lex_word_text(rest)?,
        }))
    }

    fn parse_replace(&mut self, p: &str, anchor_start: bool, anchor_end: bool, all: bool) -> Result<Modifier, ParseError> {
        let (pat, repl) = split_unescaped(p, '/');
        let pattern = self.lex_word_text(pat)?;
        let replacement = match repl {
            Some(r) => Some(self.lex_word_text(r)?),
            None => None,
        };
        Ok(Modifier::Replace(Replace { pattern, replacement, all, anchor_start, anchor_end }))
    }

    fn parse_substring(&mut self, p: &str) -> Result<Modifier, ParseError> {
        let (off, len) = split_unescaped(p, ':');
        let offset = self.lex_word_text(off)?;
        let length = match len {
            Some(l) => Some(self.lex_word_text(l)?),
            None => None,
        };
        Ok(Modifier::Substring(Substring { offset, length }))
    }

    fn opt_word_text(&mut self, p: &str) -> Result<Option<Word>, ParseError> {
        if p.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.lex_word_text(p)?))
        }
    }
}

/// Splits a name off the front of `s`: a single special-parameter character,
/// a run of digits (positional parameter), or a POSIX identifier.
fn split_name(s: &str) -> (&str, &str) {
    let Some(first) = s.chars().next() else { return ("", s) };
    if matches!(first, '@' | '*' | '#' | '?' | '-' | '$' | '!') {
        let len = first.len_utf8();
        return (&s[..len], &s[len..]);
    }
    if first.is_ascii_digit() {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        return (&s[..end], &s[end..]);
    }
    if first.is_alphabetic() || first == '_' {
        let end = s.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(s.len());
        return (&s[..end], &s[end..]);
    }
    ("", s)
}

fn make_param(name: &str) -> Param {
    use ParamType::*;
    use SpecialParam::*;
    match name {
        "@" => Param { id: "@".into(), r#type: Special(At) },
        "*" => Param { id: "*".into(), r#type: Special(Asterisk) },
        "#" => Param { id: "#".into(), r#type: Special(Number) },
        "?" => Param { id: "?".into(), r#type: Special(Question) },
        "-" => Param { id: "-".into(), r#type: Special(Hyphen) },
        "$" => Param { id: "$".into(), r#type: Special(Dollar) },
        "!" => Param { id: "!".into(), r#type: Special(Exclamation) },
        "0" => Param { id: "0".into(), r#type: Special(Zero) },
        s if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            Param { id: s.into(), r#type: Positional(s.parse().unwrap_or(0)) }
        }
        s => Param { id: s.into(), r#type: Variable },
    }
}

/// Splits `s` on the first unescaped `sep`, the way `${var/pat/repl}` and
/// `${var:off:len}` share their operand out of one brace body.
fn split_unescaped(s: &str, sep: char) -> (&str, Option<&str>) {
    let mut chars = s.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if c == sep {
            return (&s[..idx], Some(&s[idx + c.len_utf8()..]));
        }
    }
    (s, None)
}
