//! Input sources for the lexer. The REPL's actual line-editor (history,
//! completion, prompting) is an external collaborator (§1); this module only
//! defines the narrow interface the lexer consumes from it.

/// Supplies the lexer with successive physical lines of source text.
///
/// Returning `Ok(None)` signals end of input. The lexer calls `next_line`
/// only when it has exhausted its buffered characters and still needs more
/// (to finish a token, close a quote, or collect a here-document body),
/// which is the core's only suspension point while parsing (§5).
pub trait Input {
    fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Feeds a whole script/command string, one call at a time, splitting on
/// newlines but preserving them in each yielded line (so line-continuation
/// and heredoc handling see the same bytes a REPL would).
pub struct StringInput {
    remaining: String,
    done: bool,
}

impl StringInput {
    pub fn new(source: impl Into<String>) -> Self {
        StringInput { remaining: source.into(), done: false }
    }
}

impl Input for StringInput {
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        match self.remaining.find('\n') {
            Some(i) => {
                let (line, rest) = self.remaining.split_at(i + 1);
                let line = line.to_owned();
                self.remaining = rest.to_owned();
                Ok(Some(line))
            }
            None if self.remaining.is_empty() => {
                self.done = true;
                Ok(None)
            }
            None => {
                self.done = true;
                Ok(Some(std::mem::take(&mut self.remaining)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_lines_keeping_newlines() {
        let mut input = StringInput::new("echo a\necho b");
        assert_eq!(input.next_line().unwrap(), Some("echo a\n".to_owned()));
        assert_eq!(input.next_line().unwrap(), Some("echo b".to_owned()));
        assert_eq!(input.next_line().unwrap(), None);
    }
}
