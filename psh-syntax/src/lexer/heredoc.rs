//! Here-document body collection. `<<`/`<<-` are recognized as ordinary
//! operators by [`super::Lexer::try_operator`], which immediately reads the
//! delimiter word and queues a `PendingHeredoc`; the body itself can only be
//! read once the rest of the logical line has been tokenized, so collection
//! happens when the terminating `Newline` is produced (§4.2).

use crate::error::ParseError;
use crate::token::HeredocKey;
use crate::word::Word;

pub(crate) struct PendingHeredoc {
    pub key: HeredocKey,
    pub delimiter: Word,
    pub remove_tabs: bool,
    pub quoted_delimiter: bool,
}

impl super::Lexer {
    /// Looks up a still-unresolved heredoc's delimiter word and flags, for
    /// the parser to fold into the `HereDoc` node it is building. Valid only
    /// between the `<<`/`<<-` token being produced and the following
    /// `Newline` (which drains this entry via `resolve_heredocs`).
    pub(crate) fn pending_heredoc_info(&self, key: HeredocKey) -> Option<(Word, bool, bool)> {
        self.pending_heredocs
            .iter()
            .find(|p| p.key == key)
            .map(|p| (p.delimiter.clone(), p.remove_tabs, p.quoted_delimiter))
    }

    /// Drains `pending_heredocs`, reading raw physical lines directly from
    /// the input (bypassing the line-continuation prepass: heredoc bodies
    /// are taken verbatim) until each one's delimiter line is seen.
    pub(crate) fn resolve_heredocs(&mut self) -> Result<(), ParseError> {
        if self.pending_heredocs.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending_heredocs);
        for p in pending {
            let delim_text = p.delimiter.as_literal().unwrap_or_default();
            let mut body = String::new();
            loop {
                let line = match self.input.next_line() {
                    Ok(Some(l)) => l,
                    Ok(None) | Err(_) => break,
                };
                let stripped = if p.remove_tabs {
                    line.trim_start_matches('\t')
                } else {
                    line.as_str()
                };
                let trimmed = stripped.strip_suffix('\n').unwrap_or(stripped);
                if trimmed == delim_text {
                    break;
                }
                body.push_str(stripped);
            }
            self.heredoc_bodies.insert(p.key, body);
        }
        Ok(())
    }
}
