//! Component C4: the recursive-descent parser. Consumes tokens from a
//! [`crate::lexer::Lexer`] through a small lookahead buffer and builds the
//! [`crate::ast`] tree directly — no intermediate parse tree, matching the
//! teacher's single-pass `Parser` (§4.4).
//!
//! Reserved words are never special-cased by position tracking: the grammar
//! itself only ever asks "is this a keyword" at spots where a reserved word
//! could legally appear (the start of a command), so a literal like `if` or
//! `done` used as a plain argument (`echo if`) is simply read as a word by
//! [`Parser::parse_simple_command`], which never consults `Token::keyword`.

use crate::ast::*;
use crate::error::{ParseError, Severity, SyntaxError};
use crate::lexer::Lexer;
use crate::source::Location;
use crate::token::{HeredocKey, Keyword, Operator, Token, TokenKind};
use std::collections::VecDeque;
use std::rc::Rc;

/// Recursive-descent parser over a borrowed [`Lexer`]. Keeps a small
/// lookahead buffer (usually 0-2 tokens deep) rather than a single
/// one-token peek, since function-definition recognition (`name ( )`)
/// needs to look three tokens ahead before committing.
pub struct Parser<'l> {
    lexer: &'l mut Lexer,
    buf: VecDeque<Token>,
}

impl<'l> Parser<'l> {
    pub fn new(lexer: &'l mut Lexer) -> Self {
        Parser { lexer, buf: VecDeque::new() }
    }

    fn fill_to(&mut self, n: usize) -> Result<(), ParseError> {
        while self.buf.len() <= n {
            let t = self.lexer.token()?;
            self.buf.push_back(t);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        self.fill_to(0)?;
        Ok(&self.buf[0])
    }

    fn peek_at(&mut self, n: usize) -> Result<&Token, ParseError> {
        self.fill_to(n)?;
        Ok(&self.buf[n])
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.fill_to(0)?;
        Ok(self.buf.pop_front().expect("fill_to(0) guarantees at least one token"))
    }

    fn at_op(&mut self, op: Operator) -> Result<bool, ParseError> {
        Ok(self.peek()?.is_operator(op))
    }

    fn peek_is_word(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(
            self.peek()?.kind,
            TokenKind::Word | TokenKind::KeywordCandidate(_) | TokenKind::IoNumber
        ))
    }

    fn peek_literal_word(&mut self) -> Result<Option<String>, ParseError> {
        Ok(self.peek()?.word.as_ref().and_then(|w| w.as_literal()))
    }

    fn peek_is_literal(&mut self, text: &str) -> Result<bool, ParseError> {
        Ok(self.peek_literal_word()?.as_deref() == Some(text))
    }

    fn skip_newlines(&mut self) -> Result<(), ParseError> {
        while self.at_op(Operator::Newline)? {
            self.advance()?;
        }
        Ok(())
    }

    fn skip_list_separators(&mut self) -> Result<(), ParseError> {
        while self.at_op(Operator::Newline)? || self.at_op(Operator::Semi)? {
            self.advance()?;
        }
        Ok(())
    }

    fn err_at(&self, error: SyntaxError, location: Location) -> ParseError {
        ParseError { error, location, suggestion: None, severity: Severity::Error }
    }

    fn err_here(&mut self, error: SyntaxError) -> Result<ParseError, ParseError> {
        let loc = self.peek()?.location.clone();
        Ok(self.err_at(error, loc))
    }

    // ---- top level -----------------------------------------------------

    pub fn parse_program(&mut self) -> Result<List, ParseError> {
        self.parse_compound_list(|_| false)
    }

    /// A sequence of and-or lists separated by `;`/newline, each optionally
    /// backgrounded with `&`, stopping at EOF or when `is_terminator`
    /// matches the next token without consuming it.
    fn parse_compound_list(&mut self, is_terminator: impl Fn(&Token) -> bool) -> Result<List, ParseError> {
        let mut items = Vec::new();
        self.skip_list_separators()?;
        loop {
            if matches!(self.peek()?.kind, TokenKind::Eof) {
                break;
            }
            if is_terminator(self.peek()?) {
                break;
            }
            let and_or = self.parse_and_or()?;
            let mut is_background = false;
            if self.at_op(Operator::Amp)? {
                self.advance()?;
                is_background = true;
            } else if self.at_op(Operator::Semi)? || self.at_op(Operator::Newline)? {
                self.advance()?;
            } else {
                let eof = matches!(self.peek()?.kind, TokenKind::Eof);
                if !eof && !is_terminator(self.peek()?) {
                    return Err(self.err_here(SyntaxError::MissingSeparator)?);
                }
            }
            items.push(Item { and_or: Rc::new(and_or), is_background });
            self.skip_list_separators()?;
        }
        Ok(List(items))
    }

    fn parse_and_or(&mut self) -> Result<AndOrList, ParseError> {
        let first = self.parse_pipeline()?;
        let mut rest = Vec::new();
        loop {
            let op = if self.at_op(Operator::AmpAmp)? {
                AndOr::AndThen
            } else if self.at_op(Operator::OrOr)? {
                AndOr::OrElse
            } else {
                break;
            };
            self.advance()?;
            self.skip_newlines()?;
            rest.push((op, self.parse_pipeline()?));
        }
        Ok(AndOrList { first, rest })
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let mut negated = false;
        while self.peek()?.keyword() == Some(Keyword::Bang) {
            self.advance()?;
            negated = !negated;
        }
        let mut commands = vec![Rc::new(self.parse_command()?)];
        loop {
            // `|&` is treated as `|` at the AST level; the implicit stderr
            // merge it carries is a redirection the executor inserts, not a
            // distinct pipeline shape.
            if self.at_op(Operator::Pipe)? || self.at_op(Operator::PipeAmp)? {
                self.advance()?;
                self.skip_newlines()?;
                commands.push(Rc::new(self.parse_command()?));
            } else {
                break;
            }
        }
        Ok(Pipeline { commands, negated })
    }

    fn parse_command(&mut self) -> Result<Command, ParseError> {
        if let Some(func) = self.try_parse_function_definition()? {
            return Ok(Command::Function(func));
        }
        if self.at_compound_command_start()? {
            return Ok(Command::Compound(self.parse_full_compound_command()?));
        }
        Ok(Command::Simple(self.parse_simple_command()?))
    }

    fn at_compound_command_start(&mut self) -> Result<bool, ParseError> {
        if self.at_op(Operator::LBrace)? || self.at_op(Operator::LParen)? || self.at_op(Operator::DoubleLParen)? {
            return Ok(true);
        }
        if let Some(kw) = self.peek()?.keyword() {
            return Ok(matches!(
                kw,
                Keyword::If | Keyword::While | Keyword::Until | Keyword::For | Keyword::Case | Keyword::Select
            ));
        }
        self.peek_is_literal("[[")
    }

    // ---- function definitions -------------------------------------------

    fn try_parse_function_definition(&mut self) -> Result<Option<FunctionDefinition>, ParseError> {
        if self.peek()?.keyword() == Some(Keyword::Function) {
            self.advance()?;
            if !self.peek_is_word()? {
                return Err(self.err_here(SyntaxError::InvalidFunctionName)?);
            }
            let tok = self.advance()?;
            let name = tok
                .word
                .as_ref()
                .and_then(|w| w.as_literal())
                .filter(|n| is_valid_name(n))
                .ok_or_else(|| self.err_at(SyntaxError::InvalidFunctionName, tok.location.clone()))?;
            if self.at_op(Operator::LParen)? {
                self.advance()?;
                if !self.at_op(Operator::RParen)? {
                    return Err(self.err_here(SyntaxError::InvalidFunctionName)?);
                }
                self.advance()?;
            }
            self.skip_newlines()?;
            let body = self.parse_function_body()?;
            return Ok(Some(FunctionDefinition { name, body: Rc::new(body) }));
        }
        if matches!(self.peek()?.kind, TokenKind::Word) {
            let is_name = self
                .peek()?
                .word
                .as_ref()
                .and_then(|w| w.as_literal())
                .is_some_and(|s| is_valid_name(&s));
            if is_name && self.peek_at(1)?.is_operator(Operator::LParen) && self.peek_at(2)?.is_operator(Operator::RParen) {
                let name_tok = self.advance()?;
                self.advance()?; // (
                self.advance()?; // )
                self.skip_newlines()?;
                let body = self.parse_function_body()?;
                let name = name_tok.word.unwrap().as_literal().unwrap();
                return Ok(Some(FunctionDefinition { name, body: Rc::new(body) }));
            }
        }
        Ok(None)
    }

    fn parse_function_body(&mut self) -> Result<FullCompoundCommand, ParseError> {
        if !self.at_compound_command_start()? {
            return Err(self.err_here(SyntaxError::MissingFunctionBody)?);
        }
        self.parse_full_compound_command()
    }

    // ---- compound commands ----------------------------------------------

    fn parse_full_compound_command(&mut self) -> Result<FullCompoundCommand, ParseError> {
        let command = self.parse_compound_command()?;
        let (mut redirects, patches) = self.parse_redirect_list()?;
        self.patch_heredocs(&mut redirects, patches);
        Ok(FullCompoundCommand { command, redirects })
    }

    fn parse_compound_command(&mut self) -> Result<CompoundCommand, ParseError> {
        if self.at_op(Operator::LBrace)? {
            return self.parse_brace_group();
        }
        if self.at_op(Operator::LParen)? {
            return self.parse_subshell();
        }
        if self.at_op(Operator::DoubleLParen)? {
            self.advance()?;
            let expr = self.lexer.scan_balanced(2, true)?;
            return Ok(CompoundCommand::ArithmeticEval { expr });
        }
        if let Some(kw) = self.peek()?.keyword() {
            return match kw {
                Keyword::If => self.parse_if(),
                Keyword::While => self.parse_while_or_until(false),
                Keyword::Until => self.parse_while_or_until(true),
                Keyword::For => self.parse_for(),
                Keyword::Case => self.parse_case(),
                Keyword::Select => self.parse_select(),
                _ => Err(self.err_here(SyntaxError::InvalidCommandToken)?),
            };
        }
        if self.peek_is_literal("[[")? {
            return self.parse_enhanced_test();
        }
        Err(self.err_here(SyntaxError::InvalidCommandToken)?)
    }

    fn parse_brace_group(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        let body = self.parse_compound_list(|t| t.is_operator(Operator::RBrace))?;
        if body.0.is_empty() {
            return Err(self.err_at(SyntaxError::EmptyGrouping { opening: opening.clone() }, opening));
        }
        if !self.at_op(Operator::RBrace)? {
            return Err(self.err_at(SyntaxError::UnclosedGrouping { opening: opening.clone() }, opening));
        }
        self.advance()?;
        Ok(CompoundCommand::BraceGroup { body })
    }

    fn parse_subshell(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        let body = self.parse_compound_list(|t| t.is_operator(Operator::RParen))?;
        if body.0.is_empty() {
            return Err(self.err_at(SyntaxError::EmptySubshell { opening: opening.clone() }, opening));
        }
        if !self.at_op(Operator::RParen)? {
            return Err(self.err_at(SyntaxError::UnclosedSubshell { opening: opening.clone() }, opening));
        }
        self.advance()?;
        Ok(CompoundCommand::Subshell { body: Rc::new(body) })
    }

    fn parse_if(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        let condition = self.parse_if_condition(&opening)?;
        let body = self.parse_then_body(&opening)?;
        let mut elifs = Vec::new();
        while self.peek()?.keyword() == Some(Keyword::Elif) {
            self.advance()?;
            let cond = self.parse_if_condition(&opening)?;
            let b = self.parse_then_body(&opening)?;
            elifs.push(ElifThen { condition: cond, body: b });
        }
        let r#else = if self.peek()?.keyword() == Some(Keyword::Else) {
            self.advance()?;
            let e = self.parse_compound_list(|t| t.keyword() == Some(Keyword::Fi))?;
            if e.0.is_empty() {
                return Err(self.err_at(SyntaxError::EmptyBody { opening: opening.clone() }, opening));
            }
            Some(e)
        } else {
            None
        };
        if self.peek()?.keyword() != Some(Keyword::Fi) {
            return Err(self.err_at(SyntaxError::UnclosedIf { opening: opening.clone() }, opening));
        }
        self.advance()?;
        Ok(CompoundCommand::If { condition, body, elifs, r#else })
    }

    fn parse_if_condition(&mut self, opening: &Location) -> Result<List, ParseError> {
        let condition = self.parse_compound_list(|t| t.keyword() == Some(Keyword::Then))?;
        if condition.0.is_empty() {
            return Err(self.err_at(SyntaxError::EmptyCondition { opening: opening.clone() }, opening.clone()));
        }
        if self.peek()?.keyword() != Some(Keyword::Then) {
            return Err(self.err_at(SyntaxError::MissingThen { opening: opening.clone() }, opening.clone()));
        }
        self.advance()?;
        Ok(condition)
    }

    fn parse_then_body(&mut self, opening: &Location) -> Result<List, ParseError> {
        let body = self.parse_compound_list(|t| {
            matches!(t.keyword(), Some(Keyword::Elif) | Some(Keyword::Else) | Some(Keyword::Fi))
        })?;
        if body.0.is_empty() {
            return Err(self.err_at(SyntaxError::EmptyBody { opening: opening.clone() }, opening.clone()));
        }
        Ok(body)
    }

    fn parse_while_or_until(&mut self, until: bool) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        let condition = self.parse_compound_list(|t| t.keyword() == Some(Keyword::Do))?;
        if condition.0.is_empty() {
            return Err(self.err_at(SyntaxError::EmptyCondition { opening: opening.clone() }, opening));
        }
        if self.peek()?.keyword() != Some(Keyword::Do) {
            return Err(self.err_at(SyntaxError::MissingDo { opening: opening.clone() }, opening));
        }
        self.advance()?;
        let body = self.parse_do_body(&opening)?;
        Ok(if until { CompoundCommand::Until { condition, body } } else { CompoundCommand::While { condition, body } })
    }

    fn parse_do_body(&mut self, opening: &Location) -> Result<List, ParseError> {
        let body = self.parse_compound_list(|t| t.keyword() == Some(Keyword::Done))?;
        if body.0.is_empty() {
            return Err(self.err_at(SyntaxError::EmptyLoopBody { opening: opening.clone() }, opening.clone()));
        }
        if self.peek()?.keyword() != Some(Keyword::Done) {
            return Err(self.err_at(SyntaxError::UnclosedDoClause { opening: opening.clone() }, opening.clone()));
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_for(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        if self.at_op(Operator::DoubleLParen)? {
            return self.parse_c_for(&opening);
        }
        if !self.peek_is_word()? {
            return Err(self.err_at(SyntaxError::MissingForName, opening));
        }
        let tok = self.advance()?;
        let name = tok
            .word
            .as_ref()
            .and_then(|w| w.as_literal())
            .filter(|n| is_valid_name(n))
            .ok_or_else(|| self.err_at(SyntaxError::InvalidForName, tok.location.clone()))?;
        self.skip_list_separators()?;
        let items = self.parse_optional_in_list()?;
        if self.peek()?.keyword() != Some(Keyword::Do) {
            return Err(self.err_at(SyntaxError::MissingInOrDo, opening));
        }
        self.advance()?;
        let body = self.parse_do_body(&opening)?;
        Ok(CompoundCommand::ForIn { name, items, body })
    }

    fn parse_c_for(&mut self, opening: &Location) -> Result<CompoundCommand, ParseError> {
        self.advance()?; // `((`
        let raw = self.lexer.scan_balanced(2, true)?;
        let mut parts = raw.splitn(3, ';');
        let init = non_empty(parts.next().unwrap_or("").trim());
        let cond = non_empty(parts.next().unwrap_or("").trim());
        let update = non_empty(parts.next().unwrap_or("").trim());
        self.skip_list_separators()?;
        if self.peek()?.keyword() != Some(Keyword::Do) {
            return Err(self.err_at(SyntaxError::MissingDo { opening: opening.clone() }, opening.clone()));
        }
        self.advance()?;
        let body = self.parse_do_body(opening)?;
        Ok(CompoundCommand::CForLoop { init, cond, update, body })
    }

    fn parse_optional_in_list(&mut self) -> Result<Option<Vec<crate::word::Word>>, ParseError> {
        if self.peek()?.keyword() == Some(Keyword::In) {
            self.advance()?;
            let mut words = Vec::new();
            while self.peek_is_word()? {
                words.push(self.advance()?.word.unwrap());
            }
            self.skip_list_separators()?;
            Ok(Some(words))
        } else {
            Ok(None)
        }
    }

    fn parse_select(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        if !self.peek_is_word()? {
            return Err(self.err_at(SyntaxError::MissingForName, opening));
        }
        let tok = self.advance()?;
        let name = tok
            .word
            .as_ref()
            .and_then(|w| w.as_literal())
            .filter(|n| is_valid_name(n))
            .ok_or_else(|| self.err_at(SyntaxError::InvalidForName, tok.location.clone()))?;
        self.skip_list_separators()?;
        let items = self.parse_optional_in_list()?;
        if self.peek()?.keyword() != Some(Keyword::Do) {
            return Err(self.err_at(SyntaxError::MissingInOrDo, opening));
        }
        self.advance()?;
        let body = self.parse_do_body(&opening)?;
        Ok(CompoundCommand::Select { name, items, body })
    }

    fn parse_case(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?;
        if !self.peek_is_word()? {
            return Err(self.err_at(SyntaxError::MissingCaseSubject, opening));
        }
        let subject = self.advance()?.word.unwrap();
        self.skip_list_separators()?;
        if self.peek()?.keyword() != Some(Keyword::In) {
            return Err(self.err_at(SyntaxError::MissingIn { opening: opening.clone() }, opening));
        }
        self.advance()?;
        self.skip_list_separators()?;
        let mut items = Vec::new();
        while self.peek()?.keyword() != Some(Keyword::Esac) && !matches!(self.peek()?.kind, TokenKind::Eof) {
            items.push(self.parse_case_item()?);
            self.skip_list_separators()?;
        }
        if self.peek()?.keyword() != Some(Keyword::Esac) {
            return Err(self.err_at(SyntaxError::UnclosedCase { opening: opening.clone() }, opening));
        }
        self.advance()?;
        Ok(CompoundCommand::Case { subject, items })
    }

    fn parse_case_item(&mut self) -> Result<CaseItem, ParseError> {
        if self.at_op(Operator::LParen)? {
            self.advance()?;
        }
        let mut patterns = Vec::new();
        loop {
            if !self.peek_is_word()? {
                return Err(self.err_here(SyntaxError::UnexpectedToken)?);
            }
            patterns.push(self.advance()?.word.unwrap());
            if self.at_op(Operator::Pipe)? {
                self.advance()?;
                continue;
            }
            break;
        }
        if !self.at_op(Operator::RParen)? {
            return Err(self.err_here(SyntaxError::MissingCaseItemCloseParen)?);
        }
        self.advance()?;
        let body = self.parse_compound_list(|t| {
            t.is_operator(Operator::SemiSemi)
                || t.is_operator(Operator::SemiAmp)
                || t.is_operator(Operator::SemiSemiAmp)
                || t.keyword() == Some(Keyword::Esac)
        })?;
        let terminator = if self.at_op(Operator::SemiSemi)? {
            self.advance()?;
            CaseTerminator::Break
        } else if self.at_op(Operator::SemiAmp)? {
            self.advance()?;
            CaseTerminator::FallThrough
        } else if self.at_op(Operator::SemiSemiAmp)? {
            self.advance()?;
            CaseTerminator::Continue
        } else {
            CaseTerminator::Break
        };
        Ok(CaseItem { patterns, body, terminator })
    }

    // ---- `[[ ... ]]` enhanced test ---------------------------------------

    fn parse_enhanced_test(&mut self) -> Result<CompoundCommand, ParseError> {
        let opening = self.peek()?.location.clone();
        self.advance()?; // "[["
        if self.peek_is_literal("]]")? {
            return Err(self.err_at(SyntaxError::EmptyTestExpr { opening: opening.clone() }, opening));
        }
        let expr = self.parse_test_or(&opening)?;
        if !self.peek_is_literal("]]")? {
            return Err(self.err_at(SyntaxError::UnclosedTestExpr { opening: opening.clone() }, opening));
        }
        self.advance()?;
        Ok(CompoundCommand::EnhancedTest { expr })
    }

    fn parse_test_or(&mut self, opening: &Location) -> Result<TestExpr, ParseError> {
        let mut left = self.parse_test_and(opening)?;
        while self.at_op(Operator::OrOr)? {
            self.advance()?;
            left = TestExpr::Or(Box::new(left), Box::new(self.parse_test_and(opening)?));
        }
        Ok(left)
    }

    fn parse_test_and(&mut self, opening: &Location) -> Result<TestExpr, ParseError> {
        let mut left = self.parse_test_unary(opening)?;
        while self.at_op(Operator::AmpAmp)? {
            self.advance()?;
            left = TestExpr::And(Box::new(left), Box::new(self.parse_test_unary(opening)?));
        }
        Ok(left)
    }

    fn parse_test_unary(&mut self, opening: &Location) -> Result<TestExpr, ParseError> {
        if self.peek()?.keyword() == Some(Keyword::Bang) {
            self.advance()?;
            return Ok(TestExpr::Not(Box::new(self.parse_test_unary(opening)?)));
        }
        if self.at_op(Operator::LParen)? {
            self.advance()?;
            let inner = self.parse_test_or(opening)?;
            if !self.at_op(Operator::RParen)? {
                return Err(self.err_at(SyntaxError::UnclosedTestExpr { opening: opening.clone() }, opening.clone()));
            }
            self.advance()?;
            return Ok(TestExpr::Group(Box::new(inner)));
        }
        if let Some(lit) = self.peek_literal_word()? {
            if let Some(op) = unary_test_op(&lit) {
                self.advance()?;
                if !self.peek_is_word()? {
                    return Err(self.err_here(SyntaxError::UnexpectedToken)?);
                }
                let operand = self.advance()?.word.unwrap();
                return Ok(TestExpr::Unary(op, operand));
            }
        }
        self.parse_test_primary_or_binary()
    }

    fn parse_test_primary_or_binary(&mut self) -> Result<TestExpr, ParseError> {
        if !self.peek_is_word()? {
            return Err(self.err_here(SyntaxError::UnexpectedToken)?);
        }
        let left = self.advance()?.word.unwrap();
        let binary = if self.at_op(Operator::Less)? {
            self.advance()?;
            Some(TestBinaryOp::StrLt)
        } else if self.at_op(Operator::Greater)? {
            self.advance()?;
            Some(TestBinaryOp::StrGt)
        } else if let Some(op) = self.peek_literal_word()?.as_deref().and_then(binary_test_op) {
            self.advance()?;
            Some(op)
        } else {
            None
        };
        match binary {
            Some(op) => {
                if !self.peek_is_word()? {
                    return Err(self.err_here(SyntaxError::UnexpectedToken)?);
                }
                let right = self.advance()?.word.unwrap();
                Ok(TestExpr::Binary(Box::new(TestExpr::Word(left)), op, Box::new(TestExpr::Word(right))))
            }
            None => Ok(TestExpr::Word(left)),
        }
    }

    // ---- simple commands, assignments, redirects -------------------------

    fn parse_simple_command(&mut self) -> Result<SimpleCommand, ParseError> {
        let mut assigns = Vec::new();
        let mut words = Vec::new();
        let mut redirects = Vec::new();
        let mut heredoc_patches = Vec::new();
        let mut seen_word = false;
        loop {
            if let Some(key) = self.try_parse_one_redirect(&mut redirects)? {
                heredoc_patches.push((redirects.len() - 1, key));
                continue;
            }
            if !seen_word {
                if let Some(assign) = self.try_parse_assignment()? {
                    assigns.push(assign);
                    continue;
                }
            }
            if self.peek_is_word()? {
                let tok = self.advance()?;
                words.push(tok.word.unwrap());
                seen_word = true;
                continue;
            }
            break;
        }
        self.patch_heredocs(&mut redirects, heredoc_patches);
        Ok(SimpleCommand { assigns, words, redirects, background: false })
    }

    fn try_parse_assignment(&mut self) -> Result<Option<Assign>, ParseError> {
        if !matches!(self.peek()?.kind, TokenKind::Word) {
            return Ok(None);
        }
        let raw = self.peek()?.value.clone();
        let Some((name, index_raw, append, value_raw)) = split_assignment(&raw) else {
            return Ok(None);
        };
        let name = name.to_owned();
        let index_raw = index_raw.map(str::to_owned);
        let value_raw = value_raw.to_owned();
        let tok = self.advance()?;
        let location = tok.location.clone();
        let index = match &index_raw {
            Some(s) => Some(self.lexer.lex_word_text(s)?),
            None => None,
        };
        let is_array_literal_start =
            value_raw.is_empty() && self.at_op(Operator::LParen)? && self.peek()?.adjacent_to_previous;
        let value = if is_array_literal_start {
            self.parse_array_literal()?
        } else {
            AssignValue::Scalar(self.lexer.lex_word_text(&value_raw)?)
        };
        Ok(Some(Assign { name, index, append, value, location }))
    }

    fn parse_array_literal(&mut self) -> Result<AssignValue, ParseError> {
        self.advance()?; // "("
        self.skip_newlines()?;
        let mut indexed = Vec::new();
        let mut assoc = Vec::new();
        let mut is_assoc = false;
        loop {
            self.skip_newlines()?;
            if self.at_op(Operator::RParen)? {
                break;
            }
            if !self.peek_is_word()? {
                return Err(self.err_here(SyntaxError::UnexpectedToken)?);
            }
            let raw = self.peek()?.value.clone();
            if let Some(keyed) = parse_assoc_element(&raw) {
                let (key_raw, val_raw) = keyed;
                self.advance()?;
                let key = self.lexer.lex_word_text(key_raw)?;
                let val = self.lexer.lex_word_text(val_raw)?;
                assoc.push((key, val));
                is_assoc = true;
                continue;
            }
            indexed.push(self.advance()?.word.unwrap());
        }
        self.advance()?; // ")"
        Ok(if is_assoc { AssignValue::AssocArray(assoc) } else { AssignValue::IndexedArray(indexed) })
    }

    fn parse_redirect_list(&mut self) -> Result<(Vec<Redirect>, Vec<(usize, HeredocKey)>), ParseError> {
        let mut redirects = Vec::new();
        let mut patches = Vec::new();
        while let Some(key) = self.try_parse_one_redirect(&mut redirects)? {
            patches.push((redirects.len() - 1, key));
        }
        Ok((redirects, patches))
    }

    /// Tries to parse one `[n]OP target` redirection, appending it to
    /// `redirects`. Returns `Some(key)` when it was a heredoc redirection
    /// still awaiting its body (the parser must record `(redirects.len() -
    /// 1, key)` for a later [`Self::patch_heredocs`] call).
    fn try_parse_one_redirect(&mut self, redirects: &mut Vec<Redirect>) -> Result<Option<HeredocKey>, ParseError> {
        let fd_prefix = matches!(self.peek()?.kind, TokenKind::IoNumber);
        let op_depth = if fd_prefix { 1 } else { 0 };
        let is_redir = matches!(&self.peek_at(op_depth)?.kind, TokenKind::Op(op) if redir_op_for(*op).is_some() || matches!(op, Operator::LessLess | Operator::LessLessDash));
        if !is_redir {
            return Ok(None);
        }
        let fd = if fd_prefix {
            let tok = self.advance()?;
            let n: i32 = tok
                .value
                .parse()
                .map_err(|_| self.err_at(SyntaxError::FdOutOfRange, tok.location.clone()))?;
            Some(Fd::Raw(n))
        } else {
            None
        };
        let op_tok = self.advance()?;
        let TokenKind::Op(op) = op_tok.kind else { unreachable!("checked above") };
        if matches!(op, Operator::LessLess | Operator::LessLessDash) {
            let key = op_tok.heredoc_key.expect("heredoc operator token always carries its key");
            let (delimiter, remove_tabs, quoted_delimiter) = self
                .lexer
                .pending_heredoc_info(key)
                .expect("pending heredoc entry exists until the next Newline token");
            let doc = HereDoc { delimiter, remove_tabs, quoted_delimiter, content: String::new() };
            redirects.push(Redirect { fd, op: RedirOp::HereDoc, target: RedirTarget::HereDoc(Rc::new(doc)) });
            return Ok(Some(key));
        }
        let redir_op = redir_op_for(op).expect("checked above");
        let target = self.parse_redirect_target(redir_op)?;
        redirects.push(Redirect { fd, op: redir_op, target });
        Ok(None)
    }

    fn parse_redirect_target(&mut self, redir_op: RedirOp) -> Result<RedirTarget, ParseError> {
        if matches!(redir_op, RedirOp::FdIn | RedirOp::FdOut) && self.peek_is_literal("-")? {
            self.advance()?;
            return Ok(RedirTarget::Close);
        }
        if !self.peek_is_word()? {
            return Err(self.err_here(SyntaxError::MissingRedirOperand)?);
        }
        Ok(RedirTarget::Word(self.advance()?.word.unwrap()))
    }

    fn patch_heredocs(&self, redirects: &mut [Redirect], patches: Vec<(usize, HeredocKey)>) {
        for (idx, key) in patches {
            if let RedirTarget::HereDoc(old) = &redirects[idx].target {
                let content = self.lexer.heredoc_body(key).unwrap_or("").to_owned();
                let new_doc = HereDoc {
                    delimiter: old.delimiter.clone(),
                    remove_tabs: old.remove_tabs,
                    quoted_delimiter: old.quoted_delimiter,
                    content,
                };
                redirects[idx].target = RedirTarget::HereDoc(Rc::new(new_doc));
            }
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

fn redir_op_for(op: Operator) -> Option<RedirOp> {
    use Operator::*;
    Some(match op {
        Less => RedirOp::FileIn,
        LessGreater => RedirOp::FileInOut,
        Greater => RedirOp::FileOut,
        GreaterGreater => RedirOp::FileAppend,
        GreaterPipe => RedirOp::FileClobber,
        LessAmp => RedirOp::FdIn,
        GreaterAmp => RedirOp::FdOut,
        LessLessLess => RedirOp::HereString,
        _ => return None,
    })
}

fn unary_test_op(s: &str) -> Option<TestUnaryOp> {
    use TestUnaryOp::*;
    Some(match s {
        "-f" => IsFile,
        "-d" => IsDir,
        "-e" => Exists,
        "-r" => IsReadable,
        "-w" => IsWritable,
        "-x" => IsExecutable,
        "-s" => IsNonEmpty,
        "-z" => IsEmptyString,
        "-n" => IsNonEmptyString,
        _ => return None,
    })
}

fn binary_test_op(s: &str) -> Option<TestBinaryOp> {
    use TestBinaryOp::*;
    Some(match s {
        "==" | "=" => StrEq,
        "!=" => StrNe,
        "=~" => StrMatch,
        "-eq" => NumEq,
        "-ne" => NumNe,
        "-lt" => NumLt,
        "-le" => NumLe,
        "-gt" => NumGt,
        "-ge" => NumGe,
        _ => return None,
    })
}

/// True for valid POSIX `name`s: a leading letter or underscore, then any
/// run of letters, digits and underscores.
fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Splits a token's raw source text into an assignment's `name`, optional
/// `[index]`, `+=`-vs-`=` flag, and the value text following `=`. `None`
/// unless the text is unambiguously of the form `name=...`,
/// `name[index]=...` or the `+=` variants — anything else (including a
/// quoted or partially-quoted name) is left for [`Parser::parse_simple_command`]
/// to read as a plain word, which is what a real shell does for the common
/// case; names with an embedded quote (`na"me"=x`) are not recognized as
/// assignments, a narrow simplification against full POSIX generality.
fn split_assignment(raw: &str) -> Option<(&str, Option<&str>, bool, &str)> {
    let mut first = raw.chars();
    match first.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return None,
    }
    let name_end = raw
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    let name = &raw[..name_end];
    let mut rest = &raw[name_end..];
    let mut index = None;
    if let Some(r) = rest.strip_prefix('[') {
        let mut depth = 1;
        let mut end = None;
        for (i, c) in r.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end?;
        index = Some(&r[..end]);
        rest = &r[end + 1..];
    }
    let append = rest.starts_with("+=");
    if !append && !rest.starts_with('=') {
        return None;
    }
    let value = &rest[if append { 2 } else { 1 }..];
    Some((name, index, append, value))
}

/// Recognizes a `[key]=value` associative-array element inside an array
/// literal's raw token text.
fn parse_assoc_element(raw: &str) -> Option<(&str, &str)> {
    let r = raw.strip_prefix('[')?;
    let end = r.find(']')?;
    let rest = &r[end + 1..];
    let val = rest.strip_prefix('=')?;
    Some((&r[..end], val))
}
