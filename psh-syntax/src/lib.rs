//! Syntax layer of the shell core: character stream tracking (C1), the
//! lexer (C2), the Word AST (C3) and the recursive-descent parser (C4).
//!
//! Everything downstream (expansion, execution, job control) lives in
//! `psh-semantics` and `psh-env`; this crate only turns source text into an
//! AST and is free of any notion of a running shell.

pub mod ast;
pub mod error;
pub mod input;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod token;
pub mod word;

pub use ast::{Command, CompoundCommand, List, StatementList};
pub use error::{ParseError, Severity, SyntaxError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use source::{Location, Source};
pub use word::Word;

/// Parses a complete command string into a [`List`], the way `psh`'s `shell`
/// entry point does before handing the result to the executor.
pub fn parse(source_text: &str) -> error::Result<List> {
    let mut lexer = Lexer::with_str(source_text);
    Parser::new(&mut lexer).parse_program()
}
