// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2025 WATANABE Yuki
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Shell language parser configuration and utilities
//!
//! This module contains several items related to the shell language parser.
//!
//! - [`Config`] is a struct that holds configuration options for the parser.
//! - [`IsKeyword`] is a wrapper for a function that checks if a string is a
//!   reserved word.
//! - [`is_name`] is a function that checks if a string is a valid variable
//!   name.

use crate::Env;
use crate::source::Source;
use derive_more::Debug;
use psh_syntax::input::Input;
use psh_syntax::lexer::Lexer;

/// Tests whether `s` is a valid POSIX variable/function name: a leading
/// letter or underscore followed by letters, digits, or underscores.
#[must_use]
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Configuration for the parser
///
/// This struct holds configuration for constructing a [`Lexer`]: the input
/// function to read source code from and the source information to attach to
/// the resulting AST.
///
/// Parser implementations are not provided in this crate (`psh-env`). The
/// standard parser implementation is provided in the `psh-syntax` crate.
/// `Config` is provided here so that other crates can use [`RunReadEvalLoop`]
/// without depending on `psh-syntax` directly.
///
/// [`RunReadEvalLoop`]: crate::semantics::RunReadEvalLoop
#[derive(Debug)]
#[non_exhaustive]
pub struct Config {
    /// Input function to read source code
    #[debug(skip)]
    pub input: Box<dyn Input>,

    /// Source information for the input
    ///
    /// If not set, `Source::Unknown` is used.
    pub source: Option<Source>,
}

impl Config {
    /// Creates a `Config` with the given input function.
    #[must_use]
    pub fn with_input(input: Box<dyn Input>) -> Self {
        Self {
            input,
            source: None,
        }
    }

    /// Creates a lexer using this configuration.
    pub fn into_lexer(self) -> Lexer {
        Lexer::new(self.input, self.source.unwrap_or(Source::Unknown))
    }
}

impl From<Config> for Lexer {
    fn from(config: Config) -> Self {
        config.into_lexer()
    }
}

/// Wrapper for a function that checks if a string is a keyword
///
/// This struct wraps a function that takes an environment and a string, and
/// returns `true` if the string is a shell reserved word (keyword) in the given
/// environment. An implementation of the function should be provided and stored
/// in the environment's [`any`](Env::any) storage. This allows modules that
/// need to check for keywords to do so without directly depending on the parser
/// crate (`psh-syntax`).
#[derive(Clone, Copy, Debug)]
pub struct IsKeyword(pub fn(&Env, &str) -> bool);
