// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2021 WATANABE Yuki
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

//! Word expansion.
//!
//! # Initial expansion
//!
//! TODO Elaborate: Tilde expansion, parameter expansion, command substitution,
//! and arithmetic expansion.
//!
//! # Multi-field expansion
//!
//! Field splitting ([`split`]) and pathname expansion ([`glob`]) turn the
//! [`Phrase`](phrase::Phrase) produced by the initial expansion into any
//! number of fields.
//!
//! # Quote removal
//!
//! [`quote_removal`] and [`attr_strip`] convert the remaining [`AttrChar`]s of
//! each field into plain `String`s.

pub mod attr;
pub mod attr_strip;
pub mod glob;
pub mod phrase;
pub mod quote_removal;
pub mod split;

// TODO `initial` and its submodules (arith, command_subst, param, slice,
// text, tilde, word) are not wired in yet. They depend on crate::Runtime,
// crate::read_eval_loop, and crate::trap::run_exit_trap, none of which exist,
// and initial::param expects a VariableSet::assign(Scope, String, Variable)
// method whose shape does not match psh_env::variable::VariableRefMut::assign.
// Reconciling those is future work.

pub use attr::AttrChar;
pub use attr::AttrField;
pub use attr::Origin;
use psh_syntax::source::Location;

/// Types of errors that may occur in the word expansion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCause {
    // TODO Define error cause types
}

/// Explanation of an expansion failure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub cause: ErrorCause,
    pub location: Location,
}

/// Result of word expansion.
pub type Result<T = ()> = std::result::Result<T, Error>;
