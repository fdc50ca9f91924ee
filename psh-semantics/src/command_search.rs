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

//! Command search.
//!
//! The [command search](search) is part of the execution of a [simple
//! command](psh_syntax::ast::SimpleCommand). It determines a command target
//! that is to be invoked. A [target](Target) is either a shell function or an
//! external utility; built-in utilities are external collaborators and are
//! out of scope here (see [`crate::command::simple_command`]).
//!
//! If the command name contains a slash, the target is always an external
//! utility found at that exact path. Otherwise, the shell first looks for a
//! function of that name, then searches `$PATH` for an executable file.

use crate::Env;
use psh_env::variable::{Expansion, PATH};
use std::ffi::{CStr, CString};
use std::rc::Rc;

/// Target of a simple command execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    /// Shell function
    Function(Rc<psh_env::function::Function>),

    /// External utility
    External {
        /// Path to the external utility.
        ///
        /// The path may not name an existing executable file if the command
        /// name contains a slash; in that case the name is used verbatim.
        path: CString,
    },
}

impl From<Rc<psh_env::function::Function>> for Target {
    fn from(function: Rc<psh_env::function::Function>) -> Target {
        Target::Function(function)
    }
}

/// Part of the shell execution environment command search depends on.
pub trait PathEnv {
    /// Accesses the `$PATH` variable in the environment.
    fn path(&self) -> Expansion<'_>;

    /// Whether there is an executable file at the specified path.
    fn is_executable_file(&self, path: &CStr) -> bool;
}

impl PathEnv for Env {
    fn path(&self) -> Expansion<'_> {
        self.variables
            .get(PATH)
            .and_then(|var| var.value.as_ref())
            .into()
    }

    fn is_executable_file(&self, path: &CStr) -> bool {
        self.system.is_executable_file(path)
    }
}

/// Performs command search.
///
/// Returns `None` if the name is not a defined function and no executable
/// file is found for it in `$PATH` (or, if `name` contains a slash, always
/// returns an external target naming that exact path).
#[must_use]
pub fn search<E: PathEnv>(env: &E, functions: &psh_env::function::FunctionSet, name: &str) -> Option<Target> {
    if name.contains('/') {
        return Some(Target::External {
            path: CString::new(name).ok()?,
        });
    }

    if let Some(function) = functions.get(name) {
        return Some(Rc::clone(function).into());
    }

    search_path(env, name).map(|path| Target::External { path })
}

/// Searches `$PATH` for an executable file named `name`.
#[must_use]
pub fn search_path<E: PathEnv>(env: &E, name: &str) -> Option<CString> {
    path_entries(env.path())
        .into_iter()
        .filter_map(|dir| {
            let mut candidate = dir;
            if !candidate.is_empty() {
                candidate.push('/');
            }
            candidate.push_str(name);
            CString::new(candidate).ok()
        })
        .find(|path| env.is_executable_file(path))
}

/// Splits a `$PATH`-like expansion into directory entries.
///
/// A scalar value is split on `:`; an array value is used element-wise, as
/// bash does for `$PATH` imported as an array quirk.
fn path_entries(expansion: Expansion<'_>) -> Vec<String> {
    match expansion {
        Expansion::Unset => Vec::new(),
        Expansion::Scalar(value) => value.split(':').map(str::to_owned).collect(),
        Expansion::Array(values) => values.into_owned(),
    }
}
