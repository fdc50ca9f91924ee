// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki
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

//! Defines the [`Reporter`] input decorator.

use crate::option::{Interactive, Monitor, Off};
use crate::Env;
use psh_syntax::input::Input;
use std::cell::RefCell;

/// `Input` decorator that reports job status changes before reading a line
///
/// This decorator is a hook point for printing the status of jobs that have
/// changed since the last report, which is done only when the [`Interactive`]
/// and [`Monitor`] options are both enabled.
#[derive(Clone, Debug)]
pub struct Reporter<'a, 'b, T> {
    inner: T,
    env: &'a RefCell<&'b mut Env>,
}

impl<'a, 'b, T> Reporter<'a, 'b, T> {
    /// Creates a new `Reporter` decorator.
    ///
    /// The first argument is the inner `Input` that performs the actual input
    /// operation. The second argument is the shell environment that contains
    /// the shell option state. It is wrapped in a `RefCell` so that it can be
    /// shared with other decorators and the parser.
    pub fn new(inner: T, env: &'a RefCell<&'b mut Env>) -> Self {
        Self { inner, env }
    }
}

impl<T> Input for Reporter<'_, '_, T>
where
    T: Input,
{
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        report(&self.env.borrow());
        self.inner.next_line()
    }
}

/// Reports job status changes if the shell is interactive and monitoring jobs.
///
/// A full job table with per-job state tracking is outside this crate's
/// scope (job control is driven by the executor), so this currently only
/// gates on the options that would enable such reporting.
fn report(env: &Env) {
    if env.options.get(Interactive) == Off || env.options.get(Monitor) == Off {
        return;
    }
}
