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

//! This crate defines the shell execution environment.
//!
//! A shell execution environment is a collection of data that may affect or be
//! affected by execution of commands. The environment consists of
//! application-managed parts and system-managed parts. Application-managed
//! parts are implemented in pure Rust in this crate. Many application-managed
//! parts like [function]s and [variable]s can be manipulated independently of
//! interactions with the underlying system. System-managed parts, on the other
//! hand, depend on the underlying system. Attributes like the working directory
//! and umask are managed by the system, so they can be accessed only by
//! interaction with the system interface.
//!
//! This crate implements component C7 of the core pipeline (shell state and
//! scope): variables, functions, options, traps, the job table, and the
//! [`System`] trait that abstracts over the OS. It re-exports `unix_path`
//! and `unix_str` as [`path`] and [`str`] so the rest of the shell can name
//! filesystem paths without depending on those crates directly.

pub mod any;
pub mod async_system;
pub mod decl_util;
pub mod expansion;
pub mod function;
pub mod input;
pub mod io;
pub mod job;
pub mod option;
pub mod parser;
pub mod pwd;
pub mod semantics;
pub mod signal;
pub mod stack;
pub mod subshell;
pub mod system;
pub mod trap;
pub mod variable;

pub use psh_syntax::source;
pub use system::{SharedSystem, System};
#[cfg(unix)]
pub use system::real::RealSystem;
pub use system::r#virtual::VirtualSystem;
pub use unix_path as path;
pub use unix_str as str;

use self::function::FunctionSet;
use self::job::{JobSet, Pid};
use self::option::OptionSet;
use self::semantics::ExitStatus;
use self::stack::Stack;
use self::system::System as _;
use self::trap::TrapSet;
use self::variable::VariableSet;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/// Child process started by [`System::new_child_process`].
///
/// Implementations run some task in the child process and report the child's
/// PID back to the parent. A [`RealSystem`] implementation actually forks;
/// a [`VirtualSystem`] implementation simulates the fork in-process.
#[async_trait::async_trait(?Send)]
pub trait ChildProcess: Debug {
    /// Runs the child process task.
    ///
    /// In the parent, this returns the real or simulated PID of the child
    /// without running `task`. In the child, this runs `task` to completion
    /// and then never returns (the process exits).
    async fn run(
        &mut self,
        env: &mut Env,
        task: Box<dyn for<'a> FnMut(&'a mut Env) -> Pin<Box<dyn Future<Output = ()> + 'a>>>,
    ) -> Pid;
}

/// Whole shell execution environment.
///
/// The shell execution environment consists of application-managed parts and
/// system-managed parts. Application-managed parts are directly implemented in
/// the `Env` instance. System-managed parts are accessed through [`system`].
#[derive(Clone, Debug)]
pub struct Env {
    /// Arbitrary extra data attached to the environment.
    ///
    /// This is how modules outside this crate (e.g. the tree-walking
    /// executor) plug functionality into `Env` without this crate knowing
    /// about them. See [`any`] for details.
    pub any: any::DataSet,

    /// Functions defined in the environment.
    pub functions: FunctionSet,

    /// Variables defined in the environment.
    pub variables: VariableSet,

    /// Shell options such as `interactive` and `monitor`.
    pub options: OptionSet,

    /// Traps (signal and non-signal event handlers) registered in the
    /// environment.
    pub traps: TrapSet,

    /// Jobs started from the environment.
    pub jobs: JobSet,

    /// Stack of frames tracking what the executor is currently doing.
    pub stack: Stack,

    /// Exit status of the last executed command.
    pub exit_status: ExitStatus,

    /// Interface to the underlying system.
    pub system: system::SharedSystem,
}

impl Env {
    /// Creates a new environment with the given system interface.
    ///
    /// The system is boxed and wrapped in a [`SharedSystem`] so it can be
    /// shared between the environment and asynchronous tasks spawned from it.
    pub fn with_system<S: system::System + 'static>(system: S) -> Self {
        Env {
            any: any::DataSet::default(),
            functions: FunctionSet::default(),
            variables: VariableSet::default(),
            options: OptionSet::default(),
            traps: TrapSet::default(),
            jobs: JobSet::default(),
            stack: Stack::default(),
            exit_status: ExitStatus::default(),
            system: system::SharedSystem::new(Box::new(system)),
        }
    }

    /// Creates a new environment backed by a [`VirtualSystem`].
    pub fn new_virtual() -> Self {
        Self::with_system(VirtualSystem::default())
    }

    /// Creates a copy of this environment that uses a different system.
    ///
    /// This is used when starting a child process in a [`VirtualSystem`],
    /// where the child needs its own `Env` sharing everything but the system
    /// interface with the parent.
    pub fn clone_with_system<S: system::System + 'static>(&self, system: S) -> Self {
        Env {
            system: system::SharedSystem::new(Box::new(system)),
            ..self.clone()
        }
    }

    /// Returns whether error messages should be printed in color.
    ///
    /// This currently always defers to whether the standard error is
    /// connected to a terminal; a full implementation would also consult the
    /// `NO_COLOR`/`CLICOLOR_FORCE` environment variables.
    pub fn should_print_error_in_color(&self) -> bool {
        use self::io::Fd;
        self.system.isatty(Fd::STDERR).unwrap_or(false)
    }
}

/// Helpers shared by this crate's test modules.
#[cfg(test)]
pub mod tests {
    use crate::system::r#virtual::{FileBody, SystemState};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Reads the content of `/dev/stderr` from a virtual system and hands it
    /// to `f` as a UTF-8 string.
    pub fn assert_stderr<F>(state: &Rc<RefCell<SystemState>>, f: F)
    where
        F: FnOnce(&str),
    {
        let state = state.borrow();
        let file = state.file_system.get("/dev/stderr").unwrap();
        let file = file.borrow();
        match &file.body {
            FileBody::Regular { content, .. } => f(std::str::from_utf8(content).unwrap()),
            _ => panic!("/dev/stderr is not a regular file"),
        }
    }
}
