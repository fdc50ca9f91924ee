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

//! Items related to process management

use super::future::FlexFuture;
use super::Result;
use crate::job::{Pid, ProcessState};
use crate::semantics::ExitStatus;
use crate::Env;
use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::future::Future;
use std::pin::Pin;

/// Task to run in a newly forked (or simulated) child process.
///
/// The task is given a mutable reference to the child's environment. It is
/// expected to end by calling [`Exit::exit`], which never returns, hence the
/// `Infallible` output.
pub type ChildProcessTask =
    Box<dyn for<'a> FnOnce(&'a mut Env) -> Pin<Box<dyn Future<Output = Infallible> + 'a>>>;

/// Function that finishes starting a child process created by
/// [`Fork::new_child_process`].
///
/// In the parent, calling this starter runs `task` in the child (for a
/// virtual system, concurrently in the same process; for a real system, after
/// forking) and resolves to the child's process ID once the child has been
/// started.
pub type ChildProcessStarter =
    Box<dyn FnOnce(&mut Env, ChildProcessTask) -> Pin<Box<dyn Future<Output = Pid>>>>;

/// Trait for getting the current process ID and other process-related information
pub trait GetPid {
    /// Returns the process ID of the current process.
    ///
    /// This method represents the [`getpid` system
    /// call](https://pubs.opengroup.org/onlinepubs/9799919799/functions/getpid.html).
    #[must_use]
    fn getpid(&self) -> Pid;

    /// Returns the process ID of the parent process.
    ///
    /// This method represents the [`getppid` system
    /// call](https://pubs.opengroup.org/onlinepubs/9799919799/functions/getppid.html).
    #[must_use]
    fn getppid(&self) -> Pid;

    /// Returns the process group ID of the current process.
    ///
    /// This method represents the [`getpgrp` system
    /// call](https://pubs.opengroup.org/onlinepubs/9799919799/functions/getpgrp.html).
    #[must_use]
    fn getpgrp(&self) -> Pid;

    /// Returns the session ID of the specified process.
    ///
    /// If `pid` is `Pid(0)`, this function returns the session ID of the
    /// current process.
    fn getsid(&self, pid: Pid) -> Result<Pid>;
}

/// Trait for modifying the process group ID of processes
pub trait SetPgid {
    /// Modifies the process group ID of a process.
    ///
    /// This method represents the [`setpgid` system
    /// call](https://pubs.opengroup.org/onlinepubs/9799919799/functions/setpgid.html).
    ///
    /// `pid` specifies the process whose process group ID is to be changed. If `pid` is
    /// `Pid(0)`, the current process is used.
    /// `pgid` specifies the new process group ID to be set. If `pgid` is
    /// `Pid(0)`, the process ID of the specified process is used.
    fn setpgid(&self, pid: Pid, pgid: Pid) -> Result<()>;
}

/// Trait for creating a child process.
///
/// On a real system, this represents the `fork` system call. On a virtual
/// system, no real process is created; the returned starter instead runs the
/// child's task concurrently within the same process.
pub trait Fork {
    fn new_child_process(&mut self) -> Result<ChildProcessStarter>;
}

/// Trait for waiting for a child process to change state.
///
/// This represents a non-blocking `waitpid` call: `target` is the process ID
/// to wait for (or `Pid(-1)` for any child), and `Ok(None)` means no state
/// change has happened yet.
pub trait Wait {
    fn wait(&mut self, target: Pid) -> Result<Option<(Pid, ProcessState)>>;
}

/// Trait for replacing the current process image.
///
/// This represents the `execve` system call. On success, the process image
/// is replaced and this function never returns to the caller, hence the
/// `Infallible` success type. On a virtual system, this cannot actually
/// happen, so the returned future only ever resolves to an error.
pub trait Exec {
    fn execve(
        &mut self,
        path: &CStr,
        args: &[CString],
        envs: &[CString],
    ) -> FlexFuture<Result<Infallible>>;
}

/// Trait for terminating the current process.
///
/// This represents the `_exit` system call (or, in a virtual system,
/// recording the exit status and suspending the current task forever).
pub trait Exit {
    fn exit(&mut self, exit_status: ExitStatus) -> FlexFuture<Infallible>;
}
