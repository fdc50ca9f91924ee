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

//! Type definitions for job management.

pub mod fmt;
pub mod id;

use crate::semantics::ExitStatus;

#[doc(no_inline)]
pub use crate::trap::Signal;
#[doc(no_inline)]
pub use nix::sys::wait::WaitStatus;
#[doc(no_inline)]
pub use nix::unistd::Pid;

/// Result of a process having halted.
///
/// This is the outcome of a process's execution once it is no longer
/// [running](ProcessState::Running): either it exited with an exit status, it
/// was stopped by a signal (but may resume later), or it was killed by a
/// signal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ProcessResult {
    /// The process exited with the given exit status.
    Exited(ExitStatus),
    /// The process was stopped by the given signal.
    Stopped(Signal),
    /// The process was killed by the given signal.
    Signaled {
        /// Signal that killed the process
        signal: Signal,
        /// Whether the process dumped a core file
        core_dump: bool,
    },
}

impl ProcessResult {
    /// Creates a result for a process that exited with the given exit status.
    #[must_use]
    pub fn exited(exit_status: i32) -> Self {
        ProcessResult::Exited(ExitStatus(exit_status))
    }
}

/// State of a process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessState {
    /// The process is still running (or stopped but may be continued).
    Running,
    /// The process has halted with the contained result.
    Halted(ProcessResult),
}

impl ProcessState {
    /// Creates a state for a process that exited with the given exit status.
    #[must_use]
    pub fn exited(exit_status: i32) -> Self {
        ProcessState::Halted(ProcessResult::exited(exit_status))
    }

    /// Creates a state for a process that was stopped by the given signal.
    #[must_use]
    pub fn stopped(signal: Signal) -> Self {
        ProcessState::Halted(ProcessResult::Stopped(signal))
    }

    /// Whether the process is not yet terminated.
    ///
    /// This function returns `true` for a `Stopped` process since it may
    /// resume and run again.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        match self {
            ProcessState::Running => true,
            ProcessState::Halted(ProcessResult::Stopped(_)) => true,
            ProcessState::Halted(_) => false,
        }
    }
}

impl From<ProcessResult> for ProcessState {
    fn from(result: ProcessResult) -> Self {
        ProcessState::Halted(result)
    }
}

/// Set of one or more processes executing a pipeline
///
/// In the current implementation, a job contains the process ID of one child
/// process of the shell. Though there may be more processes involved in the
/// execution of the pipeline, the shell takes care of only one process of the
/// job.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Job {
    /// Process ID
    pub pid: Pid,

    /// Whether the job is job-controlled.
    ///
    /// If the job is job-controlled, the job process runs in its own process
    /// group.
    pub job_controlled: bool,

    /// Execution state of the job
    pub state: ProcessState,

    /// Whether `state` has changed since the last report to the user.
    pub state_changed: bool,

    /// String representation of this process
    pub name: String,

    /// Whether this job is still owned by the shell that started it.
    ///
    /// A subshell starts with none of the parent's jobs owned, so that the
    /// subshell does not report on jobs it did not start.
    pub is_owned: bool,
}

impl Job {
    /// Creates a new job instance.
    ///
    /// This function requires a process ID to initialize the new job. The other
    /// members of the job are defaulted.
    #[must_use]
    pub fn new(pid: Pid) -> Self {
        Job {
            pid,
            job_controlled: false,
            state: ProcessState::Running,
            state_changed: false,
            name: String::new(),
            is_owned: true,
        }
    }
}

/// Collection of jobs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobSet {
    /// Jobs indexed by job number minus one.
    ///
    /// A slot is `None` once the job it held has been removed, so that the
    /// indices (and therefore job numbers) of the remaining jobs are stable.
    jobs: Vec<Option<Job>>,

    /// Index of the current job, if any.
    current_job: Option<usize>,

    /// Index of the previous job, if any.
    previous_job: Option<usize>,

    /// Process ID of the most recently executed asynchronous command.
    last_async_pid: Pid,
}

impl Default for JobSet {
    fn default() -> Self {
        JobSet {
            jobs: Vec::new(),
            current_job: None,
            previous_job: None,
            last_async_pid: Pid::from_raw(0),
        }
    }
}

impl JobSet {
    /// Adds a job to the set and returns its index.
    ///
    /// The added job becomes the [current job](Self::current_job); the
    /// previously current job (if any) becomes the
    /// [previous job](Self::previous_job).
    pub fn add(&mut self, job: Job) -> usize {
        let index = self.jobs.len();
        self.jobs.push(Some(job));
        self.previous_job = self.current_job;
        self.current_job = Some(index);
        index
    }

    /// Removes the job at the given index, if any.
    ///
    /// The index of any remaining job is unaffected.
    pub fn remove(&mut self, index: usize) -> Option<Job> {
        let job = self.jobs.get_mut(index).and_then(Option::take);
        if self.current_job == Some(index) {
            self.current_job = self.previous_job.take();
        } else if self.previous_job == Some(index) {
            self.previous_job = None;
        }
        job
    }

    /// Returns a reference to the job at the given index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index).and_then(Option::as_ref)
    }

    /// Returns a mutable reference to the job at the given index.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Job> {
        self.jobs.get_mut(index).and_then(Option::as_mut)
    }

    /// Returns an iterator over the indices and jobs in this set.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs
            .iter()
            .enumerate()
            .filter_map(|(index, job)| job.as_ref().map(|job| (index, job)))
    }

    /// Returns the number of jobs in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns whether this set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the index of the current job, if any.
    #[must_use]
    pub fn current_job(&self) -> Option<usize> {
        self.current_job
    }

    /// Returns the index of the previous job, if any.
    #[must_use]
    pub fn previous_job(&self) -> Option<usize> {
        self.previous_job
    }

    /// Marks every job in this set as not owned.
    ///
    /// This is called when entering a subshell so that the jobs started by
    /// an ancestor shell are not reported on by the subshell.
    pub fn disown_all(&mut self) {
        for job in self.jobs.iter_mut().flatten() {
            job.is_owned = false;
        }
    }

    /// Returns the process ID of the most recently executed asynchronous
    /// command.
    ///
    /// This function returns the value that has been set by
    /// [`set_last_async_pid`](Self::set_last_async_pid), or 0 if no value has
    /// been set.
    ///
    /// When expanding the special parameter `$!`, you must use
    /// [`expand_last_async_pid`](Self::expand_last_async_pid) instead of this
    /// function.
    pub fn last_async_pid(&self) -> Pid {
        self.last_async_pid
    }

    /// Returns the process ID of the most recently executed asynchronous
    /// command.
    ///
    /// This function is similar to [`last_async_pid`](Self::last_async_pid),
    /// but also updates an internal flag so that the asynchronous command is
    /// not disowned too soon.
    ///
    /// TODO Elaborate on automatic disowning
    pub fn expand_last_async_pid(&mut self) -> Pid {
        // TODO Keep the async process from being disowned.
        self.last_async_pid
    }

    /// Sets the process ID of the most recently executed asynchronous command.
    ///
    /// This function affects the result of
    /// [`last_async_pid`](Self::last_async_pid).
    pub fn set_last_async_pid(&mut self, pid: Pid) {
        self.last_async_pid = pid;
    }
}

impl std::ops::Index<usize> for JobSet {
    type Output = Job;
    fn index(&self, index: usize) -> &Job {
        self.get(index).expect("no job at this index")
    }
}

impl std::ops::IndexMut<usize> for JobSet {
    fn index_mut(&mut self, index: usize) -> &mut Job {
        self.get_mut(index).expect("no job at this index")
    }
}
