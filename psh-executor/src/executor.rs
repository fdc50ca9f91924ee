// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki

//! Implementation of `Executor`

use crate::forwarder::Receiver;
use crate::{Executor, SpawnError, Spawner};
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::future::{Future, IntoFuture};
use core::pin::Pin;

impl<'a> Executor<'a> {
    /// Creates a new `Executor` with an empty task queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tasks currently waiting to be polled.
    #[must_use]
    pub fn wake_count(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Returns a [`Spawner`] that spawns tasks onto this executor.
    #[must_use]
    pub fn spawner(&self) -> Spawner<'a> {
        Spawner {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Adds the given future to the task queue so it will be polled when the
    /// executor is run. See [`Spawner::spawn_pinned`] for details.
    ///
    /// # Safety
    ///
    /// See [`Spawner::spawn_pinned`].
    pub unsafe fn spawn_pinned(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + 'a>>,
    ) -> Result<(), SpawnError<Pin<Box<dyn Future<Output = ()> + 'a>>>> {
        // Safety: delegated to the caller of this method.
        unsafe { self.spawner().spawn_pinned(future) }
    }

    /// Adds the given future to the task queue so it will be polled when the
    /// executor is run. See [`Spawner::spawn`] for details.
    ///
    /// # Safety
    ///
    /// See [`Spawner::spawn`].
    pub unsafe fn spawn<F, T>(&self, future: F) -> Result<Receiver<T>, SpawnError<F>>
    where
        F: IntoFuture<Output = T> + 'a,
        T: 'a,
    {
        // Safety: delegated to the caller of this method.
        unsafe { self.spawner().spawn(future) }
    }

    /// Runs a task that has been woken up.
    ///
    /// This method removes a single task from the task queue and polls it.
    /// Returns:
    /// - `Some(true)` if the task is complete
    /// - `Some(false)` if the task is not complete
    /// - `None` if there are no tasks to run
    ///
    /// This method panics if the task is polled recursively.
    pub fn step(&self) -> Option<bool> {
        let task = self.state.borrow_mut().queue.pop_front()?;
        Some(task.poll())
    }

    /// Runs tasks until there are no more tasks to run.
    ///
    /// This method repeatedly calls `step` until it returns `None`, that is,
    /// there are no more tasks that have been woken up. Returns the number of
    /// completed tasks.
    ///
    /// This method panics if a task is polled recursively.
    pub fn run_until_stalled(&self) -> usize {
        let mut completed = 0;
        while let Some(done) = self.step() {
            if done {
                completed += 1;
            }
        }
        completed
    }
}
