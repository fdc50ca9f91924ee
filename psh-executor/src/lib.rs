// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki

//! A single-threaded, non-preemptive executor for `'a`-scoped futures.
//!
//! The shell's tree-walking executor runs commands as futures so that
//! pipelines, subshells and asynchronous lists can be interleaved without
//! OS threads. [`Executor`] owns a queue of tasks that have been woken up;
//! [`Spawner`] is the cloneable, possibly-dangling handle a running task
//! uses to add more tasks to the same queue.

#![no_std]
extern crate alloc;

pub mod forwarder;
mod executor;
mod spawner;
mod task;
mod waker;

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use core::future::Future;
use core::pin::Pin;

pub use spawner::SpawnError;

/// A spawned unit of work together with the queue it re-enqueues itself to
/// when woken.
struct Task<'a> {
    future: RefCell<Option<Pin<Box<dyn Future<Output = ()> + 'a>>>>,
    state: Weak<RefCell<ExecutorState<'a>>>,
}

/// Shared state between an [`Executor`] and the [`Spawner`]s derived from it.
#[derive(Default)]
struct ExecutorState<'a> {
    /// Tasks that have been woken up and are waiting to be polled.
    queue: VecDeque<Rc<Task<'a>>>,
}

impl<'a> ExecutorState<'a> {
    /// Wraps `future` in a [`Task`] and enqueues it for its first poll.
    fn enqueue(state: &Rc<RefCell<Self>>, future: Pin<Box<dyn Future<Output = ()> + 'a>>) {
        let task = Rc::new(Task {
            future: RefCell::new(Some(future)),
            state: Rc::downgrade(state),
        });
        state.borrow_mut().queue.push_back(task);
    }

    /// Like [`enqueue`](Self::enqueue), but wraps a non-unit future so its
    /// result can be retrieved through the returned [`forwarder::Receiver`].
    fn enqueue_forwarding<F, T>(state: &Rc<RefCell<Self>>, future: F) -> forwarder::Receiver<T>
    where
        F: core::future::IntoFuture<Output = T> + 'a,
        T: 'a,
    {
        let (sender, receiver) = forwarder::forwarder();
        let future = future.into_future();
        let wrapped: Pin<Box<dyn Future<Output = ()> + 'a>> = Box::pin(async move {
            let value = future.await;
            let _ = sender.send(value);
        });
        Self::enqueue(state, wrapped);
        receiver
    }
}

/// Runs tasks spawned onto it, in the order they are woken up.
///
/// Cloning an `Executor` yields another handle to the same task queue, which
/// is how a task can spawn further tasks onto the executor that is currently
/// running it (see `spawning_task_inside_task` in the test suite).
#[derive(Clone, Default)]
pub struct Executor<'a> {
    state: Rc<RefCell<ExecutorState<'a>>>,
}

/// A possibly-dangling handle used to spawn tasks onto an [`Executor`]
/// without borrowing it.
///
/// A `Spawner` becomes dangling when the `Executor` it was created from (and
/// every clone of it) has been dropped; spawning onto a dangling `Spawner`
/// returns the future unchanged so the caller can decide what to do with it.
#[derive(Clone, Default)]
pub struct Spawner<'a> {
    state: Weak<RefCell<ExecutorState<'a>>>,
}
