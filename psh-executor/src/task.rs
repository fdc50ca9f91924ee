// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki

//! Implementation of `Task`

use crate::waker::into_waker;
use crate::Task;
use alloc::rc::Rc;
use core::task::{Context, Poll};

impl<'a> Task<'a> {
    /// Wakes the task by re-enqueueing it onto the executor it was spawned
    /// on, if that executor still exists.
    pub(crate) fn wake(self: Rc<Self>) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().queue.push_back(self);
        }
    }

    /// Polls the future contained in the task.
    ///
    /// If the future completes, this method returns `true` and will do
    /// nothing on subsequent calls. If the future is not complete, this
    /// method returns `false`.
    ///
    /// Panics if called reentrantly while already polling the same task,
    /// since that would require the future to be borrowed twice.
    pub(crate) fn poll(self: &Rc<Self>) -> bool {
        let mut slot = self.future.borrow_mut();
        let Some(future) = slot.as_mut() else {
            return true;
        };
        let waker = into_waker(Rc::clone(self));
        let mut context = Context::from_waker(&waker);
        match future.as_mut().poll(&mut context) {
            Poll::Ready(()) => {
                *slot = None;
                true
            }
            Poll::Pending => false,
        }
    }
}
