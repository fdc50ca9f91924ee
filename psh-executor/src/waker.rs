// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki

//! Implementation of `Waker`
//!
//! This module provides a function to convert a `Task` into a `Waker`. The
//! `RawWaker`'s data pointer is a `Rc<Task>`, and the `RawWakerVTable` contains
//! functions to clone, wake, wake by reference, and drop the `Rc<Task>`.
//!
//! `Task<'a>`'s only lifetime-dependent field is the trait object it stores;
//! a lifetime never affects a type's layout, so the four vtable functions
//! below are written against a fixed `Task<'static>` instantiation and rely
//! on the caller of [`into_waker`] (ultimately, the `unsafe` `spawn`/
//! `spawn_pinned` methods) to not let the resulting `Waker` outlive `'a`.

use crate::Task;
use alloc::rc::Rc;
use core::task::{RawWaker, RawWakerVTable, Waker};

unsafe fn clone(data: *const ()) -> RawWaker {
    unsafe { Rc::<Task<'static>>::increment_strong_count(data.cast()) };
    RawWaker::new(data, VTABLE)
}

unsafe fn wake(data: *const ()) {
    let task: Rc<Task<'static>> = unsafe { Rc::from_raw(data.cast()) };
    task.wake();
}

unsafe fn wake_by_ref(data: *const ()) {
    unsafe { Rc::<Task<'static>>::increment_strong_count(data.cast()) };
    let task: Rc<Task<'static>> = unsafe { Rc::from_raw(data.cast()) };
    task.wake();
}

unsafe fn drop(data: *const ()) {
    unsafe { Rc::<Task<'static>>::decrement_strong_count(data.cast()) };
}

const VTABLE: &RawWakerVTable = &RawWakerVTable::new(clone, wake, wake_by_ref, drop);

/// Converts a `Task` into a `Waker`.
///
/// When the returned `Waker` is woken, the task will be enqueued to be polled
/// by the executor.
#[must_use]
pub(crate) fn into_waker<'a>(task: Rc<Task<'a>>) -> Waker {
    let data = Rc::into_raw(task).cast();
    let raw_waker = RawWaker::new(data, VTABLE);
    unsafe { Waker::from_raw(raw_waker) }
}
