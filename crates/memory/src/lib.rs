//! Memory management utilities for the Alder object kernel
//!
//! Objects in the kernel are shared through reference-counted pointers without cycle detection.
//! Taking a clone of a [Ptr] acquires a strong reference, and dropping it releases the reference,
//! with the pointee being destroyed when the last reference is released.
//!
//! Mutable state lives in a [KCell], which provides the read and write lock modes, while
//! [ApplyLock] provides the reentrant lock mode that's held while an object runs one of its
//! protocol operations.

#![warn(missing_docs)]

#[cfg(all(feature = "arc", feature = "rc"))]
compile_error!("A single memory management feature can be enabled at a time");

#[cfg(not(any(feature = "arc", feature = "rc")))]
compile_error!("Either the 'arc' or the 'rc' feature needs to be enabled");

mod address;
mod apply_lock;
mod ptr;
mod ptr_impl;
mod ptr_mut;

pub use crate::{
    address::Address,
    apply_lock::{ApplyGuard, ApplyLock},
    ptr::Ptr,
    ptr_mut::{Borrow, BorrowMut, KCell, PtrMut},
};
