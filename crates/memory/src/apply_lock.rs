use std::fmt;

use crate::ptr_impl::{ApplyGuardImpl, ApplyLockImpl, apply_lock, new_apply_lock, try_apply_lock};

/// The lock that's held while an object runs one of its protocol operations
///
/// Protocol operations routinely re-enter the object graph that they're operating on, e.g.
/// evaluating a member can trigger another evaluation on the same object, so the lock can be
/// acquired again by the thread that currently holds it. Other threads will block until the
/// lock has been released by every guard held by the owning thread.
///
/// # Feature-specific behavior
///
/// - With the "arc" feature, the lock is a reentrant mutex.
/// - With the "rc" feature, there's no contention to guard against, so only the nesting depth is
///   tracked.
pub struct ApplyLock(ApplyLockImpl<()>);

impl ApplyLock {
    /// Makes a new unlocked ApplyLock
    pub fn new() -> Self {
        Self(new_apply_lock())
    }

    /// Acquires the lock, blocking if it's held by another thread
    ///
    /// The lock is released when the returned guard is dropped.
    pub fn lock(&self) -> ApplyGuard<'_> {
        ApplyGuard(apply_lock(&self.0))
    }

    /// Attempts to acquire the lock without blocking
    pub fn try_lock(&self) -> Option<ApplyGuard<'_>> {
        try_apply_lock(&self.0).map(ApplyGuard)
    }

    /// Returns true if the lock is currently held
    pub fn is_locked(&self) -> bool {
        self.0.is_locked()
    }
}

impl Default for ApplyLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ApplyLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApplyLock {{ locked: {} }}", self.is_locked())
    }
}

/// A guard that releases an [ApplyLock] when dropped
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ApplyGuard<'a>(#[allow(dead_code)] ApplyGuardImpl<'a, ()>);
