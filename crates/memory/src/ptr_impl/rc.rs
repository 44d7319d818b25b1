pub(crate) use std::cell::Ref as BorrowImpl;
pub(crate) use std::cell::RefCell as CellImpl;
pub(crate) use std::cell::RefMut as BorrowMutImpl;
pub(crate) use std::rc::Rc as PtrImpl;

use std::{cell::Cell, marker::PhantomData};

#[doc(hidden)]
#[macro_export]
macro_rules! __make_ptr {
    ($value:expr) => {
        $crate::Ptr::from(::std::rc::Rc::new($value) as ::std::rc::Rc<_>)
    };
}

// Single threaded contexts can't contend for the apply lock, so only the nesting depth is tracked.
#[derive(Debug, Default)]
pub(crate) struct ApplyLockImpl<T> {
    depth: Cell<usize>,
    _phantom: PhantomData<T>,
}

pub(crate) struct ApplyGuardImpl<'a, T> {
    depth: &'a Cell<usize>,
    _phantom: PhantomData<T>,
}

impl<T> Drop for ApplyGuardImpl<'_, T> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

impl<T> ApplyLockImpl<T> {
    pub(crate) fn is_locked(&self) -> bool {
        self.depth.get() > 0
    }
}

#[inline]
pub(crate) fn new_apply_lock() -> ApplyLockImpl<()> {
    ApplyLockImpl::default()
}

#[inline]
pub(crate) fn apply_lock(lock: &ApplyLockImpl<()>) -> ApplyGuardImpl<'_, ()> {
    lock.depth.set(lock.depth.get() + 1);
    ApplyGuardImpl {
        depth: &lock.depth,
        _phantom: PhantomData,
    }
}

#[inline]
pub(crate) fn try_apply_lock(lock: &ApplyLockImpl<()>) -> Option<ApplyGuardImpl<'_, ()>> {
    Some(apply_lock(lock))
}

#[inline]
pub(crate) fn borrow<T: ?Sized>(cell: &CellImpl<T>) -> BorrowImpl<'_, T> {
    cell.borrow()
}

#[inline]
pub(crate) fn try_borrow<T: ?Sized>(cell: &CellImpl<T>) -> Option<BorrowImpl<'_, T>> {
    cell.try_borrow().ok()
}

#[inline]
pub(crate) fn borrow_mut<T: ?Sized>(cell: &CellImpl<T>) -> BorrowMutImpl<'_, T> {
    cell.borrow_mut()
}

#[inline]
pub(crate) fn try_borrow_mut<T: ?Sized>(cell: &CellImpl<T>) -> Option<BorrowMutImpl<'_, T>> {
    cell.try_borrow_mut().ok()
}

#[inline]
pub(crate) fn borrowed_filter_map<'a, T: ?Sized, U, F>(
    borrowed: BorrowImpl<'a, T>,
    f: F,
) -> Result<BorrowImpl<'a, U>, BorrowImpl<'a, T>>
where
    F: FnOnce(&T) -> Option<&U>,
    U: ?Sized,
{
    BorrowImpl::filter_map(borrowed, f)
}

#[inline]
pub(crate) fn borrowed_mut_filter_map<'a, T: ?Sized, U, F>(
    borrowed: BorrowMutImpl<'a, T>,
    f: F,
) -> Result<BorrowMutImpl<'a, U>, BorrowMutImpl<'a, T>>
where
    F: FnOnce(&mut T) -> Option<&mut U>,
    U: ?Sized,
{
    BorrowMutImpl::filter_map(borrowed, f)
}
