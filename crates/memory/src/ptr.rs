use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
};

use crate::{Address, ptr_impl::PtrImpl};

/// Makes a Ptr, with support for casting to trait objects
///
/// Although `Ptr::from` can be used, the challenge comes when a trait object needs to be used as
/// the pointee type. Until the `CoerceUnized` trait is stabilized, casting from a concrete type to
/// `dyn Trait` needs to be performed on the inner pointer. This macro encapsulates the casting to
/// make life easier at the call site.
#[macro_export]
macro_rules! make_ptr {
    ($value:expr) => {
        $crate::__make_ptr!($value)
    };
}

/// A strong reference to a value in allocated memory
///
/// Cloning a `Ptr` acquires a new strong reference, and dropping it releases the reference.
/// The value is dropped when the last strong reference is released.
#[derive(Debug, Default)]
pub struct Ptr<T: ?Sized>(PtrImpl<T>);

impl<T> Ptr<T> {
    /// Moves the provided value into newly allocated memory
    pub fn new(value: T) -> Self {
        Self::from(value)
    }
}

impl<T> From<T> for Ptr<T> {
    fn from(value: T) -> Self {
        Self(value.into())
    }
}

impl<T: ?Sized> From<Box<T>> for Ptr<T> {
    fn from(boxed: Box<T>) -> Self {
        Self(boxed.into())
    }
}

impl<T: ?Sized> From<PtrImpl<T>> for Ptr<T> {
    fn from(inner: PtrImpl<T>) -> Self {
        Self(inner)
    }
}

impl<T: ?Sized> Ptr<T> {
    /// Returns true if the two `Ptr`s point to the same allocation
    ///
    /// See also: [`Rc::ptr_eq`] or [`Arc::ptr_eq`]
    ///
    /// [`Rc::ptr_eq`]: std::rc::Rc::ptr_eq
    /// [`Arc::ptr_eq`]: std::sync::Arc::ptr_eq
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        PtrImpl::ptr_eq(&this.0, &other.0)
    }

    /// Returns the address of the allocated memory
    pub fn address(this: &Self) -> Address {
        PtrImpl::as_ptr(&this.0).into()
    }

    /// Returns the number of references to the allocated memory
    ///
    /// Only strong references are counted, weak references don't get added to the result.
    pub fn ref_count(this: &Self) -> usize {
        PtrImpl::strong_count(&this.0)
    }

    /// Returns a mutable reference to the value if this is the only reference to it
    ///
    /// See also: [`Rc::get_mut`] or [`Arc::get_mut`]
    ///
    /// [`Rc::get_mut`]: std::rc::Rc::get_mut
    /// [`Arc::get_mut`]: std::sync::Arc::get_mut
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        PtrImpl::get_mut(&mut this.0)
    }
}

impl<T: ?Sized> Deref for Ptr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0.deref()
    }
}

impl<T: ?Sized> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self(PtrImpl::clone(&self.0))
    }
}

impl<T: Clone> From<&[T]> for Ptr<[T]> {
    #[inline]
    fn from(value: &[T]) -> Self {
        Self(PtrImpl::from(value))
    }
}

impl<T> From<Vec<T>> for Ptr<[T]> {
    #[inline]
    fn from(value: Vec<T>) -> Self {
        Self(PtrImpl::from(value))
    }
}

impl From<&str> for Ptr<str> {
    #[inline]
    fn from(value: &str) -> Self {
        Self(PtrImpl::from(value))
    }
}

impl From<String> for Ptr<str> {
    #[inline]
    fn from(value: String) -> Self {
        Self(PtrImpl::from(value))
    }
}

impl<T: ?Sized + PartialEq> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        PtrImpl::eq(&self.0, &other.0)
    }
}

impl<T: ?Sized + Eq> Eq for Ptr<T> {}

impl<T: ?Sized + fmt::Display> fmt::Display for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: ?Sized + Hash> Hash for Ptr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let a = Ptr::new(42);
        assert_eq!(Ptr::ref_count(&a), 1);

        let b = a.clone();
        assert_eq!(Ptr::ref_count(&a), 2);
        assert!(Ptr::ptr_eq(&a, &b));
        assert_eq!(Ptr::address(&a), Ptr::address(&b));

        drop(b);
        assert_eq!(Ptr::ref_count(&a), 1);
    }

    #[test]
    fn get_mut_requires_unique_ownership() {
        let mut a = Ptr::new(1);
        *Ptr::get_mut(&mut a).unwrap() = 2;
        assert_eq!(*a, 2);

        let _b = a.clone();
        assert!(Ptr::get_mut(&mut a).is_none());
    }
}
