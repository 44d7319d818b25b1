use crate::{Borrow, PtrMut, Quark, Result, Value, error::const_error};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

type BindingMap = IndexMap<Quark, Binding, FxBuildHasher>;

/// A value bound to a name in a [LocalSet]
#[derive(Clone)]
pub struct Binding {
    /// The bound value
    pub value: Value,
    /// True if the binding can't be reassigned or removed
    pub constant: bool,
}

/// The local symbol table used for the storage of classes, instances, and scopes
///
/// A `LocalSet` is a shared handle, clones refer to the same table. Entries are kept in insertion
/// order.
#[derive(Clone, Default)]
pub struct LocalSet(PtrMut<BindingMap>);

impl LocalSet {
    /// Creates an empty LocalSet
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites a const binding
    ///
    /// An error is returned if an existing binding for the name is already const.
    pub fn bind_const(&self, name: Quark, value: Value) -> Result<()> {
        self.insert(name, value, true)
    }

    /// Creates or reassigns a mutable binding
    ///
    /// An error is returned if an existing binding for the name is const.
    pub fn bind(&self, name: Quark, value: Value) -> Result<()> {
        self.insert(name, value, false)
    }

    fn insert(&self, name: Quark, value: Value, constant: bool) -> Result<()> {
        let previous = {
            let mut bindings = self.0.borrow_mut();
            if bindings.get(&name).is_some_and(|existing| existing.constant) {
                return const_error(name);
            }
            bindings.insert(name, Binding { value, constant })
        };

        // The previous value is released after the table has been unlocked
        drop(previous);
        Ok(())
    }

    /// Removes a binding, returning its value
    ///
    /// An error is returned if the binding is const.
    pub fn unbind(&self, name: Quark) -> Result<Option<Value>> {
        let removed = {
            let mut bindings = self.0.borrow_mut();
            if bindings.get(&name).is_some_and(|existing| existing.constant) {
                return const_error(name);
            }
            bindings.shift_remove(&name)
        };

        Ok(removed.map(|binding| binding.value))
    }

    /// Returns a clone of the value bound to the given name
    pub fn get(&self, name: Quark) -> Option<Value> {
        self.0
            .borrow()
            .get(&name)
            .map(|binding| binding.value.clone())
    }

    /// Returns a clone of the binding for the given name
    pub fn get_binding(&self, name: Quark) -> Option<Binding> {
        self.0.borrow().get(&name).cloned()
    }

    /// Returns true if the name is bound
    pub fn exists(&self, name: Quark) -> bool {
        self.0.borrow().contains_key(&name)
    }

    /// Returns true if the name is bound as const
    pub fn is_const(&self, name: Quark) -> bool {
        self.0
            .borrow()
            .get(&name)
            .is_some_and(|binding| binding.constant)
    }

    /// Removes every binding, releasing the bound values
    pub fn reset(&self) {
        let released = std::mem::take(&mut *self.0.borrow_mut());
        drop(released);
    }

    /// Returns the number of bindings
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true if there are no bindings
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Returns the bound names, in insertion order
    pub fn names(&self) -> Vec<Quark> {
        self.0.borrow().keys().copied().collect()
    }

    /// Provides read access to the bindings
    pub fn bindings(&self) -> Borrow<'_, IndexMap<Quark, Binding, FxBuildHasher>> {
        self.0.borrow()
    }

    /// Returns true if the two handles refer to the same table
    pub fn is_same_instance(&self, other: &Self) -> bool {
        PtrMut::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn bind_and_rebind() {
        let locals = LocalSet::new();
        let x = Quark::from_name("x");

        assert!(locals.get(x).is_none());
        locals.bind(x, 1.into()).unwrap();
        locals.bind(x, 2.into()).unwrap();
        assert_eq!(locals.get(x), Some(2.into()));
        assert_eq!(locals.len(), 1);
    }

    #[test]
    fn const_bindings_are_write_once() {
        let locals = LocalSet::new();
        let x = Quark::from_name("x");

        locals.bind_const(x, 1.into()).unwrap();
        assert!(locals.is_const(x));

        for result in [
            locals.bind(x, 2.into()).map(|_| ()),
            locals.bind_const(x, 2.into()).map(|_| ()),
            locals.unbind(x).map(|_| ()),
        ] {
            let error = result.unwrap_err();
            assert!(matches!(error.kind(), ErrorKind::ConstViolation { .. }));
        }

        assert_eq!(locals.get(x), Some(1.into()));
    }

    #[test]
    fn unbind_and_reset() {
        let locals = LocalSet::new();
        let x = Quark::from_name("x");
        let y = Quark::from_name("y");

        locals.bind(x, 1.into()).unwrap();
        locals.bind(y, 2.into()).unwrap();
        assert_eq!(locals.names(), vec![x, y]);

        assert_eq!(locals.unbind(x).unwrap(), Some(1.into()));
        assert_eq!(locals.unbind(x).unwrap(), None);
        assert!(locals.exists(y));

        locals.reset();
        assert!(locals.is_empty());
        assert!(!locals.exists(y));
    }

    #[test]
    fn clones_share_storage() {
        let a = LocalSet::new();
        let b = a.clone();
        a.bind(Quark::from_name("x"), true.into()).unwrap();
        assert!(b.exists(Quark::from_name("x")));
        assert!(a.is_same_instance(&b));
    }
}
