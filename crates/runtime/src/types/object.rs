use crate::{
    AlderSend, AlderSync, Borrow, BorrowMut, Cons, Context, KString, Nameset, PtrMut, Quark,
    Result, Value, make_ptr_mut, runtime_error,
};
use downcast_rs::{Downcast, impl_downcast};
use std::fmt;

/// A trait for implementing objects that can be added to the Alder runtime
///
/// [AlderObject]s are added to the runtime by the [Object] type, and stored as
/// [Value::Object]s. Each of the trait's functions has a default implementation, so objects only
/// need to implement the behaviour that they support.
///
/// ## Example
///
/// ```
/// use alder_runtime::{Result, prelude::*};
///
/// #[derive(Default)]
/// pub struct Counter {
///     count: i64,
/// }
///
/// impl AlderObject for Counter {
///     fn type_string(&self) -> KString {
///         "Counter".into()
///     }
///
///     // Assigning an Int to a counter replaces its count in place
///     fn assign(&mut self, value: &Value) -> Result<bool> {
///         match value {
///             Value::Int(n) => {
///                 self.count = *n;
///                 Ok(true)
///             }
///             _ => Ok(false),
///         }
///     }
///
///     fn evaluate_member(&self, name: Quark) -> Result<Option<Value>> {
///         match name.name().as_str() {
///             "count" => Ok(Some(self.count.into())),
///             _ => Ok(None),
///         }
///     }
/// }
/// ```
///
/// See also: [Object].
pub trait AlderObject: AlderSend + AlderSync + Downcast {
    /// The object's type, as returned by the `repr` operator
    fn type_string(&self) -> KString {
        "Object".into()
    }

    /// Called when the object should be displayed as a string
    ///
    /// By default, the object's type is used as the display string.
    fn display(&self) -> String {
        self.type_string().to_string()
    }

    /// Called when a new value is bound to a name that currently holds the object
    ///
    /// Returning `true` indicates that the object has taken on the new value in place. Returning
    /// `false` (the default) causes the binding to be replaced with the new value.
    fn assign(&mut self, _value: &Value) -> Result<bool> {
        Ok(false)
    }

    /// Called when the object is invoked with a list of evaluated arguments
    fn call(&mut self, _ctx: &mut Context, _scope: &Nameset, _args: Option<Cons>) -> Result<Value> {
        unimplemented_error("call", self.type_string())
    }

    /// Called when a member of the object is invoked by name
    ///
    /// Returning `None` (the default) causes the name to be dispatched to the builtin operators.
    fn invoke_by_name(
        &mut self,
        _ctx: &mut Context,
        _scope: &Nameset,
        _name: Quark,
        _args: Option<Cons>,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Returns true if the object provides the named member
    fn has_member(&self, _name: Quark) -> bool {
        false
    }

    /// Called when a member of the object is evaluated
    ///
    /// Returning `None` (the default) indicates that the object doesn't provide the member.
    fn evaluate_member(&self, _name: Quark) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Called when a member of the object is bound
    fn bind_member(&mut self, name: Quark, _value: Value, _constant: bool) -> Result<Value> {
        unimplemented_error(&format!("binding '{name}'"), self.type_string())
    }

    /// Called when a member of the object is unbound
    fn unbind_member(&mut self, name: Quark) -> Result<Option<Value>> {
        unimplemented_error(&format!("unbinding '{name}'"), self.type_string())
    }
}

impl_downcast!(AlderObject);

/// A wrapper for [AlderObject]s used in the Alder runtime
#[derive(Clone)]
pub struct Object {
    object: PtrMut<dyn AlderObject>,
}

impl Object {
    /// Checks if the object is of the given type
    pub fn is_a<T: AlderObject>(&self) -> bool {
        match self.object.try_borrow() {
            Some(object) => object.downcast_ref::<T>().is_some(),
            None => false,
        }
    }

    /// Attempts to borrow the underlying object immutably
    pub fn try_borrow(&self) -> Result<Borrow<'_, dyn AlderObject>> {
        self.object
            .try_borrow()
            .ok_or_else(|| "Attempting to borrow an object that is already mutably borrowed".into())
    }

    /// Attempts to borrow the underlying object mutably
    pub fn try_borrow_mut(&self) -> Result<BorrowMut<'_, dyn AlderObject>> {
        self.object
            .try_borrow_mut()
            .ok_or_else(|| "Attempting to borrow an object that is already borrowed".into())
    }

    /// Attempts to immutably borrow and cast the underlying object to the specified type
    pub fn cast<T: AlderObject>(&self) -> Result<Borrow<'_, T>> {
        Borrow::filter_map(self.try_borrow()?, |object| object.downcast_ref::<T>())
            .map_err(|_| "Incorrect object type".into())
    }

    /// Attempts to mutably borrow and cast the underlying object to the specified type
    pub fn cast_mut<T: AlderObject>(&self) -> Result<BorrowMut<'_, T>> {
        BorrowMut::filter_map(self.try_borrow_mut()?, |object| object.downcast_mut::<T>())
            .map_err(|_| "Incorrect object type".into())
    }

    /// Returns true if the provided object occupies the same memory address
    pub fn is_same_instance(&self, other: &Self) -> bool {
        PtrMut::ptr_eq(&self.object, &other.object)
    }

    /// Returns the number of references currently held to the object
    pub fn ref_count(&self) -> usize {
        PtrMut::ref_count(&self.object)
    }

    pub(crate) fn assign(&self, value: &Value) -> Result<bool> {
        self.try_borrow_mut()?.assign(value)
    }

    pub(crate) fn call(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        args: Option<Cons>,
    ) -> Result<Value> {
        self.try_borrow_mut()?.call(ctx, scope, args)
    }

    pub(crate) fn call_by_name(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<Cons>,
    ) -> Result<Option<Value>> {
        self.try_borrow_mut()?
            .invoke_by_name(ctx, scope, name, args)
    }

    pub(crate) fn has_member(&self, name: Quark) -> bool {
        self.try_borrow()
            .is_ok_and(|object| object.has_member(name))
    }

    pub(crate) fn evaluate_member(&self, name: Quark) -> Result<Option<Value>> {
        self.try_borrow()?.evaluate_member(name)
    }

    pub(crate) fn bind_member(&self, name: Quark, value: Value, constant: bool) -> Result<Value> {
        self.try_borrow_mut()?.bind_member(name, value, constant)
    }

    pub(crate) fn unbind_member(&self, name: Quark) -> Result<Option<Value>> {
        self.try_borrow_mut()?.unbind_member(name)
    }
}

impl<T: AlderObject> From<T> for Object {
    fn from(object: T) -> Self {
        Self {
            object: make_ptr_mut!(object),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object ({:?})", PtrMut::address(&self.object))
    }
}

/// Creates an error that describes an unimplemented operation
fn unimplemented_error<T>(operation: &str, object_type: KString) -> Result<T> {
    runtime_error!("{operation} is unimplemented for {object_type}")
}
