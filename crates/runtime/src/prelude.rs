//! A collection of useful items to make it easier to work with `alder_runtime`

#[doc(inline)]
pub use crate::{
    AlderObject, AlderSend, AlderSync, Binding, CallContext, Class, Closure, Combo, Cons, ConsTag,
    Context, ContextSettings, Instance, KCell, KString, LocalSet, Nameset, NativeFunction, Object,
    Pending, Ptr, PtrMut, Quark, Value, make_ptr, make_ptr_mut, runtime_error, unexpected_args,
    unexpected_type,
};
