//! The object and dispatch kernel of the Alder language runtime
//!
//! The kernel resolves symbolic member names at run time through a five-operation protocol
//! (`has_member`, `bind_const`, `bind`, `unbind`, `evaluate`) that's implemented uniformly by
//! [Class], [Instance], and [Combo], along with the two invocation forms (positional invocation
//! of a resolved value, and invocation by name).

#![warn(missing_docs)]

mod context;
mod error;
mod local_set;
mod nameset;
mod quark;
mod send_sync;
mod string;
mod types;

pub mod core_lib;
pub mod prelude;

pub use crate::{
    context::{Context, ContextSettings, PostEvalCallback},
    error::{Error, ErrorKind, Result, unexpected_args, unexpected_type},
    local_set::{Binding, LocalSet},
    nameset::Nameset,
    quark::Quark,
    send_sync::{AlderSend, AlderSync},
    string::KString,
    types::{
        AlderObject, CallContext, Class, Closure, Combo, Cons, ConsIter, ConsTag, Instance,
        NativeFn, NativeFunction, Object, Pending, Value,
    },
};
pub use alder_memory::{Borrow, BorrowMut, KCell, Ptr, PtrMut, make_ptr, make_ptr_mut};
