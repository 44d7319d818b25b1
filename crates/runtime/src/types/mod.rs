//! The core types used in the Alder runtime

mod class;
mod combo;
mod cons;
mod function;
mod instance;
mod native_function;
mod object;
pub mod value;

pub use self::{
    class::Class,
    combo::{Combo, Pending},
    cons::{Cons, ConsIter, ConsTag},
    function::Closure,
    instance::Instance,
    native_function::{CallContext, NativeFn, NativeFunction},
    object::{AlderObject, Object},
    value::Value,
};
