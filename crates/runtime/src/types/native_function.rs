use crate::{
    AlderSend, AlderSync, Cons, Context, Instance, Nameset, Ptr, Quark, Result, Value, make_ptr,
};
use std::fmt;

/// A trait for native functions used by the Alder runtime
pub trait NativeFn: Fn(&mut CallContext) -> Result<Value> + AlderSend + AlderSync + 'static {}

impl<T> NativeFn for T where T: Fn(&mut CallContext) -> Result<Value> + AlderSend + AlderSync + 'static
{}

/// A function that's defined outside of the Alder runtime
///
/// See [Value::NativeFunction]
#[derive(Clone)]
pub struct NativeFunction {
    /// The function implementation that should be called when calling the native function
    //
    // The type signature can't be simplified without stabilized trait aliases,
    // see https://github.com/rust-lang/rust/issues/55628
    #[allow(clippy::type_complexity)]
    pub function: Ptr<dyn NativeFn>,
}

impl NativeFunction {
    /// Creates a new native function
    pub fn new(function: impl NativeFn) -> Self {
        Self {
            function: make_ptr!(function),
        }
    }

    /// Calls the function with a list of evaluated arguments
    pub fn call(&self, ctx: &mut Context, scope: &Nameset, args: Option<Cons>) -> Result<Value> {
        let mut call_context = CallContext::new(ctx, scope, args);
        (*self.function)(&mut call_context)
    }

    /// Returns true if the other function refers to the same implementation
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.function, &other.function)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native function: {:?}", Ptr::address(&self.function))
    }
}

/// The context provided when a call to a [NativeFunction] is made
pub struct CallContext<'a> {
    /// The context making the call
    ///
    /// The context can be used to evaluate or invoke other values during the call.
    pub ctx: &'a mut Context,
    /// The scope in which the function was called
    pub scope: &'a Nameset,
    args: Vec<Value>,
}

impl<'a> CallContext<'a> {
    /// Returns a new context for calling native functions
    pub fn new(ctx: &'a mut Context, scope: &'a Nameset, args: Option<Cons>) -> Self {
        Self {
            ctx,
            scope,
            args: args.map(|args| args.to_vec()).unwrap_or_default(),
        }
    }

    /// Returns the function call's arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Returns the instance that's bound to `this` in the calling scope
    ///
    /// `None` is returned when the function wasn't called as a method of an instance.
    pub fn instance(&self) -> Option<Instance> {
        match self.scope.lookup(Quark::THIS) {
            Some(Value::Instance(instance)) => Some(instance),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unexpected_args;

    #[test]
    fn native_functions_receive_evaluated_args() {
        let mut ctx = Context::new();
        let scope = Nameset::new();

        let sum = NativeFunction::new(|call_ctx: &mut CallContext| {
            let mut result = 0;
            for arg in call_ctx.args() {
                match arg {
                    Value::Int(n) => result += n,
                    unexpected => return unexpected_args("|Int...|", &[unexpected.clone()]),
                }
            }
            Ok(result.into())
        });

        let args = Cons::from_values([Value::from(1), 2.into(), 3.into()]);
        assert_eq!(sum.call(&mut ctx, &scope, args).unwrap(), 6.into());
        assert!(sum.call(&mut ctx, &scope, Cons::new("x".into()).into()).is_err());
    }

    #[test]
    fn instance_is_none_outside_of_methods() {
        let mut ctx = Context::new();
        let scope = Nameset::new();

        let has_instance =
            NativeFunction::new(|call_ctx: &mut CallContext| Ok(call_ctx.instance().is_some().into()));
        assert_eq!(
            has_instance.call(&mut ctx, &scope, None).unwrap(),
            false.into()
        );
    }
}
