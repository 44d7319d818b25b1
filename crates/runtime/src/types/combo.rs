use crate::{
    Cons, Context, Nameset, Ptr, Quark, Result, Value, error::combo_mode_error,
};
use log::trace;
use std::sync::atomic::{AtomicBool, Ordering};

/// The pending half of a [Combo]
#[derive(Clone)]
pub enum Pending {
    /// A member name that will be resolved on the receiver when the combo is invoked
    Symbol(Quark),
    /// A value (typically a function) that will be called with the receiver bound as `this`
    Value(Value),
}

/// A bound call, pairing a receiver with a pending member name or value
///
/// Combos are produced by evaluation whenever a call needs to be deferred until its arguments
/// are available, e.g. when a method is retrieved from an instance.
///
/// A combo is immutable apart from its dispatch flag, which selects between the generic
/// invocation path (the builtin operators, or a direct call of the pending value), and the
/// receiver's own invocation path.
#[derive(Clone)]
pub struct Combo(Ptr<ComboData>);

struct ComboData {
    pending: Pending,
    receiver: Value,
    dispatch_generic: AtomicBool,
}

impl Combo {
    /// Makes a combo that will invoke the named member of the receiver
    pub fn new_symbol(name: Quark, receiver: Value, dispatch_generic: bool) -> Self {
        Self::new(Pending::Symbol(name), receiver, dispatch_generic)
    }

    /// Makes a combo that will call the value with the receiver bound as `this`
    pub fn new_value(value: Value, receiver: Value, dispatch_generic: bool) -> Self {
        Self::new(Pending::Value(value), receiver, dispatch_generic)
    }

    fn new(pending: Pending, receiver: Value, dispatch_generic: bool) -> Self {
        Self(Ptr::new(ComboData {
            pending,
            receiver,
            dispatch_generic: dispatch_generic.into(),
        }))
    }

    /// The combo's pending member name or value
    pub fn pending(&self) -> &Pending {
        &self.0.pending
    }

    /// The value that the pending member will be invoked on
    pub fn receiver(&self) -> &Value {
        &self.0.receiver
    }

    /// Returns true if the combo uses the generic invocation path
    pub fn dispatch_generic(&self) -> bool {
        self.0.dispatch_generic.load(Ordering::Acquire)
    }

    /// Sets the dispatch flag
    pub fn set_dispatch_generic(&self, dispatch_generic: bool) {
        self.0
            .dispatch_generic
            .store(dispatch_generic, Ordering::Release);
    }

    /// Returns true if the other Combo refers to the same combo
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.0, &other.0)
    }

    /// Returns true if the value is a combo with the same pending member name, or the same
    /// pending value
    ///
    /// Evaluation uses this to stop when a name resolves to a combo that refers back to the same
    /// name.
    pub fn loops_with(&self, other: &Value) -> bool {
        let Value::Combo(other) = other else {
            return false;
        };

        match (self.pending(), other.pending()) {
            (Pending::Symbol(a), Pending::Symbol(b)) => a == b,
            (Pending::Value(a), Pending::Value(b)) => a == b,
            _ => false,
        }
    }

    /// Returns true if the combo provides the named member
    ///
    /// In value mode the pending value is checked, in symbol mode only the builtin operators
    /// are available.
    pub fn has_member(&self, name: Quark, include_inherited: bool) -> bool {
        match self.pending() {
            Pending::Value(value) => value.has_member(name, include_inherited),
            Pending::Symbol(_) => include_inherited && name.is_builtin_operator(),
        }
    }

    /// Binds a const member of the pending value
    pub fn bind_const(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        match self.pending() {
            Pending::Value(pending) => pending.bind_member_const(ctx, scope, name, value),
            Pending::Symbol(_) => combo_mode_error("bind", name),
        }
    }

    /// Binds or assigns a member of the pending value
    pub fn bind(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        match self.pending() {
            Pending::Value(pending) => pending.bind_member(ctx, scope, name, value),
            Pending::Symbol(_) => combo_mode_error("bind", name),
        }
    }

    /// Removes a member of the pending value
    pub fn unbind(&self, ctx: &mut Context, scope: &Nameset, name: Quark) -> Result<Option<Value>> {
        match self.pending() {
            Pending::Value(pending) => pending.unbind_member(ctx, scope, name),
            Pending::Symbol(_) => combo_mode_error("unbind", name),
        }
    }

    /// Evaluates a member of the combo's target
    ///
    /// In symbol mode the pending name is first evaluated on the receiver. If the result is a
    /// combo that loops with this one then it's returned as-is, otherwise the member is evaluated
    /// on the result. In value mode the member is evaluated on the pending value.
    pub fn evaluate(&self, ctx: &mut Context, scope: &Nameset, name: Quark) -> Result<Value> {
        let result = match self.pending() {
            Pending::Symbol(pending) => {
                let intermediate = self.receiver().evaluate_member(ctx, scope, *pending)?;

                if self.loops_with(&intermediate) {
                    trace!("'{pending}' resolves to itself, stopping evaluation of '{name}'");
                    return Ok(intermediate);
                }

                ctx.nested(|ctx| intermediate.evaluate_member(ctx, scope, name))?
            }
            Pending::Value(pending) => pending.evaluate_member(ctx, scope, name)?,
        };

        ctx.post(&result)?;
        Ok(result)
    }

    /// Invokes the combo with a list of unevaluated arguments
    ///
    /// In symbol mode the receiver's named member is invoked with the arguments as they are. In
    /// value mode the arguments are evaluated first, see [Combo::call].
    pub fn invoke(&self, ctx: &mut Context, scope: &Nameset, args: Option<&Cons>) -> Result<Value> {
        let result = match self.pending() {
            Pending::Symbol(name) => {
                if self.dispatch_generic() {
                    self.receiver().apply_builtin(ctx, scope, *name, args)?
                } else {
                    self.receiver().apply_by_name(ctx, scope, *name, args)?
                }
            }
            Pending::Value(_) => {
                let args = Cons::eval(ctx, scope, args)?;
                return self.call(ctx, scope, args);
            }
        };

        ctx.post(&result)?;
        Ok(result)
    }

    /// Invokes the combo with a list of evaluated arguments
    ///
    /// In value mode an [Instance](crate::Instance) receiver calls the pending value with itself
    /// bound as `this`, other receivers (or generic dispatch) call the pending value directly.
    pub fn call(&self, ctx: &mut Context, scope: &Nameset, args: Option<Cons>) -> Result<Value> {
        let result = match self.pending() {
            Pending::Symbol(name) => {
                if self.dispatch_generic() {
                    self.receiver().call_builtin(ctx, scope, *name, args)?
                } else {
                    self.receiver().call_by_name(ctx, scope, *name, args)?
                }
            }
            Pending::Value(target) => match self.receiver() {
                Value::Instance(instance) if !self.dispatch_generic() => {
                    instance.invoke(ctx, scope, target, args)?
                }
                _ => ctx.nested(|ctx| target.call(ctx, scope, args))?,
            },
        };

        ctx.post(&result)?;
        Ok(result)
    }
}
