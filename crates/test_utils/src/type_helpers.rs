use alder_runtime::{NativeFn, prelude::*};

/// Returns the [Quark] for a name
pub fn quark(name: &str) -> Quark {
    Quark::from_name(name)
}

/// Returns a [Value::Symbol] form for a name
pub fn symbol(name: &str) -> Value {
    Value::Symbol(quark(name))
}

/// Returns a [Value::Qualified] form for a member path, e.g. `path("a:b:c")`
pub fn path(names: &str) -> Value {
    let names = names.split(':').map(quark).collect::<Vec<_>>();
    Value::Qualified(names.into())
}

/// Returns an argument list from a slice of values, `None` if the slice is empty
pub fn args(values: &[Value]) -> Option<Cons> {
    Cons::from_values(values.iter().cloned())
}

/// Returns a call form that applies the callee to the (unevaluated) arguments
pub fn call(callee: Value, args: &[Value]) -> Value {
    let form = Cons::new(callee);
    for arg in args {
        form.push_back(arg.clone());
    }
    form.into()
}

/// Returns a block form that evaluates each form in turn
pub fn block(forms: &[Value]) -> Value {
    Cons::block(forms.iter().cloned()).into()
}

/// Returns a closure with the given parameter names and body
pub fn closure(params: &[&str], body: Value) -> Value {
    Closure::new(params.iter().map(|name| quark(name)), body).into()
}

/// Returns a native function
pub fn native(f: impl NativeFn) -> Value {
    NativeFunction::new(f).into()
}
