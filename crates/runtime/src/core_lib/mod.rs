//! The core library for the Alder runtime
//!
//! The core library's functions are bound as constants in the root frame of each [Nameset] made
//! with [Nameset::with_core_lib](crate::Nameset::with_core_lib).

use crate::{
    Class, Instance, LocalSet, NativeFn, NativeFunction, Quark, Result, Value, unexpected_args,
    unexpected_type,
};

/// Makes the set of core library functions
///
/// - `class`: makes a new empty class, and only accepts an empty argument list.
/// - `instance`: makes a new instance without calling `preset`, optionally with a class.
/// - `type`: returns the type of its argument as a string.
pub fn make_module() -> Result<LocalSet> {
    let result = LocalSet::new();

    add_fn(&result, "class", |ctx| Class::make(ctx.args()).map(Value::from))?;

    add_fn(&result, "instance", |ctx| match ctx.args() {
        [] => Ok(Instance::new().into()),
        [Value::Class(class)] => Ok(Instance::with_meta(class.clone()).into()),
        [unexpected] => unexpected_type("Class", unexpected),
        unexpected => unexpected_args("|Class|", unexpected),
    })?;

    add_fn(&result, "type", |ctx| match ctx.args() {
        [value] => Ok(value.type_as_string().into()),
        unexpected => unexpected_args("|Any|", unexpected),
    })?;

    Ok(result)
}

fn add_fn(module: &LocalSet, name: &str, f: impl NativeFn) -> Result<()> {
    module.bind_const(Quark::from_name(name), NativeFunction::new(f).into())
}
