//! The core value type used in the Alder runtime

use crate::{
    Class, Closure, Combo, Cons, Context, Instance, KString, Nameset, NativeFunction, Object, Ptr,
    Quark, Result, error::invalid_operator, unexpected_args,
};
use std::fmt;

/// The core Value type for Alder
#[derive(Clone, Default)]
pub enum Value {
    /// The default type representing the absence of a value
    #[default]
    Null,

    /// A boolean, can be either true or false
    Bool(bool),

    /// A signed 64 bit integer
    Int(i64),

    /// An immutable string
    Str(KString),

    /// A name that's resolved in the current scope when evaluated
    Symbol(Quark),

    /// A member path like `a:b:c`
    ///
    /// The first name is resolved in the current scope, then each following name is evaluated
    /// as a member of the previous result.
    Qualified(Ptr<[Quark]>),

    /// A list cell, evaluated as a call form
    Cons(Cons),

    /// A class, see [Class]
    Class(Class),

    /// An instance of a class, see [Instance]
    Instance(Instance),

    /// A bound call that's awaiting invocation, see [Combo]
    Combo(Combo),

    /// A function defined by a parameter list and a body form
    Closure(Closure),

    /// A function that's implemented outside of the Alder runtime
    NativeFunction(NativeFunction),

    /// An object with behaviour defined via the [AlderObject](crate::AlderObject) trait
    Object(Object),
}

impl Value {
    /// Evaluates the value as a form in the given scope
    ///
    /// - Symbols are resolved in the scope.
    /// - Qualified names resolve their first name in the scope, and then each following name as a
    ///   member of the previous result.
    /// - Cons cells are evaluated as call forms, see [Cons::eval_form].
    /// - Every other value evaluates to itself.
    pub fn eval(&self, ctx: &mut Context, scope: &Nameset) -> Result<Value> {
        match self {
            Value::Symbol(name) => scope.evaluate(*name),
            Value::Qualified(path) => eval_qualified(ctx, scope, path),
            Value::Cons(form) => form.eval_form(ctx, scope),
            _ => Ok(self.clone()),
        }
    }

    /// Invokes the value with a list of unevaluated arguments
    ///
    /// Combos are invoked with the arguments as they are, classes construct a new instance, and
    /// other callables are called with the evaluated arguments.
    pub fn apply(&self, ctx: &mut Context, scope: &Nameset, args: Option<&Cons>) -> Result<Value> {
        match self {
            Value::Combo(combo) => combo.invoke(ctx, scope, args),
            Value::Class(class) => class.construct(ctx, scope, args).map(Value::Instance),
            _ => {
                let args = Cons::eval(ctx, scope, args)?;
                self.call(ctx, scope, args)
            }
        }
    }

    /// Calls the value with a list of evaluated arguments
    pub fn call(&self, ctx: &mut Context, scope: &Nameset, args: Option<Cons>) -> Result<Value> {
        match self {
            Value::Closure(f) => f.call(ctx, scope, args),
            Value::NativeFunction(f) => f.call(ctx, scope, args),
            Value::Combo(combo) => combo.call(ctx, scope, args),
            Value::Class(class) => class
                .construct_with(ctx, scope, args)
                .map(Value::Instance),
            Value::Object(o) => o.call(ctx, scope, args),
            _ => invalid_operator("call".into(), self),
        }
    }

    /// Invokes the named member with a list of unevaluated arguments
    pub fn apply_by_name(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<&Cons>,
    ) -> Result<Value> {
        match self {
            Value::Class(class) => class.invoke_by_name(ctx, scope, name, args),
            Value::Instance(instance) => instance.invoke_by_name(ctx, scope, name, args),
            Value::Combo(combo) => combo.evaluate(ctx, scope, name)?.apply(ctx, scope, args),
            _ => {
                let args = Cons::eval(ctx, scope, args)?;
                self.call_by_name(ctx, scope, name, args)
            }
        }
    }

    /// Invokes the named member with a list of evaluated arguments
    pub fn call_by_name(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<Cons>,
    ) -> Result<Value> {
        match self {
            Value::Class(class) => class.call_by_name(ctx, scope, name, args),
            Value::Instance(instance) => instance.call_by_name(ctx, scope, name, args),
            Value::Combo(combo) => combo.evaluate(ctx, scope, name)?.call(ctx, scope, args),
            Value::Object(o) => match o.call_by_name(ctx, scope, name, args.clone())? {
                Some(result) => Ok(result),
                None => self.call_builtin(ctx, scope, name, args),
            },
            _ => self.call_builtin(ctx, scope, name, args),
        }
    }

    /// Invokes one of the generic operators with a list of unevaluated arguments
    ///
    /// See [Value::call_builtin].
    pub fn apply_builtin(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<&Cons>,
    ) -> Result<Value> {
        let args = Cons::eval(ctx, scope, args)?;
        self.call_builtin(ctx, scope, name, args)
    }

    /// Invokes one of the generic operators that are supported by every value
    ///
    /// - `repr`: returns the value's type as a string.
    /// - `==` and `!=`: compare the value with the single argument.
    pub fn call_builtin(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
        args: Option<Cons>,
    ) -> Result<Value> {
        let args = args.map(|args| args.to_vec()).unwrap_or_default();

        match (name, args.as_slice()) {
            (Quark::REPR, []) => Ok(self.type_as_string().into()),
            (Quark::EQUAL, [other]) => Ok((self == other).into()),
            (Quark::NOT_EQUAL, [other]) => Ok((self != other).into()),
            (Quark::REPR, unexpected) => unexpected_args("||", unexpected),
            (Quark::EQUAL | Quark::NOT_EQUAL, unexpected) => unexpected_args("|Any|", unexpected),
            _ => invalid_operator(name.name(), self),
        }
    }

    /// Returns true if the value has a member with the given name
    ///
    /// When `include_inherited` is false, only the value's own storage is checked.
    pub fn has_member(&self, name: Quark, include_inherited: bool) -> bool {
        match self {
            Value::Class(class) => class.has_member(name, include_inherited),
            Value::Instance(instance) => instance.has_member(name, include_inherited),
            Value::Combo(combo) => combo.has_member(name, include_inherited),
            Value::Object(o) => {
                o.has_member(name) || (include_inherited && name.is_builtin_operator())
            }
            _ => include_inherited && name.is_builtin_operator(),
        }
    }

    /// Binds a const member of the value
    pub fn bind_member_const(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        match self {
            Value::Class(class) => class.bind_const(ctx, scope, name, value),
            Value::Instance(instance) => instance.bind_const(ctx, scope, name, value),
            Value::Combo(combo) => combo.bind_const(ctx, scope, name, value),
            Value::Object(o) => o.bind_member(name, value, true),
            _ => invalid_operator(name.name(), self),
        }
    }

    /// Binds or assigns a member of the value
    pub fn bind_member(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        match self {
            Value::Class(class) => class.bind(ctx, scope, name, value),
            Value::Instance(instance) => instance.bind(ctx, scope, name, value),
            Value::Combo(combo) => combo.bind(ctx, scope, name, value),
            Value::Object(o) => o.bind_member(name, value, false),
            _ => invalid_operator(name.name(), self),
        }
    }

    /// Removes a member of the value, returning the removed value
    pub fn unbind_member(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
    ) -> Result<Option<Value>> {
        match self {
            Value::Class(class) => class.unbind(ctx, scope, name),
            Value::Instance(instance) => instance.unbind(ctx, scope, name),
            Value::Combo(combo) => combo.unbind(ctx, scope, name),
            Value::Object(o) => o.unbind_member(name),
            _ => invalid_operator(name.name(), self),
        }
    }

    /// Evaluates a member of the value
    ///
    /// If the value doesn't have the member, then a [Combo] is returned so that the name can be
    /// invoked later. Objects are given the chance to handle the invocation via
    /// [AlderObject::invoke_by_name](crate::AlderObject::invoke_by_name), other values dispatch
    /// the name to the builtin operators.
    pub fn evaluate_member(&self, ctx: &mut Context, scope: &Nameset, name: Quark) -> Result<Value> {
        match self {
            Value::Class(class) => class.evaluate(ctx, scope, name),
            Value::Instance(instance) => instance.evaluate(ctx, scope, name),
            Value::Combo(combo) => combo.evaluate(ctx, scope, name),
            _ => match self.resolve_member(ctx, scope, name)? {
                Some(result) => Ok(result),
                None => {
                    let dispatch_generic = !matches!(self, Value::Object(_));
                    Ok(Combo::new_symbol(name, self.clone(), dispatch_generic).into())
                }
            },
        }
    }

    // Evaluates a member, returning None if the value doesn't provide the member
    pub(crate) fn resolve_member(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
    ) -> Result<Option<Value>> {
        match self {
            Value::Instance(instance) => instance.resolve(ctx, scope, name),
            Value::Class(class) => Ok(class.resolve(name)),
            Value::Combo(combo) => combo.evaluate(ctx, scope, name).map(Some),
            Value::Object(o) => o.evaluate_member(name),
            _ => Ok(None),
        }
    }

    /// Assigns a new value to this value in place
    ///
    /// Returns false if the value doesn't support in-place assignment, in which case the caller
    /// should rebind the storage slot that holds the value instead.
    pub fn assign(&self, value: &Value) -> Result<bool> {
        match self {
            Value::Object(o) => o.assign(value),
            _ => Ok(false),
        }
    }

    /// Returns true if the value is a function that should be bound to a receiver when it's
    /// retrieved as a member
    pub fn is_closure_like(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::NativeFunction(_))
    }

    /// Returns true if the value can be called with [Value::call]
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_)
                | Value::NativeFunction(_)
                | Value::Combo(_)
                | Value::Class(_)
                | Value::Object(_)
        )
    }

    /// Returns the value's type as a [KString]
    pub fn type_as_string(&self) -> KString {
        use Value::*;
        match &self {
            Null => TYPE_NULL.with(|x| x.clone()),
            Bool(_) => TYPE_BOOL.with(|x| x.clone()),
            Int(_) => TYPE_INT.with(|x| x.clone()),
            Str(_) => TYPE_STRING.with(|x| x.clone()),
            Symbol(_) => TYPE_SYMBOL.with(|x| x.clone()),
            Qualified(_) => TYPE_QUALIFIED.with(|x| x.clone()),
            Cons(_) => TYPE_CONS.with(|x| x.clone()),
            Class(_) => TYPE_CLASS.with(|x| x.clone()),
            Instance(_) => TYPE_INSTANCE.with(|x| x.clone()),
            Combo(_) => TYPE_COMBO.with(|x| x.clone()),
            Closure(_) => TYPE_CLOSURE.with(|x| x.clone()),
            NativeFunction(_) => TYPE_NATIVE_FUNCTION.with(|x| x.clone()),
            Object(o) => o.try_borrow().map_or_else(
                |_| "Error: object already borrowed".into(),
                |o| o.type_string(),
            ),
        }
    }
}

fn eval_qualified(ctx: &mut Context, scope: &Nameset, path: &[Quark]) -> Result<Value> {
    match path {
        [] => Ok(Value::Null),
        [head, rest @ ..] => {
            let mut result = scope.evaluate(*head)?;
            for name in rest {
                result = result.evaluate_member(ctx, scope, *name)?;
            }
            Ok(result)
        }
    }
}

thread_local! {
    static TYPE_NULL: KString = "Null".into();
    static TYPE_BOOL: KString = "Bool".into();
    static TYPE_INT: KString = "Int".into();
    static TYPE_STRING: KString = "String".into();
    static TYPE_SYMBOL: KString = "Symbol".into();
    static TYPE_QUALIFIED: KString = "Qualified".into();
    static TYPE_CONS: KString = "Cons".into();
    static TYPE_CLASS: KString = "Class".into();
    static TYPE_INSTANCE: KString = "Instance".into();
    static TYPE_COMBO: KString = "Combo".into();
    static TYPE_CLOSURE: KString = "Closure".into();
    static TYPE_NATIVE_FUNCTION: KString = "NativeFunction".into();
}

/// Scalars are compared by value, all other values by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Symbol(a), Symbol(b)) => a == b,
            (Qualified(a), Qualified(b)) => a[..] == b[..],
            (Cons(a), Cons(b)) => a.is_same_instance(b),
            (Class(a), Class(b)) => a.is_same_instance(b),
            (Instance(a), Instance(b)) => a.is_same_instance(b),
            (Combo(a), Combo(b)) => a.is_same_instance(b),
            (Closure(a), Closure(b)) => a.is_same_instance(b),
            (NativeFunction(a), NativeFunction(b)) => a.is_same_instance(b),
            (Object(a), Object(b)) => a.is_same_instance(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;
        match self {
            Null => f.write_str("null"),
            Bool(b) => write!(f, "{b}"),
            Int(n) => write!(f, "{n}"),
            Str(s) => f.write_str(s),
            Symbol(name) => write!(f, "{name}"),
            Qualified(path) => {
                for (i, name) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{name}")?;
                }
                Ok(())
            }
            Cons(cons) => write!(f, "{cons}"),
            Object(o) => match o.try_borrow() {
                Ok(o) => f.write_str(&o.display()),
                Err(_) => f.write_str("Object"),
            },
            _ => f.write_str(&self.type_as_string()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;
        match self {
            Str(s) => write!(f, "{s:?}"),
            Null | Bool(_) | Int(_) | Symbol(_) | Qualified(_) | Cons(_) => write!(f, "{self}"),
            _ => write!(f, "{}", self.type_as_string()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<KString> for Value {
    fn from(value: KString) -> Self {
        Self::Str(value)
    }
}

impl From<Quark> for Value {
    fn from(value: Quark) -> Self {
        Self::Symbol(value)
    }
}

impl From<Cons> for Value {
    fn from(value: Cons) -> Self {
        Self::Cons(value)
    }
}

impl From<Class> for Value {
    fn from(value: Class) -> Self {
        Self::Class(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}

impl From<Combo> for Value {
    fn from(value: Combo) -> Self {
        Self::Combo(value)
    }
}

impl From<Closure> for Value {
    fn from(value: Closure) -> Self {
        Self::Closure(value)
    }
}

impl From<NativeFunction> for Value {
    fn from(value: NativeFunction) -> Self {
        Self::NativeFunction(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from("abc"), Value::from(String::from("abc")));
        assert_ne!(Value::from(1), Value::from(true));
        assert_eq!(Value::from(None::<Class>), Value::Null);
    }

    #[test]
    fn references_compare_by_identity() {
        let a = Class::new();
        let b = Class::new();
        assert_eq!(Value::from(a.clone()), Value::from(a));
        assert_ne!(Value::from(Class::new()), Value::from(b));
    }

    #[test]
    fn literals_evaluate_to_themselves() {
        let mut ctx = Context::new();
        let scope = Nameset::new();
        for value in [Value::Null, true.into(), 99.into(), "hello".into()] {
            assert_eq!(value.eval(&mut ctx, &scope).unwrap(), value);
        }
    }

    #[test]
    fn symbols_evaluate_in_scope() {
        let mut ctx = Context::new();
        let scope = Nameset::new();
        let x = Quark::from_name("x");
        scope.bind(x, 123.into()).unwrap();
        assert_eq!(Value::Symbol(x).eval(&mut ctx, &scope).unwrap(), 123.into());
    }

    #[test]
    fn builtin_operators() {
        let mut ctx = Context::new();
        let scope = Nameset::new();
        let value = Value::from(7);

        let repr = value.call_builtin(&mut ctx, &scope, Quark::REPR, None).unwrap();
        assert_eq!(repr, "Int".into());

        let equal = value
            .call_builtin(&mut ctx, &scope, Quark::EQUAL, Cons::from_values([Value::from(7)]))
            .unwrap();
        assert_eq!(equal, true.into());

        let error = value
            .call_builtin(&mut ctx, &scope, Quark::from_name("missing"), None)
            .unwrap_err();
        assert!(matches!(
            error.kind(),
            crate::ErrorKind::InvalidOperator { .. }
        ));
    }
}
