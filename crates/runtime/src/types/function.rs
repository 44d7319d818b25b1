use crate::{Cons, Context, LocalSet, Nameset, Ptr, Quark, Result, Value, unexpected_args};

/// A function defined by a list of parameter names and a body form
///
/// When called, the arguments are bound to the parameter names in a new frame on top of the
/// caller's scope, and then the body is evaluated.
///
/// See also:
/// * [`NativeFunction`](crate::NativeFunction)
/// * [`Value::Closure`](crate::Value::Closure)
#[derive(Clone)]
pub struct Closure(Ptr<ClosureInfo>);

struct ClosureInfo {
    params: Vec<Quark>,
    body: Value,
}

impl Closure {
    /// Returns a [Closure] with the given parameters and body
    pub fn new(params: impl IntoIterator<Item = Quark>, body: Value) -> Self {
        Self(Ptr::new(ClosureInfo {
            params: params.into_iter().collect(),
            body,
        }))
    }

    /// The function's parameter names
    pub fn params(&self) -> &[Quark] {
        &self.0.params
    }

    /// The function's body
    pub fn body(&self) -> &Value {
        &self.0.body
    }

    /// Calls the function with a list of evaluated arguments
    pub fn call(&self, ctx: &mut Context, scope: &Nameset, args: Option<Cons>) -> Result<Value> {
        let args = args.map(|args| args.to_vec()).unwrap_or_default();

        if args.len() != self.params().len() {
            return unexpected_args(&self.signature(), &args);
        }

        let frame = LocalSet::new();
        for (name, value) in self.params().iter().zip(args) {
            frame.bind(*name, value)?;
        }

        let scope = Nameset::with_parent(frame, scope);
        ctx.nested(|ctx| self.body().eval(ctx, &scope))
    }

    fn signature(&self) -> String {
        let params = self
            .params()
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        format!("|{}|", params.join(", "))
    }

    /// Returns true if the other Closure refers to the same function
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.0, &other.0)
    }
}
