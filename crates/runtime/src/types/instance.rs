use crate::{
    Binding, Class, Combo, Cons, Context, ErrorKind, KCell, LocalSet, Nameset, Pending, Ptr,
    Quark, Result, Value,
    error::{const_error, reserved_name_error},
    runtime_error,
    types::class::{lock_links, optional_class},
    unexpected_args, unexpected_type,
};
use alder_memory::ApplyLock;
use log::{debug, trace};

/// An instance of a [Class]
///
/// An instance has its own member storage, an optional `meta` class that provides static members,
/// and an optional `super` value that's consulted when a member isn't found in the instance or
/// its class. Instances that are constructed by a class are linked together via their `super`
/// links, see [Class::construct].
///
/// Clones share the same instance.
#[derive(Clone)]
pub struct Instance(Ptr<InstanceData>);

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance: {:?}", Ptr::address(&self.0))
    }
}

struct InstanceData {
    lock: ApplyLock,
    locals: LocalSet,
    links: KCell<Links>,
}

#[derive(Default)]
struct Links {
    meta: Option<Class>,
    meta_const: bool,
    super_value: Option<Value>,
    super_const: bool,
}

impl Instance {
    /// Makes a new instance without a class
    pub fn new() -> Self {
        Self::with_links(Links::default())
    }

    /// Makes a new instance of the given class
    ///
    /// The class's `preset` method isn't called, see [Instance::preset].
    pub fn with_meta(meta: Class) -> Self {
        Self::with_links(Links {
            meta: Some(meta),
            ..Default::default()
        })
    }

    fn with_links(links: Links) -> Self {
        Self(Ptr::new(InstanceData {
            lock: ApplyLock::new(),
            locals: LocalSet::new(),
            links: KCell::from(links),
        }))
    }

    /// The instance's class
    pub fn meta(&self) -> Option<Class> {
        self.0.links.borrow().meta.clone()
    }

    /// Returns true if the instance's class link is const
    pub fn meta_const(&self) -> bool {
        self.0.links.borrow().meta_const
    }

    /// Sets the instance's class
    ///
    /// An error is returned if the class link is const.
    pub fn set_meta(&self, meta: Option<Class>, constant: bool) -> Result<()> {
        let previous = {
            let mut links = self.0.links.borrow_mut();
            if links.meta_const {
                return const_error(Quark::META);
            }
            links.meta_const = constant;
            std::mem::replace(&mut links.meta, meta)
        };

        debug!(
            "instance {:?}: meta {} (const: {constant})",
            Ptr::address(&self.0),
            if previous.is_some() { "replaced" } else { "set" },
        );
        Ok(())
    }

    /// Removes the instance's class
    pub fn unset_meta(&self) -> Result<()> {
        self.set_meta(None, false)
    }

    /// The instance's super value
    pub fn super_value(&self) -> Option<Value> {
        self.0.links.borrow().super_value.clone()
    }

    /// Returns true if the instance's super link is const
    pub fn super_const(&self) -> bool {
        self.0.links.borrow().super_const
    }

    /// Sets the instance's super value
    ///
    /// An error is returned if the super link is const, or if the new value's chain of super
    /// values includes this instance.
    pub fn set_super(&self, super_value: Option<Value>, constant: bool) -> Result<()> {
        let _links_guard = lock_links();

        if super_value
            .as_ref()
            .is_some_and(|value| super_chain_includes(value, self))
        {
            return runtime_error!(ErrorKind::InheritanceCycle {
                link: Quark::SUPER.name(),
            });
        }

        let previous = {
            let mut links = self.0.links.borrow_mut();
            if links.super_const {
                return const_error(Quark::SUPER);
            }
            links.super_const = constant;
            std::mem::replace(&mut links.super_value, super_value)
        };

        drop(previous);
        Ok(())
    }

    /// Removes the instance's super value
    pub fn unset_super(&self) -> Result<()> {
        self.set_super(None, false)
    }

    /// The instance's members
    pub fn locals(&self) -> &LocalSet {
        &self.0.locals
    }

    /// Removes all of the instance's members
    ///
    /// The `meta` and `super` links are unaffected.
    pub fn reset(&self) {
        self.locals().reset();
    }

    /// Looks up a name without evaluation, checking the instance's members and then its class
    pub fn local_lookup(&self, name: Quark) -> Option<Value> {
        match self.locals().get(name) {
            Some(value) => Some(value),
            None => self.meta().and_then(|meta| meta.local_lookup(name)),
        }
    }

    /// Returns true if the instance has the named member
    ///
    /// When `include_inherited` is true, then the instance's class, its super value, and the
    /// builtin operators are also checked.
    pub fn has_member(&self, name: Quark, include_inherited: bool) -> bool {
        match name {
            Quark::THIS | Quark::META | Quark::SUPER | Quark::INFER | Quark::DEFER | Quark::MUTE => {
                true
            }
            _ if self.locals().exists(name) => true,
            _ if include_inherited => {
                self.meta().is_some_and(|meta| meta.has_member(name, true))
                    || self
                        .super_value()
                        .is_some_and(|super_value| super_value.has_member(name, true))
                    || name.is_builtin_operator()
            }
            _ => false,
        }
    }

    /// Binds a const member
    ///
    /// `meta` and `super` set the corresponding link as const.
    pub fn bind_const(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        match name {
            Quark::META => self.set_meta(optional_class(&value)?, true)?,
            Quark::SUPER => self.set_super(optional_value(&value), true)?,
            _ => {
                check_reserved(name)?;
                self.locals().bind_const(name, value.clone())?;
            }
        }

        Ok(value)
    }

    /// Binds or assigns a member
    ///
    /// `meta` and `super` set the corresponding link.
    ///
    /// If the name is already bound, either in the instance or in its class, then the bound value
    /// is assigned the new value in place. If the bound value doesn't support assignment then
    /// the binding is replaced in the storage where it was found.
    pub fn bind(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        match name {
            Quark::META => self.set_meta(optional_class(&value)?, false)?,
            Quark::SUPER => self.set_super(optional_value(&value), false)?,
            _ => {
                check_reserved(name)?;
                if !self.assign_existing(name, &value)? {
                    self.locals().bind(name, value.clone())?;
                }
            }
        }

        Ok(value)
    }

    // Assigns a value to an existing binding, returning false if there's no binding for the name
    fn assign_existing(&self, name: Quark, value: &Value) -> Result<bool> {
        if let Some(binding) = self.locals().get_binding(name) {
            if !assign_binding(name, &binding, value)? {
                self.locals().bind(name, value.clone())?;
            }
            return Ok(true);
        }

        let Some(meta) = self.meta() else {
            return Ok(false);
        };

        match meta.local_binding(name) {
            Some(binding) => {
                if !assign_binding(name, &binding, value)? {
                    trace!("rebinding static member '{name}'");
                    meta.rebind_static(name, value.clone())?;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes a member, or clears the `meta` or `super` link
    pub fn unbind(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
    ) -> Result<Option<Value>> {
        let _guard = self.0.lock.lock();

        match name {
            Quark::META => {
                let previous = self.meta();
                self.unset_meta()?;
                Ok(previous.map(Value::Class))
            }
            Quark::SUPER => {
                let previous = self.super_value();
                self.unset_super()?;
                Ok(previous)
            }
            _ => {
                check_reserved(name)?;
                self.locals().unbind(name)
            }
        }
    }

    /// Evaluates a member of the instance
    ///
    /// The reserved names are resolved first:
    /// - `this`: the instance itself.
    /// - `super`: the super value, or null.
    /// - `infer` and `defer`: the links of the instance's class.
    /// - `meta`: the instance's class.
    /// - `mute`: a combo that re-classes the instance when invoked, see [Instance::mute].
    ///
    /// Other names are looked up in the instance's members, its class, and then its super value.
    /// Functions are bound to the instance by wrapping them in a [Combo], so that they're called
    /// with the instance as `this`. If the name can't be resolved then a generic combo is
    /// returned so that the name can be invoked as a builtin operator.
    pub fn evaluate(&self, ctx: &mut Context, scope: &Nameset, name: Quark) -> Result<Value> {
        let _guard = self.0.lock.lock();

        let result = match name {
            Quark::THIS => self.clone().into(),
            Quark::SUPER => self.super_value().unwrap_or_default(),
            Quark::INFER => self.meta().and_then(|meta| meta.infer()).into(),
            Quark::DEFER => self.meta().and_then(|meta| meta.defer()).into(),
            Quark::META => self.meta().into(),
            Quark::MUTE => Combo::new_symbol(Quark::MUTE, self.clone().into(), false).into(),
            _ => match self.resolve(ctx, scope, name)? {
                Some(value) => value,
                None => {
                    trace!("'{name}' isn't a member of the instance, deferring to builtins");
                    Combo::new_symbol(name, self.clone().into(), true).into()
                }
            },
        };

        ctx.post(&result)?;
        Ok(result)
    }

    // Resolves a member via the instance, its class, and its super value
    pub(crate) fn resolve(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
    ) -> Result<Option<Value>> {
        let _guard = self.0.lock.lock();

        if let Some(value) = self.local_lookup(name) {
            return Ok(Some(self.bind_receiver(value)));
        }

        match self.super_value() {
            Some(super_value) => {
                let result = ctx.nested(|ctx| super_value.resolve_member(ctx, scope, name))?;
                Ok(result.map(|value| self.bind_receiver(value)))
            }
            None => Ok(None),
        }
    }

    fn bind_receiver(&self, value: Value) -> Value {
        if value.is_closure_like() {
            Combo::new_value(value, self.clone().into(), false).into()
        } else {
            value
        }
    }

    /// Resets the instance and calls its class's `preset` method with the given arguments
    ///
    /// Null is returned if the instance doesn't have a class, or if the class doesn't have a
    /// `preset` method.
    pub fn preset(&self, ctx: &mut Context, scope: &Nameset, args: Option<Cons>) -> Result<Value> {
        let _guard = self.0.lock.lock();

        self.reset();

        let Some(meta) = self.meta() else {
            return Ok(Value::Null);
        };

        match meta.local_lookup(Quark::PRESET) {
            Some(preset) => self.invoke(ctx, scope, &preset, args),
            None => Ok(Value::Null),
        }
    }

    /// Re-classes the instance, and then presets it with the given arguments
    pub fn mute(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        meta: Class,
        args: Option<Cons>,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        self.set_meta(Some(meta), false)?;
        debug!("instance {:?}: muted", Ptr::address(&self.0));
        self.preset(ctx, scope, args)
    }

    /// Calls the target with the instance bound as `this`
    ///
    /// The target is called in a scope containing `this`, followed by the instance's members,
    /// followed by the caller's scope.
    pub fn invoke(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        target: &Value,
        args: Option<Cons>,
    ) -> Result<Value> {
        // The instance is kept alive until the call is complete
        let instance = self.clone();
        let _guard = instance.0.lock.lock();

        let frame = LocalSet::new();
        frame.bind_const(Quark::THIS, instance.clone().into())?;
        let scope = Nameset::with_parent(
            frame,
            &Nameset::with_parent(instance.locals().clone(), scope),
        );

        let result = ctx.nested(|ctx| target.call(ctx, &scope, args))?;
        ctx.post(&result)?;
        Ok(result)
    }

    /// Invokes a member of the instance with a list of unevaluated arguments
    pub fn invoke_by_name(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<&Cons>,
    ) -> Result<Value> {
        let args = Cons::eval(ctx, scope, args)?;
        self.call_by_name(ctx, scope, name, args)
    }

    /// Invokes a member of the instance with a list of evaluated arguments
    ///
    /// `mute` expects a class as its first argument, with the remaining arguments passed to the
    /// class's `preset` method.
    pub fn call_by_name(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<Cons>,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        let result = if name == Quark::MUTE {
            self.call_mute(ctx, scope, args)
        } else {
            self.evaluate(ctx, scope, name)
                .and_then(|target| ctx.nested(|ctx| target.call(ctx, scope, args)))
        };

        result.map_err(|mut error| {
            error.extend_trace(name);
            error
        })
    }

    fn call_mute(&self, ctx: &mut Context, scope: &Nameset, args: Option<Cons>) -> Result<Value> {
        let Some(args) = args else {
            return unexpected_args("|Class, ...|", &[]);
        };

        match args.car() {
            Some(Value::Class(meta)) => self.mute(ctx, scope, meta, args.cdr()),
            Some(unexpected) => unexpected_type("Class", &unexpected),
            None => unexpected_args("|Class, ...|", &[]),
        }
    }

    /// Returns true if the other Instance refers to the same instance
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

// Names that can't be bound or unbound on an instance
fn check_reserved(name: Quark) -> Result<()> {
    match name {
        Quark::THIS | Quark::INFER | Quark::DEFER | Quark::MUTE | Quark::PRESET => {
            reserved_name_error(name)
        }
        _ => Ok(()),
    }
}

// Assigns a value to a bound value in place, returning false if the value can't be assigned
fn assign_binding(name: Quark, binding: &Binding, value: &Value) -> Result<bool> {
    if binding.constant {
        return const_error(name);
    }
    binding.value.assign(value)
}

// Returns true if following the chain of super values starting at the value reaches the target
//
// Value combos are followed through to their pending value, which provides their members.
fn super_chain_includes(value: &Value, target: &Instance) -> bool {
    let mut current = Some(value.clone());

    while let Some(value) = current {
        current = match value {
            Value::Instance(instance) => {
                if instance.is_same_instance(target) {
                    return true;
                }
                instance.super_value()
            }
            Value::Combo(combo) => match combo.pending() {
                Pending::Value(pending) => Some(pending.clone()),
                Pending::Symbol(_) => None,
            },
            _ => None,
        };
    }

    false
}

fn optional_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        _ => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlderObject, KString, Object};
    use test_case::test_case;

    fn setup() -> (Context, Nameset) {
        (Context::new(), Nameset::new())
    }

    #[derive(Default)]
    struct Cell {
        value: i64,
    }

    impl AlderObject for Cell {
        fn type_string(&self) -> KString {
            "Cell".into()
        }

        fn assign(&mut self, value: &Value) -> Result<bool> {
            match value {
                Value::Int(n) => {
                    self.value = *n;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    #[test_case(Quark::THIS; "this")]
    #[test_case(Quark::INFER; "infer")]
    #[test_case(Quark::DEFER; "defer")]
    #[test_case(Quark::MUTE; "mute")]
    #[test_case(Quark::PRESET; "preset")]
    fn reserved_names_cant_be_bound(name: Quark) {
        let (mut ctx, scope) = setup();
        let instance = Instance::new();

        for result in [
            instance.bind_const(&mut ctx, &scope, name, 1.into()),
            instance.bind(&mut ctx, &scope, name, 1.into()),
        ] {
            let error = result.unwrap_err();
            assert!(matches!(error.kind(), ErrorKind::ReservedName { .. }));
        }

        let error = instance.unbind(&mut ctx, &scope, name).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::ReservedName { .. }));
        assert!(instance.locals().is_empty());
    }

    #[test]
    fn const_meta_can_only_be_set_once() {
        let (mut ctx, scope) = setup();
        let instance = Instance::new();
        let a = Class::new();

        instance
            .bind_const(&mut ctx, &scope, Quark::META, a.clone().into())
            .unwrap();
        assert!(instance.meta_const());
        assert!(instance.meta().unwrap().is_same_instance(&a));

        let error = instance
            .bind(&mut ctx, &scope, Quark::META, Class::new().into())
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::ConstViolation { .. }));
    }

    #[test]
    fn mutable_super_can_be_replaced() {
        let (mut ctx, scope) = setup();
        let instance = Instance::new();
        let first = Instance::new();
        let second = Instance::new();

        instance
            .bind(&mut ctx, &scope, Quark::SUPER, first.clone().into())
            .unwrap();
        instance
            .bind(&mut ctx, &scope, Quark::SUPER, second.clone().into())
            .unwrap();
        assert_eq!(instance.super_value(), Some(second.clone().into()));

        let removed = instance.unbind(&mut ctx, &scope, Quark::SUPER).unwrap();
        assert_eq!(removed, Some(second.into()));
        assert!(instance.super_value().is_none());
    }

    #[test]
    fn bind_assigns_existing_values_in_place() {
        let (mut ctx, scope) = setup();
        let instance = Instance::new();
        let x = Quark::from_name("x");
        let cell = Object::from(Cell::default());

        instance
            .bind(&mut ctx, &scope, x, cell.clone().into())
            .unwrap();
        instance.bind(&mut ctx, &scope, x, 42.into()).unwrap();

        assert_eq!(cell.cast::<Cell>().unwrap().value, 42);
        assert_eq!(instance.local_lookup(x), Some(cell.into()));
    }

    #[test]
    fn bind_rebinds_values_without_assignment() {
        let (mut ctx, scope) = setup();
        let instance = Instance::new();
        let x = Quark::from_name("x");

        instance.bind(&mut ctx, &scope, x, 1.into()).unwrap();
        instance.bind(&mut ctx, &scope, x, 2.into()).unwrap();
        assert_eq!(instance.local_lookup(x), Some(2.into()));
    }

    #[test]
    fn bind_updates_static_members_in_the_class() {
        let (mut ctx, scope) = setup();
        let class = Class::new();
        let count = Quark::from_name("count");
        class.bind(&mut ctx, &scope, count, 0.into()).unwrap();

        let instance = Instance::with_meta(class.clone());
        instance.bind(&mut ctx, &scope, count, 5.into()).unwrap();

        assert!(!instance.locals().exists(count));
        assert_eq!(class.locals().get(count), Some(5.into()));
    }

    #[test]
    fn reset_clears_members_but_keeps_links() {
        let (mut ctx, scope) = setup();
        let class = Class::new();
        let instance = Instance::with_meta(class.clone());
        let parent = Instance::new();
        instance.set_super(Some(parent.clone().into()), false).unwrap();

        let names = ["a", "b", "c"].map(Quark::from_name);
        for name in names {
            instance.bind(&mut ctx, &scope, name, 1.into()).unwrap();
        }

        instance.reset();

        for name in names {
            assert!(!instance.has_member(name, false));
        }
        assert!(instance.meta().unwrap().is_same_instance(&class));
        assert_eq!(instance.super_value(), Some(parent.into()));
    }

    #[test]
    fn reserved_names_evaluate_to_links() {
        let (mut ctx, scope) = setup();
        let parent = Class::new();
        let class = Class::new();
        class.set_infer(Some(parent.clone()), false).unwrap();
        let instance = Instance::with_meta(class.clone());

        let eval = |ctx: &mut Context, name| instance.evaluate(ctx, &scope, name).unwrap();

        assert_eq!(eval(&mut ctx, Quark::THIS), instance.clone().into());
        assert_eq!(eval(&mut ctx, Quark::META), class.into());
        assert_eq!(eval(&mut ctx, Quark::INFER), parent.into());
        assert_eq!(eval(&mut ctx, Quark::DEFER), Value::Null);
        assert_eq!(eval(&mut ctx, Quark::SUPER), Value::Null);

        match eval(&mut ctx, Quark::MUTE) {
            Value::Combo(combo) => assert!(!combo.dispatch_generic()),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn super_cycles_are_rejected() {
        let x = Quark::from_name("x");
        let a = Instance::new();
        let b = Instance::new();
        b.set_super(Some(a.clone().into()), false).unwrap();

        let cycles: [Value; 3] = [
            a.clone().into(),
            b.clone().into(),
            Combo::new_value(b.clone().into(), Value::Null, false).into(),
        ];
        for value in cycles {
            let error = a.set_super(Some(value), false).unwrap_err();
            assert!(matches!(error.kind(), ErrorKind::InheritanceCycle { .. }));
        }

        assert!(a.super_value().is_none());
        assert!(!a.has_member(x, true));
        assert!(!b.has_member(x, true));
    }

    #[test]
    fn members_are_found_via_super() {
        let (mut ctx, scope) = setup();
        let x = Quark::from_name("x");
        let parent = Instance::new();
        parent.bind(&mut ctx, &scope, x, "hello".into()).unwrap();

        let instance = Instance::new();
        instance.set_super(Some(parent.into()), true).unwrap();

        assert!(!instance.has_member(x, false));
        assert!(instance.has_member(x, true));
        assert_eq!(instance.evaluate(&mut ctx, &scope, x).unwrap(), "hello".into());
    }
}
