use crate::{
    Binding, Combo, Cons, Context, ErrorKind, Instance, KCell, LocalSet, Nameset, Ptr, Quark, Result,
    Value,
    error::const_error,
    runtime_error, unexpected_args, unexpected_type,
};
use alder_memory::ApplyLock;
use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};

/// A class, containing static members along with optional `infer` (parent) and `defer`
/// (delegate) links
///
/// Classes are the factories for [Instance]s, see [Class::construct].
///
/// Clones share the same class.
#[derive(Clone)]
pub struct Class(Ptr<ClassData>);

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Class: {:?}", Ptr::address(&self.0))
    }
}

struct ClassData {
    // Serializes protocol operations, while allowing them to re-enter the class
    lock: ApplyLock,
    locals: LocalSet,
    links: KCell<Links>,
}

#[derive(Default)]
struct Links {
    infer: Option<Class>,
    infer_const: bool,
    defer: Option<Class>,
    defer_const: bool,
}

#[derive(Clone, Copy)]
enum Link {
    Infer,
    Defer,
}

impl Link {
    fn name(self) -> Quark {
        match self {
            Link::Infer => Quark::INFER,
            Link::Defer => Quark::DEFER,
        }
    }
}

impl Links {
    fn get(&self, link: Link) -> (Option<&Class>, bool) {
        match link {
            Link::Infer => (self.infer.as_ref(), self.infer_const),
            Link::Defer => (self.defer.as_ref(), self.defer_const),
        }
    }

    fn get_mut(&mut self, link: Link) -> (&mut Option<Class>, &mut bool) {
        match link {
            Link::Infer => (&mut self.infer, &mut self.infer_const),
            Link::Defer => (&mut self.defer, &mut self.defer_const),
        }
    }
}

impl Class {
    /// Makes a new class with no members or links
    pub fn new() -> Self {
        Self(Ptr::new(ClassData {
            lock: ApplyLock::new(),
            locals: LocalSet::new(),
            links: KCell::from(Links::default()),
        }))
    }

    /// The class factory, which only accepts an empty argument list
    pub fn make(args: &[Value]) -> Result<Self> {
        match args {
            [] => Ok(Self::new()),
            unexpected => unexpected_args("||", unexpected),
        }
    }

    /// The class's static members
    pub fn locals(&self) -> &LocalSet {
        &self.0.locals
    }

    /// The class's parent class
    pub fn infer(&self) -> Option<Class> {
        self.link(Link::Infer)
    }

    /// Returns true if the parent link is const
    pub fn infer_const(&self) -> bool {
        self.link_const(Link::Infer)
    }

    /// Sets the class's parent class
    ///
    /// An error is returned if the parent link is const, or if the new parent's chain of parents
    /// includes this class.
    pub fn set_infer(&self, class: Option<Class>, constant: bool) -> Result<()> {
        self.set_link(Link::Infer, class, constant)
    }

    /// Removes the class's parent class
    pub fn unset_infer(&self) -> Result<()> {
        self.set_link(Link::Infer, None, false)
    }

    /// The class's delegate class
    pub fn defer(&self) -> Option<Class> {
        self.link(Link::Defer)
    }

    /// Returns true if the delegate link is const
    pub fn defer_const(&self) -> bool {
        self.link_const(Link::Defer)
    }

    /// Sets the class's delegate class
    ///
    /// An error is returned if the delegate link is const, or if the new delegate's chain of
    /// delegates includes this class.
    pub fn set_defer(&self, class: Option<Class>, constant: bool) -> Result<()> {
        self.set_link(Link::Defer, class, constant)
    }

    /// Removes the class's delegate class
    pub fn unset_defer(&self) -> Result<()> {
        self.set_link(Link::Defer, None, false)
    }

    fn link(&self, link: Link) -> Option<Class> {
        self.0.links.borrow().get(link).0.cloned()
    }

    fn link_const(&self, link: Link) -> bool {
        self.0.links.borrow().get(link).1
    }

    fn set_link(&self, link: Link, class: Option<Class>, constant: bool) -> Result<()> {
        // Held until the new link is in place, so that concurrent setters can't form a cycle
        let _links_guard = lock_links();

        if self.link_const(link) {
            return const_error(link.name());
        }

        if class.as_ref().is_some_and(|class| class.chain_includes(link, self)) {
            return runtime_error!(ErrorKind::InheritanceCycle {
                link: link.name().name(),
            });
        }

        let is_set = class.is_some();
        let previous = {
            let mut links = self.0.links.borrow_mut();
            let (current, current_const) = links.get_mut(link);
            if *current_const {
                return const_error(link.name());
            }
            *current_const = constant;
            std::mem::replace(current, class)
        };

        debug!(
            "class {:?}: '{}' {} (const: {constant})",
            Ptr::address(&self.0),
            link.name(),
            if is_set { "set" } else { "cleared" }
        );

        // The previous link is released after the class's links are unlocked
        drop(previous);
        Ok(())
    }

    // Returns true if following the chain of links starting at self reaches the target
    fn chain_includes(&self, link: Link, target: &Class) -> bool {
        let mut current = Some(self.clone());

        while let Some(class) = current {
            if class.is_same_instance(target) {
                return true;
            }
            current = class.link(link);
        }

        false
    }

    /// Looks up a name without evaluation, checking the class's members and then its delegates
    pub fn local_lookup(&self, name: Quark) -> Option<Value> {
        match self.locals().get(name) {
            Some(value) => Some(value),
            None => self.defer().and_then(|defer| defer.local_lookup(name)),
        }
    }

    // Like local_lookup, but returns the binding so that its const flag can be checked
    pub(crate) fn local_binding(&self, name: Quark) -> Option<Binding> {
        match self.locals().get_binding(name) {
            Some(binding) => Some(binding),
            None => self.defer().and_then(|defer| defer.local_binding(name)),
        }
    }

    // Resolves a member that's provided by the class, including its links
    pub(crate) fn resolve(&self, name: Quark) -> Option<Value> {
        match name {
            Quark::INFER => Some(self.infer().into()),
            Quark::DEFER => Some(self.defer().into()),
            _ => self.local_lookup(name),
        }
    }

    // Rebinds a member in the layer (the class itself, or one of its delegates) that holds it
    //
    // Returns false if the member isn't found.
    pub(crate) fn rebind_static(&self, name: Quark, value: Value) -> Result<bool> {
        if self.locals().exists(name) {
            self.locals().bind(name, value)?;
            Ok(true)
        } else {
            match self.defer() {
                Some(defer) => defer.rebind_static(name, value),
                None => Ok(false),
            }
        }
    }

    /// Returns true if the class has the named member
    ///
    /// When `include_inherited` is true, then the class's delegates and the builtin operators are
    /// also checked.
    pub fn has_member(&self, name: Quark, include_inherited: bool) -> bool {
        match name {
            Quark::INFER | Quark::DEFER => true,
            _ if self.locals().exists(name) => true,
            _ if include_inherited => {
                self.defer()
                    .is_some_and(|defer| defer.has_member(name, true))
                    || name.is_builtin_operator()
            }
            _ => false,
        }
    }

    /// Binds a const static member
    ///
    /// `infer` and `defer` set the corresponding link as const.
    pub fn bind_const(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        match name {
            Quark::INFER => self.set_infer(optional_class(&value)?, true)?,
            Quark::DEFER => self.set_defer(optional_class(&value)?, true)?,
            _ => self.locals().bind_const(name, value.clone())?,
        }

        Ok(value)
    }

    /// Binds or reassigns a static member
    ///
    /// `infer` and `defer` set the corresponding link.
    pub fn bind(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
        value: Value,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        match name {
            Quark::INFER => self.set_infer(optional_class(&value)?, false)?,
            Quark::DEFER => self.set_defer(optional_class(&value)?, false)?,
            _ => self.locals().bind(name, value.clone())?,
        }

        Ok(value)
    }

    /// Removes a static member, or clears the `infer` or `defer` link
    pub fn unbind(
        &self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
    ) -> Result<Option<Value>> {
        let _guard = self.0.lock.lock();

        match name {
            Quark::INFER => {
                let previous = self.infer();
                self.unset_infer()?;
                Ok(previous.map(Value::Class))
            }
            Quark::DEFER => {
                let previous = self.defer();
                self.unset_defer()?;
                Ok(previous.map(Value::Class))
            }
            _ => self.locals().unbind(name),
        }
    }

    /// Evaluates a member of the class
    ///
    /// `infer` and `defer` return the corresponding link. Other names are looked up in the
    /// class's members, and then evaluated on the delegate class. If there's no delegate then a
    /// generic [Combo] is returned so that the name can be invoked as a builtin operator.
    pub fn evaluate(&self, ctx: &mut Context, scope: &Nameset, name: Quark) -> Result<Value> {
        let _guard = self.0.lock.lock();

        let result = match name {
            Quark::INFER => self.infer().into(),
            Quark::DEFER => self.defer().into(),
            _ => match self.locals().get(name) {
                Some(value) => value,
                None => match self.defer() {
                    Some(defer) => ctx.nested(|ctx| defer.evaluate(ctx, scope, name))?,
                    None => {
                        trace!("'{name}' isn't a member of the class, deferring to builtins");
                        Combo::new_symbol(name, self.clone().into(), true).into()
                    }
                },
            },
        };

        ctx.post(&result)?;
        Ok(result)
    }

    /// Invokes a member of the class with a list of unevaluated arguments
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

    /// Invokes a member of the class with a list of evaluated arguments
    pub fn call_by_name(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        name: Quark,
        args: Option<Cons>,
    ) -> Result<Value> {
        let _guard = self.0.lock.lock();

        let target = self.evaluate(ctx, scope, name)?;
        let result = ctx
            .nested(|ctx| target.call(ctx, scope, args))
            .map_err(|mut error| {
                error.extend_trace(name);
                error
            })?;

        ctx.post(&result)?;
        Ok(result)
    }

    /// Constructs an instance of the class with a list of unevaluated arguments
    ///
    /// See [Class::construct_with].
    pub fn construct(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        args: Option<&Cons>,
    ) -> Result<Instance> {
        let args = Cons::eval(ctx, scope, args)?;
        self.construct_with(ctx, scope, args)
    }

    /// Constructs an instance of the class with a list of evaluated arguments
    ///
    /// An instance is made for the class and for each class in its chain of parents, with each
    /// ancestor's instance linked to the previous instance via its `super` link. The `super` link
    /// is const if the ancestor's own `infer` link is const.
    ///
    /// The instance of the outermost ancestor is then preset with the arguments and returned, so
    /// its `super` chain leads back down to the instance of this class.
    pub fn construct_with(
        &self,
        ctx: &mut Context,
        scope: &Nameset,
        args: Option<Cons>,
    ) -> Result<Instance> {
        let _guard = self.0.lock.lock();

        let mut current = Instance::with_meta(self.clone());
        let mut depth = 0;
        let mut ancestor = self.infer();

        while let Some(class) = ancestor {
            let next = Instance::with_meta(class.clone());
            next.set_super(Some(current.into()), class.infer_const())?;
            current = next;
            ancestor = class.infer();
            depth += 1;
        }

        ctx.nested(|ctx| current.preset(ctx, scope, args))?;
        debug!(
            "class {:?}: constructed instance with {depth} ancestor(s)",
            Ptr::address(&self.0)
        );

        ctx.post(&current.clone().into())?;
        Ok(current)
    }

    /// Returns true if the other Class refers to the same class
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Class {
    fn default() -> Self {
        Self::new()
    }
}

static LINKS_LOCK: Mutex<()> = Mutex::new(());

// Serializes changes to the links between objects (`infer`, `defer`, and `super`)
//
// The cycle checks read links of other objects, so they're only valid while no other link can
// change.
pub(crate) fn lock_links() -> MutexGuard<'static, ()> {
    LINKS_LOCK.lock()
}

// Converts a value that was bound to a class link
pub(crate) fn optional_class(value: &Value) -> Result<Option<Class>> {
    match value {
        Value::Null => Ok(None),
        Value::Class(class) => Ok(Some(class.clone())),
        unexpected => unexpected_type("Class or Null", unexpected),
    }
}
