use crate::{ErrorKind, LocalSet, Ptr, Quark, Result, Value, core_lib, runtime_error};

/// A name resolution scope
///
/// A Nameset is a chain of [LocalSet] frames, names are resolved from the innermost frame
/// outwards. Clones share the same frames.
#[derive(Clone, Default)]
pub struct Nameset(Ptr<Frame>);

#[derive(Default)]
struct Frame {
    locals: LocalSet,
    parent: Option<Nameset>,
}

impl Nameset {
    /// Makes a new root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a root scope that uses the given locals as its frame
    pub fn with_locals(locals: LocalSet) -> Self {
        Self(Ptr::new(Frame {
            locals,
            parent: None,
        }))
    }

    /// Makes a scope that resolves names in `locals` before falling back to `parent`
    pub fn with_parent(locals: LocalSet, parent: &Nameset) -> Self {
        Self(Ptr::new(Frame {
            locals,
            parent: Some(parent.clone()),
        }))
    }

    /// Makes a scope with the core library bound in its root frame
    ///
    /// The returned scope has an empty inner frame, so the core library's bindings can be
    /// shadowed without being modified. An error is returned if the core library couldn't be
    /// bound.
    pub fn with_core_lib() -> Result<Self> {
        let core_lib = Self::with_locals(core_lib::make_module()?);
        Ok(Self::with_parent(LocalSet::new(), &core_lib))
    }

    /// The innermost frame's locals
    pub fn locals(&self) -> &LocalSet {
        &self.0.locals
    }

    /// The enclosing scope
    pub fn parent(&self) -> Option<&Nameset> {
        self.0.parent.as_ref()
    }

    /// Looks up a name, starting at the innermost frame
    pub fn lookup(&self, name: Quark) -> Option<Value> {
        let mut scope = Some(self);

        while let Some(current) = scope {
            if let Some(value) = current.locals().get(name) {
                return Some(value);
            }
            scope = current.parent();
        }

        None
    }

    /// Returns true if the name is bound in any frame
    pub fn exists(&self, name: Quark) -> bool {
        let mut scope = Some(self);

        while let Some(current) = scope {
            if current.locals().exists(name) {
                return true;
            }
            scope = current.parent();
        }

        false
    }

    /// Resolves a name, returning an error if it isn't bound in any frame
    pub fn evaluate(&self, name: Quark) -> Result<Value> {
        match self.lookup(name) {
            Some(value) => Ok(value),
            None => runtime_error!(ErrorKind::UnboundSymbol { name: name.name() }),
        }
    }

    /// Creates or overwrites a const binding in the innermost frame
    pub fn bind_const(&self, name: Quark, value: Value) -> Result<()> {
        self.locals().bind_const(name, value)
    }

    /// Creates or reassigns a binding in the innermost frame
    pub fn bind(&self, name: Quark, value: Value) -> Result<()> {
        self.locals().bind(name, value)
    }

    /// Removes a binding from the innermost frame
    pub fn unbind(&self, name: Quark) -> Result<Option<Value>> {
        self.locals().unbind(name)
    }

    /// Returns the number of frames in the scope chain
    pub fn depth(&self) -> usize {
        let mut result = 0;
        let mut scope = Some(self);

        while let Some(current) = scope {
            result += 1;
            scope = current.parent();
        }

        result
    }
}
