//! The interned symbol registry

use crate::KString;
use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::{fmt, sync::LazyLock};

// The reserved names are interned first, in the order of their `Quark` constants.
const RESERVED_NAMES: [&str; 10] = [
    "this", "meta", "mute", "super", "infer", "defer", "preset", "repr", "==", "!=",
];

static REGISTRY: LazyLock<RwLock<IndexSet<Box<str>, FxBuildHasher>>> = LazyLock::new(|| {
    let mut names = IndexSet::with_capacity_and_hasher(256, FxBuildHasher);
    for name in RESERVED_NAMES {
        names.insert(Box::from(name));
    }
    RwLock::new(names)
});

/// An interned symbol id
///
/// Quarks are process-wide, two quarks are equal if and only if their names are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quark(u32);

impl Quark {
    /// `this`, the receiver of a method call
    pub const THIS: Self = Self(0);
    /// `meta`, the class of an instance
    pub const META: Self = Self(1);
    /// `mute`, re-classes an instance in place
    pub const MUTE: Self = Self(2);
    /// `super`, the next instance in a construction chain
    pub const SUPER: Self = Self(3);
    /// `infer`, the parent of a class
    pub const INFER: Self = Self(4);
    /// `defer`, the delegate of a class
    pub const DEFER: Self = Self(5);
    /// `preset`, the initializer of a class's instances
    pub const PRESET: Self = Self(6);
    /// `repr`, the built-in type name operator
    pub const REPR: Self = Self(7);
    /// `==`, the built-in equality operator
    pub const EQUAL: Self = Self(8);
    /// `!=`, the built-in inequality operator
    pub const NOT_EQUAL: Self = Self(9);

    /// Returns the quark for the given name, interning the name if needed
    pub fn from_name(name: &str) -> Self {
        if let Some(index) = REGISTRY.read().get_index_of(name) {
            return Self(index as u32);
        }

        let (index, _) = REGISTRY.write().insert_full(Box::from(name));
        Self(index as u32)
    }

    /// Returns the quark for the given name if it has already been interned
    pub fn lookup(name: &str) -> Option<Self> {
        REGISTRY
            .read()
            .get_index_of(name)
            .map(|index| Self(index as u32))
    }

    /// Returns the quark's name
    pub fn name(self) -> KString {
        match REGISTRY.read().get_index(self.0 as usize) {
            Some(name) => KString::from(&**name),
            None => format!("#{}", self.0).into(),
        }
    }

    /// Returns the quark's id
    pub fn id(self) -> u32 {
        self.0
    }

    /// Returns true if the quark is one of the names that objects intercept before storage
    pub fn is_reserved(self) -> bool {
        self.0 <= Self::PRESET.0
    }

    /// Returns true if the quark names one of the generic operators supported by every value
    pub fn is_builtin_operator(self) -> bool {
        matches!(self, Self::REPR | Self::EQUAL | Self::NOT_EQUAL)
    }
}

impl From<&str> for Quark {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for Quark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Quark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quark({}: {})", self.0, self.name())
    }
}
