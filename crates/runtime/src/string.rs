use crate::Ptr;
use std::{fmt, ops::Deref};

/// The immutable string type used in the Alder runtime
///
/// Clones share the same allocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KString(Ptr<str>);

impl KString {
    /// Returns the string as a `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the two strings share the same allocation
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for KString {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for KString {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for KString {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl PartialEq<&str> for KString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for KString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for KString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}
