use crate::{KString, Quark, Value};
use std::{error, fmt};
use thiserror::Error;

/// The different error types that can be thrown by the Alder runtime
#[derive(Error, Clone)]
#[allow(missing_docs)]
pub enum ErrorKind {
    #[error("{0}")]
    StringError(String),
    /// A value of the wrong type was supplied, e.g. a non-class value as a class's parent
    #[error("Expected {expected}, but found {}", get_value_types(unexpected))]
    UnexpectedType {
        expected: String,
        unexpected: Vec<Value>,
    },
    /// A call was made with arguments that don't match the callee's expectations
    #[error("Expected arguments {expected}, but found {}", get_value_types(unexpected))]
    UnexpectedArgs {
        expected: String,
        unexpected: Vec<Value>,
    },
    /// An attempt to modify a binding or link that was set as const
    #[error("'{name}' is const and can't be modified")]
    ConstViolation { name: KString },
    /// An attempt to bind or unbind a name that's reserved by the object protocol
    #[error("'{name}' is a reserved name")]
    ReservedName { name: KString },
    /// A member operation on a combo that doesn't support it in the combo's current mode
    #[error("Unable to {operation} '{name}' on a combo bound to a symbol")]
    ComboMode {
        operation: &'static str,
        name: KString,
    },
    /// An operator or member that isn't supported by the value
    #[error("Unable to apply '{name}' to a value of type '{type_name}'")]
    InvalidOperator { name: KString, type_name: KString },
    /// A name that couldn't be resolved in the current scope
    #[error("'{name}' is unbound")]
    UnboundSymbol { name: KString },
    /// Setting a link would make a chain of `infer`, `defer`, or `super` links circular
    #[error("Setting '{link}' would create a cycle")]
    InheritanceCycle { link: KString },
    /// The configured maximum call depth was exceeded
    #[error("The maximum call depth of {limit} has been exceeded")]
    RecursionLimit { limit: usize },
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An error thrown by the Alder runtime
#[derive(Clone, Debug)]
pub struct Error {
    error: ErrorKind,
    trace: Vec<Quark>,
}

impl Error {
    /// Initializes an error with the given error kind
    pub fn new(error: ErrorKind) -> Self {
        Self {
            error,
            trace: Vec::new(),
        }
    }

    /// Returns the error's kind
    pub fn kind(&self) -> &ErrorKind {
        &self.error
    }

    /// The names of the members that were being applied when the error was thrown
    ///
    /// The innermost name comes first.
    pub fn trace(&self) -> &[Quark] {
        &self.trace
    }

    /// Extends the error's trace with the name of a member being applied
    pub(crate) fn extend_trace(&mut self, name: Quark) {
        self.trace.push(name);
    }

    /// Modifies string errors to include the given prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        use ErrorKind::StringError;

        self.error = match self.error {
            StringError(message) => StringError(format!("{prefix}: {message}")),
            other => other,
        };

        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        for name in self.trace.iter() {
            write!(f, "\n--- while applying '{name}'")?;
        }

        Ok(())
    }
}

impl error::Error for Error {}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Self::new(ErrorKind::StringError(error))
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Self::new(ErrorKind::StringError(error.into()))
    }
}

impl From<ErrorKind> for Error {
    fn from(error: ErrorKind) -> Self {
        Self::new(error)
    }
}

/// The Result type used by the Alder Runtime
pub type Result<T> = std::result::Result<T, Error>;

/// Creates a [crate::Error] from a message (with format-like behaviour), wrapped in `Err`
///
/// Wrapping the result in `Err` is a convenience for functions that need to return immediately
/// when an error has occured.
#[macro_export]
macro_rules! runtime_error {
    ($error:literal) => {
        Err($crate::Error::from(format!($error)))
    };
    ($error:expr) => {
        Err($crate::Error::from($error))
    };
    ($error:literal, $($y:expr),+ $(,)?) => {
        Err($crate::Error::from(format!($error, $($y),+)))
    };
}

/// Creates an error that describes a type mismatch
pub fn unexpected_type<T>(expected: &str, unexpected: &Value) -> Result<T> {
    runtime_error!(ErrorKind::UnexpectedType {
        expected: expected.into(),
        unexpected: vec![unexpected.clone()],
    })
}

/// Creates an error that describes unexpected call arguments
pub fn unexpected_args<T>(expected: &str, unexpected: &[Value]) -> Result<T> {
    runtime_error!(ErrorKind::UnexpectedArgs {
        expected: expected.into(),
        unexpected: unexpected.into(),
    })
}

pub(crate) fn const_error<T>(name: Quark) -> Result<T> {
    runtime_error!(ErrorKind::ConstViolation { name: name.name() })
}

pub(crate) fn reserved_name_error<T>(name: Quark) -> Result<T> {
    runtime_error!(ErrorKind::ReservedName { name: name.name() })
}

pub(crate) fn combo_mode_error<T>(operation: &'static str, name: Quark) -> Result<T> {
    runtime_error!(ErrorKind::ComboMode {
        operation,
        name: name.name(),
    })
}

pub(crate) fn invalid_operator<T>(name: KString, value: &Value) -> Result<T> {
    runtime_error!(ErrorKind::InvalidOperator {
        name,
        type_name: value.type_as_string(),
    })
}

fn get_value_types(values: &[Value]) -> String {
    match values {
        [] => "no args".to_string(),
        [single_value] => single_value.type_as_string().to_string(),
        _ => {
            let mut types = String::from('(');
            let mut first = true;
            for value in values {
                if !first {
                    types.push_str(", ");
                }
                first = false;
                types.push_str(&value.type_as_string());
            }
            types.push(')');
            types
        }
    }
}
