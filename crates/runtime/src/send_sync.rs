//! Definitions of Send and Sync used in the Alder runtime
//!
//! When the runtime is built for single-threaded use (the `rc` feature), [AlderSend] and
//! [AlderSync] are empty traits implemented for all types.

#[cfg(feature = "rc")]
mod traits {
    /// An empty trait for single-threaded contexts, implemented for all types
    pub trait AlderSend {}
    impl<T: ?Sized> AlderSend for T {}

    /// An empty trait for single-threaded contexts, implemented for all types
    pub trait AlderSync {}
    impl<T: ?Sized> AlderSync for T {}
}

#[cfg(not(feature = "rc"))]
mod traits {
    pub use Send as AlderSend;
    pub use Sync as AlderSync;
}

pub use traits::*;
