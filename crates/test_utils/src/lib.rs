//! Testing utilities for Alder crates

#![warn(missing_docs)]

mod logging;
mod test_cell;
mod type_helpers;

pub use logging::init_logging;
pub use test_cell::TestCell;
pub use type_helpers::*;
