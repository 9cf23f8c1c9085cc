//! Write protection support
//!
//! This module provides types and functions for working with flash chip
//! write protection.

mod ops;
mod ranges;
mod types;

pub use ops::*;
pub use ranges::*;
pub use types::*;
