//! High-level flash operations
//!
//! This module provides high-level operations for reading, writing,
//! and erasing flash chips.

mod context;
#[cfg(feature = "alloc")]
mod device;
#[cfg(feature = "alloc")]
mod opaque_device;
mod operations;
#[cfg(feature = "alloc")]
mod planner;
#[cfg(feature = "alloc")]
mod spi_device;
#[cfg(feature = "alloc")]
pub mod unified;

pub use context::FlashContext;
#[cfg(feature = "alloc")]
pub use device::{FlashDevice, FlashDeviceExt};
#[cfg(feature = "alloc")]
pub use opaque_device::OpaqueFlashDevice;
pub use operations::*;
#[cfg(feature = "alloc")]
pub use planner::{EraseOp, ProcessingUnit};
#[cfg(feature = "alloc")]
pub use spi_device::SpiFlashDevice;
#[cfg(feature = "alloc")]
pub use unified::{
    smart_write, smart_write_by_layout, smart_write_region, smart_write_two_pass, WriteProgress,
    WriteStats,
};
