//! rflasher-internal - Intel chipset internal flash programmer
//!
//! This crate provides support for the Intel ICH/PCH hardware-sequenced SPI
//! controller found in Intel chipsets from ICH8 onward. It drives the flash
//! chip soldered (or socketed) onto the same board as the host, through the
//! chipset's own SPI engine rather than an external SPI bus adapter.
//!
//! Reference: flashprog/ichspi.c, flashprog/ich_descriptors.c, flashprog/chipset_enable.c

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod chipset;
pub mod controller;
pub mod error;
pub mod ich_regs;
pub mod ichspi;
pub mod intel_pci;
pub mod pci;
pub mod physmap;
pub mod programmer;

pub use chipset::IchChipset;
use chipset::ChipsetEnable;
use error::InternalError;
pub use ichspi::SpiMode;
pub use programmer::{InternalOptions, InternalProgrammer};

/// A chipset found on the PCI bus with a known SPI controller generation
#[derive(Debug, Clone)]
pub struct DetectedChipset {
    /// Matching entry from the static chipset table
    pub enable: &'static ChipsetEnable,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
    pub revision_id: u8,
}

impl DetectedChipset {
    /// The SPI controller generation implemented by this chipset
    pub fn chipset_type(&self) -> IchChipset {
        self.enable.chipset
    }
}

/// Find the single supported Intel chipset on this system
///
/// Returns `Ok(None)` if no supported chipset's LPC/eSPI bridge was found on the
/// PCI bus, and `Err(InternalError::MultipleChipsets)` if more than one matched
/// (this should not happen on real hardware, which has exactly one host bridge).
#[cfg(all(feature = "std", target_os = "linux"))]
pub fn detect_chipset() -> Result<Option<DetectedChipset>, InternalError> {
    pci::find_intel_chipset()
}

#[cfg(not(all(feature = "std", target_os = "linux")))]
pub fn detect_chipset() -> Result<Option<DetectedChipset>, InternalError> {
    Err(InternalError::NotSupported(
        "internal programmer only supported on Linux",
    ))
}
