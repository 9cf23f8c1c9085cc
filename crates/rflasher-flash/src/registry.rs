//! Programmer registry and initialization
//!
//! This module handles opening programmers by name and creating FlashHandles.
//! It completely hides SpiMaster and OpaqueMaster from the public API.

use crate::handle::{ChipInfo, FlashHandle};
use rflasher_core::chip::ChipDatabase;
#[allow(unused_imports)] // Used in feature-gated code
use rflasher_core::flash::FlashDevice;
use rflasher_core::flash::{OpaqueFlashDevice, SpiFlashDevice};
use rflasher_core::layout::parse_ifd;
use rflasher_core::programmer::OpaqueMaster;
use std::collections::HashMap;

/// Parsed programmer parameters
pub struct ProgrammerParams {
    /// Programmer name (canonical)
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_programmer_params("internal:ich_spi_mode=hwseq")?;
/// assert_eq!(params.name, "internal");
/// assert_eq!(params.params.get("ich_spi_mode"), Some(&"hwseq".to_string()));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a flash programmer and create a FlashHandle
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the programmer string
/// 2. Opening the appropriate programmer
/// 3. Probing the chip (for SPI) or determining flash size (for opaque)
/// 4. Creating a unified FlashHandle
///
/// # Arguments
/// * `programmer` - Programmer specification (e.g., "dummy" or "internal:ich_spi_mode=hwseq")
/// * `db` - Chip database for JEDEC ID lookup
///
/// # Returns
/// A FlashHandle that abstracts over the programmer type
///
/// # Example
/// ```ignore
/// let db = ChipDatabase::new();
/// let mut handle = open_flash("dummy", &db)?;
///
/// // Use the handle - works the same for all programmer types
/// let size = handle.size();
/// println!("Flash size: {} bytes", size);
/// ```
pub fn open_flash(
    programmer: &str,
    db: &ChipDatabase,
) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(db),

        #[cfg(feature = "internal")]
        "internal" => open_internal(&params, db),

        _ => Err(format!("Unknown programmer: {}", params.name).into()),
    }
}

// Helper to get flash size from IFD for opaque programmers
fn get_flash_size_from_ifd(
    master: &mut dyn OpaqueMaster,
) -> Result<u32, Box<dyn std::error::Error>> {
    let mut header = [0u8; 4096];
    master.read(0, &mut header)?;

    if let Ok(layout) = parse_ifd(&header) {
        let size = layout.regions.iter().map(|r| r.end + 1).max().unwrap_or(0);
        if size > 0 {
            return Ok(size);
        }
    }

    let size = master.size();
    if size > 0 {
        return Ok(size as u32);
    }

    Err("Cannot determine flash size".into())
}

// Programmer-specific open functions
// These handle the details of each programmer type and return a FlashHandle

#[cfg(feature = "dummy")]
fn open_dummy(db: &ChipDatabase) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    let mut master = rflasher_dummy::DummyFlash::new_default();
    let ctx = rflasher_core::flash::probe(&mut master, db)?;

    log::info!(
        "Found: {} {} ({} bytes)",
        ctx.chip.vendor,
        ctx.chip.name,
        ctx.chip.total_size
    );

    let chip_info = ChipInfo::from(&ctx);
    let device = SpiFlashDevice::new_owned(master, ctx);
    Ok(FlashHandle::with_chip_info(Box::new(device), chip_info))
}

#[cfg(feature = "internal")]
fn open_internal(
    params: &ProgrammerParams,
    db: &ChipDatabase,
) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    use rflasher_internal::{InternalOptions, InternalProgrammer, SpiMode};

    log::info!("Opening internal programmer...");

    let options: Vec<(&str, &str)> = params
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let internal_opts = InternalOptions::from_options(&options)
        .map_err(|e| format!("Invalid internal programmer options: {}", e))?;

    if internal_opts.mode != SpiMode::Auto {
        log::info!("Using ich_spi_mode={}", internal_opts.mode);
    }

    let mut programmer = InternalProgrammer::with_options(internal_opts).map_err(|e| {
        format!(
            "Failed to initialize internal programmer: {}\n\
             Make sure you have root privileges and a supported Intel chipset.\n\
             For Intel ICH7, only swseq is supported.\n\
             For Intel PCH100+, swseq may be locked (use ich_spi_mode=hwseq).",
            e
        )
    })?;

    // Software sequencing: can probe chip via SPI
    // Hardware sequencing: opaque operations only
    if programmer.mode() == SpiMode::SoftwareSequencing {
        log::info!("Using SPI mode (swseq allows chip probing)");
        let ctx = rflasher_core::flash::probe(&mut programmer, db)?;
        log::info!(
            "Found: {} {} ({} bytes)",
            ctx.chip.vendor,
            ctx.chip.name,
            ctx.chip.total_size
        );

        let chip_info = ChipInfo::from(&ctx);
        let device = SpiFlashDevice::new(&mut programmer, ctx);
        Ok(FlashHandle::with_chip_info(Box::new(device), chip_info))
    } else {
        log::info!("Using opaque mode (hwseq - no chip probing available)");
        let flash_size = get_flash_size_from_ifd(&mut programmer)?;
        log::info!("Flash size: {} bytes (from IFD)", flash_size);

        let device = OpaqueFlashDevice::new_owned(programmer, flash_size);
        Ok(FlashHandle::without_chip_info(Box::new(device)))
    }
}

// Programmer information and listing
/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory flash emulator for testing",
    });

    #[cfg(feature = "internal")]
    programmers.push(ProgrammerInfo {
        name: "internal",
        aliases: &[],
        description: "Intel PCH internal SPI/FWH controller (ich_spi_mode=<auto|swseq|hwseq>)",
    });

    programmers
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}
