//! Unified flash operations that work with any FlashDevice
//!
//! This module provides high-level operations (smart write, layout-based
//! operations, verification) that work with any type implementing the
//! `FlashDevice` trait.

use alloc::vec;
use alloc::vec::Vec;

use crate::chip::WriteGranularity;
use crate::error::{Error, Result};
use crate::flash::device::FlashDevice;
use crate::flash::planner::{plan_optimal_erase, plan_optimal_erase_region};
use crate::layout::{Layout, LayoutError, Region};

// =============================================================================
// Constants
// =============================================================================

/// The erased value for flash memory (all bits set)
const ERASED_VALUE: u8 = 0xFF;

/// Default read chunk size
const READ_CHUNK_SIZE: usize = 4096;

// =============================================================================
// Smart write support types
// =============================================================================

/// Determine if an erase is required to transition from `have` to `want`
///
/// Flash memory can only change bits from 1 to 0 during writes. To change
/// bits from 0 to 1, an erase is required (which sets all bits to 1).
///
/// `page_size` is the write-granularity chunk size in bytes; it is only
/// consulted for [`WriteGranularity::Page`] and ignored otherwise.
pub fn need_erase(have: &[u8], want: &[u8], granularity: WriteGranularity, page_size: u32) -> bool {
    assert_eq!(have.len(), want.len());

    match granularity {
        WriteGranularity::Bit => {
            // For bit-granularity, we can only clear bits (1->0).
            // We need erase if any bit needs to go from 0->1
            have.iter().zip(want.iter()).any(|(h, w)| (h & w) != *w)
        }
        WriteGranularity::Byte => {
            // If a byte differs, the old byte must be in erased state
            // (0xFF) to allow writing the new value.
            have.iter().zip(want.iter()).any(|(h, w)| {
                if h == w {
                    false // No change needed
                } else {
                    *h != ERASED_VALUE // Need erase if not already erased
                }
            })
        }
        WriteGranularity::Page => {
            // A page can only be written as a whole; a differing chunk needs
            // an erase if any byte of `have` in that chunk isn't already
            // erased, even if the particular differing byte happens to be.
            let page_size = page_size.max(1) as usize;
            have.chunks(page_size).zip(want.chunks(page_size)).any(|(h, w)| {
                if h == w {
                    false
                } else {
                    h.iter().any(|b| *b != ERASED_VALUE)
                }
            })
        }
    }
}

/// Check if a range of data needs to be written (differs from current contents)
#[inline]
pub fn need_write(have: &[u8], want: &[u8]) -> bool {
    have != want
}

/// A contiguous range of bytes that needs to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRange {
    /// Start offset within the compared buffers
    pub start: u32,
    /// Length in bytes
    pub len: u32,
}

/// Find all contiguous ranges of changed bytes
pub fn get_all_write_ranges(have: &[u8], want: &[u8]) -> Vec<WriteRange> {
    assert_eq!(have.len(), want.len());

    let mut ranges = Vec::new();
    let mut i = 0;

    while i < have.len() {
        // Find start of changed region
        while i < have.len() && have[i] == want[i] {
            i += 1;
        }
        if i >= have.len() {
            break;
        }

        let start = i;

        // Find end of changed region
        while i < have.len() && have[i] != want[i] {
            i += 1;
        }

        ranges.push(WriteRange {
            start: start as u32,
            len: (i - start) as u32,
        });
    }

    ranges
}

/// Statistics from a smart write operation
#[derive(Debug, Clone, Default)]
pub struct WriteStats {
    /// Number of bytes that were different
    pub bytes_changed: usize,
    /// Number of erase operations performed
    pub erases_performed: usize,
    /// Total bytes erased
    pub bytes_erased: usize,
    /// Number of write operations performed
    pub writes_performed: usize,
    /// Total bytes written
    pub bytes_written: usize,
    /// Whether any flash operations were performed
    pub flash_modified: bool,
    /// Whether a second pass (running-image switch) was needed to reach
    /// blocks that were denied access on the first pass
    pub second_pass_performed: bool,
}

/// Callback for progress reporting during operations
pub trait WriteProgress {
    /// Called when starting to read current flash contents
    fn reading(&mut self, total_bytes: usize);

    /// Called to update read progress
    fn read_progress(&mut self, bytes_read: usize);

    /// Called when starting erase operations
    fn erasing(&mut self, blocks_to_erase: usize, bytes_to_erase: usize);

    /// Called after each block is erased
    fn erase_progress(&mut self, blocks_erased: usize, bytes_erased: usize);

    /// Called when starting write operations
    fn writing(&mut self, bytes_to_write: usize);

    /// Called to update write progress
    fn write_progress(&mut self, bytes_written: usize);

    /// Called when the operation is complete
    fn complete(&mut self, stats: &WriteStats);
}

/// A no-op progress reporter
pub struct NoProgress;

impl WriteProgress for NoProgress {
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
    fn erasing(&mut self, _blocks_to_erase: usize, _bytes_to_erase: usize) {}
    fn erase_progress(&mut self, _blocks_erased: usize, _bytes_erased: usize) {}
    fn writing(&mut self, _bytes_to_write: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn complete(&mut self, _stats: &WriteStats) {}
}

// =============================================================================
// Unified operations
// =============================================================================

/// Read flash contents into a buffer
///
/// This is a convenience function that reads with progress reporting.
pub fn read_with_progress<D: FlashDevice, P: WriteProgress>(
    device: &mut D,
    buf: &mut [u8],
    progress: &mut P,
) -> Result<()> {
    let total = buf.len();
    progress.reading(total);

    let mut bytes_read = 0;
    while bytes_read < total {
        let chunk_size = core::cmp::min(READ_CHUNK_SIZE, total - bytes_read);
        device.read(
            bytes_read as u32,
            &mut buf[bytes_read..bytes_read + chunk_size],
        )?;
        bytes_read += chunk_size;
        progress.read_progress(bytes_read);
    }

    Ok(())
}

/// Perform a smart write operation that minimizes flash operations
///
/// This function compares the current flash contents with the desired contents
/// and only erases/writes the regions that actually need to change.
///
/// # Algorithm
/// 1. Read current flash contents
/// 2. Use optimal erase algorithm to plan erase operations (folds into a
///    containing larger erase block once more than 70% of its children
///    need erasing)
/// 3. Erase only the blocks that need erasing
/// 4. Write only the bytes that are different
///
/// # Arguments
/// * `device` - Flash device to write to
/// * `data` - Desired flash contents (must match device size)
/// * `progress` - Progress callback
///
/// # Returns
/// Statistics about the operations performed
pub fn smart_write<D: FlashDevice + ?Sized, P: WriteProgress>(
    device: &mut D,
    data: &[u8],
    progress: &mut P,
) -> Result<WriteStats> {
    let flash_size = device.size();

    if data.len() != flash_size as usize {
        return Err(Error::BufferTooSmall);
    }

    // Clone erase blocks to avoid borrow checker issues
    let erase_blocks: Vec<_> = device.erase_blocks().to_vec();
    let granularity = device.write_granularity();

    let mut stats = WriteStats::default();

    // Step 1: Read current flash contents
    progress.reading(flash_size as usize);
    let mut current = vec![0u8; flash_size as usize];

    let mut bytes_read = 0;
    while bytes_read < flash_size as usize {
        let chunk_size = core::cmp::min(READ_CHUNK_SIZE, flash_size as usize - bytes_read);
        device.read(
            bytes_read as u32,
            &mut current[bytes_read..bytes_read + chunk_size],
        )?;
        bytes_read += chunk_size;
        progress.read_progress(bytes_read);
    }

    // Check if any changes are needed
    if !need_write(&current, data) {
        // Nothing to do - flash already matches
        progress.complete(&stats);
        return Ok(stats);
    }

    // Calculate statistics
    stats.bytes_changed = get_all_write_ranges(&current, data)
        .iter()
        .map(|r| r.len as usize)
        .sum();

    // Step 2: Plan optimal erase operations
    // This uses the hierarchical algorithm that minimizes erase operations
    // by folding to larger blocks when more than 70% of their children need erasing
    let erase_ops = plan_optimal_erase(
        &erase_blocks,
        flash_size,
        Some(&current),
        Some(data),
        0,
        flash_size - 1,
        granularity,
    );

    // Step 3: Erase blocks that need it
    if !erase_ops.is_empty() {
        let bytes_to_erase: usize = erase_ops.iter().map(|op| op.size as usize).sum();
        progress.erasing(erase_ops.len(), bytes_to_erase);

        for (i, op) in erase_ops.iter().enumerate() {
            device.erase(op.start, op.size)?;

            // Update our view of current contents
            let buf_start = op.start as usize;
            let buf_end = (op.start + op.size) as usize;
            if buf_end <= current.len() {
                current[buf_start..buf_end].fill(ERASED_VALUE);
            }

            stats.erases_performed += 1;
            stats.bytes_erased += op.size as usize;
            progress.erase_progress(i + 1, stats.bytes_erased);
        }
        stats.flash_modified = true;
    }

    // Step 4: Write bytes that differ
    // Re-calculate write ranges after erasing
    let write_ranges = get_all_write_ranges(&current, data);

    if !write_ranges.is_empty() {
        let bytes_to_write: usize = write_ranges.iter().map(|r| r.len as usize).sum();
        progress.writing(bytes_to_write);

        let mut bytes_written = 0;

        for range in &write_ranges {
            let write_data = &data[range.start as usize..(range.start + range.len) as usize];
            device.write(range.start, write_data)?;

            bytes_written += range.len as usize;
            progress.write_progress(bytes_written);
            stats.writes_performed += 1;
        }

        stats.bytes_written = bytes_written;
        stats.flash_modified = true;
    }

    progress.complete(&stats);
    Ok(stats)
}

/// Perform a smart write operation for a specific region
///
/// Similar to `smart_write` but only operates on a specific region of flash.
/// Uses the optimal erase algorithm to minimize erase operations.
pub fn smart_write_region<D: FlashDevice + ?Sized, P: WriteProgress>(
    device: &mut D,
    addr: u32,
    data: &[u8],
    progress: &mut P,
) -> Result<WriteStats> {
    if !device.is_valid_range(addr, data.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let flash_size = device.size();
    // Clone erase blocks to avoid borrow checker issues
    let erase_blocks: Vec<_> = device.erase_blocks().to_vec();
    let granularity = device.write_granularity();
    let region_end = addr + data.len() as u32 - 1;

    let mut stats = WriteStats::default();

    // Step 1: Read current contents of the region
    progress.reading(data.len());
    let mut current = vec![0u8; data.len()];

    let mut bytes_read = 0;
    while bytes_read < data.len() {
        let chunk_size = core::cmp::min(READ_CHUNK_SIZE, data.len() - bytes_read);
        device.read(
            addr + bytes_read as u32,
            &mut current[bytes_read..bytes_read + chunk_size],
        )?;
        bytes_read += chunk_size;
        progress.read_progress(bytes_read);
    }

    // Check if any changes are needed
    if !need_write(&current, data) {
        progress.complete(&stats);
        return Ok(stats);
    }

    stats.bytes_changed = get_all_write_ranges(&current, data)
        .iter()
        .map(|r| r.len as usize)
        .sum();

    // Step 2: Plan optimal erase operations for this region
    // The planner may widen the window to the nearest eraser-size boundary,
    // so returned blocks can extend outside [addr, region_end]; the preserve
    // handling below reads/restores whatever falls outside our region
    let erase_ops = plan_optimal_erase(
        &erase_blocks,
        flash_size,
        Some(&current),
        Some(data),
        addr,
        region_end,
        granularity,
    );

    // Step 3: Erase blocks that need it
    if !erase_ops.is_empty() {
        let bytes_to_erase: usize = erase_ops.iter().map(|op| op.size as usize).sum();
        progress.erasing(erase_ops.len(), bytes_to_erase);

        for (i, op) in erase_ops.iter().enumerate() {
            // Handle data outside our region but inside the erase block.
            // The planner may widen the window on both sides at once (a
            // narrow region inside one larger block), so check each side
            // independently rather than picking a single branch.
            let block_end = op.start + op.size;
            let region_end_addr = addr + data.len() as u32;

            let before_len = addr.saturating_sub(op.start) as usize;
            let after_len = block_end.saturating_sub(region_end_addr) as usize;

            let mut before_data = vec![0u8; before_len];
            if before_len > 0 {
                device.read(op.start, &mut before_data)?;
            }
            let mut after_data = vec![0u8; after_len];
            if after_len > 0 {
                device.read(region_end_addr, &mut after_data)?;
            }

            device.erase(op.start, op.size)?;

            if before_len > 0 {
                device.write(op.start, &before_data)?;
            }
            if after_len > 0 {
                device.write(region_end_addr, &after_data)?;
            }

            // Update our view of current contents
            let rel_start = op.start.saturating_sub(addr) as usize;
            let rel_end = ((op.start + op.size).saturating_sub(addr) as usize).min(current.len());
            current[rel_start..rel_end].fill(ERASED_VALUE);

            stats.erases_performed += 1;
            stats.bytes_erased += op.size as usize;
            progress.erase_progress(i + 1, stats.bytes_erased);
        }
        stats.flash_modified = true;
    }

    // Step 4: Write changed bytes
    let write_ranges = get_all_write_ranges(&current, data);

    if !write_ranges.is_empty() {
        let bytes_to_write: usize = write_ranges.iter().map(|r| r.len as usize).sum();
        progress.writing(bytes_to_write);

        let mut bytes_written = 0;

        for range in &write_ranges {
            let write_data = &data[range.start as usize..(range.start + range.len) as usize];
            device.write(addr + range.start, write_data)?;

            bytes_written += range.len as usize;
            progress.write_progress(bytes_written);
            stats.writes_performed += 1;
        }

        stats.bytes_written = bytes_written;
        stats.flash_modified = true;
    }

    progress.complete(&stats);
    Ok(stats)
}

/// Perform a smart write that tolerates a running-firmware region denying
/// access on the first pass (§4.4 two-pass execution).
///
/// Blocks that [`FlashDevice::check_access`] rejects are left untouched in
/// the first pass instead of failing the whole operation. If any block was
/// deferred, the device is asked to [`FlashDevice::switch_running_image`]
/// (e.g. jump to the alternate boot bank), the deferred region is re-read,
/// and a second pass plans and executes against the fresh contents. A
/// device with no alternate image (the default) simply fails the operation
/// with the first block's `AccessDenied` if one was ever deferred, since
/// `switch_running_image` returns `OpcodeNotSupported` and there is no way
/// to make progress on the denied region.
pub fn smart_write_two_pass<D: FlashDevice + ?Sized, P: WriteProgress>(
    device: &mut D,
    data: &[u8],
    progress: &mut P,
) -> Result<WriteStats> {
    let flash_size = device.size();
    if data.len() != flash_size as usize {
        return Err(Error::BufferTooSmall);
    }

    let stats = smart_write_pass(device, 0, data, progress)?;
    let Some((denied_start, denied_end)) = stats.1 else {
        return Ok(stats.0);
    };

    // First pass left a denied region untouched; ask the device to expose
    // it through the alternate image and retry just that slice.
    device.switch_running_image()?;

    let denied_len = (denied_end - denied_start) as usize;
    let mut second = smart_write_region(device, denied_start, &data[denied_start as usize..denied_start as usize + denied_len], progress)?;
    second.second_pass_performed = true;

    let mut combined = stats.0;
    combined.bytes_changed += second.bytes_changed;
    combined.erases_performed += second.erases_performed;
    combined.bytes_erased += second.bytes_erased;
    combined.writes_performed += second.writes_performed;
    combined.bytes_written += second.bytes_written;
    combined.flash_modified |= second.flash_modified;
    combined.second_pass_performed = true;
    Ok(combined)
}

/// First pass of [`smart_write_two_pass`]: writes every block that
/// `check_access` allows, and returns the `[start, end)` byte span of the
/// first contiguous denied run (if any) for the caller to retry after a
/// `switch_running_image`.
///
/// A single denied span is sufficient for the documented scenario (one
/// contiguous running-image region); chips with multiple disjoint protected
/// regions would need this generalized to a list, which no in-scope master
/// implementation currently requires (see Open Questions in DESIGN.md).
#[allow(clippy::type_complexity)]
fn smart_write_pass<D: FlashDevice + ?Sized, P: WriteProgress>(
    device: &mut D,
    base: u32,
    data: &[u8],
    progress: &mut P,
) -> Result<(WriteStats, Option<(u32, u32)>)> {
    let flash_size = device.size();
    let erase_blocks: Vec<_> = device.erase_blocks().to_vec();
    let granularity = device.write_granularity();

    let mut stats = WriteStats::default();
    let mut current = vec![0u8; data.len()];
    read_with_progress(device, &mut current, progress)?;

    if !need_write(&current, data) {
        progress.complete(&stats);
        return Ok((stats, None));
    }

    stats.bytes_changed = get_all_write_ranges(&current, data)
        .iter()
        .map(|r| r.len as usize)
        .sum();

    let erase_ops = plan_optimal_erase(
        &erase_blocks,
        flash_size,
        Some(&current),
        Some(data),
        base,
        base + data.len() as u32 - 1,
        granularity,
    );

    let mut denied: Option<(u32, u32)> = None;

    if !erase_ops.is_empty() {
        let bytes_to_erase: usize = erase_ops.iter().map(|op| op.size as usize).sum();
        progress.erasing(erase_ops.len(), bytes_to_erase);

        for (i, op) in erase_ops.iter().enumerate() {
            if device.check_access(op.start, op.size as usize, true).is_err() {
                denied = Some(merge_denied(denied, op.start, op.start + op.size));
                continue;
            }
            device.erase(op.start, op.size)?;

            let rel_start = (op.start - base) as usize;
            let rel_end = ((op.start + op.size) - base) as usize;
            current[rel_start..rel_end].fill(ERASED_VALUE);

            stats.erases_performed += 1;
            stats.bytes_erased += op.size as usize;
            progress.erase_progress(i + 1, stats.bytes_erased);
        }
        stats.flash_modified = true;
    }

    let write_ranges = get_all_write_ranges(&current, data);
    if !write_ranges.is_empty() {
        let bytes_to_write: usize = write_ranges.iter().map(|r| r.len as usize).sum();
        progress.writing(bytes_to_write);

        let mut bytes_written = 0;
        for range in &write_ranges {
            let abs_start = base + range.start;
            if device.check_access(abs_start, range.len as usize, true).is_err() {
                denied = Some(merge_denied(denied, abs_start, abs_start + range.len));
                continue;
            }
            let write_data = &data[range.start as usize..(range.start + range.len) as usize];
            device.write(abs_start, write_data)?;

            bytes_written += range.len as usize;
            progress.write_progress(bytes_written);
            stats.writes_performed += 1;
        }
        stats.bytes_written = bytes_written;
        stats.flash_modified = true;
    }

    progress.complete(&stats);
    Ok((stats, denied))
}

fn merge_denied(existing: Option<(u32, u32)>, start: u32, end: u32) -> (u32, u32) {
    match existing {
        None => (start, end),
        Some((s, e)) => (s.min(start), e.max(end)),
    }
}

/// Perform a smart write operation for all included regions in a layout
///
/// # Arguments
/// * `device` - Flash device to write to
/// * `layout` - Layout with regions marked as included
/// * `image` - Full flash image (must be at least device size)
/// * `progress` - Progress callback
///
/// # Returns
/// Combined statistics about all operations performed
pub fn smart_write_by_layout<D: FlashDevice + ?Sized, P: WriteProgress>(
    device: &mut D,
    layout: &Layout,
    image: &[u8],
    progress: &mut P,
) -> Result<WriteStats> {
    let flash_size = device.size();

    // Validate layout against device
    layout.validate(flash_size).map_err(|e| match e {
        LayoutError::RegionOutOfBounds => Error::AddressOutOfBounds,
        LayoutError::ChipSizeMismatch { .. } => Error::AddressOutOfBounds,
        _ => Error::LayoutError,
    })?;

    // Image must cover the device
    if image.len() < flash_size as usize {
        return Err(Error::BufferTooSmall);
    }

    // Collect included regions
    let included: Vec<_> = layout.included_regions().collect();
    if included.is_empty() {
        let stats = WriteStats::default();
        progress.complete(&stats);
        return Ok(stats);
    }

    let total_bytes: usize = included.iter().map(|r| r.size() as usize).sum();
    let mut combined_stats = WriteStats::default();
    let mut overall_bytes_read = 0usize;

    // Report total reading
    progress.reading(total_bytes);

    // Process each region
    for region in &included {
        let region_data = &image[region.start as usize..=region.end as usize];

        // Create a wrapper progress that offsets the overall progress
        struct OffsetProgress<'a, P: WriteProgress> {
            inner: &'a mut P,
            read_offset: usize,
        }

        impl<P: WriteProgress> WriteProgress for OffsetProgress<'_, P> {
            fn reading(&mut self, _total_bytes: usize) {}
            fn read_progress(&mut self, bytes_read: usize) {
                self.inner.read_progress(self.read_offset + bytes_read);
            }
            fn erasing(&mut self, blocks_to_erase: usize, bytes_to_erase: usize) {
                self.inner.erasing(blocks_to_erase, bytes_to_erase);
            }
            fn erase_progress(&mut self, blocks_erased: usize, bytes_erased: usize) {
                self.inner.erase_progress(blocks_erased, bytes_erased);
            }
            fn writing(&mut self, bytes_to_write: usize) {
                self.inner.writing(bytes_to_write);
            }
            fn write_progress(&mut self, bytes_written: usize) {
                self.inner.write_progress(bytes_written);
            }
            fn complete(&mut self, _stats: &WriteStats) {}
        }

        let mut offset_progress = OffsetProgress {
            inner: progress,
            read_offset: overall_bytes_read,
        };

        let stats = smart_write_region(device, region.start, region_data, &mut offset_progress)?;

        // Accumulate stats
        combined_stats.bytes_changed += stats.bytes_changed;
        combined_stats.erases_performed += stats.erases_performed;
        combined_stats.bytes_erased += stats.bytes_erased;
        combined_stats.writes_performed += stats.writes_performed;
        combined_stats.bytes_written += stats.bytes_written;
        combined_stats.flash_modified |= stats.flash_modified;

        overall_bytes_read += region.size() as usize;
    }

    progress.complete(&combined_stats);
    Ok(combined_stats)
}

/// Read all included regions from flash into a buffer
///
/// Regions that are not included will be left unchanged in the buffer.
pub fn read_by_layout<D: FlashDevice>(
    device: &mut D,
    layout: &Layout,
    buffer: &mut [u8],
) -> Result<()> {
    let flash_size = device.size();

    // Validate layout against device
    layout.validate(flash_size).map_err(|e| match e {
        LayoutError::RegionOutOfBounds => Error::AddressOutOfBounds,
        LayoutError::ChipSizeMismatch { .. } => Error::AddressOutOfBounds,
        _ => Error::LayoutError,
    })?;

    if buffer.len() < flash_size as usize {
        return Err(Error::BufferTooSmall);
    }

    // Read each included region
    for region in layout.included_regions() {
        let region_buf = &mut buffer[region.start as usize..=region.end as usize];
        device.read(region.start, region_buf)?;
    }

    Ok(())
}

/// Erase all included regions in a layout
pub fn erase_by_layout<D: FlashDevice + ?Sized>(device: &mut D, layout: &Layout) -> Result<()> {
    let flash_size = device.size();

    layout.validate(flash_size).map_err(|e| match e {
        LayoutError::RegionOutOfBounds => Error::AddressOutOfBounds,
        LayoutError::ChipSizeMismatch { .. } => Error::AddressOutOfBounds,
        _ => Error::LayoutError,
    })?;

    for region in layout.included_regions() {
        erase_region(device, region)?;
    }

    Ok(())
}

/// Erase a single region
///
/// This uses the optimal erase algorithm to minimize the number of erase operations.
/// It handles region boundaries that don't align with erase block boundaries
/// by preserving data outside the region.
pub fn erase_region<D: FlashDevice + ?Sized>(device: &mut D, region: &Region) -> Result<()> {
    if !device.is_valid_range(region.start, region.size() as usize) {
        return Err(Error::AddressOutOfBounds);
    }

    let flash_size = device.size();
    // Clone erase blocks to avoid borrow checker issues
    let erase_blocks: Vec<_> = device.erase_blocks().to_vec();

    // Plan optimal erase operations for this region
    let erase_ops = plan_optimal_erase_region(&erase_blocks, flash_size, region.start, region.end);

    for op in &erase_ops {
        let block_end = op.start + op.size - 1;
        let is_unaligned = op.start < region.start || block_end > region.end;

        if is_unaligned {
            // Need to preserve data outside the region
            let mut backup = vec![ERASED_VALUE; op.size as usize];

            // Read data before region (to preserve)
            if region.start > op.start {
                let len = (region.start - op.start) as usize;
                device.read(op.start, &mut backup[..len])?;
            }

            // Read data after region (to preserve)
            if block_end > region.end {
                let start = region.end + 1;
                let rel_start = (start - op.start) as usize;
                let len = (block_end - region.end) as usize;
                device.read(start, &mut backup[rel_start..rel_start + len])?;
            }

            // Erase the block
            device.erase(op.start, op.size)?;

            // Write back preserved data
            if region.start > op.start {
                let len = (region.start - op.start) as usize;
                device.write(op.start, &backup[..len])?;
            }
            if block_end > region.end {
                let start = region.end + 1;
                let rel_start = (start - op.start) as usize;
                let len = (block_end - region.end) as usize;
                device.write(start, &backup[rel_start..rel_start + len])?;
            }
        } else {
            // Block is aligned with region, just erase it
            device.erase(op.start, op.size)?;
        }
    }

    Ok(())
}

/// Verify flash contents match the expected data
///
/// # Arguments
/// * `device` - Flash device to verify
/// * `expected` - Expected data
/// * `addr` - Starting address (0 for full flash)
///
/// # Returns
/// `Ok(())` if verification passes, `Err(VerifyError)` if mismatch detected
pub fn verify<D: FlashDevice>(device: &mut D, expected: &[u8], addr: u32) -> Result<()> {
    if !device.is_valid_range(addr, expected.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut offset = 0usize;

    while offset < expected.len() {
        let chunk_size = core::cmp::min(READ_CHUNK_SIZE, expected.len() - offset);
        let chunk_buf = &mut buf[..chunk_size];
        device.read(addr + offset as u32, chunk_buf)?;

        let expected_chunk = &expected[offset..offset + chunk_size];
        if chunk_buf != expected_chunk {
            return Err(Error::VerifyError);
        }

        offset += chunk_size;
    }

    Ok(())
}

/// Verify all included regions match expected data
pub fn verify_by_layout<D: FlashDevice>(
    device: &mut D,
    layout: &Layout,
    expected: &[u8],
) -> Result<()> {
    let flash_size = device.size();

    layout.validate(flash_size).map_err(|e| match e {
        LayoutError::RegionOutOfBounds => Error::AddressOutOfBounds,
        LayoutError::ChipSizeMismatch { .. } => Error::AddressOutOfBounds,
        _ => Error::LayoutError,
    })?;

    if expected.len() < flash_size as usize {
        return Err(Error::BufferTooSmall);
    }

    for region in layout.included_regions() {
        let expected_region = &expected[region.start as usize..=region.end as usize];
        verify(device, expected_region, region.start)?;
    }

    Ok(())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::chip::EraseBlock;
    use crate::spi::opcodes;

    /// A page-granularity chip must flag a whole page for erase even when
    /// the one byte that differs is itself already erased, because some
    /// *other* byte in the same page isn't.
    #[test]
    fn page_granularity_flags_whole_chunk_on_non_erased_sibling_byte() {
        let have = [0xFFu8, 0x00, 0xFF, 0xFF];
        let want = [0x11u8, 0x00, 0xFF, 0xFF];
        assert!(need_erase(&have, &want, WriteGranularity::Page, 4));
    }

    /// A page-granularity chip needs no erase when every byte in the
    /// differing chunk is already erased.
    #[test]
    fn page_granularity_skips_erase_when_chunk_fully_erased() {
        let have = [0xFFu8, 0xFF, 0xFF, 0xFF];
        let want = [0x11u8, 0xFF, 0xFF, 0xFF];
        assert!(!need_erase(&have, &want, WriteGranularity::Page, 4));
    }

    /// An unchanged chunk needs no erase even if some bytes within it are
    /// not in the erased state.
    #[test]
    fn page_granularity_skips_unchanged_chunk() {
        let have = [0x00u8, 0x11, 0xFF, 0xFF];
        let want = [0x00u8, 0x11, 0xFF, 0xFF];
        assert!(!need_erase(&have, &want, WriteGranularity::Page, 4));
    }

    /// A `FlashDevice` that denies access to a fixed address range until
    /// `switch_running_image` is called, modeling an embedded controller
    /// that mediates flash access and protects its own running firmware.
    struct GatedDevice {
        data: Vec<u8>,
        erase_blocks: Vec<EraseBlock>,
        denied_start: u32,
        denied_end: u32,
        gate_open: bool,
    }

    impl FlashDevice for GatedDevice {
        fn size(&self) -> u32 {
            self.data.len() as u32
        }

        fn erase_granularity(&self) -> u32 {
            self.erase_blocks[0].size
        }

        fn write_granularity(&self) -> WriteGranularity {
            WriteGranularity::Byte
        }

        fn erase_blocks(&self) -> &[EraseBlock] {
            &self.erase_blocks
        }

        fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
            let a = addr as usize;
            buf.copy_from_slice(&self.data[a..a + buf.len()]);
            Ok(())
        }

        fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
            self.check_access(addr, data.len(), true)?;
            let a = addr as usize;
            for (dst, &src) in self.data[a..a + data.len()].iter_mut().zip(data) {
                *dst &= src;
            }
            Ok(())
        }

        fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
            self.check_access(addr, len as usize, true)?;
            let a = addr as usize;
            self.data[a..a + len as usize].fill(ERASED_VALUE);
            Ok(())
        }

        fn check_access(&self, addr: u32, len: usize, _write: bool) -> Result<()> {
            let end = addr + len as u32;
            if !self.gate_open && addr < self.denied_end && end > self.denied_start {
                Err(Error::AccessDenied)
            } else {
                Ok(())
            }
        }

        fn switch_running_image(&mut self) -> Result<()> {
            self.gate_open = true;
            Ok(())
        }
    }

    /// Scenario D — access denied on running region: a 512 KiB chip split
    /// into a protected [0, 0x40000) region and an open [0x40000, 0x80000)
    /// region. The first pass writes the open region; the protected region
    /// is deferred and completed after `switch_running_image`.
    #[test]
    fn two_pass_execution_completes_denied_region_after_image_switch() {
        let size = 512 * 1024u32;
        let mut device = GatedDevice {
            data: vec![0xFFu8; size as usize],
            erase_blocks: vec![EraseBlock::new(opcodes::SE_20, 4096)],
            denied_start: 0,
            denied_end: 0x40000,
            gate_open: false,
        };

        let mut after = vec![0xFFu8; size as usize];
        after[0x1000] = 0x11; // inside the denied region
        after[0x50000] = 0x22; // inside the open region

        let stats = smart_write_two_pass(&mut device, &after, &mut NoProgress).unwrap();

        assert!(stats.second_pass_performed);
        assert_eq!(device.data, after);
    }

    /// If the device never exposes an alternate image (the common case),
    /// a denied block fails the whole operation rather than silently
    /// dropping it.
    #[test]
    fn two_pass_execution_fails_without_alternate_image() {
        struct NoAltImage(GatedDevice);
        impl FlashDevice for NoAltImage {
            fn size(&self) -> u32 {
                self.0.size()
            }
            fn erase_granularity(&self) -> u32 {
                self.0.erase_granularity()
            }
            fn write_granularity(&self) -> WriteGranularity {
                self.0.write_granularity()
            }
            fn erase_blocks(&self) -> &[EraseBlock] {
                self.0.erase_blocks()
            }
            fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
                self.0.read(addr, buf)
            }
            fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
                self.0.write(addr, data)
            }
            fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
                self.0.erase(addr, len)
            }
            fn check_access(&self, addr: u32, len: usize, write: bool) -> Result<()> {
                self.0.check_access(addr, len, write)
            }
            // switch_running_image falls back to the trait default, which
            // returns OpcodeNotSupported.
        }

        let size = 4096u32;
        let mut device = NoAltImage(GatedDevice {
            data: vec![0xFFu8; size as usize],
            erase_blocks: vec![EraseBlock::new(opcodes::SE_20, 4096)],
            denied_start: 0,
            denied_end: size,
            gate_open: false,
        });

        let mut after = vec![0xFFu8; size as usize];
        after[0] = 0x11;

        let result = smart_write_two_pass(&mut device, &after, &mut NoProgress);
        assert_eq!(result, Err(Error::OpcodeNotSupported));
    }
}
