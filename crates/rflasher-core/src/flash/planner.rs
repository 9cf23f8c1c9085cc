//! Erase-and-write planner
//!
//! Turns a `before`/`after` pair of chip-sized buffers into the minimal
//! ordered list of erase operations that realizes `after`, given a chip's
//! heterogeneous erase-block catalog. Three steps, run once per pass:
//!
//! 1. Eraser selection: build an ascending, deduplicated-by-size list of the
//!    erase commands available on the chip.
//! 2. Diff + fold: mark the smallest blocks that differ, then fold upward
//!    into a containing larger block once enough of its children are marked,
//!    and prune the redundant smaller marks back out.
//! 3. Processing-unit emission: compact the marked blocks at each surviving
//!    size into maximal contiguous runs.
//!
//! Region-scoped callers only have `before`/`after` data for the region
//! itself; bytes outside it are padded so they never register a diff, which
//! keeps boundary-straddling blocks out of the plan (the caller's
//! read-modify-write logic handles those separately).

use alloc::vec;
use alloc::vec::Vec;

use crate::chip::{EraseBlock, WriteGranularity};
use crate::error::{Error, Result};

const ERASED_VALUE: u8 = 0xFF;

/// A maximal run of contiguous same-size blocks chosen by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingUnit {
    /// Byte offset of the first block in the run
    pub offset: u32,
    /// Size of each block in the run
    pub block_size: u32,
    /// Number of consecutive blocks covered
    pub num_blocks: u32,
}

impl ProcessingUnit {
    /// The exclusive end offset of the run
    pub fn end(&self) -> u32 {
        self.offset + self.block_size * self.num_blocks
    }
}

/// A single erase operation: `size` bytes starting at `start`.
///
/// This is the flattened view of a [`ProcessingUnit`] that callers which only
/// issue `erase(addr, len)` calls want; `start`/`size` always describe one
/// contiguous byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseOp {
    /// Start address of the operation
    pub start: u32,
    /// Length in bytes
    pub size: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct BlockMark {
    need_erase: bool,
    need_change: bool,
}

struct RangeMap {
    block_size: u32,
    /// floor(children_per_parent * 7 / 10); 0 for the finest map, which has
    /// no children to fold.
    fold_threshold: u32,
    blocks: Vec<BlockMark>,
}

impl RangeMap {
    fn new(block_size: u32, num_blocks: u32, children_per_parent: u32) -> Self {
        Self {
            block_size,
            fold_threshold: (children_per_parent * 7) / 10,
            blocks: vec![BlockMark::default(); num_blocks as usize],
        }
    }
}

/// §4.1 eraser selection: ascending, deduplicated-by-size catalog of erasers
/// that evenly tile `chip_size`.
///
/// A uniform `EraseBlock` (see [`EraseBlock::is_uniform`]) tiles the chip at
/// one size, so "coverage reaches the highest modified offset" reduces to
/// "the size tiles the chip". A genuinely non-uniform eraser (a boot-sector
/// command covering a mix of block sizes under one opcode) is rejected here
/// rather than treated as chip-wide-uniform at its first region's size —
/// this planner does not yet reason about per-region offsets within a single
/// erase command, so using such a command would erase the wrong span on
/// every block past its first region.
fn select_erasers(erase_blocks: &[EraseBlock], chip_size: u32) -> Result<Vec<u32>> {
    let mut sizes: Vec<u32> = Vec::new();
    for eb in erase_blocks {
        if !eb.is_uniform() {
            continue;
        }
        if eb.size == 0 || eb.size > chip_size || !chip_size.is_multiple_of(eb.size) {
            continue;
        }
        if !sizes.contains(&eb.size) {
            sizes.push(eb.size);
        }
    }
    sizes.sort_unstable();
    if sizes.is_empty() {
        return Err(Error::NoSuitableEraser);
    }
    Ok(sizes)
}

/// Run the diff + fold + prune algorithm (§4.2) and emit processing units
/// (§4.3) over a window of `window_len` bytes whose erase-block sizes are
/// `sizes` (ascending, all dividing `window_len`). Offsets in the result are
/// relative to the start of the window.
fn diff_fold_prune(sizes: &[u32], window_len: u32, before: &[u8], after: &[u8]) -> Vec<ProcessingUnit> {
    debug_assert_eq!(before.len(), after.len());
    debug_assert_eq!(before.len() as u32, window_len);

    let mut maps: Vec<RangeMap> = Vec::with_capacity(sizes.len());
    for (i, &size) in sizes.iter().enumerate() {
        let num_blocks = window_len / size;
        let children_per_parent = if i == 0 { 0 } else { size / sizes[i - 1] };
        maps.push(RangeMap::new(size, num_blocks, children_per_parent));
    }

    // Step 1: fine-grained diff at the smallest granularity.
    {
        let finest = &mut maps[0];
        let block_size = finest.block_size as usize;
        let mut i = 0usize;
        while i < before.len() {
            let b = before[i];
            let a = after[i];
            if b != a {
                let block = i / block_size;
                let mark = &mut finest.blocks[block];
                if b != ERASED_VALUE {
                    mark.need_erase = true;
                }
                if a != ERASED_VALUE {
                    mark.need_change = true;
                }
                if mark.need_erase && mark.need_change {
                    // No further evidence can change this block's fate.
                    i = (block + 1) * block_size;
                    continue;
                }
            }
            i += 1;
        }
    }

    // Step 2: upward fold — a parent is marked once more than
    // `fold_threshold` of its children need erasing.
    for i in 1..maps.len() {
        let children_per_parent = maps[i].block_size / maps[i - 1].block_size;
        let threshold = maps[i].fold_threshold;
        for j in 0..maps[i].blocks.len() {
            let start = j * children_per_parent as usize;
            let end = start + children_per_parent as usize;
            let mut erased = 0u32;
            let mut changed = 0u32;
            for child in &maps[i - 1].blocks[start..end] {
                erased += child.need_erase as u32;
                changed += child.need_change as u32;
            }
            if erased > threshold {
                let mark = &mut maps[i].blocks[j];
                mark.need_erase = true;
                mark.need_change = changed > 0;
            }
        }
    }

    // Step 3: downward prune — clear every descendant of a marked parent so
    // no two levels claim the same byte.
    for i in (1..maps.len()).rev() {
        let block_size_i = maps[i].block_size;
        let marked: Vec<usize> = maps[i]
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.need_erase)
            .map(|(j, _)| j)
            .collect();
        for j in marked {
            let start_byte = j as u32 * block_size_i;
            let end_byte = start_byte + block_size_i;
            for level in maps.iter_mut().take(i) {
                let bs = level.block_size;
                let first = (start_byte / bs) as usize;
                let last = (end_byte / bs) as usize;
                for b in &mut level.blocks[first..last] {
                    b.need_erase = false;
                    b.need_change = false;
                }
            }
        }
    }

    // Emit processing units: smallest size first, ascending address within a size.
    let mut units = Vec::new();
    for map in &maps {
        let mut run_start: Option<usize> = None;
        for (j, block) in map.blocks.iter().enumerate() {
            if block.need_erase || block.need_change {
                run_start.get_or_insert(j);
            } else if let Some(start) = run_start.take() {
                units.push(ProcessingUnit {
                    offset: start as u32 * map.block_size,
                    block_size: map.block_size,
                    num_blocks: (j - start) as u32,
                });
            }
        }
        if let Some(start) = run_start {
            units.push(ProcessingUnit {
                offset: start as u32 * map.block_size,
                block_size: map.block_size,
                num_blocks: (map.blocks.len() - start) as u32,
            });
        }
    }
    units
}

/// Plan a full-chip pass: `before` and `after` must both be exactly
/// `chip_size` bytes. Returns the processing units in emission order
/// (smallest block size first, addresses ascending within a size).
///
/// Returns an empty list when `before == after` (property 3, §8): nothing to
/// erase or write.
pub fn plan(
    erase_blocks: &[EraseBlock],
    chip_size: u32,
    before: &[u8],
    after: &[u8],
) -> Result<Vec<ProcessingUnit>> {
    assert_eq!(before.len(), chip_size as usize);
    assert_eq!(after.len(), chip_size as usize);

    if before == after {
        return Ok(Vec::new());
    }

    let sizes = select_erasers(erase_blocks, chip_size)?;
    Ok(diff_fold_prune(&sizes, chip_size, before, after))
}

/// Plan erase operations to realize `after` from `before`, optionally scoped
/// to `[region_start, region_end]` (inclusive).
///
/// `before`/`after`, when present, cover exactly the `[region_start,
/// region_end]` byte range (not the whole chip) — this is what
/// [`crate::flash::unified::smart_write_region`] has available when writing a
/// sub-range. The window is expanded outward to the finest eraser's
/// alignment so full blocks can be evaluated; bytes outside `before`/`after`
/// but inside the expanded window are treated as unchanged, so they never
/// pull in a block that straddles the region boundary — the caller's own
/// read-modify-write logic handles those.
///
/// Returns an empty list (rather than erroring) if planning isn't possible,
/// mirroring the "nothing to do" case for callers that treat an empty plan
/// and a planning failure the same way.
pub fn plan_optimal_erase(
    erase_blocks: &[EraseBlock],
    chip_size: u32,
    before: Option<&[u8]>,
    after: Option<&[u8]>,
    region_start: u32,
    region_end: u32,
    _granularity: WriteGranularity,
) -> Vec<EraseOp> {
    let (Some(before), Some(after)) = (before, after) else {
        return Vec::new();
    };
    if region_end < region_start {
        return Vec::new();
    }
    let region_len = region_end - region_start + 1;
    if before.len() as u32 != region_len || after.len() as u32 != region_len {
        return Vec::new();
    }

    let sizes = match select_erasers(erase_blocks, chip_size) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    // Only sizes that can fit at least one full block inside the region are
    // usable for a windowed plan.
    let sizes: Vec<u32> = sizes.into_iter().filter(|&s| s <= region_len).collect();
    if sizes.is_empty() {
        return Vec::new();
    }
    let finest = sizes[0];

    let win_start = (region_start / finest) * finest;
    let win_end = region_end / finest * finest + finest;
    let win_len = win_end - win_start;

    // Restrict to sizes that evenly tile the (expanded) window too.
    let sizes: Vec<u32> = sizes
        .into_iter()
        .filter(|&s| win_len.is_multiple_of(s))
        .collect();
    if sizes.is_empty() {
        return Vec::new();
    }

    let mut before_win = vec![0u8; win_len as usize];
    let mut after_win = vec![0u8; win_len as usize];
    let lead = (region_start - win_start) as usize;
    before_win[lead..lead + before.len()].copy_from_slice(before);
    after_win[lead..lead + after.len()].copy_from_slice(after);

    diff_fold_prune(&sizes, win_len, &before_win, &after_win)
        .into_iter()
        .map(|u| EraseOp {
            start: win_start + u.offset,
            size: u.block_size * u.num_blocks,
        })
        .collect()
}

/// Plan the minimal set of aligned erase operations that cover
/// `[region_start, region_end]` (inclusive), without regard to current
/// contents — used for an unconditional erase of a region rather than a
/// diff-driven smart write.
///
/// Operations may extend beyond the region on either side when no eraser
/// size aligns exactly to the boundary; callers are expected to preserve
/// the out-of-region bytes of such blocks (read-modify-write), the same way
/// [`crate::flash::erase_region`] does.
pub fn plan_optimal_erase_region(
    erase_blocks: &[EraseBlock],
    chip_size: u32,
    region_start: u32,
    region_end: u32,
) -> Vec<EraseOp> {
    if region_end < region_start {
        return Vec::new();
    }
    let sizes = match select_erasers(erase_blocks, chip_size) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let finest = sizes[0];

    let mut ops = Vec::new();
    let mut addr = (region_start / finest) * finest;
    while addr <= region_end {
        let remaining = region_end - addr + 1;
        // Prefer the largest aligned size that still fits within what's left
        // of the region; fall back to the finest size so progress is always
        // made even right at the tail.
        let size = sizes
            .iter()
            .rev()
            .find(|&&s| addr.is_multiple_of(s) && s <= remaining)
            .copied()
            .unwrap_or(finest);
        ops.push(EraseOp { start: addr, size });
        addr += size;
    }
    ops
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::chip::EraseRegion;
    use crate::spi::opcodes;

    fn erasers() -> Vec<EraseBlock> {
        vec![
            EraseBlock::new(opcodes::SE_20, 4096),
            EraseBlock::new(opcodes::BE_52, 32768),
            EraseBlock::new(opcodes::BE_D8, 65536),
        ]
    }

    /// Scenario A — identity: no processing units when before == after.
    #[test]
    fn identity_emits_nothing() {
        let size = 1024 * 1024;
        let buf = vec![0xFFu8; size];
        let units = plan(&erasers(), size as u32, &buf, &buf).unwrap();
        assert!(units.is_empty());
    }

    /// Scenario B — single-byte change in an erased chip: one 4K erase, one
    /// PP write of one byte.
    #[test]
    fn single_byte_change_picks_finest_eraser() {
        let size = 1024 * 1024usize;
        let before = vec![0xFFu8; size];
        let mut after = before.clone();
        after[0x1234] = 0x55;

        let units = plan(&erasers(), size as u32, &before, &after).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].offset, 0);
        assert_eq!(units[0].block_size, 4096);
        assert_eq!(units[0].num_blocks, 1);
    }

    /// Scenario C — write pattern crossing the fold threshold: 12 of 16
    /// sectors in a 64K block differ, threshold is floor(16*7/10) = 11, so
    /// the whole 64K block is chosen instead of 12 separate 4K erases.
    #[test]
    fn fold_threshold_promotes_to_containing_block() {
        let size = 64 * 1024usize;
        let before = vec![0xFFu8; size];
        let mut after = before.clone();
        for sector in 0..12 {
            after[sector * 4096] = 0xAA;
        }

        let units = plan(&erasers(), size as u32, &before, &after).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].offset, 0);
        assert_eq!(units[0].block_size, 65536);
        assert_eq!(units[0].num_blocks, 1);
    }

    #[test]
    fn below_fold_threshold_keeps_finest_blocks() {
        let size = 64 * 1024usize;
        let before = vec![0xFFu8; size];
        let mut after = before.clone();
        for sector in 0..8 {
            after[sector * 4096] = 0xAA;
        }

        let units = plan(&erasers(), size as u32, &before, &after).unwrap();
        assert_eq!(units.len(), 8);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.block_size, 4096);
            assert_eq!(unit.offset, i as u32 * 4096);
            assert_eq!(unit.num_blocks, 1);
        }
    }

    #[test]
    fn contiguous_runs_are_compacted() {
        let size = 64 * 1024usize;
        let before = vec![0xFFu8; size];
        let mut after = before.clone();
        for sector in 0..4 {
            after[sector * 4096] = 0xAA;
        }

        let units = plan(&erasers(), size as u32, &before, &after).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].offset, 0);
        assert_eq!(units[0].block_size, 4096);
        assert_eq!(units[0].num_blocks, 4);
    }

    #[test]
    fn no_suitable_eraser_is_an_error() {
        let size = 1000u32; // not a multiple of any of the erasers below
        let blocks = erasers();
        let before = vec![0xFFu8; size as usize];
        let mut after = before.clone();
        after[0] = 0;
        assert_eq!(plan(&blocks, size, &before, &after), Err(Error::NoSuitableEraser));
    }

    /// A non-uniform erase command (a boot-sector opcode covering a mix of
    /// region sizes, per AMIC A25L10PT's 0xD8) must not be treated as a
    /// chip-wide-uniform eraser at its first region's size: the chip's only
    /// other eraser is a 128K whole-chip erase, so that's what gets picked.
    #[test]
    fn non_uniform_eraser_is_not_treated_as_chip_wide_uniform() {
        let size = 128 * 1024u32;
        let blocks = vec![
            EraseBlock::with_regions(
                0xD8,
                &[
                    EraseRegion::new(64 * 1024, 1),
                    EraseRegion::new(32 * 1024, 1),
                    EraseRegion::new(16 * 1024, 1),
                    EraseRegion::new(8 * 1024, 1),
                    EraseRegion::new(4 * 1024, 2),
                ],
            ),
            EraseBlock::new(0xC7, size),
        ];
        let before = vec![0xFFu8; size as usize];
        let mut after = before.clone();
        after[0] = 0xAA;

        let units = plan(&blocks, size, &before, &after).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].block_size, size);
        assert_eq!(units[0].num_blocks, 1);
    }

    #[test]
    fn region_window_pads_outside_bytes_as_unchanged() {
        let chip_size = 64 * 1024u32;
        // Region is a single 4K-aligned sector; no diff inside it.
        let before = vec![0xFFu8; 4096];
        let after = before.clone();
        let ops = plan_optimal_erase(
            &erasers(),
            chip_size,
            Some(&before),
            Some(&after),
            0x1000,
            0x1FFF,
            WriteGranularity::Page,
        );
        assert!(ops.is_empty());
    }

    #[test]
    fn region_window_finds_diff_inside_region() {
        let chip_size = 64 * 1024u32;
        let before = vec![0xFFu8; 4096];
        let mut after = before.clone();
        after[10] = 0x00;
        let ops = plan_optimal_erase(
            &erasers(),
            chip_size,
            Some(&before),
            Some(&after),
            0x1000,
            0x1FFF,
            WriteGranularity::Page,
        );
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].start, 0x1000);
        assert_eq!(ops[0].size, 4096);
    }

    #[test]
    fn region_erase_plan_covers_whole_region_with_largest_blocks() {
        let chip_size = 128 * 1024u32;
        let ops = plan_optimal_erase_region(&erasers(), chip_size, 0x10000, 0x1_FFFF);
        assert_eq!(ops, vec![EraseOp { start: 0x10000, size: 65536 }]);
    }
}
