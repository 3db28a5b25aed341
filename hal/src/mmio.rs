//! # Memory-Mapped I/O
//!
//! 32-bit register access for the SPM/SCPSYS, infracfg and local SRAM
//! control blocks.
//!
//! Every register block the sequencer touches is reached through the
//! [`RegisterIo`] trait so the power sequences can run against real MMIO
//! ([`Mmio`]) or a simulated register file in tests.

use core::ptr::{read_volatile, write_volatile};

// =============================================================================
// REGISTER I/O TRAIT
// =============================================================================

/// 32-bit register block accessor
///
/// Offsets are in bytes from the block base and must be 4-byte aligned.
/// The read-modify-write helpers are not atomic with respect to other
/// writers of the same register; callers that share a register across
/// domains must hold a lock around them.
pub trait RegisterIo: Send + Sync {
    /// Read a 32-bit register
    fn read32(&self, offset: u32) -> u32;

    /// Write a 32-bit register
    fn write32(&self, offset: u32, value: u32);

    /// Replace the bits selected by `mask` with the matching bits of `value`
    fn modify32(&self, offset: u32, mask: u32, value: u32) {
        let current = self.read32(offset);
        self.write32(offset, (current & !mask) | (value & mask));
    }

    /// Set bits (read-modify-write)
    fn set_bits(&self, offset: u32, bits: u32) {
        let current = self.read32(offset);
        self.write32(offset, current | bits);
    }

    /// Clear bits (read-modify-write)
    fn clear_bits(&self, offset: u32, bits: u32) {
        let current = self.read32(offset);
        self.write32(offset, current & !bits);
    }

    /// Read a register and keep only `mask`
    fn read32_masked(&self, offset: u32, mask: u32) -> u32 {
        self.read32(offset) & mask
    }
}

static_assertions::assert_obj_safe!(RegisterIo);

// =============================================================================
// MMIO REGION
// =============================================================================

/// A mapped register block
#[derive(Debug)]
pub struct Mmio {
    /// Virtual address of the block
    base: usize,
    /// Size of the mapping in bytes
    size: usize,
}

impl Mmio {
    /// Wrap an already-mapped register block
    ///
    /// Returns `None` for a null base or an empty mapping.
    ///
    /// # Safety
    /// `base..base + size` must be a valid device mapping for the lifetime
    /// of the returned value, and nothing else may treat it as normal memory.
    pub unsafe fn new(base: usize, size: usize) -> Option<Self> {
        if base == 0 || size == 0 {
            return None;
        }
        Some(Self { base, size })
    }

    /// Size of the mapping
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    fn reg(&self, offset: u32) -> *mut u32 {
        let offset = offset as usize;
        debug_assert!(offset % 4 == 0, "unaligned register offset {:#x}", offset);
        debug_assert!(
            offset + 4 <= self.size,
            "register offset {:#x} out of range",
            offset
        );
        (self.base + offset) as *mut u32
    }
}

// SAFETY: the mapping is device memory; every access is a single volatile
// 32-bit load or store, which the hardware serializes.
unsafe impl Send for Mmio {}
unsafe impl Sync for Mmio {}

impl RegisterIo for Mmio {
    fn read32(&self, offset: u32) -> u32 {
        // SAFETY: bounds checked in debug builds, mapping validity is the
        // constructor's contract
        unsafe { read_volatile(self.reg(offset)) }
    }

    fn write32(&self, offset: u32, value: u32) {
        // SAFETY: as for read32
        unsafe { write_volatile(self.reg(offset), value) }
    }
}

// =============================================================================
// BIT HELPERS
// =============================================================================

/// Single bit mask
pub const fn bit(n: u32) -> u32 {
    1 << n
}

/// Contiguous mask covering bits `low..=high`
pub const fn genmask(high: u32, low: u32) -> u32 {
    (u32::MAX >> (31 - high)) & (u32::MAX << low)
}
