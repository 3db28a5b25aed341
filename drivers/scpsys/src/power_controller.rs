//! # Local SRAM Power Controller
//!
//! Claims on sub-ranges of a domain's local SRAM, and, for the SRAM2 class,
//! power gating of the 512 KiB groups those claims cover.
//!
//! ```text
//!   address ──>> 19──▶ group 0 .. 11
//!
//!   group   PD_1 bits   PD_2 bit
//!   ─────   ─────────   ────────
//!     0       1:0          0
//!     1       3:2          0      groups 2k and 2k+1 share PD_2 bit k
//!     2       5:4          1
//!     …        …           …
//!    11      23:22         5
//! ```
//!
//! A group is powered (its bits cleared) while at least one live claim
//! overlaps it, and powered down (bits set) when the last one is released.
//! Claims never overlap each other, and a release must name a claim exactly.
//!
//! All state sits behind one lock held across validation, bookkeeping and
//! the register update, so sibling domains may share a controller.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use scpsys_hal::{bit, genmask, Error, RegisterIo, Result};
use spin::Mutex;

use crate::regs::{SRAM2_GROUPS, SRAM2_GROUP_SHIFT, SYS2_LOCAL_SRAM_PD_1, SYS2_LOCAL_SRAM_PD_2};

// =============================================================================
// CONTROLLER KIND
// =============================================================================

/// How the controller gates power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PowerControllerKind {
    /// Bookkeeping only; power is gated by the domain's own registers
    Normal = 0,
    /// SRAM2 group table drives `SYS2_LOCAL_SRAM_PD_1/2`
    Sram2 = 1,
}

impl PowerControllerKind {
    /// Decode a raw discriminator (device-tree cell)
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Sram2),
            _ => Err(Error::InvalidArgument),
        }
    }
}

// =============================================================================
// POWER GROUPS
// =============================================================================

/// One 512 KiB SRAM2 power group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerGroup {
    /// Live claims overlapping this group
    pub reference_count: u32,
    /// Bits in `SYS2_LOCAL_SRAM_PD_1`
    pub mask1: u32,
    /// Bits in `SYS2_LOCAL_SRAM_PD_2`
    pub mask2: u32,
}

const fn group(index: u32) -> PowerGroup {
    PowerGroup {
        reference_count: 0,
        mask1: genmask(2 * index + 1, 2 * index),
        mask2: bit(index / 2),
    }
}

const SRAM2_TABLE: [PowerGroup; SRAM2_GROUPS] = [
    group(0),
    group(1),
    group(2),
    group(3),
    group(4),
    group(5),
    group(6),
    group(7),
    group(8),
    group(9),
    group(10),
    group(11),
];

// =============================================================================
// ADDRESS REGIONS
// =============================================================================

/// A claimed range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRegion {
    /// First claimed byte
    pub begin: usize,
    /// Last claimed byte
    pub end: usize,
}

impl AddressRegion {
    fn overlaps(&self, other: &AddressRegion) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    fn groups(&self) -> core::ops::RangeInclusive<usize> {
        (self.begin >> SRAM2_GROUP_SHIFT)..=(self.end >> SRAM2_GROUP_SHIFT)
    }
}

// =============================================================================
// POWER CONTROLLER
// =============================================================================

struct Inner {
    regions: Vec<AddressRegion>,
    groups: [PowerGroup; SRAM2_GROUPS],
}

/// Reference-counted power gating for one local SRAM
pub struct PowerController {
    kind: PowerControllerKind,
    size: usize,
    regs: Box<dyn RegisterIo>,
    inner: Mutex<Inner>,
}

impl PowerController {
    /// Create a controller over `size` bytes of SRAM
    ///
    /// Fails with `InvalidArgument` for an empty SRAM or a missing register
    /// block.
    pub fn new(
        size: usize,
        regs: Option<Box<dyn RegisterIo>>,
        kind: PowerControllerKind,
    ) -> Result<Self> {
        let regs = regs.ok_or(Error::InvalidArgument)?;
        if size == 0 {
            return Err(Error::InvalidArgument);
        }

        Ok(Self {
            kind,
            size,
            regs,
            inner: Mutex::new(Inner {
                regions: Vec::new(),
                groups: SRAM2_TABLE,
            }),
        })
    }

    /// Controller kind
    pub fn kind(&self) -> PowerControllerKind {
        self.kind
    }

    /// Addressable size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Claim `size` bytes at `addr`
    pub fn require(&self, addr: usize, size: usize) -> Result<()> {
        let region = self.checked_region(addr, size)?;
        let mut inner = self.inner.lock();

        if let Some(other) = inner.regions.iter().find(|r| r.overlaps(&region)) {
            log::debug!(
                "sram claim {:#x}..={:#x} overlaps {:#x}..={:#x}",
                region.begin,
                region.end,
                other.begin,
                other.end
            );
            return Err(Error::InvalidArgument);
        }

        if self.kind == PowerControllerKind::Sram2 {
            let groups = region.groups();
            if *groups.end() >= SRAM2_GROUPS {
                return Err(Error::InvalidArgument);
            }

            let (mut mask1, mut mask2) = (0, 0);
            for g in groups {
                let group = &mut inner.groups[g];
                group.reference_count += 1;
                mask1 |= group.mask1;
                mask2 |= group.mask2;
            }
            self.regs.clear_bits(SYS2_LOCAL_SRAM_PD_1, mask1);
            self.regs.clear_bits(SYS2_LOCAL_SRAM_PD_2, mask2);
        }

        inner.regions.push(region);
        Ok(())
    }

    /// Release a claim previously made with the same `addr` and `size`
    pub fn release(&self, addr: usize, size: usize) -> Result<()> {
        let region = self.checked_region(addr, size)?;
        let mut inner = self.inner.lock();

        let Some(pos) = inner.regions.iter().position(|r| *r == region) else {
            log::error!(
                "sram release {:#x}..={:#x} matches no claim",
                region.begin,
                region.end
            );
            return Err(Error::InvalidArgument);
        };

        if self.kind == PowerControllerKind::Sram2 {
            let (mut mask1, mut mask2) = (0, 0);
            for g in region.groups() {
                let group = &mut inner.groups[g];
                debug_assert!(group.reference_count > 0, "sram group {} underflow", g);
                if group.reference_count == 0 {
                    log::error!("sram group {} reference count underflow", g);
                    continue;
                }
                group.reference_count -= 1;
                if group.reference_count == 0 {
                    mask1 |= group.mask1;
                    mask2 |= group.mask2;
                }
            }

            // A shared PD_2 bit stays clear while its sibling group is claimed
            let live = inner
                .groups
                .iter()
                .filter(|g| g.reference_count > 0)
                .fold(0, |acc, g| acc | g.mask2);

            self.regs.set_bits(SYS2_LOCAL_SRAM_PD_1, mask1);
            self.regs.set_bits(SYS2_LOCAL_SRAM_PD_2, mask2 & !live);
        }

        inner.regions.swap_remove(pos);
        Ok(())
    }

    /// Tear down; fails with `Busy` while anything is still claimed
    pub fn exit(&self) -> Result<()> {
        let inner = self.inner.lock();

        if !inner.regions.is_empty() {
            log::warn!("sram controller busy: {} live claims", inner.regions.len());
            return Err(Error::Busy);
        }

        if self.kind == PowerControllerKind::Sram2 {
            if let Some((g, group)) = inner
                .groups
                .iter()
                .enumerate()
                .find(|(_, g)| g.reference_count != 0)
            {
                log::error!(
                    "sram group {} still referenced ({}) with no live claims",
                    g,
                    group.reference_count
                );
                return Err(Error::Busy);
            }
        }

        Ok(())
    }

    /// Current reference count of `group`
    pub fn reference_count(&self, group: usize) -> Option<u32> {
        self.inner.lock().groups.get(group).map(|g| g.reference_count)
    }

    /// Snapshot of the live claims
    pub fn regions(&self) -> Vec<AddressRegion> {
        self.inner.lock().regions.clone()
    }

    fn checked_region(&self, addr: usize, size: usize) -> Result<AddressRegion> {
        if size == 0 {
            return Err(Error::InvalidArgument);
        }
        let limit = addr.checked_add(size).ok_or(Error::InvalidArgument)?;
        if limit > self.size {
            return Err(Error::InvalidArgument);
        }
        Ok(AddressRegion {
            begin: addr,
            end: limit - 1,
        })
    }
}

impl fmt::Debug for PowerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerController")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("claims", &self.inner.lock().regions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use scpsys_hal::mock::MockRegs;

    const GROUP: usize = 1 << SRAM2_GROUP_SHIFT;

    /// Boxed handle sharing the mock with the test
    struct Shared(Arc<MockRegs>);

    impl RegisterIo for Shared {
        fn read32(&self, offset: u32) -> u32 {
            self.0.read32(offset)
        }

        fn write32(&self, offset: u32, value: u32) {
            self.0.write32(offset, value)
        }
    }

    fn sram2() -> (PowerController, Arc<MockRegs>) {
        let regs = Arc::new(MockRegs::new());
        // everything powered down at reset
        regs.poke(SYS2_LOCAL_SRAM_PD_1, genmask(23, 0));
        regs.poke(SYS2_LOCAL_SRAM_PD_2, genmask(5, 0));
        let ctrl = PowerController::new(
            0x60_0000,
            Some(Box::new(Shared(regs.clone()))),
            PowerControllerKind::Sram2,
        )
        .unwrap();
        (ctrl, regs)
    }

    #[test]
    fn test_init_rejects_bad_arguments() {
        let regs: Box<dyn RegisterIo> = Box::new(MockRegs::new());
        assert_eq!(
            PowerController::new(0, Some(regs), PowerControllerKind::Normal).err(),
            Some(Error::InvalidArgument)
        );
        assert_eq!(
            PowerController::new(0x1000, None, PowerControllerKind::Normal).err(),
            Some(Error::InvalidArgument)
        );
        assert_eq!(PowerControllerKind::from_raw(7), Err(Error::InvalidArgument));
        assert_eq!(PowerControllerKind::from_raw(1), Ok(PowerControllerKind::Sram2));
    }

    #[test]
    fn test_adjacent_claims_and_overlap() {
        let (ctrl, _) = sram2();

        ctrl.require(0, 0x80000).unwrap();
        ctrl.require(0x80000, 0x80000).unwrap();
        assert_eq!(ctrl.require(0x40000, 0x80000), Err(Error::InvalidArgument));
        assert_eq!(ctrl.regions().len(), 2);
    }

    #[test]
    fn test_overlap_rejected_until_release() {
        let (ctrl, _) = sram2();

        ctrl.require(0x1000, 0x2000).unwrap();
        assert_eq!(ctrl.require(0x2fff, 0x10), Err(Error::InvalidArgument));
        assert_eq!(ctrl.require(0x0, 0x1001), Err(Error::InvalidArgument));
        ctrl.require(0x3000, 0x10).unwrap();

        ctrl.release(0x1000, 0x2000).unwrap();
        ctrl.require(0x2fff, 0x1).unwrap();
    }

    #[test]
    fn test_range_validation() {
        let (ctrl, regs) = sram2();
        regs.clear_writes();

        assert_eq!(ctrl.require(0, 0), Err(Error::InvalidArgument));
        assert_eq!(ctrl.require(0x5f_ffff, 2), Err(Error::InvalidArgument));
        assert_eq!(ctrl.require(usize::MAX, 2), Err(Error::InvalidArgument));
        ctrl.require(0x5f_ffff, 1).unwrap();
        assert_eq!(ctrl.reference_count(11), Some(1));

        // only the successful claim reached the hardware
        assert_eq!(regs.writes().len(), 2);
    }

    #[test]
    fn test_groups_power_down_on_last_release() {
        let (ctrl, regs) = sram2();
        let g1 = SRAM2_TABLE[1];

        // A covers groups 0..=1, B covers group 1 only
        ctrl.require(0, GROUP + 0x100).unwrap();
        ctrl.require(GROUP + 0x100, 0x100).unwrap();
        assert_eq!(ctrl.reference_count(0), Some(1));
        assert_eq!(ctrl.reference_count(1), Some(2));
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_1) & g1.mask1, 0);

        ctrl.release(0, GROUP + 0x100).unwrap();
        assert_eq!(ctrl.reference_count(0), Some(0));
        assert_eq!(ctrl.reference_count(1), Some(1));
        // group 0 is down, group 1 still powered
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_1) & SRAM2_TABLE[0].mask1, SRAM2_TABLE[0].mask1);
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_1) & g1.mask1, 0);
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_2) & g1.mask2, 0);

        ctrl.release(GROUP + 0x100, 0x100).unwrap();
        assert_eq!(ctrl.reference_count(1), Some(0));
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_1) & g1.mask1, g1.mask1);
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_2) & g1.mask2, g1.mask2);
    }

    #[test]
    fn test_require_writes_each_register_once() {
        let (ctrl, regs) = sram2();
        regs.clear_writes();

        ctrl.require(0, 4 * GROUP).unwrap();
        assert_eq!(regs.writes_to(SYS2_LOCAL_SRAM_PD_1), [genmask(23, 8)]);
        assert_eq!(regs.writes_to(SYS2_LOCAL_SRAM_PD_2), [genmask(5, 2)]);
    }

    #[test]
    fn test_release_requires_exact_match() {
        let (ctrl, _) = sram2();
        ctrl.require(0x1000, 0x1000).unwrap();

        assert_eq!(ctrl.release(0x1001, 0x1000), Err(Error::InvalidArgument));
        assert_eq!(ctrl.release(0x1000, 0x800), Err(Error::InvalidArgument));
        assert_eq!(ctrl.release(0x0, 0x3000), Err(Error::InvalidArgument));

        // the first claim is untouched
        assert_eq!(ctrl.require(0x1800, 0x10), Err(Error::InvalidArgument));
        assert_eq!(ctrl.reference_count(0), Some(1));
    }

    #[test]
    fn test_exit_busy_while_claimed() {
        let (ctrl, _) = sram2();
        ctrl.require(0, 0x10).unwrap();
        assert_eq!(ctrl.exit(), Err(Error::Busy));

        ctrl.release(0, 0x10).unwrap();
        assert!(ctrl.exit().is_ok());
    }

    #[test]
    fn test_normal_kind_touches_no_registers() {
        let regs = Arc::new(MockRegs::new());
        let ctrl = PowerController::new(
            0x10_0000,
            Some(Box::new(Shared(regs.clone()))),
            PowerControllerKind::Normal,
        )
        .unwrap();

        ctrl.require(0, 0x10_0000).unwrap();
        ctrl.release(0, 0x10_0000).unwrap();
        assert!(regs.writes().is_empty());
        assert!(ctrl.exit().is_ok());
    }

    #[test]
    fn test_concurrent_claims() {
        extern crate std;

        let (ctrl, regs) = sram2();
        let ctrl = Arc::new(ctrl);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ctrl = ctrl.clone();
                std::thread::spawn(move || {
                    let addr = t * GROUP;
                    for _ in 0..100 {
                        ctrl.require(addr, GROUP).unwrap();
                        ctrl.release(addr, GROUP).unwrap();
                    }
                    ctrl.require(addr, GROUP).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for g in 0..4 {
            assert_eq!(ctrl.reference_count(g), Some(1));
        }
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_1) & genmask(7, 0), 0);
        assert_eq!(regs.peek(SYS2_LOCAL_SRAM_PD_2) & genmask(1, 0), 0);
    }
}
