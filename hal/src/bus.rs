//! # Bus Protection (INFRACFG)
//!
//! Before a power island loses power its AXI/SMI ports must be fenced off
//! from the interconnect, and after it regains power the fence is lifted.
//! INFRACFG implements this with per-channel set/clear/status registers:
//!
//! ```text
//!   set:    write mask -> SET register,  wait (STA & mask) == mask
//!   clear:  write mask -> CLR register,  wait (STA & mask) == 0
//! ```
//!
//! The same block also carries the TOP AXI SI0 control register used to
//! override GPU arbitration.

use alloc::sync::Arc;

use crate::error::Result;
use crate::mmio::RegisterIo;
use crate::time::{poll_until, TimeSource, POLL_TIMEOUT_US};

// =============================================================================
// CHANNEL LAYOUT
// =============================================================================

/// Register triplet of one bus-protection channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusProtRegs {
    /// Write-one-to-set register
    pub set_ofs: u32,
    /// Write-one-to-clear register
    pub clr_ofs: u32,
    /// Protection status register
    pub sta_ofs: u32,
}

impl BusProtRegs {
    /// Create a channel layout
    pub const fn new(set_ofs: u32, clr_ofs: u32, sta_ofs: u32) -> Self {
        Self {
            set_ofs,
            clr_ofs,
            sta_ofs,
        }
    }
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Bus protection handshake
pub trait BusProtection: Send + Sync {
    /// Fence the ports in `mask` and wait for the status to confirm
    fn set_bus_protection(&self, regs: &BusProtRegs, mask: u32) -> Result<()>;

    /// Release the ports in `mask` and wait for the status to confirm
    fn clear_bus_protection(&self, regs: &BusProtRegs, mask: u32) -> Result<()>;
}

/// TOP AXI SI0 arbitration control
pub trait TopAxiSi0: Send + Sync {
    /// Update `mask` bits of the register at `offs` to `value`, no handshake
    fn update_si0(&self, offs: u32, mask: u32, value: u32);
}

/// Everything the sequencer needs from INFRACFG
pub trait Infracfg: BusProtection + TopAxiSi0 {}

impl<T: BusProtection + TopAxiSi0> Infracfg for T {}

static_assertions::assert_obj_safe!(BusProtection, TopAxiSi0, Infracfg);

// =============================================================================
// INFRACFG BLOCK
// =============================================================================

/// INFRACFG register block driving bus protection directly
pub struct InfracfgBlock {
    regs: Arc<dyn RegisterIo>,
    time: Arc<dyn TimeSource>,
    timeout_us: u64,
}

impl InfracfgBlock {
    /// Wrap an INFRACFG register block
    pub fn new(regs: Arc<dyn RegisterIo>, time: Arc<dyn TimeSource>) -> Self {
        Self {
            regs,
            time,
            timeout_us: POLL_TIMEOUT_US,
        }
    }

    /// Override the status poll timeout
    pub fn with_timeout_us(mut self, timeout_us: u64) -> Self {
        self.timeout_us = timeout_us;
        self
    }
}

impl core::fmt::Debug for InfracfgBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InfracfgBlock")
            .field("timeout_us", &self.timeout_us)
            .finish_non_exhaustive()
    }
}

impl BusProtection for InfracfgBlock {
    fn set_bus_protection(&self, regs: &BusProtRegs, mask: u32) -> Result<()> {
        self.regs.write32(regs.set_ofs, mask);

        poll_until(self.time.as_ref(), self.timeout_us, || {
            self.regs.read32_masked(regs.sta_ofs, mask) == mask
        })
        .map_err(|e| {
            log::error!(
                "bus protection set timeout: mask {:#010x} sta {:#010x}",
                mask,
                self.regs.read32(regs.sta_ofs)
            );
            e
        })
    }

    fn clear_bus_protection(&self, regs: &BusProtRegs, mask: u32) -> Result<()> {
        self.regs.write32(regs.clr_ofs, mask);

        poll_until(self.time.as_ref(), self.timeout_us, || {
            self.regs.read32_masked(regs.sta_ofs, mask) == 0
        })
        .map_err(|e| {
            log::error!(
                "bus protection clear timeout: mask {:#010x} sta {:#010x}",
                mask,
                self.regs.read32(regs.sta_ofs)
            );
            e
        })
    }
}

impl TopAxiSi0 for InfracfgBlock {
    fn update_si0(&self, offs: u32, mask: u32, value: u32) {
        self.regs.modify32(offs, mask, value);
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::{MockRegs, SimClock};

    const CH: BusProtRegs = BusProtRegs::new(0x2a0, 0x2a4, 0x228);

    fn block(regs: &Arc<MockRegs>) -> InfracfgBlock {
        InfracfgBlock::new(regs.clone(), Arc::new(SimClock::new(10))).with_timeout_us(1_000)
    }

    /// Status register follows SET/CLR writes
    fn responsive() -> Arc<MockRegs> {
        Arc::new(MockRegs::with_hook(|regs, offset, value| {
            if offset == CH.set_ofs {
                regs.or(CH.sta_ofs, value);
            } else if offset == CH.clr_ofs {
                regs.and_not(CH.sta_ofs, value);
            }
        }))
    }

    #[test]
    fn test_set_then_clear() {
        let regs = responsive();
        let infra = block(&regs);

        infra.set_bus_protection(&CH, 0x0000_0c00).unwrap();
        assert_eq!(regs.peek(CH.sta_ofs), 0x0000_0c00);

        infra.clear_bus_protection(&CH, 0x0000_0400).unwrap();
        assert_eq!(regs.peek(CH.sta_ofs), 0x0000_0800);
    }

    #[test]
    fn test_set_times_out_on_dead_status() {
        let regs = Arc::new(MockRegs::new());
        let infra = block(&regs);

        assert_eq!(infra.set_bus_protection(&CH, 0x1), Err(Error::Timeout));
        // the request itself was still issued
        assert_eq!(regs.peek(CH.set_ofs), 0x1);
    }

    #[test]
    fn test_si0_update() {
        let regs = Arc::new(MockRegs::new());
        regs.poke(0x204, 0xff00);
        let infra = block(&regs);

        infra.update_si0(0x204, 0x0100, 0);
        assert_eq!(regs.peek(0x204), 0xfe00);
    }
}
