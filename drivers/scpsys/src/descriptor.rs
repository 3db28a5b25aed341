//! # Domain Descriptors
//!
//! Static description of one power domain. Each optional stage of the
//! power sequence is present only when the domain's hardware has it, so the
//! sequencer never sees a half-configured stage:
//!
//! | Field          | Stage                                        |
//! |----------------|----------------------------------------------|
//! | `power`        | PWR_ON / PWR_ON_2ND, buck and ELS isolation  |
//! | `reset`        | CLK_DIS / ISO / RST_B, display SRAM sleep    |
//! | `sram`         | SRAM power-down with acknowledge             |
//! | `dp_phy_reset` | DP PHY reset deassert                        |
//! | `bus`          | INFRACFG bus protection, GPU SI0 override    |
//!
//! Clocks are named; the first `initial_clocks` are enabled before the
//! hardware sequence and the rest after it.

use scpsys_hal::{Error, Result};

use crate::power_controller::PowerControllerKind;
use crate::regs::{BUS_PROT_CHANNELS, VPU_SRAM_PDN, VPU_SRAM_PDN_ACK};

/// Maximum clocks per domain
pub const MAX_CLKS: usize = 9;

// =============================================================================
// STAGE DATA
// =============================================================================

/// Register offset and bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegBits {
    /// Register offset
    pub offs: u32,
    /// Bits within the register
    pub mask: u32,
}

impl RegBits {
    /// Create an offset/mask pair
    pub const fn new(offs: u32, mask: u32) -> Self {
        Self { offs, mask }
    }
}

/// External buck isolation shared by several domains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuckIsolation {
    /// Isolation bit(s) of this domain in the SPM block
    pub bits: RegBits,
    /// Domains with the same lock group serialize their register updates
    pub lock_group: Option<u8>,
}

/// Main power switch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSequence {
    /// External buck isolation, released first on power-on
    pub buck: Option<BuckIsolation>,
    /// Electrical isolation via `ELS_EN`
    pub els: bool,
}

impl PowerSequence {
    /// PWR_ON / PWR_ON_2ND only
    pub const PLAIN: Self = Self {
        buck: None,
        els: false,
    };
}

/// Reset and isolation handling after the power switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetSequence {
    /// Domain has no reset stage
    None,
    /// CLK_DIS / ISO / RST_B
    Standard,
    /// Standard reset plus display-pipe SRAM sleep control
    DisplaySleep {
        /// Register holding the SRAM sleep bits
        sram_ctl_offs: u32,
    },
}

/// One SRAM bank of a VPU core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SramBank {
    /// Power-down request bits
    pub pdn: u32,
    /// Power-down acknowledge bits
    pub ack: u32,
}

impl SramBank {
    /// Bank layout shared by every VPU core
    pub const VPU_CORE: [SramBank; 3] = [
        SramBank {
            pdn: VPU_SRAM_PDN[0],
            ack: VPU_SRAM_PDN_ACK[0],
        },
        SramBank {
            pdn: VPU_SRAM_PDN[1],
            ack: VPU_SRAM_PDN_ACK[1],
        },
        SramBank {
            pdn: VPU_SRAM_PDN[2],
            ack: VPU_SRAM_PDN_ACK[2],
        },
    ];
}

/// SRAM power-down handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SramSequence {
    /// No SRAM stage
    None,
    /// Request and acknowledge bits live in the domain control register
    Inline {
        /// Power-down request bits
        pdn: u32,
        /// Power-down acknowledge bits
        ack: u32,
    },
    /// VPU class: three banks sequenced one by one in a separate register
    Banked {
        /// SRAM control register
        ctl_offs: u32,
        /// Banks in power-on order
        banks: [SramBank; 3],
        /// Additional request bits with no acknowledge (VPU cores 0..2)
        extra_pdn: u32,
    },
}

/// GPU AXI arbitration override
pub type Si0Override = RegBits;

/// Bus protection channels of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSequence {
    /// Protection mask per channel; zero skips the channel
    pub masks: [u32; BUS_PROT_CHANNELS],
    /// GPU class: SI0 override toggled with the bus
    pub si0: Option<Si0Override>,
}

/// Size and kind of a domain's local SRAM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SramPool {
    /// Addressable bytes
    pub size: usize,
    /// Gating model
    pub kind: PowerControllerKind,
}

bitflags::bitflags! {
    /// Domain capabilities reported to the power-domain framework
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DomainCaps: u32 {
        /// Keep the domain on when a device in it is a wakeup source
        const ACTIVE_WAKEUP = 1 << 0;
    }
}

// =============================================================================
// DESCRIPTOR
// =============================================================================

/// Static description of one power domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainDescriptor {
    /// Domain name
    pub name: &'static str,
    /// Status bit in `PWR_STATUS` / `PWR_STATUS_2ND`
    pub sta_mask: u32,
    /// Control register offset in the SPM block
    pub ctl_offs: u32,
    /// Power switch stage
    pub power: Option<PowerSequence>,
    /// Reset stage
    pub reset: ResetSequence,
    /// SRAM stage
    pub sram: SramSequence,
    /// DP PHY reset deassert
    pub dp_phy_reset: Option<RegBits>,
    /// Bus protection stage
    pub bus: Option<BusSequence>,
    /// Clock names, in enable order
    pub clocks: &'static [&'static str],
    /// Clocks enabled before the hardware sequence
    pub initial_clocks: usize,
    /// Regulator name
    pub supply: Option<&'static str>,
    /// Local SRAM tracked by a power controller
    pub sram_pool: Option<SramPool>,
    /// Capabilities
    pub caps: DomainCaps,
}

impl DomainDescriptor {
    /// A domain with no stages, used as a base for table entries
    pub const EMPTY: Self = Self {
        name: "",
        sta_mask: 0,
        ctl_offs: 0,
        power: None,
        reset: ResetSequence::None,
        sram: SramSequence::None,
        dp_phy_reset: None,
        bus: None,
        clocks: &[],
        initial_clocks: 0,
        supply: None,
        sram_pool: None,
        caps: DomainCaps::empty(),
    };

    /// VPU class: SRAM sequenced per bank, clocks dropped early on power-off
    pub const fn is_vpu(&self) -> bool {
        matches!(self.sram, SramSequence::Banked { .. })
    }

    /// Display class with SRAM sleep control
    pub const fn has_display_sleep(&self) -> bool {
        matches!(self.reset, ResetSequence::DisplaySleep { .. })
    }

    /// Clocks enabled after the hardware sequence
    pub fn deferred_clocks(&self) -> usize {
        self.clocks.len().saturating_sub(self.initial_clocks)
    }

    /// Check the table entry for internal consistency
    pub fn validate(&self) -> Result<()> {
        let reject = |what: &str| {
            log::error!("domain '{}': {}", self.name, what);
            Err(Error::InvalidConfig)
        };

        if self.name.is_empty() {
            return reject("missing name");
        }
        if self.power.is_some() && self.sta_mask == 0 {
            return reject("power sequence without status bit");
        }
        if self.clocks.len() > MAX_CLKS {
            return reject("too many clocks");
        }
        if self.initial_clocks > self.clocks.len() {
            return reject("more initial clocks than clocks");
        }

        match self.sram {
            SramSequence::None => {}
            SramSequence::Inline { pdn, ack } => {
                if pdn == 0 || ack == 0 {
                    return reject("SRAM stage without request or acknowledge bits");
                }
            }
            SramSequence::Banked { banks, .. } => {
                if banks.iter().any(|b| b.pdn == 0 || b.ack == 0) {
                    return reject("SRAM bank without request or acknowledge bits");
                }
            }
        }

        if let Some(power) = &self.power {
            if let Some(buck) = &power.buck {
                if buck.bits.mask == 0 {
                    return reject("empty buck isolation mask");
                }
            }
        }

        if let Some(bus) = &self.bus {
            if bus.masks.iter().all(|m| *m == 0) && bus.si0.is_none() {
                return reject("bus stage with no channel");
            }
        }

        if let Some(pool) = &self.sram_pool {
            if pool.size == 0 {
                return reject("empty SRAM pool");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{SRAM_PDN, SRAM_PDN_ACK};

    const BASE: DomainDescriptor = DomainDescriptor {
        name: "mm",
        sta_mask: 1 << 3,
        ctl_offs: 0x300,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        clocks: &["mm", "smi"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    };

    #[test]
    fn test_valid_descriptor() {
        assert!(BASE.validate().is_ok());
        assert_eq!(BASE.deferred_clocks(), 1);
        assert!(!BASE.is_vpu());
    }

    #[test]
    fn test_rejects_clock_split() {
        let desc = DomainDescriptor {
            initial_clocks: 3,
            ..BASE
        };
        assert_eq!(desc.validate(), Err(Error::InvalidConfig));

        let desc = DomainDescriptor {
            clocks: &["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"],
            ..BASE
        };
        assert_eq!(desc.validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_rejects_sram_without_ack() {
        let desc = DomainDescriptor {
            sram: SramSequence::Inline {
                pdn: SRAM_PDN,
                ack: 0,
            },
            ..BASE
        };
        assert_eq!(desc.validate(), Err(Error::InvalidConfig));

        let desc = DomainDescriptor {
            sram: SramSequence::Inline {
                pdn: SRAM_PDN,
                ack: SRAM_PDN_ACK,
            },
            ..BASE
        };
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_bus_stage() {
        let desc = DomainDescriptor {
            bus: Some(BusSequence {
                masks: [0; BUS_PROT_CHANNELS],
                si0: None,
            }),
            ..BASE
        };
        assert_eq!(desc.validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_rejects_unnamed() {
        let result = DomainDescriptor::EMPTY.validate();
        assert_eq!(result, Err(Error::InvalidConfig));
    }
}
