//! # SCPSYS Register Map
//!
//! Offsets and bit layouts shared by every MT3612-family SoC table.
//!
//! ## Domain Control Register
//!
//! ```text
//!  31            16 15   12 11    8   7     6       5       4      3      2    1    0
//! ┌────────────────┬───────┬───────┬─────┬───────┬───────┬───────┬──────┬────┬───┬─────┐
//! │    reserved    │SRAM   │SRAM   │ ELS │SRAM   │SRAM   │CLK_DIS│ON_2ND│ ON │ISO│RST_B│
//! │                │ACK    │PDN    │     │ISOINT │CKISO  │       │      │    │   │     │
//! └────────────────┴───────┴───────┴─────┴───────┴───────┴───────┴──────┴────┴───┴─────┘
//! ```
//!
//! Power state is reported twice, in `PWR_STATUS` and `PWR_STATUS_2ND`, one
//! bit per domain. A domain is only on when both agree.

use scpsys_hal::{bit, genmask, BusProtRegs};

// =============================================================================
// SPM / SCPSYS BLOCK
// =============================================================================

/// Power-on configuration register, unlocked with the project code
pub const POWERON_CONFIG_EN: u32 = 0x0000;

/// SPM project code, upper half-word
pub const SPM_PROJECT_CODE: u32 = 0x0b16;

/// Value written to [`POWERON_CONFIG_EN`] before every power-on
pub const PROJECT_CODE_UNLOCK: u32 = (SPM_PROJECT_CODE << 16) | bit(0);

/// First power status register
pub const PWR_STATUS: u32 = 0x0180;

/// Second power status register
pub const PWR_STATUS_2ND: u32 = 0x0184;

/// External buck isolation register (one bit per VPU core)
pub const EXT_BUCK_ISO: u32 = 0x0398;

/// DP PHY power control register
pub const DP_PHY_PWR_CTL: u32 = 0x03a0;

/// DP PHY power reset deassert
pub const DP_PHY_PWR_RST_B: u32 = bit(0);

bitflags::bitflags! {
    /// Domain control register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PwrCtl: u32 {
        /// Reset, active low
        const RST_B = 1 << 0;
        /// Output isolation
        const ISO = 1 << 1;
        /// First-stage power switch
        const ON = 1 << 2;
        /// Second-stage power switch
        const ON_2ND = 1 << 3;
        /// Clock gate
        const CLK_DIS = 1 << 4;
        /// SRAM clock isolation
        const SRAM_CKISO = 1 << 5;
        /// SRAM isolation, active low
        const SRAM_ISOINT_B = 1 << 6;
        /// Electrical isolation enable
        const ELS_EN = 1 << 7;
    }
}

/// Single-stage SRAM power-down request bits in the domain control register
pub const SRAM_PDN: u32 = genmask(11, 8);

/// Single-stage SRAM power-down acknowledge bits in the domain control register
pub const SRAM_PDN_ACK: u32 = genmask(15, 12);

/// Display SRAM sleep bits, set one at a time
pub const SRAM_SLEEP_B: [u32; 4] = [bit(12), bit(13), bit(14), bit(15)];

/// All display SRAM sleep bits
pub const SRAM_SLEEP_B_MASK: u32 = genmask(15, 12);

/// VPU core SRAM bank request bits (per bank, in the VPU SRAM control register)
pub const VPU_SRAM_PDN: [u32; 3] = [genmask(3, 0), genmask(7, 4), genmask(11, 8)];

/// VPU core SRAM bank acknowledge bits
pub const VPU_SRAM_PDN_ACK: [u32; 3] = [genmask(25, 24), genmask(27, 26), genmask(29, 28)];

/// Extra SRAM bits on VPU cores 0..2, cleared without acknowledge
pub const VPU_012_SRAM_PDN: u32 = genmask(19, 15);

// =============================================================================
// INFRACFG BLOCK
// =============================================================================

/// Number of bus protection channels
pub const BUS_PROT_CHANNELS: usize = 4;

/// Register triplets of the bus protection channels, indexed by channel
pub const BUS_PROT: [BusProtRegs; BUS_PROT_CHANNELS] = [
    BusProtRegs::new(0x02a0, 0x02a4, 0x0228),
    BusProtRegs::new(0x02a8, 0x02ac, 0x0258),
    BusProtRegs::new(0x02b0, 0x02b4, 0x02c0),
    BusProtRegs::new(0x02b8, 0x02bc, 0x02c4),
];

/// TOP AXI SI0 control register
pub const INFRA_TOPAXI_SI0_CTL: u32 = 0x0200;

/// GPU arbitration override in [`INFRA_TOPAXI_SI0_CTL`]
pub const SI0_MFG_OVERRIDE: u32 = bit(6);

// =============================================================================
// LOCAL SRAM (SYS2)
// =============================================================================

/// First SRAM2 power-down control register
pub const SYS2_LOCAL_SRAM_PD_1: u32 = 0x0000;

/// Second SRAM2 power-down control register
pub const SYS2_LOCAL_SRAM_PD_2: u32 = 0x0004;

/// SRAM2 group size shift (512 KiB groups)
pub const SRAM2_GROUP_SHIFT: u32 = 19;

/// Number of SRAM2 power groups
pub const SRAM2_GROUPS: usize = 12;

/// Addressable SRAM2 span
pub const SRAM2_SIZE: usize = SRAM2_GROUPS << SRAM2_GROUP_SHIFT;

static_assertions::const_assert_eq!(SRAM2_SIZE, 0x60_0000);
static_assertions::const_assert_eq!(PROJECT_CODE_UNLOCK, 0x0b16_0001);
static_assertions::const_assert_eq!(SRAM_PDN & SRAM_PDN_ACK, 0);
static_assertions::const_assert_eq!(
    (VPU_SRAM_PDN[0] | VPU_SRAM_PDN[1] | VPU_SRAM_PDN[2]) & VPU_012_SRAM_PDN,
    0
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctl_bits_disjoint_from_sram_fields() {
        assert_eq!(PwrCtl::all().bits() & (SRAM_PDN | SRAM_PDN_ACK), 0);
    }

    #[test]
    fn test_sleep_mask_covers_each_bit() {
        let combined = SRAM_SLEEP_B.iter().fold(0, |acc, b| acc | b);
        assert_eq!(combined, SRAM_SLEEP_B_MASK);
    }

    #[test]
    fn test_bus_channels_distinct() {
        for (i, a) in BUS_PROT.iter().enumerate() {
            for b in &BUS_PROT[i + 1..] {
                assert_ne!(a.sta_ofs, b.sta_ofs);
            }
        }
    }
}
