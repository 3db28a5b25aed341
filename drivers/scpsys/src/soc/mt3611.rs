//! MT3611 power domains.
//!
//! Cut-down MT3612: two VPU cores without the extra SRAM bits, a smaller
//! VPU SRAM pool, no ISP, audio or separate GPU core.

use scpsys_hal::bit;

use super::SocData;
use crate::descriptor::{
    BuckIsolation, BusSequence, DomainCaps, DomainDescriptor, PowerSequence, RegBits,
    ResetSequence, SramBank, SramPool, SramSequence,
};
use crate::power_controller::PowerControllerKind;
use crate::regs::{
    DP_PHY_PWR_CTL, DP_PHY_PWR_RST_B, EXT_BUCK_ISO, INFRA_TOPAXI_SI0_CTL, SI0_MFG_OVERRIDE,
    SRAM2_GROUP_SHIFT, SRAM_PDN, SRAM_PDN_ACK,
};

const INLINE_SRAM: SramSequence = SramSequence::Inline {
    pdn: SRAM_PDN,
    ack: SRAM_PDN_ACK,
};

const fn vpu_core(name: &'static str, n: u32, clocks: &'static [&'static str]) -> DomainDescriptor {
    DomainDescriptor {
        name,
        sta_mask: bit(12 + n),
        ctl_offs: 0x338 + 8 * n,
        power: Some(PowerSequence {
            buck: Some(BuckIsolation {
                bits: RegBits::new(EXT_BUCK_ISO, bit(n)),
                lock_group: Some(0),
            }),
            els: false,
        }),
        reset: ResetSequence::Standard,
        sram: SramSequence::Banked {
            ctl_offs: 0x33c + 8 * n,
            banks: SramBank::VPU_CORE,
            extra_pdn: 0,
        },
        clocks,
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    }
}

static DOMAINS: [DomainDescriptor; 9] = [
    DomainDescriptor {
        name: "conn",
        sta_mask: bit(0),
        ctl_offs: 0x032c,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        bus: Some(BusSequence {
            masks: [bit(13) | bit(14), 0, 0, 0],
            si0: None,
        }),
        caps: DomainCaps::ACTIVE_WAKEUP,
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "mm_core",
        sta_mask: bit(1),
        ctl_offs: 0x0300,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        bus: Some(BusSequence {
            masks: [bit(1) | bit(2), 0, bit(0), 0],
            si0: None,
        }),
        clocks: &["mm", "mm_smi"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "cam",
        sta_mask: bit(2),
        ctl_offs: 0x0304,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        clocks: &["cam", "camtg"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "dp",
        sta_mask: bit(6),
        ctl_offs: 0x0318,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::DisplaySleep {
            sram_ctl_offs: 0x031c,
        },
        sram: INLINE_SRAM,
        dp_phy_reset: Some(RegBits::new(DP_PHY_PWR_CTL, DP_PHY_PWR_RST_B)),
        clocks: &["dp_pipe"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "vpu_vcore",
        sta_mask: bit(10),
        ctl_offs: 0x0330,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        clocks: &["vpu_vcore"],
        initial_clocks: 1,
        sram_pool: Some(SramPool {
            size: 8 << SRAM2_GROUP_SHIFT,
            kind: PowerControllerKind::Sram2,
        }),
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "vpu_conn",
        sta_mask: bit(11),
        ctl_offs: 0x0334,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        clocks: &["vpu_conn", "vpu_axi"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    },
    vpu_core("vpu_core0", 0, &["vpu_core0", "vpu_core0_ipu"]),
    vpu_core("vpu_core1", 1, &["vpu_core1", "vpu_core1_ipu"]),
    DomainDescriptor {
        name: "mfg",
        sta_mask: bit(20),
        ctl_offs: 0x0350,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        bus: Some(BusSequence {
            masks: [bit(21) | bit(22), 0, 0, 0],
            si0: Some(RegBits::new(INFRA_TOPAXI_SI0_CTL, SI0_MFG_OVERRIDE)),
        }),
        clocks: &["mfg"],
        initial_clocks: 1,
        supply: Some("mfg"),
        ..DomainDescriptor::EMPTY
    },
];

/// MT3611
pub static MT3611: SocData = SocData {
    name: "MT3611",
    compatible: "mediatek,mt3611-scpsys",
    domains: &DOMAINS,
    subdomains: &[
        ("mm_core", "cam"),
        ("mm_core", "dp"),
        ("vpu_vcore", "vpu_conn"),
        ("vpu_conn", "vpu_core0"),
        ("vpu_conn", "vpu_core1"),
    ],
    sram_retention: &[("vpu_vcore", "vpu_core0"), ("vpu_vcore", "vpu_core1")],
};
