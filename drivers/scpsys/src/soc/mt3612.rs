//! MT3612 power domains.

use scpsys_hal::bit;

use super::SocData;
use crate::descriptor::{
    BuckIsolation, BusSequence, DomainCaps, DomainDescriptor, PowerSequence, RegBits,
    ResetSequence, SramBank, SramPool, SramSequence,
};
use crate::power_controller::PowerControllerKind;
use crate::regs::{
    DP_PHY_PWR_CTL, DP_PHY_PWR_RST_B, EXT_BUCK_ISO, INFRA_TOPAXI_SI0_CTL, SI0_MFG_OVERRIDE,
    SRAM2_SIZE, SRAM_PDN, SRAM_PDN_ACK, VPU_012_SRAM_PDN,
};

const INLINE_SRAM: SramSequence = SramSequence::Inline {
    pdn: SRAM_PDN,
    ack: SRAM_PDN_ACK,
};

const fn bus(masks: [u32; 4]) -> Option<BusSequence> {
    Some(BusSequence { masks, si0: None })
}

const fn vpu_core(
    name: &'static str,
    n: u32,
    clocks: &'static [&'static str],
) -> DomainDescriptor {
    DomainDescriptor {
        name,
        sta_mask: bit(12 + n),
        ctl_offs: 0x338 + 8 * n,
        power: Some(PowerSequence {
            buck: Some(BuckIsolation {
                bits: RegBits::new(EXT_BUCK_ISO, bit(n)),
                lock_group: Some(0),
            }),
            els: true,
        }),
        reset: ResetSequence::Standard,
        sram: SramSequence::Banked {
            ctl_offs: 0x33c + 8 * n,
            banks: SramBank::VPU_CORE,
            extra_pdn: VPU_012_SRAM_PDN,
        },
        bus: bus([0, bit(8 + n), 0, 0]),
        clocks,
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    }
}

static DOMAINS: [DomainDescriptor; 13] = [
    DomainDescriptor {
        name: "conn",
        sta_mask: bit(0),
        ctl_offs: 0x032c,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        bus: bus([bit(13) | bit(14), 0, 0, 0]),
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
        bus: bus([bit(1) | bit(2), 0, bit(0), 0]),
        clocks: &["mm", "mm_smi", "mm_gals"],
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
        bus: bus([0, 0, bit(4) | bit(5), bit(0)]),
        clocks: &["cam", "camtg", "seninf", "cam_smi"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "isp",
        sta_mask: bit(3),
        ctl_offs: 0x0308,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        bus: bus([0, 0, bit(6), bit(1)]),
        clocks: &["isp", "isp_smi"],
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
        clocks: &["dp_pipe", "dp_tx"],
        initial_clocks: 2,
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "vpu_vcore",
        sta_mask: bit(10),
        ctl_offs: 0x0330,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        bus: bus([0, bit(0) | bit(1), 0, 0]),
        clocks: &["vpu_vcore", "vpu_vcore_ahb"],
        initial_clocks: 1,
        sram_pool: Some(SramPool {
            size: SRAM2_SIZE,
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
        bus: bus([0, bit(2) | bit(3), 0, 0]),
        clocks: &["vpu_conn", "vpu_axi", "vpu_ahb"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    },
    vpu_core(
        "vpu_core0",
        0,
        &["vpu_core0", "vpu_core0_ipu", "vpu_core0_axi"],
    ),
    vpu_core(
        "vpu_core1",
        1,
        &["vpu_core1", "vpu_core1_ipu", "vpu_core1_axi"],
    ),
    vpu_core(
        "vpu_core2",
        2,
        &["vpu_core2", "vpu_core2_ipu", "vpu_core2_axi"],
    ),
    DomainDescriptor {
        name: "mfg",
        sta_mask: bit(20),
        ctl_offs: 0x0350,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        clocks: &["mfg"],
        initial_clocks: 1,
        supply: Some("mfg"),
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "mfg_core0",
        sta_mask: bit(21),
        ctl_offs: 0x0354,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        bus: Some(BusSequence {
            masks: [bit(21) | bit(22), 0, 0, 0],
            si0: Some(RegBits::new(INFRA_TOPAXI_SI0_CTL, SI0_MFG_OVERRIDE)),
        }),
        clocks: &["mfg_core0"],
        ..DomainDescriptor::EMPTY
    },
    DomainDescriptor {
        name: "audio",
        sta_mask: bit(24),
        ctl_offs: 0x035c,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        sram: INLINE_SRAM,
        bus: bus([bit(28), 0, 0, 0]),
        clocks: &["audio", "audio_intbus"],
        initial_clocks: 2,
        ..DomainDescriptor::EMPTY
    },
];

/// MT3612
pub static MT3612: SocData = SocData {
    name: "MT3612",
    compatible: "mediatek,mt3612-scpsys",
    domains: &DOMAINS,
    subdomains: &[
        ("mm_core", "cam"),
        ("mm_core", "isp"),
        ("mm_core", "dp"),
        ("vpu_vcore", "vpu_conn"),
        ("vpu_conn", "vpu_core0"),
        ("vpu_conn", "vpu_core1"),
        ("vpu_conn", "vpu_core2"),
        ("mfg", "mfg_core0"),
    ],
    sram_retention: &[
        ("vpu_vcore", "vpu_core0"),
        ("vpu_vcore", "vpu_core1"),
        ("vpu_vcore", "vpu_core2"),
    ],
};
