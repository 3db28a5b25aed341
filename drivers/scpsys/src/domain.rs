//! # Domain Controller
//!
//! Runs the power-on and power-off sequences of one domain. Every stage is
//! driven by the domain's [`DomainDescriptor`]; stages the domain does not
//! have are skipped.
//!
//! ## Power-On
//!
//! ```text
//!   supply ─▶ initial clocks ─▶ project code ─▶ buck ─▶ ON ─▶ ON_2ND ─▶ ELS
//!        ─▶ wait status on ─▶ CLK_DIS/ISO/RST_B (+ display SRAM wake)
//!        ─▶ SRAM pdn (+ ack) ─▶ DP PHY ─▶ bus unprotect 3,2,1,0 (+ SI0)
//!        ─▶ deferred clocks
//! ```
//!
//! Any failure between the initial clocks and the bus stage disables the
//! initial clocks in reverse and then the supply. A deferred clock that
//! fails is rolled back and logged; the domain still counts as on.
//!
//! ## Power-Off
//!
//! ```text
//!   SI0 ─▶ bus protect 0,1,2,3 ─▶ (VPU: deferred clocks off) ─▶ DP PHY
//!       ─▶ SRAM pdn (+ ack) ─▶ display SRAM sleep ─▶ ISO/CLK_DIS/RST_B
//!       ─▶ ELS ─▶ ON/ON_2ND off ─▶ wait status off ─▶ buck
//!       ─▶ clocks off ─▶ supply off
//! ```
//!
//! A failure disables every clock and returns the error; the supply is left
//! alone because the domain may still be drawing from it.
//!
//! ## Status
//!
//! | PWR_STATUS | PWR_STATUS_2ND | Status         |
//! |------------|----------------|----------------|
//! | set        | set            | `On`           |
//! | clear      | clear          | `Off`          |
//! | differ     | differ         | `Inconsistent` |
//!
//! Polls treat `Inconsistent` as "not there yet" and keep waiting; each
//! poll that saw it bumps the domain's mismatch counter.

use alloc::sync::Arc;
use core::fmt;
use core::ops::Range;
use core::sync::atomic::{AtomicU64, Ordering};

use arrayvec::ArrayVec;
use scpsys_hal::{poll_until, Clock, Error, Infracfg, Regulator, RegisterIo, Result, TimeSource};
use spin::Mutex;

use crate::config::ScpsysConfig;
use crate::descriptor::{
    BuckIsolation, BusSequence, DomainCaps, DomainDescriptor, ResetSequence, SramSequence, MAX_CLKS,
};
use crate::framework::GenericPowerDomain;
use crate::power_controller::PowerController;
use crate::regs::{
    PwrCtl, BUS_PROT, POWERON_CONFIG_EN, PWR_STATUS, PWR_STATUS_2ND, SRAM_SLEEP_B,
    SRAM_SLEEP_B_MASK,
};

// =============================================================================
// STATUS AND STATISTICS
// =============================================================================

/// Power state reported by the two status registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStatus {
    /// Both registers report on
    On,
    /// Both registers report off
    Off,
    /// The registers disagree
    Inconsistent,
}

/// Per-domain transition counters
#[derive(Debug, Default)]
pub struct DomainStats {
    power_on: AtomicU64,
    power_off: AtomicU64,
    failures: AtomicU64,
    status_mismatches: AtomicU64,
}

/// Point-in-time copy of [`DomainStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainStatsSnapshot {
    /// Successful power-ons
    pub power_on: u64,
    /// Successful power-offs
    pub power_off: u64,
    /// Failed transitions in either direction
    pub failures: u64,
    /// Polls that saw the status registers disagree
    pub status_mismatches: u64,
}

impl DomainStats {
    /// Take a snapshot
    pub fn snapshot(&self) -> DomainStatsSnapshot {
        DomainStatsSnapshot {
            power_on: self.power_on.load(Ordering::Relaxed),
            power_off: self.power_off.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            status_mismatches: self.status_mismatches.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// DOMAIN CONTROLLER
// =============================================================================

/// Runtime state of one power domain
pub struct DomainController {
    desc: &'static DomainDescriptor,
    spm: Arc<dyn RegisterIo>,
    time: Arc<dyn TimeSource>,
    infracfg: Option<Arc<dyn Infracfg>>,
    clocks: ArrayVec<Arc<dyn Clock>, MAX_CLKS>,
    supply: Option<Arc<dyn Regulator>>,
    buck_lock: Option<Arc<Mutex<()>>>,
    sram: Option<Arc<PowerController>>,
    timeout_us: u64,
    project_code: u32,
    stats: DomainStats,
}

impl DomainController {
    /// Controller for `desc` over the SPM register block
    pub fn new(
        desc: &'static DomainDescriptor,
        spm: Arc<dyn RegisterIo>,
        time: Arc<dyn TimeSource>,
        config: &ScpsysConfig,
    ) -> Self {
        Self {
            desc,
            spm,
            time,
            infracfg: None,
            clocks: ArrayVec::new(),
            supply: None,
            buck_lock: None,
            sram: None,
            timeout_us: config.poll_timeout_us,
            project_code: config.project_code,
            stats: DomainStats::default(),
        }
    }

    /// Attach the INFRACFG block used for bus protection
    pub fn with_infracfg(mut self, infracfg: Arc<dyn Infracfg>) -> Self {
        self.infracfg = Some(infracfg);
        self
    }

    /// Append the next clock in enable order
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Result<Self> {
        self.clocks
            .try_push(clock)
            .map_err(|_| Error::InvalidConfig)?;
        Ok(self)
    }

    /// Attach the domain's supply
    pub fn with_supply(mut self, supply: Arc<dyn Regulator>) -> Self {
        self.supply = Some(supply);
        self
    }

    /// Share a buck isolation lock with sibling domains
    pub fn with_buck_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.buck_lock = Some(lock);
        self
    }

    /// Attach the local SRAM power controller
    pub fn with_sram_controller(mut self, sram: Arc<PowerController>) -> Self {
        self.sram = Some(sram);
        self
    }

    /// Static description
    pub fn descriptor(&self) -> &'static DomainDescriptor {
        self.desc
    }

    /// Domain name
    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    /// Local SRAM power controller, if the domain has one
    pub fn sram_controller(&self) -> Option<&Arc<PowerController>> {
        self.sram.as_ref()
    }

    /// Transition counters
    pub fn stats(&self) -> DomainStatsSnapshot {
        self.stats.snapshot()
    }

    /// Read the status registers
    pub fn status(&self) -> PowerStatus {
        let mask = self.desc.sta_mask;
        let first = self.spm.read32_masked(PWR_STATUS, mask) != 0;
        let second = self.spm.read32_masked(PWR_STATUS_2ND, mask) != 0;

        match (first, second) {
            (true, true) => PowerStatus::On,
            (false, false) => PowerStatus::Off,
            _ => PowerStatus::Inconsistent,
        }
    }

    /// Whether both status registers report the domain on
    pub fn is_on(&self) -> bool {
        self.status() == PowerStatus::On
    }

    /// Whether the domain stays on for wakeup-armed devices
    pub fn active_wakeup(&self) -> bool {
        self.desc.caps.contains(DomainCaps::ACTIVE_WAKEUP)
    }

    // =========================================================================
    // POWER ON
    // =========================================================================

    /// Power the domain on
    pub fn power_on(&self) -> Result<()> {
        let initial = self.initial_clocks();
        log::debug!("{}: power on", self.name());

        if let Some(supply) = &self.supply {
            if let Err(e) = supply.enable() {
                log::error!(
                    "{}: supply {} enable failed: {}",
                    self.name(),
                    supply.name(),
                    e
                );
                DomainStats::bump(&self.stats.failures);
                return Err(e);
            }
        }

        let result = self.enable_clocks(0..initial).and_then(|()| {
            self.power_on_sequence().map_err(|e| {
                self.disable_clocks(0..initial);
                e
            })
        });

        if let Err(e) = result {
            if let Some(supply) = &self.supply {
                supply.disable();
            }
            log::error!("{}: failed to power on domain: {}", self.name(), e);
            DomainStats::bump(&self.stats.failures);
            return Err(e);
        }

        if let Err(e) = self.enable_clocks(self.deferred_clocks()) {
            log::warn!("{}: deferred clocks left off: {}", self.name(), e);
        }

        DomainStats::bump(&self.stats.power_on);
        Ok(())
    }

    fn power_on_sequence(&self) -> Result<()> {
        let ctl = self.desc.ctl_offs;

        self.spm.write32(POWERON_CONFIG_EN, self.project_code);

        if let Some(power) = &self.desc.power {
            if let Some(buck) = &power.buck {
                self.update_buck(buck, false);
            }
            self.spm.set_bits(ctl, PwrCtl::ON.bits());
            self.spm.set_bits(ctl, PwrCtl::ON_2ND.bits());
            if power.els {
                self.spm.clear_bits(ctl, PwrCtl::ELS_EN.bits());
            }
            self.wait_status(PowerStatus::On)?;
        }

        if self.desc.reset != ResetSequence::None {
            self.spm.clear_bits(ctl, PwrCtl::CLK_DIS.bits());
            self.spm.clear_bits(ctl, PwrCtl::ISO.bits());
            self.spm.set_bits(ctl, PwrCtl::RST_B.bits());

            if let ResetSequence::DisplaySleep { sram_ctl_offs } = self.desc.reset {
                self.display_sram_wake(sram_ctl_offs);
            }
        }

        self.sram_power_on()?;

        if let Some(dp) = self.desc.dp_phy_reset {
            self.spm.set_bits(dp.offs, dp.mask);
        }

        if let Some(bus) = &self.desc.bus {
            self.bus_unprotect(bus)?;
        }

        Ok(())
    }

    fn display_sram_wake(&self, sram_ctl: u32) {
        if self.spm.read32_masked(sram_ctl, SRAM_SLEEP_B_MASK) == SRAM_SLEEP_B_MASK {
            return;
        }

        let ctl = self.desc.ctl_offs;
        for bit in SRAM_SLEEP_B {
            self.spm.set_bits(sram_ctl, bit);
        }
        self.time.delay_us(1);
        self.spm.set_bits(ctl, PwrCtl::SRAM_ISOINT_B.bits());
        self.time.delay_us(1);
        self.spm.clear_bits(ctl, PwrCtl::SRAM_CKISO.bits());
    }

    fn sram_power_on(&self) -> Result<()> {
        match self.desc.sram {
            SramSequence::None => Ok(()),
            SramSequence::Inline { pdn, ack } => {
                let ctl = self.desc.ctl_offs;
                self.spm.clear_bits(ctl, pdn);
                self.wait_ack(ctl, ack, false)
            }
            SramSequence::Banked {
                ctl_offs,
                banks,
                extra_pdn,
            } => {
                for bank in &banks {
                    self.spm.clear_bits(ctl_offs, bank.pdn);
                    self.wait_ack(ctl_offs, bank.ack, false)?;
                }
                if extra_pdn != 0 {
                    self.spm.clear_bits(ctl_offs, extra_pdn);
                }
                Ok(())
            }
        }
    }

    fn bus_unprotect(&self, bus: &BusSequence) -> Result<()> {
        let infracfg = self.infracfg()?;

        for (channel, &mask) in bus.masks.iter().enumerate().rev() {
            if mask != 0 {
                infracfg.clear_bus_protection(&BUS_PROT[channel], mask)?;
            }
        }

        if let Some(si0) = bus.si0 {
            infracfg.update_si0(si0.offs, si0.mask, si0.mask);
        }

        Ok(())
    }

    // =========================================================================
    // POWER OFF
    // =========================================================================

    /// Power the domain off
    pub fn power_off(&self) -> Result<()> {
        let initial = self.initial_clocks();
        let all = self.clocks.len();
        let early_deferred = self.desc.is_vpu() && initial > 0;
        log::debug!("{}: power off", self.name());

        if let Err(e) = self.power_off_sequence(self.deferred_clocks(), early_deferred) {
            self.disable_clocks(0..all);
            log::error!("{}: failed to power off domain: {}", self.name(), e);
            DomainStats::bump(&self.stats.failures);
            return Err(e);
        }

        if early_deferred {
            self.disable_clocks(0..initial);
        } else {
            self.disable_clocks(0..all);
        }

        if let Some(supply) = &self.supply {
            supply.disable();
        }

        DomainStats::bump(&self.stats.power_off);
        Ok(())
    }

    fn power_off_sequence(&self, deferred: Range<usize>, early_deferred: bool) -> Result<()> {
        let ctl = self.desc.ctl_offs;

        if let Some(bus) = &self.desc.bus {
            self.bus_protect(bus)?;
        }

        // VPU cores drop their core clocks before the shared SRAM banks go down
        if early_deferred {
            self.disable_clocks(deferred);
        }

        if let Some(dp) = self.desc.dp_phy_reset {
            self.spm.clear_bits(dp.offs, dp.mask);
        }

        self.sram_power_off()?;

        if let ResetSequence::DisplaySleep { sram_ctl_offs } = self.desc.reset {
            self.display_sram_sleep(sram_ctl_offs);
        }

        if self.desc.reset != ResetSequence::None {
            self.spm.set_bits(ctl, PwrCtl::ISO.bits());
            self.spm.set_bits(ctl, PwrCtl::CLK_DIS.bits());
            if !self.desc.has_display_sleep() {
                self.spm.clear_bits(ctl, PwrCtl::RST_B.bits());
            }
        }

        if let Some(power) = &self.desc.power {
            if power.els {
                self.spm.set_bits(ctl, PwrCtl::ELS_EN.bits());
            }
            self.spm.clear_bits(ctl, PwrCtl::ON.bits());
            self.spm.clear_bits(ctl, PwrCtl::ON_2ND.bits());
            self.wait_status(PowerStatus::Off)?;

            if let Some(buck) = &power.buck {
                self.update_buck(buck, true);
            }
        }

        Ok(())
    }

    fn bus_protect(&self, bus: &BusSequence) -> Result<()> {
        let infracfg = self.infracfg()?;

        if let Some(si0) = bus.si0 {
            infracfg.update_si0(si0.offs, si0.mask, 0);
        }

        for (channel, &mask) in bus.masks.iter().enumerate() {
            if mask != 0 {
                infracfg.set_bus_protection(&BUS_PROT[channel], mask)?;
            }
        }

        Ok(())
    }

    fn sram_power_off(&self) -> Result<()> {
        match self.desc.sram {
            SramSequence::None => Ok(()),
            // display SRAM is put to sleep instead
            SramSequence::Inline { .. } if self.desc.has_display_sleep() => Ok(()),
            SramSequence::Inline { pdn, ack } => {
                let ctl = self.desc.ctl_offs;
                self.spm.set_bits(ctl, pdn);
                self.wait_ack(ctl, ack, true)
            }
            SramSequence::Banked {
                ctl_offs,
                banks,
                extra_pdn,
            } => {
                if extra_pdn != 0 {
                    self.spm.set_bits(ctl_offs, extra_pdn);
                }
                for bank in banks.iter().rev() {
                    self.spm.set_bits(ctl_offs, bank.pdn);
                    self.wait_ack(ctl_offs, bank.ack, true)?;
                }
                Ok(())
            }
        }
    }

    fn display_sram_sleep(&self, sram_ctl: u32) {
        let ctl = self.desc.ctl_offs;

        self.spm.set_bits(ctl, PwrCtl::SRAM_CKISO.bits());
        self.time.delay_us(1);
        self.spm.clear_bits(ctl, PwrCtl::SRAM_ISOINT_B.bits());
        for bit in SRAM_SLEEP_B {
            self.spm.clear_bits(sram_ctl, bit);
        }
        self.time.delay_us(1);
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn initial_clocks(&self) -> usize {
        self.desc.initial_clocks.min(self.clocks.len())
    }

    fn deferred_clocks(&self) -> Range<usize> {
        let initial = self.initial_clocks();
        initial..self.clocks.len().min(initial + self.desc.deferred_clocks())
    }

    /// Enable `range` in order; on failure disable what was enabled
    fn enable_clocks(&self, range: Range<usize>) -> Result<()> {
        for i in range.clone() {
            let clock = &self.clocks[i];
            if let Err(e) = clock.prepare_enable() {
                log::error!(
                    "{}: clock {} enable failed: {}",
                    self.name(),
                    clock.name(),
                    e
                );
                self.disable_clocks(range.start..i);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Disable `range` in reverse order
    fn disable_clocks(&self, range: Range<usize>) {
        for clock in self.clocks[range].iter().rev() {
            clock.disable_unprepare();
        }
    }

    fn update_buck(&self, buck: &BuckIsolation, isolate: bool) {
        let _guard = self.buck_lock.as_ref().map(|lock| lock.lock());

        if isolate {
            self.spm.set_bits(buck.bits.offs, buck.bits.mask);
        } else {
            self.spm.clear_bits(buck.bits.offs, buck.bits.mask);
        }
    }

    fn infracfg(&self) -> Result<&dyn Infracfg> {
        self.infracfg.as_deref().ok_or_else(|| {
            log::error!("{}: bus protection without INFRACFG", self.name());
            Error::InvalidConfig
        })
    }

    fn wait_status(&self, target: PowerStatus) -> Result<()> {
        let mut mismatch = false;

        let result = poll_until(self.time.as_ref(), self.timeout_us, || match self.status() {
            PowerStatus::Inconsistent => {
                mismatch = true;
                false
            }
            status => status == target,
        });

        if mismatch {
            DomainStats::bump(&self.stats.status_mismatches);
            log::warn!(
                "{}: power status registers disagree (sta {:#010x} sta_2nd {:#010x})",
                self.name(),
                self.spm.read32(PWR_STATUS),
                self.spm.read32(PWR_STATUS_2ND)
            );
        }

        result.map_err(|e| {
            log::error!(
                "{}: timed out waiting for power {:?} (ctl {:#010x})",
                self.name(),
                target,
                self.spm.read32(self.desc.ctl_offs)
            );
            e
        })
    }

    fn wait_ack(&self, offs: u32, ack: u32, set: bool) -> Result<()> {
        let expected = if set { ack } else { 0 };

        poll_until(self.time.as_ref(), self.timeout_us, || {
            self.spm.read32_masked(offs, ack) == expected
        })
        .map_err(|e| {
            log::error!(
                "{}: SRAM ack {:#010x} timeout (reg {:#x} = {:#010x})",
                self.name(),
                ack,
                offs,
                self.spm.read32(offs)
            );
            e
        })
    }
}

impl GenericPowerDomain for DomainController {
    fn name(&self) -> &str {
        self.desc.name
    }

    fn power_on(&self) -> Result<()> {
        DomainController::power_on(self)
    }

    fn power_off(&self) -> Result<()> {
        DomainController::power_off(self)
    }

    fn is_on(&self) -> bool {
        DomainController::is_on(self)
    }

    fn active_wakeup(&self) -> bool {
        DomainController::active_wakeup(self)
    }
}

impl fmt::Debug for DomainController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainController")
            .field("name", &self.desc.name)
            .field("clocks", &self.clocks.len())
            .field("supply", &self.supply.as_ref().map(|s| s.name()))
            .field("sram", &self.sram)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
