//! # Domain Registry
//!
//! Builds one [`DomainController`] per descriptor of a SoC table, resolves
//! every named collaborator through the [`Platform`], wires the topology and
//! hands the result to the power-domain framework.
//!
//! ## Build Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          DomainRegistry::build                      │
//! │                                                                     │
//! │  SocData ──▶ validate descriptors ──▶ reject duplicate names        │
//! │                                                                     │
//! │  per domain:                                                        │
//! │    clocks / supply ─────▶ Platform lookup (NotFound if missing)     │
//! │    bus stage ──────────▶ INFRACFG (InvalidConfig if absent)         │
//! │    buck lock group ────▶ one Arc<Mutex<()>> per group               │
//! │    SRAM pool ──────────▶ PowerController over Platform::sram_io     │
//! │                                                                     │
//! │  subdomain + SRAM-retention edges ──▶ DomainGraph ──▶ topo order    │
//! │                                                                     │
//! │  eager_power_on ──▶ power_on() in topo order (failures logged)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registration with the framework is a separate step,
//! [`DomainRegistry::register_with`], so the caller decides when the domains
//! become visible.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use alloc::vec::Vec;

use scpsys_hal::{Clock, Error, Infracfg, RegisterIo, Regulator, Result, TimeSource};
use spin::Mutex;

use crate::config::ScpsysConfig;
use crate::descriptor::DomainDescriptor;
use crate::domain::DomainController;
use crate::framework::{GenericPowerDomain, PowerDomainFramework};
use crate::power_controller::PowerController;
use crate::soc::SocData;
use crate::topology::{DomainGraph, GraphStats};

// =============================================================================
// BUILD INPUTS
// =============================================================================

/// Lookup of the named resources referenced by the SoC tables
pub trait Platform {
    /// Clock by name
    fn clock(&self, name: &str) -> Option<Arc<dyn Clock>>;

    /// Regulator by supply name
    fn regulator(&self, name: &str) -> Option<Arc<dyn Regulator>>;

    /// Register window of the local SRAM controller of `domain`
    fn sram_io(&self, domain: &str) -> Option<Box<dyn RegisterIo>>;
}

/// Register blocks and time source shared by every domain
#[derive(Clone)]
pub struct ScpsysResources {
    /// SPM / SCPSYS register block
    pub spm: Arc<dyn RegisterIo>,
    /// INFRACFG block, required when any domain has a bus stage
    pub infracfg: Option<Arc<dyn Infracfg>>,
    /// Monotonic time source for every poll
    pub time: Arc<dyn TimeSource>,
}

impl core::fmt::Debug for ScpsysResources {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScpsysResources")
            .field("infracfg", &self.infracfg.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// All power domains of one SCPSYS instance
pub struct DomainRegistry {
    soc: &'static SocData,
    domains: Vec<Arc<DomainController>>,
    graph: DomainGraph,
    order: Vec<usize>,
    stats: GraphStats,
}

impl DomainRegistry {
    /// Build every domain of `soc`
    pub fn build(
        soc: &'static SocData,
        resources: ScpsysResources,
        platform: &dyn Platform,
        config: &ScpsysConfig,
    ) -> Result<Self> {
        let mut names = BTreeSet::new();
        for desc in soc.domains {
            desc.validate()?;
            if !names.insert(desc.name) {
                log::error!("{}: duplicate domain '{}'", soc.name, desc.name);
                return Err(Error::InvalidConfig);
            }
        }

        let mut buck_locks = BTreeMap::new();
        let mut domains = Vec::with_capacity(soc.domains.len());
        for desc in soc.domains {
            let domain = Self::controller(desc, &resources, platform, config, &mut buck_locks)?;
            domains.push(Arc::new(domain));
        }

        let mut graph = DomainGraph::new(domains.len());
        for &(parent, child) in soc.edges() {
            let (Some(p), Some(c)) = (soc.position(parent), soc.position(child)) else {
                log::error!(
                    "{}: edge {} -> {} names an unknown domain",
                    soc.name,
                    parent,
                    child
                );
                return Err(Error::InvalidConfig);
            };
            graph.add_edge(p, c)?;
        }

        let order = graph.topological_order()?;
        let stats = graph.stats()?;

        let registry = Self {
            soc,
            domains,
            graph,
            order,
            stats,
        };

        if config.eager_power_on {
            registry.power_on_all();
        }

        log::info!(
            "{}: {} power domains, {} edges, {} roots, depth {}",
            soc.name,
            stats.total_nodes,
            stats.total_edges,
            stats.root_nodes,
            stats.max_depth
        );

        Ok(registry)
    }

    fn controller(
        desc: &'static DomainDescriptor,
        resources: &ScpsysResources,
        platform: &dyn Platform,
        config: &ScpsysConfig,
        buck_locks: &mut BTreeMap<u8, Arc<Mutex<()>>>,
    ) -> Result<DomainController> {
        let mut domain = DomainController::new(
            desc,
            resources.spm.clone(),
            resources.time.clone(),
            config,
        );

        for &name in desc.clocks {
            let clock = platform.clock(name).ok_or_else(|| {
                log::error!("{}: clock '{}' not found", desc.name, name);
                Error::NotFound
            })?;
            domain = domain.with_clock(clock)?;
        }

        if let Some(name) = desc.supply {
            let supply = platform.regulator(name).ok_or_else(|| {
                log::error!("{}: supply '{}' not found", desc.name, name);
                Error::NotFound
            })?;
            domain = domain.with_supply(supply);
        }

        if desc.bus.is_some() {
            let infracfg = resources.infracfg.clone().ok_or_else(|| {
                log::error!("{}: bus protection without INFRACFG", desc.name);
                Error::InvalidConfig
            })?;
            domain = domain.with_infracfg(infracfg);
        }

        let group = desc.power.and_then(|p| p.buck).and_then(|b| b.lock_group);
        if let Some(group) = group {
            let lock = buck_locks
                .entry(group)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            domain = domain.with_buck_lock(lock);
        }

        if let Some(pool) = desc.sram_pool {
            let io = platform.sram_io(desc.name).ok_or_else(|| {
                log::error!("{}: no SRAM controller registers", desc.name);
                Error::NotFound
            })?;
            let sram = PowerController::new(pool.size, Some(io), pool.kind)?;
            domain = domain.with_sram_controller(Arc::new(sram));
        }

        Ok(domain)
    }

    fn power_on_all(&self) {
        for &index in &self.order {
            let domain = &self.domains[index];
            match domain.power_on() {
                Ok(()) => {}
                Err(e) if e.is_hardware() => {
                    log::warn!("{}: initial power on failed: {}", domain.name(), e);
                }
                Err(e) => log::error!("{}: cannot power on: {}", domain.name(), e),
            }
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// SoC table the registry was built from
    pub fn soc(&self) -> &'static SocData {
        self.soc
    }

    /// Domain at `index`
    pub fn domain(&self, index: usize) -> Result<&Arc<DomainController>> {
        self.domains.get(index).ok_or(Error::NotFound)
    }

    /// Domain called `name`
    pub fn find(&self, name: &str) -> Option<&Arc<DomainController>> {
        self.soc.position(name).and_then(|i| self.domains.get(i))
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether the SoC has no domains
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Domains in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DomainController>> {
        self.domains.iter()
    }

    /// Local SRAM power controller of the domain at `index`
    pub fn sram_controller(&self, index: usize) -> Result<&Arc<PowerController>> {
        self.domain(index)?.sram_controller().ok_or(Error::NotFound)
    }

    // =========================================================================
    // POWER CONTROL
    // =========================================================================

    /// Power on the domain at `index`
    pub fn power_on(&self, index: usize) -> Result<()> {
        self.domain(index)?.power_on()
    }

    /// Power off the domain at `index`
    pub fn power_off(&self, index: usize) -> Result<()> {
        self.domain(index)?.power_off()
    }

    /// Whether the domain at `index` is on
    pub fn is_on(&self, index: usize) -> Result<bool> {
        Ok(self.domain(index)?.is_on())
    }

    /// Whether the domain at `index` stays on for wakeup sources
    pub fn active_wakeup(&self, index: usize) -> Result<bool> {
        Ok(self.domain(index)?.active_wakeup())
    }

    // =========================================================================
    // TOPOLOGY
    // =========================================================================

    /// Direct parents of `index`
    pub fn parents(&self, index: usize) -> &[usize] {
        self.graph.parents(index)
    }

    /// Direct children of `index`
    pub fn children(&self, index: usize) -> &[usize] {
        self.graph.children(index)
    }

    /// Parents before children
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Topology statistics
    pub fn graph_stats(&self) -> GraphStats {
        self.stats
    }

    /// Hand every domain and edge to the power-domain framework
    pub fn register_with(&self, framework: &mut dyn PowerDomainFramework) -> Result<()> {
        for (index, domain) in self.domains.iter().enumerate() {
            let generic: Arc<dyn GenericPowerDomain> = domain.clone();
            framework.add_domain(index, generic)?;
        }
        for (parent, child) in self.graph.edges() {
            framework.add_subdomain(parent, child)?;
        }
        Ok(())
    }

    /// Shut down every SRAM power controller
    ///
    /// Every controller is asked even after a failure; the first `Busy` is
    /// returned.
    pub fn teardown(&self) -> Result<()> {
        let mut result = Ok(());

        for domain in &self.domains {
            if let Some(sram) = domain.sram_controller() {
                if let Err(e) = sram.exit() {
                    log::error!("{}: SRAM controller still has claims", domain.name());
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }

        result
    }
}

impl core::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("soc", &self.soc.name)
            .field("domains", &self.domains.len())
            .field("order", &self.order)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};

    use scpsys_hal::bit;
    use scpsys_hal::mock::{
        Event, Journal, MockClock, MockInfracfg, MockRegs, MockRegulator, RegFile, SimClock,
    };

    use crate::descriptor::{PowerSequence, ResetSequence, SramSequence};
    use crate::regs::{PwrCtl, PWR_STATUS, PWR_STATUS_2ND};
    use crate::soc::{MT3611, MT3612};

    const PARENT: DomainDescriptor = DomainDescriptor {
        name: "parent",
        sta_mask: bit(0),
        ctl_offs: 0x300,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        clocks: &["parent"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    };

    const CHILD: DomainDescriptor = DomainDescriptor {
        name: "child",
        sta_mask: bit(1),
        ctl_offs: 0x304,
        power: Some(PowerSequence::PLAIN),
        reset: ResetSequence::Standard,
        clocks: &["child"],
        initial_clocks: 1,
        ..DomainDescriptor::EMPTY
    };

    static CHILD_FIRST: [DomainDescriptor; 2] = [CHILD, PARENT];
    static TWINS: [DomainDescriptor; 2] = [PARENT, PARENT];

    static NESTED: SocData = SocData {
        name: "nested",
        compatible: "test,nested",
        domains: &CHILD_FIRST,
        subdomains: &[("parent", "child")],
        sram_retention: &[],
    };

    static CYCLIC: SocData = SocData {
        name: "cyclic",
        compatible: "test,cyclic",
        domains: &CHILD_FIRST,
        subdomains: &[("parent", "child"), ("child", "parent")],
        sram_retention: &[],
    };

    static DANGLING: SocData = SocData {
        name: "dangling",
        compatible: "test,dangling",
        domains: &CHILD_FIRST,
        subdomains: &[("parent", "gpu")],
        sram_retention: &[],
    };

    static DUPLICATE: SocData = SocData {
        name: "duplicate",
        compatible: "test,duplicate",
        domains: &TWINS,
        subdomains: &[],
        sram_retention: &[],
    };

    /// Every domain of `soc` follows its control register
    fn model(soc: &SocData, regs: &mut RegFile, offset: u32, value: u32) {
        for desc in soc.domains {
            if offset == desc.ctl_offs {
                let ctl = PwrCtl::from_bits_truncate(value);
                let both = PwrCtl::ON | PwrCtl::ON_2ND;
                if ctl.contains(both) {
                    regs.or(PWR_STATUS, desc.sta_mask);
                    regs.or(PWR_STATUS_2ND, desc.sta_mask);
                } else if !ctl.intersects(both) {
                    regs.and_not(PWR_STATUS, desc.sta_mask);
                    regs.and_not(PWR_STATUS_2ND, desc.sta_mask);
                }
                if let SramSequence::Inline { pdn, ack } = desc.sram {
                    regs.assign(offset, ack, value & pdn == pdn);
                }
            }
            if let SramSequence::Banked { ctl_offs, banks, .. } = desc.sram {
                if offset == ctl_offs {
                    for bank in &banks {
                        regs.assign(offset, bank.ack, value & bank.pdn == bank.pdn);
                    }
                }
            }
        }
    }

    fn resources(soc: &'static SocData, journal: &Journal) -> ScpsysResources {
        ScpsysResources {
            spm: Arc::new(MockRegs::with_hook(move |regs, offset, value| {
                model(soc, regs, offset, value)
            })),
            infracfg: Some(Arc::new(MockInfracfg::new(journal))),
            time: Arc::new(SimClock::new(10)),
        }
    }

    #[derive(Default)]
    struct TestPlatform {
        journal: Journal,
        missing: Option<&'static str>,
        no_sram: bool,
    }

    impl Platform for TestPlatform {
        fn clock(&self, name: &str) -> Option<Arc<dyn Clock>> {
            if self.missing == Some(name) {
                return None;
            }
            let clock: Arc<dyn Clock> = Arc::new(MockClock::new(name, &self.journal));
            Some(clock)
        }

        fn regulator(&self, name: &str) -> Option<Arc<dyn Regulator>> {
            if self.missing == Some(name) {
                return None;
            }
            let supply: Arc<dyn Regulator> = Arc::new(MockRegulator::new(name, &self.journal));
            Some(supply)
        }

        fn sram_io(&self, _domain: &str) -> Option<Box<dyn RegisterIo>> {
            if self.no_sram {
                return None;
            }
            Some(Box::new(MockRegs::new()) as Box<dyn RegisterIo>)
        }
    }

    #[derive(Default)]
    struct RecordingFramework {
        domains: Vec<(usize, String)>,
        edges: Vec<(usize, usize)>,
    }

    impl PowerDomainFramework for RecordingFramework {
        fn add_domain(&mut self, index: usize, domain: Arc<dyn GenericPowerDomain>) -> Result<()> {
            self.domains.push((index, domain.name().to_string()));
            Ok(())
        }

        fn add_subdomain(&mut self, parent: usize, child: usize) -> Result<()> {
            self.edges.push((parent, child));
            Ok(())
        }
    }

    const LAZY: ScpsysConfig = ScpsysConfig::simulation();

    const EAGER: ScpsysConfig = ScpsysConfig {
        eager_power_on: true,
        ..ScpsysConfig::simulation()
    };

    fn build(
        soc: &'static SocData,
        platform: &TestPlatform,
        config: &ScpsysConfig,
    ) -> Result<DomainRegistry> {
        DomainRegistry::build(soc, resources(soc, &platform.journal), platform, config)
    }

    #[test]
    fn test_build_mt3612() {
        let platform = TestPlatform::default();
        let registry = build(&MT3612, &platform, &LAZY).unwrap();

        assert_eq!(registry.len(), 13);
        assert_eq!(registry.find("dp").unwrap().name(), "dp");
        assert!(registry.find("gpu").is_none());
        assert!(registry.iter().all(|d| !d.is_on()));
        assert!(platform.journal.events().is_empty());

        let order = registry.topological_order();
        for (parent, child) in MT3612.edges() {
            let p = order.iter().position(|&i| i == MT3612.position(parent).unwrap());
            let c = order.iter().position(|&i| i == MT3612.position(child).unwrap());
            assert!(p < c, "{} before {}", parent, child);
        }

        let vpu_conn = MT3612.position("vpu_conn").unwrap();
        let core0 = MT3612.position("vpu_core0").unwrap();
        assert!(registry.children(vpu_conn).contains(&core0));
        assert_eq!(registry.parents(core0).len(), 2);
        assert_eq!(registry.graph_stats().max_depth, 2);
    }

    #[test]
    fn test_eager_power_on_in_dependency_order() {
        let platform = TestPlatform::default();
        let registry = build(&NESTED, &platform, &EAGER).unwrap();

        assert_eq!(registry.topological_order(), [1, 0]);
        assert!(registry.is_on(0).unwrap());
        assert!(registry.is_on(1).unwrap());

        let events = platform.journal.events();
        let parent = events.iter().position(|e| *e == Event::ClockOn("parent".into()));
        let child = events.iter().position(|e| *e == Event::ClockOn("child".into()));
        assert!(parent.is_some() && parent < child);
    }

    #[test]
    fn test_eager_power_on_whole_soc() {
        for soc in [&MT3612, &MT3611] {
            let platform = TestPlatform::default();
            let registry = build(soc, &platform, &EAGER).unwrap();

            for domain in registry.iter() {
                assert!(domain.is_on(), "{}: {}", soc.name, domain.name());
                assert_eq!(domain.stats().power_on, 1);
            }
            assert_eq!(platform.journal.count(&Event::SupplyOn("mfg".into())), 1);
        }
    }

    #[test]
    fn test_eager_failure_does_not_abort_build() {
        let journal = Journal::new();
        let platform = TestPlatform {
            journal: journal.clone(),
            ..TestPlatform::default()
        };
        // status bits never rise
        let dead = ScpsysResources {
            spm: Arc::new(MockRegs::new()),
            infracfg: None,
            time: Arc::new(SimClock::new(10)),
        };

        let registry = DomainRegistry::build(&NESTED, dead, &platform, &EAGER).unwrap();
        assert!(!registry.is_on(0).unwrap());
        assert_eq!(registry.domain(1).unwrap().stats().failures, 1);
        assert_eq!(
            journal.count(&Event::ClockOn("parent".into())),
            journal.count(&Event::ClockOff("parent".into()))
        );
    }

    #[test]
    fn test_rejects_cycle() {
        let platform = TestPlatform::default();
        let result = build(&CYCLIC, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::InvalidConfig));
    }

    #[test]
    fn test_rejects_unknown_edge() {
        let platform = TestPlatform::default();
        let result = build(&DANGLING, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::InvalidConfig));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let platform = TestPlatform::default();
        let result = build(&DUPLICATE, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::InvalidConfig));
    }

    #[test]
    fn test_missing_clock_or_supply() {
        let platform = TestPlatform {
            missing: Some("dp_tx"),
            ..TestPlatform::default()
        };
        let result = build(&MT3612, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::NotFound));

        let platform = TestPlatform {
            missing: Some("mfg"),
            ..TestPlatform::default()
        };
        let result = build(&MT3611, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::NotFound));

        let platform = TestPlatform {
            no_sram: true,
            ..TestPlatform::default()
        };
        let result = build(&MT3611, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[test]
    fn test_bus_stage_requires_infracfg() {
        let platform = TestPlatform::default();
        let no_infra = ScpsysResources {
            infracfg: None,
            ..resources(&MT3612, &platform.journal)
        };
        let result = DomainRegistry::build(&MT3612, no_infra, &platform, &LAZY);
        assert_eq!(result.err(), Some(Error::InvalidConfig));

        // no bus stage anywhere, so no INFRACFG needed
        let no_bus = ScpsysResources {
            infracfg: None,
            ..resources(&NESTED, &platform.journal)
        };
        let result = DomainRegistry::build(&NESTED, no_bus, &platform, &LAZY);
        assert!(result.is_ok());
    }

    #[test]
    fn test_index_forwarding() {
        let platform = TestPlatform::default();
        let registry = build(&MT3612, &platform, &LAZY).unwrap();
        let conn = MT3612.position("conn").unwrap();

        registry.power_on(conn).unwrap();
        assert!(registry.is_on(conn).unwrap());
        assert!(registry.active_wakeup(conn).unwrap());
        registry.power_off(conn).unwrap();
        assert!(!registry.is_on(conn).unwrap());

        assert_eq!(registry.power_on(13), Err(Error::NotFound));
        assert_eq!(registry.power_off(99), Err(Error::NotFound));
        assert_eq!(registry.is_on(13), Err(Error::NotFound));
        assert_eq!(registry.active_wakeup(13), Err(Error::NotFound));
        assert_eq!(registry.sram_controller(conn).err(), Some(Error::NotFound));
    }

    #[test]
    fn test_register_with_framework() {
        let platform = TestPlatform::default();
        let registry = build(&MT3612, &platform, &LAZY).unwrap();
        let mut framework = RecordingFramework::default();

        registry.register_with(&mut framework).unwrap();

        assert_eq!(framework.domains.len(), 13);
        assert_eq!(framework.domains[0], (0, "conn".to_string()));
        assert_eq!(framework.edges.len(), MT3612.edges().count());
        let vpu_vcore = MT3612.position("vpu_vcore").unwrap();
        let core2 = MT3612.position("vpu_core2").unwrap();
        assert!(framework.edges.contains(&(vpu_vcore, core2)));
    }

    #[test]
    fn test_teardown_reports_live_claims() {
        let platform = TestPlatform::default();
        let registry = build(&MT3612, &platform, &LAZY).unwrap();
        let vpu_vcore = MT3612.position("vpu_vcore").unwrap();
        let sram = registry.sram_controller(vpu_vcore).unwrap();

        sram.require(0x8_0000, 0x1000).unwrap();
        assert_eq!(registry.teardown(), Err(Error::Busy));

        sram.release(0x8_0000, 0x1000).unwrap();
        assert_eq!(registry.teardown(), Ok(()));
    }
}
