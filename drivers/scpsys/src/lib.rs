//! # MediaTek SCPSYS Power Domains
//!
//! Power-domain sequencer for the MT3612 family. Each domain is switched on
//! and off by a fixed hardware handshake (supply, clocks, power switch,
//! reset, SRAM, bus protection) described by a static [`DomainDescriptor`].
//! A [`DomainRegistry`] builds the controllers for one SoC table, orders
//! them by their parent/child edges and hands them to the power-domain
//! framework. VPU local SRAM is gated per 512 KiB group by a
//! reference-counting [`PowerController`].
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             mtk-scpsys                            │
//! │                                                                   │
//! │   soc::MT3612 / MT3611 ──▶ DomainRegistry ──▶ PowerDomainFramework │
//! │   (DomainDescriptor[])         │    │                             │
//! │                                │    └──▶ DomainGraph (topology)   │
//! │                                ▼                                  │
//! │                       DomainController × N                        │
//! │                        │      │       │                           │
//! │              RegisterIo│  Clock/Reg   │Infracfg   PowerController │
//! │                        ▼      ▼       ▼               (SRAM2)     │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                             scpsys-hal                            │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let soc = SocData::from_compatible("mediatek,mt3612-scpsys").ok_or(Error::NotFound)?;
//! let registry = DomainRegistry::build(soc, resources, &platform, &ScpsysConfig::default())?;
//! registry.register_with(&mut genpd)?;
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod config;
pub mod descriptor;
pub mod domain;
pub mod framework;
pub mod power_controller;
pub mod registry;
pub mod regs;
pub mod soc;
pub mod topology;

pub use config::ScpsysConfig;
pub use descriptor::{
    BuckIsolation, BusSequence, DomainCaps, DomainDescriptor, PowerSequence, RegBits,
    ResetSequence, SramBank, SramPool, SramSequence, MAX_CLKS,
};
pub use domain::{DomainController, DomainStatsSnapshot, PowerStatus};
pub use framework::{GenericPowerDomain, PowerDomainFramework};
pub use power_controller::{PowerController, PowerControllerKind};
pub use registry::{DomainRegistry, Platform, ScpsysResources};
pub use soc::SocData;
pub use topology::{DomainGraph, GraphStats};

pub use scpsys_hal::{Error, Result};
