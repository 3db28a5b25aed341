//! # SCPSYS Hardware Abstraction Layer
//!
//! Everything the MediaTek power-domain sequencer needs from the outside
//! world, expressed as small object-safe traits so the sequences run against
//! real MMIO on target and against simulated hardware on the host.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         scpsys-hal                           │
//! │  ┌────────────┐  ┌────────────┐  ┌─────────────────────────┐ │
//! │  │   mmio     │  │   time     │  │   clk / bus             │ │
//! │  │ RegisterIo │  │ TimeSource │  │ Clock, Regulator,       │ │
//! │  │ Mmio       │  │ poll_until │  │ BusProtection, TopAxiSi0│ │
//! │  └────────────┘  └────────────┘  └─────────────────────────┘ │
//! │  ┌────────────┐  ┌──────────────────────────────────────────┐│
//! │  │   error    │  │ mock (feature) simulated registers/clocks││
//! │  └────────────┘  └──────────────────────────────────────────┘│
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

extern crate alloc;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod bus;
pub mod clk;
pub mod error;
pub mod mmio;
pub mod time;

#[cfg(feature = "mock")]
pub mod mock;

pub use bus::{BusProtRegs, BusProtection, Infracfg, InfracfgBlock, TopAxiSi0};
pub use clk::{Clock, Regulator};
pub use error::{Error, Result};
pub use mmio::{bit, genmask, Mmio, RegisterIo};
pub use time::{poll_until, Deadline, TimeSource, POLL_TIMEOUT_US};

#[cfg(target_arch = "aarch64")]
pub use time::GenericTimer;
