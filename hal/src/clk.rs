//! # Clock and Regulator Interfaces
//!
//! The sequencer consumes clocks and supplies owned by other frameworks; it
//! only needs enable/disable. Handles are resolved once when the domain
//! registry is built and shared afterwards.

use crate::error::Result;

/// Gateable clock
pub trait Clock: Send + Sync {
    /// Clock name as declared in the domain tables
    fn name(&self) -> &str;

    /// Prepare and enable the clock
    fn prepare_enable(&self) -> Result<()>;

    /// Disable and unprepare the clock
    ///
    /// Must tolerate being called on a clock that is already off.
    fn disable_unprepare(&self);
}

/// Voltage regulator feeding a power domain
pub trait Regulator: Send + Sync {
    /// Supply name as declared in the domain tables
    fn name(&self) -> &str;

    /// Enable the supply
    fn enable(&self) -> Result<()>;

    /// Disable the supply
    fn disable(&self);
}

static_assertions::assert_obj_safe!(Clock, Regulator);
