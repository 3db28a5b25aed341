//! # Power-Domain Framework Contract
//!
//! The sequencer does not decide when a domain is needed. An external
//! framework (reference counting consumers, honoring parent/child nesting,
//! idling unused domains late in boot) drives it through
//! [`GenericPowerDomain`], and learns the domain set and topology through
//! [`PowerDomainFramework`].

use alloc::sync::Arc;

use scpsys_hal::Result;

/// What a power domain exposes to the framework
pub trait GenericPowerDomain: Send + Sync {
    /// Domain name
    fn name(&self) -> &str;

    /// Power the domain on
    fn power_on(&self) -> Result<()>;

    /// Power the domain off
    fn power_off(&self) -> Result<()>;

    /// Whether hardware reports the domain on
    fn is_on(&self) -> bool;

    /// Keep the domain on while a device in it is armed for wakeup
    fn active_wakeup(&self) -> bool;
}

/// Registration interface of the framework
pub trait PowerDomainFramework {
    /// Add a domain; `index` is its position in the registry
    fn add_domain(&mut self, index: usize, domain: Arc<dyn GenericPowerDomain>) -> Result<()>;

    /// Declare that `child` may only be on while `parent` is on
    fn add_subdomain(&mut self, parent: usize, child: usize) -> Result<()>;
}

static_assertions::assert_obj_safe!(GenericPowerDomain, PowerDomainFramework);
