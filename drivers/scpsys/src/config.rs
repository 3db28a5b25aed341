//! Driver configuration.

use scpsys_hal::POLL_TIMEOUT_US;

use crate::regs::PROJECT_CODE_UNLOCK;

/// SCPSYS driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScpsysConfig {
    /// Deadline for every hardware acknowledge, in microseconds
    pub poll_timeout_us: u64,

    /// Power every domain on once while building the registry
    pub eager_power_on: bool,

    /// Value written to `POWERON_CONFIG_EN` before each power-on
    pub project_code: u32,
}

impl ScpsysConfig {
    /// Create a new default configuration
    pub const fn new() -> Self {
        Self {
            poll_timeout_us: POLL_TIMEOUT_US,
            eager_power_on: true,
            project_code: PROJECT_CODE_UNLOCK,
        }
    }

    /// Configuration for platforms whose power-management core idles unused
    /// domains itself: nothing is powered at build time
    pub const fn lazy() -> Self {
        Self {
            poll_timeout_us: POLL_TIMEOUT_US,
            eager_power_on: false,
            project_code: PROJECT_CODE_UNLOCK,
        }
    }

    /// Configuration for simulation, with short acknowledge deadlines
    pub const fn simulation() -> Self {
        Self {
            poll_timeout_us: 1_000,
            eager_power_on: false,
            project_code: PROJECT_CODE_UNLOCK,
        }
    }
}

impl Default for ScpsysConfig {
    fn default() -> Self {
        Self::new()
    }
}
