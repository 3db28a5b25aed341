//! # SCPSYS Error Handling
//!
//! Error type shared by the register layer, the collaborator interfaces and
//! the power sequencer built on top of them.
//!
//! ## Error Categories
//!
//! | Error             | Raised by                        | Retried | Kernel code  |
//! |-------------------|----------------------------------|---------|--------------|
//! | `InvalidArgument` | SRAM controller range checks     | No      | `-EINVAL`    |
//! | `Busy`            | Teardown with live claims        | No      | `-EBUSY`     |
//! | `Timeout`         | Any hardware acknowledge poll    | No      | `-ETIMEDOUT` |
//! | `ClockFailed`     | Clock collaborator               | No      | `-EIO`       |
//! | `RegulatorFailed` | Regulator collaborator           | No      | `-EIO`       |
//! | `NotFound`        | Lookups by index/name            | No      | `-ENODEV`    |
//! | `InvalidConfig`   | Descriptor / topology validation | No      | `-EINVAL`    |
//!
//! None of these are retried by the sequencer itself: the caller (the
//! generic power-domain framework) decides what a failure means.

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// SCPSYS Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Unified error type for power sequencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// Bad address, size or discriminator at an API boundary
    InvalidArgument,
    /// Resource still claimed
    Busy,
    /// A hardware acknowledge did not arrive before the deadline
    Timeout,
    /// A clock failed to enable
    ClockFailed,
    /// A regulator failed to enable
    RegulatorFailed,
    /// No such domain, clock or supply
    NotFound,
    /// Static domain data is internally inconsistent
    InvalidConfig,
}

impl Error {
    /// Linux errno equivalent (negative)
    pub const fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument | Self::InvalidConfig => -22,
            Self::Busy => -16,
            Self::Timeout => -110,
            Self::ClockFailed | Self::RegulatorFailed => -5,
            Self::NotFound => -19,
        }
    }

    /// Whether the error came from talking to hardware, as opposed to bad input
    pub const fn is_hardware(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ClockFailed | Self::RegulatorFailed
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Busy => write!(f, "resource busy"),
            Self::Timeout => write!(f, "hardware acknowledge timed out"),
            Self::ClockFailed => write!(f, "clock enable failed"),
            Self::RegulatorFailed => write!(f, "regulator enable failed"),
            Self::NotFound => write!(f, "not found"),
            Self::InvalidConfig => write!(f, "inconsistent domain configuration"),
        }
    }
}
