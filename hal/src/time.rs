//! # Time Source and Bounded Polling
//!
//! Every hardware acknowledge in the power sequences is a software poll of a
//! status register with an absolute deadline:
//!
//! ```text
//!   deadline = now + timeout
//!   loop {
//!       if condition() { done }
//!       if now > deadline { Timeout }
//!       relax()
//!   }
//! ```
//!
//! The condition is always evaluated before the deadline is checked, so a
//! poll that starts late still gets at least one look at the hardware.

use crate::error::{Error, Result};

/// Default acknowledge timeout for power sequencing (1 second)
pub const POLL_TIMEOUT_US: u64 = 1_000_000;

// =============================================================================
// TIME SOURCE
// =============================================================================

/// Monotonic microsecond clock with busy-wait delays
pub trait TimeSource: Send + Sync {
    /// Current monotonic time in microseconds
    fn now_us(&self) -> u64;

    /// Busy-wait for at least `us` microseconds
    fn delay_us(&self, us: u64);

    /// Back-off between two polls of the same register
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

static_assertions::assert_obj_safe!(TimeSource);

// =============================================================================
// DEADLINE
// =============================================================================

/// Absolute deadline computed once at poll entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at_us: u64,
}

impl Deadline {
    /// Deadline `timeout_us` from now
    pub fn after(time: &dyn TimeSource, timeout_us: u64) -> Self {
        Self {
            expires_at_us: time.now_us().saturating_add(timeout_us),
        }
    }

    /// Absolute expiry time
    pub fn expires_at_us(&self) -> u64 {
        self.expires_at_us
    }

    /// True once the clock has moved strictly past the deadline
    pub fn expired(&self, time: &dyn TimeSource) -> bool {
        time.now_us() > self.expires_at_us
    }
}

/// Poll `condition` until it holds or `timeout_us` elapses
pub fn poll_until<F>(time: &dyn TimeSource, timeout_us: u64, mut condition: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    let deadline = Deadline::after(time, timeout_us);

    loop {
        if condition() {
            return Ok(());
        }
        if deadline.expired(time) {
            return Err(Error::Timeout);
        }
        time.relax();
    }
}

// =============================================================================
// ARCHITECTURE TIMER
// =============================================================================

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        /// ARM generic timer (CNTPCT_EL0 / CNTFRQ_EL0)
        #[derive(Debug, Clone, Copy)]
        pub struct GenericTimer {
            ticks_per_us: u64,
        }

        impl GenericTimer {
            /// Create from the frequency the firmware programmed into CNTFRQ_EL0
            ///
            /// Returns `None` when the firmware left the frequency unset.
            pub fn new() -> Option<Self> {
                let freq = read_cntfrq();
                let ticks_per_us = freq / 1_000_000;
                if ticks_per_us == 0 {
                    log::warn!("CNTFRQ_EL0 not programmed ({} Hz)", freq);
                    return None;
                }
                Some(Self { ticks_per_us })
            }
        }

        impl TimeSource for GenericTimer {
            fn now_us(&self) -> u64 {
                read_cntpct() / self.ticks_per_us
            }

            fn delay_us(&self, us: u64) {
                let end = read_cntpct().saturating_add(us * self.ticks_per_us);
                while read_cntpct() < end {
                    core::hint::spin_loop();
                }
            }
        }

        fn read_cntfrq() -> u64 {
            let value: u64;
            // SAFETY: CNTFRQ_EL0 is readable from EL0 and above
            unsafe {
                core::arch::asm!("mrs {}, CNTFRQ_EL0", out(reg) value, options(nomem, nostack));
            }
            value
        }

        fn read_cntpct() -> u64 {
            let value: u64;
            // SAFETY: CNTPCT_EL0 is readable from EL0 and above
            unsafe {
                core::arch::asm!(
                    "isb",
                    "mrs {}, CNTPCT_EL0",
                    out(reg) value,
                    options(nomem, nostack)
                );
            }
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU64, Ordering};

    /// Clock that advances a fixed step on every read
    struct SteppingClock {
        now: AtomicU64,
        step: u64,
    }

    impl TimeSource for SteppingClock {
        fn now_us(&self) -> u64 {
            self.now.fetch_add(self.step, Ordering::SeqCst)
        }

        fn delay_us(&self, us: u64) {
            self.now.fetch_add(us, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_poll_immediate_success() {
        let clock = SteppingClock {
            now: AtomicU64::new(0),
            step: 10,
        };
        assert!(poll_until(&clock, 100, || true).is_ok());
    }

    #[test]
    fn test_poll_times_out() {
        let clock = SteppingClock {
            now: AtomicU64::new(0),
            step: 10,
        };
        let mut checks = 0;
        let result = poll_until(&clock, 100, || {
            checks += 1;
            false
        });
        assert_eq!(result, Err(Error::Timeout));
        // deadline at 100, clock reads 10, 20, ... first read past 100 is 110
        assert_eq!(checks, 11);
    }

    #[test]
    fn test_poll_checks_condition_before_deadline() {
        // A single step overshoots the deadline: the condition still gets one look
        let clock = SteppingClock {
            now: AtomicU64::new(0),
            step: 1_000,
        };
        let mut checks = 0;
        let result = poll_until(&clock, 10, || {
            checks += 1;
            checks == 1
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_deadline_saturates() {
        let clock = SteppingClock {
            now: AtomicU64::new(u64::MAX - 5),
            step: 0,
        };
        let deadline = Deadline::after(&clock, 100);
        assert_eq!(deadline.expires_at_us(), u64::MAX);
        assert!(!deadline.expired(&clock));
    }
}
