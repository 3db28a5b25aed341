//! # Simulated Hardware
//!
//! Host-side stand-ins for every collaborator of the power sequencer, used by
//! unit tests across the workspace (feature `mock`).
//!
//! ```text
//!   MockRegs ──write──▶ RegFile ──hook──▶ derived status bits
//!   SimClock            time advances by a fixed step per read
//!   MockClock / MockRegulator / MockInfracfg ──▶ Journal (ordered events)
//! ```

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use spin::Mutex;

use crate::bus::{BusProtRegs, BusProtection, TopAxiSi0};
use crate::clk::{Clock, Regulator};
use crate::error::{Error, Result};
use crate::mmio::RegisterIo;
use crate::time::TimeSource;

// =============================================================================
// REGISTER FILE
// =============================================================================

/// Sparse 32-bit register file; unwritten registers read as zero
#[derive(Debug, Default)]
pub struct RegFile {
    values: BTreeMap<u32, u32>,
}

impl RegFile {
    /// Read a register
    pub fn get(&self, offset: u32) -> u32 {
        self.values.get(&offset).copied().unwrap_or(0)
    }

    /// Write a register
    pub fn set(&mut self, offset: u32, value: u32) {
        self.values.insert(offset, value);
    }

    /// OR bits into a register
    pub fn or(&mut self, offset: u32, bits: u32) {
        let v = self.get(offset);
        self.set(offset, v | bits);
    }

    /// Clear bits in a register
    pub fn and_not(&mut self, offset: u32, bits: u32) {
        let v = self.get(offset);
        self.set(offset, v & !bits);
    }

    /// Make `bits` of `offset` equal to `on`
    pub fn assign(&mut self, offset: u32, bits: u32, on: bool) {
        if on {
            self.or(offset, bits);
        } else {
            self.and_not(offset, bits);
        }
    }
}

type WriteHook = Box<dyn Fn(&mut RegFile, u32, u32) + Send + Sync>;

// =============================================================================
// MOCK REGISTERS
// =============================================================================

/// Register block backed by a [`RegFile`], with an optional hardware model
///
/// The hook runs after every write and may update other registers, e.g.
/// raise a status bit in response to a control bit.
pub struct MockRegs {
    file: Mutex<RegFile>,
    hook: Option<WriteHook>,
    writes: Mutex<Vec<(u32, u32)>>,
}

impl MockRegs {
    /// Plain register file, no hardware model
    pub fn new() -> Self {
        Self {
            file: Mutex::new(RegFile::default()),
            hook: None,
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Register file with a hardware model run after each write
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: Fn(&mut RegFile, u32, u32) + Send + Sync + 'static,
    {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::new()
        }
    }

    /// Read without recording anything
    pub fn peek(&self, offset: u32) -> u32 {
        self.file.lock().get(offset)
    }

    /// Write without recording or running the hook
    pub fn poke(&self, offset: u32, value: u32) {
        self.file.lock().set(offset, value);
    }

    /// Every write issued through [`RegisterIo`], in order
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.writes.lock().clone()
    }

    /// Writes issued to one register, in order
    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.writes
            .lock()
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Forget the write history
    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }
}

impl Default for MockRegs {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for MockRegs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockRegs")
            .field("file", &*self.file.lock())
            .field("hooked", &self.hook.is_some())
            .finish()
    }
}

impl RegisterIo for MockRegs {
    fn read32(&self, offset: u32) -> u32 {
        self.file.lock().get(offset)
    }

    fn write32(&self, offset: u32, value: u32) {
        self.writes.lock().push((offset, value));
        let mut file = self.file.lock();
        file.set(offset, value);
        if let Some(hook) = &self.hook {
            hook(&mut file, offset, value);
        }
    }
}

// =============================================================================
// SIMULATED TIME
// =============================================================================

/// Monotonic clock that advances `step_us` on every read
#[derive(Debug)]
pub struct SimClock {
    now_us: AtomicU64,
    step_us: u64,
    delayed_us: AtomicU64,
}

impl SimClock {
    /// Start at zero, advancing `step_us` per read
    pub fn new(step_us: u64) -> Self {
        Self {
            now_us: AtomicU64::new(0),
            step_us,
            delayed_us: AtomicU64::new(0),
        }
    }

    /// Current time without advancing
    pub fn peek_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    /// Total time spent in `delay_us`
    pub fn delayed_us(&self) -> u64 {
        self.delayed_us.load(Ordering::SeqCst)
    }
}

impl TimeSource for SimClock {
    fn now_us(&self) -> u64 {
        self.now_us.fetch_add(self.step_us, Ordering::SeqCst)
    }

    fn delay_us(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::SeqCst);
        self.delayed_us.fetch_add(us, Ordering::SeqCst);
    }
}

// =============================================================================
// EVENT JOURNAL
// =============================================================================

/// Collaborator call observed by the mocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Clock enabled
    ClockOn(String),
    /// Clock disabled
    ClockOff(String),
    /// Supply enabled
    SupplyOn(String),
    /// Supply disabled
    SupplyOff(String),
    /// Bus protection set on a channel (status offset, mask)
    BusSet(u32, u32),
    /// Bus protection cleared on a channel (status offset, mask)
    BusClear(u32, u32),
    /// SI0 register update (offset, mask, value)
    Si0(u32, u32, u32),
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    /// Snapshot of all events
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    /// Number of occurrences of `event`
    pub fn count(&self, event: &Event) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    /// Drop recorded events
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// =============================================================================
// MOCK CLOCK / REGULATOR
// =============================================================================

/// Counting clock that can be told to fail its n-th enable
#[derive(Debug)]
pub struct MockClock {
    name: String,
    journal: Journal,
    attempts: AtomicU32,
    enables: AtomicU32,
    disables: AtomicU32,
    fail_on: Option<u32>,
}

impl MockClock {
    /// Clock that always enables
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            attempts: AtomicU32::new(0),
            enables: AtomicU32::new(0),
            disables: AtomicU32::new(0),
            fail_on: None,
        }
    }

    /// Fail the `nth` enable attempt (1-based)
    pub fn failing_on(mut self, nth: u32) -> Self {
        self.fail_on = Some(nth);
        self
    }

    /// Successful enable count
    pub fn enables(&self) -> u32 {
        self.enables.load(Ordering::SeqCst)
    }

    /// Disable count
    pub fn disables(&self) -> u32 {
        self.disables.load(Ordering::SeqCst)
    }

    /// Enabled more often than disabled
    pub fn is_enabled(&self) -> bool {
        self.enables() > self.disables()
    }
}

impl Clock for MockClock {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare_enable(&self) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(attempt) {
            return Err(Error::ClockFailed);
        }
        self.enables.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Event::ClockOn(self.name.clone()));
        Ok(())
    }

    fn disable_unprepare(&self) {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Event::ClockOff(self.name.clone()));
    }
}

/// Counting regulator
#[derive(Debug)]
pub struct MockRegulator {
    name: String,
    journal: Journal,
    enables: AtomicU32,
    disables: AtomicU32,
    fail: bool,
}

impl MockRegulator {
    /// Regulator that always enables
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            enables: AtomicU32::new(0),
            disables: AtomicU32::new(0),
            fail: false,
        }
    }

    /// Regulator whose enable always fails
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Successful enable count
    pub fn enables(&self) -> u32 {
        self.enables.load(Ordering::SeqCst)
    }

    /// Disable count
    pub fn disables(&self) -> u32 {
        self.disables.load(Ordering::SeqCst)
    }
}

impl Regulator for MockRegulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&self) -> Result<()> {
        if self.fail {
            return Err(Error::RegulatorFailed);
        }
        self.enables.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Event::SupplyOn(self.name.clone()));
        Ok(())
    }

    fn disable(&self) {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Event::SupplyOff(self.name.clone()));
    }
}

// =============================================================================
// MOCK INFRACFG
// =============================================================================

/// Bus protection that records requests and can reject one mask
#[derive(Debug)]
pub struct MockInfracfg {
    journal: Journal,
    fail_mask: Option<u32>,
}

impl MockInfracfg {
    /// Always acknowledges
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail_mask: None,
        }
    }

    /// Time out whenever `mask` is set or cleared
    pub fn failing_mask(mut self, mask: u32) -> Self {
        self.fail_mask = Some(mask);
        self
    }
}

impl BusProtection for MockInfracfg {
    fn set_bus_protection(&self, regs: &BusProtRegs, mask: u32) -> Result<()> {
        self.journal.push(Event::BusSet(regs.sta_ofs, mask));
        if self.fail_mask == Some(mask) {
            return Err(Error::Timeout);
        }
        Ok(())
    }

    fn clear_bus_protection(&self, regs: &BusProtRegs, mask: u32) -> Result<()> {
        self.journal.push(Event::BusClear(regs.sta_ofs, mask));
        if self.fail_mask == Some(mask) {
            return Err(Error::Timeout);
        }
        Ok(())
    }
}

impl TopAxiSi0 for MockInfracfg {
    fn update_si0(&self, offs: u32, mask: u32, value: u32) {
        self.journal.push(Event::Si0(offs, mask, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_derives_status() {
        let regs = MockRegs::with_hook(|file, offset, value| {
            if offset == 0x0 {
                file.assign(0x10, 0x1, value & 0x4 != 0);
            }
        });

        regs.write32(0x0, 0x4);
        assert_eq!(regs.read32(0x10), 0x1);
        regs.write32(0x0, 0x0);
        assert_eq!(regs.read32(0x10), 0x0);
        assert_eq!(regs.writes_to(0x0), [0x4, 0x0]);
    }

    #[test]
    fn test_clock_fails_on_nth_enable() {
        let journal = Journal::new();
        let clk = MockClock::new("mm", &journal).failing_on(2);

        assert!(clk.prepare_enable().is_ok());
        assert_eq!(clk.prepare_enable(), Err(Error::ClockFailed));
        assert_eq!(clk.enables(), 1);
        assert_eq!(journal.count(&Event::ClockOn("mm".into())), 1);
    }

    #[test]
    fn test_sim_clock_steps() {
        let clock = SimClock::new(5);
        assert_eq!(clock.now_us(), 0);
        assert_eq!(clock.now_us(), 5);
        clock.delay_us(1);
        assert_eq!(clock.peek_us(), 11);
        assert_eq!(clock.delayed_us(), 1);
    }
}
