//! Logical time as seen by the contract.
//!
//! Deadlines are counted in ticks of a monotonic logical clock (block height
//! on a real ledger), never wall-clock time, so every replica executing the
//! same calls reaches the same outcome.

use core::cell::Cell;

pub trait Clock {
    /// Current logical time. Must never decrease.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Clock that only moves when told to. Stands in for the ledger's block
/// height in tests and simulations. Not `Sync`: calls are serialized by
/// the ledger, so one thread owns the clock.
#[derive(Debug, Default)]
pub struct ManualClock(Cell<u64>);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(Cell::new(start))
    }

    /// Move time forward by `ticks`, saturating at `u64::MAX`.
    pub fn advance(&self, ticks: u64) -> u64 {
        let now = self.now().saturating_add(ticks);
        self.0.set(now);
        now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.get()
    }
}
