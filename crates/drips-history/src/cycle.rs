//! Settlement cycles.
//!
//! The contract splits time into fixed windows of `cycle_secs` seconds,
//! numbered `timestamp / cycle_secs + 1`. Funds streamed inside a window
//! become receivable once it closes; until then they can only be squeezed.

use alloy_primitives::U256;
use drips_core::AMT_PER_SEC_MULTIPLIER;
use thiserror::Error;

/// One week, the cycle length of the mainnet deployments.
pub const DEFAULT_CYCLE_SECS: u64 = 604_800;

/// Invalid cycle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CycleError {
    /// The contract requires cycles longer than one second.
    #[error("cycle length must be greater than 1 second, got {cycle_secs}")]
    TooShort {
        /// Rejected length.
        cycle_secs: u64,
    },
}

/// Where the currently open cycle begins.
pub trait CycleBoundary {
    /// Start of the cycle containing `now`.
    fn cycle_start(&self, now: u64) -> u64;

    /// Whether `timestamp` lies in the open cycle: strictly after its start
    /// and not in the future.
    fn is_in_open_cycle(&self, timestamp: u64, now: u64) -> bool {
        self.cycle_start(now) < timestamp && timestamp <= now
    }
}

/// Fixed-length cycles as deployed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CycleConfig {
    cycle_secs: u64,
}

impl CycleConfig {
    /// Validate and wrap a cycle length.
    pub const fn new(cycle_secs: u64) -> Result<Self, CycleError> {
        if cycle_secs <= 1 {
            return Err(CycleError::TooShort { cycle_secs });
        }
        Ok(Self { cycle_secs })
    }

    /// Cycle length in seconds.
    #[inline]
    #[must_use]
    pub const fn cycle_secs(&self) -> u64 {
        self.cycle_secs
    }

    /// Contract cycle number of `timestamp`.
    #[inline]
    #[must_use]
    pub const fn cycle_of(&self, timestamp: u64) -> u64 {
        timestamp / self.cycle_secs + 1
    }

    /// Smallest rate that streams at least one token unit per cycle.
    #[must_use]
    pub fn min_amount_per_sec(&self) -> U256 {
        U256::from(AMT_PER_SEC_MULTIPLIER.div_ceil(self.cycle_secs))
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_secs: DEFAULT_CYCLE_SECS,
        }
    }
}

impl CycleBoundary for CycleConfig {
    #[inline]
    fn cycle_start(&self, now: u64) -> u64 {
        now - now % self.cycle_secs
    }
}
