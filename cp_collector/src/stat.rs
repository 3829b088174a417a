//! ABOUTME: Pool stat snapshot contract and the provider capability
//! ABOUTME: The only coupling point between the collector and a pool implementation

use cp_core::Result;
use std::time::Duration;

/// Read-only view of pool state at one instant.
///
/// Any type exposing these accessors can be handed to the collector,
/// whatever pool implementation it comes from.
pub trait PoolStat {
    /// Cumulative count of successful acquires
    fn acquire_count(&self) -> u64;
    /// Total wait time of all successful acquires
    fn acquire_duration(&self) -> Duration;
    /// Resources currently held by callers
    fn acquired_resources(&self) -> u32;
    /// Acquires aborted by caller cancellation
    fn canceled_acquire_count(&self) -> u64;
    /// Resources with construction in progress
    fn constructing_resources(&self) -> u32;
    /// Successful acquires that waited because the pool was empty
    fn empty_acquire_count(&self) -> u64;
    /// Resources available for immediate acquisition
    fn idle_resources(&self) -> u32;
    /// Configured pool capacity
    fn max_resources(&self) -> u32;
    /// Sum of acquired, constructing and idle resources
    fn total_resources(&self) -> u32;
}

/// Immutable copy of a [`PoolStat`] reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatSnapshot {
    pub acquire_count: u64,
    pub acquire_duration: Duration,
    pub acquired_resources: u32,
    pub canceled_acquire_count: u64,
    pub constructing_resources: u32,
    pub empty_acquire_count: u64,
    pub idle_resources: u32,
    pub max_resources: u32,
    pub total_resources: u32,
}

impl StatSnapshot {
    /// Freeze every accessor of `stat` into a single value
    pub fn capture<S: PoolStat + ?Sized>(stat: &S) -> Self {
        Self {
            acquire_count: stat.acquire_count(),
            acquire_duration: stat.acquire_duration(),
            acquired_resources: stat.acquired_resources(),
            canceled_acquire_count: stat.canceled_acquire_count(),
            constructing_resources: stat.constructing_resources(),
            empty_acquire_count: stat.empty_acquire_count(),
            idle_resources: stat.idle_resources(),
            max_resources: stat.max_resources(),
            total_resources: stat.total_resources(),
        }
    }

    /// Acquire wait time as whole nanoseconds, saturating at `u64::MAX`
    pub fn acquire_duration_nanos(&self) -> u64 {
        u64::try_from(self.acquire_duration.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl PoolStat for StatSnapshot {
    fn acquire_count(&self) -> u64 {
        self.acquire_count
    }

    fn acquire_duration(&self) -> Duration {
        self.acquire_duration
    }

    fn acquired_resources(&self) -> u32 {
        self.acquired_resources
    }

    fn canceled_acquire_count(&self) -> u64 {
        self.canceled_acquire_count
    }

    fn constructing_resources(&self) -> u32 {
        self.constructing_resources
    }

    fn empty_acquire_count(&self) -> u64 {
        self.empty_acquire_count
    }

    fn idle_resources(&self) -> u32 {
        self.idle_resources
    }

    fn max_resources(&self) -> u32 {
        self.max_resources
    }

    fn total_resources(&self) -> u32 {
        self.total_resources
    }
}

/// Produces a fresh stat reading on demand.
///
/// Implementations are called from the scrape path and must be safe to
/// call concurrently with the pool's own acquire/release traffic. The
/// returned stat must be internally consistent.
pub trait StatProvider: Send + Sync {
    type Stat: PoolStat;

    fn stat(&self) -> Result<Self::Stat>;
}

impl<F, S> StatProvider for F
where
    F: Fn() -> Result<S> + Send + Sync,
    S: PoolStat,
{
    type Stat = S;

    fn stat(&self) -> Result<S> {
        self()
    }
}
