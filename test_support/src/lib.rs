//! ABOUTME: Shared testing utilities and provider fixtures
//! ABOUTME: Canned pool snapshots and stat providers for all crates

use cp_collector::{StatProvider, StatSnapshot};
use cp_core::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Snapshot with a distinct value in every field
pub fn example_snapshot() -> StatSnapshot {
    StatSnapshot {
        acquire_count: 4,
        acquire_duration: Duration::from_nanos(8),
        acquired_resources: 15,
        canceled_acquire_count: 16,
        constructing_resources: 23,
        empty_acquire_count: 42,
        idle_resources: 24,
        max_resources: 32,
        total_resources: 61,
    }
}

/// Snapshot satisfying `total == acquired + constructing + idle`
pub fn consistent_snapshot(acquired: u32, constructing: u32, idle: u32, max: u32) -> StatSnapshot {
    StatSnapshot {
        acquired_resources: acquired,
        constructing_resources: constructing,
        idle_resources: idle,
        total_resources: acquired + constructing + idle,
        max_resources: max,
        ..Default::default()
    }
}

/// Always returns the same snapshot and counts calls
#[derive(Debug)]
pub struct FixedProvider {
    snapshot: StatSnapshot,
    calls: AtomicUsize,
}

impl FixedProvider {
    pub fn new(snapshot: StatSnapshot) -> Self {
        Self {
            snapshot,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatProvider for FixedProvider {
    type Stat = StatSnapshot;

    fn stat(&self) -> Result<StatSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot)
    }
}

/// Hands out queued snapshots in order, then fails once exhausted
#[derive(Debug, Default)]
pub struct SequenceProvider {
    queue: Mutex<VecDeque<StatSnapshot>>,
    calls: AtomicUsize,
}

impl SequenceProvider {
    pub fn new(snapshots: impl IntoIterator<Item = StatSnapshot>) -> Self {
        Self {
            queue: Mutex::new(snapshots.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatProvider for SequenceProvider {
    type Stat = StatSnapshot;

    fn stat(&self) -> Result<StatSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self
            .queue
            .lock()
            .map_err(|e| Error::Stat(format!("Failed to lock snapshot queue: {}", e)))?;
        queue
            .pop_front()
            .ok_or_else(|| Error::Stat("snapshot sequence exhausted".to_string()))
    }
}

/// Always fails with the given message
#[derive(Debug)]
pub struct FailingProvider {
    message: String,
}

impl FailingProvider {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl StatProvider for FailingProvider {
    type Stat = StatSnapshot;

    fn stat(&self) -> Result<StatSnapshot> {
        Err(Error::Stat(self.message.clone()))
    }
}
