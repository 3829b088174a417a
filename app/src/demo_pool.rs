//! ABOUTME: Small in-process resource pool used to feed the exporter
//! ABOUTME: Tracks acquire statistics under one lock so snapshots are consistent

use cp_collector::StatSnapshot;
use cp_core::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PoolState {
    idle: u32,
    acquired: u32,
    constructing: u32,
    acquire_count: u64,
    acquire_duration: Duration,
    canceled_acquire_count: u64,
    empty_acquire_count: u64,
}

/// Fixed-capacity pool of opaque resources
#[derive(Debug)]
pub struct DemoPool {
    max_resources: u32,
    construct_time: Duration,
    state: Mutex<PoolState>,
    released: Notify,
}

/// A held resource; returned to the pool on drop
#[derive(Debug)]
pub struct Lease {
    pool: Arc<DemoPool>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.pool.release();
    }
}

enum Slot {
    Idle,
    Construct,
    Full,
}

/// Reserved construction slot; handed back if the acquire is dropped mid-construct
struct Constructing<'a> {
    pool: &'a DemoPool,
    finished: bool,
}

impl Constructing<'_> {
    /// Turn the reserved slot into an acquired resource
    fn finish(mut self) -> Result<()> {
        let pool = self.pool;
        let mut state = pool.lock()?;
        state.constructing -= 1;
        state.acquired += 1;
        self.finished = true;
        Ok(())
    }
}

impl Drop for Constructing<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.pool.lock() {
            Ok(mut state) => state.constructing -= 1,
            Err(e) => tracing::error!(error = %e, "Failed to return construction slot"),
        }
        self.pool.released.notify_one();
    }
}

impl DemoPool {
    pub fn new(max_resources: u32, construct_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            max_resources,
            construct_time,
            state: Mutex::new(PoolState::default()),
            released: Notify::new(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|e| Error::Stat(format!("Failed to lock pool state: {}", e)))
    }

    /// Consistent reading of the pool counters
    pub fn stat(&self) -> Result<StatSnapshot> {
        let state = self.lock()?;
        Ok(StatSnapshot {
            acquire_count: state.acquire_count,
            acquire_duration: state.acquire_duration,
            acquired_resources: state.acquired,
            canceled_acquire_count: state.canceled_acquire_count,
            constructing_resources: state.constructing,
            empty_acquire_count: state.empty_acquire_count,
            idle_resources: state.idle,
            max_resources: self.max_resources,
            total_resources: state.idle + state.acquired + state.constructing,
        })
    }

    /// Acquire a resource, giving up after `timeout`.
    ///
    /// Returns `Ok(None)` when the wait timed out; that counts as a canceled acquire.
    pub async fn acquire(self: &Arc<Self>, timeout: Duration) -> Result<Option<Lease>> {
        let started = Instant::now();
        let mut waited = false;

        loop {
            let slot = {
                let mut state = self.lock()?;
                if state.idle > 0 {
                    state.idle -= 1;
                    state.acquired += 1;
                    Slot::Idle
                } else if state.idle + state.acquired + state.constructing < self.max_resources {
                    state.constructing += 1;
                    Slot::Construct
                } else {
                    Slot::Full
                }
            };

            match slot {
                Slot::Idle => return self.record_acquire(started, waited).map(Some),
                Slot::Construct => {
                    // No idle resource: the caller waits for construction
                    let slot = Constructing {
                        pool: self.as_ref(),
                        finished: false,
                    };
                    tokio::time::sleep(self.construct_time).await;
                    slot.finish()?;
                    return self.record_acquire(started, true).map(Some);
                }
                Slot::Full => {
                    waited = true;
                    let remaining = timeout.saturating_sub(started.elapsed());
                    if tokio::time::timeout(remaining, self.released.notified())
                        .await
                        .is_err()
                    {
                        self.lock()?.canceled_acquire_count += 1;
                        tracing::debug!(?timeout, "Acquire canceled after timeout");
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn record_acquire(self: &Arc<Self>, started: Instant, waited: bool) -> Result<Lease> {
        let mut state = self.lock()?;
        state.acquire_count += 1;
        state.acquire_duration += started.elapsed();
        if waited {
            state.empty_acquire_count += 1;
        }
        Ok(Lease { pool: self.clone() })
    }

    fn release(&self) {
        match self.lock() {
            Ok(mut state) => {
                state.acquired -= 1;
                state.idle += 1;
            }
            Err(e) => tracing::error!(error = %e, "Failed to release resource"),
        }
        self.released.notify_one();
    }
}

/// Drive the pool with `workers` tasks that acquire, hold and release forever
pub fn spawn_workers(pool: &Arc<DemoPool>, workers: u32, hold: Duration) {
    for worker in 0..workers {
        let pool = pool.clone();
        // Stagger hold times so the pool state keeps moving
        let hold = hold * (worker % 3 + 1) / 2;

        tokio::spawn(async move {
            loop {
                match pool.acquire(hold * 2).await {
                    Ok(Some(lease)) => {
                        tokio::time::sleep(hold).await;
                        drop(lease);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(worker, error = %e, "Demo worker stopping");
                        return;
                    }
                }
                tokio::task::yield_now().await;
            }
        });
    }
}
