//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the core calls
//! its collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use hosts_core::error::{Error, Result};
use hosts_core::traits::{Exporter, Snapshot, SnapshotStore};
use hosts_core::{MemorySnapshotStore, RecordStore, SchedulerConfig, StoreConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An exporter that records every call
pub struct MockExporter {
    /// Forced flag of each call, in order
    calls: Arc<Mutex<Vec<bool>>>,
    /// Calls currently executing
    in_flight: Arc<AtomicUsize>,
    /// Highest observed concurrency
    max_in_flight: Arc<AtomicUsize>,
    /// Simulated work per call
    delay: Duration,
    /// Whether calls fail
    fail: Arc<AtomicBool>,
}

impl MockExporter {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make each call take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Create a MockExporter that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            in_flight: Arc::clone(&other.in_flight),
            max_in_flight: Arc::clone(&other.max_in_flight),
            delay: other.delay,
            fail: Arc::clone(&other.fail),
        }
    }

    /// Number of completed or started calls
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Forced flag of each call
    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls seen
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Make subsequent calls fail or succeed
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Exporter for MockExporter {
    async fn regenerate(&self, forced: bool) -> Result<()> {
        self.calls.lock().unwrap().push(forced);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            Err(Error::export("simulated failure"))
        } else {
            Ok(())
        }
    }

    fn exporter_name(&self) -> &'static str {
        "mock"
    }
}

/// A snapshot store whose saves can be made to fail
pub struct FlakySnapshotStore {
    inner: MemorySnapshotStore,
    fail_saves: Arc<AtomicBool>,
    failed_saves: Arc<AtomicUsize>,
}

impl FlakySnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: MemorySnapshotStore::new(),
            fail_saves: Arc::new(AtomicBool::new(false)),
            failed_saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a FlakySnapshotStore that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            fail_saves: Arc::clone(&other.fail_saves),
            failed_saves: Arc::clone(&other.failed_saves),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn failed_saves(&self) -> usize {
        self.failed_saves.load(Ordering::SeqCst)
    }

    /// What actually reached "disk"
    pub async fn persisted(&self) -> Option<Snapshot> {
        self.inner.saved().await
    }
}

#[async_trait]
impl SnapshotStore for FlakySnapshotStore {
    async fn load(&self) -> Result<Snapshot> {
        self.inner.load().await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            self.failed_saves.fetch_add(1, Ordering::SeqCst);
            return Err(Error::storage_io("simulated disk failure"));
        }
        self.inner.save(snapshot).await
    }

    fn describe(&self) -> String {
        "flaky".to_string()
    }
}

/// Open an empty record store backed by memory
pub async fn memory_store() -> RecordStore {
    RecordStore::open(Box::new(MemorySnapshotStore::new()), StoreConfig::default())
        .await
        .expect("memory store opens")
}

/// Scheduler configuration with a given resync interval
pub fn scheduler_config(resync_secs: u64) -> SchedulerConfig {
    SchedulerConfig {
        resync_interval_secs: resync_secs,
        event_channel_capacity: 100,
    }
}
