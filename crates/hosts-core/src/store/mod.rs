//! Authoritative record store
//!
//! The [`RecordStore`] owns the in-memory snapshot (master fingerprint plus
//! every record) and writes it through a [`SnapshotStore`] after each
//! mutation.
//!
//! ## Locking
//!
//! A single async mutex covers the snapshot *and* the persist call. Every
//! operation is serialized with respect to every other one; there is no
//! reader/writer split. A slow disk therefore stalls the whole store, which
//! is acceptable for administrative call volumes.
//!
//! ## Persist failures
//!
//! Memory is updated first, then the snapshot is saved. If the save fails the
//! error is returned to the caller and the in-memory state stays ahead of
//! disk until the next successful save. Nothing is rolled back.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::fingerprint;
use crate::snapshot::FileSnapshotStore;
use crate::traits::{Record, Snapshot, SnapshotStore};
use crate::validate::{validate_id, validate_name, validate_target};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Source of candidate record IDs
pub type IdSource = Box<dyn Fn() -> Uuid + Send + Sync>;

/// Concurrency-safe CRUD over unique, validated records
///
/// Constructed once at startup and shared (usually behind an `Arc`) with
/// whatever serves requests and with the exporter.
pub struct RecordStore {
    /// Durable backend
    snapshots: Box<dyn SnapshotStore>,

    /// Authoritative state
    state: Mutex<Snapshot>,

    /// Candidate ID generator
    id_source: IdSource,

    /// Cap on candidates drawn for one new record
    max_id_attempts: usize,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("snapshots", &self.snapshots.describe())
            .field("max_id_attempts", &self.max_id_attempts)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Load a store from `snapshots`
    ///
    /// A missing snapshot yields an empty store. Read and parse failures are
    /// returned as-is; the caller must not continue without a store.
    pub async fn open(snapshots: Box<dyn SnapshotStore>, config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let snapshot = snapshots.load().await?;
        info!(
            "Opened record store ({}): {} records",
            snapshots.describe(),
            snapshot.len()
        );

        Ok(Self {
            snapshots,
            state: Mutex::new(snapshot),
            id_source: Box::new(Uuid::new_v4),
            max_id_attempts: config.max_id_attempts,
        })
    }

    /// Load a store backed by the snapshot file at `config.path`
    pub async fn open_file(config: StoreConfig) -> Result<Self> {
        let snapshots = FileSnapshotStore::new(&config.path);
        Self::open(Box::new(snapshots), config).await
    }

    /// Replace the ID generator
    pub fn with_id_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Uuid + Send + Sync + 'static,
    {
        self.id_source = Box::new(source);
        self
    }

    /// Generate a new master secret
    ///
    /// Only the fingerprint is kept; the returned plaintext cannot be
    /// recovered later. The change is in memory only until [`save`](Self::save).
    pub async fn generate_master_secret(&self) -> String {
        let secret = fingerprint::generate_secret();

        let mut state = self.state.lock().await;
        state.master_fingerprint = Some(fingerprint::string_fingerprint(&secret));
        info!("Generated a new master secret");

        secret
    }

    /// Fingerprint of the current master secret
    pub async fn master_fingerprint(&self) -> Option<String> {
        self.state.lock().await.master_fingerprint.clone()
    }

    /// Check a presented secret against the stored fingerprint
    pub async fn verify_master_secret(&self, secret: &str) -> bool {
        if secret.is_empty() {
            return false;
        }

        let presented = fingerprint::string_fingerprint(secret);
        let state = self.state.lock().await;
        state.master_fingerprint.as_deref() == Some(presented.as_str())
    }

    /// Get a record by ID
    pub async fn get_record(&self, id: &str) -> Result<Record> {
        let id = validate_id(id)?;

        let state = self.state.lock().await;
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(id.to_string()))
    }

    /// Add a record
    ///
    /// Fails with [`Error::AlreadyExists`] if another record has `name`.
    pub async fn add_record(&self, name: &str, target: &str) -> Result<Record> {
        validate_name(name)?;
        validate_target(target)?;

        let mut state = self.state.lock().await;

        if state.records.iter().any(|r| r.name == name) {
            debug!("Rejected duplicate record name {}", name);
            return Err(Error::already_exists(name));
        }

        let record = Record {
            id: self.allocate_id(&state.records)?,
            name: name.to_string(),
            target: target.to_string(),
        };
        state.records.push(record.clone());

        self.persist(&state).await?;
        info!("Added record {} -> {} ({})", record.name, record.target, record.id);

        Ok(record)
    }

    /// Replace the name and target of an existing record
    ///
    /// Keeping the record's own name is allowed; taking another record's name
    /// is not.
    pub async fn update_record(&self, id: &str, name: &str, target: &str) -> Result<Record> {
        let id = validate_id(id)?;
        validate_name(name)?;
        validate_target(target)?;

        let mut state = self.state.lock().await;

        let index = state
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        if state.records.iter().any(|r| r.name == name && r.id != id) {
            debug!("Rejected rename of {} to taken name {}", id, name);
            return Err(Error::already_exists(name));
        }

        let record = &mut state.records[index];
        record.name = name.to_string();
        record.target = target.to_string();
        let updated = record.clone();

        self.persist(&state).await?;
        info!("Updated record {} -> {} ({})", updated.name, updated.target, updated.id);

        Ok(updated)
    }

    /// Delete a record, keeping the order of the others
    pub async fn delete_record(&self, id: &str) -> Result<()> {
        let id = validate_id(id)?;

        let mut state = self.state.lock().await;

        let index = state
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;
        let removed = state.records.remove(index);

        self.persist(&state).await?;
        info!("Deleted record {} ({})", removed.name, removed.id);

        Ok(())
    }

    /// Copy of every record, in insertion order
    pub async fn get_records(&self) -> Vec<Record> {
        self.state.lock().await.records.clone()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.is_empty()
    }

    /// Persist the current state
    pub async fn save(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.persist(&state).await
    }

    /// Draw IDs until one is unused
    fn allocate_id(&self, records: &[Record]) -> Result<Uuid> {
        for attempt in 1..=self.max_id_attempts {
            let candidate = (self.id_source)();
            if !records.iter().any(|r| r.id == candidate) {
                return Ok(candidate);
            }
            debug!("Record ID collision on attempt {}: {}", attempt, candidate);
        }

        error!(
            "No unique record ID after {} attempts",
            self.max_id_attempts
        );
        Err(Error::IdExhausted {
            attempts: self.max_id_attempts,
        })
    }

    /// Save while the caller holds the lock
    async fn persist(&self, state: &Snapshot) -> Result<()> {
        self.snapshots.save(state).await.map_err(|e| {
            error!(
                "Failed to persist record store ({}), memory is ahead of disk: {}",
                self.snapshots.describe(),
                e
            );
            e
        })
    }
}
