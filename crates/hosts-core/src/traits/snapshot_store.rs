// # Snapshot Store Trait
//
// Defines the interface for durable persistence of the record store.
//
// ## Purpose
//
// The record store keeps its authoritative state in memory and writes the
// full snapshot (master fingerprint + every record) after each mutation.
// A snapshot store owns the encoding and the storage medium.
//
// ## Implementations
//
// - File-based: pretty JSON, write-then-rename
// - Memory: keeps the last saved snapshot (embedding, tests)

use async_trait::async_trait;
use uuid::Uuid;

/// A name-to-address binding
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    /// Store-assigned identifier, immutable after creation
    pub id: Uuid,
    /// Unique hostname
    pub name: String,
    /// IPv4 or IPv6 literal, kept as supplied
    pub target: String,
}

/// Full persisted state of a record store
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Fingerprint of the master secret, if one was generated
    #[serde(
        rename = "master-token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub master_fingerprint: Option<String>,

    /// Records in insertion order
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trait for snapshot persistence
///
/// # Thread Safety
///
/// The record store serializes every call behind its own lock, so
/// implementations never see concurrent `save` calls from one store.
///
/// ## Implementation Guidelines
///
/// - **All-or-nothing load**: a missing source is an empty snapshot, an
///   unreadable one is [`StorageIo`](crate::Error::StorageIo), an
///   unparseable one is [`CorruptSnapshot`](crate::Error::CorruptSnapshot)
/// - **Full save**: marshal the whole snapshot in memory before touching
///   the medium
/// - **No background tasks**
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(Snapshot)`: The stored snapshot, or an empty one if none exists
    /// - `Err(Error)`: Read failure or corrupt content
    async fn load(&self) -> Result<Snapshot, crate::Error>;

    /// Replace the persisted snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Snapshot is durable
    /// - `Err(Error)`: Storage error
    async fn save(&self, snapshot: &Snapshot) -> Result<(), crate::Error>;

    /// Short description for logs
    fn describe(&self) -> String;
}
