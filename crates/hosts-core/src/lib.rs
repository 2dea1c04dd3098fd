// # hosts-core
//
// Core library for the hosts record API.
//
// ## Architecture Overview
//
// This library keeps an authoritative set of hostname -> address records and
// a derived hosts file eventually consistent with it:
// - **validate**: Pure checks for record IDs, names and targets
// - **SnapshotStore**: Trait for durable persistence of the whole store
// - **RecordStore**: Serialized CRUD over unique records, persisted on every
//   mutation
// - **ChangeScheduler**: Debounced, periodic invocation of an Exporter
// - **HostsFileExporter**: Exporter writing a hosts file from the store
//
// ## Control Flow
//
// 1. A caller mutates the RecordStore
// 2. On success it calls RegenerationTrigger::request()
// 3. The ChangeScheduler eventually runs the Exporter
// 4. The Exporter reads the current records via RecordStore::get_records()
//
// The store does not notify the scheduler itself; wiring the two together
// is up to the request layer.

pub mod config;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use config::{ExportConfig, HostsConfig, SchedulerConfig, StoreConfig};
pub use error::{Error, ErrorClass, Result};
pub use export::HostsFileExporter;
pub use scheduler::{ChangeScheduler, RegenerationReason, RegenerationTrigger, SchedulerEvent};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore};
pub use store::RecordStore;
pub use traits::{Exporter, Record, Snapshot, SnapshotStore};
