//! Core traits for the hosts record system
//!
//! - [`SnapshotStore`]: Durable persistence of the record store
//! - [`Exporter`]: Regeneration of the derived artifact

pub mod exporter;
pub mod snapshot_store;

pub use exporter::Exporter;
pub use snapshot_store::{Record, Snapshot, SnapshotStore};
