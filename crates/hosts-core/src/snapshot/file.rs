// # File Snapshot Store
//
// File-based implementation of SnapshotStore.
//
// ## Durability
//
// - Full marshal first: the snapshot is serialized in memory before the
//   target is touched
// - Atomic replace: written to a sibling `.tmp` file, flushed, then renamed
// - No silent recovery: a corrupt file fails the load, the process must not
//   start on top of it
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "master-token": "9f86d081884c7d65...",
//   "records": [
//     {
//       "id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
//       "name": "router",
//       "target": "192.0.2.1"
//     }
//   ]
// }
// ```

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::snapshot_store::{Snapshot, SnapshotStore};

/// Snapshot file format version
const SNAPSHOT_FILE_VERSION: &str = "1.0";

/// File-based snapshot store
///
/// # Example
///
/// ```rust,no_run
/// use hosts_core::snapshot::FileSnapshotStore;
/// use hosts_core::traits::SnapshotStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSnapshotStore::new("/var/lib/hostsd/hosts-api.db");
///
///     // Missing file loads as an empty snapshot
///     let snapshot = store.load().await?;
///
///     // Written to a temp file, then renamed over the target
///     store.save(&snapshot).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

/// Serialized form written to disk
#[derive(serde::Serialize)]
struct SnapshotFileRef<'a> {
    version: &'a str,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// Deserialized form read from disk
///
/// `version` is optional so files written before it existed still load.
#[derive(serde::Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(flatten)]
    snapshot: Snapshot,
}

impl FileSnapshotStore {
    /// Create a store backed by `path`
    ///
    /// Nothing is read or created until the first `load` or `save`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_parent_dir(&self) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage_io(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Snapshot, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Snapshot file does not exist: {}", self.path.display());
                return Ok(Snapshot::new());
            }
            Err(e) => {
                return Err(Error::storage_io(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let file: SnapshotFile = serde_json::from_str(&content).map_err(|e| {
            Error::corrupt_snapshot(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        if let Some(version) = file.version.as_deref()
            && version != SNAPSHOT_FILE_VERSION
        {
            tracing::warn!(
                "Snapshot file version mismatch: expected {}, got {}. Loading anyway.",
                SNAPSHOT_FILE_VERSION,
                version
            );
        }

        let mut snapshot = file.snapshot;
        snapshot.master_fingerprint = snapshot.master_fingerprint.filter(|f| !f.is_empty());

        tracing::debug!(
            "Loaded snapshot from {}: {} records",
            self.path.display(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&SnapshotFileRef {
            version: SNAPSHOT_FILE_VERSION,
            snapshot,
        })
        .map_err(|e| Error::storage_io(format!("failed to serialize snapshot: {}", e)))?;

        self.ensure_parent_dir().await?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage_io(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::storage_io(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::storage_io(format!(
                    "failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage_io(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Snapshot written to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
