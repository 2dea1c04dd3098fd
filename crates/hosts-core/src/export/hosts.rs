// # Hosts File Exporter
//
// Renders the record store as a hosts file, one `target<TAB>name` line per
// record in store order, behind a generated-file header.
//
// ## Forced vs. resync
//
// - Forced (a mutation happened): always rewrite
// - Not forced (startup, periodic resync): rewrite only if the rendered
//   content fingerprint differs from the file on disk

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::error::{Error, Result};
use crate::fingerprint::{bytes_fingerprint, file_fingerprint};
use crate::store::RecordStore;
use crate::traits::{Exporter, Record};

const HEADER: &str = "# Generated by hostsd. Manual edits are overwritten.\n";

/// Exporter writing the records to a hosts file
#[derive(Debug)]
pub struct HostsFileExporter {
    store: Arc<RecordStore>,
    path: PathBuf,
}

impl HostsFileExporter {
    /// Create an exporter writing to `path`
    pub fn new<P: AsRef<Path>>(store: Arc<RecordStore>, path: P) -> Self {
        Self {
            store,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the hosts file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render records in hosts file format
    pub fn render(records: &[Record]) -> String {
        let mut content = String::from(HEADER);
        for record in records {
            content.push_str(&record.target);
            content.push('\t');
            content.push_str(&record.name);
            content.push('\n');
        }
        content
    }

    /// Whether the file on disk already holds `content`
    async fn is_current(&self, content: &str) -> Result<bool> {
        match file_fingerprint(&self.path).await {
            Ok(existing) => Ok(existing == bytes_fingerprint(content.as_bytes())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::export(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write(&self, content: &str) -> Result<()> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        let temp_path = self.path.with_file_name(name);

        fs::write(&temp_path, content).await.map_err(|e| {
            Error::export(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::export(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl Exporter for HostsFileExporter {
    async fn regenerate(&self, forced: bool) -> Result<()> {
        let records = self.store.get_records().await;
        let content = Self::render(&records);

        if !forced && self.is_current(&content).await? {
            tracing::debug!("Hosts file {} is up to date", self.path.display());
            return Ok(());
        }

        self.write(&content).await?;
        tracing::info!(
            "Wrote {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn exporter_name(&self) -> &'static str {
        "hosts-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::snapshot::MemorySnapshotStore;
    use std::time::SystemTime;
    use tempfile::tempdir;

    async fn store_with(records: &[(&str, &str)]) -> Arc<RecordStore> {
        let store = RecordStore::open(Box::new(MemorySnapshotStore::new()), StoreConfig::default())
            .await
            .unwrap();
        for (name, target) in records {
            store.add_record(name, target).await.unwrap();
        }
        Arc::new(store)
    }

    async fn modified(path: &Path) -> SystemTime {
        fs::metadata(path).await.unwrap().modified().unwrap()
    }

    #[test]
    fn test_render() {
        let records = vec![Record {
            id: uuid::Uuid::new_v4(),
            name: "router".to_string(),
            target: "192.0.2.1".to_string(),
        }];

        let content = HostsFileExporter::render(&records);
        assert!(content.starts_with('#'));
        assert!(content.ends_with("192.0.2.1\trouter\n"));
        assert_eq!(HostsFileExporter::render(&[]), HEADER);
    }

    #[tokio::test]
    async fn test_first_run_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        let store = store_with(&[("router", "192.0.2.1"), ("nas", "2001:db8::2")]).await;
        let exporter = HostsFileExporter::new(store, &path);

        exporter.regenerate(false).await.unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("192.0.2.1\trouter\n"));
        assert!(content.contains("2001:db8::2\tnas\n"));
    }

    #[tokio::test]
    async fn test_unforced_run_skips_unchanged_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        let store = store_with(&[("router", "192.0.2.1")]).await;
        let exporter = HostsFileExporter::new(store, &path);

        exporter.regenerate(true).await.unwrap();
        let before = modified(&path).await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        exporter.regenerate(false).await.unwrap();
        assert_eq!(modified(&path).await, before);

        // Hand edits are reverted by the next unforced run
        fs::write(&path, "edited\n").await.unwrap();
        exporter.regenerate(false).await.unwrap();
        assert!(fs::read_to_string(&path).await.unwrap().contains("router"));
    }

    #[tokio::test]
    async fn test_forced_run_picks_up_mutations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        let store = store_with(&[("router", "192.0.2.1")]).await;
        let exporter = HostsFileExporter::new(Arc::clone(&store), &path);

        exporter.regenerate(false).await.unwrap();
        store.add_record("printer", "10.0.0.7").await.unwrap();
        exporter.regenerate(true).await.unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("10.0.0.7\tprinter\n"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_export_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("hosts");
        let exporter = HostsFileExporter::new(store_with(&[]).await, &path);

        let err = exporter.regenerate(true).await.unwrap_err();
        assert!(matches!(err, Error::Export(_)), "got {err:?}");
    }
}
