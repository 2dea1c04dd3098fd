// # Exporter Trait
//
// Defines the contract by which the change scheduler regenerates the derived
// artifact (for example a hosts file read by a DNS forwarder).
//
// ## Implementations
//
// - Hosts file: `crate::export::HostsFileExporter`
//
// ## Usage
//
// ```rust,ignore
// use hosts_core::Exporter;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let exporter = /* Exporter implementation */;
//
//     // Rewrite only if the rendered content changed
//     exporter.regenerate(false).await?;
//
//     // Rewrite unconditionally
//     exporter.regenerate(true).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for artifact exporters
///
/// The `forced` flag is passed through from the scheduler verbatim. Requests
/// that originate from a store mutation are forced; the startup run and the
/// periodic resync are not. What "forced" means is up to the exporter; the
/// hosts file exporter rewrites unconditionally when forced and only on a
/// content change otherwise.
///
/// # Thread Safety
///
/// The scheduler never calls `regenerate` concurrently with itself, but
/// implementations are shared across tasks and must be `Send + Sync`.
///
/// ## Allowed
/// - Read the record store through
///   [`RecordStore::get_records`](crate::RecordStore::get_records)
/// - Perform I/O on the artifact
///
/// ## Forbidden
/// - Retry internally (the next tick or request is the retry)
/// - Spawn background tasks
/// - Mutate the record store
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Regenerate the artifact
    ///
    /// # Parameters
    ///
    /// - `forced`: Whether the request came from an explicit change
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Artifact is up to date
    /// - `Err(Error)`: Regeneration failed; the scheduler logs it and moves on
    async fn regenerate(&self, forced: bool) -> Result<(), crate::Error>;

    /// Exporter name for logs
    fn exporter_name(&self) -> &'static str;
}
