// # hostsd - hosts file daemon
//
// Thin integration layer over `hosts-core`. Record validation, persistence
// and regeneration scheduling all live in the library.
//
// The hostsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Opening the record store
// 4. Running the change scheduler with the hosts file exporter
//
// ## Commands
//
// - `hostsd generate-token`: create a new master secret, persist its
//   fingerprint and print the secret once
// - `hostsd serve`: keep the hosts file in sync until SIGINT/SIGTERM
//
// ## Configuration
//
// - `HOSTSD_DB_PATH`: Path of the snapshot file (default `hosts-api.db`)
// - `HOSTSD_HOSTS_FILE`: Path of the generated hosts file (default `hosts`)
// - `HOSTSD_RESYNC_INTERVAL_SECS`: Periodic resync interval (default 300)
// - `HOSTSD_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export HOSTSD_DB_PATH=/var/lib/hostsd/hosts-api.db
// export HOSTSD_HOSTS_FILE=/etc/hosts.d/managed
//
// hostsd generate-token
// hostsd serve
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hosts_core::{
    ChangeScheduler, ExportConfig, Exporter, HostsConfig, HostsFileExporter, RecordStore,
    RegenerationTrigger, SchedulerConfig, SchedulerEvent, StoreConfig,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the scheduler gets to finish an in-flight export after shutdown
const SCHEDULER_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum HostsdExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<HostsdExitCode> for ExitCode {
    fn from(code: HostsdExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "hostsd", version, about = "Keep a hosts file in sync with the record store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new master secret and print it once
    GenerateToken,
    /// Run the regeneration loop until SIGINT/SIGTERM
    Serve,
}

/// Application configuration
struct Config {
    db_path: PathBuf,
    hosts_file: PathBuf,
    resync_interval_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let resync_interval_secs = match env::var("HOSTSD_RESYNC_INTERVAL_SECS") {
            Ok(raw) => raw.trim().parse().with_context(|| {
                format!("HOSTSD_RESYNC_INTERVAL_SECS must be a number of seconds. Got: {raw}")
            })?,
            Err(_) => 300,
        };

        Ok(Self {
            db_path: env::var_os("HOSTSD_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("hosts-api.db")),
            hosts_file: env::var_os("HOSTSD_HOSTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("hosts")),
            resync_interval_secs,
            log_level: env::var("HOSTSD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.db_path.as_os_str().is_empty() {
            anyhow::bail!("HOSTSD_DB_PATH cannot be empty");
        }

        if self.hosts_file.as_os_str().is_empty() {
            anyhow::bail!("HOSTSD_HOSTS_FILE cannot be empty");
        }

        if !(1..=86400).contains(&self.resync_interval_secs) {
            anyhow::bail!(
                "HOSTSD_RESYNC_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                self.resync_interval_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "HOSTSD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_hosts_config().validate()?;

        Ok(())
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn to_hosts_config(&self) -> HostsConfig {
        HostsConfig {
            store: StoreConfig {
                path: self.db_path.clone(),
                ..StoreConfig::default()
            },
            scheduler: SchedulerConfig {
                resync_interval_secs: self.resync_interval_secs,
                ..SchedulerConfig::default()
            },
            export: ExportConfig {
                hosts_file: self.hosts_file.clone(),
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return HostsdExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return HostsdExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HostsdExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HostsdExitCode::RuntimeError.into();
        }
    };

    let hosts_config = config.to_hosts_config();

    rt.block_on(async move {
        match cli.command {
            Command::GenerateToken => generate_token(hosts_config).await,
            Command::Serve => serve(hosts_config).await,
        }
    })
    .into()
}

/// Create and persist a new master secret
async fn generate_token(config: HostsConfig) -> HostsdExitCode {
    let store = match RecordStore::open_file(config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open record store: {}", e);
            return HostsdExitCode::ConfigError;
        }
    };

    if store.master_fingerprint().await.is_some() {
        warn!("Replacing the existing master secret");
    }

    let secret = store.generate_master_secret().await;
    if let Err(e) = store.save().await {
        error!("Failed to persist master secret: {}", e);
        return HostsdExitCode::RuntimeError;
    }

    info!("A new master secret has been generated; it will not be shown again");
    println!("{secret}");

    HostsdExitCode::CleanShutdown
}

/// Run the regeneration loop until a shutdown signal arrives
async fn serve(config: HostsConfig) -> HostsdExitCode {
    info!("Starting hostsd daemon");

    let store = match RecordStore::open_file(config.store).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open record store: {}", e);
            return HostsdExitCode::ConfigError;
        }
    };

    if store.master_fingerprint().await.is_none() {
        error!(
            "No master secret generated. Use the 'generate-token' command to generate a new one"
        );
        return HostsdExitCode::ConfigError;
    }

    info!("Record store loaded: {} record(s)", store.len().await);

    match run_daemon(Arc::clone(&store), config.scheduler, config.export).await {
        Ok(()) => HostsdExitCode::CleanShutdown,
        Err(e) => {
            error!("Daemon error: {:#}", e);
            HostsdExitCode::RuntimeError
        }
    }
}

/// Run the daemon
async fn run_daemon(
    store: Arc<RecordStore>,
    scheduler_config: SchedulerConfig,
    export_config: ExportConfig,
) -> Result<()> {
    let exporter = HostsFileExporter::new(Arc::clone(&store), &export_config.hosts_file);
    info!("Exporting to {}", exporter.path().display());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // A request layer would take the trigger and call it after each
    // successful mutation; serve has no mutation path of its own.
    let (handle, _trigger, event_logger) =
        start_scheduler(Box::new(exporter), scheduler_config, shutdown_rx)?;

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    // Receiver is gone if the scheduler already stopped on its own
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SCHEDULER_STOP_TIMEOUT, handle).await {
        Ok(joined) => {
            joined.context("scheduler task panicked")??;
            let seen = event_logger.await.context("event logger panicked")?;
            debug!("Scheduler emitted {} events", seen);
        }
        Err(_) => {
            warn!(
                "Scheduler did not stop within {:?}",
                SCHEDULER_STOP_TIMEOUT
            );
            event_logger.abort();
        }
    }

    store
        .save()
        .await
        .context("failed to persist record store at shutdown")?;

    info!("Shutdown complete");
    Ok(())
}

/// Spawn the change scheduler together with a task consuming its events
///
/// The event channel is bounded; leaving it unread would fill it and turn
/// every later event into a dropped-event warning.
fn start_scheduler(
    exporter: Box<dyn Exporter>,
    config: SchedulerConfig,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(
    JoinHandle<hosts_core::Result<()>>,
    RegenerationTrigger,
    JoinHandle<usize>,
)> {
    let (scheduler, trigger, events) = ChangeScheduler::new(exporter, config)?;
    let event_logger = spawn_event_logger(events);
    let handle = scheduler.spawn(shutdown_rx);
    Ok((handle, trigger, event_logger))
}

/// Log scheduler events until the scheduler drops its sender
///
/// Resolves to the number of events received.
fn spawn_event_logger(mut events: mpsc::Receiver<SchedulerEvent>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0;
        while let Some(event) = events.recv().await {
            seen += 1;
            debug!("Scheduler event: {:?}", event);
        }
        seen
    })
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
