//! Change scheduler
//!
//! The ChangeScheduler is responsible for:
//! - Coalescing regeneration requests from store mutations
//! - Running a periodic, non-forced safety-net regeneration
//! - Invoking the [`Exporter`] one call at a time
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  request()   ┌──────────────┐
//! │ mutation callers │────────────▶ │ pending slot │ (capacity 1)
//! └──────────────────┘              └──────────────┘
//!                                          │
//!         ┌──────────────┐                 ▼
//!         │ resync timer │────────▶ ┌────────────────┐      ┌──────────┐
//!         └──────────────┘          │ ChangeScheduler│─────▶│ Exporter │
//!         ┌──────────────┐          └────────────────┘      └──────────┘
//!         │  shutdown    │────────▶        │
//!         └──────────────┘                 ▼
//!                                  SchedulerEvent stream
//! ```
//!
//! ## Coalescing
//!
//! The pending slot holds at most one request. A request made while one is
//! already pending is dropped, so a burst of mutations collapses into a
//! single regeneration. A request made while the exporter is running lands
//! in the (now empty) slot and runs on the next iteration.

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::traits::Exporter;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Why a regeneration ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationReason {
    /// Taken from the pending slot (startup run or a mutation)
    Request,
    /// Periodic safety-net tick
    PeriodicResync,
}

/// Events emitted by the ChangeScheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Loop started
    Started {
        resync_interval: Duration,
    },

    /// Exporter invoked
    RegenerationStarted {
        forced: bool,
        reason: RegenerationReason,
    },

    /// Exporter returned successfully
    RegenerationSucceeded {
        forced: bool,
    },

    /// Exporter returned an error
    RegenerationFailed {
        forced: bool,
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// Handle used by mutation paths to ask for a regeneration
///
/// Cheap to clone; every clone feeds the same single-slot queue.
#[derive(Debug, Clone)]
pub struct RegenerationTrigger {
    tx: mpsc::Sender<bool>,
}

impl RegenerationTrigger {
    /// Queue a forced regeneration
    ///
    /// Never blocks. Returns `false` when a request is already pending (the
    /// call is coalesced into it) or the scheduler has stopped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(true) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Regeneration already scheduled, skipping");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Change scheduler is stopped, dropping regeneration request");
                false
            }
        }
    }
}

/// Debounced regeneration loop
///
/// ## Lifecycle
///
/// 1. Create with [`ChangeScheduler::new()`]; a non-forced startup run is
///    queued immediately
/// 2. Start with [`ChangeScheduler::run()`] or [`ChangeScheduler::spawn()`]
/// 3. Loop runs until the shutdown signal fires (or its sender is dropped)
///
/// Shutdown is only observed between iterations; an exporter call in flight
/// always completes.
pub struct ChangeScheduler {
    /// Artifact exporter
    exporter: Box<dyn Exporter>,

    /// Period of the non-forced resync
    resync_interval: Duration,

    /// Single-slot pending request queue (the value is the forced flag)
    requests: mpsc::Receiver<bool>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl ChangeScheduler {
    /// Create a new change scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, trigger, event_receiver)
    pub fn new(
        exporter: Box<dyn Exporter>,
        config: SchedulerConfig,
    ) -> Result<(Self, RegenerationTrigger, mpsc::Receiver<SchedulerEvent>)> {
        config.validate()?;

        let (request_tx, request_rx) = mpsc::channel(1);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);

        // Startup run, not forced
        request_tx
            .try_send(false)
            .map_err(|e| Error::Other(format!("unable to queue startup regeneration: {e}")))?;

        let scheduler = Self {
            exporter,
            resync_interval: config.resync_interval(),
            requests: request_rx,
            event_tx,
        };

        Ok((scheduler, RegenerationTrigger { tx: request_tx }, event_rx))
    }

    /// Run the loop on a new task
    pub fn spawn(self, shutdown_rx: oneshot::Receiver<()>) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(shutdown_rx))
    }

    /// Run the loop until `shutdown_rx` fires
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    pub async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.resync_interval,
            self.resync_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Change scheduler started ({} exporter, resync every {:?})",
            self.exporter.exporter_name(),
            self.resync_interval
        );
        self.emit_event(SchedulerEvent::Started {
            resync_interval: self.resync_interval,
        });

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received");
                    self.emit_event(SchedulerEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                _ = ticker.tick() => {
                    self.regenerate(false, RegenerationReason::PeriodicResync).await;
                }

                Some(forced) = self.requests.recv() => {
                    self.regenerate(forced, RegenerationReason::Request).await;
                }
            }
        }

        info!("Change scheduler stopped");
        Ok(())
    }

    /// Invoke the exporter once
    ///
    /// Failures are logged and reported; the next tick or request is the
    /// retry.
    async fn regenerate(&self, forced: bool, reason: RegenerationReason) {
        debug!("Regenerating (forced: {}, reason: {:?})", forced, reason);
        self.emit_event(SchedulerEvent::RegenerationStarted { forced, reason });

        match self.exporter.regenerate(forced).await {
            Ok(()) => {
                debug!("Regeneration complete");
                self.emit_event(SchedulerEvent::RegenerationSucceeded { forced });
            }
            Err(e) => {
                error!(
                    "Unable to regenerate with {} exporter: {}",
                    self.exporter.exporter_name(),
                    e
                );
                self.emit_event(SchedulerEvent::RegenerationFailed {
                    forced,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
