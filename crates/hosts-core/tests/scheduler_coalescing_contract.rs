//! Contract Test: Regeneration Scheduling
//!
//! This test verifies that the change scheduler coalesces bursts and keeps a
//! periodic safety net.
//!
//! Constraints verified:
//! - A non-forced run happens at startup
//! - Requests are forced, periodic ticks are not
//! - A burst of requests while the exporter is busy yields at most one
//!   follow-up call
//! - The exporter is never called concurrently with itself
//! - Exporter failures do not stop the loop
//!
//! If this test fails, mutations can be lost or the exporter can be flooded.

mod common;

use common::*;
use hosts_core::{ChangeScheduler, RegenerationReason, SchedulerEvent};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

fn drain(events: &mut mpsc::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn startup_run_is_not_forced() {
    let exporter = MockExporter::new();
    let (scheduler, _trigger, _events) = ChangeScheduler::new(
        Box::new(MockExporter::sharing_counters_with(&exporter)),
        scheduler_config(300),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = scheduler.spawn(shutdown_rx);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(exporter.calls(), vec![false]);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn burst_while_busy_coalesces_into_one_follow_up() {
    const BURST: usize = 25;

    let exporter = MockExporter::new().with_delay(Duration::from_secs(2));
    let (scheduler, trigger, _events) = ChangeScheduler::new(
        Box::new(MockExporter::sharing_counters_with(&exporter)),
        scheduler_config(300),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = scheduler.spawn(shutdown_rx);

    // Startup run is in flight
    sleep(Duration::from_millis(100)).await;
    assert_eq!(exporter.in_flight(), 1);

    let accepted = (0..BURST).filter(|_| trigger.request()).count();
    assert_eq!(accepted, 1, "only the first request of a burst fills the slot");

    sleep(Duration::from_secs(10)).await;

    assert_eq!(exporter.calls(), vec![false, true]);
    assert_eq!(exporter.max_in_flight(), 1);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn burst_while_idle_runs_once() {
    let exporter = MockExporter::new();
    let (scheduler, trigger, _events) = ChangeScheduler::new(
        Box::new(MockExporter::sharing_counters_with(&exporter)),
        scheduler_config(300),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = scheduler.spawn(shutdown_rx);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(exporter.call_count(), 1);

    for _ in 0..10 {
        trigger.request();
    }
    sleep(Duration::from_secs(1)).await;

    assert_eq!(exporter.calls(), vec![false, true]);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn request_during_execution_runs_on_next_iteration() {
    let exporter = MockExporter::new().with_delay(Duration::from_secs(1));
    let (scheduler, trigger, _events) = ChangeScheduler::new(
        Box::new(MockExporter::sharing_counters_with(&exporter)),
        scheduler_config(300),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = scheduler.spawn(shutdown_rx);

    sleep(Duration::from_millis(100)).await;
    assert!(trigger.request());

    // First follow-up is now executing; its slot is free again
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(exporter.in_flight(), 1);
    assert!(trigger.request());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(exporter.calls(), vec![false, true, true]);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn periodic_resync_is_not_forced() {
    let exporter = MockExporter::new();
    let (scheduler, _trigger, mut events) = ChangeScheduler::new(
        Box::new(MockExporter::sharing_counters_with(&exporter)),
        scheduler_config(300),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = scheduler.spawn(shutdown_rx);

    // No immediate tick on top of the startup run
    sleep(Duration::from_secs(299)).await;
    assert_eq!(exporter.calls(), vec![false]);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(exporter.calls(), vec![false, false]);

    sleep(Duration::from_secs(300)).await;
    assert_eq!(exporter.calls(), vec![false, false, false]);

    let reasons: Vec<RegenerationReason> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SchedulerEvent::RegenerationStarted { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(
        reasons,
        vec![
            RegenerationReason::Request,
            RegenerationReason::PeriodicResync,
            RegenerationReason::PeriodicResync,
        ]
    );

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn exporter_failure_does_not_stop_the_loop() {
    let exporter = MockExporter::new();
    exporter.set_failing(true);

    let (scheduler, trigger, mut events) = ChangeScheduler::new(
        Box::new(MockExporter::sharing_counters_with(&exporter)),
        scheduler_config(300),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = scheduler.spawn(shutdown_rx);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(exporter.call_count(), 1, "failed call is not retried");

    let failures = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SchedulerEvent::RegenerationFailed { forced: false, .. }))
        .count();
    assert_eq!(failures, 1);

    exporter.set_failing(false);
    assert!(trigger.request());
    sleep(Duration::from_secs(1)).await;

    assert_eq!(exporter.calls(), vec![false, true]);
    assert!(
        drain(&mut events).contains(&SchedulerEvent::RegenerationSucceeded { forced: true })
    );

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
