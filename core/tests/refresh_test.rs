//! Live Refresh Tests
//!
//! Polling behavior of LiveRefreshController under paused tokio time:
//! - Immediate fetch plus fixed-interval polling
//! - Failure handling keeps prior data
//! - Stale responses are dropped, never applied
//! - Stop / drop halts the timer

mod common;

use campus_flow_core::diagram::{DiagramEvent, DiagramEventType, EventBroadcaster};
use campus_flow_core::{
    Building, CampusDataSource, LiveRefreshController, Selection, SelectionKey, StaticDataSource,
};
use common::{building, catalog_records, snapshot};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{sleep, Duration};

const INTERVAL: Duration = Duration::from_secs(5);

struct Harness {
    source: Arc<StaticDataSource>,
    controller: LiveRefreshController,
    events: broadcast::Receiver<DiagramEvent>,
}

async fn harness(buildings: Vec<Building>, loads: &[(i64, f64)]) -> Harness {
    let source = Arc::new(StaticDataSource::new(catalog_records(), Vec::new()));
    for &(id, load) in loads {
        source.set_snapshot(snapshot(id, load)).await;
    }
    let broadcaster = EventBroadcaster::new(64);
    let events = broadcaster.subscribe();
    let shared: Arc<dyn CampusDataSource> = source.clone();
    let controller = LiveRefreshController::new(
        shared,
        Arc::new(RwLock::new(buildings)),
        INTERVAL,
        broadcaster,
    );
    Harness {
        source,
        controller,
        events,
    }
}

fn drain(events: &mut broadcast::Receiver<DiagramEvent>) -> Vec<DiagramEventType> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type);
    }
    seen
}

fn count(seen: &[DiagramEventType], kind: DiagramEventType) -> usize {
    seen.iter().filter(|e| **e == kind).count()
}

// =============================================================================
// Building polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn building_fetched_immediately_then_every_interval() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 42.0)]).await;

    h.controller.track(&Selection::Building(1)).await;
    assert!(h.controller.is_polling());
    sleep(Duration::from_millis(10)).await;

    assert_eq!(h.source.flow_requests(), 1);
    let detail = h.controller.detail().await;
    assert_eq!(detail.key, Some(SelectionKey::Building(1)));
    assert_eq!(detail.snapshot.as_ref().map(|s| s.total_load), Some(42.0));
    assert!(detail.updated_at.is_some());
    assert!(!detail.is_loading());

    sleep(INTERVAL).await;
    assert_eq!(h.source.flow_requests(), 2);
    sleep(INTERVAL).await;
    assert_eq!(h.source.flow_requests(), 3);

    let seen = drain(&mut h.events);
    assert_eq!(count(&seen, DiagramEventType::SelectionChanged), 1);
    assert_eq!(count(&seen, DiagramEventType::SnapshotUpdated), 3);
}

#[tokio::test(start_paused = true)]
async fn poll_failure_keeps_previous_snapshot() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 42.0)]).await;

    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_millis(10)).await;
    assert!(h.controller.detail().await.snapshot.is_some());

    h.source.set_failing(1, true).await;
    sleep(INTERVAL).await;

    let detail = h.controller.detail().await;
    assert_eq!(detail.snapshot.as_ref().map(|s| s.total_load), Some(42.0));
    assert!(detail.last_error.is_some());
    assert!(h.controller.is_polling(), "a failed poll must not stop the timer");

    h.source.set_failing(1, false).await;
    h.source.set_snapshot(snapshot(1, 50.0)).await;
    sleep(INTERVAL).await;

    let detail = h.controller.detail().await;
    assert_eq!(detail.snapshot.as_ref().map(|s| s.total_load), Some(50.0));
    assert!(detail.last_error.is_none());

    let seen = drain(&mut h.events);
    assert_eq!(count(&seen, DiagramEventType::PollFailed), 1);
}

#[tokio::test(start_paused = true)]
async fn first_fetch_failure_leaves_panel_loading() {
    let mut h = harness(vec![building(7, "Eng", &["grid"])], &[]).await;

    h.controller.track(&Selection::Building(7)).await;
    sleep(Duration::from_millis(10)).await;

    let detail = h.controller.detail().await;
    assert!(detail.is_loading());
    assert!(detail.last_error.is_some());
}

// =============================================================================
// Staleness
// =============================================================================

#[tokio::test(start_paused = true)]
async fn response_for_previous_selection_is_discarded() {
    let mut h = harness(
        vec![building(1, "Eng", &["grid"]), building(2, "Eng", &["grid"])],
        &[(1, 11.0), (2, 22.0)],
    )
    .await;
    h.source.set_latency(1, Duration::from_secs(3)).await;

    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_secs(1)).await;
    assert!(h.controller.detail().await.is_loading());

    h.controller.track(&Selection::Building(2)).await;
    sleep(Duration::from_millis(10)).await;
    let detail = h.controller.detail().await;
    assert_eq!(detail.snapshot.as_ref().map(|s| s.building_id), Some(2));

    // Building 1's response lands at t = 3s
    sleep(Duration::from_secs(3)).await;
    let detail = h.controller.detail().await;
    assert_eq!(detail.key, Some(SelectionKey::Building(2)));
    assert_eq!(detail.snapshot.as_ref().map(|s| s.building_id), Some(2));
    assert_eq!(h.source.flow_requests(), 2);

    let seen = drain(&mut h.events);
    assert_eq!(count(&seen, DiagramEventType::StaleResponseDiscarded), 1);
}

#[tokio::test(start_paused = true)]
async fn older_response_never_overwrites_newer_one() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 10.0)]).await;
    h.source.set_latency(1, Duration::from_secs(7)).await;

    // First request sleeps until t = 7s
    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_secs(1)).await;
    h.source.set_latency(1, Duration::ZERO).await;

    // Second request at t = 5s returns at once
    sleep(Duration::from_millis(4_500)).await;
    let detail = h.controller.detail().await;
    assert_eq!(detail.snapshot.as_ref().map(|s| s.total_load), Some(10.0));

    h.source.set_snapshot(snapshot(1, 20.0)).await;
    sleep(Duration::from_secs(2)).await;

    // The first request read 20.0 at t = 7s but arrived after a newer one
    let detail = h.controller.detail().await;
    assert_eq!(detail.snapshot.as_ref().map(|s| s.total_load), Some(10.0));
    let seen = drain(&mut h.events);
    assert_eq!(count(&seen, DiagramEventType::StaleResponseDiscarded), 1);

    // The next scheduled poll picks the new value up
    sleep(Duration::from_secs(3)).await;
    let detail = h.controller.detail().await;
    assert_eq!(detail.snapshot.as_ref().map(|s| s.total_load), Some(20.0));
}

#[tokio::test(start_paused = true)]
async fn switching_selection_clears_old_detail() {
    let mut h = harness(
        vec![building(1, "Eng", &["grid"]), building(2, "Eng", &["grid"])],
        &[(1, 11.0), (2, 22.0)],
    )
    .await;
    h.source.set_latency(2, Duration::from_secs(2)).await;

    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_millis(10)).await;
    assert!(h.controller.detail().await.snapshot.is_some());

    h.controller.track(&Selection::Building(2)).await;
    let detail = h.controller.detail().await;
    assert_eq!(detail.key, Some(SelectionKey::Building(2)));
    assert!(detail.snapshot.is_none());
    assert!(detail.is_loading());
}

// =============================================================================
// Stop / teardown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn stop_halts_polling() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 1.0)]).await;

    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_millis(10)).await;
    h.controller.stop();
    assert!(!h.controller.is_polling());

    sleep(INTERVAL * 4).await;
    assert_eq!(h.source.flow_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_response() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 1.0)]).await;
    h.source.set_latency(1, Duration::from_secs(1)).await;

    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_millis(10)).await;
    h.controller.stop();
    sleep(Duration::from_secs(2)).await;

    assert!(h.controller.detail().await.snapshot.is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_halts_polling() {
    let h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 1.0)]).await;
    let Harness {
        source,
        mut controller,
        events: _events,
    } = h;

    controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_millis(10)).await;
    drop(controller);

    sleep(INTERVAL * 3).await;
    assert_eq!(source.flow_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_selection_does_not_poll() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 1.0)]).await;

    h.controller.track(&Selection::Building(1)).await;
    sleep(Duration::from_millis(10)).await;
    h.controller.track(&Selection::Idle).await;

    assert!(!h.controller.is_polling());
    let detail = h.controller.detail().await;
    assert!(detail.key.is_none());
    assert!(detail.snapshot.is_none());
    assert!(!detail.is_loading());

    sleep(INTERVAL * 2).await;
    assert_eq!(h.source.flow_requests(), 1);
}

// =============================================================================
// Faculty polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn faculty_aggregate_failure_keeps_previous_aggregate() {
    let mut h = harness(
        vec![
            building(1, "Eng", &["grid"]),
            building(2, "Eng", &["solar"]),
            building(3, "Arts", &["grid"]),
        ],
        &[(1, 10.0), (2, 20.0), (3, 99.0)],
    )
    .await;

    h.controller
        .track(&Selection::Faculty("Eng".to_string()))
        .await;
    sleep(Duration::from_millis(10)).await;
    let detail = h.controller.detail().await;
    let aggregate = detail.aggregate.expect("aggregate should load");
    assert!((aggregate.total_load - 30.0).abs() < 1e-9);
    assert_eq!(aggregate.buildings.len(), 2);

    h.source.set_failing(2, true).await;
    sleep(INTERVAL).await;

    let detail = h.controller.detail().await;
    let aggregate = detail.aggregate.expect("prior aggregate kept");
    assert!((aggregate.total_load - 30.0).abs() < 1e-9);
    assert!(detail.last_error.is_some());

    let seen = drain(&mut h.events);
    assert_eq!(count(&seen, DiagramEventType::AggregateUpdated), 1);
    assert_eq!(count(&seen, DiagramEventType::AggregateFailed), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_faculty_stays_loading() {
    let mut h = harness(vec![building(1, "Eng", &["grid"])], &[(1, 10.0)]).await;

    h.controller
        .track(&Selection::Faculty("Medicine".to_string()))
        .await;
    sleep(Duration::from_millis(10)).await;

    let detail = h.controller.detail().await;
    assert!(detail.aggregate.is_none());
    assert!(detail.is_loading());
    assert!(detail.last_error.is_none());
    assert_eq!(h.source.flow_requests(), 0);

    let seen = drain(&mut h.events);
    assert_eq!(count(&seen, DiagramEventType::AggregateEmpty), 1);
}
