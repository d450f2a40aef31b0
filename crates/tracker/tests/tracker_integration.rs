//! Integration tests for the proximity tracker runtime.

mod common;

use common::{next_outcome, sample_at, t, TestTracker, AWAY};

use domain::models::{Coordinate, Marker, Permission, PermissionStatus};
use domain::services::{MockNotificationSink, SinkCall, Transition};
use geomarker_tracker::location::SourceKind;
use geomarker_tracker::TrackerError;

fn bench() -> Marker {
    Marker::new(1, 58.0100, 56.1100).with_description("Bench")
}

// ============================================================================
// Live tracking
// ============================================================================

#[tokio::test]
async fn test_walk_past_a_marker() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    assert_eq!(ctx.tracker.source_kind().await, Some(SourceKind::Live));

    // Initial fix is away from the marker.
    let initial = next_outcome(&mut outcomes).await;
    assert_eq!(initial.captured_at, t(0));
    assert_eq!(initial.transition, Transition::Unchanged);

    ctx.provider.push(sample_at(58.0100, 56.1100, 1)).await;
    let arrived = next_outcome(&mut outcomes).await;
    assert_eq!(arrived.transition, Transition::Raised);
    assert_eq!(arrived.newly_entered, vec![1]);

    let shown = ctx.sink.shown();
    assert_eq!(shown.len(), 1);
    assert!(shown[0].body.contains("Bench"));
    assert_eq!(shown[0].payload.marker_ids, vec![1]);

    // Ten seconds later, same spot: suppressed.
    ctx.provider.push(sample_at(58.0100, 56.1100, 11)).await;
    let lingering = next_outcome(&mut outcomes).await;
    assert_eq!(lingering.in_zone, vec![1]);
    assert!(lingering.newly_entered.is_empty());
    assert_eq!(lingering.transition, Transition::Unchanged);

    ctx.provider.push(sample_at(AWAY.0, AWAY.1, 21)).await;
    let left = next_outcome(&mut outcomes).await;
    assert_eq!(left.transition, Transition::Cleared);

    assert_eq!(ctx.sink.show_count(), 1);
    assert_eq!(ctx.sink.cancel_count(), 1);
    assert!(ctx.sink.outstanding().is_empty());

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_second_arrival_replaces_notification() {
    let ctx = TestTracker::new();
    let fountain = Marker::new(2, 58.0200, 56.1200).with_description("Fountain");
    ctx.tracker
        .set_markers(vec![bench(), fountain])
        .await
        .unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    next_outcome(&mut outcomes).await;

    ctx.provider.push(sample_at(58.0100, 56.1100, 1)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Raised);

    ctx.provider.push(sample_at(58.0200, 56.1200, 2)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Replaced);

    let calls = ctx.sink.calls();
    assert_eq!(calls.len(), 3);
    let first_handle = match &calls[0] {
        SinkCall::Show { handle, .. } => handle.clone(),
        other => panic!("expected show, got {:?}", other),
    };
    assert_eq!(
        calls[1],
        SinkCall::Cancel {
            handle: first_handle
        }
    );
    assert!(matches!(&calls[2], SinkCall::Show { content, .. } if content.body.contains("Fountain")));
    assert_eq!(ctx.sink.outstanding().len(), 1);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_stop_cancels_notification_and_detaches_source() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    next_outcome(&mut outcomes).await;
    ctx.provider.push(sample_at(58.0100, 56.1100, 1)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Raised);

    ctx.tracker.stop().await.unwrap();

    assert_eq!(ctx.sink.cancel_count(), 1);
    assert!(ctx.sink.outstanding().is_empty());
    assert!(!ctx.tracker.is_running().await);
    assert_eq!(ctx.tracker.source_kind().await, None);
    assert_eq!(ctx.provider.active_watchers(), 0);

    // Nothing reaches the engine after stop.
    assert_eq!(ctx.provider.push(sample_at(58.0100, 56.1100, 100)).await, 0);
    assert_eq!(ctx.sink.show_count(), 1);

    // Stopping again is a no-op.
    ctx.tracker.stop().await.unwrap();
    assert_eq!(ctx.sink.cancel_count(), 1);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_live_requests_configured_watch_options() {
    let ctx = TestTracker::new();

    ctx.tracker.start_live().await.unwrap();

    let requests = ctx.provider.watch_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0], ctx.tracker.settings().watch);
    assert_eq!(requests[0].time_interval.as_millis(), 5000);
    assert_eq!(requests[0].distance_interval_meters, 10.0);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_sink_failures_do_not_stop_tracking() {
    let ctx = TestTracker::with_sink(MockNotificationSink::failing());
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    next_outcome(&mut outcomes).await;

    ctx.provider.push(sample_at(58.0100, 56.1100, 1)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Failed);

    ctx.sink.set_fail_show(false);
    ctx.sink.set_fail_cancel(false);

    // The failed arrival was still recorded, so re-entry waits for the cooldown.
    ctx.provider.push(sample_at(AWAY.0, AWAY.1, 2)).await;
    next_outcome(&mut outcomes).await;
    ctx.provider.push(sample_at(58.0100, 56.1100, 62)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Raised);

    ctx.tracker.shutdown().await;
}

// ============================================================================
// Start failures
// ============================================================================

#[tokio::test]
async fn test_location_permission_denied() {
    let ctx = TestTracker::new();
    ctx.provider.set_permission(PermissionStatus::Denied);

    let err = ctx.tracker.start_live().await.unwrap_err();

    assert!(matches!(err, TrackerError::PermissionDenied(Permission::Location)));
    assert!(!ctx.tracker.is_running().await);
    assert_eq!(ctx.provider.active_watchers(), 0);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_notification_permission_denied() {
    let ctx = TestTracker::with_sink(MockNotificationSink::denied());

    let live = ctx.tracker.start_live().await.unwrap_err();
    assert!(matches!(live, TrackerError::PermissionDenied(Permission::Notifications)));

    let simulated = ctx.tracker.start_simulation(None).await.unwrap_err();
    assert!(matches!(
        simulated,
        TrackerError::PermissionDenied(Permission::Notifications)
    ));
    assert_eq!(ctx.tracker.source_kind().await, None);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_location_services_disabled() {
    let ctx = TestTracker::new();
    ctx.provider.set_services_enabled(false);

    let err = ctx.tracker.start_live().await.unwrap_err();

    assert!(matches!(err, TrackerError::SourceUnavailable(_)));
    assert!(err.user_message().contains("location services"));
    assert_eq!(ctx.tracker.source_kind().await, None);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_failed_watch_processes_no_fix() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    ctx.provider.set_current(sample_at(58.0100, 56.1100, 0));
    ctx.provider.fail_watch("gps subsystem crashed");
    let mut outcomes = ctx.tracker.subscribe();

    let err = ctx.tracker.start_live().await.unwrap_err();
    assert!(matches!(err, TrackerError::SourceUnavailable(ref msg) if msg.contains("gps subsystem crashed")));
    assert!(!ctx.tracker.is_running().await);

    // The consumer drains every queued command before exiting.
    ctx.tracker.shutdown().await;

    assert!(outcomes.try_recv().is_err());
    assert_eq!(ctx.sink.show_count(), 0);
    assert!(ctx.sink.outstanding().is_empty());
    assert_eq!(ctx.tracker.last_real_position(), None);
}

// ============================================================================
// Simulation
// ============================================================================

#[tokio::test]
async fn test_simulation_starts_near_given_point() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    let start = ctx
        .tracker
        .start_simulation(Some(Coordinate::new(58.0100, 56.1100)))
        .await
        .unwrap();
    assert_eq!(start, Coordinate::new(58.0100, 56.1100));
    assert_eq!(ctx.tracker.source_kind().await, Some(SourceKind::Simulated));

    // The jittered start is well within the threshold.
    let first = next_outcome(&mut outcomes).await;
    assert_eq!(first.in_zone, vec![1]);
    assert_eq!(first.transition, Transition::Raised);

    // Allow for a tick having passed since the first sample.
    let position = ctx.tracker.current_position().unwrap();
    assert!((position.latitude - 58.0100).abs() <= 0.001);
    assert!((position.longitude - 56.1100).abs() <= 0.001);
    assert_eq!(position.accuracy, Some(5.0));
    assert_eq!(position.speed, Some(0.5));

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_stopping_simulation_restores_real_position() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker
        .start_simulation(Some(Coordinate::new(58.0100, 56.1100)))
        .await
        .unwrap();
    next_outcome(&mut outcomes).await;

    ctx.tracker.stop().await.unwrap();

    let restored = ctx.tracker.current_position().unwrap();
    assert_eq!(restored.latitude, AWAY.0);
    assert_eq!(restored.longitude, AWAY.1);
    assert_eq!(ctx.tracker.last_real_position(), Some(restored));
    assert!(ctx.sink.outstanding().is_empty());

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_simulation_defaults_to_last_real_position() {
    let ctx = TestTracker::new();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    next_outcome(&mut outcomes).await;
    ctx.provider.push(sample_at(58.0200, 56.1200, 1)).await;
    next_outcome(&mut outcomes).await;

    let start = ctx.tracker.start_simulation(None).await.unwrap();

    assert_eq!(start, Coordinate::new(58.0200, 56.1200));

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_simulation_rejects_out_of_range_start() {
    let ctx = TestTracker::new();

    let err = ctx
        .tracker
        .start_simulation(Some(Coordinate::new(91.0, 56.11)))
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::Validation(_)));
    assert_eq!(ctx.tracker.source_kind().await, None);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_sources_are_mutually_exclusive() {
    let ctx = TestTracker::new();

    ctx.tracker.start_live().await.unwrap();
    assert_eq!(ctx.provider.active_watchers(), 1);

    ctx.tracker
        .start_simulation(Some(Coordinate::new(58.0100, 56.1100)))
        .await
        .unwrap();
    assert_eq!(ctx.tracker.source_kind().await, Some(SourceKind::Simulated));
    assert_eq!(ctx.provider.active_watchers(), 0);

    ctx.tracker.start_live().await.unwrap();
    assert_eq!(ctx.tracker.source_kind().await, Some(SourceKind::Live));
    assert_eq!(ctx.provider.active_watchers(), 1);

    ctx.tracker.shutdown().await;
}

// ============================================================================
// Marker snapshot
// ============================================================================

#[tokio::test]
async fn test_removed_marker_stops_notifying() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    next_outcome(&mut outcomes).await;

    ctx.tracker.set_markers(Vec::new()).await.unwrap();
    ctx.provider.push(sample_at(58.0100, 56.1100, 1)).await;

    let outcome = next_outcome(&mut outcomes).await;
    assert!(outcome.in_zone.is_empty());
    assert_eq!(ctx.sink.show_count(), 0);

    ctx.tracker.shutdown().await;
}

#[tokio::test]
async fn test_pruned_marker_notifies_again_on_return() {
    let ctx = TestTracker::new();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();
    let mut outcomes = ctx.tracker.subscribe();

    ctx.tracker.start_live().await.unwrap();
    next_outcome(&mut outcomes).await;

    ctx.provider.push(sample_at(58.0100, 56.1100, 1)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Raised);
    ctx.provider.push(sample_at(AWAY.0, AWAY.1, 2)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Cleared);

    // Removing the marker drops its visit history.
    ctx.tracker.set_markers(Vec::new()).await.unwrap();
    ctx.tracker.set_markers(vec![bench()]).await.unwrap();

    ctx.provider.push(sample_at(58.0100, 56.1100, 3)).await;
    assert_eq!(next_outcome(&mut outcomes).await.transition, Transition::Raised);
    assert_eq!(ctx.sink.show_count(), 2);

    ctx.tracker.shutdown().await;
}
