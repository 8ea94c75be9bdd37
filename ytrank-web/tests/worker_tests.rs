//! Sync worker integration tests
//!
//! Drive the worker against recording targets and check the persisted task,
//! the events observers see, and which playlists reached the target.

mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use ytrank_common::models::SyncStatus;
use ytrank_common::SyncEvent;
use ytrank_web::sync::SyncOutcome;

async fn wait_for_calls(target: &RecordingTarget, calls: usize) {
    for _ in 0..500 {
        if target.calls() >= calls {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("target never reached {} calls", calls);
}

#[tokio::test]
async fn completes_every_playlist_in_order() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 3).await;
    let coordinator = test_coordinator(&pool);
    let target = Arc::new(RecordingTarget::new());
    let worker = test_worker(&coordinator, Some(target.clone()));

    let mut observer = coordinator.subscribe();
    let task_id = coordinator.create_task(3).await.unwrap();
    let outcome = worker.run(task_id, snapshot).await;

    assert_eq!(outcome, SyncOutcome::Completed { processed: 3 });
    assert_eq!(target.sent(), vec!["PL1", "PL2", "PL3"]);

    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Completed);
    assert_eq!(task.processed_playlists, 3);
    assert!(task.completed_at.is_some());
    assert_eq!(coordinator.current_task_id().await, None);

    let events = collect_until_terminal(&mut observer).await;
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(kinds, vec!["inprogress", "progress", "progress", "progress", "completed"]);
    assert_eq!(
        events[1],
        SyncEvent::Progress {
            task_id,
            total: 3,
            processed: 1,
            current_playlist: "Playlist PL1".to_string(),
        }
    );
    assert_eq!(
        events[4],
        SyncEvent::Completed {
            task_id,
            total: 3,
            processed: 3
        }
    );
}

#[tokio::test]
async fn missing_endpoint_fails_without_attempts() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 2).await;
    let coordinator = test_coordinator(&pool);
    let worker = test_worker(&coordinator, None);

    let mut observer = coordinator.subscribe();
    let task_id = coordinator.create_task(2).await.unwrap();
    let outcome = worker.run(task_id, snapshot).await;

    assert_eq!(outcome.status(), SyncStatus::Failed);
    assert_eq!(outcome.processed(), 0);

    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Failed);
    assert_eq!(task.processed_playlists, 0);
    assert!(task.error_message.unwrap().contains("not configured"));

    let events = collect_until_terminal(&mut observer).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        SyncEvent::Failed { error, processed, .. } => {
            assert_eq!(error, "REMOTE_SERVER_URL not configured");
            assert_eq!(*processed, 0);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn push_failure_stops_remaining_playlists() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 3).await;
    let coordinator = test_coordinator(&pool);
    let target = Arc::new(RecordingTarget::failing_on(1));
    let worker = test_worker(&coordinator, Some(target.clone()));

    let mut observer = coordinator.subscribe();
    let task_id = coordinator.create_task(3).await.unwrap();
    let outcome = worker.run(task_id, snapshot).await;

    assert_eq!(outcome.status(), SyncStatus::Failed);
    assert_eq!(outcome.processed(), 1);
    assert_eq!(target.calls(), 2, "third playlist must never be attempted");
    assert_eq!(target.sent(), vec!["PL1"]);

    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Failed);
    assert_eq!(task.processed_playlists, 1);
    assert_eq!(
        task.error_message.as_deref(),
        Some("Network error while sending playlist 'Playlist PL2': connection refused")
    );

    let events = collect_until_terminal(&mut observer).await;
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(kinds, vec!["inprogress", "progress", "failed"]);
}

#[tokio::test]
async fn abort_before_start_sends_nothing() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 2).await;
    let coordinator = test_coordinator(&pool);
    let target = Arc::new(RecordingTarget::new());
    let worker = test_worker(&coordinator, Some(target.clone()));

    let task_id = coordinator.create_task(2).await.unwrap();
    coordinator.abort_task(task_id).await.unwrap();

    let mut observer = coordinator.subscribe();
    let outcome = worker.run(task_id, snapshot).await;

    assert_eq!(outcome, SyncOutcome::Aborted { processed: 0 });
    assert_eq!(target.calls(), 0);

    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Aborted);

    let events = collect_until_terminal(&mut observer).await;
    assert_eq!(
        events,
        vec![SyncEvent::Aborted {
            task_id,
            processed: 0
        }]
    );
}

#[tokio::test]
async fn abort_mid_run_stops_at_next_boundary() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 3).await;
    let coordinator = test_coordinator(&pool);
    let (target, gate) = RecordingTarget::gated();
    let target = Arc::new(target);
    let worker = test_worker(&coordinator, Some(target.clone()));

    let mut observer = coordinator.subscribe();
    let task_id = coordinator.create_task(3).await.unwrap();
    let handle = worker.spawn(task_id, snapshot);

    // Let the first push through and wait for its progress event
    gate.add_permits(1);
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), observer.recv())
            .await
            .unwrap()
            .unwrap();
        if let SyncEvent::Progress { processed: 1, .. } = event {
            break;
        }
    }

    // The second push is in flight (blocked on the gate) when the abort arrives
    wait_for_calls(&target, 2).await;
    coordinator.abort_task(task_id).await.unwrap();
    gate.add_permits(1);
    handle.await.unwrap();

    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Aborted);
    assert!(task.processed_playlists <= task.total_playlists);
    assert_eq!(task.processed_playlists, 2);
    assert_eq!(target.sent(), vec!["PL1", "PL2"]);

    let events = collect_until_terminal(&mut observer).await;
    assert_eq!(
        events.last(),
        Some(&SyncEvent::Aborted {
            task_id,
            processed: 2
        })
    );
    assert_eq!(coordinator.current_task_id().await, None);
}

#[tokio::test]
async fn abort_outranks_failure_of_push_in_flight() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 3).await;
    let coordinator = test_coordinator(&pool);
    let (target, gate) = RecordingTarget::gated();
    let target = Arc::new(target.and_failing_on(1));
    let worker = test_worker(&coordinator, Some(target.clone()));

    let mut observer = coordinator.subscribe();
    let task_id = coordinator.create_task(3).await.unwrap();
    let handle = worker.spawn(task_id, snapshot);

    gate.add_permits(1);
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), observer.recv())
            .await
            .unwrap()
            .unwrap();
        if let SyncEvent::Progress { processed: 1, .. } = event {
            break;
        }
    }

    // The second push fails after the abort has been accepted
    wait_for_calls(&target, 2).await;
    coordinator.abort_task(task_id).await.unwrap();
    gate.add_permits(1);
    handle.await.unwrap();

    assert_eq!(target.calls(), 2);
    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Aborted);
    assert_eq!(task.processed_playlists, 1);
    assert_eq!(task.error_message, None);

    let events = collect_until_terminal(&mut observer).await;
    assert!(events.iter().all(|e| e.event_type() != "failed"), "got {:?}", events);
    assert_eq!(
        events.last(),
        Some(&SyncEvent::Aborted {
            task_id,
            processed: 1
        })
    );
    assert_eq!(coordinator.current_task_id().await, None);
}

#[tokio::test]
async fn empty_snapshot_completes_immediately() {
    let (_dir, pool) = create_test_db().await;
    let coordinator = test_coordinator(&pool);
    let target = Arc::new(RecordingTarget::new());
    let worker = test_worker(&coordinator, Some(target.clone()));

    let task_id = coordinator.create_task(0).await.unwrap();
    let outcome = worker.run(task_id, Vec::new()).await;

    assert_eq!(outcome, SyncOutcome::Completed { processed: 0 });
    assert_eq!(target.calls(), 0);
}

#[tokio::test]
async fn crashed_worker_is_marked_failed_and_released() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 1).await;
    let coordinator = test_coordinator(&pool);
    let worker = test_worker(&coordinator, Some(Arc::new(PanickingTarget)));

    let mut observer = coordinator.subscribe();
    let task_id = coordinator.create_task(1).await.unwrap();
    worker.spawn(task_id, snapshot).await.unwrap();

    let task = coordinator.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncStatus::Failed);
    assert!(task.error_message.unwrap().contains("crashed"));
    assert_eq!(coordinator.current_task_id().await, None);

    let events = collect_until_terminal(&mut observer).await;
    assert_eq!(events.last().map(|e| e.event_type()), Some("failed"));

    // The coordinator accepts a new sync afterwards
    assert!(coordinator.create_task(1).await.is_ok());
}

#[tokio::test]
async fn pacing_delays_between_items_only() {
    let (_dir, pool) = create_test_db().await;
    let snapshot = seed_playlists(&pool, 3).await;
    let coordinator = test_coordinator(&pool);
    let target: Arc<RecordingTarget> = Arc::new(RecordingTarget::new());
    let worker = ytrank_web::sync::SyncWorker::new(
        coordinator.clone(),
        Some(target.clone()),
        Duration::from_millis(40),
    );

    let task_id = coordinator.create_task(3).await.unwrap();
    let started = std::time::Instant::now();
    let outcome = worker.run(task_id, snapshot).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, SyncOutcome::Completed { processed: 3 });
    assert!(elapsed >= Duration::from_millis(80), "two pauses expected, took {:?}", elapsed);
}
