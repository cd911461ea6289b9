//! End-to-end runs through the coordinator with scripted probes.

use std::sync::Arc;
use std::time::Duration;

use streamwatch_core::fakes::{ScriptedProbe, ScriptedStep};
use streamwatch_core::{HealthStatus, PoolConfig, RunCoordinator, Stream, WatchConfig};

fn streams(ids: &[i64]) -> Vec<Stream> {
    ids.iter()
        .map(|id| Stream::new(*id, format!("camera-{id}"), format!("rtsp://10.0.0.{id}/live")))
        .collect()
}

fn coordinator(probe: Arc<ScriptedProbe>, pool: PoolConfig) -> RunCoordinator {
    let config = WatchConfig {
        pool,
        ..WatchConfig::default()
    };
    RunCoordinator::new(config, probe).expect("valid config")
}

#[tokio::test]
async fn all_successful_probes_are_healthy() {
    let probe = Arc::new(ScriptedProbe::new(Duration::from_secs(20)));
    let report = coordinator(probe.clone(), PoolConfig::default())
        .run(streams(&[1, 2, 3]))
        .await;

    assert!(report.is_complete());
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.healthy_count(), 3);
    assert!(report.results.iter().all(|r| r.detail.is_none()));
    assert_eq!(probe.calls(), 3);
}

#[tokio::test]
async fn no_route_to_host_is_unreachable() {
    let probe = Arc::new(ScriptedProbe::new(Duration::from_secs(20)).with_step(
        4,
        ScriptedStep::Fail("[tcp @ 0x55d] Connection to tcp://10.0.0.4:554 failed: No route to host".into()),
    ));
    let report = coordinator(probe, PoolConfig::default())
        .run(streams(&[4]))
        .await;

    let result = report.result_for(4).unwrap();
    assert_eq!(result.status, HealthStatus::Unreachable);
    assert!(result.detail.as_ref().unwrap().contains("No route to host"));
}

#[tokio::test(start_paused = true)]
async fn probe_past_deadline_is_timed_out() {
    let probe = Arc::new(ScriptedProbe::new(Duration::from_secs(20)).with_step(9, ScriptedStep::Hang));
    let report = coordinator(probe, PoolConfig::default())
        .run(streams(&[8, 9]))
        .await;

    assert!(report.is_complete());
    assert_eq!(report.result_for(9).unwrap().status, HealthStatus::TimedOut);
    assert_eq!(report.result_for(8).unwrap().status, HealthStatus::Healthy);
}

#[tokio::test]
async fn rejected_submission_is_queue_error_and_run_completes() {
    let probe = Arc::new(
        ScriptedProbe::new(Duration::from_secs(20))
            .with_default(ScriptedStep::HealthyAfter(Duration::from_millis(5))),
    );
    let pool = PoolConfig {
        capacity: 1,
        queue_capacity: 2,
    };
    let report = coordinator(probe.clone(), pool).run(streams(&[1, 2, 3])).await;

    assert!(report.is_complete());
    assert_eq!(report.count(HealthStatus::QueueError), 1);
    assert_eq!(report.result_for(3).unwrap().status, HealthStatus::QueueError);
    assert_eq!(report.healthy_count(), 2);
    assert_eq!(probe.calls(), 2, "rejected stream must not be probed");
}

#[tokio::test]
async fn every_submission_yields_exactly_one_result() {
    let mut probe = ScriptedProbe::new(Duration::from_millis(200))
        .with_default(ScriptedStep::HealthyAfter(Duration::from_millis(2)));
    for id in (0..40).step_by(3) {
        probe = probe.with_step(id, ScriptedStep::Fail("401 Unauthorized".into()));
    }
    for id in (1..40).step_by(7) {
        probe = probe.with_step(id, ScriptedStep::Panic);
    }
    let probe = Arc::new(probe);
    let pool = PoolConfig {
        capacity: 4,
        queue_capacity: 16,
    };

    let ids: Vec<i64> = (0..40).collect();
    let report = coordinator(probe.clone(), pool).run(streams(&ids)).await;

    assert_eq!(report.submitted, 40);
    assert!(report.is_complete());
    let mut seen: Vec<i64> = report.results.iter().map(|r| r.stream_id).collect();
    seen.sort_unstable();
    assert_eq!(seen, ids);
    assert!(probe.peak_concurrency() <= 4);

    let probed = probe.calls();
    assert_eq!(probed + report.count(HealthStatus::QueueError), 40);
}

#[tokio::test(start_paused = true)]
async fn timeout_wins_over_failure_text() {
    // A hung probe never gets to report its output; the status is decided by
    // the deadline alone.
    let probe = Arc::new(ScriptedProbe::new(Duration::from_millis(500)).with_default(ScriptedStep::Hang));
    let report = coordinator(probe, PoolConfig::default())
        .run(streams(&[1, 2]))
        .await;

    assert_eq!(report.count(HealthStatus::TimedOut), 2);
    for result in &report.results {
        assert!(result.detail.as_ref().unwrap().contains("was killed"));
    }
}

#[tokio::test]
async fn runs_are_independent() {
    let probe = Arc::new(ScriptedProbe::new(Duration::from_secs(1)));
    let coordinator = coordinator(probe, PoolConfig::default());

    let first = coordinator.run(streams(&[1, 2])).await;
    let second = coordinator.run(streams(&[3])).await;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.results.len(), 2);
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.results[0].stream_id, 3);
}
