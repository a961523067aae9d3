//! Health monitor: stale eviction, probe failures and failure isolation.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tether_resource::testing::{MockConnection, MockSession, MockStream, ProbeBehavior};
use tether_resource::{HealthMonitor, MonitorConfig, MonitorReport, RegistryConfig, ResourceRegistry};

fn registry(interval: u64, max_age: u64) -> Arc<ResourceRegistry> {
    ResourceRegistry::new(RegistryConfig::default().with_monitor(MonitorConfig {
        interval: Duration::from_secs(interval),
        max_age: Duration::from_secs(max_age),
        probe_timeout: Duration::from_secs(1),
    }))
}

fn monitor(registry: &Arc<ResourceRegistry>) -> HealthMonitor {
    HealthMonitor::new(Arc::downgrade(registry), registry.config().monitor.clone())
}

#[tokio::test(start_paused = true)]
async fn background_monitor_evicts_stale_resources() {
    let registry = registry(10, 60);
    let old = MockSession::new("old");
    registry.register("old", old.handle(), "chrome").await.unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    let fresh = MockSession::new("fresh");
    registry.register("fresh", fresh.handle(), "chrome").await.unwrap();

    tokio::time::sleep(Duration::from_secs(40)).await;

    assert!(!registry.contains("old"));
    assert_eq!(old.quit_count(), 1);
    assert!(registry.contains("fresh"));
    assert_eq!(fresh.quit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_once_reports_stale() {
    let registry = registry(3600, 30);
    let stream = MockStream::new();
    registry.register("log", stream.handle(), "file").await.unwrap();

    assert_eq!(monitor(&registry).run_once().await, MonitorReport::default());

    tokio::time::advance(Duration::from_secs(31)).await;
    let report = monitor(&registry).run_once().await;
    assert_eq!(report.stale, 1);
    assert_eq!(stream.close_count(), 1);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn failed_probe_invalidates_and_releases() {
    let _log = tether_log::init_test();
    let registry = registry(3600, 3600);
    let healthy = MockConnection::new();
    let broken = MockConnection::with_probe(ProbeBehavior::Fail);
    let session = MockSession::new("s");

    registry.register("ok", healthy.handle(), "db").await.unwrap();
    registry.register("bad", broken.handle(), "db").await.unwrap();
    registry.register("web", session.handle(), "chrome").await.unwrap();

    let report = monitor(&registry).run_once().await;
    assert_eq!(
        report,
        MonitorReport {
            stale: 0,
            invalid: 1,
            probed: 2
        }
    );
    assert!(registry.contains("ok"));
    assert!(!registry.contains("bad"));
    assert!(registry.contains("web"));
    assert_eq!(broken.close_count(), 1);
    assert_eq!(healthy.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_probe_times_out() {
    let registry = registry(3600, 3600);
    let hung = MockConnection::with_probe(ProbeBehavior::Hang);
    registry.register("db", hung.handle(), "db").await.unwrap();

    let report = monitor(&registry).run_once().await;
    assert_eq!(report.invalid, 1);
    assert_eq!(hung.close_count(), 1);
}

#[tokio::test]
async fn panicking_probe_does_not_skip_later_probes() {
    let _log = tether_log::init_test();
    let registry = registry(3600, 3600);
    let panicky = MockConnection::with_probe(ProbeBehavior::Panic);
    registry.register("db-panic", panicky.handle(), "db").await.unwrap();

    let failing: Vec<_> = (0..20)
        .map(|_| MockConnection::with_probe(ProbeBehavior::Fail))
        .collect();
    for (i, conn) in failing.iter().enumerate() {
        registry.register(format!("db-{i}"), conn.handle(), "db").await.unwrap();
    }

    let report = monitor(&registry).run_once().await;
    assert_eq!(
        report,
        MonitorReport {
            stale: 0,
            invalid: 21,
            probed: 21
        }
    );
    assert!(registry.is_empty());
    assert_eq!(panicky.close_count(), 1);
    assert!(failing.iter().all(|c| c.probe_count() == 1 && c.close_count() == 1));
}

#[tokio::test(start_paused = true)]
async fn schedule_continues_after_probe_panic() {
    let _log = tether_log::init_test();
    let registry = registry(10, 25);
    let panicky = MockConnection::with_probe(ProbeBehavior::Panic);
    let session = MockSession::new("s");
    registry.register("db", panicky.handle(), "db").await.unwrap();
    registry.register("web", session.handle(), "chrome").await.unwrap();

    // The run at 10s evicts the panicking connection, the one at 30s the aged session.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(!registry.contains("db"));
    assert_eq!(panicky.probe_count(), 1);
    assert_eq!(panicky.close_count(), 1);
    assert!(registry.contains("web"));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(registry.is_empty());
    assert_eq!(session.quit_count(), 1);
    assert!(registry.is_monitoring());
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_monitor_stuck_in_a_run() {
    let _log = tether_log::init_test();
    let registry = ResourceRegistry::new(
        RegistryConfig::default()
            .with_monitor(MonitorConfig {
                interval: Duration::from_secs(10),
                max_age: Duration::from_secs(3600),
                probe_timeout: Duration::from_secs(3600),
            })
            .with_shutdown_timeout(Duration::from_secs(1)),
    );
    let hung = MockConnection::with_probe(ProbeBehavior::Hang);
    registry.register("db", hung.handle(), "db").await.unwrap();

    // The run at 10s is now waiting on the probe and cannot see cancellation.
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(hung.probe_count(), 1);

    let started = tokio::time::Instant::now();
    registry.release_all().await;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert!(!registry.is_monitoring());
    assert!(registry.is_empty());
    assert_eq!(hung.close_count(), 1);
}

#[tokio::test]
async fn dropped_registry_yields_empty_report() {
    let registry = registry(3600, 3600);
    let monitor = monitor(&registry);
    drop(registry);
    assert_eq!(monitor.run_once().await, MonitorReport::default());
}
