//! Registry ownership rules: replace-on-register, idempotent release,
//! cleanup by type and shutdown.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tether_resource::testing::{MockConnection, MockSession, MockStream};
use tether_resource::{ResourceRegistry, ResourceState};

#[tokio::test]
async fn register_replaces_and_closes_previous() {
    let registry = ResourceRegistry::with_defaults();
    let first = MockSession::new("first");
    let second = MockSession::new("second");

    registry.register("web", first.handle(), "chrome").await.unwrap();
    registry.register("web", second.handle(), "chrome").await.unwrap();

    assert_eq!(first.quit_count(), 1);
    assert_eq!(second.quit_count(), 0);
    assert_eq!(registry.len(), 1);
    assert!(registry.get("web").unwrap().ptr_eq(&second.handle()));
    assert_eq!(registry.state("web"), Some(ResourceState::Valid));
}

#[tokio::test]
async fn replacement_survives_close_failure() {
    let registry = ResourceRegistry::with_defaults();
    let old = MockConnection::new();
    old.fail_close(true);
    let new = MockConnection::new();

    registry.register_handle("db", old.handle()).await.unwrap();
    registry.register_handle("db", new.handle()).await.unwrap();

    assert_eq!(old.close_count(), 1);
    assert!(registry.get("db").unwrap().ptr_eq(&new.handle()));
}

#[tokio::test]
async fn release_is_idempotent() {
    let registry = ResourceRegistry::with_defaults();
    let session = MockSession::new("s");
    registry.register("web", session.handle(), "chrome").await.unwrap();

    assert!(registry.release("web").await);
    assert!(!registry.release("web").await);
    assert!(!registry.release("never-registered").await);

    assert_eq!(session.quit_count(), 1);
    assert!(registry.is_empty());
    assert_eq!(registry.state("web"), None);
}

#[tokio::test]
async fn cleanup_by_type_leaves_other_types() {
    let registry = ResourceRegistry::with_defaults();
    let a1 = MockStream::new();
    let b = MockStream::new();
    let a2 = MockStream::new();

    registry.register("k1", a1.handle(), "A").await.unwrap();
    registry.register("k2", b.handle(), "B").await.unwrap();
    registry.register("k3", a2.handle(), "A").await.unwrap();

    assert_eq!(registry.cleanup_resources_by_type("A").await, 2);

    let stats = registry.statistics();
    assert_eq!(stats.count_for("A"), 0);
    assert_eq!(stats.count_for("B"), 1);
    assert_eq!(stats.total, 1);
    assert_eq!(a1.close_count() + a2.close_count(), 2);
    assert_eq!(b.close_count(), 0);
    assert_eq!(registry.keys(), vec!["k2".to_string()]);
}

#[tokio::test]
async fn statistics_group_by_type_and_state() {
    let registry = ResourceRegistry::with_defaults();
    registry
        .register("s1", MockSession::new("1").handle(), "chrome")
        .await
        .unwrap();
    registry
        .register("s2", MockSession::new("2").handle(), "firefox")
        .await
        .unwrap();
    registry
        .register_handle("c1", MockConnection::new().handle())
        .await
        .unwrap();

    let stats = registry.statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.count_for("chrome"), 1);
    assert_eq!(stats.count_for("connection"), 1);
    assert_eq!(stats.count_for("edge"), 0);
    assert_eq!(stats.count_in(ResourceState::Valid), 3);
}

#[tokio::test]
async fn release_all_closes_everything_and_stops_monitor() {
    let registry = ResourceRegistry::with_defaults();
    let session = MockSession::new("s");
    let conn = MockConnection::new();
    let stream = MockStream::new();
    stream.fail_close(true);

    registry.register("s", session.handle(), "chrome").await.unwrap();
    registry.register("c", conn.handle(), "db").await.unwrap();
    registry.register("f", stream.handle(), "file").await.unwrap();
    assert!(registry.is_monitoring());

    registry.release_all().await;
    assert!(registry.is_empty());
    assert!(!registry.is_monitoring());
    assert_eq!(session.quit_count(), 1);
    assert_eq!(conn.close_count(), 1);
    assert_eq!(stream.close_count(), 1);

    // Second call is a no-op.
    registry.release_all().await;
    assert_eq!(session.quit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn release_all_closes_handles_registered_while_draining() {
    let registry = ResourceRegistry::with_defaults();
    let first = MockStream::new();
    first.set_close_delay(Duration::from_millis(100));
    let second = MockStream::new();
    second.set_close_delay(Duration::from_millis(100));
    let third = MockStream::new();
    registry.register("a", first.handle(), "file").await.unwrap();

    let draining = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.release_all().await })
    };

    // "b" lands while "a" is closing, "c" while "b" is closing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    registry.register("b", second.handle(), "file").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    registry.register("c", third.handle(), "file").await.unwrap();

    draining.await.unwrap();
    assert!(registry.is_empty());
    assert_eq!(first.close_count(), 1);
    assert_eq!(second.close_count(), 1);
    assert_eq!(third.close_count(), 1);
    assert!(!registry.is_monitoring());
}

#[tokio::test]
async fn shutdown_hook_installs_once() {
    let registry = ResourceRegistry::with_defaults();
    assert!(registry.register_shutdown_hook());
    assert!(!registry.register_shutdown_hook());
    assert!(!registry.register_shutdown_hook());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_keeps_one_per_key() {
    let registry = ResourceRegistry::with_defaults();
    let sessions: Vec<_> = (0..16).map(|i| MockSession::new(i.to_string())).collect();

    let tasks: Vec<_> = sessions
        .iter()
        .map(|s| {
            let registry = registry.clone();
            let handle = s.handle();
            tokio::spawn(async move { registry.register("shared", handle, "chrome").await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(registry.len(), 1);
    let quits: usize = sessions.iter().map(|s| s.quit_count()).sum();
    assert_eq!(quits, 15);
}
