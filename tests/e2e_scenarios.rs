//! End-to-end scenarios S1-S6 against a simulated store, matching the
//! quantified invariants and boundary behaviors of the leader-election
//! and key-watch contract.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use planet_coordinator::testing::MemoryStore;
use planet_coordinator::{ConfigBuilder, Error, StoreClient};

fn config(store: Arc<dyn StoreClient>) -> planet_coordinator::Config {
    ConfigBuilder::new(store)
        .endpoints(vec!["mem://local".into()])
        .finish()
        .unwrap()
}

/// S1 - Single voter on empty store converges to holding the lease.
#[tokio::test]
async fn s1_single_voter_on_empty_store() {
    let store = Arc::new(MemoryStore::new());
    let session = planet_coordinator::Session::open(config(store.clone())).unwrap();
    session.add_voter("/role/master", "A", Duration::from_secs(5)).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let entry = store.get(&"/role/master".into()).await.unwrap();
    assert_eq!(entry.value.as_str(), "A");
    assert!(entry.ttl <= Duration::from_secs(5));
    session.close();
}

/// S2 - Two voters contend for the same key; exactly one value survives.
#[tokio::test]
async fn s2_two_voters_contend() {
    let store = Arc::new(MemoryStore::new());
    let session = planet_coordinator::Session::open(config(store.clone())).unwrap();
    session.add_voter("/role/master", "A", Duration::from_secs(5)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.add_voter("/role/master", "B", Duration::from_secs(5)).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let entry = store.get(&"/role/master".into()).await.unwrap();
    assert_eq!(entry.value.as_str(), "A");

    let watch = session.add_watch("/role/master", Duration::from_millis(10));
    tokio::pin!(watch);
    let first = watch.next().await.unwrap();
    assert_eq!(first.as_str(), "A");
    session.close();
}

/// S3 - Leader loss: when the holding voter stops renewing, the lease
/// becomes available again and a contender takes it over.
#[tokio::test]
async fn s3_leader_loss_and_takeover() {
    let store = Arc::new(MemoryStore::new());
    store.seed("/role/master", "A", Duration::from_secs(5)).await;

    let session = planet_coordinator::Session::open(config(store.clone())).unwrap();
    let watch = session.add_watch("/role/master", Duration::from_millis(10));
    tokio::pin!(watch);
    assert_eq!(watch.next().await.unwrap().as_str(), "A");

    // A's renewer has "crashed": nothing renews the lease before it expires.
    store.expire_now("/role/master");
    session.add_voter("/role/master", "B", Duration::from_secs(5)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let entry = store.get(&"/role/master".into()).await.unwrap();
    assert_eq!(entry.value.as_str(), "B");
    assert_eq!(watch.next().await.unwrap().as_str(), "B");
    session.close();
}

/// S4 - Revision compaction: the watcher re-snapshots and keeps going,
/// without losing the value that was current before compaction.
#[tokio::test]
async fn s4_revision_compaction_resnapshots() {
    let store = Arc::new(MemoryStore::new());
    store.seed("/role/master", "A", Duration::from_secs(5)).await;
    let session = planet_coordinator::Session::open(config(store.clone())).unwrap();
    let watch = session.add_watch("/role/master", Duration::from_millis(10));
    tokio::pin!(watch);
    assert_eq!(watch.next().await.unwrap().as_str(), "A");

    store.inject_compaction("/role/master");
    store.seed("/role/master", "B", Duration::from_secs(5)).await;
    let next = tokio::time::timeout(Duration::from_secs(1), watch.next()).await.unwrap();
    assert_eq!(next.unwrap().as_str(), "B");
    session.close();
}

/// S5 - A storm of unrecognized errors: the watcher backs off and
/// forces a re-snapshot after more than 10 consecutive unknown errors,
/// then recovers.
#[tokio::test]
async fn s5_storm_of_unknown_errors_forces_resnapshot() {
    tokio::time::pause();
    let store = Arc::new(MemoryStore::new());
    store.seed("/role/master", "A", Duration::from_secs(5)).await;
    let session = planet_coordinator::Session::open(config(store.clone())).unwrap();
    let watch = session.add_watch("/role/master", Duration::from_millis(10));
    tokio::pin!(watch);
    assert_eq!(watch.next().await.unwrap().as_str(), "A");

    store.inject_unknown_errors("/role/master", 15);
    store.seed("/role/master", "B", Duration::from_secs(5)).await;

    // Drain the backoff sleeps the watcher schedules in response.
    for _ in 0..20 {
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
    }
    let next = tokio::time::timeout(Duration::from_secs(5), watch.next()).await.unwrap();
    assert_eq!(next.unwrap().as_str(), "B");
    session.close();
}

/// S6 - Clean shutdown: many voters and watchers registered, `Close`
/// returns promptly and repeated calls are harmless.
#[tokio::test]
async fn s6_clean_shutdown_of_many_tasks() {
    let store = Arc::new(MemoryStore::new());
    let session = planet_coordinator::Session::open(config(store.clone())).unwrap();
    for i in 0..10 {
        session
            .add_voter(format!("/role/{i}"), "A", Duration::from_secs(5))
            .unwrap();
        let watch = session.add_watch(format!("/role/{i}"), Duration::from_millis(10));
        tokio::spawn(async move {
            tokio::pin!(watch);
            let _ = watch.next().await;
        });
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.close();
    session.close();
}

/// Boundary behavior: term below 1s is a synchronous configuration error.
#[tokio::test]
async fn term_below_one_second_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let session = planet_coordinator::Session::open(config(store)).unwrap();
    let err = session.add_voter("/role/master", "A", Duration::from_millis(500)).unwrap_err();
    assert!(matches!(err, Error::InvalidVoter(_)));
}

/// Boundary behavior: empty voter value is a synchronous configuration error.
#[tokio::test]
async fn empty_voter_value_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let session = planet_coordinator::Session::open(config(store)).unwrap();
    let err = session.add_voter("/role/master", "", Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, Error::InvalidVoter(_)));
}

/// Boundary behavior: an empty endpoint list is rejected by the builder.
#[test]
fn empty_endpoint_list_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let err = ConfigBuilder::new(store).finish().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
