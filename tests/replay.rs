mod common;

use std::time::Duration;

use common::{ScriptedTransport, networking, networking_with};
use riptide::{ConcurrencyMode, NetworkError, Networking, Request, StorePolicy};

async fn store_offline(networking: &Networking, transport: &ScriptedTransport, resources: &[&str]) -> Vec<Request> {
    let requests: Vec<Request> = resources
        .iter()
        .map(|resource| Request::post(*resource).store_policy(StorePolicy::Offline))
        .collect();

    for request in &requests {
        transport.push_offline();
        let result = networking.execute(request.clone()).await;
        assert!(matches!(result, Err(NetworkError::Offline(_))));
    }

    requests
}

#[tokio::test]
async fn test_replay_of_empty_store_leaves_mode_alone() {
    let transport = ScriptedTransport::new();
    let (networking, _dir) = networking_with(&transport, |b| b.concurrency(ConcurrencyMode::Capped(3)));

    assert_eq!(networking.replay().await, Ok(None));
    assert_eq!(networking.concurrency_mode(), ConcurrencyMode::Capped(3));
    assert_eq!(transport.started(), 0);
}

#[tokio::test]
async fn test_replay_runs_serially_and_drains_the_store() {
    let transport = ScriptedTransport::new().with_delay(Duration::from_millis(20));
    let (networking, _dir) = networking(&transport);
    let requests = store_offline(&networking, &transport, &["/a", "/b", "/c"]).await;
    assert_eq!(networking.offline_requests().len().await.unwrap(), 3);

    transport.reset_counters();
    let last = networking.replay().await.unwrap().unwrap();

    assert_eq!(transport.started(), 3);
    assert_eq!(transport.max_in_flight(), 1);
    assert!(networking.offline_requests().is_empty().await.unwrap());
    assert_eq!(networking.concurrency_mode(), ConcurrencyMode::Unlimited);

    // Replayed in the order they were stored; the last one is reported
    let replayed: Vec<String> = transport.calls().iter().map(|c| c.request.url.path().to_string()).collect();
    assert_eq!(replayed, vec!["/a", "/b", "/c"]);
    assert_eq!(last.request.url.path(), requests[2].resource());
}

#[tokio::test]
async fn test_replay_failure_restores_mode_and_prunes_entry() {
    let transport = ScriptedTransport::new();
    let (networking, _dir) = networking_with(&transport, |b| b.concurrency(ConcurrencyMode::Capped(2)));
    store_offline(&networking, &transport, &["/orders"]).await;

    transport.push(Err(NetworkError::Transport("500 upstream".into())));
    let result = networking.replay().await;

    assert_eq!(result, Err(NetworkError::Transport("500 upstream".into())));
    assert_eq!(networking.concurrency_mode(), ConcurrencyMode::Capped(2));
    assert!(networking.offline_requests().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_replay_keeps_entries_that_are_still_offline() {
    let transport = ScriptedTransport::new();
    let (networking, _dir) = networking(&transport);
    let requests = store_offline(&networking, &transport, &["/first", "/second"]).await;

    // First succeeds, second is still unreachable
    transport.push_ok(riptide::ResponseMeta::new(reqwest::StatusCode::CREATED), "");
    transport.push_offline();
    let result = networking.replay().await;

    assert!(matches!(result, Err(NetworkError::Offline(_))));
    let remaining = networking.offline_requests().all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].key, requests[1].key());
    assert_eq!(networking.concurrency_mode(), ConcurrencyMode::Unlimited);

    // A later replay finishes the job
    let wave = networking.replay().await.unwrap().unwrap();
    assert_eq!(wave.request.url.path(), "/second");
    assert!(networking.offline_requests().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_concurrent_replays_do_not_clobber_the_mode() {
    let transport = ScriptedTransport::new().with_delay(Duration::from_millis(10));
    let (networking, _dir) = networking_with(&transport, |b| b.concurrency(ConcurrencyMode::Capped(4)));
    store_offline(&networking, &transport, &["/x", "/y"]).await;

    let (first, second) = tokio::join!(networking.replay(), networking.replay());

    assert!(first.unwrap().is_some());
    // The second replay found the store already drained
    assert_eq!(second, Ok(None));
    assert_eq!(networking.concurrency_mode(), ConcurrencyMode::Capped(4));
}

#[tokio::test]
async fn test_stored_requests_survive_a_restart() {
    let transport = ScriptedTransport::new();
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("riptide.db");

    let request = Request::put("/profile")
        .parameter("name", "Ada")
        .store_policy(StorePolicy::Offline);
    {
        let networking = riptide::NetworkingBuilder::new()
            .base_url(common::BASE_URL)
            .unwrap()
            .transport(transport.clone())
            .build(riptide::init_db(&db_path).unwrap())
            .unwrap();
        transport.push_offline();
        assert!(networking.execute(request.clone()).await.is_err());
    }

    let networking = riptide::NetworkingBuilder::new()
        .base_url(common::BASE_URL)
        .unwrap()
        .transport(transport.clone())
        .build(riptide::init_db(&db_path).unwrap())
        .unwrap();

    let wave = networking.replay().await.unwrap().unwrap();
    assert_eq!(wave.request.body.as_deref(), Some(br#"{"name":"Ada"}"#.as_slice()));
    assert!(networking.offline_requests().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_cancelled_replay_keeps_remaining_entries() {
    let transport = ScriptedTransport::new();
    let (networking, _dir) = networking_with(&transport, |b| b.concurrency(ConcurrencyMode::Capped(2)));
    let requests = store_offline(&networking, &transport, &["/a", "/b"]).await;

    transport.reset_counters();
    transport.set_delay(Duration::from_millis(300));
    let replaying = {
        let networking = networking.clone();
        tokio::spawn(async move { networking.replay().await })
    };
    while transport.started() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    networking.cancel_all_requests();

    assert_eq!(replaying.await.unwrap(), Err(NetworkError::Cancelled));
    assert_eq!(transport.started(), 1);
    assert_eq!(networking.concurrency_mode(), ConcurrencyMode::Capped(2));

    let remaining: Vec<String> = networking
        .offline_requests()
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(remaining, vec![requests[0].key(), requests[1].key()]);
}
