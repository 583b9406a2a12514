use paxoskv::config::ClientSettings;
use paxoskv::kv::client::next_request_id;
use paxoskv::kv::state_machine::*;
use paxoskv::kv::{Clerk, GetArgs, KvServer, PutArgs};
use paxoskv::paxos::{Fate, LocalNetwork};
use paxoskv::replicator::StateMachine;
use paxoskv::{BackoffConfig, LogError, RpcError};
use std::sync::Arc;
use std::time::Duration;

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial: Duration::from_millis(5),
        max: Duration::from_millis(50),
        multiplier: 2.0,
    }
}

fn client_settings() -> ClientSettings {
    ClientSettings {
        retry_delay_ms: 5,
        request_timeout_ms: 1000,
    }
}

fn kv_cluster(size: usize) -> (Arc<LocalNetwork<Op>>, Vec<Arc<KvServer>>) {
    let (net, peers) = LocalNetwork::<Op>::cluster(size, fast_backoff());
    let servers = peers
        .into_iter()
        .map(|px| Arc::new(KvServer::new(px, fast_backoff())))
        .collect();
    (net, servers)
}

fn put_args(key: &str, value: &str, request_id: u64, done_id: u64) -> PutArgs {
    PutArgs {
        key: key.to_string(),
        value: value.to_string(),
        hash: false,
        request_id,
        done_id,
    }
}

fn get_args(key: &str, request_id: u64) -> GetArgs {
    GetArgs {
        key: key.to_string(),
        request_id,
        done_id: 0,
    }
}

fn put(key: &str, value: &str, hash: bool) -> Op {
    Op {
        request_id: next_request_id(),
        command: Command::Put {
            key: key.to_string(),
            value: value.to_string(),
            hash,
        },
    }
}

#[test]
fn test_fnv1a32() {
    assert_eq!(fnv1a32(b""), 0x811c_9dc5);
    assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
    assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
}

#[test]
fn test_store_put_returns_previous() {
    let mut store = KvStore::new();
    assert_eq!(store.apply(&put("k", "v1", false)), "");
    assert_eq!(store.apply(&put("k", "v2", false)), "v1");
    assert_eq!(store.get("k"), Some("v2"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_store_get_missing_key() {
    let mut store = KvStore::new();
    let op = Op {
        request_id: 1,
        command: Command::Get {
            key: "nope".to_string(),
        },
    };
    assert_eq!(store.apply(&op), "");
    assert!(store.is_empty());
}

#[test]
fn test_store_put_hash() {
    let mut store = KvStore::new();

    assert_eq!(store.apply(&put("k", "x", true)), "");
    let first = fnv1a32(b"x").to_string();
    assert_eq!(store.get("k"), Some(first.as_str()));

    assert_eq!(store.apply(&put("k", "y", true)), first);
    let second = fnv1a32(format!("{}y", first).as_bytes()).to_string();
    assert_eq!(store.get("k"), Some(second.as_str()));
}

#[test]
fn test_request_ids_are_nonzero() {
    for _ in 0..1000 {
        let id = next_request_id();
        assert!(id > 0 && id < (1 << 62));
    }
}

#[tokio::test]
async fn test_put_then_get_on_another_server() {
    let (_net, servers) = kv_cluster(3);

    let reply = servers[0].put(put_args("a", "1", 1, 0)).await.unwrap();
    assert_eq!(reply.previous, "");

    let reply = servers[2].get(get_args("a", 2)).await.unwrap();
    assert_eq!(reply.value, "1");
}

#[tokio::test]
async fn test_duplicate_request_applied_once() {
    let (_net, servers) = kv_cluster(3);

    servers[0].put(put_args("k", "old", 10, 0)).await.unwrap();
    let first = servers[0].put(put_args("k", "new", 11, 0)).await.unwrap();
    assert_eq!(first.previous, "old");

    // Same request to the same server: answered from cache.
    let again = servers[0].put(put_args("k", "new", 11, 0)).await.unwrap();
    assert_eq!(again, first);
    assert_eq!(servers[0].paxos().max(), Some(1));

    // Same request to another server: it finds the request in the log.
    let elsewhere = servers[1].put(put_args("k", "new", 11, 0)).await.unwrap();
    assert_eq!(elsewhere, first);
    assert_eq!(servers[1].paxos().max(), Some(1));
    assert_eq!(servers[1].log().applied().await, 2);
}

#[tokio::test]
async fn test_acknowledged_results_are_evicted() {
    let (_net, servers) = kv_cluster(3);

    servers[0].put(put_args("k", "1", 100, 0)).await.unwrap();
    assert_eq!(servers[0].status().await.cached_results, 1);

    servers[0].put(put_args("k", "2", 101, 100)).await.unwrap();
    assert_eq!(servers[0].status().await.cached_results, 1);

    servers[0].put(put_args("k", "3", 102, 101)).await.unwrap();
    let status = servers[0].status().await;
    assert_eq!(status.cached_results, 1);
    assert_eq!(status.applied, 3);
}

#[tokio::test]
async fn test_applied_slots_are_released() {
    let (_net, servers) = kv_cluster(3);

    for (i, server) in servers.iter().enumerate() {
        server
            .put(put_args("k", &i.to_string(), 200 + i as u64, 0))
            .await
            .unwrap();
    }
    // One more round so everybody hears the others' done values.
    for (i, server) in servers.iter().enumerate() {
        server.get(get_args("k", 300 + i as u64)).await.unwrap();
    }

    let min = servers.iter().map(|s| s.paxos().min()).max().unwrap();
    assert!(min > 0, "no slot was ever released");
    assert_eq!(servers[0].paxos().status(0), Fate::Forgotten);
}

#[tokio::test]
async fn test_clerk_basic() {
    let (_net, servers) = kv_cluster(3);
    let mut clerk = Clerk::new(servers.clone(), &client_settings()).unwrap();

    assert_eq!(clerk.get("a").await, "");
    assert_eq!(clerk.put("a", "aa").await, "");
    assert_eq!(clerk.put("a", "bb").await, "aa");
    assert_eq!(clerk.get("a").await, "bb");
}

#[tokio::test]
async fn test_clerk_needs_a_server() {
    let servers: Vec<Arc<KvServer>> = Vec::new();
    assert!(Clerk::new(servers, &client_settings()).is_err());
}

#[tokio::test]
async fn test_clerk_fails_over_to_live_server() {
    let (_net, servers) = kv_cluster(3);
    let mut clerk = Clerk::new(servers.clone(), &client_settings()).unwrap();

    clerk.put("k", "before").await;
    servers[0].kill();

    for i in 0..5 {
        let previous = clerk.put("k", &format!("after{}", i)).await;
        if i == 0 {
            assert_eq!(previous, "before");
        }
    }
    assert_eq!(clerk.get("k").await, "after4");
}

#[tokio::test]
async fn test_put_hash_chain_on_unreliable_network() {
    let (net, servers) = kv_cluster(3);
    net.set_unreliable(true);

    let mut clerk = Clerk::new(servers.clone(), &client_settings()).unwrap();
    let mut expected = String::new();
    for i in 0..10 {
        let value = i.to_string();
        let previous = clerk.put_hash("h", &value).await;
        assert_eq!(previous, expected);
        expected = fnv1a32(format!("{}{}", expected, value).as_bytes()).to_string();
    }

    net.set_unreliable(false);
    assert_eq!(clerk.get("h").await, expected);
}

#[tokio::test]
async fn test_replicas_apply_same_order() {
    let (_net, servers) = kv_cluster(3);

    let mut handles = Vec::new();
    for c in 0..3 {
        let mut clerk = Clerk::new(servers.clone(), &client_settings()).unwrap();
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                clerk.put("shared", &format!("c{}-{}", c, i)).await;
                clerk.put_hash(&format!("own{}", c), &i.to_string()).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // A fresh read through each replica's log brings it up to date.
    for (i, server) in servers.iter().enumerate() {
        server.get(get_args("shared", 900 + i as u64)).await.unwrap();
    }

    let snapshot = servers[0].log().read(|store| store.clone()).await;
    assert_eq!(snapshot.len(), 4);
    for server in &servers[1..] {
        let store = server.log().read(|store| store.clone()).await;
        assert_eq!(store, snapshot);
    }
}

#[tokio::test]
async fn test_killed_server_rejects_requests() {
    let (_net, servers) = kv_cluster(3);
    servers[1].kill();

    assert!(servers[1].is_dead());
    assert!(servers[1].put(put_args("k", "v", 1, 0)).await.is_err());
    assert!(servers[1].status().await.dead);
}

#[tokio::test]
async fn test_catch_up_applies_known_decisions() {
    let (_net, servers) = kv_cluster(3);

    servers[0].put(put_args("a", "1", 1, 0)).await.unwrap();
    servers[0].put(put_args("b", "2", 2, 0)).await.unwrap();

    // Decide messages reach the other replicas without any request there.
    for _ in 0..100 {
        if servers[2].paxos().status(1).is_decided() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(servers[2].log().catch_up().await, 2);
    let value = servers[2]
        .log()
        .read(|store| store.get("b").map(str::to_string))
        .await;
    assert_eq!(value.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_clerk_gives_up_on_partitioned_replica() {
    let (net, servers) = kv_cluster(3);
    net.partition(&[&[0], &[1, 2]]);

    let settings = ClientSettings {
        retry_delay_ms: 5,
        request_timeout_ms: 200,
    };
    for i in 0..6 {
        let mut clerk = Clerk::new(servers.clone(), &settings).unwrap();
        let value = i.to_string();
        let put = clerk.put("k", &value);
        let previous = tokio::time::timeout(Duration::from_secs(10), put)
            .await
            .expect("clerk stuck on the minority replica");
        let expected = if i == 0 { String::new() } else { (i - 1).to_string() };
        assert_eq!(previous, expected);
    }
}

#[tokio::test]
async fn test_replica_errors_keep_their_cause() {
    assert!(matches!(RpcError::from(LogError::Shutdown), RpcError::Shutdown));
    assert!(matches!(
        RpcError::from(LogError::Forgotten(3)),
        RpcError::Replica(LogError::Forgotten(3))
    ));

    let (_net, servers) = kv_cluster(3);
    servers[0].kill();
    let args = get_args("k", 1);
    use paxoskv::kv::KvEndpoint;
    assert!(matches!(
        KvEndpoint::get(&servers[0], &args).await,
        Err(RpcError::Shutdown)
    ));
}
