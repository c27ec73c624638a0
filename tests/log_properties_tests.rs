//! Tests for the guarantees the log gives its clients.
//!
//! Several `LogHandler`s sharing one store stand in for several nodes
//! sharing the cluster's key/value service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use offsetlog::cluster::{
    FaultyStore, LogHandler, MemoryStore, NodeConfig, StoreKey,
};
use offsetlog::error::ErrorCode;
use offsetlog::server::request::*;
use offsetlog::server::{Handler, RequestContext};
use offsetlog::types::Offset;

fn ctx(src: &str) -> RequestContext {
    RequestContext::new(src, "n1", Some(1))
}

fn nodes(store: &Arc<MemoryStore>, count: usize) -> Vec<Arc<LogHandler<MemoryStore>>> {
    let config = NodeConfig::default();
    (0..count)
        .map(|_| Arc::new(LogHandler::new(Arc::clone(store), &config)))
        .collect()
}

async fn send<S>(handler: &LogHandler<S>, key: &str, msg: i64) -> Offset
where
    S: offsetlog::cluster::KeyValueStore + ?Sized + 'static,
{
    handler
        .handle_send(
            &ctx("c1"),
            SendRequestData {
                key: key.to_string(),
                msg,
            },
        )
        .await
        .unwrap()
        .offset
}

fn offsets(pairs: &[(&str, i64)]) -> BTreeMap<String, Offset> {
    pairs
        .iter()
        .map(|(k, o)| (k.to_string(), Offset(*o)))
        .collect()
}

// ============================================================================
// Offset allocation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_across_nodes_get_unique_dense_offsets() {
    let store = Arc::new(MemoryStore::new());
    let handlers = nodes(&store, 3);
    const PER_NODE: i64 = 20;

    let mut tasks = Vec::new();
    for (n, handler) in handlers.iter().enumerate() {
        let handler = Arc::clone(handler);
        tasks.push(tokio::spawn(async move {
            let mut got = Vec::new();
            for i in 0..PER_NODE {
                got.push(send(&handler, "k1", n as i64 * 1000 + i).await);
            }
            got
        }));
    }

    let mut all = BTreeSet::new();
    for task in tasks {
        for offset in task.await.unwrap() {
            assert!(all.insert(offset), "offset {offset} handed out twice");
        }
    }

    let expected: BTreeSet<Offset> = (0..3 * PER_NODE).map(Offset).collect();
    assert_eq!(all, expected);
    assert_eq!(
        store.get(&StoreKey::latest("k1")),
        Some(3 * PER_NODE)
    );
}

#[tokio::test]
async fn test_partitions_have_independent_offsets() {
    let store = Arc::new(MemoryStore::new());
    let handler = &nodes(&store, 1)[0];

    assert_eq!(send(handler, "a", 1).await, Offset(0));
    assert_eq!(send(handler, "b", 2).await, Offset(0));
    assert_eq!(send(handler, "a", 3).await, Offset(1));
}

#[tokio::test]
async fn test_send_offsets_increase_per_client() {
    let store = Arc::new(MemoryStore::new());
    let handlers = nodes(&store, 2);

    let mut last = None;
    for i in 0..10 {
        let offset = send(&handlers[i % 2], "k", i as i64).await;
        if let Some(prev) = last {
            assert!(offset > prev);
        }
        last = Some(offset);
    }
}

// ============================================================================
// Poll
// ============================================================================

#[tokio::test]
async fn test_poll_returns_records_in_offset_order() {
    let store = Arc::new(MemoryStore::new());
    let handlers = nodes(&store, 2);

    send(&handlers[0], "k1", 10).await;
    send(&handlers[1], "k1", 20).await;
    send(&handlers[0], "k1", 30).await;

    let reply = handlers[1]
        .handle_poll(
            &ctx("c2"),
            PollRequestData {
                offsets: offsets(&[("k1", 0)]),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        reply.msgs["k1"],
        vec![(Offset(0), 10), (Offset(1), 20), (Offset(2), 30)]
    );
}

#[tokio::test]
async fn test_poll_at_end_returns_empty_list() {
    let store = Arc::new(MemoryStore::new());
    let handler = &nodes(&store, 1)[0];
    send(handler, "k1", 10).await;

    let reply = handler
        .handle_poll(
            &ctx("c1"),
            PollRequestData {
                offsets: offsets(&[("k1", 1), ("k2", 0)]),
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.msgs.get("k1"), Some(&Vec::new()));
    assert!(!reply.msgs.contains_key("k2"));
}

#[tokio::test]
async fn test_poll_negative_start_reads_from_zero() {
    let store = Arc::new(MemoryStore::new());
    let handler = &nodes(&store, 1)[0];
    send(handler, "k1", 7).await;

    let reply = handler
        .handle_poll(
            &ctx("c1"),
            PollRequestData {
                offsets: offsets(&[("k1", -5)]),
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.msgs["k1"], vec![(Offset(0), 7)]);
}

#[tokio::test]
async fn test_poll_skips_record_whose_write_failed() {
    let store = Arc::new(FaultyStore::new(MemoryStore::new()));
    store.fail_writes_to(StoreKey::record("p", Offset(2)));
    let handler = LogHandler::new(Arc::clone(&store), &NodeConfig::default());

    assert_eq!(send(&handler, "p", 100).await, Offset(0));
    assert_eq!(send(&handler, "p", 101).await, Offset(1));

    let err = handler
        .handle_send(
            &ctx("c1"),
            SendRequestData {
                key: "p".to_string(),
                msg: 102,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::Crash));

    // The failed send still consumed offset 2.
    assert_eq!(send(&handler, "p", 103).await, Offset(3));

    let reply = handler
        .handle_poll(
            &ctx("c1"),
            PollRequestData {
                offsets: offsets(&[("p", 0)]),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        reply.msgs["p"],
        vec![(Offset(0), 100), (Offset(1), 101), (Offset(3), 103)]
    );
}

#[tokio::test]
async fn test_lost_cas_reply_skips_an_offset_without_duplicates() {
    let store = Arc::new(FaultyStore::new(MemoryStore::new()));
    store.fail_next_cas_after_apply(1);
    let handler = LogHandler::new(Arc::clone(&store), &NodeConfig::default());

    assert_eq!(send(&handler, "p", 100).await, Offset(1));
    assert_eq!(send(&handler, "p", 101).await, Offset(2));

    let reply = handler
        .handle_poll(
            &ctx("c1"),
            PollRequestData {
                offsets: offsets(&[("p", 0)]),
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.msgs["p"], vec![(Offset(1), 100), (Offset(2), 101)]);
}

// ============================================================================
// Commits
// ============================================================================

#[tokio::test]
async fn test_commit_is_last_write_wins() {
    let store = Arc::new(MemoryStore::new());
    let handlers = nodes(&store, 2);

    handlers[0]
        .handle_commit_offsets(
            &ctx("c1"),
            CommitOffsetsRequestData {
                offsets: offsets(&[("k1", 5)]),
            },
        )
        .await
        .unwrap();
    handlers[1]
        .handle_commit_offsets(
            &ctx("c2"),
            CommitOffsetsRequestData {
                offsets: offsets(&[("k1", 3)]),
            },
        )
        .await
        .unwrap();

    let reply = handlers[0]
        .handle_list_committed_offsets(
            &ctx("c1"),
            ListCommittedOffsetsRequestData {
                keys: vec!["k1".to_string()],
            },
        )
        .await
        .unwrap();
    assert_eq!(reply.offsets, offsets(&[("k1", 3)]));
}

#[tokio::test]
async fn test_list_omits_never_committed_keys() {
    let store = Arc::new(MemoryStore::new());
    let handler = &nodes(&store, 1)[0];
    send(handler, "k1", 1).await;

    let reply = handler
        .handle_list_committed_offsets(
            &ctx("c1"),
            ListCommittedOffsetsRequestData {
                keys: vec!["k1".to_string(), "nope".to_string()],
            },
        )
        .await
        .unwrap();
    assert!(reply.offsets.is_empty());
}

#[tokio::test]
async fn test_commit_with_empty_key_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let handler = &nodes(&store, 1)[0];

    let err = handler
        .handle_commit_offsets(
            &ctx("c1"),
            CommitOffsetsRequestData {
                offsets: offsets(&[("", 1), ("k1", 2)]),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::MalformedRequest));
    assert!(store.is_empty());
}
