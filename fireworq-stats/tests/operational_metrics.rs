use std::sync::OnceLock;
use std::time::Duration;

use fireworq_stats::metrics_consts::{POLL_FAILURES, POLL_STARTS, PROBE_FAILURES};
use fireworq_stats::{FireworqClient, StatsCollector};
use httpmock::prelude::*;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;

// The recorder is global, so every test in this file shares it.
fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        drop(recorder.install());
        snapshotter
    })
}

fn counter_value(name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            Some((label_key, label_value)) => key
                .key()
                .labels()
                .any(|label| label.key() == label_key && label.value() == label_value),
            None => true,
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => count,
            _ => 0,
        })
        .sum()
}

#[tokio::test]
async fn test_poll_and_probe_failures_are_counted() {
    snapshotter();
    let server = MockServer::start_async().await;
    let client = FireworqClient::new(&server.base_url(), Duration::from_millis(500))
        .expect("failed to build client");
    let collector = StatsCollector::new(client);

    let mut stats = server
        .mock_async(|when, then| {
            when.method(GET).path("/queues/stats");
            then.status(500);
        })
        .await;

    collector
        .build_snapshot()
        .await
        .expect_err("snapshot should fail without counters");

    assert!(counter_value(POLL_STARTS, None) >= 1);
    assert!(counter_value(POLL_FAILURES, None) >= 1);

    stats.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/queues/stats");
            then.status(200)
                .json_body(json!({"flaky": {"active_nodes": 1}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/queue/flaky/waiting");
            then.status(500);
        })
        .await;

    let snapshot = collector
        .build_snapshot()
        .await
        .expect("failed probes should not fail the snapshot");

    assert!(!snapshot.contains_key("queue.delay.flaky"));
    assert_eq!(counter_value(PROBE_FAILURES, Some(("queue", "flaky"))), 1);
}
