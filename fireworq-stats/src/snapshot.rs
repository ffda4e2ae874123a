use std::collections::{btree_map::Entry, BTreeMap};
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::aggregate::aggregate;
use crate::client::FireworqClient;
use crate::delay::probe_delay;
use crate::error::FetchError;
use crate::metrics_consts::*;
use crate::sanitize::sanitize;
use crate::stats::QueueCountersMap;

/// Prefix of the per-queue delay metrics. The sanitized queue name follows it.
pub const DELAY_KEY_PREFIX: &str = "queue.delay.";

/// Metric values keyed by metric name: the result of one poll.
pub type MetricSnapshot = BTreeMap<String, f64>;

pub fn delay_key(queue: &str) -> String {
    format!("{}{}", DELAY_KEY_PREFIX, sanitize(queue))
}

/// Builds a `MetricSnapshot` from a single poll of the queue service.
///
/// Nothing is kept between polls: every snapshot is computed from the counters and jobs fetched
/// while building it.
#[derive(Clone, Debug)]
pub struct StatsCollector {
    client: FireworqClient,
}

impl StatsCollector {
    pub fn new(client: FireworqClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FireworqClient {
        &self.client
    }

    /// Poll the queue service once.
    ///
    /// Failing to fetch the counters fails the whole snapshot, as every aggregate depends on them.
    /// Failing to probe a queue only leaves that queue's delay out of the snapshot.
    pub async fn build_snapshot(&self) -> Result<MetricSnapshot, FetchError> {
        metrics::counter!(POLL_STARTS).increment(1);
        let start = Instant::now();

        let result = self.collect().await;

        metrics::histogram!(POLL_TIME).record(start.elapsed().as_millis() as f64);
        if result.is_err() {
            metrics::counter!(POLL_FAILURES).increment(1);
        }

        result
    }

    async fn collect(&self) -> Result<MetricSnapshot, FetchError> {
        let counters = self.client.fetch_counters().await?;
        debug!("fetched counters of {} queues", counters.len());

        let mut snapshot = aggregate(&counters).to_metrics();

        for (key, delay) in probe_active_queues(&self.client, &counters).await {
            match snapshot.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(delay);
                }
                // Distinct queue names can sanitize to the same key: report the most delayed.
                Entry::Occupied(mut entry) => {
                    if delay > *entry.get() {
                        entry.insert(delay);
                    }
                }
            }
        }

        Ok(snapshot)
    }
}

/// Probe every queue with at least one active node, concurrently.
/// Returns a delay metric key and value for every probe that succeeded.
async fn probe_active_queues(
    client: &FireworqClient,
    counters: &QueueCountersMap,
) -> Vec<(String, f64)> {
    let probes = counters
        .iter()
        .filter(|(_, queue)| queue.is_active())
        .map(|(name, _)| async move {
            match probe_delay(client, name).await {
                Ok(delay) => Some((delay_key(name), delay)),
                Err(error) => {
                    let labels = [("queue", name.to_owned())];
                    if error.is_timeout() {
                        metrics::counter!(PROBE_TIMEOUTS, &labels).increment(1);
                    }
                    metrics::counter!(PROBE_FAILURES, &labels).increment(1);
                    warn!("failed to probe delay of queue {}: {}", name, error);
                    None
                }
            }
        });

    join_all(probes).await.into_iter().flatten().collect()
}
