use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::client::FireworqClient;
use crate::error::FetchError;

/// Raw counters of a single queue, as reported by `GET /queues/stats`.
///
/// All `total_*` fields are cumulative since the server started. `outstanding_jobs`,
/// `idle_workers` and `active_nodes` are instantaneous gauges.
/// Fields missing from the response are read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQueueCounters {
    #[serde(rename = "total_pushes")]
    pub pushes: i64,
    #[serde(rename = "total_pops")]
    pub pops: i64,
    #[serde(rename = "total_successes")]
    pub successes: i64,
    #[serde(rename = "total_failures")]
    pub failures: i64,
    #[serde(rename = "total_completes")]
    pub completes: i64,
    /// Cumulative time spent by completed jobs, in milliseconds.
    #[serde(rename = "total_elapsed")]
    pub elapsed_total: i64,
    pub outstanding_jobs: i64,
    pub total_workers: i64,
    pub idle_workers: i64,
    pub active_nodes: i64,
}

impl RawQueueCounters {
    /// A queue is active when at least one node is currently serving it.
    pub fn is_active(&self) -> bool {
        self.active_nodes >= 1
    }
}

/// Counters keyed by queue name.
pub type QueueCountersMap = HashMap<String, RawQueueCounters>;

impl FireworqClient {
    /// Fetch the counters of every queue known to the server.
    pub async fn fetch_counters(&self) -> Result<QueueCountersMap, FetchError> {
        let url = self.url(&["queues", "stats"]);
        self.get_json(url).await
    }
}
