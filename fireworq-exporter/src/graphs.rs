//! Graph definitions advertised to mackerel-agent: how the snapshot's metrics are grouped, labelled
//! and whether they are reported as-is or as a per-minute rate.
use std::collections::BTreeMap;

use fireworq_stats::aggregate::*;
use serde::Serialize;

/// Metric name matching every snapshot key of its graph.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Integer,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphMetric {
    pub name: &'static str,
    pub label: &'static str,
    /// Report the per-minute increase instead of the raw value.
    #[serde(skip)]
    pub diff: bool,
    pub stacked: bool,
}

impl GraphMetric {
    fn plain(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            diff: false,
            stacked: false,
        }
    }

    fn stacked(name: &'static str, label: &'static str) -> Self {
        Self {
            stacked: true,
            ..Self::plain(name, label)
        }
    }

    fn diff_stacked(name: &'static str, label: &'static str) -> Self {
        Self {
            diff: true,
            ..Self::stacked(name, label)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub label: String,
    pub unit: Unit,
    pub metrics: Vec<GraphMetric>,
}

pub fn graph_definition(label_prefix: &str) -> BTreeMap<&'static str, Graph> {
    let graph = |label: &str, unit: Unit, metrics: Vec<GraphMetric>| Graph {
        label: format!("{} {}", label_prefix, label),
        unit,
        metrics,
    };

    BTreeMap::from([
        (
            "node",
            graph(
                "Node",
                Unit::Integer,
                vec![
                    GraphMetric::plain(ACTIVE_NODES, "Active"),
                    GraphMetric::plain(ACTIVE_NODES_PERCENTAGE, "Active (%)"),
                ],
            ),
        ),
        (
            "queue.workers",
            graph(
                "Queue Workers",
                Unit::Integer,
                vec![
                    GraphMetric::stacked(QUEUE_IDLE_WORKERS, "Idle"),
                    GraphMetric::stacked(QUEUE_RUNNING_WORKERS, "Running"),
                ],
            ),
        ),
        (
            "queue.buffer",
            graph(
                "Queue Buffer",
                Unit::Integer,
                vec![GraphMetric::plain(QUEUE_OUTSTANDING_JOBS, "Outstanding Jobs")],
            ),
        ),
        (
            "queue.delay",
            graph(
                "Delayed Time in sec",
                Unit::Float,
                vec![GraphMetric::plain(WILDCARD, "%1")],
            ),
        ),
        (
            "jobs",
            graph(
                "Jobs",
                Unit::Integer,
                vec![
                    GraphMetric::diff_stacked(JOBS_FAILURE, "Failure"),
                    GraphMetric::diff_stacked(JOBS_SUCCESS, "Success"),
                    GraphMetric::diff_stacked(JOBS_OUTSTANDING, "Outstanding"),
                    GraphMetric::diff_stacked(JOBS_WAITING, "Waiting"),
                ],
            ),
        ),
        (
            "jobs.events",
            graph(
                "Job Events",
                Unit::Integer,
                vec![
                    GraphMetric::diff_stacked(JOBS_EVENTS_PUSHED, "Pushed"),
                    GraphMetric::diff_stacked(JOBS_EVENTS_POPPED, "Popped"),
                    GraphMetric::diff_stacked(JOBS_EVENTS_FAILED, "Failed"),
                    GraphMetric::diff_stacked(JOBS_EVENTS_SUCCEEDED, "Succeeded"),
                    GraphMetric::diff_stacked(JOBS_EVENTS_COMPLETED, "Completed"),
                ],
            ),
        ),
        (
            "jobs.elapsed",
            graph(
                "Elapsed Time Per Completed Job in ms",
                Unit::Integer,
                vec![GraphMetric::plain(JOBS_AVERAGE_ELAPSED_TIME, "Average")],
            ),
        ),
    ])
}
