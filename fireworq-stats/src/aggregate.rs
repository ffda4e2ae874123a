use std::ops::Add;

use crate::snapshot::MetricSnapshot;
use crate::stats::{QueueCountersMap, RawQueueCounters};

pub const QUEUE_RUNNING_WORKERS: &str = "queue_running_workers";
pub const QUEUE_IDLE_WORKERS: &str = "queue_idle_workers";
pub const QUEUE_OUTSTANDING_JOBS: &str = "queue_outstanding_jobs";
pub const JOBS_FAILURE: &str = "jobs_failure";
pub const JOBS_SUCCESS: &str = "jobs_success";
pub const JOBS_OUTSTANDING: &str = "jobs_outstanding";
pub const JOBS_WAITING: &str = "jobs_waiting";
pub const JOBS_EVENTS_PUSHED: &str = "jobs_events_pushed";
pub const JOBS_EVENTS_POPPED: &str = "jobs_events_popped";
pub const JOBS_EVENTS_FAILED: &str = "jobs_events_failed";
pub const JOBS_EVENTS_SUCCEEDED: &str = "jobs_events_succeeded";
pub const JOBS_EVENTS_COMPLETED: &str = "jobs_events_completed";
pub const JOBS_AVERAGE_ELAPSED_TIME: &str = "jobs_average_elapsed_time";
pub const ACTIVE_NODES: &str = "active_nodes";
pub const ACTIVE_NODES_PERCENTAGE: &str = "active_nodes_percentage";

impl Add for RawQueueCounters {
    type Output = RawQueueCounters;

    fn add(self, other: RawQueueCounters) -> RawQueueCounters {
        RawQueueCounters {
            pushes: self.pushes.saturating_add(other.pushes),
            pops: self.pops.saturating_add(other.pops),
            successes: self.successes.saturating_add(other.successes),
            failures: self.failures.saturating_add(other.failures),
            completes: self.completes.saturating_add(other.completes),
            elapsed_total: self.elapsed_total.saturating_add(other.elapsed_total),
            outstanding_jobs: self.outstanding_jobs.saturating_add(other.outstanding_jobs),
            total_workers: self.total_workers.saturating_add(other.total_workers),
            idle_workers: self.idle_workers.saturating_add(other.idle_workers),
            active_nodes: self.active_nodes.saturating_add(other.active_nodes),
        }
    }
}

/// Process-wide totals: the sum of every queue's counters, plus the number of queues summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateTotals {
    pub totals: RawQueueCounters,
    pub queue_count: usize,
}

/// Sum the counters of every queue. An empty map sums to all-zero totals.
pub fn aggregate(counters: &QueueCountersMap) -> AggregateTotals {
    counters
        .values()
        .fold(AggregateTotals::default(), |acc, queue| AggregateTotals {
            totals: acc.totals + *queue,
            queue_count: acc.queue_count + 1,
        })
}

impl AggregateTotals {
    pub fn running_workers(&self) -> i64 {
        self.totals.total_workers.saturating_sub(self.totals.idle_workers)
    }

    /// Jobs that completed without succeeding. This is job-level, unlike `failures`, which
    /// counts every failed attempt.
    pub fn jobs_failure(&self) -> i64 {
        self.totals.completes.saturating_sub(self.totals.successes)
    }

    /// Jobs popped by a worker that haven't completed yet.
    pub fn jobs_outstanding(&self) -> i64 {
        self.totals.pops.saturating_sub(self.totals.completes)
    }

    /// Jobs pushed but not popped yet. Pops can transiently outnumber pushes, in which case
    /// nothing is waiting.
    pub fn jobs_waiting(&self) -> i64 {
        self.totals.pushes.saturating_sub(self.totals.pops).max(0)
    }

    /// Mean time spent per completed job, or 0 before any job completed.
    pub fn average_elapsed_time(&self) -> f64 {
        if self.totals.completes > 0 {
            self.totals.elapsed_total as f64 / self.totals.completes as f64
        } else {
            0.0
        }
    }

    /// Active nodes relative to the number of queues, inactive queues included.
    /// 0 when the server has no queues.
    pub fn active_nodes_percentage(&self) -> f64 {
        if self.queue_count > 0 {
            (self.totals.active_nodes as f64 * 100.0) / self.queue_count as f64
        } else {
            0.0
        }
    }

    /// Every derived metric, keyed by metric name.
    pub fn to_metrics(&self) -> MetricSnapshot {
        let totals = &self.totals;

        [
            (QUEUE_RUNNING_WORKERS, self.running_workers() as f64),
            (QUEUE_IDLE_WORKERS, totals.idle_workers as f64),
            (QUEUE_OUTSTANDING_JOBS, totals.outstanding_jobs as f64),
            (JOBS_FAILURE, self.jobs_failure() as f64),
            (JOBS_SUCCESS, totals.successes as f64),
            (JOBS_OUTSTANDING, self.jobs_outstanding() as f64),
            (JOBS_WAITING, self.jobs_waiting() as f64),
            (JOBS_EVENTS_PUSHED, totals.pushes as f64),
            (JOBS_EVENTS_POPPED, totals.pops as f64),
            (JOBS_EVENTS_FAILED, totals.failures as f64),
            (JOBS_EVENTS_SUCCEEDED, totals.successes as f64),
            (JOBS_EVENTS_COMPLETED, totals.completes as f64),
            (JOBS_AVERAGE_ELAPSED_TIME, self.average_elapsed_time()),
            (ACTIVE_NODES, totals.active_nodes as f64),
            (ACTIVE_NODES_PERCENTAGE, self.active_nodes_percentage()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(pushes: i64, pops: i64, active_nodes: i64) -> RawQueueCounters {
        RawQueueCounters {
            pushes,
            pops,
            active_nodes,
            ..Default::default()
        }
    }

    fn scenario() -> RawQueueCounters {
        RawQueueCounters {
            pushes: 10,
            pops: 7,
            successes: 5,
            failures: 1,
            completes: 6,
            elapsed_total: 600,
            outstanding_jobs: 2,
            total_workers: 4,
            idle_workers: 1,
            active_nodes: 1,
        }
    }

    #[test]
    fn test_empty_map_aggregates_to_zero() {
        let totals = aggregate(&QueueCountersMap::new());

        assert_eq!(totals, AggregateTotals::default());
        assert_eq!(totals.average_elapsed_time(), 0.0);
        assert_eq!(totals.active_nodes_percentage(), 0.0);

        let metrics = totals.to_metrics();
        assert_eq!(metrics.len(), 15);
        assert!(metrics.values().all(|value| *value == 0.0));
    }

    #[test]
    fn test_single_queue_metrics() {
        let map = QueueCountersMap::from([("default".to_owned(), scenario())]);
        let metrics = aggregate(&map).to_metrics();

        assert_eq!(metrics[JOBS_AVERAGE_ELAPSED_TIME], 100.0);
        assert_eq!(metrics[JOBS_WAITING], 3.0);
        assert_eq!(metrics[JOBS_OUTSTANDING], 1.0);
        assert_eq!(metrics[QUEUE_RUNNING_WORKERS], 3.0);
        assert_eq!(metrics[ACTIVE_NODES_PERCENTAGE], 100.0);
        assert_eq!(metrics[JOBS_FAILURE], 1.0);
        assert_eq!(metrics[JOBS_SUCCESS], 5.0);
        assert_eq!(metrics[JOBS_EVENTS_FAILED], 1.0);
        assert_eq!(metrics[QUEUE_IDLE_WORKERS], 1.0);
        assert_eq!(metrics[QUEUE_OUTSTANDING_JOBS], 2.0);
        assert_eq!(metrics[ACTIVE_NODES], 1.0);
    }

    #[test]
    fn test_counters_are_summed_across_queues() {
        let map = QueueCountersMap::from([
            ("a".to_owned(), scenario()),
            ("b".to_owned(), scenario()),
            ("c".to_owned(), counters(1, 0, 0)),
        ]);
        let totals = aggregate(&map);

        assert_eq!(totals.queue_count, 3);
        assert_eq!(totals.totals.pushes, 21);
        assert_eq!(totals.totals.elapsed_total, 1200);
        assert_eq!(totals.average_elapsed_time(), 100.0);
        // Two active nodes over three queues.
        assert!((totals.active_nodes_percentage() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_jobs_waiting_is_never_negative() {
        for (pushes, pops) in [(0, 0), (3, 5), (5, 3), (0, 1), (100, 100)] {
            let map = QueueCountersMap::from([("q".to_owned(), counters(pushes, pops, 0))]);
            assert_eq!(aggregate(&map).jobs_waiting(), (pushes - pops).max(0));
        }
    }

    #[test]
    fn test_no_completes_means_no_average() {
        let map = QueueCountersMap::from([(
            "q".to_owned(),
            RawQueueCounters {
                elapsed_total: 1000,
                ..Default::default()
            },
        )]);

        assert_eq!(aggregate(&map).average_elapsed_time(), 0.0);
    }

    #[test]
    fn test_signed_differences_are_kept() {
        let map = QueueCountersMap::from([(
            "q".to_owned(),
            RawQueueCounters {
                successes: 4,
                completes: 3,
                pops: 2,
                total_workers: 1,
                idle_workers: 2,
                ..Default::default()
            },
        )]);
        let totals = aggregate(&map);

        assert_eq!(totals.jobs_failure(), -1);
        assert_eq!(totals.jobs_outstanding(), -1);
        assert_eq!(totals.running_workers(), -1);
    }

    #[test]
    fn test_sums_saturate() {
        let map = QueueCountersMap::from([
            ("a".to_owned(), counters(i64::MAX, 0, 0)),
            ("b".to_owned(), counters(1, 0, 0)),
        ]);

        assert_eq!(aggregate(&map).totals.pushes, i64::MAX);
    }
}
