//! Sample a Fireworq job-queue service and derive a snapshot of queue metrics from it.
pub mod aggregate;
pub mod client;
pub mod delay;
pub mod error;
pub mod jobs;
pub mod metrics_consts;
pub mod sanitize;
pub mod snapshot;
pub mod stats;

pub use aggregate::{aggregate, AggregateTotals};
pub use client::FireworqClient;
pub use delay::probe_delay;
pub use error::{ConfigError, FetchError};
pub use jobs::{JobDescriptor, JobPage, Sublist};
pub use sanitize::sanitize;
pub use snapshot::{MetricSnapshot, StatsCollector};
pub use stats::{QueueCountersMap, RawQueueCounters};
