use std::time::Duration;

use fireworq_stats::{ConfigError, FetchError, FireworqClient, StatsCollector};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::Config;
use crate::health::{HealthHandle, HealthRegistry};
use crate::publish::publish_snapshot;

pub struct AppContext {
    pub collector: StatsCollector,
    pub health: HealthRegistry,
    pub poller_liveness: HealthHandle,
    pub metric_key_prefix: String,
    pub poll_interval: Duration,
    /// Serve the Prometheus endpoint. It installs a global recorder, so tests disable it.
    pub metrics: bool,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let client = FireworqClient::new(&config.base_url(), config.request_timeout.0)?;
        let poll_interval = config.poll_interval();

        let health = HealthRegistry::new("liveness");
        let poller_liveness = health.register(
            "poller",
            time::Duration::seconds(poll_interval.as_secs() as i64 * 4),
        );

        Ok(Self {
            collector: StatsCollector::new(client),
            health,
            poller_liveness,
            metric_key_prefix: config.metric_key_prefix.clone(),
            poll_interval,
            metrics: true,
        })
    }

    /// Poll once and publish the snapshot. Nothing is published when the poll fails.
    pub async fn run_once(&self) -> Result<usize, FetchError> {
        let snapshot = self.collector.build_snapshot().await?;
        publish_snapshot(&self.metric_key_prefix, &snapshot);
        Ok(snapshot.len())
    }

    pub async fn poll_loop(&self) {
        info!(
            "polling {} every {:?}",
            self.collector.client().base_url(),
            self.poll_interval
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.run_once().await {
                Ok(published) => info!("published {} metrics", published),
                Err(e) => error!("poll failed with: {}", e),
            }
            // A failed poll is reported through metrics, the loop itself is still alive.
            self.poller_liveness.report_healthy();
        }
    }
}
