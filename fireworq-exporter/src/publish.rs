use fireworq_stats::snapshot::DELAY_KEY_PREFIX;
use fireworq_stats::MetricSnapshot;
use metrics::gauge;

pub const QUEUE_DELAY_SECONDS: &str = "queue_delay_seconds";
pub const LAST_POLL_TIMESTAMP: &str = "last_poll_timestamp_seconds";

/// Prometheus metric names only allow ASCII alphanumerics, underscores and colons.
fn metric_name(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Set one gauge per snapshot entry. Queue delays share a single gauge labelled by queue.
pub fn publish_snapshot(prefix: &str, snapshot: &MetricSnapshot) {
    for (key, value) in snapshot {
        match key.strip_prefix(DELAY_KEY_PREFIX) {
            Some(queue) => {
                gauge!(metric_name(prefix, QUEUE_DELAY_SECONDS), "queue" => queue.to_owned())
                    .set(*value)
            }
            None => gauge!(metric_name(prefix, key)).set(*value),
        }
    }

    gauge!(metric_name(prefix, LAST_POLL_TIMESTAMP)).set(get_current_timestamp_seconds());
}

/// Returns the number of seconds since the Unix epoch, to use in prom gauges.
/// Saturates to zero if the system time is set before epoch.
pub fn get_current_timestamp_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as f64
}
