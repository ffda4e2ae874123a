pub const POLL_STARTS: &str = "fireworq_stats_poll_starts";
pub const POLL_FAILURES: &str = "fireworq_stats_poll_failures";
pub const POLL_TIME: &str = "fireworq_stats_poll_ms";

// Labelled by queue
pub const PROBE_FAILURES: &str = "fireworq_stats_delay_probe_failures";
pub const PROBE_TIMEOUTS: &str = "fireworq_stats_delay_probe_timeouts";
