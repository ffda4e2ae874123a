//! Output in the mackerel-agent plugin format.
//!
//! mackerel-agent runs the plugin once per minute. Every run prints one `name\tvalue\ttimestamp`
//! line per metric, or the graph definitions when the agent asks for them. Counters graphed as
//! diffs are printed as a per-minute increase, computed against the values saved by the previous
//! run in a state file.
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use fireworq_stats::{ConfigError, FetchError, FireworqClient, MetricSnapshot, StatsCollector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::graphs::{graph_definition, Graph, WILDCARD};

/// Set by mackerel-agent when it wants the graph definitions instead of values.
pub const META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";
const META_HEADER: &str = "# mackerel-agent-plugin";

/// Diffs computed over a longer interval are meaningless, and are skipped.
const MAX_DIFF_INTERVAL_SECS: i64 = 600;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    FetchError(#[from] FetchError),
    #[error("failed to read state file {path}: {error}")]
    StateReadError { path: String, error: io::Error },
    #[error("failed to write state file {path}: {error}")]
    StateWriteError { path: String, error: io::Error },
    #[error("could not decode state file {path}: {error}")]
    StateDecodeError {
        path: String,
        error: serde_json::Error,
    },
    #[error("could not encode plugin output: {0}")]
    EncodeError(#[from] serde_json::Error),
    #[error("failed to write plugin output: {0}")]
    OutputError(io::Error),
}

/// The raw values of the previous run, and when they were sampled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffState {
    #[serde(rename = "_lastTime")]
    pub last_time: i64,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

pub fn load_state(path: &Path) -> Result<Option<DiffState>, ReportError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(ReportError::StateReadError {
                path: path.display().to_string(),
                error,
            })
        }
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|error| ReportError::StateDecodeError {
            path: path.display().to_string(),
            error,
        })
}

/// Replace the state file. The state is written next to it first, so a reader never sees a
/// partially written file.
pub fn save_state(path: &Path, state: &DiffState) -> Result<(), ReportError> {
    let contents = serde_json::to_vec(state)?;
    let partial = path.with_extension("partial");
    let write_error = |error| ReportError::StateWriteError {
        path: path.display().to_string(),
        error,
    };

    fs::write(&partial, contents).map_err(write_error)?;
    fs::rename(&partial, path).map_err(write_error)
}

/// Graph definitions, keyed by their prefixed name, in the format mackerel-agent expects.
pub fn render_meta(
    prefix: &str,
    graphs: &BTreeMap<&'static str, Graph>,
) -> Result<String, ReportError> {
    #[derive(Serialize)]
    struct Meta<'a> {
        graphs: BTreeMap<String, &'a Graph>,
    }

    let meta = Meta {
        graphs: graphs
            .iter()
            .map(|(key, graph)| (format!("{}.{}", prefix, key), graph))
            .collect(),
    };

    Ok(format!("{}\n{}", META_HEADER, serde_json::to_string(&meta)?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub lines: Vec<String>,
    /// To be saved for the next run.
    pub state: DiffState,
}

/// Render `snapshot` as plugin output lines, following the graph definitions.
/// Snapshot keys that no graph defines are not printed.
pub fn build_report(
    prefix: &str,
    graphs: &BTreeMap<&'static str, Graph>,
    snapshot: &MetricSnapshot,
    previous: Option<&DiffState>,
    now: i64,
) -> Report {
    let mut lines = Vec::new();

    for (graph_key, graph) in graphs {
        for metric in &graph.metrics {
            for (key, value) in graph_values(graph_key, metric.name, snapshot) {
                let value = if metric.diff {
                    match per_minute(key, value, previous, now) {
                        Some(value) => value,
                        None => continue,
                    }
                } else {
                    value
                };

                let name = if metric.name == WILDCARD {
                    format!("{}.{}", prefix, key)
                } else {
                    format!("{}.{}.{}", prefix, graph_key, key)
                };
                lines.push(format!("{}\t{}\t{}", name, value, now));
            }
        }
    }

    Report {
        lines,
        state: DiffState {
            last_time: now,
            values: snapshot.clone(),
        },
    }
}

/// The snapshot entries a graph metric refers to.
/// A wildcard refers to every key made of the graph key and one more name segment.
fn graph_values<'a>(
    graph_key: &str,
    metric_name: &str,
    snapshot: &'a MetricSnapshot,
) -> Vec<(&'a str, f64)> {
    if metric_name != WILDCARD {
        return snapshot
            .get_key_value(metric_name)
            .map(|(key, value)| (key.as_str(), *value))
            .into_iter()
            .collect();
    }

    let key_prefix = format!("{}.", graph_key);
    snapshot
        .iter()
        .filter(|(key, _)| {
            key.strip_prefix(&key_prefix).is_some_and(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            })
        })
        .map(|(key, value)| (key.as_str(), *value))
        .collect()
}

fn per_minute(key: &str, value: f64, previous: Option<&DiffState>, now: i64) -> Option<f64> {
    let previous = previous?;
    let last_value = previous.values.get(key)?;

    let elapsed = now - previous.last_time;
    if elapsed <= 0 || elapsed > MAX_DIFF_INTERVAL_SECS {
        debug!("skipping diff of {}: last value is {}s old", key, elapsed);
        return None;
    }

    let diff = (value - last_value) * 60.0 / elapsed as f64;
    if diff < 0.0 {
        debug!("skipping diff of {}: counter seems to have been reset", key);
        return None;
    }

    Some(diff)
}

/// Run the plugin once: print the graph definitions if `meta` is set, or else poll the server
/// and print the metrics.
pub async fn run<W: Write>(config: &Config, meta: bool, out: &mut W) -> Result<(), ReportError> {
    let prefix = &config.metric_key_prefix;
    let graphs = graph_definition(&config.label_prefix());

    if meta {
        let meta = render_meta(prefix, &graphs)?;
        return writeln!(out, "{}", meta).map_err(ReportError::OutputError);
    }

    let client = FireworqClient::new(&config.base_url(), config.request_timeout.0)?;
    let snapshot = StatsCollector::new(client).build_snapshot().await?;

    let path = config.tempfile_path();
    let previous = load_state(&path).unwrap_or_else(|error| {
        warn!("ignoring previous values: {}", error);
        None
    });

    let now = chrono::Utc::now().timestamp();
    let report = build_report(prefix, &graphs, &snapshot, previous.as_ref(), now);

    for line in &report.lines {
        writeln!(out, "{}", line).map_err(ReportError::OutputError)?;
    }

    save_state(&path, &report.state)
}
