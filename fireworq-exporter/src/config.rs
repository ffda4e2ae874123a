use std::path::PathBuf;
use std::str::FromStr;
use std::time;

use envconfig::Envconfig;
use tracing::Level;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "FIREWORQ_SCHEME", default = "http")]
    pub fireworq_scheme: String,

    #[envconfig(from = "FIREWORQ_HOST", default = "localhost")]
    pub fireworq_host: String,

    #[envconfig(from = "FIREWORQ_PORT", default = "8080")]
    pub fireworq_port: u16,

    #[envconfig(from = "METRIC_KEY_PREFIX", default = "fireworq")]
    pub metric_key_prefix: String,

    #[envconfig(from = "METRIC_LABEL_PREFIX")]
    pub metric_label_prefix: Option<String>,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "POLL_INTERVAL_SECS", default = "60")]
    pub poll_interval_secs: u64,

    #[envconfig(from = "MODE", default = "serve")]
    pub mode: Mode,

    #[envconfig(from = "TEMPFILE")]
    pub tempfile: Option<PathBuf>,

    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3310")]
    pub port: u16,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: Level,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The root url of the Fireworq server we poll.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.fireworq_scheme, self.fireworq_host, self.fireworq_port
        )
    }

    /// At least one second: a zero interval would poll in a busy loop.
    pub fn poll_interval(&self) -> time::Duration {
        time::Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Graph labels are prefixed with the configured label prefix, or else with the title-cased
    /// metric key prefix.
    pub fn label_prefix(&self) -> String {
        match &self.metric_label_prefix {
            Some(prefix) if !prefix.is_empty() => prefix.clone(),
            _ => title_case(&self.metric_key_prefix),
        }
    }

    /// Where previous values are kept between two runs in mackerel mode.
    pub fn tempfile_path(&self) -> PathBuf {
        match &self.tempfile {
            Some(path) => path.clone(),
            None => std::env::temp_dir().join(format!(
                "mackerel-plugin-fireworq-{}-{}",
                self.fireworq_host, self.fireworq_port
            )),
        }
    }
}

/// Upper-case the first letter of every word.
fn title_case(s: &str) -> String {
    let mut previous_is_word = false;
    s.chars()
        .map(|c| {
            let c = if previous_is_word {
                c
            } else {
                c.to_ascii_uppercase()
            };
            previous_is_word = c.is_alphanumeric() || c == '_';
            c
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Poll on an interval and expose the latest snapshot as Prometheus gauges.
    Serve,
    /// Poll once and print the snapshot in the mackerel-agent plugin format.
    Mackerel,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseModeError(String);

impl std::fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid mode, must be serve or mackerel", self.0)
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "serve" => Ok(Mode::Serve),
            "mackerel" => Ok(Mode::Mackerel),
            _ => Err(ParseModeError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl std::fmt::Display for ParseEnvMsDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("duration must be a number of milliseconds")
    }
}

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::init_from_hashmap(&vars).expect("invalid configuration")
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);

        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.metric_key_prefix, "fireworq");
        assert_eq!(config.label_prefix(), "Fireworq");
        assert_eq!(config.request_timeout.0, time::Duration::from_millis(5000));
        assert_eq!(config.poll_interval(), time::Duration::from_secs(60));
        assert_eq!(config.mode, Mode::Serve);
        assert_eq!(config.bind(), ":::3310");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(
            config.tempfile_path(),
            std::env::temp_dir().join("mackerel-plugin-fireworq-localhost-8080")
        );
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("FIREWORQ_SCHEME", "https"),
            ("FIREWORQ_HOST", "queue.internal"),
            ("FIREWORQ_PORT", "443"),
            ("METRIC_KEY_PREFIX", "jobs"),
            ("METRIC_LABEL_PREFIX", "Job Queue"),
            ("MODE", "Mackerel"),
            ("TEMPFILE", "/var/tmp/fireworq.json"),
        ]);

        assert_eq!(config.base_url(), "https://queue.internal:443");
        assert_eq!(config.label_prefix(), "Job Queue");
        assert_eq!(config.mode, Mode::Mackerel);
        assert_eq!(
            config.tempfile_path(),
            PathBuf::from("/var/tmp/fireworq.json")
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let vars = HashMap::from([("MODE".to_owned(), "daemon".to_owned())]);
        assert!(Config::init_from_hashmap(&vars).is_err());

        let vars = HashMap::from([("REQUEST_TIMEOUT_MS".to_owned(), "5s".to_owned())]);
        assert!(Config::init_from_hashmap(&vars).is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("fireworq"), "Fireworq");
        assert_eq!(title_case("fireworq-prod queue"), "Fireworq-Prod Queue");
        assert_eq!(title_case("my_queue"), "My_queue");
        assert_eq!(title_case(""), "");
    }
}
