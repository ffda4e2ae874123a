use std::time;

use reqwest::header;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ConfigError, FetchError};

const USER_AGENT: &str = "Fireworq Stats Collector";

/// A thin client over the read-only inspection endpoints of a Fireworq server.
///
/// Every request shares the same `reqwest::Client`, and therefore the same per-request timeout.
/// A request that does not complete within the timeout fails with a `FetchError::TransportError`.
#[derive(Clone, Debug)]
pub struct FireworqClient {
    base: Url,
    client: reqwest::Client,
}

impl FireworqClient {
    pub fn new(base_url: &str, request_timeout: time::Duration) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url).map_err(|error| ConfigError::InvalidBaseUrl {
            url: base_url.to_owned(),
            error,
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase(base_url.to_owned()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(ConfigError::ClientBuildError)?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append `segments` to the path of the base url.
    /// Each segment is percent-encoded, so a queue name containing '/' or '#' stays a single segment.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Can't fail: cannot-be-a-base urls are rejected in new.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue a GET request and decode the JSON body of the response.
    /// Non-2xx responses are reported as transport errors, as their bodies are not expected to decode.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| FetchError::TransportError {
                url: url.to_string(),
                error,
            })?;

        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::TransportError {
                url: url.to_string(),
                error,
            })?;

        serde_json::from_slice(&body).map_err(|error| FetchError::DecodeError {
            url: url.to_string(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> FireworqClient {
        FireworqClient::new(base_url, time::Duration::from_secs(1)).expect("valid base url")
    }

    #[test]
    fn test_url_appends_segments() {
        let client = client("http://localhost:8080");
        assert_eq!(
            client.url(&["queues", "stats"]).as_str(),
            "http://localhost:8080/queues/stats"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = client("http://localhost:8080/fireworq/");
        assert_eq!(
            client.url(&["queues", "stats"]).as_str(),
            "http://localhost:8080/fireworq/queues/stats"
        );
    }

    #[test]
    fn test_url_encodes_queue_names() {
        let client = client("http://localhost:8080");
        assert_eq!(
            client.url(&["queue", "a/b#1", "waiting"]).as_str(),
            "http://localhost:8080/queue/a%2Fb%231/waiting"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = FireworqClient::new("not a url", time::Duration::from_secs(1));
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));

        let result = FireworqClient::new("mailto:ops@example.com", time::Duration::from_secs(1));
        assert!(matches!(result, Err(ConfigError::CannotBeABase(_))));
    }
}
