use thiserror::Error;

/// Enumeration of errors that can happen while reading from the queue service.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed with: {error}")]
    TransportError { url: String, error: reqwest::Error },
    #[error("could not decode response from {url}: {error}")]
    DecodeError {
        url: String,
        error: serde_json::Error,
    },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::TransportError { error, .. } => error.is_timeout(),
            FetchError::DecodeError { .. } => false,
        }
    }
}

/// Enumeration of errors related to building a client for the queue service.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{url} is not a valid base url: {error}")]
    InvalidBaseUrl {
        url: String,
        error: url::ParseError,
    },
    #[error("{0} cannot be used as a base url")]
    CannotBeABase(String),
    #[error("failed to construct http client: {0}")]
    ClientBuildError(reqwest::Error),
}
