use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::client::FireworqClient;
use crate::error::FetchError;

/// The per-queue job lists we can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sublist {
    /// Jobs not yet picked up by any worker.
    Waiting,
    /// Jobs picked up by a worker but not completed yet.
    Grabbed,
}

impl Sublist {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sublist::Waiting => "waiting",
            Sublist::Grabbed => "grabbed",
        }
    }
}

impl fmt::Display for Sublist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as described by the inspection API. We only ever read `next_try` from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobDescriptor {
    pub id: u64,
    pub category: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub next_try: DateTime<Utc>,
    #[serde(default)]
    pub timeout: u64,
    pub fail_count: u64,
    pub max_retries: u64,
    #[serde(default)]
    pub retry_delay: u64,
}

/// A page of jobs, in the order requested from the server, plus the cursor to the next page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub jobs: Vec<JobDescriptor>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl JobPage {
    /// Consume the page, keeping only its first job.
    pub fn into_head(self) -> Option<JobDescriptor> {
        self.jobs.into_iter().next()
    }
}

// The server encodes an empty job list as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<JobDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<JobDescriptor>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FireworqClient {
    /// Fetch the earliest job of `sublist` in `queue`, if there is any.
    pub async fn fetch_head_job(
        &self,
        queue: &str,
        sublist: Sublist,
    ) -> Result<Option<JobDescriptor>, FetchError> {
        let mut url = self.url(&["queue", queue, sublist.as_str()]);
        url.query_pairs_mut()
            .append_pair("order", "asc")
            .append_pair("limit", "1");

        let page: JobPage = self.get_json(url).await?;

        Ok(page.into_head())
    }
}
