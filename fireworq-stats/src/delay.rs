use chrono::{DateTime, Utc};

use crate::client::FireworqClient;
use crate::error::FetchError;
use crate::jobs::{JobDescriptor, Sublist};

/// Find the job that has been pending the longest in `queue`.
///
/// Jobs that haven't been picked up yet are the likeliest to have waited the longest, so the head
/// of the waiting list is checked first. Only when that list is empty do we look at the jobs
/// grabbed by a worker but not completed yet.
pub async fn fetch_most_delayed_job(
    client: &FireworqClient,
    queue: &str,
) -> Result<Option<JobDescriptor>, FetchError> {
    if let Some(job) = client.fetch_head_job(queue, Sublist::Waiting).await? {
        return Ok(Some(job));
    }

    client.fetch_head_job(queue, Sublist::Grabbed).await
}

/// Seconds elapsed between the job's next try and `now`.
/// Negative when the job is scheduled to be tried in the future; the value is not clamped.
pub fn delay_seconds(job: &JobDescriptor, now: DateTime<Utc>) -> f64 {
    now.signed_duration_since(job.next_try).num_milliseconds() as f64 / 1000.0
}

/// Estimate for how long, in seconds, the most delayed job of `queue` has been waiting.
/// A queue with no waiting nor grabbed jobs has a delay of 0.
pub async fn probe_delay(client: &FireworqClient, queue: &str) -> Result<f64, FetchError> {
    let delay = fetch_most_delayed_job(client, queue)
        .await?
        .map_or(0.0, |job| delay_seconds(&job, Utc::now()));

    Ok(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job_with_next_try(next_try: DateTime<Utc>) -> JobDescriptor {
        JobDescriptor {
            id: 1,
            category: "test".to_owned(),
            url: "http://localhost/work".to_owned(),
            payload: None,
            status: "claimed".to_owned(),
            created_at: next_try,
            next_try,
            timeout: 0,
            fail_count: 0,
            max_retries: 0,
            retry_delay: 0,
        }
    }

    #[test]
    fn test_delay_of_past_job() {
        let now = Utc::now();
        let job = job_with_next_try(now - Duration::seconds(30));

        assert_eq!(delay_seconds(&job, now), 30.0);
    }

    #[test]
    fn test_delay_of_future_job_is_negative() {
        let now = Utc::now();
        let job = job_with_next_try(now + Duration::milliseconds(1500));

        assert_eq!(delay_seconds(&job, now), -1.5);
    }
}
