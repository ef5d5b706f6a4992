use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::models::job::{JobId, JobSnapshot};

/// Source of job status for the poller.
///
/// Implementations must be safe to call repeatedly for the same id.
#[async_trait]
pub trait JobStatusClient: Send + Sync {
    /// Fetch the current status of one job.
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobSnapshot, StatusQueryError>;
}

/// Client for the keyword backend's `/api/jobs` endpoints.
pub struct HttpJobStatusClient {
    http: Client,
    base_url: Url,
}

/// The backend answers unknown ids with 200 and an `error` body.
#[derive(Deserialize)]
#[serde(untagged)]
enum JobLookup {
    Missing { error: String },
    Found(Box<JobSnapshot>),
}

impl HttpJobStatusClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, StatusQueryError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| StatusQueryError::InvalidBaseUrl(base_url.to_string()))?;

        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("keyword-job-poller/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// `<base>/api/jobs/<segments...>`, each segment percent-encoded.
    fn jobs_url(&self, extra: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "jobs"])
                .extend(extra);
        }
        url
    }

    fn job_url(&self, job_id: &JobId) -> Url {
        self.jobs_url(&[job_id.as_str()])
    }

    /// Recent jobs, newest first (the "Jobs page" overview).
    pub async fn list_jobs(&self, limit: u32) -> Result<Vec<JobSnapshot>, StatusQueryError> {
        let response = self
            .http
            .get(self.jobs_url(&[]))
            .query(&[("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusQueryError::Listing { status });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| StatusQueryError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl JobStatusClient for HttpJobStatusClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobSnapshot, StatusQueryError> {
        let response = self.http.get(self.job_url(job_id)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StatusQueryError::NotFound(job_id.clone()));
        }
        if !status.is_success() {
            return Err(StatusQueryError::Status {
                job_id: job_id.clone(),
                status,
            });
        }

        let body = response.text().await?;
        match serde_json::from_str::<JobLookup>(&body) {
            Ok(JobLookup::Found(snapshot)) => Ok(*snapshot),
            Ok(JobLookup::Missing { error }) => {
                tracing::debug!(job_id = %job_id, error = %error, "Backend reported missing job");
                Err(StatusQueryError::NotFound(job_id.clone()))
            }
            Err(e) => Err(StatusQueryError::Malformed(format!(
                "job {}: {}",
                job_id, e
            ))),
        }
    }
}

/// A single status query failed. Always transient from the poller's view.
#[derive(Debug, thiserror::Error)]
pub enum StatusQueryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Job {job_id} status request returned {status}")]
    Status { job_id: JobId, status: StatusCode },

    #[error("Jobs overview request returned {status}")]
    Listing { status: StatusCode },

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Malformed job status response: {0}")]
    Malformed(String),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}
