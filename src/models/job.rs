use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Opaque identifier assigned by the job submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of a background collection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are never left once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// What the backend job is collecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    Expansion,
    Trends,
    CompetitorCrawl,
    #[serde(other)]
    Other,
}

/// Current state of one job as reported by `GET /api/jobs/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: JobId,
    #[serde(default)]
    pub job_type: Option<JobKind>,
    pub status: JobStatus,
    #[serde(default)]
    pub seed_keyword: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// Number of new keywords the job discovered; meaningful once completed.
    #[serde(default)]
    pub keywords_found: Option<u64>,
    /// Percentage estimate in `[0, 100]`.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl JobSnapshot {
    /// Minimal snapshot with only an id and a status.
    pub fn new(id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            job_type: None,
            status,
            seed_keyword: None,
            target: None,
            keywords_found: None,
            progress: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_keywords_found(mut self, count: u64) -> Self {
        self.keywords_found = Some(count);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Progress clamped into `[0, 100]`; missing or NaN counts as 0.
    pub fn progress_percent(&self) -> f64 {
        match self.progress {
            Some(p) if p.is_finite() => p.clamp(0.0, 100.0),
            _ => 0.0,
        }
    }
}

// The backend uses integer primary keys; keep them textual on this side.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<JobId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => JobId::new(s),
        RawId::Number(n) => JobId::from(n),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(JobStatus::from_str("running").unwrap(), JobStatus::Running);
        assert_eq!(JobStatus::Completed.to_string(), "completed");
        assert!(JobStatus::from_str("processing").is_err());
    }

    #[test]
    fn test_snapshot_from_backend_json() {
        let body = serde_json::json!({
            "id": 42,
            "job_type": "expansion",
            "status": "completed",
            "seed_keyword": "standing desk",
            "target": null,
            "keywords_found": 17,
            "progress": 100.0,
            "error_message": null,
            "started_at": "2026-03-01T10:00:00.123456",
            "completed_at": "2026-03-01T10:01:30",
            "created_at": "2026-03-01T09:59:59"
        });

        let snapshot: JobSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.id, JobId::new("42"));
        assert_eq!(snapshot.job_type, Some(JobKind::Expansion));
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.keywords_found, Some(17));
        assert!(snapshot.started_at.is_some());
    }

    #[test]
    fn test_unknown_job_type_is_tolerated() {
        let body = serde_json::json!({"id": "a1", "job_type": "serp_scrape", "status": "running"});
        let snapshot: JobSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.job_type, Some(JobKind::Other));
        assert_eq!(snapshot.progress_percent(), 0.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        let over = JobSnapshot::new("1", JobStatus::Running).with_progress(130.0);
        let under = JobSnapshot::new("2", JobStatus::Running).with_progress(-5.0);
        let nan = JobSnapshot::new("3", JobStatus::Running).with_progress(f64::NAN);
        assert_eq!(over.progress_percent(), 100.0);
        assert_eq!(under.progress_percent(), 0.0);
        assert_eq!(nan.progress_percent(), 0.0);
    }
}
