use serde::Serialize;
use std::fmt;

use crate::models::job::JobId;

/// Intermediate progress computed for one non-final tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub label: String,
    pub attempt: u32,
    /// Mean progress over the jobs that answered this tick.
    pub average_progress: f64,
    /// Jobs seen in a terminal state this tick.
    pub terminal: usize,
    pub total: usize,
    /// Jobs whose status query failed this tick.
    pub unreachable: usize,
}

/// A tracked job that ended `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub job_id: JobId,
    pub message: String,
}

/// Aggregate result once every tracked job is terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub completed: usize,
    pub failed: usize,
    /// Sum of `keywords_found` over completed jobs.
    pub keywords_found: u64,
    pub failures: Vec<JobFailure>,
}

impl CompletionSummary {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// How a poll session resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    Converged(CompletionSummary),
    TimedOut {
        attempts: u32,
        last_progress: Option<ProgressReport>,
    },
    Cancelled {
        attempts: u32,
    },
}

impl PollOutcome {
    /// Label used for the `outcome` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            PollOutcome::Converged(_) => "converged",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::Cancelled { .. } => "cancelled",
        }
    }

    pub fn summary(&self) -> Option<&CompletionSummary> {
        match self {
            PollOutcome::Converged(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Coarse state carried by a [`StatusUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Running,
    Succeeded,
    /// Some jobs completed, at least one failed.
    PartiallyFailed,
    /// Every job failed.
    Failed,
    TimedOut,
    Cancelled,
}

/// Message delivered to a status sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusUpdate {
    Progress(ProgressReport),
    Succeeded {
        label: String,
        summary: CompletionSummary,
    },
    /// All jobs are terminal and at least one of them failed.
    Failed {
        label: String,
        summary: CompletionSummary,
    },
    TimedOut {
        label: String,
        attempts: u32,
    },
    Cancelled {
        label: String,
    },
}

impl StatusUpdate {
    pub fn state(&self) -> SessionState {
        match self {
            StatusUpdate::Progress(_) => SessionState::Running,
            StatusUpdate::Succeeded { .. } => SessionState::Succeeded,
            StatusUpdate::Failed { summary, .. } if summary.completed == 0 => SessionState::Failed,
            StatusUpdate::Failed { .. } => SessionState::PartiallyFailed,
            StatusUpdate::TimedOut { .. } => SessionState::TimedOut,
            StatusUpdate::Cancelled { .. } => SessionState::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state() != SessionState::Running
    }

    /// Terminal update matching a resolved outcome.
    pub fn from_outcome(label: &str, outcome: &PollOutcome) -> Self {
        match outcome {
            PollOutcome::Converged(summary) if summary.all_succeeded() => {
                StatusUpdate::Succeeded {
                    label: label.to_string(),
                    summary: summary.clone(),
                }
            }
            PollOutcome::Converged(summary) => StatusUpdate::Failed {
                label: label.to_string(),
                summary: summary.clone(),
            },
            PollOutcome::TimedOut { attempts, .. } => StatusUpdate::TimedOut {
                label: label.to_string(),
                attempts: *attempts,
            },
            PollOutcome::Cancelled { .. } => StatusUpdate::Cancelled {
                label: label.to_string(),
            },
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::Progress(p) => write!(
                f,
                "Expanding {}... {}% ({}/{} done)",
                p.label,
                p.average_progress.round(),
                p.terminal,
                p.total
            ),
            StatusUpdate::Succeeded { label, summary } => write!(
                f,
                "Done! Discovered {} new keywords from {}",
                summary.keywords_found, label
            ),
            StatusUpdate::Failed { label, summary } if summary.completed == 0 => {
                match summary.failures.as_slice() {
                    [only] => write!(f, "Failed: {}", only.message),
                    _ => write!(f, "Failed: {} ({})", label, failure_reasons(summary)),
                }
            }
            StatusUpdate::Failed { label, summary } => write!(
                f,
                "Done! Discovered {} new keywords from {} ({} failed: {})",
                summary.keywords_found,
                label,
                summary.failed,
                failure_reasons(summary)
            ),
            StatusUpdate::TimedOut { label, .. } => {
                write!(f, "Jobs still running for {}. Check the Jobs page.", label)
            }
            StatusUpdate::Cancelled { label } => write!(f, "Stopped tracking {}", label),
        }
    }
}

fn failure_reasons(summary: &CompletionSummary) -> String {
    summary
        .failures
        .iter()
        .map(|fail| format!("#{}: {}", fail.job_id, fail.message))
        .collect::<Vec<_>>()
        .join("; ")
}
