//! Per-tick aggregation over the status of every tracked job.
//!
//! Each job's query result is considered on its own: a failed query only
//! removes that job from the current tick, it never hides the others.

use crate::models::job::{JobSnapshot, JobStatus};
use crate::models::outcome::{CompletionSummary, JobFailure, ProgressReport};
use crate::services::status_client::StatusQueryError;

/// Shown when a failed job carries no error message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// What one tick's results amount to.
#[derive(Debug, Clone, PartialEq)]
pub enum TickAssessment {
    /// Every query answered and every job is terminal.
    Converged(CompletionSummary),
    /// Some jobs still running, or some queries failed.
    InProgress(ProgressReport),
    /// No query answered; nothing to report this tick.
    NoData,
}

/// Fold the per-job results of a single tick.
pub fn assess_tick(
    label: &str,
    attempt: u32,
    results: &[Result<JobSnapshot, StatusQueryError>],
) -> TickAssessment {
    let answered: Vec<&JobSnapshot> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    if answered.is_empty() {
        return TickAssessment::NoData;
    }

    let unreachable = results.len() - answered.len();
    let terminal = answered.iter().filter(|s| s.status.is_terminal()).count();

    if unreachable == 0 && terminal == results.len() {
        return TickAssessment::Converged(summarize(&answered));
    }

    let average_progress =
        answered.iter().map(|s| s.progress_percent()).sum::<f64>() / answered.len() as f64;

    TickAssessment::InProgress(ProgressReport {
        label: label.to_string(),
        attempt,
        average_progress,
        terminal,
        total: results.len(),
        unreachable,
    })
}

fn summarize(snapshots: &[&JobSnapshot]) -> CompletionSummary {
    let mut summary = CompletionSummary::default();
    for snapshot in snapshots {
        match snapshot.status {
            JobStatus::Completed => {
                summary.completed += 1;
                summary.keywords_found = summary
                    .keywords_found
                    .saturating_add(snapshot.keywords_found.unwrap_or(0));
            }
            JobStatus::Failed => {
                summary.failed += 1;
                summary.failures.push(JobFailure {
                    job_id: snapshot.id.clone(),
                    message: snapshot
                        .error_message
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
                });
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobId;

    fn running(id: &str, progress: f64) -> Result<JobSnapshot, StatusQueryError> {
        Ok(JobSnapshot::new(id, JobStatus::Running).with_progress(progress))
    }

    fn completed(id: &str, found: u64) -> Result<JobSnapshot, StatusQueryError> {
        Ok(JobSnapshot::new(id, JobStatus::Completed)
            .with_progress(100.0)
            .with_keywords_found(found))
    }

    fn missing(id: &str) -> Result<JobSnapshot, StatusQueryError> {
        Err(StatusQueryError::NotFound(JobId::new(id)))
    }

    #[test]
    fn test_average_progress_over_running_jobs() {
        let results = vec![running("A", 10.0), running("B", 0.0), running("C", 20.0)];
        match assess_tick("topics", 1, &results) {
            TickAssessment::InProgress(report) => {
                assert_eq!(report.average_progress, 10.0);
                assert_eq!(report.terminal, 0);
                assert_eq!(report.total, 3);
            }
            other => panic!("expected progress, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_progress_counts_as_zero() {
        let results = vec![
            Ok(JobSnapshot::new("A", JobStatus::Pending)),
            running("B", 50.0),
        ];
        let TickAssessment::InProgress(report) = assess_tick("x", 1, &results) else {
            panic!("expected progress");
        };
        assert_eq!(report.average_progress, 25.0);
    }

    #[test]
    fn test_mixed_terminal_converges_and_skips_failed_counts() {
        let results = vec![
            completed("A", 5),
            Ok(JobSnapshot::new("C", JobStatus::Failed)
                .with_keywords_found(40)
                .with_error("timeout")),
            completed("B", 3),
        ];
        let TickAssessment::Converged(summary) = assess_tick("x", 3, &results) else {
            panic!("expected convergence");
        };
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.keywords_found, 8);
        assert_eq!(summary.failures[0].message, "timeout");
    }

    #[test]
    fn test_completed_without_count_contributes_zero() {
        let results = vec![Ok(JobSnapshot::new("A", JobStatus::Completed)), completed("B", 4)];
        let TickAssessment::Converged(summary) = assess_tick("x", 1, &results) else {
            panic!("expected convergence");
        };
        assert_eq!(summary.keywords_found, 4);
    }

    #[test]
    fn test_failed_query_blocks_convergence_but_not_progress() {
        let results = vec![completed("A", 5), missing("B")];
        let TickAssessment::InProgress(report) = assess_tick("x", 2, &results) else {
            panic!("expected progress");
        };
        assert_eq!(report.terminal, 1);
        assert_eq!(report.total, 2);
        assert_eq!(report.unreachable, 1);
        assert_eq!(report.average_progress, 100.0);
    }

    #[test]
    fn test_keyword_total_saturates_instead_of_overflowing() {
        let results = vec![completed("A", u64::MAX), completed("B", 1)];
        let TickAssessment::Converged(summary) = assess_tick("x", 1, &results) else {
            panic!("expected convergence");
        };
        assert_eq!(summary.keywords_found, u64::MAX);
        assert_eq!(summary.completed, 2);
    }

    #[test]
    fn test_all_queries_failed_is_no_data() {
        let results = vec![missing("A"), missing("B")];
        assert_eq!(assess_tick("x", 1, &results), TickAssessment::NoData);
    }

    #[test]
    fn test_failed_without_message_uses_default() {
        let results = vec![Ok(JobSnapshot::new("A", JobStatus::Failed))];
        let TickAssessment::Converged(summary) = assess_tick("x", 1, &results) else {
            panic!("expected convergence");
        };
        assert_eq!(summary.failures[0].message, UNKNOWN_ERROR);
    }

    #[test]
    fn test_duplicate_ids_are_counted_independently() {
        let results = vec![completed("A", 5), completed("A", 5)];
        let TickAssessment::Converged(summary) = assess_tick("x", 1, &results) else {
            panic!("expected convergence");
        };
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.keywords_found, 10);
    }
}
