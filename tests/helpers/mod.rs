//! Test helpers: a scripted status backend and a sink that records updates.

use async_trait::async_trait;
use keyword_job_poller::{
    models::outcome::StatusUpdate, JobId, JobSnapshot, JobStatus, JobStatusClient, StatusQueryError,
    StatusSink,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted answer for one query.
#[derive(Debug, Clone)]
pub enum Step {
    Answer(JobSnapshot),
    Fail,
}

pub fn running(id: &str, progress: f64) -> Step {
    Step::Answer(JobSnapshot::new(id, JobStatus::Running).with_progress(progress))
}

pub fn completed(id: &str, keywords_found: u64) -> Step {
    Step::Answer(
        JobSnapshot::new(id, JobStatus::Completed)
            .with_progress(100.0)
            .with_keywords_found(keywords_found),
    )
}

pub fn failed(id: &str, message: &str) -> Step {
    Step::Answer(
        JobSnapshot::new(id, JobStatus::Failed)
            .with_progress(100.0)
            .with_error(message),
    )
}

/// Answers each job's queries from its own script, in order.
/// The last step of a script repeats forever.
#[derive(Default)]
pub struct ScriptedStatusClient {
    scripts: Mutex<HashMap<JobId, VecDeque<Step>>>,
    calls: AtomicUsize,
}

impl ScriptedStatusClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, job_id: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(JobId::new(job_id), steps.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStatusClient for ScriptedStatusClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobSnapshot, StatusQueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let Some(script) = scripts.get_mut(job_id) else {
                return Err(StatusQueryError::NotFound(job_id.clone()));
            };
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match step {
            Some(Step::Answer(snapshot)) => Ok(snapshot),
            Some(Step::Fail) | None => Err(StatusQueryError::Malformed(format!(
                "scripted failure for {}",
                job_id
            ))),
        }
    }
}

/// Keeps every update it receives.
#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn terminal_count(&self) -> usize {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_terminal())
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, update: &StatusUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }
}
