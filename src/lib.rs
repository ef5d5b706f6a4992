//! Keyword job poller
//!
//! Tracks long-running keyword-expansion jobs on the keyword research backend:
//! polls each job's status on a fixed interval, reports averaged progress, and
//! resolves once when every job is finished, the wait budget runs out, or the
//! session is cancelled.

pub mod config;
pub mod models;
pub mod services;
pub mod telemetry;

pub use models::job::{JobId, JobSnapshot, JobStatus};
pub use models::outcome::{CompletionSummary, PollOutcome, StatusUpdate};
pub use services::poller::{JobPoller, PollHandle, PollerError, PollerSettings};
pub use services::sink::StatusSink;
pub use services::status_client::{HttpJobStatusClient, JobStatusClient, StatusQueryError};
