use tokio::sync::mpsc::UnboundedSender;

use crate::models::outcome::{SessionState, StatusUpdate};

/// Receives progress and the single terminal update of a poll session.
pub trait StatusSink: Send + Sync {
    fn report(&self, update: &StatusUpdate);
}

impl<F> StatusSink for F
where
    F: Fn(&StatusUpdate) + Send + Sync,
{
    fn report(&self, update: &StatusUpdate) {
        self(update)
    }
}

/// Writes every update as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn report(&self, update: &StatusUpdate) {
        match update.state() {
            SessionState::Running => tracing::info!(state = %update.state(), "{}", update),
            SessionState::Succeeded => tracing::info!(state = %update.state(), "{}", update),
            SessionState::PartiallyFailed
            | SessionState::Failed
            | SessionState::TimedOut
            | SessionState::Cancelled => {
                tracing::warn!(state = %update.state(), "{}", update)
            }
        }
    }
}

/// Forwards updates to a presentation task over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<StatusUpdate>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<StatusUpdate>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelSink {
    fn report(&self, update: &StatusUpdate) {
        // The receiver going away only means nobody is watching any more.
        if self.tx.send(update.clone()).is_err() {
            tracing::debug!("Status receiver dropped, discarding update");
        }
    }
}
