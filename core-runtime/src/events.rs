//! # Event System
//!
//! Broadcast channel for observing indexer progress. Reactors publish
//! [`IndexerEvent`]s as they work; any number of subscribers (progress
//! reporting, tests, operational tooling) receive them without coupling to
//! the components themselves.
//!
//! Events are fire-and-forget: emitting with no subscribers is not an
//! error worth propagating, and lagging subscribers lose the oldest
//! events rather than blocking publishers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default capacity of the event buffer.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Severity of an event, for filtering by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

/// Events published across one or more reactor invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerEvent {
    /// A crawl pass started under a new sync session.
    PassStarted { session_id: String },

    /// The scanner classified one media object.
    ObjectClassified { identity: String, status: String },

    /// A transcription job was dispatched for an object.
    JobDispatched { identity: String, job_name: String },

    /// The transcription service rejected a dispatch; the object will not
    /// be retried until its classification changes again.
    DispatchFailed { identity: String },

    /// The deletion reconciler finished.
    DeletionsReconciled { deleted: u64, failed: u64 },

    /// A crawl pass finished scanning and dispatching.
    PassCompleted {
        session_id: String,
        new: u64,
        modified: u64,
        metadata_modified: u64,
        unchanged: u64,
        deleted: u64,
    },

    /// A crawl pass aborted.
    PassFailed { reason: String },

    /// A transcription job completed and its document was submitted.
    DocumentIndexed { identity: String, session_id: String },

    /// A transcription job reported failure.
    TranscriptionFailed { identity: String, reason: String },

    /// A transcript was produced but index submission failed.
    IndexSubmissionFailed { identity: String, reason: String },

    /// The session coordinator observed no outstanding work and stopped
    /// the external sync job.
    SessionStopped,
}

impl IndexerEvent {
    /// Short machine-readable name for the event.
    pub fn name(&self) -> &'static str {
        match self {
            IndexerEvent::PassStarted { .. } => "pass_started",
            IndexerEvent::ObjectClassified { .. } => "object_classified",
            IndexerEvent::JobDispatched { .. } => "job_dispatched",
            IndexerEvent::DispatchFailed { .. } => "dispatch_failed",
            IndexerEvent::DeletionsReconciled { .. } => "deletions_reconciled",
            IndexerEvent::PassCompleted { .. } => "pass_completed",
            IndexerEvent::PassFailed { .. } => "pass_failed",
            IndexerEvent::DocumentIndexed { .. } => "document_indexed",
            IndexerEvent::TranscriptionFailed { .. } => "transcription_failed",
            IndexerEvent::IndexSubmissionFailed { .. } => "index_submission_failed",
            IndexerEvent::SessionStopped => "session_stopped",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            IndexerEvent::DispatchFailed { .. }
            | IndexerEvent::TranscriptionFailed { .. }
            | IndexerEvent::IndexSubmissionFailed { .. } => EventSeverity::Warning,
            IndexerEvent::PassFailed { .. } => EventSeverity::Error,
            _ => EventSeverity::Info,
        }
    }
}

/// Central event bus for publishing and subscribing to indexer events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<IndexerEvent>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers that received
    /// it; an error means there were none, which callers usually ignore.
    pub fn emit(&self, event: IndexerEvent) -> Result<usize, SendError<IndexerEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> Receiver<IndexerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
