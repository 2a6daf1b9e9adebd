//! Transcription Service Abstraction
//!
//! Contract for the asynchronous speech-to-text collaborator. Jobs are
//! started by name, run outside this system's control, and are queried
//! again by name once an external completion trigger fires.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Maximum length accepted by the service for a job name.
pub const MAX_JOB_NAME_LEN: usize = 200;

/// Lifecycle state of a transcription job as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionJobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl TranscriptionJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TranscriptionJobStatus::Completed | TranscriptionJobStatus::Failed
        )
    }
}

/// Options applied when starting a job.
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    /// Let the service detect the spoken language instead of pinning one.
    pub identify_language: bool,
    /// Allow the service to queue the job when capacity is exhausted
    /// rather than rejecting it.
    pub allow_deferred: bool,
    /// Role or credential the service assumes to read the source media.
    pub data_access_role: Option<String>,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            identify_language: true,
            allow_deferred: true,
            data_access_role: None,
        }
    }
}

/// A transcription job's externally visible state.
#[derive(Debug, Clone)]
pub struct TranscriptionJob {
    pub name: String,
    pub status: TranscriptionJobStatus,
    /// URI of the media object the job transcribed.
    pub media_uri: String,
    /// Location of the result payload; present once the job completed.
    pub transcript_uri: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl TranscriptionJob {
    /// Wall-clock duration of the job in seconds, when both endpoints are
    /// known.
    pub fn duration_secs(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// Client for the external transcription service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Start a job. Names must be unique per dispatch; the service rejects
    /// a name that collides with a still-draining prior job.
    async fn start_job(
        &self,
        name: &str,
        media_uri: &str,
        options: &TranscriptionOptions,
    ) -> Result<()>;

    /// Fetch a job's current state by name.
    async fn get_job(&self, name: &str) -> Result<TranscriptionJob>;

    /// Fetch the raw result payload from the location reported by
    /// [`TranscriptionJob::transcript_uri`].
    async fn fetch_transcript(&self, transcript_uri: &str) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_secs() {
        let job = TranscriptionJob {
            name: "job-1".to_string(),
            status: TranscriptionJobStatus::Completed,
            media_uri: "store://media/a.mp3".to_string(),
            transcript_uri: Some("https://results/job-1.json".to_string()),
            started_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            completed_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 2, 30).unwrap()),
            failure_reason: None,
        };

        assert_eq!(job.duration_secs(), Some(150));
    }

    #[test]
    fn test_duration_unknown_while_running() {
        let job = TranscriptionJob {
            name: "job-2".to_string(),
            status: TranscriptionJobStatus::InProgress,
            media_uri: "store://media/b.mp3".to_string(),
            transcript_uri: None,
            started_at: Some(Utc::now()),
            completed_at: None,
            failure_reason: None,
        };

        assert_eq!(job.duration_secs(), None);
        assert!(!job.status.is_terminal());
    }
}
