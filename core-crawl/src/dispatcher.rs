//! # Job Dispatcher
//!
//! Starts one external transcription job per changed media object. Job
//! names combine the crawler name, the object identity, and a
//! monotonically distinguishing stamp so a re-dispatch never collides with
//! a still-draining prior job for the same identity.
//!
//! Dispatch is fire-and-forget: a rejected job is logged and reported as
//! `None`, the caller skips the catalog write, and the object is not
//! retried until its classification changes again.

use connector_traits::{TranscriptionOptions, Transcriber, MAX_JOB_NAME_LEN};
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

/// Dispatches transcription jobs for changed objects.
pub struct JobDispatcher {
    transcriber: Arc<dyn Transcriber>,
    options: TranscriptionOptions,
    crawler_name: String,
}

impl JobDispatcher {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        options: TranscriptionOptions,
        crawler_name: impl Into<String>,
    ) -> Self {
        Self {
            transcriber,
            options,
            crawler_name: crawler_name.into(),
        }
    }

    /// Start a transcription job for a media object.
    ///
    /// Returns the generated job name, or `None` when the service rejected
    /// the dispatch.
    pub async fn dispatch(&self, media_uri: &str) -> Option<String> {
        let job_name = self.job_name(media_uri);
        info!(media_uri, job_name = %job_name, "Starting transcription job");

        match self
            .transcriber
            .start_job(&job_name, media_uri, &self.options)
            .await
        {
            Ok(()) => Some(job_name),
            Err(e) => {
                error!(media_uri, job_name = %job_name, error = %e, "Transcription dispatch failed");
                None
            }
        }
    }

    /// Generate a unique job name for a dispatch, sanitized to the
    /// service's allowed character set.
    pub fn job_name(&self, media_uri: &str) -> String {
        let raw = format!("{}__{}_{}", self.crawler_name, media_uri, dispatch_stamp());
        sanitize_job_name(&raw)
    }
}

/// Unix-millisecond stamp with a process-local sequence so two dispatches
/// in the same millisecond still get distinct names.
fn dispatch_stamp() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before UNIX epoch")
        .as_millis();
    format!("{}.{}", millis, SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Collapse every run of characters outside `[0-9A-Za-z._-]` to `--` and
/// truncate to the service's maximum name length.
pub fn sanitize_job_name(raw: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r"[^0-9a-zA-Z._-]+").expect("valid pattern"));

    let mut name = invalid.replace_all(raw, "--").into_owned();
    name.truncate(MAX_JOB_NAME_LEN);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connector_traits::{ConnectorError, TranscriptionJob};
    use std::sync::Mutex;

    struct RecordingTranscriber {
        started: Mutex<Vec<(String, String)>>,
        reject: bool,
    }

    impl RecordingTranscriber {
        fn new(reject: bool) -> Self {
            Self {
                started: Mutex::new(Vec::new()),
                reject,
            }
        }
    }

    #[async_trait]
    impl Transcriber for RecordingTranscriber {
        async fn start_job(
            &self,
            name: &str,
            media_uri: &str,
            _options: &TranscriptionOptions,
        ) -> connector_traits::Result<()> {
            if self.reject {
                return Err(ConnectorError::Service("job limit reached".to_string()));
            }
            self.started
                .lock()
                .unwrap()
                .push((name.to_string(), media_uri.to_string()));
            Ok(())
        }

        async fn get_job(&self, name: &str) -> connector_traits::Result<TranscriptionJob> {
            Err(ConnectorError::NotFound(name.to_string()))
        }

        async fn fetch_transcript(&self, uri: &str) -> connector_traits::Result<bytes::Bytes> {
            Err(ConnectorError::NotFound(uri.to_string()))
        }
    }

    #[test]
    fn test_sanitize_collapses_invalid_runs() {
        assert_eq!(
            sanitize_job_name("indexer__s3://bucket/a b.mp3_17.0"),
            "indexer__s3--bucket--a--b.mp3_17.0"
        );
    }

    #[test]
    fn test_sanitize_keeps_allowed_characters() {
        assert_eq!(sanitize_job_name("abc-1.2_X"), "abc-1.2_X");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(MAX_JOB_NAME_LEN + 50);
        assert_eq!(sanitize_job_name(&long).len(), MAX_JOB_NAME_LEN);
    }

    #[tokio::test]
    async fn test_job_names_unique_per_dispatch() {
        let transcriber = Arc::new(RecordingTranscriber::new(false));
        let dispatcher = JobDispatcher::new(
            transcriber.clone(),
            TranscriptionOptions::default(),
            "indexer",
        );

        let a = dispatcher.dispatch("store://media/a.mp3").await.unwrap();
        let b = dispatcher.dispatch("store://media/a.mp3").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(transcriber.started.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_failure_returns_none() {
        let transcriber = Arc::new(RecordingTranscriber::new(true));
        let dispatcher =
            JobDispatcher::new(transcriber, TranscriptionOptions::default(), "indexer");

        assert!(dispatcher.dispatch("store://media/a.mp3").await.is_none());
    }
}
