//! # Completion Reactor
//!
//! Invoked once per transcription job reaching a terminal state. Resolves
//! the job, correlates it back to a catalog record by media identity,
//! records the outcome, and on success extracts the transcript text and
//! submits a document to the search index. Every invocation finishes with
//! the session coordinator's completion check, whatever the outcome.
//!
//! Invocations are idempotent: downstream writes are full-record
//! overwrites and document submission is last-write-wins, so a duplicate
//! completion event re-produces the same terminal state.

use crate::crawler::Outcome;
use crate::session::SyncSessionCoordinator;
use crate::{transcript, Result};
use connector_traits::{
    DocumentAttribute, IndexDocument, ObjectStore, SearchIndex, TranscriptionJob,
    TranscriptionJobStatus, Transcriber, ATTR_DATA_SOURCE_ID, ATTR_SOURCE_URI,
    ATTR_SYNC_EXECUTION_ID,
};
use core_catalog::{
    current_timestamp, CatalogRecord, CatalogRepository, CrawlerStateRepository, SyncState,
    TranscriptionState,
};
use core_runtime::{EventBus, IndexerConfig, IndexerEvent};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Single backoff applied when the job lookup is throttled.
const THROTTLE_BACKOFF: Duration = Duration::from_secs(2);

/// Reacts to transcription job completions.
pub struct CompletionReactor {
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn SearchIndex>,
    catalog: Arc<dyn CatalogRepository>,
    session: SyncSessionCoordinator,
    events: EventBus,
    config: IndexerConfig,
}

impl CompletionReactor {
    pub fn new(
        config: IndexerConfig,
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
        index: Arc<dyn SearchIndex>,
        catalog: Arc<dyn CatalogRepository>,
        crawler_state: Arc<dyn CrawlerStateRepository>,
        events: EventBus,
    ) -> Self {
        let session = SyncSessionCoordinator::new(
            catalog.clone(),
            crawler_state,
            index.clone(),
            events.clone(),
            &config,
        );
        Self {
            transcriber,
            store,
            index,
            catalog,
            session,
            events,
            config,
        }
    }

    /// Handle one job-completion trigger. Always finishes with the
    /// session completion check; the returned outcome feeds the external
    /// lifecycle manager's exit signaling.
    #[instrument(skip(self))]
    pub async fn handle(&self, job_name: &str) -> Outcome {
        let result = self.process(job_name).await;
        if let Err(e) = &result {
            error!(job_name, error = %e, "Completion handling failed");
        }

        if let Err(e) = self.session.end_session().await {
            error!(error = %e, "Session completion check failed");
            return Outcome::Failure;
        }

        match result {
            Ok(()) => Outcome::Success,
            Err(_) => Outcome::Failure,
        }
    }

    async fn process(&self, job_name: &str) -> Result<()> {
        let job = self.get_job_with_backoff(job_name).await?;

        let Some(record) = self.catalog.get(&job.media_uri).await? else {
            // Not a job this indexer started, or the record was never
            // written; nothing to correlate to.
            info!(
                job_name,
                media_uri = %job.media_uri,
                "Transcription job not tracked in catalog, ignoring"
            );
            return Ok(());
        };

        match job.status {
            TranscriptionJobStatus::Failed => self.record_failure(record, &job).await,
            TranscriptionJobStatus::Completed => self.record_success(record, &job).await,
            _ => {
                warn!(job_name, "Transcription job not terminal, ignoring");
                Ok(())
            }
        }
    }

    async fn get_job_with_backoff(&self, job_name: &str) -> Result<TranscriptionJob> {
        match self.transcriber.get_job(job_name).await {
            Err(e) if e.is_transient() => {
                debug!(job_name, "Job lookup throttled, backing off");
                tokio::time::sleep(THROTTLE_BACKOFF).await;
                Ok(self.transcriber.get_job(job_name).await?)
            }
            other => Ok(other?),
        }
    }

    async fn record_failure(
        &self,
        mut record: CatalogRecord,
        job: &TranscriptionJob,
    ) -> Result<()> {
        let reason = job
            .failure_reason
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            job_name = %job.name,
            identity = %record.identity,
            reason = %reason,
            "Transcription job failed"
        );

        record.transcription_state = Some(TranscriptionState::Failed);
        record.transcription_secs = None;
        record.sync_state = Some(SyncState::NotSynced);
        record.updated_at = current_timestamp();
        self.catalog.put(&record).await?;

        self.events
            .emit(IndexerEvent::TranscriptionFailed {
                identity: record.identity,
                reason,
            })
            .ok();
        Ok(())
    }

    async fn record_success(
        &self,
        mut record: CatalogRecord,
        job: &TranscriptionJob,
    ) -> Result<()> {
        record.transcription_state = Some(TranscriptionState::Done);
        record.transcription_secs = job.duration_secs();
        record.updated_at = current_timestamp();
        self.catalog.put(&record).await?;

        match self.index_transcript(job, &record).await {
            Ok(()) => {
                record.sync_state = Some(SyncState::Done);
                self.events
                    .emit(IndexerEvent::DocumentIndexed {
                        identity: record.identity.clone(),
                        session_id: record.sync_session_id.clone().unwrap_or_default(),
                    })
                    .ok();
            }
            Err(e) => {
                warn!(
                    identity = %record.identity,
                    error = %e,
                    "Transcript indexing failed"
                );
                record.sync_state = Some(SyncState::Failed);
                self.events
                    .emit(IndexerEvent::IndexSubmissionFailed {
                        identity: record.identity.clone(),
                        reason: e.to_string(),
                    })
                    .ok();
            }
        }

        record.updated_at = current_timestamp();
        self.catalog.put(&record).await?;
        Ok(())
    }

    async fn index_transcript(
        &self,
        job: &TranscriptionJob,
        record: &CatalogRecord,
    ) -> Result<()> {
        let transcript_uri = job
            .transcript_uri
            .as_deref()
            .ok_or_else(|| crate::CrawlError::Transcript("missing result location".to_string()))?;

        let raw = self.transcriber.fetch_transcript(transcript_uri).await?;
        let payload = transcript::parse_payload(&raw)?;
        let text = transcript::extract_text(&payload, self.config.transcript_wrap_width);

        let document = self.build_document(record, text).await;
        self.index.put_document(document).await?;
        Ok(())
    }

    async fn build_document(&self, record: &CatalogRecord, body: String) -> IndexDocument {
        let identity = &record.identity;
        let mut title = identity
            .rsplit('/')
            .next()
            .unwrap_or(identity)
            .to_string();

        let mut attributes = vec![
            DocumentAttribute::new(ATTR_DATA_SOURCE_ID, &self.config.data_source_id),
            DocumentAttribute::new(
                ATTR_SYNC_EXECUTION_ID,
                record.sync_session_id.clone().unwrap_or_default(),
            ),
            DocumentAttribute::new(ATTR_SOURCE_URI, self.source_url(identity)),
        ];

        if let Some(metadata_key) = &record.metadata_uri {
            match self.fetch_sidecar(metadata_key).await {
                Ok(sidecar) => {
                    if let Some(sidecar_title) = sidecar.title {
                        title = sidecar_title;
                    }
                    attributes.extend(sidecar.attributes);
                }
                Err(e) => {
                    warn!(
                        metadata_key = %metadata_key,
                        error = %e,
                        "Sidecar attributes unavailable, submitting without them"
                    );
                }
            }
        }

        IndexDocument {
            id: identity.clone(),
            title,
            body,
            attributes,
        }
    }

    /// Canonical source URL for a media identity: the configured base with
    /// the store key appended, or the identity itself.
    fn source_url(&self, identity: &str) -> String {
        let Some(base) = &self.config.source_url_base else {
            return identity.to_string();
        };

        let key = identity
            .split_once("://")
            .map(|(_, rest)| rest)
            .map(|rest| {
                rest.strip_prefix(&format!("{}/", self.config.media_bucket))
                    .unwrap_or(rest)
            });

        match key {
            Some(key) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => identity.to_string(),
        }
    }

    async fn fetch_sidecar(&self, metadata_key: &str) -> Result<SidecarAttributes> {
        let raw = self.store.get_object(metadata_key).await?;
        let body: SidecarBody = serde_json::from_slice(&raw)
            .map_err(|e| crate::CrawlError::Transcript(e.to_string()))?;

        let attributes = body
            .attributes
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                DocumentAttribute::new(key, value)
            })
            .collect();

        Ok(SidecarAttributes {
            title: body.title,
            attributes,
        })
    }
}

/// Indexing attributes carried by a sidecar metadata file.
struct SidecarAttributes {
    title: Option<String>,
    attributes: Vec<DocumentAttribute>,
}

#[derive(Debug, Deserialize)]
struct SidecarBody {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Attributes", default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}
