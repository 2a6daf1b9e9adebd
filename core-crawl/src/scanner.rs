//! # Crawl Scanner & Differ
//!
//! Enumerates the source collection, pairs media objects with optional
//! sidecar metadata files, and classifies each object against the catalog.
//! Changed objects are handed to the [`JobDispatcher`]; unchanged objects
//! get their record rewritten with refreshed fingerprints and `DONE`
//! sub-states so they never hold a session open.
//!
//! The scanner's classification policy, in priority order:
//!
//! 1. `New` — no record, or the record is `DELETED` (revival)
//! 2. `Modified` — the content modification time differs
//! 3. `MetadataModified` — only the sidecar fingerprint differs
//! 4. `Unchanged` — everything matches

use crate::dispatcher::JobDispatcher;
use crate::Result;
use chrono::{DateTime, Utc};
use connector_traits::{ObjectStore, StoredObject};
use core_catalog::{
    current_timestamp, CatalogRecord, CatalogRepository, ObjectStatus, SyncState,
    TranscriptionState,
};
use core_runtime::{EventBus, IndexerConfig, IndexerEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Naming convention linking a sidecar file to its media object.
pub const METADATA_SUFFIX: &str = ".metadata.json";

/// Outcome of classifying one media object against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Modified,
    MetadataModified,
    Unchanged,
}

impl Classification {
    /// Catalog status written for this classification.
    pub fn status(&self) -> ObjectStatus {
        match self {
            Classification::New => ObjectStatus::ActiveNew,
            Classification::Modified => ObjectStatus::ActiveModified,
            Classification::MetadataModified => ObjectStatus::ActiveMetadataModified,
            Classification::Unchanged => ObjectStatus::ActiveUnchanged,
        }
    }

    /// Whether this classification dispatches a transcription job.
    pub fn needs_transcription(&self) -> bool {
        !matches!(self, Classification::Unchanged)
    }
}

/// A sidecar metadata file paired with a media object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRef {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Per-pass classification counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub new: u64,
    pub modified: u64,
    pub metadata_modified: u64,
    pub unchanged: u64,
}

impl ScanCounts {
    fn record(&mut self, classification: Classification) {
        match classification {
            Classification::New => self.new += 1,
            Classification::Modified => self.modified += 1,
            Classification::MetadataModified => self.metadata_modified += 1,
            Classification::Unchanged => self.unchanged += 1,
        }
    }
}

/// Result of one scan: every identity observed in the source, plus the
/// classification counters. The observed set is the deletion reconciler's
/// input.
#[derive(Debug)]
pub struct ScanOutcome {
    pub observed: HashSet<String>,
    pub counts: ScanCounts,
}

/// Classify a media object against its catalog record.
pub fn classify(
    record: Option<&CatalogRecord>,
    object: &StoredObject,
    sidecar: Option<&SidecarRef>,
) -> Classification {
    let record = match record {
        None => return Classification::New,
        Some(r) if r.is_deleted() => return Classification::New,
        Some(r) => r,
    };

    if record.content_last_modified != object.last_modified {
        return Classification::Modified;
    }

    let sidecar_changed = match (sidecar, record.metadata_last_modified) {
        (Some(s), Some(prev)) => s.last_modified != prev,
        (Some(_), None) => true,
        (None, Some(_)) => true,
        (None, None) => false,
    };

    if sidecar_changed {
        Classification::MetadataModified
    } else {
        Classification::Unchanged
    }
}

/// Scans the source collection and reconciles each object's record.
pub struct CrawlScanner {
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn CatalogRepository>,
    dispatcher: JobDispatcher,
    events: EventBus,
    config: IndexerConfig,
}

impl CrawlScanner {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn CatalogRepository>,
        dispatcher: JobDispatcher,
        events: EventBus,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            dispatcher,
            events,
            config,
        }
    }

    /// Run one scan under the given sync session: enumerate, classify,
    /// dispatch, and rewrite records.
    #[instrument(skip(self))]
    pub async fn scan(&self, session_id: &str) -> Result<ScanOutcome> {
        let media = self.list_media_objects().await?;
        let sidecars = self.list_sidecars().await?;
        info!(
            media = media.len(),
            sidecars = sidecars.len(),
            "Scanning source collection"
        );

        let mut observed = HashSet::new();
        let mut counts = ScanCounts::default();

        for object in &media {
            let sidecar = sidecars.get(&object.key);
            let classification = self.process_object(object, sidecar, session_id).await?;
            counts.record(classification);
            observed.insert(object.uri.clone());
        }

        Ok(ScanOutcome { observed, counts })
    }

    /// Enumerate media objects under the media prefix, filtered to
    /// supported suffixes.
    async fn list_media_objects(&self) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut continuation = None;

        loop {
            let page = self
                .store
                .list_objects(&self.config.media_prefix, continuation)
                .await?;

            for object in page.objects {
                if object.key.ends_with(METADATA_SUFFIX) {
                    continue;
                }
                match object.suffix() {
                    Some(suffix) if self.config.is_supported_media_type(&suffix) => {
                        objects.push(object);
                    }
                    _ => debug!(key = %object.key, "Unsupported file type, skipping"),
                }
            }

            continuation = page.next_token;
            if continuation.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    /// Enumerate sidecar files and derive the media key each references.
    /// Works for both the same-folder layout (sidecar next to the media
    /// object) and the parallel-folder layout (sidecars under a separate
    /// prefix mirroring the media prefix's relative paths).
    async fn list_sidecars(&self) -> Result<HashMap<String, SidecarRef>> {
        let Some(metadata_prefix) = &self.config.metadata_prefix else {
            return Ok(HashMap::new());
        };

        let mut sidecars = HashMap::new();
        let mut continuation = None;

        loop {
            let page = self
                .store
                .list_objects(metadata_prefix, continuation)
                .await?;

            for object in page.objects {
                let Some(stripped) = object.key.strip_suffix(METADATA_SUFFIX) else {
                    continue;
                };
                let Some(relative) = stripped.strip_prefix(metadata_prefix.as_str()) else {
                    warn!(key = %object.key, "Sidecar outside metadata prefix, ignoring");
                    continue;
                };
                let media_key = format!("{}{}", self.config.media_prefix, relative);
                sidecars.insert(
                    media_key,
                    SidecarRef {
                        key: object.key.clone(),
                        last_modified: object.last_modified,
                    },
                );
            }

            continuation = page.next_token;
            if continuation.is_none() {
                break;
            }
        }

        Ok(sidecars)
    }

    async fn process_object(
        &self,
        object: &StoredObject,
        sidecar: Option<&SidecarRef>,
        session_id: &str,
    ) -> Result<Classification> {
        let existing = self.catalog.get(&object.uri).await?;
        let classification = classify(existing.as_ref(), object, sidecar);
        debug!(identity = %object.uri, ?classification, "Classified object");
        self.events
            .emit(IndexerEvent::ObjectClassified {
                identity: object.uri.clone(),
                status: classification.status().as_str().to_string(),
            })
            .ok();

        if !classification.needs_transcription() {
            // Refresh fingerprints; transcription and sync already resolved.
            let previous = existing.expect("unchanged classification implies a record");
            let record = CatalogRecord {
                status: ObjectStatus::ActiveUnchanged,
                content_last_modified: object.last_modified,
                content_size: object.size as i64,
                metadata_uri: sidecar.map(|s| s.key.clone()),
                metadata_last_modified: sidecar.map(|s| s.last_modified),
                transcription_state: Some(TranscriptionState::Done),
                sync_state: Some(SyncState::Done),
                updated_at: current_timestamp(),
                ..previous
            };
            self.catalog.put(&record).await?;
            return Ok(classification);
        }

        match self.dispatcher.dispatch(&object.uri).await {
            Some(job_name) => {
                let record = CatalogRecord {
                    identity: object.uri.clone(),
                    status: classification.status(),
                    content_last_modified: object.last_modified,
                    content_size: object.size as i64,
                    metadata_uri: sidecar.map(|s| s.key.clone()),
                    metadata_last_modified: sidecar.map(|s| s.last_modified),
                    transcription_job_id: Some(job_name.clone()),
                    transcription_state: Some(TranscriptionState::Running),
                    transcription_secs: None,
                    sync_session_id: Some(session_id.to_string()),
                    sync_state: Some(SyncState::Running),
                    updated_at: current_timestamp(),
                };
                self.catalog.put(&record).await?;
                self.events
                    .emit(IndexerEvent::JobDispatched {
                        identity: object.uri.clone(),
                        job_name,
                    })
                    .ok();
            }
            None => {
                // Record intentionally left untouched: with no job id there
                // is nothing for a completion to correlate to, and the next
                // pass will classify the object again.
                self.events
                    .emit(IndexerEvent::DispatchFailed {
                        identity: object.uri.clone(),
                    })
                    .ok();
            }
        }

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use connector_traits::{
        ConnectorError, ObjectPage, TranscriptionJob, TranscriptionOptions, Transcriber,
    };
    use core_catalog::{create_test_pool, SqliteCatalogRepository};
    use std::sync::Mutex;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn object(key: &str, modified: i64) -> StoredObject {
        StoredObject {
            key: key.to_string(),
            uri: format!("store://media-library/{key}"),
            last_modified: ts(modified),
            size: 1024,
        }
    }

    fn sidecar(key: &str, modified: i64) -> SidecarRef {
        SidecarRef {
            key: key.to_string(),
            last_modified: ts(modified),
        }
    }

    fn record_for(object: &StoredObject, sidecar: Option<&SidecarRef>) -> CatalogRecord {
        let mut record = CatalogRecord::new(
            object.uri.clone(),
            ObjectStatus::ActiveUnchanged,
            object.last_modified,
            object.size as i64,
        );
        record.metadata_uri = sidecar.map(|s| s.key.clone());
        record.metadata_last_modified = sidecar.map(|s| s.last_modified);
        record
    }

    // ------------------------------------------------------------------
    // classify()
    // ------------------------------------------------------------------

    #[test]
    fn test_classify_absent_record_is_new() {
        let obj = object("talks/a.mp3", 100);
        assert_eq!(classify(None, &obj, None), Classification::New);
    }

    #[test]
    fn test_classify_deleted_record_revives_as_new() {
        let obj = object("talks/a.mp3", 100);
        let mut record = record_for(&obj, None);
        record.status = ObjectStatus::Deleted;
        assert_eq!(classify(Some(&record), &obj, None), Classification::New);
    }

    #[test]
    fn test_classify_content_change_wins_over_metadata_change() {
        let obj = object("talks/a.mp3", 200);
        let side = sidecar("talks/a.mp3.metadata.json", 300);
        let mut record = record_for(&obj, Some(&side));
        record.content_last_modified = ts(100);
        record.metadata_last_modified = Some(ts(250));
        assert_eq!(
            classify(Some(&record), &obj, Some(&side)),
            Classification::Modified
        );
    }

    #[test]
    fn test_classify_sidecar_fingerprint_change() {
        let obj = object("talks/a.mp3", 100);
        let side = sidecar("talks/a.mp3.metadata.json", 300);
        let mut record = record_for(&obj, Some(&side));
        record.metadata_last_modified = Some(ts(250));
        assert_eq!(
            classify(Some(&record), &obj, Some(&side)),
            Classification::MetadataModified
        );
    }

    #[test]
    fn test_classify_sidecar_appeared() {
        let obj = object("talks/a.mp3", 100);
        let side = sidecar("talks/a.mp3.metadata.json", 300);
        let record = record_for(&obj, None);
        assert_eq!(
            classify(Some(&record), &obj, Some(&side)),
            Classification::MetadataModified
        );
    }

    #[test]
    fn test_classify_sidecar_disappeared() {
        let obj = object("talks/a.mp3", 100);
        let side = sidecar("talks/a.mp3.metadata.json", 300);
        let record = record_for(&obj, Some(&side));
        assert_eq!(
            classify(Some(&record), &obj, None),
            Classification::MetadataModified
        );
    }

    #[test]
    fn test_classify_unchanged() {
        let obj = object("talks/a.mp3", 100);
        let side = sidecar("talks/a.mp3.metadata.json", 300);
        let record = record_for(&obj, Some(&side));
        assert_eq!(
            classify(Some(&record), &obj, Some(&side)),
            Classification::Unchanged
        );
        let bare = record_for(&obj, None);
        assert_eq!(classify(Some(&bare), &obj, None), Classification::Unchanged);
    }

    // ------------------------------------------------------------------
    // Scanner
    // ------------------------------------------------------------------

    struct FakeStore {
        objects: Vec<StoredObject>,
        page_size: usize,
        list_calls: Mutex<u64>,
    }

    impl FakeStore {
        fn new(objects: Vec<StoredObject>) -> Self {
            Self {
                objects,
                page_size: 2,
                list_calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn list_objects(
            &self,
            prefix: &str,
            continuation: Option<String>,
        ) -> connector_traits::Result<ObjectPage> {
            *self.list_calls.lock().unwrap() += 1;
            let matching: Vec<_> = self
                .objects
                .iter()
                .filter(|o| o.key.starts_with(prefix))
                .cloned()
                .collect();
            let offset: usize = continuation
                .as_deref()
                .map(|t| t.parse().unwrap())
                .unwrap_or(0);
            let page: Vec<_> = matching
                .iter()
                .skip(offset)
                .take(self.page_size)
                .cloned()
                .collect();
            let next = offset + page.len();
            let next_token = (next < matching.len()).then(|| next.to_string());
            Ok(ObjectPage {
                objects: page,
                next_token,
            })
        }

        async fn get_object(&self, key: &str) -> connector_traits::Result<Bytes> {
            Err(ConnectorError::NotFound(key.to_string()))
        }
    }

    struct FakeTranscriber {
        started: Mutex<Vec<String>>,
        reject: bool,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn start_job(
            &self,
            name: &str,
            _media_uri: &str,
            _options: &TranscriptionOptions,
        ) -> connector_traits::Result<()> {
            if self.reject {
                return Err(ConnectorError::Service("rejected".to_string()));
            }
            self.started.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn get_job(&self, name: &str) -> connector_traits::Result<TranscriptionJob> {
            Err(ConnectorError::NotFound(name.to_string()))
        }

        async fn fetch_transcript(&self, uri: &str) -> connector_traits::Result<Bytes> {
            Err(ConnectorError::NotFound(uri.to_string()))
        }
    }

    fn config(metadata_prefix: Option<&str>) -> IndexerConfig {
        let mut builder = IndexerConfig::builder()
            .media_bucket("media-library")
            .media_prefix("talks/")
            .index_id("idx-1")
            .data_source_id("ds-1")
            .crawler_name("indexer")
            .database_path(":memory:");
        if let Some(prefix) = metadata_prefix {
            builder = builder.metadata_prefix(prefix);
        }
        builder.build().unwrap()
    }

    async fn scanner_with(
        objects: Vec<StoredObject>,
        reject_dispatch: bool,
        metadata_prefix: Option<&str>,
    ) -> (CrawlScanner, Arc<SqliteCatalogRepository>, Arc<FakeStore>) {
        let pool = create_test_pool().await.unwrap();
        let catalog = Arc::new(SqliteCatalogRepository::new(pool));
        let store = Arc::new(FakeStore::new(objects));
        let transcriber = Arc::new(FakeTranscriber {
            started: Mutex::new(Vec::new()),
            reject: reject_dispatch,
        });
        let dispatcher =
            JobDispatcher::new(transcriber, TranscriptionOptions::default(), "indexer");
        let scanner = CrawlScanner::new(
            store.clone(),
            catalog.clone(),
            dispatcher,
            EventBus::default(),
            config(metadata_prefix),
        );
        (scanner, catalog, store)
    }

    #[tokio::test]
    async fn test_scan_filters_unsupported_suffixes() {
        let (scanner, _, _) = scanner_with(
            vec![
                object("talks/a.mp3", 100),
                object("talks/notes.pdf", 100),
                object("talks/b.WAV", 100),
                object("talks/no-suffix", 100),
            ],
            false,
            None,
        )
        .await;

        let outcome = scanner.scan("exec-1").await.unwrap();
        assert_eq!(outcome.observed.len(), 2);
        assert_eq!(outcome.counts.new, 2);
    }

    #[tokio::test]
    async fn test_scan_paginates_listing() {
        let objects: Vec<_> = (0..5)
            .map(|i| object(&format!("talks/{i}.mp3"), 100))
            .collect();
        let (scanner, _, store) = scanner_with(objects, false, None).await;

        let outcome = scanner.scan("exec-1").await.unwrap();
        assert_eq!(outcome.observed.len(), 5);
        // Page size 2 means the listing took multiple calls.
        assert!(*store.list_calls.lock().unwrap() >= 3);
    }

    #[tokio::test]
    async fn test_scan_new_object_dispatches_and_records() {
        let (scanner, catalog, _) =
            scanner_with(vec![object("talks/a.mp3", 100)], false, None).await;

        let outcome = scanner.scan("exec-1").await.unwrap();
        assert_eq!(outcome.counts.new, 1);

        let record = catalog
            .get("store://media-library/talks/a.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ObjectStatus::ActiveNew);
        assert_eq!(record.transcription_state, Some(TranscriptionState::Running));
        assert_eq!(record.sync_state, Some(SyncState::Running));
        assert_eq!(record.sync_session_id, Some("exec-1".to_string()));
        assert!(record.transcription_job_id.is_some());
    }

    #[tokio::test]
    async fn test_scan_unchanged_refreshes_and_marks_done() {
        let obj = object("talks/a.mp3", 100);
        let (scanner, catalog, _) = scanner_with(vec![obj.clone()], false, None).await;

        let mut previous = record_for(&obj, None);
        previous.transcription_job_id = Some("job-old".to_string());
        previous.transcription_state = Some(TranscriptionState::Done);
        previous.transcription_secs = Some(33);
        previous.sync_session_id = Some("exec-0".to_string());
        previous.sync_state = Some(SyncState::Done);
        catalog.put(&previous).await.unwrap();

        let outcome = scanner.scan("exec-1").await.unwrap();
        assert_eq!(outcome.counts.unchanged, 1);

        let record = catalog.get(&obj.uri).await.unwrap().unwrap();
        assert_eq!(record.status, ObjectStatus::ActiveUnchanged);
        // Prior transcription outcome survives the rewrite.
        assert_eq!(record.transcription_job_id, Some("job-old".to_string()));
        assert_eq!(record.transcription_secs, Some(33));
        assert_eq!(record.sync_session_id, Some("exec-0".to_string()));
        assert_eq!(record.sync_state, Some(SyncState::Done));
    }

    #[tokio::test]
    async fn test_scan_dispatch_failure_leaves_no_record() {
        let (scanner, catalog, _) =
            scanner_with(vec![object("talks/a.mp3", 100)], true, None).await;

        let outcome = scanner.scan("exec-1").await.unwrap();
        // Still observed: the object exists in the source.
        assert_eq!(outcome.observed.len(), 1);
        assert!(catalog
            .get("store://media-library/talks/a.mp3")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_scan_pairs_same_folder_sidecars() {
        let mut side = object("talks/a.mp3.metadata.json", 300);
        side.uri = format!("store://media-library/{}", side.key);
        let (scanner, catalog, _) = scanner_with(
            vec![object("talks/a.mp3", 100), side],
            false,
            Some("talks/"),
        )
        .await;

        scanner.scan("exec-1").await.unwrap();

        let record = catalog
            .get("store://media-library/talks/a.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.metadata_uri,
            Some("talks/a.mp3.metadata.json".to_string())
        );
        assert_eq!(record.metadata_last_modified, Some(ts(300)));
    }

    #[tokio::test]
    async fn test_scan_pairs_parallel_folder_sidecars() {
        let (scanner, catalog, _) = scanner_with(
            vec![
                object("talks/a.mp3", 100),
                object("metadata/a.mp3.metadata.json", 300),
                // Unmatched sidecar: no corresponding media object.
                object("metadata/ghost.mp3.metadata.json", 300),
            ],
            false,
            Some("metadata/"),
        )
        .await;

        let outcome = scanner.scan("exec-1").await.unwrap();
        assert_eq!(outcome.observed.len(), 1);

        let record = catalog
            .get("store://media-library/talks/a.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.metadata_uri,
            Some("metadata/a.mp3.metadata.json".to_string())
        );
    }
}
