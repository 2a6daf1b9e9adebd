//! # Crawl Pass Orchestrator
//!
//! Ties one crawl pass together: open the sync session, scan and classify
//! the source collection, dispatch transcription jobs, reconcile
//! deletions, and run the completion check. The pass returns without
//! waiting for transcriptions; their completions arrive later through the
//! [`CompletionReactor`].
//!
//! A refused session (another pass or an external sync job still active)
//! is a successful no-op. Any error inside the pass forces the crawl-state
//! flag back to `STOPPED`, still runs the completion check, and reports
//! failure to the external lifecycle manager.
//!
//! [`CompletionReactor`]: crate::completion::CompletionReactor

use crate::dispatcher::JobDispatcher;
use crate::reconciler::DeletionReconciler;
use crate::scanner::{CrawlScanner, ScanCounts};
use crate::session::SyncSessionCoordinator;
use crate::Result;
use connector_traits::{ObjectStore, SearchIndex, TranscriptionOptions, Transcriber};
use core_catalog::{CatalogRepository, CrawlerStateRepository};
use core_runtime::{EventBus, IndexerConfig, IndexerEvent};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Exit signal reported to the external lifecycle manager, one per
/// invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Runs crawl passes.
pub struct CrawlReactor {
    scanner: CrawlScanner,
    reconciler: DeletionReconciler,
    session: SyncSessionCoordinator,
    events: EventBus,
}

impl CrawlReactor {
    pub fn new(
        config: IndexerConfig,
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
        index: Arc<dyn SearchIndex>,
        catalog: Arc<dyn CatalogRepository>,
        crawler_state: Arc<dyn CrawlerStateRepository>,
        events: EventBus,
    ) -> Self {
        let options = TranscriptionOptions {
            data_access_role: config.transcription_role.clone(),
            ..TranscriptionOptions::default()
        };
        let dispatcher = JobDispatcher::new(transcriber, options, &config.crawler_name);
        let session = SyncSessionCoordinator::new(
            catalog.clone(),
            crawler_state,
            index.clone(),
            events.clone(),
            &config,
        );
        let scanner = CrawlScanner::new(
            store,
            catalog.clone(),
            dispatcher,
            events.clone(),
            config.clone(),
        );
        let reconciler = DeletionReconciler::new(catalog, index, events.clone());

        Self {
            scanner,
            reconciler,
            session,
            events,
        }
    }

    /// Run one crawl pass.
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> Outcome {
        let session_id = match self.session.begin_session().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!("Crawl pass refused, treating as no-op");
                return Outcome::Success;
            }
            Err(e) => {
                error!(error = %e, "Failed to open sync session");
                return Outcome::Failure;
            }
        };

        self.events
            .emit(IndexerEvent::PassStarted {
                session_id: session_id.clone(),
            })
            .ok();

        match self.execute(&session_id).await {
            Ok((counts, deleted)) => {
                info!(
                    new = counts.new,
                    modified = counts.modified,
                    metadata_modified = counts.metadata_modified,
                    unchanged = counts.unchanged,
                    deleted,
                    "Crawl pass finished"
                );
                self.events
                    .emit(IndexerEvent::PassCompleted {
                        session_id,
                        new: counts.new,
                        modified: counts.modified,
                        metadata_modified: counts.metadata_modified,
                        unchanged: counts.unchanged,
                        deleted,
                    })
                    .ok();

                match self.session.end_session().await {
                    Ok(_) => Outcome::Success,
                    Err(e) => {
                        error!(error = %e, "Session completion check failed");
                        Outcome::Failure
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Crawl pass failed");
                self.events
                    .emit(IndexerEvent::PassFailed {
                        reason: e.to_string(),
                    })
                    .ok();
                if let Err(abort_err) = self.session.abort().await {
                    error!(error = %abort_err, "Abort cleanup failed");
                }
                Outcome::Failure
            }
        }
    }

    async fn execute(&self, session_id: &str) -> Result<(ScanCounts, u64)> {
        let scan = self.scanner.scan(session_id).await?;
        let reconcile = self
            .reconciler
            .reconcile(&scan.observed, session_id)
            .await?;
        Ok((scan.counts, reconcile.deleted.len() as u64))
    }
}
