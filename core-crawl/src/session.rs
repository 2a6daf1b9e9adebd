//! # Sync Session Coordinator
//!
//! Manages the lifecycle of the external sync session bracketing a crawl
//! pass: mutual exclusion against re-entrant passes, and aggregate
//! completion detection across the independently running completion
//! reactors.
//!
//! This is a polling convergence protocol, not a transactional one. The
//! crawl-state flag is advisory: two near-simultaneous triggers can both
//! observe `STOPPED` and proceed. The completion count and the eventual
//! stop are likewise not atomic with concurrent writers; every caller is
//! safely re-entrant and the session converges once the count reaches
//! zero.

use crate::Result;
use connector_traits::SearchIndex;
use core_catalog::{CatalogRepository, CrawlState, CrawlerStateRepository};
use core_runtime::{EventBus, IndexerConfig, IndexerEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Coordinates the external sync session shared by a crawl pass and its
/// completion reactors.
pub struct SyncSessionCoordinator {
    catalog: Arc<dyn CatalogRepository>,
    crawler_state: Arc<dyn CrawlerStateRepository>,
    index: Arc<dyn SearchIndex>,
    events: EventBus,
    crawler_name: String,
    settle: Duration,
}

impl SyncSessionCoordinator {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        crawler_state: Arc<dyn CrawlerStateRepository>,
        index: Arc<dyn SearchIndex>,
        events: EventBus,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            catalog,
            crawler_state,
            index,
            events,
            crawler_name: config.crawler_name.clone(),
            settle: config.session_settle,
        }
    }

    /// Open a session for a new crawl pass.
    ///
    /// Returns `Ok(None)` when a pass is refused: either the crawl-state
    /// flag shows a previous pass still running, or the index service
    /// reports an active sync job. Callers treat refusal as a successful
    /// no-op, assuming a concurrent pass is still in flight.
    #[instrument(skip(self))]
    pub async fn begin_session(&self) -> Result<Option<String>> {
        if let Some(CrawlState::Running) = self.crawler_state.get(&self.crawler_name).await? {
            info!("Previous crawl pass still running, refusing to start");
            return Ok(None);
        }

        // Close out a drained session left behind by a prior pass whose
        // completions all resolved while no reactor was running.
        self.end_session().await?;

        if let Some(execution_id) = self.index.active_sync_execution().await? {
            info!(execution_id = %execution_id, "External sync job still active, refusing to start");
            return Ok(None);
        }

        let execution_id = self.index.start_sync_job().await?;
        self.crawler_state
            .set(&self.crawler_name, CrawlState::Running)
            .await?;
        info!(execution_id = %execution_id, "Started sync session");

        Ok(Some(execution_id))
    }

    /// Check whether the session can close, and close it if so.
    ///
    /// Called at the end of every crawl pass and after every completion
    /// reactor invocation. Counts records still in `sync_state = RUNNING`;
    /// at zero the external sync job is stopped, a short grace period
    /// tolerates the service's asynchronous settling, and the crawl-state
    /// flag is cleared. Returns whether the session was stopped.
    #[instrument(skip(self))]
    pub async fn end_session(&self) -> Result<bool> {
        let remaining = self.catalog.count_sync_running().await?;
        if remaining > 0 {
            debug!(remaining, "Transcriptions still outstanding, session stays open");
            return Ok(false);
        }

        info!("No media files currently being transcribed, stopping sync session");
        if let Err(e) = self.index.stop_sync_job().await {
            // Best effort: there may simply be no job to stop.
            warn!(error = %e, "Stop request for sync job failed");
        }
        tokio::time::sleep(self.settle).await;

        self.crawler_state
            .set(&self.crawler_name, CrawlState::Stopped)
            .await?;
        self.events.emit(IndexerEvent::SessionStopped).ok();

        Ok(true)
    }

    /// Abort path for a failed crawl pass: force the crawl-state flag to
    /// `STOPPED`, then still run the completion check.
    pub async fn abort(&self) -> Result<()> {
        self.crawler_state
            .set(&self.crawler_name, CrawlState::Stopped)
            .await?;
        self.end_session().await?;
        Ok(())
    }
}
