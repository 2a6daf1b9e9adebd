//! # Deletion Reconciler
//!
//! Computes the set difference between the catalog's active identities and
//! the identities observed in the current listing, marks the difference
//! `DELETED`, and requests removal of the corresponding documents from the
//! search index in batches.
//!
//! Failures are recorded per document: the record stays `DELETED` either
//! way, with `sync_state` distinguishing a clean removal (`DELETED`) from
//! one the index rejected (`DELETE_FAILED`). Batches are not retried.

use crate::Result;
use connector_traits::SearchIndex;
use core_catalog::{current_timestamp, CatalogRepository, ObjectStatus, SyncState};
use core_runtime::{EventBus, IndexerEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Result of one reconciliation.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Identities marked deleted this pass.
    pub deleted: Vec<String>,
    /// Subset whose index removal failed.
    pub failed: Vec<String>,
}

/// Removes vanished objects from the search index.
pub struct DeletionReconciler {
    catalog: Arc<dyn CatalogRepository>,
    index: Arc<dyn SearchIndex>,
    events: EventBus,
}

impl DeletionReconciler {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        index: Arc<dyn SearchIndex>,
        events: EventBus,
    ) -> Self {
        Self {
            catalog,
            index,
            events,
        }
    }

    /// Reconcile the catalog against the identities observed in the
    /// current listing, attributing index removals to `execution_id`.
    #[instrument(skip(self, current))]
    pub async fn reconcile(
        &self,
        current: &HashSet<String>,
        execution_id: &str,
    ) -> Result<ReconcileOutcome> {
        let indexed = self.catalog.active_identities().await?;
        let deletions: Vec<String> = indexed
            .into_iter()
            .filter(|identity| !current.contains(identity))
            .collect();

        if deletions.is_empty() {
            info!("No deleted files, nothing to reconcile");
            return Ok(ReconcileOutcome::default());
        }

        info!(count = deletions.len(), "Reconciling deleted objects");
        for identity in &deletions {
            self.mark_deleted(identity, SyncState::Deleted).await?;
        }

        let mut failed = Vec::new();
        for batch in deletions.chunks(self.index.max_delete_batch()) {
            match self.index.delete_documents(batch, execution_id).await {
                Ok(failures) => {
                    for failure in failures {
                        error!(
                            identity = %failure.id,
                            reason = %failure.reason,
                            "Index removal failed for document"
                        );
                        self.mark_deleted(&failure.id, SyncState::DeleteFailed)
                            .await?;
                        failed.push(failure.id);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Batch deletion failed, marking whole batch");
                    for identity in batch {
                        self.mark_deleted(identity, SyncState::DeleteFailed).await?;
                        failed.push(identity.clone());
                    }
                }
            }
        }

        self.events
            .emit(IndexerEvent::DeletionsReconciled {
                deleted: deletions.len() as u64,
                failed: failed.len() as u64,
            })
            .ok();

        Ok(ReconcileOutcome {
            deleted: deletions,
            failed,
        })
    }

    async fn mark_deleted(&self, identity: &str, sync_state: SyncState) -> Result<()> {
        if let Some(mut record) = self.catalog.get(identity).await? {
            record.status = ObjectStatus::Deleted;
            record.sync_state = Some(sync_state);
            record.updated_at = current_timestamp();
            self.catalog.put(&record).await?;
        }
        Ok(())
    }
}
