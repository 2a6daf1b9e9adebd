//! Search Index Abstraction
//!
//! Contract for the external search index: document submission and removal,
//! plus the bracketing "sync job" lifecycle that groups one crawl pass worth
//! of updates into a single externally visible synchronization run.

use async_trait::async_trait;

use crate::error::Result;

/// Attribute key for the data-source identifier on submitted documents.
pub const ATTR_DATA_SOURCE_ID: &str = "_data_source_id";
/// Attribute key for the sync execution the document was submitted under.
pub const ATTR_SYNC_EXECUTION_ID: &str = "_data_source_sync_job_execution_id";
/// Attribute key for the canonical source URL of the document.
pub const ATTR_SOURCE_URI: &str = "_source_uri";

/// A string attribute attached to an index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAttribute {
    pub key: String,
    pub value: String,
}

impl DocumentAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A document to be submitted to the index.
#[derive(Debug, Clone)]
pub struct IndexDocument {
    /// Stable document id; the media object's URI.
    pub id: String,
    pub title: String,
    /// Plain-text body.
    pub body: String,
    pub attributes: Vec<DocumentAttribute>,
}

/// A document the index failed to delete, reported per id.
#[derive(Debug, Clone)]
pub struct FailedDeletion {
    pub id: String,
    pub reason: String,
}

/// Client for the external search index service.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Execution id of a currently active sync job, if the service reports
    /// one in its history.
    async fn active_sync_execution(&self) -> Result<Option<String>>;

    /// Start a new sync job and return its execution id.
    async fn start_sync_job(&self) -> Result<String>;

    /// Stop the currently active sync job.
    async fn stop_sync_job(&self) -> Result<()>;

    /// Submit one document.
    async fn put_document(&self, document: IndexDocument) -> Result<()>;

    /// Delete documents by id, attributing the removals to the given sync
    /// execution. Callers must respect [`max_delete_batch`] per call.
    /// Individual failures are reported, not raised.
    ///
    /// [`max_delete_batch`]: SearchIndex::max_delete_batch
    async fn delete_documents(
        &self,
        ids: &[String],
        execution_id: &str,
    ) -> Result<Vec<FailedDeletion>>;

    /// Maximum number of ids accepted by one `delete_documents` call.
    fn max_delete_batch(&self) -> usize {
        10
    }
}
