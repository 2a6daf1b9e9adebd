//! # Catalog Data Model
//!
//! The catalog is the single source of truth shared by all reactors: one
//! record per media object identity ever observed, plus a distinguished
//! crawler-state row used as the mutual-exclusion flag for crawl passes.
//!
//! Records carry three orthogonal pieces of state:
//! - the object's classification (`ObjectStatus`) and fingerprints,
//! - the transcription job tracking sub-state,
//! - the search-index synchronization sub-state.
//!
//! Every write is a full-record overwrite keyed by identity; concurrent
//! reactors converge via last-write-wins rather than partial updates.

use crate::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Status Types
// ============================================================================

/// Classification of a media object against the source listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectStatus {
    /// First observation (or revival of a deleted identity).
    ActiveNew,
    /// Content fingerprint changed since last observation.
    ActiveModified,
    /// Only the sidecar fingerprint changed.
    ActiveMetadataModified,
    /// Present and unchanged.
    ActiveUnchanged,
    /// No longer present in the source listing.
    Deleted,
}

impl ObjectStatus {
    /// Storage string for the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectStatus::ActiveNew => "ACTIVE-NEW",
            ObjectStatus::ActiveModified => "ACTIVE-MODIFIED",
            ObjectStatus::ActiveMetadataModified => "ACTIVE-METADATA_MODIFIED",
            ObjectStatus::ActiveUnchanged => "ACTIVE-UNCHANGED",
            ObjectStatus::Deleted => "DELETED",
        }
    }

    /// Whether the object was present at last observation.
    pub fn is_active(&self) -> bool {
        !matches!(self, ObjectStatus::Deleted)
    }
}

impl FromStr for ObjectStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACTIVE-NEW" => Ok(ObjectStatus::ActiveNew),
            "ACTIVE-MODIFIED" => Ok(ObjectStatus::ActiveModified),
            "ACTIVE-METADATA_MODIFIED" => Ok(ObjectStatus::ActiveMetadataModified),
            "ACTIVE-UNCHANGED" => Ok(ObjectStatus::ActiveUnchanged),
            "DELETED" => Ok(ObjectStatus::Deleted),
            _ => Err(CatalogError::InvalidField {
                field: "status".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transcription job sub-state on a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionState {
    Running,
    Done,
    Failed,
}

impl TranscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionState::Running => "RUNNING",
            TranscriptionState::Done => "DONE",
            TranscriptionState::Failed => "FAILED",
        }
    }
}

impl FromStr for TranscriptionState {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(TranscriptionState::Running),
            "DONE" => Ok(TranscriptionState::Done),
            "FAILED" => Ok(TranscriptionState::Failed),
            _ => Err(CatalogError::InvalidField {
                field: "transcription_state".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TranscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Search-index synchronization sub-state on a catalog record.
///
/// `Deleted` and `DeleteFailed` are written by the deletion reconciler so
/// operators can distinguish "removed from source and index" from "removed
/// from source, index removal failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Running,
    Done,
    Failed,
    NotSynced,
    Deleted,
    DeleteFailed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Running => "RUNNING",
            SyncState::Done => "DONE",
            SyncState::Failed => "FAILED",
            SyncState::NotSynced => "NOT_SYNCED",
            SyncState::Deleted => "DELETED",
            SyncState::DeleteFailed => "DELETE_FAILED",
        }
    }
}

impl FromStr for SyncState {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(SyncState::Running),
            "DONE" => Ok(SyncState::Done),
            "FAILED" => Ok(SyncState::Failed),
            "NOT_SYNCED" => Ok(SyncState::NotSynced),
            "DELETED" => Ok(SyncState::Deleted),
            "DELETE_FAILED" => Ok(SyncState::DeleteFailed),
            _ => Err(CatalogError::InvalidField {
                field: "sync_state".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Crawl-pass mutual-exclusion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlState {
    Running,
    Stopped,
}

impl CrawlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlState::Running => "RUNNING",
            CrawlState::Stopped => "STOPPED",
        }
    }
}

impl FromStr for CrawlState {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(CrawlState::Running),
            "STOPPED" => Ok(CrawlState::Stopped),
            _ => Err(CatalogError::InvalidField {
                field: "crawl_state".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CrawlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Catalog Record
// ============================================================================

/// One media object's synchronization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Stable URI-like identity of the media object.
    pub identity: String,
    pub status: ObjectStatus,
    /// Content fingerprint: modification time at last observation.
    pub content_last_modified: DateTime<Utc>,
    /// Content fingerprint: size in bytes at last observation.
    pub content_size: i64,
    /// Key of the sidecar metadata file, when one was paired.
    pub metadata_uri: Option<String>,
    pub metadata_last_modified: Option<DateTime<Utc>>,
    /// Name of the dispatched transcription job; absent when dispatch
    /// failed or no job was ever started.
    pub transcription_job_id: Option<String>,
    pub transcription_state: Option<TranscriptionState>,
    /// Wall-clock duration of the completed transcription job.
    pub transcription_secs: Option<i64>,
    /// Sync session the record was dispatched under.
    pub sync_session_id: Option<String>,
    pub sync_state: Option<SyncState>,
    pub updated_at: i64,
}

impl CatalogRecord {
    /// Create a record for a newly observed object; transcription and sync
    /// tracking are filled in by the dispatching component.
    pub fn new(
        identity: impl Into<String>,
        status: ObjectStatus,
        content_last_modified: DateTime<Utc>,
        content_size: i64,
    ) -> Self {
        Self {
            identity: identity.into(),
            status,
            content_last_modified,
            content_size,
            metadata_uri: None,
            metadata_last_modified: None,
            transcription_job_id: None,
            transcription_state: None,
            transcription_secs: None,
            sync_session_id: None,
            sync_state: None,
            updated_at: current_timestamp(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ObjectStatus::Deleted
    }
}

/// The crawler's own state row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerStatus {
    pub name: String,
    pub crawl_state: CrawlState,
    pub updated_at: i64,
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before UNIX epoch")
        .as_secs() as i64
}

// ============================================================================
// Tests
// ============================================================================
