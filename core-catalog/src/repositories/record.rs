//! # Catalog Record Repository
//!
//! Persistence for [`CatalogRecord`]s. All coordination between reactors
//! flows through this repository: the scanner classifies against it, the
//! dispatcher and completion reactor overwrite records through it, the
//! deletion reconciler scans it, and the session coordinator counts it.
//!
//! Writes are full-record overwrites keyed by identity; there are no
//! partial updates.

use crate::models::{CatalogRecord, ObjectStatus, SyncState, TranscriptionState};
use crate::{CatalogError, Result};
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{FromRow, SqlitePool};

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for catalog record persistence.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fetch a record by identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get(&self, identity: &str) -> Result<Option<CatalogRecord>>;

    /// Write a record, replacing any existing row for the same identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put(&self, record: &CatalogRecord) -> Result<()>;

    /// Identities of every record whose status is not `DELETED`.
    ///
    /// This is the deletion reconciler's input set, served from the status
    /// index.
    async fn active_identities(&self) -> Result<Vec<String>>;

    /// Number of records with `sync_state = RUNNING`.
    ///
    /// This is the session coordinator's aggregate-completion probe, served
    /// from the sync_state index.
    async fn count_sync_running(&self) -> Result<i64>;

    /// All records with the given status.
    async fn find_by_status(&self, status: ObjectStatus) -> Result<Vec<CatalogRecord>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of [`CatalogRepository`].
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a catalog record.
#[derive(Debug, FromRow)]
struct CatalogRecordRow {
    identity: String,
    status: String,
    content_last_modified: i64,
    content_size: i64,
    metadata_uri: Option<String>,
    metadata_last_modified: Option<i64>,
    transcription_job_id: Option<String>,
    transcription_state: Option<String>,
    transcription_secs: Option<i64>,
    sync_session_id: Option<String>,
    sync_state: Option<String>,
    updated_at: i64,
}

fn timestamp_field(field: &str, secs: i64) -> Result<chrono::DateTime<chrono::Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| CatalogError::InvalidField {
        field: field.to_string(),
        value: secs.to_string(),
    })
}

impl TryFrom<CatalogRecordRow> for CatalogRecord {
    type Error = CatalogError;

    fn try_from(row: CatalogRecordRow) -> Result<Self> {
        let status: ObjectStatus = row.status.parse()?;
        let transcription_state = row
            .transcription_state
            .as_deref()
            .map(str::parse::<TranscriptionState>)
            .transpose()?;
        let sync_state = row
            .sync_state
            .as_deref()
            .map(str::parse::<SyncState>)
            .transpose()?;

        Ok(CatalogRecord {
            identity: row.identity,
            status,
            content_last_modified: timestamp_field(
                "content_last_modified",
                row.content_last_modified,
            )?,
            content_size: row.content_size,
            metadata_uri: row.metadata_uri,
            metadata_last_modified: row
                .metadata_last_modified
                .map(|secs| timestamp_field("metadata_last_modified", secs))
                .transpose()?,
            transcription_job_id: row.transcription_job_id,
            transcription_state,
            transcription_secs: row.transcription_secs,
            sync_session_id: row.sync_session_id,
            sync_state,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT identity, status, content_last_modified, content_size,
           metadata_uri, metadata_last_modified,
           transcription_job_id, transcription_state, transcription_secs,
           sync_session_id, sync_state, updated_at
    FROM catalog_records
"#;

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn get(&self, identity: &str) -> Result<Option<CatalogRecord>> {
        let row = sqlx::query_as::<_, CatalogRecordRow>(&format!(
            "{SELECT_COLUMNS} WHERE identity = ?"
        ))
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogRecord::try_from).transpose()
    }

    async fn put(&self, record: &CatalogRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO catalog_records (
                identity, status, content_last_modified, content_size,
                metadata_uri, metadata_last_modified,
                transcription_job_id, transcription_state, transcription_secs,
                sync_session_id, sync_state, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.identity)
        .bind(record.status.as_str())
        .bind(record.content_last_modified.timestamp())
        .bind(record.content_size)
        .bind(&record.metadata_uri)
        .bind(record.metadata_last_modified.map(|t| t.timestamp()))
        .bind(&record.transcription_job_id)
        .bind(record.transcription_state.map(|s| s.as_str()))
        .bind(record.transcription_secs)
        .bind(&record.sync_session_id)
        .bind(record.sync_state.map(|s| s.as_str()))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_identities(&self) -> Result<Vec<String>> {
        let identities = sqlx::query_scalar::<_, String>(
            "SELECT identity FROM catalog_records WHERE status != 'DELETED'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(identities)
    }

    async fn count_sync_running(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM catalog_records WHERE sync_state = 'RUNNING'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_by_status(&self, status: ObjectStatus) -> Result<Vec<CatalogRecord>> {
        let rows = sqlx::query_as::<_, CatalogRecordRow>(&format!(
            "{SELECT_COLUMNS} WHERE status = ? ORDER BY identity"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(CatalogRecord::try_from)
            .collect::<Result<Vec<_>>>()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::current_timestamp;
    use chrono::{TimeZone, Utc};

    fn record(identity: &str, status: ObjectStatus, sync_state: Option<SyncState>) -> CatalogRecord {
        CatalogRecord {
            identity: identity.to_string(),
            status,
            content_last_modified: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            content_size: 4096,
            metadata_uri: None,
            metadata_last_modified: None,
            transcription_job_id: Some(format!("job-{identity}")),
            transcription_state: Some(TranscriptionState::Running),
            transcription_secs: None,
            sync_session_id: Some("exec-1".to_string()),
            sync_state,
            updated_at: current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        let rec = record("store://media/a.mp3", ObjectStatus::ActiveNew, Some(SyncState::Running));
        repo.put(&rec).await.unwrap();

        let found = repo.get("store://media/a.mp3").await.unwrap().unwrap();
        assert_eq!(found, rec);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        assert!(repo.get("store://media/missing.mp3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_full_record() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        let rec = record("store://media/a.mp3", ObjectStatus::ActiveNew, Some(SyncState::Running));
        repo.put(&rec).await.unwrap();

        let mut updated = rec.clone();
        updated.status = ObjectStatus::ActiveUnchanged;
        updated.transcription_state = Some(TranscriptionState::Done);
        updated.sync_state = Some(SyncState::Done);
        updated.transcription_secs = Some(42);
        repo.put(&updated).await.unwrap();

        let found = repo.get("store://media/a.mp3").await.unwrap().unwrap();
        assert_eq!(found.status, ObjectStatus::ActiveUnchanged);
        assert_eq!(found.sync_state, Some(SyncState::Done));
        assert_eq!(found.transcription_secs, Some(42));
    }

    #[tokio::test]
    async fn test_active_identities_excludes_deleted() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        repo.put(&record("store://a", ObjectStatus::ActiveNew, Some(SyncState::Running)))
            .await
            .unwrap();
        repo.put(&record("store://b", ObjectStatus::ActiveUnchanged, Some(SyncState::Done)))
            .await
            .unwrap();
        repo.put(&record("store://c", ObjectStatus::Deleted, Some(SyncState::Deleted)))
            .await
            .unwrap();

        let mut identities = repo.active_identities().await.unwrap();
        identities.sort();
        assert_eq!(identities, vec!["store://a", "store://b"]);
    }

    #[tokio::test]
    async fn test_count_sync_running() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        assert_eq!(repo.count_sync_running().await.unwrap(), 0);

        repo.put(&record("store://a", ObjectStatus::ActiveNew, Some(SyncState::Running)))
            .await
            .unwrap();
        repo.put(&record("store://b", ObjectStatus::ActiveModified, Some(SyncState::Running)))
            .await
            .unwrap();
        repo.put(&record("store://c", ObjectStatus::ActiveUnchanged, Some(SyncState::Done)))
            .await
            .unwrap();

        assert_eq!(repo.count_sync_running().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_by_status() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        repo.put(&record("store://a", ObjectStatus::Deleted, Some(SyncState::Deleted)))
            .await
            .unwrap();
        repo.put(&record("store://b", ObjectStatus::ActiveNew, Some(SyncState::Running)))
            .await
            .unwrap();

        let deleted = repo.find_by_status(ObjectStatus::Deleted).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].identity, "store://a");
    }

    #[tokio::test]
    async fn test_optional_fields_round_trip() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteCatalogRepository::new(pool);

        let mut rec = record("store://a", ObjectStatus::ActiveMetadataModified, None);
        rec.metadata_uri = Some("media/a.mp3.metadata.json".to_string());
        rec.metadata_last_modified = Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap());
        rec.transcription_job_id = None;
        rec.transcription_state = None;
        rec.sync_session_id = None;
        repo.put(&rec).await.unwrap();

        let found = repo.get("store://a").await.unwrap().unwrap();
        assert_eq!(found, rec);
    }
}
