//! # Catalog Store
//!
//! The persisted catalog: the single source of truth connecting the
//! otherwise-disjoint reactor invocations of the media index core.
//!
//! ## Components
//!
//! - **Data model** (`models`): catalog records, object/transcription/sync
//!   status enums, the crawl-state flag
//! - **Connection pool** (`db`): SQLite pooling with embedded migrations
//! - **Repositories** (`repositories`): [`CatalogRepository`] for object
//!   records, [`CrawlerStateRepository`] for the mutual-exclusion flag
//!
//! The schema carries secondary indexes on `status` and `sync_state` so the
//! deletion scan and the session-completion count are indexed queries rather
//! than table walks.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CatalogError, Result};
pub use models::{
    current_timestamp, CatalogRecord, CrawlState, CrawlerStatus, ObjectStatus, SyncState,
    TranscriptionState,
};
pub use repositories::{
    CatalogRepository, CrawlerStateRepository, SqliteCatalogRepository,
    SqliteCrawlerStateRepository,
};
