//! # Indexer Configuration
//!
//! One explicit configuration value, constructed once per invocation and
//! passed to every component; there are no ambient singletons. Built either
//! through the builder or from the environment variables an external
//! trigger provides.
//!
//! ## Required settings
//!
//! - `media_bucket` / `media_prefix` — where the source collection lives
//! - `index_id` / `data_source_id` — the search index target
//! - `crawler_name` — stable name of this indexer; keys the crawl-state row
//!   and prefixes transcription job names
//! - `database_path` — the catalog's SQLite file
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::IndexerConfig;
//!
//! let config = IndexerConfig::builder()
//!     .media_bucket("media-library")
//!     .media_prefix("talks/")
//!     .index_id("idx-1")
//!     .data_source_id("ds-1")
//!     .crawler_name("media-indexer")
//!     .database_path("/var/lib/indexer/catalog.db")
//!     .build()?;
//! ```

use crate::error::{Result, RuntimeError};
use std::path::PathBuf;
use std::time::Duration;

/// Media suffixes transcribed by default, matched case-insensitively.
pub const DEFAULT_MEDIA_TYPES: &[&str] = &["mp3", "mp4", "wav", "flac", "ogg", "amr", "webm"];

/// Default column width for stored transcript text.
pub const DEFAULT_WRAP_WIDTH: usize = 70;

/// Configuration for one indexer invocation.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Bucket or container holding the source media collection.
    pub media_bucket: String,

    /// Prefix under which media objects are enumerated.
    pub media_prefix: String,

    /// Prefix under which sidecar metadata files are enumerated. `None`
    /// disables sidecar pairing entirely; equal to `media_prefix` for the
    /// same-folder layout.
    pub metadata_prefix: Option<String>,

    /// Search index identifier.
    pub index_id: String,

    /// Data source identifier within the search index.
    pub data_source_id: String,

    /// Stable name of this indexer instance.
    pub crawler_name: String,

    /// Path of the catalog database file.
    pub database_path: PathBuf,

    /// Base URL for the canonical source links attached to submitted
    /// documents; the object's store key is appended. When unset, the
    /// object's own URI is used.
    pub source_url_base: Option<String>,

    /// Role or credential the transcription service assumes to read the
    /// source media.
    pub transcription_role: Option<String>,

    /// Media suffixes considered transcribable (lower-cased).
    pub supported_media_types: Vec<String>,

    /// Column width applied when line-wrapping transcript text.
    pub transcript_wrap_width: usize,

    /// Grace period after asking the index service to stop a sync job.
    pub session_settle: Duration,
}

impl IndexerConfig {
    pub fn builder() -> IndexerConfigBuilder {
        IndexerConfigBuilder::default()
    }

    /// Build a configuration from the environment an external trigger
    /// provides.
    ///
    /// Required: `MEDIA_BUCKET`, `MEDIA_FOLDER_PREFIX`, `INDEX_ID`, `DS_ID`,
    /// `CRAWLER_NAME`, `CATALOG_DB_PATH`. Optional:
    /// `METADATA_FOLDER_PREFIX`.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder()
            .media_bucket(require_env("MEDIA_BUCKET")?)
            .media_prefix(require_env("MEDIA_FOLDER_PREFIX")?)
            .index_id(require_env("INDEX_ID")?)
            .data_source_id(require_env("DS_ID")?)
            .crawler_name(require_env("CRAWLER_NAME")?)
            .database_path(require_env("CATALOG_DB_PATH")?);

        if let Ok(prefix) = std::env::var("METADATA_FOLDER_PREFIX") {
            builder = builder.metadata_prefix(prefix);
        }
        if let Ok(base) = std::env::var("SOURCE_URL_BASE") {
            builder = builder.source_url_base(base);
        }
        if let Ok(role) = std::env::var("TRANSCRIBE_ROLE") {
            builder = builder.transcription_role(role);
        }

        builder.build()
    }

    /// Whether a suffix (without the dot) is a supported media type.
    pub fn is_supported_media_type(&self, suffix: &str) -> bool {
        let suffix = suffix.to_ascii_lowercase();
        self.supported_media_types.iter().any(|s| *s == suffix)
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| RuntimeError::MissingEnv(name.to_string()))
}

/// Builder for [`IndexerConfig`] with fail-fast validation.
#[derive(Debug, Default)]
pub struct IndexerConfigBuilder {
    media_bucket: Option<String>,
    media_prefix: Option<String>,
    metadata_prefix: Option<String>,
    index_id: Option<String>,
    data_source_id: Option<String>,
    crawler_name: Option<String>,
    database_path: Option<PathBuf>,
    source_url_base: Option<String>,
    transcription_role: Option<String>,
    supported_media_types: Option<Vec<String>>,
    transcript_wrap_width: Option<usize>,
    session_settle: Option<Duration>,
}

impl IndexerConfigBuilder {
    pub fn media_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.media_bucket = Some(bucket.into());
        self
    }

    pub fn media_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.media_prefix = Some(prefix.into());
        self
    }

    pub fn metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_prefix = Some(prefix.into());
        self
    }

    pub fn index_id(mut self, id: impl Into<String>) -> Self {
        self.index_id = Some(id.into());
        self
    }

    pub fn data_source_id(mut self, id: impl Into<String>) -> Self {
        self.data_source_id = Some(id.into());
        self
    }

    pub fn crawler_name(mut self, name: impl Into<String>) -> Self {
        self.crawler_name = Some(name.into());
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn source_url_base(mut self, base: impl Into<String>) -> Self {
        self.source_url_base = Some(base.into());
        self
    }

    pub fn transcription_role(mut self, role: impl Into<String>) -> Self {
        self.transcription_role = Some(role.into());
        self
    }

    pub fn supported_media_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_media_types = Some(
            types
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    pub fn transcript_wrap_width(mut self, width: usize) -> Self {
        self.transcript_wrap_width = Some(width);
        self
    }

    pub fn session_settle(mut self, settle: Duration) -> Self {
        self.session_settle = Some(settle);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing or empty
    /// required field.
    pub fn build(self) -> Result<IndexerConfig> {
        let media_bucket = required(self.media_bucket, "media_bucket")?;
        let index_id = required(self.index_id, "index_id")?;
        let data_source_id = required(self.data_source_id, "data_source_id")?;
        let crawler_name = required(self.crawler_name, "crawler_name")?;
        let database_path = self
            .database_path
            .ok_or_else(|| RuntimeError::Config("database_path is required".to_string()))?;

        let wrap_width = self.transcript_wrap_width.unwrap_or(DEFAULT_WRAP_WIDTH);
        if wrap_width == 0 {
            return Err(RuntimeError::Config(
                "transcript_wrap_width must be positive".to_string(),
            ));
        }

        Ok(IndexerConfig {
            media_bucket,
            media_prefix: self.media_prefix.unwrap_or_default(),
            metadata_prefix: self.metadata_prefix,
            index_id,
            data_source_id,
            crawler_name,
            database_path,
            source_url_base: self.source_url_base,
            transcription_role: self.transcription_role,
            supported_media_types: self.supported_media_types.unwrap_or_else(|| {
                DEFAULT_MEDIA_TYPES.iter().map(|s| s.to_string()).collect()
            }),
            transcript_wrap_width: wrap_width,
            session_settle: self.session_settle.unwrap_or(Duration::from_secs(10)),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RuntimeError::Config(format!("{field} is required"))),
    }
}
