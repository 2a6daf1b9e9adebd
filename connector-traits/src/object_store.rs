//! Object Store Abstraction
//!
//! Platform-agnostic trait for the source media collection: paginated
//! listing under a prefix and content retrieval by key.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// A single object as observed in a store listing.
///
/// `key` is the store-relative path; `uri` is the canonical, stable identity
/// used everywhere downstream (catalog key, transcription source, index
/// document id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub uri: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

impl StoredObject {
    /// File-name portion of the key (everything after the last `/`).
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Lower-cased suffix after the last `.`, if any.
    pub fn suffix(&self) -> Option<String> {
        let name = self.file_name();
        name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// One page of a listing, with an opaque continuation token when more
/// objects remain.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<StoredObject>,
    pub next_token: Option<String>,
}

/// Read access to an object store.
///
/// # Example
///
/// ```ignore
/// use connector_traits::object_store::ObjectStore;
///
/// async fn list_all(store: &dyn ObjectStore, prefix: &str) -> Result<usize> {
///     let mut count = 0;
///     let mut token = None;
///     loop {
///         let page = store.list_objects(prefix, token).await?;
///         count += page.objects.len();
///         token = page.next_token;
///         if token.is_none() {
///             break;
///         }
///     }
///     Ok(count)
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects under a prefix. Pass the previous page's `next_token`
    /// to continue; `None` starts from the beginning.
    async fn list_objects(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage>;

    /// Fetch the full content of an object by key.
    async fn get_object(&self, key: &str) -> Result<Bytes>;
}
