//! # Connector Traits
//!
//! Contracts for the external collaborators of the media index core:
//!
//! - [`object_store`]: the source media collection (paginated listing,
//!   content retrieval)
//! - [`transcribe`]: the asynchronous speech-to-text service
//! - [`search_index`]: the search index (documents, deletions, sync jobs)
//!
//! The synchronization engine is written entirely against these traits;
//! vendor bindings live outside this workspace.

pub mod error;
pub mod object_store;
pub mod search_index;
pub mod transcribe;

pub use error::{ConnectorError, Result};
pub use object_store::{ObjectPage, ObjectStore, StoredObject};
pub use search_index::{
    DocumentAttribute, FailedDeletion, IndexDocument, SearchIndex, ATTR_DATA_SOURCE_ID,
    ATTR_SOURCE_URI, ATTR_SYNC_EXECUTION_ID,
};
pub use transcribe::{
    TranscriptionJob, TranscriptionJobStatus, TranscriptionOptions, Transcriber, MAX_JOB_NAME_LEN,
};
