//! # Crawl & Index Synchronization Engine
//!
//! Keeps a searchable text index synchronized with a changing collection
//! of media files in an object store. Each file is transcribed exactly
//! once per version by an external speech-to-text service, and the derived
//! transcript is submitted to the search index.
//!
//! Because transcription latency is unbounded, the engine is not one
//! long-lived process but a set of independently invoked reactors that
//! coordinate solely through the persisted catalog:
//!
//! - **Crawl Scanner & Differ** (`scanner`): enumerates the source,
//!   pairs sidecar metadata, classifies each object as new, modified,
//!   metadata-modified, unchanged
//! - **Job Dispatcher** (`dispatcher`): one external transcription job
//!   per changed object, with collision-free naming
//! - **Deletion Reconciler** (`reconciler`): set difference against the
//!   current listing, batched index removals
//! - **Completion Reactor** (`completion`): reacts to each job's terminal
//!   state, extracts transcript text, submits the index document
//! - **Sync Session Coordinator** (`session`): mutual exclusion for
//!   passes and aggregate-completion detection for closing the external
//!   sync session
//! - **Crawl Pass Orchestrator** (`crawler`): the pass entry point,
//!   reporting success or failure per invocation

pub mod completion;
pub mod crawler;
pub mod dispatcher;
pub mod error;
pub mod reconciler;
pub mod scanner;
pub mod session;
pub mod transcript;

pub use completion::CompletionReactor;
pub use crawler::{CrawlReactor, Outcome};
pub use dispatcher::{sanitize_job_name, JobDispatcher};
pub use error::{CrawlError, Result};
pub use reconciler::{DeletionReconciler, ReconcileOutcome};
pub use scanner::{classify, Classification, CrawlScanner, ScanCounts, ScanOutcome, SidecarRef};
pub use session::SyncSessionCoordinator;
pub use transcript::{extract_text, parse_payload, TranscriptPayload, TranscriptToken};
