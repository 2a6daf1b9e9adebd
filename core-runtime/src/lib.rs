//! # Runtime Infrastructure
//!
//! Ambient concerns shared by every reactor invocation:
//!
//! - [`config`]: the explicit [`IndexerConfig`] value (builder or
//!   environment), passed to every component
//! - [`events`]: broadcast [`EventBus`] for observing indexer progress
//! - [`logging`]: `tracing` subscriber initialization
//!
//! [`IndexerConfig`]: config::IndexerConfig
//! [`EventBus`]: events::EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{IndexerConfig, IndexerConfigBuilder, DEFAULT_MEDIA_TYPES, DEFAULT_WRAP_WIDTH};
pub use error::{Result, RuntimeError};
pub use events::{EventBus, EventSeverity, IndexerEvent, DEFAULT_EVENT_BUFFER_SIZE};
pub use logging::{init_logging, LogFormat, LoggingConfig};
