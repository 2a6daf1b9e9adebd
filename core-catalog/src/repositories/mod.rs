//! Repository traits and SQLite implementations for the catalog store.

pub mod crawler_state;
pub mod record;

pub use crawler_state::{CrawlerStateRepository, SqliteCrawlerStateRepository};
pub use record::{CatalogRepository, SqliteCatalogRepository};
