use connector_traits::ConnectorError;
use core_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Transcript error: {0}")]
    Transcript(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
