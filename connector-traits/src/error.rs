use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Connector capability not available: {0}")]
    NotAvailable(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Request throttled by service")]
    Throttled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response from service: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// Transient errors may succeed on retry after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectorError::Throttled)
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
