use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Catalog record not found: {identity}")]
    NotFound { identity: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
