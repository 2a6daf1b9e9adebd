use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
