use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid mode: {0:?}")]
    InvalidMode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn ingestion<E: std::fmt::Display>(err: E) -> Self {
        Error::Ingestion(err.to_string())
    }

    pub fn retrieval<E: std::fmt::Display>(err: E) -> Self {
        Error::Retrieval(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        Error::Generation(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Operation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
