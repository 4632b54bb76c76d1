use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameters or literal combinations.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Circuit-level misuse: wrong degree, exhausted levels, mismatched scales.
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("numeric failure: {0}")]
    Numeric(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn config<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Config(msg.into()))
}

pub(crate) fn precondition<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Precondition(msg.into()))
}

pub(crate) fn numeric<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Numeric(msg.into()))
}
