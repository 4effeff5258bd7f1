use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("data file not found: {0}")]
    MissingDataFile(PathBuf),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("server connection is closed")]
    ConnectionClosed,

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
