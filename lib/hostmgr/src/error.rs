//! hostmgr error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostmgrError {
    #[error("Registry error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Record decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trust file error on {path}: {source}")]
    TrustFile {
        path: String,
        source: std::io::Error,
    },
}
