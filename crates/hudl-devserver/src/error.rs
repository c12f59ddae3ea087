//! Dev-server error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid listen address '{0}'")]
    InvalidAddr(String),
}
