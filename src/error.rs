//! Process-level errors
//!
//! HTTP outcomes (404, 501, ...) are ordinary responses and never show up here.
//! Everything in this enum is fatal and makes `main` exit non-zero.

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("serving root '{}' is not accessible: {source}", path.display())]
    InvalidRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to open log file: {0}")]
    Logger(#[source] std::io::Error),

    #[error("failed to register signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
