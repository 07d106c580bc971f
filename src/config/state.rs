// Application state module
// Immutable per-process state shared by every connection

use std::path::PathBuf;

use super::types::Config;
use crate::error::ServerError;
use crate::logger::AccessLogFormat;

/// Application state
///
/// Built once at startup and handed to the server by `Arc`; nothing in here
/// changes while requests are being served.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical serving root
    pub root: PathBuf,
    pub access_format: AccessLogFormat,
}

impl AppState {
    /// Resolve the configured root and build the state
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let root = PathBuf::from(&config.server.root)
            .canonicalize()
            .map_err(|source| ServerError::InvalidRoot {
                path: PathBuf::from(&config.server.root),
                source,
            })?;

        if !root.is_dir() {
            return Err(ServerError::InvalidRoot {
                path: root,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let access_format = AccessLogFormat::from_name(&config.logging.access_log_format);

        Ok(Self {
            config,
            root,
            access_format,
        })
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
