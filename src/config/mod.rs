// Configuration module entry point
// Loads layered configuration and builds the immutable application state

mod state;
mod types;

use std::net::{IpAddr, SocketAddr};

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::Config;

/// Config file looked up when `--config` is not given (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "coi_serve";

impl Config {
    /// Load configuration from the given file path (without extension),
    /// environment variables and an optional port override.
    ///
    /// Priority, lowest first: defaults, file, `COI_*` environment, `port`.
    pub fn load_from(config_path: &str, port: Option<u16>) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, port, None)
    }

    /// Same as `load_from`, reading `COI_*` variables from `env` instead of
    /// the process environment when given.
    fn load_with_env(
        config_path: &str,
        port: Option<u16>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("COI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.root", ".")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default(
                "http.server_name",
                format!("coi_serve/{}", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("http.directory_listing", true)?
            .set_override_option("server.port", port)?
            .build()?;

        settings.try_deserialize()
    }

    /// Listen address; `host` is a bare IPv4 or IPv6 address
    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.server.host.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
