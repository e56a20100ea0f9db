// Configuration module entry point
// Loads the startup configuration and holds the per-process state built from it

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, SiteConfig};

/// Config file used when `DEMANDAS_CONFIG` is not set (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Port used when neither the config nor `PORT` provide a valid one
pub const DEFAULT_PORT: u16 = 4000;

/// Where the front-end build lands by default
pub const DEFAULT_SITE_ROOT: &str = "dist/timesheet-valeshop/browser";

impl Config {
    /// Load configuration using the process environment
    ///
    /// Reads `DEMANDAS_CONFIG` for the config file path and `PORT` for the
    /// listening port. This is the only place the environment is consulted.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("DEMANDAS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_port_override(std::env::var("PORT").ok().as_deref());
        Ok(cfg)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("DEMANDAS").separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", DEFAULT_PORT)?
            .set_default("site.root", DEFAULT_SITE_ROOT)?
            .set_default("site.entry_document", "index.html")?
            .set_default("site.index_files", vec!["index.html"])?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize::<Self>()?.validate()
    }

    /// Reject values that would otherwise panic while building the runtime
    fn validate(self) -> Result<Self, config::ConfigError> {
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }

    /// Replace the configured port with `PORT` when it holds a valid port number
    ///
    /// Invalid values are ignored as if the variable were unset.
    pub fn apply_port_override(&mut self, port_var: Option<&str>) {
        if let Some(port) = parse_port(port_var) {
            self.server.port = port;
        }
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Parse a port value, rejecting anything that is not a `u16`
pub fn parse_port(value: Option<&str>) -> Option<u16> {
    value.and_then(|v| v.trim().parse::<u16>().ok())
}
