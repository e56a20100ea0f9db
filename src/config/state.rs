// Application state module
// Everything a request handler needs, built once at startup

use super::types::Config;
use crate::routing::SiteRoot;

/// Application state shared by all connections
///
/// Immutable after construction; handlers only ever read it.
pub struct AppState {
    pub config: Config,
    pub site: SiteRoot,
    /// Cached from `config.logging` for the request path
    pub access_log: bool,
    pub access_log_format: String,
}

impl AppState {
    pub fn new(config: Config, site: SiteRoot) -> Self {
        let access_log = config.logging.access_log;
        let access_log_format = config.logging.access_log_format.clone();
        Self {
            config,
            site,
            access_log,
            access_log_format,
        }
    }
}
