//! Startup errors
//!
//! Request handling never fails; everything here aborts the process before
//! the listener accepts its first connection.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Address(String),

    #[error("Site root '{}' is not accessible: {source}", .path.display())]
    SiteRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Site root '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to open log files: {0}")]
    Logger(#[source] std::io::Error),

    #[error("Failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
