//! Test fixtures: throwaway site directories

use crate::config::{AppState, Config, SiteConfig};
use crate::routing::SiteRoot;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A site directory under the system temp dir, removed on drop
pub struct TempSite {
    dir: TempDir,
}

impl TempSite {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("demandas-site-")
            .tempdir()
            .expect("create temp site");
        Self { dir }
    }

    /// Write a file relative to the site root, creating parent directories
    pub fn file(self, relative: &str, contents: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, contents).expect("write site file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Final path component, for building sibling-relative paths
    pub fn dir_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn config(&self) -> SiteConfig {
        SiteConfig {
            root: self.path().display().to_string(),
            entry_document: "index.html".to_string(),
            index_files: vec!["index.html".to_string()],
        }
    }

    /// Application state serving this site, access log off
    pub fn state(&self) -> Arc<AppState> {
        let mut config = Config::load_from("does-not-exist/config").expect("default config");
        config.site = self.config();
        config.logging.access_log = false;
        let site = SiteRoot::open(&config.site).expect("open temp site");
        Arc::new(AppState::new(config, site))
    }
}
