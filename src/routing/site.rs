//! Static site lookup module
//!
//! Maps request paths onto the built front-end directory. Paths are
//! percent-decoded and normalized before touching the file system, and
//! nothing outside the site root is ever returned.

use crate::config::SiteConfig;
use crate::error::ServerError;
use crate::http::cache::CachePolicy;
use crate::logger;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

/// Characters escaped when a normalized path is written back into a URL
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Kind of a served file, which decides its caching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// HTML documents, re-fetched on every navigation
    Html,
    /// Content-hashed build output (JS, CSS, images, fonts, ...)
    Asset,
}

impl FileKind {
    /// Classify by file name: only names ending in `.html` are documents
    pub fn of(path: &Path) -> Self {
        let is_html = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".html"));
        if is_html {
            Self::Html
        } else {
            Self::Asset
        }
    }

    pub const fn cache_policy(self) -> CachePolicy {
        match self {
            Self::Html => CachePolicy::NoStore,
            Self::Asset => CachePolicy::Immutable,
        }
    }
}

/// Result of resolving a request path against the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A regular file inside the site root
    File(PathBuf),
    /// A directory with an index file, requested without a trailing slash.
    /// `location` is the normalized, re-encoded path of that directory.
    DirectoryWithoutSlash { location: String },
    /// Nothing servable at this path
    Missing,
}

/// Read-only view of the static file set
///
/// Implemented by [`SiteRoot`] for the real file system; routing only ever
/// talks to this trait so it can be exercised without a disk.
pub trait FileLookup {
    fn lookup(&self, request_path: &str) -> Lookup;
}

/// The built front-end directory, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct SiteRoot {
    root: PathBuf,
    entry_document: PathBuf,
    index_files: Vec<String>,
}

impl SiteRoot {
    /// Open the site root, failing if it does not exist or is not a directory
    ///
    /// A missing entry document is only warned about here; requests that need
    /// it will fail with a server error.
    pub fn open(cfg: &SiteConfig) -> Result<Self, ServerError> {
        let root = Path::new(&cfg.root)
            .canonicalize()
            .map_err(|source| ServerError::SiteRoot {
                path: PathBuf::from(&cfg.root),
                source,
            })?;
        if !root.is_dir() {
            return Err(ServerError::NotADirectory(root));
        }

        let entry_document = root.join(&cfg.entry_document);
        if !entry_document.is_file() {
            logger::log_warning(&format!(
                "Entry document not found: {}",
                entry_document.display()
            ));
        }

        Ok(Self {
            root,
            entry_document,
            index_files: cfg.index_files.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_document(&self) -> &Path {
        &self.entry_document
    }

    fn find_index(&self, dir: &Path) -> Option<PathBuf> {
        self.index_files
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// Resolve symlinks and confirm the target still lives under the root
    fn contained(&self, candidate: &Path) -> Option<PathBuf> {
        let canonical = candidate.canonicalize().ok()?;
        if canonical.starts_with(&self.root) {
            Some(canonical)
        } else {
            logger::log_warning(&format!(
                "Path escapes site root: {}",
                canonical.display()
            ));
            None
        }
    }
}

impl FileLookup for SiteRoot {
    fn lookup(&self, request_path: &str) -> Lookup {
        let Some(relative) = normalize_request_path(request_path) else {
            return Lookup::Missing;
        };

        let candidate = self.root.join(&relative);
        if candidate.is_file() {
            if request_path.ends_with('/') {
                return Lookup::Missing;
            }
            return self.contained(&candidate).map_or(Lookup::Missing, Lookup::File);
        }

        if candidate.is_dir() {
            let Some(index) = self.find_index(&candidate) else {
                return Lookup::Missing;
            };
            if !relative.as_os_str().is_empty() && !request_path.ends_with('/') {
                return Lookup::DirectoryWithoutSlash {
                    location: url_path(&relative),
                };
            }
            return self.contained(&index).map_or(Lookup::Missing, Lookup::File);
        }

        Lookup::Missing
    }
}

/// Absolute URL path for a normalized relative path, always a single leading `/`
fn url_path(relative: &Path) -> String {
    let mut url = String::new();
    for segment in relative {
        url.push('/');
        url.extend(utf8_percent_encode(&segment.to_string_lossy(), PATH_SEGMENT));
    }
    if url.is_empty() {
        url.push('/');
    }
    url
}

/// Turn a raw request path into a relative path under the site root
///
/// Returns `None` for paths that are not valid UTF-8 once decoded, that climb
/// above the root with `..`, or that name a dotfile anywhere along the way.
pub fn normalize_request_path(request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.starts_with('.') => return None,
            s => segments.push(s),
        }
    }

    let relative: PathBuf = segments.iter().collect();
    // Windows drive prefixes and the like
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(relative)
}
