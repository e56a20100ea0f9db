//! Routing rules
//!
//! Requests are routed by an ordered list of rules, first match wins:
//! 1. a static file from the site
//! 2. the entry document for client-side routes
//! 3. not found
//!
//! Rule evaluation only reads the request and the file set, so the whole
//! table can be exercised without a listener.

use super::accept::accepts_html;
use super::site::{FileKind, FileLookup, Lookup};
use hyper::Method;
use std::path::PathBuf;

/// The parts of a request that routing looks at
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub accept: Option<&'a str>,
}

/// Outcome of routing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Serve a file from the site
    ServeFile { path: PathBuf, kind: FileKind },
    /// Directory requested without its trailing slash
    Redirect { location: String },
    /// Serve the entry document so the client router takes over
    ServeEntryDocument,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRule {
    StaticFile,
    SpaFallback,
    NotFound,
}

pub const ROUTING_RULES: [RouteRule; 3] =
    [RouteRule::StaticFile, RouteRule::SpaFallback, RouteRule::NotFound];

impl RouteRule {
    /// Apply this rule, or `None` to pass to the next one
    pub fn evaluate(self, req: &RequestInfo<'_>, files: &impl FileLookup) -> Option<RouteDecision> {
        match self {
            Self::StaticFile => match files.lookup(req.path) {
                Lookup::File(path) => {
                    let kind = FileKind::of(&path);
                    Some(RouteDecision::ServeFile { path, kind })
                }
                Lookup::DirectoryWithoutSlash { location } if is_get_or_head(req.method) => {
                    Some(RouteDecision::Redirect {
                        location: directory_location(&location, req.query),
                    })
                }
                Lookup::DirectoryWithoutSlash { .. } | Lookup::Missing => None,
            },
            Self::SpaFallback => {
                let navigational = req.method == Method::GET
                    && accepts_html(req.accept)
                    && !looks_like_file(req.path);
                navigational.then_some(RouteDecision::ServeEntryDocument)
            }
            Self::NotFound => Some(RouteDecision::NotFound),
        }
    }
}

/// Route a request through [`ROUTING_RULES`]
pub fn decide(req: &RequestInfo<'_>, files: &impl FileLookup) -> RouteDecision {
    ROUTING_RULES
        .iter()
        .find_map(|rule| rule.evaluate(req, files))
        .unwrap_or(RouteDecision::NotFound)
}

/// A `.` anywhere in the path marks it as an asset request.
///
/// Routes such as `/v1.2/report` are therefore never given the fallback.
pub fn looks_like_file(path: &str) -> bool {
    path.contains('.')
}

fn is_get_or_head(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn directory_location(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{path}/?{q}"),
        None => format!("{path}/"),
    }
}
