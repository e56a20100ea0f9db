//! Static file serving module
//!
//! Loads files from the site and builds their responses with caching
//! headers, conditional request handling and byte ranges.

use crate::handler::router::RequestContext;
use crate::http::cache::{self, CachePolicy};
use crate::http::range::{self, RangeOutcome};
use crate::http::response::{build_content_response, build_partial_response};
use crate::http::{self as http_util, mime, ContentMeta};
use crate::logger;
use crate::routing::FileKind;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

/// A file read from the site
struct LoadedFile {
    content: Bytes,
    content_type: &'static str,
    modified: Option<SystemTime>,
}

async fn load_file(path: &Path) -> std::io::Result<LoadedFile> {
    let content = fs::read(path).await?;
    let modified = fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok());
    Ok(LoadedFile {
        content: Bytes::from(content),
        content_type: mime::content_type_for(path),
        modified,
    })
}

/// Serve a file matched by the static rule
///
/// The file was found during routing; if it is gone by the time it is read
/// the request degrades to 404.
pub async fn serve_file(
    ctx: &RequestContext<'_>,
    path: &Path,
    kind: FileKind,
) -> Response<Full<Bytes>> {
    match load_file(path).await {
        Ok(file) => build_static_file_response(ctx, file, kind.cache_policy()),
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to read '{}' for {}: {e}",
                path.display(),
                ctx.path
            ));
            http_util::build_404_response()
        }
    }
}

/// Serve the entry document for a client-side route
///
/// A missing entry document is a broken deployment and answers 500.
pub async fn serve_entry_document(
    ctx: &RequestContext<'_>,
    entry_document: &Path,
) -> Response<Full<Bytes>> {
    match load_file(entry_document).await {
        Ok(file) => build_static_file_response(ctx, file, CachePolicy::NoStore),
        Err(e) => {
            logger::log_error(&format!(
                "Entry document '{}' unavailable for {}: {e}",
                entry_document.display(),
                ctx.path
            ));
            http_util::build_500_response()
        }
    }
}

fn build_static_file_response(
    ctx: &RequestContext<'_>,
    file: LoadedFile,
    policy: CachePolicy,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&file.content);
    let last_modified = file.modified.map(cache::format_http_date);
    let meta = ContentMeta {
        content_type: file.content_type,
        etag: &etag,
        last_modified: last_modified.as_deref(),
        policy,
    };

    if cache::is_not_modified(
        ctx.if_none_match,
        ctx.if_modified_since,
        &etag,
        file.modified,
    ) {
        return http_util::build_304_response(&meta);
    }

    let total_size = file.content.len();
    match range::resolve_range(ctx.range_header, total_size) {
        RangeOutcome::Partial(r) => build_partial_response(
            file.content.slice(r.start..=r.end),
            &meta,
            r,
            total_size,
            ctx.is_head,
        ),
        RangeOutcome::Unsatisfiable => http_util::build_416_response(total_size),
        RangeOutcome::Full => build_content_response(file.content, &meta, ctx.is_head),
    }
}
