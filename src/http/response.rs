//! HTTP response building module
//!
//! Builders for every status the server answers with. None of them panic: a
//! builder error is logged and replaced by an empty response.

use super::cache::CachePolicy;
use super::range::ByteRange;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
    LAST_MODIFIED, LOCATION,
};
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};

/// Headers describing a served representation
#[derive(Debug, Clone, Copy)]
pub struct ContentMeta<'a> {
    pub content_type: &'a str,
    pub etag: &'a str,
    pub last_modified: Option<&'a str>,
    pub policy: CachePolicy,
}

impl ContentMeta<'_> {
    fn apply(&self, mut builder: Builder) -> Builder {
        builder = builder
            .header(ETAG, self.etag)
            .header(CACHE_CONTROL, self.policy.header_value());
        if let Some(date) = self.last_modified {
            builder = builder.header(LAST_MODIFIED, date);
        }
        builder
    }
}

/// Build 200 OK with the whole representation
pub fn build_content_response(
    data: Bytes,
    meta: &ContentMeta<'_>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, meta.content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ACCEPT_RANGES, "bytes");
    finish(meta.apply(builder), body, "200")
}

/// Build 206 Partial Content for one byte range of `total_size` bytes
pub fn build_partial_response(
    data: Bytes,
    meta: &ContentMeta<'_>,
    range: ByteRange,
    total_size: usize,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let body = if is_head { Bytes::new() } else { data };

    let builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(CONTENT_TYPE, meta.content_type)
        .header(CONTENT_LENGTH, range.content_length())
        .header(
            CONTENT_RANGE,
            format!("bytes {}-{}/{total_size}", range.start, range.end),
        )
        .header(ACCEPT_RANGES, "bytes");
    finish(meta.apply(builder), body, "206")
}

/// Build 304 Not Modified, repeating the validators and caching policy
pub fn build_304_response(meta: &ContentMeta<'_>) -> Response<Full<Bytes>> {
    let builder = Response::builder().status(StatusCode::NOT_MODIFIED);
    finish(meta.apply(builder), Bytes::new(), "304")
}

/// Build 301 redirect, used to add the trailing slash to directories
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8");
    finish(builder, Bytes::from(format!("Redirecting to {location}")), "301")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    plain_text(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_RANGE, format!("bytes */{file_size}"));
    finish(builder, Bytes::from("416 Range Not Satisfiable"), "416")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

fn plain_text(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, text.len());
    finish(builder, Bytes::from_static(text.as_bytes()), status.as_str())
}

fn finish(builder: Builder, body: Bytes, label: &str) -> Response<Full<Bytes>> {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        crate::logger::log_error(&format!("Failed to build {label} response: {e}"));
        Response::new(Full::new(Bytes::new()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(policy: CachePolicy) -> ContentMeta<'static> {
        ContentMeta {
            content_type: "text/css; charset=utf-8",
            etag: "\"abc\"",
            last_modified: Some("Wed, 21 Oct 2015 07:28:00 GMT"),
            policy,
        }
    }

    #[test]
    fn test_content_response_headers() {
        let resp = build_content_response(
            Bytes::from_static(b"body{}"),
            &meta(CachePolicy::Immutable),
            false,
        );
        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h[CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(h[CONTENT_LENGTH], "6");
        assert_eq!(h[CACHE_CONTROL], "public, max-age=31536000, immutable");
        assert_eq!(h[ETAG], "\"abc\"");
        assert_eq!(h[LAST_MODIFIED], "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(h[ACCEPT_RANGES], "bytes");
    }

    #[test]
    fn test_head_keeps_length() {
        let resp = build_content_response(
            Bytes::from_static(b"body{}"),
            &meta(CachePolicy::Immutable),
            true,
        );
        assert_eq!(resp.headers()[CONTENT_LENGTH], "6");
    }

    #[test]
    fn test_partial_response() {
        let resp = build_partial_response(
            Bytes::from_static(b"dy"),
            &meta(CachePolicy::Immutable),
            ByteRange { start: 2, end: 3 },
            6,
            false,
        );
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 2-3/6");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "2");
    }

    #[test]
    fn test_304_keeps_policy() {
        let resp = build_304_response(&meta(CachePolicy::NoStore));
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(
            resp.headers()[CACHE_CONTROL],
            "no-store, no-cache, must-revalidate, private"
        );
        assert!(resp.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_error_responses() {
        assert_eq!(build_404_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            build_500_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let resp = build_416_response(6);
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes */6");
    }

    #[test]
    fn test_redirect() {
        let resp = build_redirect_response("/docs/");
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/docs/");
    }
}
