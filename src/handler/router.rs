//! Request dispatch module
//!
//! Entry point for HTTP request processing: routes the request, dispatches
//! the decision and writes the access log.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, RequestInfo, RouteDecision};
use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{HeaderName, ACCEPT, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed to build a file response
///
/// Validators and ranges are only honoured for GET and HEAD; other methods
/// always get the full body.
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range_header: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    fn from_parts(parts: &'a Parts) -> Self {
        let is_head = parts.method == Method::HEAD;
        let conditional = is_head || parts.method == Method::GET;
        let headers: &'a HeaderMap = &parts.headers;
        let get = |name| {
            if conditional {
                header_str(headers, name)
            } else {
                None
            }
        };
        Self {
            path: parts.uri.path(),
            is_head,
            if_none_match: get(IF_NONE_MATCH),
            if_modified_since: get(IF_MODIFIED_SINCE),
            range_header: get(RANGE),
        }
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Main entry point for HTTP request handling
///
/// The request body is never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let response = respond(&parts, &state).await;

    if state.access_log {
        let entry = AccessLogEntry::from_request(
            &peer,
            &parts.method,
            &parts.uri,
            parts.version,
            &parts.headers,
        )
        .with_response(
            response.status().as_u16(),
            response.body().size_hint().exact().unwrap_or(0),
            started.elapsed(),
        );
        logger::log_access(&entry, &state.access_log_format);
    }

    Ok(response)
}

/// Route a request and build its response
pub async fn respond(parts: &Parts, state: &AppState) -> Response<Full<Bytes>> {
    let info = RequestInfo {
        method: &parts.method,
        path: parts.uri.path(),
        query: parts.uri.query(),
        accept: header_str(&parts.headers, ACCEPT),
    };
    let decision = routing::decide(&info, &state.site);
    logger::log_debug(&format!(
        "{} {} -> {decision:?}",
        parts.method,
        parts.uri.path()
    ));

    let ctx = RequestContext::from_parts(parts);
    match decision {
        RouteDecision::ServeFile { path, kind } => {
            static_files::serve_file(&ctx, &path, kind).await
        }
        RouteDecision::Redirect { location } => http::build_redirect_response(&location),
        RouteDecision::ServeEntryDocument => {
            static_files::serve_entry_document(&ctx, state.site.entry_document()).await
        }
        RouteDecision::NotFound => http::build_404_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TempSite;
    use http_body_util::BodyExt;
    use hyper::header::{
        CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
        LOCATION,
    };
    use hyper::StatusCode;

    const INDEX: &str = "<!doctype html><html><body><app-root></app-root></body></html>";
    const CSS: &str = "body{margin:0}";
    const NO_STORE: &str = "no-store, no-cache, must-revalidate, private";
    const IMMUTABLE: &str = "public, max-age=31536000, immutable";
    const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    fn demandas_site() -> TempSite {
        TempSite::new()
            .file("index.html", INDEX)
            .file("styles.a1b2.css", CSS)
            .file("main.9f8e7d.js", "console.log('demandas')")
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        headers: &[(HeaderName, &str)],
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        let req = builder.body(()).unwrap();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        let resp = handle_request(req, Arc::clone(state), peer).await.unwrap();
        let (parts, body) = resp.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (parts.status, parts.headers, bytes)
    }

    async fn get_html(state: &Arc<AppState>, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        send(state, Method::GET, uri, &[(ACCEPT, BROWSER_ACCEPT)]).await
    }

    #[tokio::test]
    async fn test_serves_hashed_asset() {
        let site = demandas_site();
        let state = site.state();

        let (status, headers, body) = get_html(&state, "/styles.a1b2.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], IMMUTABLE);
        assert_eq!(headers[CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(headers[CONTENT_LENGTH], CSS.len().to_string().as_str());
        assert!(headers.contains_key(ETAG));
        assert!(headers.contains_key(LAST_MODIFIED));
        assert_eq!(body, CSS.as_bytes());
    }

    #[tokio::test]
    async fn test_spa_route_gets_entry_document() {
        let site = demandas_site();
        let state = site.state();

        let (status, headers, body) = get_html(&state, "/demandas").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], NO_STORE);
        assert_eq!(headers[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body, INDEX.as_bytes());

        let (status, _, body) = get_html(&state, "/demandas/17/observacoes?tab=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, INDEX.as_bytes());
    }

    #[tokio::test]
    async fn test_root_serves_index_uncached() {
        let site = demandas_site();
        let state = site.state();

        let (status, headers, body) = send(&state, Method::GET, "/", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], NO_STORE);
        assert_eq!(body, INDEX.as_bytes());

        let (_, headers, _) = get_html(&state, "/index.html").await;
        assert_eq!(headers[CACHE_CONTROL], NO_STORE);
    }

    #[tokio::test]
    async fn test_missing_asset_is_404() {
        let site = demandas_site();
        let state = site.state();

        let (status, _, _) = get_html(&state, "/missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = get_html(&state, "/v1.2/report").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_get_methods() {
        let site = demandas_site();
        let state = site.state();

        let (status, headers, body) =
            send(&state, Method::POST, "/main.9f8e7d.js", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], IMMUTABLE);
        assert_eq!(body, "console.log('demandas')".as_bytes());

        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let (status, _, _) =
                send(&state, method, "/demandas", &[(ACCEPT, BROWSER_ACCEPT)]).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_json_client_gets_404() {
        let site = demandas_site();
        let state = site.state();

        let (status, _, _) = send(
            &state,
            Method::GET,
            "/demandas",
            &[(ACCEPT, "application/json")],
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_repeated_requests_identical() {
        let site = demandas_site();
        let state = site.state();

        for uri in ["/styles.a1b2.css", "/demandas", "/missing.png"] {
            let first = get_html(&state, uri).await;
            let second = get_html(&state, uri).await;
            assert_eq!(first, second, "{uri} changed between requests");
        }
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let site = demandas_site();
        let state = site.state();

        let (status, headers, body) = send(&state, Method::HEAD, "/styles.a1b2.css", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_LENGTH], CSS.len().to_string().as_str());
        assert!(body.is_empty());

        let (status, _, _) = send(&state, Method::HEAD, "/demandas", &[]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let site = demandas_site();
        let state = site.state();

        let (_, headers, _) = get_html(&state, "/styles.a1b2.css").await;
        let etag = headers[ETAG].to_str().unwrap().to_string();

        let (status, headers, body) =
            send(&state, Method::GET, "/styles.a1b2.css", &[(IF_NONE_MATCH, etag.as_str())]).await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);
        assert_eq!(headers[CACHE_CONTROL], IMMUTABLE);
        assert!(body.is_empty());

        let (status, headers, _) =
            send(&state, Method::GET, "/demandas", &[(IF_NONE_MATCH, "\"stale\"")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], NO_STORE);
    }

    #[tokio::test]
    async fn test_validators_ignored_for_post() {
        let site = demandas_site();
        let state = site.state();

        let (_, headers, _) = get_html(&state, "/styles.a1b2.css").await;
        let etag = headers[ETAG].to_str().unwrap().to_string();

        let (status, _, body) =
            send(&state, Method::POST, "/styles.a1b2.css", &[(IF_NONE_MATCH, etag.as_str())]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, CSS.as_bytes());
    }

    #[tokio::test]
    async fn test_range_request() {
        let site = demandas_site();
        let state = site.state();

        let (status, headers, body) =
            send(&state, Method::GET, "/styles.a1b2.css", &[(RANGE, "bytes=0-3")]).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            headers[CONTENT_RANGE],
            format!("bytes 0-3/{}", CSS.len()).as_str()
        );
        assert_eq!(body, "body".as_bytes());

        let (status, _, _) =
            send(&state, Method::GET, "/styles.a1b2.css", &[(RANGE, "bytes=999-")]).await;
        assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[tokio::test]
    async fn test_traversal_blocked() {
        let outside = TempSite::new().file("secret.txt", "top secret");
        let site = demandas_site();
        let state = site.state();

        let escape = format!("/../{}/secret.txt", outside.dir_name());
        let (status, _, body) = get_html(&state, &escape).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_ne!(body, "top secret".as_bytes());

        let encoded = format!("/%2e%2e/{}/secret.txt", outside.dir_name());
        let (status, _, _) = get_html(&state, &encoded).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dotfiles_hidden() {
        let site = demandas_site().file(".env", "API_TOKEN=abc");
        let state = site.state();

        let (status, _, _) = get_html(&state, "/.env").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_directory_redirect() {
        let site = demandas_site().file("relatorios/index.html", "<html>relatorios</html>");
        let state = site.state();

        let (status, headers, _) = get_html(&state, "/relatorios").await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(headers[LOCATION], "/relatorios/");

        let (status, headers, body) = get_html(&state, "/relatorios/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], NO_STORE);
        assert_eq!(body, "<html>relatorios</html>".as_bytes());
    }

    #[tokio::test]
    async fn test_redirect_stays_on_host() {
        let site = demandas_site().file("evil.example/index.html", "<html>dir</html>");
        let state = site.state();

        for uri in ["//evil.example", "//attacker.test/../evil.example"] {
            let (status, headers, _) = get_html(&state, uri).await;
            assert_eq!(status, StatusCode::MOVED_PERMANENTLY, "{uri}");
            assert_eq!(headers[LOCATION], "/evil.example/", "{uri}");
        }

        let (_, headers, _) = get_html(&state, "//evil.example?tab=2").await;
        assert_eq!(headers[LOCATION], "/evil.example/?tab=2");
    }

    #[tokio::test]
    async fn test_trailing_slash_after_file() {
        let site = demandas_site();
        let state = site.state();

        for uri in ["/main.9f8e7d.js/", "/index.html/"] {
            let (status, _, _) = get_html(&state, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_file_removed_after_routing_is_404() {
        let site = demandas_site().file("logo.svg", "<svg/>");
        let state = site.state();
        let (parts, ()) = Request::get("/logo.svg").body(()).unwrap().into_parts();
        let info = RequestInfo {
            method: &parts.method,
            path: parts.uri.path(),
            query: None,
            accept: None,
        };

        let RouteDecision::ServeFile { path, kind } = routing::decide(&info, &state.site) else {
            panic!("logo.svg should be routed to the static rule");
        };
        std::fs::remove_file(&path).unwrap();

        let ctx = RequestContext::from_parts(&parts);
        let resp = static_files::serve_file(&ctx, &path, kind).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_entry_document_is_500() {
        let site = TempSite::new().file("styles.a1b2.css", CSS);
        let state = site.state();

        let (status, _, _) = get_html(&state, "/demandas").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _, _) = get_html(&state, "/styles.a1b2.css").await;
        assert_eq!(status, StatusCode::OK);
    }
}
