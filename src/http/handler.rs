//! Axum router and smart-HTTP request handlers.
//!
//! Git traffic is routed by path suffix through the fallback handler, since
//! upstream repository paths have arbitrary depth:
//!
//! - `GET  .../info/refs?service=git-upload-pack` - advertisement (or pass-through)
//! - `POST .../git-upload-pack`                   - protocol v2 command dispatch
//! - `.../git-receive-pack`                       - always rejected; the proxy is read-only
//! - `GET  /healthz`, `GET /metrics`              - fixed routes
//!
//! The upstream host is taken from the request `Host` header: clients are
//! pointed at the proxy (or MITM-routed through it) with the original URL
//! intact.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::extract_basic_credential;
use crate::errors::ProxyError;
use crate::http::dispatch;
use crate::metrics::{Endpoint, RequestLabels, StatusClass};
use crate::protocol::pktline;
use crate::protocol::request::parse_commands;
use crate::AppState;

const ADVERTISEMENT_TYPE: &str = "application/x-git-upload-pack-advertisement";
const RESULT_TYPE: &str = "application/x-git-upload-pack-result";

/// Protocol v2 requests are small (the packfiles travel in responses), but a
/// fetch with many haves still needs headroom.
const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .fallback(handle_git_request)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            log_request,
        ))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request logging middleware
// ---------------------------------------------------------------------------

/// Record one log line and one counter sample per served request.
pub async fn log_request(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let endpoint = classify_endpoint(&path);
    let request_size = content_length(req.headers());
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    state
        .metrics
        .metrics
        .requests_total
        .get_or_create(&RequestLabels {
            endpoint,
            status: StatusClass::from_status(status.as_u16()),
        })
        .inc();
    if state.config.settings.log_requests {
        tracing::info!(
            %method,
            %path,
            status = status.as_u16(),
            request_size,
            response_size = content_length(response.headers()),
            latency_ms = start.elapsed().as_millis() as u64,
            "request served"
        );
    }
    response
}

fn classify_endpoint(path: &str) -> Endpoint {
    if path.ends_with("/info/refs") {
        Endpoint::InfoRefs
    } else if path.ends_with("/git-upload-pack") {
        Endpoint::UploadPack
    } else if path.ends_with("/git-receive-pack") {
        Endpoint::ReceivePack
    } else {
        Endpoint::Other
    }
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Fixed routes
// ---------------------------------------------------------------------------

async fn handle_health() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "ok\n")
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut out = String::new();
    if let Err(err) = prometheus_client::encoding::text::encode(&mut out, &state.metrics.registry)
    {
        return plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("metrics encoding failed: {err}"),
        );
    }
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Git endpoint routing
// ---------------------------------------------------------------------------

/// Route a Git smart-HTTP request by path suffix.
async fn handle_git_request(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    // Writes are unconditionally refused, before any other validation.
    if path.ends_with("/git-receive-pack") {
        return plain_response(StatusCode::BAD_REQUEST, "git-receive-pack is not supported");
    }

    let is_info_refs = path.ends_with("/info/refs");
    let is_upload_pack = path.ends_with("/git-upload-pack");
    if !is_info_refs && !is_upload_pack {
        return plain_response(StatusCode::BAD_REQUEST, "unsupported path");
    }

    let url = match request_url(&parts.uri, &parts.headers) {
        Ok(url) => url,
        Err(err) => return plain_response(err.http_status(), &err.to_string()),
    };

    if is_info_refs {
        if parts.method != Method::GET {
            return plain_response(StatusCode::BAD_REQUEST, "info/refs only supports GET");
        }
        return handle_info_refs(&state, &parts.headers, url).await;
    }

    if parts.method != Method::POST {
        return plain_response(
            StatusCode::BAD_REQUEST,
            "git-upload-pack only supports POST",
        );
    }
    let body = match axum::body::to_bytes(body, MAX_REQUEST_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            return plain_response(
                StatusCode::BAD_REQUEST,
                &format!("cannot read the request body: {err}"),
            )
        }
    };
    handle_upload_pack(&state, &parts.headers, url, body).await
}

/// Reassemble the full request URL from the URI and the `Host` header.
fn request_url(uri: &Uri, headers: &HeaderMap) -> Result<Url, ProxyError> {
    let host = uri
        .authority()
        .map(|authority| authority.to_string())
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .ok_or_else(|| ProxyError::BadRequest("missing Host header".to_string()))?;
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Url::parse(&format!("https://{host}{path_and_query}"))
        .map_err(|e| ProxyError::BadRequest(format!("cannot parse the request URL: {e}")))
}

fn require_protocol_v2(headers: &HeaderMap) -> Result<(), ProxyError> {
    let value = headers.get("Git-Protocol").and_then(|v| v.to_str().ok());
    if value != Some("version=2") {
        return Err(ProxyError::BadRequest(
            "only Git protocol version=2 is supported".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// info/refs
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(url = %url))]
async fn handle_info_refs(state: &AppState, headers: &HeaderMap, url: Url) -> Response {
    let service = url
        .query_pairs()
        .find(|(key, _)| key == "service")
        .map(|(_, value)| value.into_owned());
    if service.as_deref() != Some("git-upload-pack") {
        return plain_response(StatusCode::BAD_REQUEST, "accepts only git-fetch");
    }
    if let Err(err) = require_protocol_v2(headers) {
        return plain_response(StatusCode::BAD_REQUEST, &err.to_string());
    }

    if !state.registry.exists(&url) {
        // Unknown repository: forward the request unchanged so the upstream
        // can demand authentication. The mirror is created on the
        // subsequent /git-upload-pack.
        debug!("unknown mirror, passing info/refs through to upstream");
        return match passthrough_info_refs(state, &url, headers).await {
            Ok(response) => response,
            Err(err) => plain_response(err.http_status(), &err.to_string()),
        };
    }
    let Some(mirror) = state.registry.get(&url) else {
        return plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "could not verify if repository exists",
        );
    };

    if !mirror.is_public().await && !headers.contains_key(header::AUTHORIZATION) {
        return (
            StatusCode::UNAUTHORIZED,
            [
                (header::CONTENT_TYPE, ADVERTISEMENT_TYPE),
                (header::WWW_AUTHENTICATE, "Basic realm=\"mirrorcache\""),
            ],
            "unauthorized - please send basic auth credentials",
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, ADVERTISEMENT_TYPE)],
        synthetic_advertisement(),
    )
        .into_response()
}

/// The canned capability advertisement for cached repositories.
///
/// `ref-in-want` is deliberately absent: local serving runs lockless against
/// concurrent fetches, and hash-wants are resolved against the object
/// database at enumeration time, which keeps that race harmless.
fn synthetic_advertisement() -> Vec<u8> {
    let mut out = Vec::new();
    for line in [
        "version 2\n",
        "ls-refs\n",
        "fetch=filter shallow\n",
        "server-option\n",
    ] {
        out.extend_from_slice(&pktline::encode_pkt_line(line.as_bytes()));
    }
    out.extend_from_slice(b"0000");
    out
}

async fn passthrough_info_refs(
    state: &AppState,
    url: &Url,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let mut request = state
        .http_client
        .get(url.as_str())
        .header("Git-Protocol", "version=2");
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        request = request.header(header::AUTHORIZATION, auth);
    }

    let upstream = request
        .send()
        .await
        .map_err(|e| ProxyError::Internal(anyhow!("cannot reach the upstream: {e}")))?;

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(ADVERTISEMENT_TYPE)
        .to_string();
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Internal(anyhow!("cannot read the upstream response: {e}")))?;

    Ok((status, [(header::CONTENT_TYPE, content_type)], body).into_response())
}

// ---------------------------------------------------------------------------
// git-upload-pack
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(url = %url))]
async fn handle_upload_pack(
    state: &AppState,
    headers: &HeaderMap,
    url: Url,
    body: Bytes,
) -> Response {
    if let Err(err) = require_protocol_v2(headers) {
        return plain_response(StatusCode::BAD_REQUEST, &err.to_string());
    }

    let auth = extract_basic_credential(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    );

    let body: Vec<u8> = if content_encoding_is_gzip(headers) {
        match gunzip(&body) {
            Ok(decoded) => decoded,
            Err(err) => {
                return result_error(
                    &ProxyError::BadRequest(format!("cannot ungzip: {err}")),
                    "error while reading the request",
                )
            }
        }
    } else {
        body.to_vec()
    };

    let commands = match parse_commands(&body) {
        Ok(commands) => commands,
        Err(err) => return result_error(&err, "error while parsing commands"),
    };

    let mirror = state.registry.get_or_create(&url, auth.as_deref());
    state
        .metrics
        .metrics
        .mirrors_registered
        .set(state.registry.len() as i64);

    if let Err(err) = mirror.open().await {
        return result_error(&err, "error while opening managed repository");
    }

    // A synthetic upstream credential never influences mirror privacy or
    // the access list; it only authenticates upstream calls.
    let upstream_auth = auth.clone().or_else(|| state.token_source.authorization());
    let check_interval = Duration::from_secs(state.config.settings.check_interval_secs);
    let cancel = CancellationToken::new();

    let mut out = Vec::new();
    for command in &commands {
        if let Err(err) = dispatch::handle_command(
            &mirror,
            command,
            &mut out,
            upstream_auth.as_deref(),
            check_interval,
            &cancel,
            &state.metrics.metrics,
        )
        .await
        {
            warn!(error = %err, "command dispatch failed");
            return result_error(&err, "error while processing commands");
        }
    }

    // The credential demonstrably reached the upstream; remember it.
    if let Some(auth) = &auth {
        if !mirror.has_access(auth).await {
            mirror.add_access(auth).await;
        }
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, RESULT_TYPE)], out).into_response()
}

fn content_encoding_is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        == Some("gzip")
}

fn gunzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = flate2::read::GzDecoder::new(body);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn plain_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.to_string(),
    )
        .into_response()
}

/// Error response on the upload-pack endpoint, which expects the result
/// content type rather than text/plain.
fn result_error(err: &ProxyError, context: &str) -> Response {
    (
        err.http_status(),
        [(header::CONTENT_TYPE, RESULT_TYPE)],
        format!("{context}: {err}"),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoToken;
    use crate::config::{ServerConfig, Settings};
    use crate::git::GitRunner;
    use crate::metrics::MetricsRegistry;
    use crate::mirror::MirrorRegistry;
    use crate::ops::NoopOperationLogger;
    use crate::protocol::pktline::PktLine;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    fn test_state(root: &Path) -> Arc<AppState> {
        let http_client = reqwest::Client::new();
        Arc::new(AppState {
            config: Arc::new(ServerConfig {
                port: 0,
                cache_root: root.to_path_buf(),
                settings: Settings::default(),
            }),
            registry: Arc::new(MirrorRegistry::new(
                root.to_path_buf(),
                GitRunner::new(PathBuf::from("git")),
                http_client.clone(),
                Arc::new(NoopOperationLogger),
            )),
            http_client,
            metrics: MetricsRegistry::new(),
            token_source: Arc::new(NoToken),
        })
    }

    fn request(method: &str, uri: &str) -> axum::http::request::Builder {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "example.invalid")
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn receive_pack_is_always_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let app = create_router(Arc::clone(&state));

        let response = app
            .oneshot(
                request("POST", "/any/repo.git/git-receive-pack")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_string(response).await,
            "git-receive-pack is not supported"
        );
        // No mirror was registered, no directory created.
        assert!(state.registry.is_empty());
        assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn unknown_paths_are_bad_requests() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_state(tmp.path()));
        let response = app
            .oneshot(request("GET", "/not-a-git-url").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_pack_requires_protocol_v2() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_state(tmp.path()));
        let response = app
            .oneshot(
                request("POST", "/org/repo.git/git-upload-pack")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("version=2"));
    }

    #[tokio::test]
    async fn unrecognized_commands_are_bad_requests() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let app = create_router(Arc::clone(&state));

        let mut body = pktline::encode_pkt_line(b"command=push-certs\n");
        body.extend_from_slice(b"0000");

        let response = app
            .oneshot(
                request("POST", "/r.git/git-upload-pack")
                    .header("Git-Protocol", "version=2")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("unrecognized command"));
        // Rejected before any mirror was created.
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn gzip_bodies_are_decompressed() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_state(tmp.path()));

        let mut plain = pktline::encode_pkt_line(b"command=push-certs\n");
        plain.extend_from_slice(b"0000");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).unwrap();
        let compressed = encoder.finish().unwrap();

        let response = app
            .oneshot(
                request("POST", "/r.git/git-upload-pack")
                    .header("Git-Protocol", "version=2")
                    .header(header::CONTENT_ENCODING, "gzip")
                    .body(Body::from(compressed))
                    .unwrap(),
            )
            .await
            .unwrap();

        // The gunzipped body parsed far enough to hit the command check.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("unrecognized command"));
    }

    #[tokio::test]
    async fn corrupt_gzip_is_a_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_state(tmp.path()));
        let response = app
            .oneshot(
                request("POST", "/r.git/git-upload-pack")
                    .header("Git-Protocol", "version=2")
                    .header(header::CONTENT_ENCODING, "gzip")
                    .body(Body::from(&b"not gzip at all"[..]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("ungzip"));
    }

    #[tokio::test]
    async fn info_refs_rejects_other_services() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_state(tmp.path()));
        let response = app
            .oneshot(
                request(
                    "GET",
                    "/org/repo.git/info/refs?service=git-receive-pack",
                )
                .header("Git-Protocol", "version=2")
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "accepts only git-fetch");
    }

    #[tokio::test]
    async fn known_mirror_gets_the_synthetic_advertisement() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let url = Url::parse("https://example.invalid/org/repo.git").unwrap();
        state.registry.get_or_create(&url, None);

        let app = create_router(Arc::clone(&state));
        let response = app
            .oneshot(
                request("GET", "/org/repo.git/info/refs?service=git-upload-pack")
                    .header("Git-Protocol", "version=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(ADVERTISEMENT_TYPE)
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let packets = pktline::decode_pkt_lines(&bytes).unwrap();
        let lines: Vec<String> = packets
            .iter()
            .filter_map(|p| match p {
                PktLine::Data(d) => Some(String::from_utf8_lossy(d).trim_end().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(
            lines,
            ["version 2", "ls-refs", "fetch=filter shallow", "server-option"]
        );
        assert_eq!(packets.last(), Some(&PktLine::Flush));
        assert!(!lines.iter().any(|l| l.contains("ref-in-want")));
    }

    #[tokio::test]
    async fn private_mirror_requires_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let url = Url::parse("https://example.invalid/private/r.git").unwrap();
        state.registry.get_or_create(&url, Some("Basic abc"));

        let app = create_router(Arc::clone(&state));
        let response = app
            .oneshot(
                request("GET", "/private/r.git/info/refs?service=git-upload-pack")
                    .header("Git-Protocol", "version=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(ADVERTISEMENT_TYPE)
        );
        assert!(body_string(response).await.contains("unauthorized"));
    }

    #[tokio::test]
    async fn private_mirror_with_credentials_is_served() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());
        let url = Url::parse("https://example.invalid/private/r.git").unwrap();
        state.registry.get_or_create(&url, Some("Basic abc"));

        let app = create_router(Arc::clone(&state));
        let response = app
            .oneshot(
                request("GET", "/private/r.git/info/refs?service=git-upload-pack")
                    .header("Git-Protocol", "version=2")
                    .header(header::AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_metrics_routes() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_state(tmp.path()));

        let health = app
            .clone()
            .oneshot(request("GET", "/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(body_string(health).await, "ok\n");

        let metrics = app
            .oneshot(request("GET", "/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(metrics.status(), StatusCode::OK);
        assert!(body_string(metrics).await.contains("mirrorcache_"));
    }

    #[test]
    fn request_url_prefers_the_host_header() {
        let uri: Uri = "/org/repo.git/info/refs?service=git-upload-pack"
            .parse()
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "example.invalid".parse().unwrap());
        let url = request_url(&uri, &headers).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.invalid/org/repo.git/info/refs?service=git-upload-pack"
        );
    }

    #[test]
    fn request_url_without_host_is_an_error() {
        let uri: Uri = "/org/repo.git/info/refs".parse().unwrap();
        let err = request_url(&uri, &HeaderMap::new()).unwrap_err();
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    }
}
