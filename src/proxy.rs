//! Local HTTP front end that answers every request through [`OfflineCache::resolve`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use reqwest::Url;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::OfflineCache;
use crate::fetch::{AssetRequest, AssetResponse, Fetcher};
use crate::store::CacheStorage;

/// Header added to every proxied response: `hit` or `miss`.
pub const SOURCE_HEADER: &str = "x-offline-cache";

const HEALTH_PATH: &str = "/__offline-cache/health";

// Connection-level headers that must not be forwarded in either direction.
const HOP_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
];

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    cache: String,
}

async fn health<S, F>(State(cache): State<Arc<OfflineCache<S, F>>>) -> impl IntoResponse
where
    S: CacheStorage,
    F: Fetcher,
{
    axum::Json(HealthResponse {
        status: "ok".to_string(),
        cache: cache.config().cache_name.clone(),
    })
}

async fn forward<S, F>(
    State(cache): State<Arc<OfflineCache<S, F>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: CacheStorage,
    F: Fetcher,
{
    let url = target_url(&cache.config().origin, &uri);
    let mut request = AssetRequest::get(url)
        .with_method(method)
        .with_body(body);
    request.headers = headers
        .iter()
        .filter(|(name, _)| !is_hop_header(name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    match cache.resolve(&request).await {
        Ok(resolved) => into_http(resolved.response, resolved.source.as_str()),
        Err(e) => {
            log::warn!("Network fallback for {} failed: {e}", request.url);
            (
                StatusCode::BAD_GATEWAY,
                [(HeaderName::from_static(SOURCE_HEADER), "miss")],
                e.to_string(),
            )
                .into_response()
        }
    }
}

/// Maps an incoming request target onto `origin`.
///
/// Only the path and query are taken from `uri`, so a target such as
/// `//other.host/x` stays on the origin host.
fn target_url(origin: &Url, uri: &Uri) -> Url {
    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url.set_fragment(None);
    url
}

fn is_hop_header(name: &str) -> bool {
    HOP_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

fn into_http(response: AssetResponse, source: &'static str) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if is_hop_header(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers.insert(
        HeaderName::from_static(SOURCE_HEADER),
        HeaderValue::from_static(source),
    );
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
    }

    (status, headers, response.body).into_response()
}

/// Builds the proxy router. Every path except the health check is resolved
/// through `cache`.
pub fn router<S, F>(cache: Arc<OfflineCache<S, F>>) -> Router
where
    S: CacheStorage + 'static,
    F: Fetcher + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(HEALTH_PATH, get(health::<S, F>))
        .fallback(forward::<S, F>)
        .layer(cors)
        .with_state(cache)
}

/// Serves the proxy on `addr` until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve<S, F>(cache: Arc<OfflineCache<S, F>>, addr: SocketAddr) -> std::io::Result<()>
where
    S: CacheStorage + 'static,
    F: Fetcher + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        "Serving {} for {} on http://{}",
        cache.config().cache_name,
        cache.config().origin,
        listener.local_addr()?
    );
    axum::serve(listener, router(cache)).await
}
