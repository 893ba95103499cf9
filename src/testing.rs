//! Shared test doubles.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::Result;
use crate::fetch::{AssetRequest, AssetResponse, Fetcher};

pub const ORIGIN: &str = "https://blocks.test/";

enum Outcome {
    Respond { status: u16, body: &'static str },
    Fail,
}

/// A scripted fetcher answering by URL path and recording every request.
///
/// Paths without a script fail like a refused connection.
pub struct MockFetcher {
    outcomes: Mutex<HashMap<String, Outcome>>,
    calls: Mutex<Vec<AssetRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, path: &str, status: u16, body: &'static str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(path.to_string(), Outcome::Respond { status, body });
        self
    }

    pub fn fail(self, path: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(path.to_string(), Outcome::Fail);
        self
    }

    pub fn calls(&self) -> Vec<AssetRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let outcomes = self.outcomes.lock().unwrap();
        match outcomes.get(request.url.path()) {
            Some(Outcome::Respond { status, body }) => Ok(AssetResponse::new(
                request.url.as_str(),
                *status,
            )
            .with_header("content-type", "text/plain")
            .with_body(*body)),
            Some(Outcome::Fail) | None => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("no route to {}", request.url),
            )
            .into()),
        }
    }
}

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

/// Starts a small origin server on a random local port.
#[cfg(feature = "proxy")]
pub async fn spawn_origin() -> Url {
    use axum::Router;
    use axum::http::{Uri, header};
    use axum::response::Html;
    use axum::routing::{get, post};

    let app = Router::new()
        .route("/", get(|| async { Html("<h1>blocks</h1>") }))
        .route(
            "/app.js",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/javascript")],
                    "console.log('app');",
                )
            }),
        )
        .route(
            "/echo",
            get(|uri: Uri| async move { uri.query().unwrap_or_default().to_string() }),
        )
        .route("/echo-body", post(|body: String| async move { body }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}
