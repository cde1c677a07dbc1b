//! Test helper utilities for driving the queue server and print agent

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use tire_label_queue::app_state::AppState;
use tire_label_queue::config::ServerConfig;
use tire_label_queue::routes;
use tire_label_queue::services::client::API_KEY_HEADER;
use tire_label_queue::services::printer::{PrintError, Printer};
use tire_label_queue::services::queue::JobStore;

pub const BOUNDARY: &str = "label-test-boundary";

/// Server state with an empty store and labels written under `labels_dir`.
pub fn test_state(api_key: Option<&str>, labels_dir: &Path, remote_printing: bool) -> AppState {
    let config = ServerConfig {
        print_agent_api_key: api_key.map(str::to_string),
        remote_printing,
        labels_dir: labels_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    AppState::new(config, Arc::new(JobStore::new()))
}

pub fn app(state: AppState) -> Router {
    routes::api_router(state)
}

/// Run one request through the router and decode the JSON body.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// POST an arbitrary (possibly malformed) JSON body.
pub fn post_raw(uri: &str, api_key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a `POST /api/labels` multipart request.
pub fn upload_request(
    api_key: Option<&str>,
    sku: &str,
    label: &[u8],
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    let mut text_part = |name: &str, value: &str| {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    };
    text_part("sku", sku);
    for (name, value) in fields {
        text_part(name, value);
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"label\"; filename=\"label.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(label);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/labels")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Serve the queue API on an ephemeral local port. Returns the base URL.
pub async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    let app = routes::api_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Printer double that records calls instead of shelling out to `lp`.
pub struct FakePrinter {
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl FakePrinter {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail_with: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(detail: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(detail.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Printer for FakePrinter {
    fn name(&self) -> &str {
        "test-printer"
    }

    async fn print(&self, _path: &Path) -> Result<(), PrintError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(detail) => Err(PrintError::PrintFailure(detail.clone())),
            None => Ok(()),
        }
    }
}
