//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use upload_relay::config::RelayConfig;
use upload_relay::http::HttpServer;
use upload_relay::lifecycle::Shutdown;
use upload_relay::relay::RelayOrchestrator;

/// One multipart request as the downstream saw it.
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub file: Vec<u8>,
}

/// Every request a recording downstream has received.
#[derive(Clone, Default)]
pub struct Recorder {
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl Recorder {
    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct DownstreamState {
    recorder: Recorder,
    status: StatusCode,
}

/// Start a downstream API that records each multipart request and answers
/// with `status`.
pub async fn start_downstream(status: u16) -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let state = DownstreamState {
        recorder: recorder.clone(),
        status: StatusCode::from_u16(status).unwrap(),
    };

    let app = Router::new()
        .route("/upload", post(record_upload))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, recorder)
}

/// Start a downstream API that holds every request for `delay` before
/// answering `200 OK`.
pub async fn start_stalled_downstream(delay: Duration) -> SocketAddr {
    let app = Router::new().route(
        "/upload",
        post(move || async move {
            tokio::time::sleep(delay).await;
            "OK"
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn record_upload(
    State(state): State<DownstreamState>,
    request: Request<Body>,
) -> (StatusCode, &'static str) {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let boundary = multer::parse_boundary(&content_type).unwrap();
    let mut multipart = multer::Multipart::new(request.into_body().into_data_stream(), boundary);

    let mut received = ReceivedUpload::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                received.file_name = Some(file_name);
                received.file = field.bytes().await.unwrap().to_vec();
            }
            None => {
                received.fields.insert(name, field.text().await.unwrap());
            }
        }
    }

    state.recorder.uploads.lock().unwrap().push(received);
    let body = if state.status.is_success() { "OK" } else { "downstream exploded" };
    (state.status, body)
}

/// A running relay bound to an ephemeral port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub config_updates: mpsc::UnboundedSender<RelayConfig>,
    pub shutdown: Shutdown,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the relay with the given config on 127.0.0.1:0.
pub async fn start_relay(config: RelayConfig) -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let http = RelayOrchestrator::build_http_client(&config.timeouts).unwrap();
    let orchestrator = RelayOrchestrator::new(Default::default(), http);
    let server = HttpServer::new(config, orchestrator);

    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server_shutdown: broadcast::Receiver<()> = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, updates_rx, server_shutdown).await.unwrap();
    });

    TestRelay {
        addr,
        config_updates,
        shutdown,
    }
}

/// Relay config pointing at a downstream started by `start_downstream`.
pub fn relay_config(downstream: SocketAddr, api_client: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.api_url = format!("http://{}/upload", downstream);
    config.upstream.api_client = api_client.to_string();
    config.upstream.api_key = "test-key".to_string();
    config
}

/// The reference form fields, in submission order.
pub fn reference_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("trans_num", "10827900900900"),
        ("port_of_entry", "440"),
        ("ccd_num", "1234567890"),
        ("eta_date", "2023-01-31"),
        ("eta_time", "12:30"),
    ]
}

/// Build a form with text fields first and the file last.
pub fn form(fields: &[(&'static str, &'static str)], file: Option<Vec<u8>>) -> reqwest::multipart::Form {
    let mut form = reqwest::multipart::Form::new();
    for (name, value) in fields {
        form = form.text(*name, *value);
    }
    if let Some(contents) = file {
        let part = reqwest::multipart::Part::bytes(contents)
            .file_name("manifest.txt")
            .mime_str("text/plain")
            .unwrap();
        form = form.part("userfile", part);
    }
    form
}

/// Build a form with the file first and the text fields after it.
pub fn form_file_first(
    fields: &[(&'static str, &'static str)],
    file: Vec<u8>,
) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(file)
        .file_name("manifest.txt")
        .mime_str("text/plain")
        .unwrap();
    let mut form = reqwest::multipart::Form::new().part("userfile", part);
    for (name, value) in fields {
        form = form.text(*name, *value);
    }
    form
}
