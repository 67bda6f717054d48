//! Bounded-memory transfer of an upload to the downstream API.
//!
//! # Responsibilities
//! - Make sure the upload sits in a spool file on disk
//! - Stream the spool file as the file part of a multipart POST
//! - Send the payload's fields as text parts of the same request
//! - Apply the downstream timeout and classify failures
//!
//! # Design Decisions
//! - Spooling lives in [`Spooler`]; uploads the boundary already spooled
//!   are sent from their existing file
//! - Every exit path of `send` drops the spool guard, deleting the file
//! - At most one chunk of the upload is in memory at a time, both while
//!   spooling and while streaming it out

use std::path::PathBuf;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;

use crate::client::types::{Payload, RelayError, RelayResponse, RelayResult};
use crate::config::RelayConfig;
use crate::submission::{fields, FileUpload, Spooler, DEFAULT_CHUNK_SIZE};

/// Where and how the relay transfers uploads.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// URL the multipart request is posted to.
    pub api_url: String,
    /// Name of the multipart file part.
    pub file_field: String,
    /// Copy buffer size in bytes. Clamped when the relay is built.
    pub chunk_size: usize,
    /// Spool directory; the system temp dir when `None`.
    pub spool_dir: Option<PathBuf>,
    /// Deadline for the downstream request.
    pub timeout: Duration,
}

impl RelaySettings {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            file_field: fields::USERFILE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            spool_dir: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            api_url: config.upstream.api_url.clone(),
            file_field: fields::USERFILE.to_string(),
            chunk_size: config.upstream.chunk_size,
            spool_dir: config.upstream.spool_dir.clone(),
            timeout: config.timeouts.upstream(),
        }
    }
}

/// Streams uploads through a spool file into multipart requests.
#[derive(Debug, Clone)]
pub struct StreamingRelay {
    http: reqwest::Client,
    settings: RelaySettings,
    spooler: Spooler,
}

impl StreamingRelay {
    pub fn new(http: reqwest::Client, mut settings: RelaySettings) -> Self {
        let spooler = Spooler::new(settings.chunk_size, settings.spool_dir.clone());
        settings.chunk_size = spooler.chunk_size();
        Self {
            http,
            settings,
            spooler,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn spooler(&self) -> &Spooler {
        &self.spooler
    }

    /// Send the payload and the upload as one multipart request.
    ///
    /// The upload is fully spooled before the request starts. The spool file
    /// is deleted before this returns, whatever the outcome.
    pub async fn send(&self, payload: Payload, upload: FileUpload) -> RelayResult<RelayResponse> {
        let file_name = upload.file_name().map(str::to_owned);
        let content_type = upload.content_type().map(str::to_owned);

        let spooled = upload
            .into_spooled(&self.spooler)
            .await
            .map_err(RelayError::Spool)?;
        let (file, len, _guard) = spooled.into_parts();

        let body = reqwest::Body::wrap_stream(ReaderStream::with_capacity(
            file,
            self.spooler.chunk_size(),
        ));
        let mut part = Part::stream_with_length(body, len);
        if let Some(name) = file_name {
            part = part.file_name(name);
        }
        if let Some(mime) = content_type.filter(|ct| is_valid_mime(ct)) {
            part = part.mime_str(&mime)?;
        }

        let mut form = Form::new();
        for (name, value) in payload {
            form = form.text(name, value);
        }
        let form = form.part(self.settings.file_field.clone(), part);

        let response = self
            .http
            .post(&self.settings.api_url)
            .timeout(self.settings.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        tracing::debug!(status = status_code, bytes = len, "Downstream responded");
        Ok(RelayResponse { status_code, body })
    }

    fn classify(&self, error: reqwest::Error) -> RelayError {
        if error.is_timeout() {
            RelayError::Timeout(self.settings.timeout)
        } else {
            RelayError::Transport(error)
        }
    }
}

fn is_valid_mime(value: &str) -> bool {
    Part::bytes(Vec::new()).mime_str(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};
    use bytes::Bytes;
    use std::io;
    use std::path::Path;

    fn relay_in(dir: &Path, api_url: &str, chunk_size: usize) -> StreamingRelay {
        let mut settings = RelaySettings::new(api_url);
        settings.chunk_size = chunk_size;
        settings.spool_dir = Some(dir.to_path_buf());
        settings.timeout = Duration::from_secs(5);
        StreamingRelay::new(reqwest::Client::new(), settings)
    }

    fn spool_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}/upload", addr)
    }

    /// Answers with the number of body bytes it received.
    async fn start_sink() -> String {
        serve(Router::new().route(
            "/upload",
            post(|body: Bytes| async move { body.len().to_string() }),
        ))
        .await
    }

    /// Holds every request for `delay` before answering.
    async fn start_stalled_sink(delay: Duration) -> String {
        serve(Router::new().route(
            "/upload",
            post(move || async move {
                tokio::time::sleep(delay).await;
                "late"
            }),
        ))
        .await
    }

    #[tokio::test]
    async fn test_spool_failure_removes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let relay = relay_in(dir.path(), "http://127.0.0.1:1/", 1024);

        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from(vec![b'x'; 10 * 1024])),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let upload = FileUpload::from_stream(futures_util::stream::iter(chunks));

        let err = relay.send(Payload::new(), upload).await.unwrap_err();
        assert!(matches!(err, RelayError::Spool(_)));
        assert_eq!(spool_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_send_success_removes_spool_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = start_sink().await;
        let relay = relay_in(dir.path(), &url, 1024);

        let mut payload = Payload::new();
        payload.insert("api_key", "test");
        let upload = FileUpload::from_bytes(vec![b'z'; 256 * 1024]).with_file_name("big.bin");

        let response = relay.send(payload, upload).await.unwrap();

        assert_eq!(response.status_code, 200);
        let received: usize = response.body.parse().unwrap();
        assert!(received > 256 * 1024, "multipart body should carry the whole file");
        assert_eq!(spool_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_already_spooled_upload_is_sent_and_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = start_sink().await;
        let relay = relay_in(dir.path(), &url, 1024);

        let upload = FileUpload::from_bytes(vec![b'z'; 64 * 1024])
            .spool(relay.spooler())
            .await
            .unwrap();
        assert_eq!(spool_entries(dir.path()), 1);

        let response = relay.send(Payload::new(), upload).await.unwrap();
        let received: usize = response.body.parse().unwrap();
        assert!(received > 64 * 1024);
        assert_eq!(spool_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_send_transport_failure_removes_spool_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let relay = relay_in(dir.path(), &format!("http://{}/upload", addr), 1024);

        let upload = FileUpload::from_bytes(&b"testing, testing, 1,2,3"[..]);
        let err = relay.send(Payload::new(), upload).await.unwrap_err();

        assert!(matches!(err, RelayError::Transport(_)));
        assert_eq!(spool_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stalled_downstream_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = start_stalled_sink(Duration::from_secs(5)).await;
        let mut settings = RelaySettings::new(url);
        settings.spool_dir = Some(dir.path().to_path_buf());
        settings.timeout = Duration::from_millis(300);
        let relay = StreamingRelay::new(reqwest::Client::new(), settings);

        let upload = FileUpload::from_bytes(&b"testing, testing, 1,2,3"[..]);
        let err = relay.send(Payload::new(), upload).await.unwrap_err();

        match err {
            RelayError::Timeout(after) => assert_eq!(after, Duration::from_millis(300)),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(spool_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_zero_chunk_size_relays_whole_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = start_sink().await;
        let relay = relay_in(dir.path(), &url, 0);
        assert!(relay.settings().chunk_size > 0);

        let upload = FileUpload::from_bytes(vec![b'z'; 32 * 1024]).with_file_name("z.bin");
        let response = relay.send(Payload::new(), upload).await.unwrap();

        let received: usize = response.body.parse().unwrap();
        assert!(received > 32 * 1024, "file must not be relayed empty");
    }

    #[test]
    fn test_mime_probe() {
        assert!(is_valid_mime("text/plain"));
        assert!(!is_valid_mime("not a mime"));
    }
}
