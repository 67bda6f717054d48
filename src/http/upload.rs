//! Multipart boundary adapter.
//!
//! # Responsibilities
//! - Turn an inbound `multipart/form-data` body into a RawSubmission
//! - Spool the file part to disk in fixed-size chunks as it arrives
//!
//! # Design Decisions
//! - Parts may come in any order: the file is spooled and reading continues,
//!   so text fields sent after it are still seen
//! - A file input submitted empty (no filename) counts as no file
//! - Only the first `userfile` part is kept; other file parts are skipped

use std::io;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::submission::{fields, FileUpload, RawSubmission, Spooler};

/// The inbound body could not be read as a form submission.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("expected a multipart/form-data request")]
    NotMultipart,

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("failed to spool uploaded file: {0}")]
    Spool(#[source] io::Error),
}

impl UploadError {
    /// Whether the client's body, rather than local storage, was at fault.
    fn is_client_error(&self) -> bool {
        match self {
            UploadError::NotMultipart | UploadError::Multipart(_) => true,
            UploadError::Spool(e) => e
                .get_ref()
                .is_some_and(|inner| inner.is::<multer::Error>()),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            (StatusCode::BAD_REQUEST, self.to_string()).into_response()
        } else {
            tracing::error!(error = %self, "Upload could not be spooled");
            (StatusCode::INTERNAL_SERVER_ERROR, "Upload could not be stored.").into_response()
        }
    }
}

/// Read every part of the form, spooling the file part with `spooler`.
pub async fn read_submission(
    request: Request<Body>,
    spooler: &Spooler,
) -> Result<RawSubmission, UploadError> {
    let boundary = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(UploadError::NotMultipart)
        .and_then(|ct| multer::parse_boundary(ct).map_err(|_| UploadError::NotMultipart))?;

    let mut multipart = multer::Multipart::new(request.into_body().into_data_stream(), boundary);
    let mut raw = RawSubmission::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_owned);

        match file_name {
            Some(file_name) if name == fields::USERFILE => {
                if file_name.is_empty() || raw.has_file() {
                    continue;
                }
                let content_type = field.content_type().map(|m| m.to_string());

                let mut upload = FileUpload::from_stream(field).with_file_name(file_name);
                if let Some(content_type) = content_type {
                    upload = upload.with_content_type(content_type);
                }
                raw.set_file(upload.spool(spooler).await.map_err(UploadError::Spool)?);
            }
            Some(_) => {
                tracing::debug!(field = %name, "Skipping unexpected file part");
            }
            None => {
                let value = field.text().await?;
                raw.insert_field(name, value);
            }
        }
    }

    Ok(raw)
}
