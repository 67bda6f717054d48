//! Submission data model.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveTime};
use futures_util::{Stream, TryStreamExt};
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::submission::spool::{SpooledUpload, Spooler};

/// Inbound field names.
pub mod fields {
    pub const TRANS_NUM: &str = "trans_num";
    pub const PORT_OF_ENTRY: &str = "port_of_entry";
    pub const CCD_NUM: &str = "ccd_num";
    pub const ETA_DATE: &str = "eta_date";
    pub const ETA_TIME: &str = "eta_time";
    pub const USERFILE: &str = "userfile";
}

/// The attached file: a read-once byte stream or a spool file, never a buffer.
pub struct FileUpload {
    file_name: Option<String>,
    content_type: Option<String>,
    source: Source,
}

enum Source {
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    Spooled(SpooledUpload),
}

impl FileUpload {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            file_name: None,
            content_type: None,
            source: Source::Stream(Box::new(reader)),
        }
    }

    /// Wrap a chunked body stream, e.g. a multipart field.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let stream = Box::pin(stream.map_err(io::Error::other));
        Self::new(StreamReader::new(stream))
    }

    /// In-memory upload, for small payloads and tests.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(io::Cursor::new(bytes.into()))
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self.source, Source::Spooled(_))
    }

    /// Drain the stream into a spool file now, keeping name and content type.
    /// Already spooled uploads are returned untouched.
    pub async fn spool(self, spooler: &Spooler) -> io::Result<Self> {
        let Self {
            file_name,
            content_type,
            source,
        } = self;
        let spooled = match source {
            Source::Spooled(spooled) => spooled,
            Source::Stream(reader) => spooler.spool(reader).await?,
        };
        Ok(Self {
            file_name,
            content_type,
            source: Source::Spooled(spooled),
        })
    }

    /// Consume the handle for its spool file, spooling first if needed.
    pub async fn into_spooled(self, spooler: &Spooler) -> io::Result<SpooledUpload> {
        match self.source {
            Source::Spooled(spooled) => Ok(spooled),
            Source::Stream(reader) => spooler.spool(reader).await,
        }
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("spooled", &self.is_spooled())
            .finish_non_exhaustive()
    }
}

/// Field values as received at the boundary.
#[derive(Debug, Default)]
pub struct RawSubmission {
    fields: HashMap<String, String>,
    file: Option<FileUpload>,
}

impl RawSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_field(name, value);
        self
    }

    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }

    /// Record a text field. A repeated name keeps the last value.
    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_file(&mut self, file: FileUpload) {
        self.file = Some(file);
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    pub(crate) fn take_file(&mut self) -> Option<FileUpload> {
        self.file.take()
    }
}

/// A submission whose fields all passed validation.
///
/// Only [`validate`](crate::submission::validate) constructs one.
#[derive(Debug)]
pub struct ValidatedSubmission {
    transaction_number: u64,
    cargo_control_number: String,
    port_of_entry: u16,
    eta_date: Option<NaiveDate>,
    eta_time: Option<NaiveTime>,
    file: FileUpload,
}

impl ValidatedSubmission {
    pub(crate) fn new(
        transaction_number: u64,
        cargo_control_number: String,
        port_of_entry: u16,
        eta_date: Option<NaiveDate>,
        eta_time: Option<NaiveTime>,
        file: FileUpload,
    ) -> Self {
        Self {
            transaction_number,
            cargo_control_number,
            port_of_entry,
            eta_date,
            eta_time,
            file,
        }
    }

    pub fn transaction_number(&self) -> u64 {
        self.transaction_number
    }

    pub fn cargo_control_number(&self) -> &str {
        &self.cargo_control_number
    }

    pub fn port_of_entry(&self) -> u16 {
        self.port_of_entry
    }

    pub fn eta_date(&self) -> Option<NaiveDate> {
        self.eta_date
    }

    pub fn eta_time(&self) -> Option<NaiveTime> {
        self.eta_time
    }

    pub fn file(&self) -> &FileUpload {
        &self.file
    }

    /// Give up the submission for its file stream.
    pub fn into_file(self) -> FileUpload {
        self.file
    }
}

/// Machine-readable reason a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Required,
    Invalid,
    MinValue,
    MaxValue,
    MinLength,
    MaxLength,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::Invalid => "invalid",
            ErrorCode::MinValue => "min_value",
            ErrorCode::MaxValue => "max_value",
            ErrorCode::MinLength => "min_length",
            ErrorCode::MaxLength => "max_length",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    #[serde(skip)]
    pub field: &'static str,
    pub message: String,
    pub code: ErrorCode,
}

impl FieldError {
    pub fn new(field: &'static str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            code,
        }
    }
}

/// Field name → ordered errors for that field.
///
/// Serializes as `{"trans_num": [{"message": "...", "code": "min_value"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<FieldError>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.entry(error.field).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields carrying at least one error.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[FieldError]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, errors)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            let codes: Vec<_> = errors.iter().map(|e| e.code.as_str()).collect();
            write!(f, "{}: {}", field, codes.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_serialize_shape() {
        let mut errors = FieldErrors::new();
        errors.push(FieldError::new(
            fields::TRANS_NUM,
            ErrorCode::MinValue,
            "Transaction must be 14 digits.",
        ));

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(
            json,
            r#"{"trans_num":[{"message":"Transaction must be 14 digits.","code":"min_value"}]}"#
        );
    }

    #[test]
    fn test_field_errors_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.push(FieldError::new("a", ErrorCode::Invalid, "x"));
        errors.push(FieldError::new("a", ErrorCode::MaxValue, "y"));
        errors.push(FieldError::new("b", ErrorCode::Required, "z"));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("a").unwrap().len(), 2);
        assert_eq!(errors.to_string(), "a: invalid,max_value; b: required");
    }

    #[tokio::test]
    async fn test_file_upload_from_stream_reads_all_chunks() {
        let dir = tempfile::TempDir::new().unwrap();
        let spooler = Spooler::new(512, Some(dir.path().to_path_buf()));
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"testing, ")),
            Ok(Bytes::from_static(b"testing, ")),
            Ok(Bytes::from_static(b"1,2,3")),
        ];
        let upload = FileUpload::from_stream(futures_util::stream::iter(chunks))
            .with_file_name("test.txt");
        assert_eq!(upload.file_name(), Some("test.txt"));
        assert!(!upload.is_spooled());

        let spooled = upload.into_spooled(&spooler).await.unwrap();
        assert_eq!(std::fs::read(spooled.path()).unwrap(), b"testing, testing, 1,2,3");
    }

    #[tokio::test]
    async fn test_spooled_upload_is_not_copied_again() {
        let dir = tempfile::TempDir::new().unwrap();
        let spooler = Spooler::new(512, Some(dir.path().to_path_buf()));

        let upload = FileUpload::from_bytes(&b"abc"[..])
            .with_file_name("a.txt")
            .with_content_type("text/plain")
            .spool(&spooler)
            .await
            .unwrap();
        assert!(upload.is_spooled());
        assert_eq!(upload.file_name(), Some("a.txt"));
        assert_eq!(upload.content_type(), Some("text/plain"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let spooled = upload.into_spooled(&spooler).await.unwrap();
        assert_eq!(spooled.len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        drop(spooled);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
