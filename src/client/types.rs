//! Client-side data types and error definitions.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Ordered form fields a client builds from a validated submission.
///
/// The relay sends every entry as a text part and does not interpret them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    fields: Vec<(String, String)>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for Payload {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// What the downstream API answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status_code: u16,
    pub body: String,
}

impl RelayResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// The downstream call did not produce a usable response.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Copying the upload to the spool file failed.
    #[error("failed to spool upload: {0}")]
    Spool(#[source] io::Error),

    /// The transfer did not finish within the configured timeout.
    #[error("downstream request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure talking to the downstream API.
    #[error("downstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The downstream API answered with a non-success status.
    #[error("downstream API responded with status {status}")]
    UpstreamStatus { status: u16, body: String },
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
