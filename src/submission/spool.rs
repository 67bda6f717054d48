//! On-disk spooling of uploads.
//!
//! # Responsibilities
//! - Copy an upload through a fixed-size buffer into a temp file
//! - Rewind the file so it can be streamed out again
//!
//! # Design Decisions
//! - The spool file is a `NamedTempFile`; dropping the handle deletes it, so
//!   a rejected or failed submission never leaves a file behind
//! - At most one chunk of the upload is in memory at a time
//! - Chunk sizes outside the configurable bounds are clamped, never trusted

use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::config::validation::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::config::RelayConfig;
use crate::observability::metrics;

/// Default copy buffer size.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const SPOOL_PREFIX: &str = "upload-relay-";

/// An upload copied to disk and rewound, ready to be streamed out.
#[derive(Debug)]
pub struct SpooledUpload {
    file: File,
    len: u64,
    temp: NamedTempFile,
}

impl SpooledUpload {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// The open file plus the guard that deletes it on drop.
    pub(crate) fn into_parts(self) -> (File, u64, NamedTempFile) {
        (self.file, self.len, self.temp)
    }
}

/// Copies readers to spool files with a bounded buffer.
#[derive(Debug, Clone)]
pub struct Spooler {
    chunk_size: usize,
    dir: Option<PathBuf>,
}

impl Spooler {
    /// `dir` of `None` spools into the system temp dir.
    pub fn new(chunk_size: usize, dir: Option<PathBuf>) -> Self {
        let clamped = chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        if clamped != chunk_size {
            tracing::warn!(requested = chunk_size, using = clamped, "Chunk size out of bounds, clamped");
        }
        Self {
            chunk_size: clamped,
            dir,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.upstream.chunk_size, config.upstream.spool_dir.clone())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Copy `reader` to a fresh spool file, one chunk at a time.
    pub async fn spool<R>(&self, mut reader: R) -> io::Result<SpooledUpload>
    where
        R: AsyncRead + Unpin,
    {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SPOOL_PREFIX);
        let temp = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let mut file = File::from_std(temp.reopen()?);
        let mut buf = vec![0u8; self.chunk_size];
        let mut len = 0u64;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            len += n as u64;
        }

        file.flush().await?;
        file.rewind().await?;

        metrics::record_spooled_bytes(len);
        tracing::debug!(bytes = len, path = %temp.path().display(), "Upload spooled");
        Ok(SpooledUpload { file, len, temp })
    }
}

impl Default for Spooler {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, None)
    }
}
