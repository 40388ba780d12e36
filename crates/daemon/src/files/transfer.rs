//! Streaming uploads and downloads.
//!
//! Uploads stream the request body straight into the target file with
//! create-or-truncate semantics. Downloads hand back an open read handle
//! that the HTTP layer turns into a response body stream.
//!
//! Neither direction is atomic. A failed or cancelled upload leaves the bytes
//! written so far on disk, and a download racing an upload may observe a
//! partially written file. File handles are owned values: they are released
//! when the upload future or the download stream is dropped, including on
//! client disconnect.

use std::io;
use std::pin::pin;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::{FileError, ResolvedPath};

/// Default upload size limit (1GB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// An opened file ready to be streamed to a client.
#[derive(Debug)]
pub struct FileDownload {
    file: File,
    file_name: String,
    size: u64,
    modified: Option<SystemTime>,
}

impl FileDownload {
    /// Name suggested to the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File size at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time at open time, if the platform reports one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Convert into a byte stream that owns the file handle.
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::new(self.file)
    }
}

/// File transfer handler.
#[derive(Debug, Clone, Copy)]
pub struct FileTransfer {
    /// Maximum number of bytes accepted per upload.
    max_upload_size: u64,
}

impl Default for FileTransfer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_SIZE)
    }
}

impl FileTransfer {
    /// Create a new file transfer handler.
    pub fn new(max_upload_size: u64) -> Self {
        Self { max_upload_size }
    }

    /// Write `body` to `path`, replacing any existing file.
    ///
    /// Missing parent directories are created first. Returns the number of
    /// bytes written.
    pub async fn upload<S, E>(&self, path: &ResolvedPath, body: S) -> Result<u64, FileError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if path.is_root() {
            return Err(FileError::InvalidPath(
                "cannot upload to the storage root".to_string(),
            ));
        }

        path.ensure_contained().await?;

        if let Some(parent) = path.as_path().parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::io(path, e))?;
        }

        let mut file = File::create(path.as_path())
            .await
            .map_err(|e| FileError::io(path, e))?;

        let mut body = pin!(body);
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FileError::io(path, io::Error::other(e)))?;

            if written + chunk.len() as u64 > self.max_upload_size {
                drop(file);
                if let Err(e) = fs::remove_file(path.as_path()).await {
                    warn!(path = %path, error = %e, "Failed to remove oversized upload");
                }
                return Err(FileError::PayloadTooLarge {
                    path: path.to_string(),
                    limit: self.max_upload_size,
                });
            }

            file.write_all(&chunk)
                .await
                .map_err(|e| FileError::io(path, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| FileError::io(path, e))?;

        debug!(path = %path, bytes = written, "Upload written");
        Ok(written)
    }

    /// Open the file at `path` for streaming.
    pub async fn download(&self, path: &ResolvedPath) -> Result<FileDownload, FileError> {
        path.ensure_contained().await?;

        let file = File::open(path.as_path())
            .await
            .map_err(|e| FileError::classify(path, e))?;

        let metadata = file.metadata().await.map_err(|e| FileError::io(path, e))?;
        if metadata.is_dir() {
            return Err(FileError::IsDirectory(path.to_string()));
        }

        let file_name = path.file_name().unwrap_or("download").to_string();

        Ok(FileDownload {
            file,
            file_name,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}
