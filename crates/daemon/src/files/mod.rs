//! Storage-root file operations behind the HTTP surface.
//!
//! This module provides the sandboxed filesystem operations the router
//! dispatches to:
//! - Path resolution confined to the storage root
//! - Directory listing and metadata inspection
//! - Streaming uploads and downloads
//! - File and recursive directory deletion
//!
//! # Security
//!
//! Every operation takes a [`ResolvedPath`], which can only be produced by
//! [`StorageRoot::resolve`]. Resolution rejects any request path whose `..`
//! segments would climb above the root. Before touching the filesystem,
//! operations also canonicalize the target with
//! [`ResolvedPath::ensure_contained`], so a symlink placed inside the root
//! cannot lead them outside it.
//!
//! # Consistency
//!
//! The filesystem is the only source of truth. Nothing is cached and nothing
//! is locked: a reader may observe a file that a concurrent upload is still
//! writing, and two concurrent uploads to one path leave an interleaved or
//! last-writer-wins result.

pub mod browser;
pub mod removal;
pub mod resolver;
pub mod transfer;

use std::io;

use thiserror::Error;

pub use browser::{DirectoryBrowser, FileMetadata};
pub use protocol::{EntryKind, ListingEntry};
pub use removal::FileRemover;
pub use resolver::{ResolvedPath, StorageRoot};
pub use transfer::{FileDownload, FileTransfer, DEFAULT_MAX_UPLOAD_SIZE};

/// Errors produced by storage-root operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// The request path is missing, malformed, or escapes the storage root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A symlink below the root leads to a location outside it.
    #[error("symlink points outside the storage root: {0}")]
    SymlinkOutsideRoot(String),

    /// The target file or directory does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A file operation was attempted on a directory.
    #[error("path is a directory: {0}")]
    IsDirectory(String),

    /// An upload exceeded the configured size limit.
    #[error("upload to {path} exceeds the limit of {limit} bytes")]
    PayloadTooLarge { path: String, limit: u64 },

    /// Any other filesystem failure.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// Wrap an I/O error, mapping a missing target to [`FileError::NotFound`].
    pub(crate) fn classify(path: &ResolvedPath, err: io::Error) -> Self {
        if browser::is_missing(&err) {
            FileError::NotFound(path.to_string())
        } else {
            FileError::io(path, err)
        }
    }

    /// Wrap an I/O error as a server-side failure.
    pub(crate) fn io(path: &ResolvedPath, err: io::Error) -> Self {
        FileError::Io {
            path: path.to_string(),
            source: err,
        }
    }
}
