//! Directory listing and metadata inspection.
//!
//! Both operations are read-only and re-read the filesystem on every call.

use std::io;
use std::time::SystemTime;

use protocol::{sort_listing, EntryKind, ListingEntry};
use tokio::fs::{self, DirEntry};
use tracing::debug;

use super::{FileError, ResolvedPath};

/// Size and modification time of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileMetadata {
    /// Modification time as an RFC 1123 date in GMT, as used by `Last-Modified`.
    pub fn last_modified_http(&self) -> String {
        httpdate::fmt_http_date(self.modified)
    }
}

/// Read-only view of the storage tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryBrowser;

impl DirectoryBrowser {
    /// Create a new directory browser.
    pub fn new() -> Self {
        Self
    }

    /// Report what currently exists at `path`, following symlinks.
    ///
    /// Returns `None` when nothing is there, including when a parent
    /// segment is a regular file.
    pub async fn probe(&self, path: &ResolvedPath) -> Result<Option<EntryKind>, FileError> {
        match fs::metadata(path.as_path()).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(FileError::io(path, e)),
        }
    }

    /// List the immediate children of a directory.
    ///
    /// Entries are ordered files first, then directories, each group by
    /// byte-wise name. Hidden entries are included. Names that are not valid
    /// UTF-8 are converted lossily.
    pub async fn list_directory(&self, dir: &ResolvedPath) -> Result<Vec<ListingEntry>, FileError> {
        dir.ensure_contained().await?;

        let metadata = fs::metadata(dir.as_path())
            .await
            .map_err(|e| FileError::classify(dir, e))?;
        if !metadata.is_dir() {
            return Err(FileError::NotFound(dir.to_string()));
        }

        let mut entries = fs::read_dir(dir.as_path())
            .await
            .map_err(|e| FileError::classify(dir, e))?;

        let mut results = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FileError::io(dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();

            let kind = match entry_kind(&entry).await {
                Ok(kind) => kind,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Removed between enumeration and stat.
                    debug!(dir = %dir, name = %name, "Skipping vanished entry");
                    continue;
                }
                Err(e) => return Err(FileError::io(dir, e)),
            };

            results.push(ListingEntry::new(name, kind));
        }

        sort_listing(&mut results);

        debug!(dir = %dir, count = results.len(), "Listed directory");
        Ok(results)
    }

    /// Read the size and modification time of a file.
    ///
    /// Directories report [`FileError::NotFound`]: only files have metadata
    /// exposed this way.
    pub async fn inspect(&self, path: &ResolvedPath) -> Result<FileMetadata, FileError> {
        if path.is_root() {
            return Err(FileError::InvalidPath("a file path is required".to_string()));
        }
        path.ensure_contained().await?;

        let metadata = fs::metadata(path.as_path())
            .await
            .map_err(|e| FileError::classify(path, e))?;
        if metadata.is_dir() {
            return Err(FileError::NotFound(path.to_string()));
        }

        let modified = metadata.modified().map_err(|e| FileError::io(path, e))?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified,
        })
    }
}

/// Classify an entry. Symlinks take the kind of their target; a dangling
/// link lists as a file.
async fn entry_kind(entry: &DirEntry) -> io::Result<EntryKind> {
    let file_type = entry.file_type().await?;

    if file_type.is_dir() {
        return Ok(EntryKind::Directory);
    }

    if file_type.is_symlink() {
        return match fs::metadata(entry.path()).await {
            Ok(target) if target.is_dir() => Ok(EntryKind::Directory),
            Ok(_) => Ok(EntryKind::File),
            Err(e) if is_missing(&e) => Ok(EntryKind::File),
            Err(e) => Err(e),
        };
    }

    Ok(EntryKind::File)
}

/// Whether an I/O error means "nothing at this path".
pub(crate) fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
