//! Request path resolution confined to the storage root.
//!
//! Resolution is purely lexical: it never touches the filesystem. A request
//! path is split into segments, `.` and empty segments are dropped, and `..`
//! pops the previous segment. A `..` with nothing left to pop would climb
//! above the root and is rejected.
//!
//! Lexical resolution cannot see symlinks. Operations that touch the
//! filesystem therefore also call [`ResolvedPath::ensure_contained`], which
//! canonicalizes the target and checks that it is still below the root.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::browser::is_missing;
use super::FileError;

/// The directory that bounds all served content.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    /// Canonical absolute path of the root.
    root: PathBuf,
}

impl StorageRoot {
    /// Open the storage root at `path`, creating it if absent.
    ///
    /// Relative paths are interpreted against the working directory. The
    /// stored path is canonical, so every resolved path shares its prefix.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let root = fs::canonicalize(path)?;

        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("storage root is not a directory: {}", root.display()),
            ));
        }

        Ok(Self { root })
    }

    /// Absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a slash-separated request path against the root.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, FileError> {
        let mut segments: Vec<&str> = Vec::new();

        for segment in request_path.split(is_separator) {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(FileError::InvalidPath(format!(
                            "{} escapes the storage root",
                            request_path
                        )));
                    }
                }
                name => {
                    validate_segment(name, request_path)?;
                    segments.push(name);
                }
            }
        }

        let mut absolute = self.root.clone();
        absolute.extend(&segments);

        Ok(ResolvedPath {
            root: self.root.clone(),
            absolute,
            relative: segments.join("/"),
        })
    }
}

/// A location below the storage root, produced only by [`StorageRoot::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    root: PathBuf,
    absolute: PathBuf,
    /// Normalized `/`-joined path relative to the root; empty for the root.
    relative: String,
}

impl ResolvedPath {
    /// Absolute filesystem path.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Normalized path relative to the root, without a leading slash.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this is the storage root itself.
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Final path segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.relative.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Check that the target, with every symlink followed, lies below the root.
    ///
    /// Trailing segments that do not exist yet are skipped, so for a new
    /// upload the deepest existing ancestor is what gets checked. A dangling
    /// symlink on the way cannot be verified and is rejected.
    pub async fn ensure_contained(&self) -> Result<(), FileError> {
        self.check_within_root(&self.absolute).await
    }

    /// Like [`ensure_contained`](Self::ensure_contained), but the final
    /// segment is left unresolved. For operations that act on a symlink itself.
    pub async fn ensure_parent_contained(&self) -> Result<(), FileError> {
        match self.absolute.parent() {
            Some(parent) if !self.is_root() => self.check_within_root(parent).await,
            _ => Ok(()),
        }
    }

    async fn check_within_root(&self, target: &Path) -> Result<(), FileError> {
        for ancestor in target.ancestors() {
            match tokio::fs::canonicalize(ancestor).await {
                Ok(canonical) if canonical.starts_with(&self.root) => return Ok(()),
                Ok(_) => return Err(FileError::SymlinkOutsideRoot(self.to_string())),
                Err(e) if is_missing(&e) => {
                    let dangling = tokio::fs::symlink_metadata(ancestor)
                        .await
                        .map(|metadata| metadata.file_type().is_symlink())
                        .unwrap_or(false);
                    if dangling {
                        return Err(FileError::SymlinkOutsideRoot(self.to_string()));
                    }
                }
                Err(e) => return Err(FileError::io(self, e)),
            }
        }

        Ok(())
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.relative)
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || std::path::is_separator(c)
}

/// A segment must be exactly one plain file name on this host.
fn validate_segment(segment: &str, request_path: &str) -> Result<(), FileError> {
    if segment.contains('\0') {
        return Err(FileError::InvalidPath(format!(
            "{} contains a NUL byte",
            request_path.escape_debug()
        )));
    }

    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(FileError::InvalidPath(format!(
            "{} contains an invalid segment {:?}",
            request_path, segment
        ))),
    }
}
