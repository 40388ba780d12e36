//! File and directory deletion.
//!
//! Directory removal is recursive and not transactional: if it fails part
//! way through, the entries already removed stay removed and the caller sees
//! an I/O failure.

use protocol::EntryKind;
use tokio::fs;
use tracing::debug;

use super::{FileError, ResolvedPath};

/// Deletion handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRemover;

impl FileRemover {
    /// Create a new remover.
    pub fn new() -> Self {
        Self
    }

    /// Remove whatever exists at `path` and report what it was.
    ///
    /// Anything that is not a directory, including a symlink, is removed as a
    /// single entry; symlinks are never followed. Directories are removed with
    /// their full contents. The storage root itself cannot be removed.
    pub async fn remove(&self, path: &ResolvedPath) -> Result<EntryKind, FileError> {
        if path.is_root() {
            return Err(FileError::InvalidPath(
                "refusing to delete the storage root".to_string(),
            ));
        }

        path.ensure_parent_contained().await?;

        let metadata = fs::symlink_metadata(path.as_path())
            .await
            .map_err(|e| FileError::classify(path, e))?;

        if metadata.is_dir() {
            fs::remove_dir_all(path.as_path())
                .await
                .map_err(|e| FileError::classify(path, e))?;
            debug!(path = %path, "Removed directory tree");
            Ok(EntryKind::Directory)
        } else {
            fs::remove_file(path.as_path())
                .await
                .map_err(|e| FileError::classify(path, e))?;
            debug!(path = %path, "Removed file");
            Ok(EntryKind::File)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::StorageRoot;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StorageRoot) {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[tokio::test]
    async fn test_remove_file() {
        let (_temp_dir, root) = setup();
        std_fs::write(root.path().join("file.txt"), "x").unwrap();

        let kind = FileRemover::new()
            .remove(&root.resolve("file.txt").unwrap())
            .await
            .unwrap();

        assert_eq!(kind, EntryKind::File);
        assert!(!root.path().join("file.txt").exists());
    }

    #[tokio::test]
    async fn test_remove_directory_recursively() {
        let (_temp_dir, root) = setup();
        std_fs::create_dir_all(root.path().join("tree/a/b")).unwrap();
        std_fs::write(root.path().join("tree/top.txt"), "t").unwrap();
        std_fs::write(root.path().join("tree/a/b/leaf.txt"), "l").unwrap();
        std_fs::write(root.path().join("keep.txt"), "k").unwrap();

        let kind = FileRemover::new()
            .remove(&root.resolve("tree").unwrap())
            .await
            .unwrap();

        assert_eq!(kind, EntryKind::Directory);
        assert!(!root.path().join("tree").exists());
        assert!(root.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_remove_not_found() {
        let (_temp_dir, root) = setup();

        let result = FileRemover::new()
            .remove(&root.resolve("missing").unwrap())
            .await;
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_root_rejected() {
        let (_temp_dir, root) = setup();
        std_fs::write(root.path().join("file.txt"), "x").unwrap();

        let result = FileRemover::new().remove(&root.resolve("a/..").unwrap()).await;

        assert!(matches!(result, Err(FileError::InvalidPath(_))));
        assert!(root.path().join("file.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remove_symlink_keeps_target() {
        use std::os::unix::fs::symlink;

        let (_temp_dir, root) = setup();
        let outside = TempDir::new().unwrap();
        std_fs::write(outside.path().join("precious.txt"), "p").unwrap();
        symlink(outside.path(), root.path().join("link")).unwrap();

        let kind = FileRemover::new()
            .remove(&root.resolve("link").unwrap())
            .await
            .unwrap();

        assert_eq!(kind, EntryKind::File);
        assert!(!root.path().join("link").exists());
        assert!(outside.path().join("precious.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remove_through_link_leaving_root() {
        use std::os::unix::fs::symlink;

        let (_temp_dir, root) = setup();
        let outside = TempDir::new().unwrap();
        std_fs::create_dir(outside.path().join("tree")).unwrap();
        std_fs::write(outside.path().join("precious.txt"), "p").unwrap();
        symlink(outside.path(), root.path().join("escape")).unwrap();

        let remover = FileRemover::new();
        for request in ["escape/precious.txt", "escape/tree"] {
            let result = remover.remove(&root.resolve(request).unwrap()).await;
            assert!(matches!(result, Err(FileError::SymlinkOutsideRoot(_))));
        }

        assert!(outside.path().join("precious.txt").exists());
        assert!(outside.path().join("tree").is_dir());
    }
}
