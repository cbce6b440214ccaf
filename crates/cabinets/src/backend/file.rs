//! Local filesystem backend

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::Backend;
use crate::error::BackendError;
use crate::options::Options;

/// Reads and writes files on the local filesystem
///
/// Absolute paths are used as given. Relative paths are resolved against
/// `root` when one is set, otherwise against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FileBackend {
    root: Option<PathBuf>,
}

impl FileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn configure(&self, _options: &Options) -> Result<(), BackendError> {
        Ok(())
    }

    async fn read_content(&self, path: &str, _options: &Options) -> Result<Vec<u8>, BackendError> {
        let full_path = self.full_path(path);
        fs::read(&full_path)
            .await
            .map_err(|e| BackendError::io(full_path.display().to_string(), e))
    }

    async fn create_content(
        &self,
        path: &str,
        content: Vec<u8>,
        _options: &Options,
    ) -> Result<(), BackendError> {
        let full_path = self.full_path(path);

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::io(parent.display().to_string(), e))?;
        }

        fs::write(&full_path, content)
            .await
            .map_err(|e| BackendError::io(full_path.display().to_string(), e))
    }

    async fn delete_content(&self, path: &str, _options: &Options) -> Result<(), BackendError> {
        let full_path = self.full_path(path);
        fs::remove_file(&full_path)
            .await
            .map_err(|e| BackendError::io(full_path.display().to_string(), e))
    }

    async fn list(&self, directory: &str, _options: &Options) -> Result<Vec<String>, BackendError> {
        let dir = self.full_path(directory);
        let io_error = |e| BackendError::io(dir.display().to_string(), e);

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await.map_err(io_error)?;

        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            if !entry.file_type().await.map_err(io_error)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
