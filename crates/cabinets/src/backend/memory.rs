//! In-process object store
//!
//! Addresses content as `bucket/key` exactly like the S3 backend, which
//! makes it a stand-in for object storage in tests and for scratch data.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Backend, ObjectPath, list_children};
use crate::error::BackendError;
use crate::options::Options;

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<Buckets>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buckets>, BackendError> {
        self.data
            .lock()
            .map_err(|_| BackendError::Internal("Lock poisoned".into()))
    }

    /// All stored paths as `bucket/key` (useful for testing)
    pub fn paths(&self) -> Vec<String> {
        self.lock()
            .map(|buckets| {
                buckets
                    .iter()
                    .flat_map(|(bucket, objects)| {
                        objects.keys().map(move |key| format!("{bucket}/{key}"))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear all data
    pub fn clear(&self) {
        if let Ok(mut buckets) = self.lock() {
            buckets.clear();
        }
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.lock()
            .map(|buckets| buckets.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn configure(&self, options: &Options) -> Result<(), BackendError> {
        match options.iter().next() {
            None => Ok(()),
            Some((key, _)) => Err(BackendError::Config(format!(
                "memory backend has no option '{key}'"
            ))),
        }
    }

    async fn read_content(&self, path: &str, _options: &Options) -> Result<Vec<u8>, BackendError> {
        let object = ObjectPath::object(path)?;
        let buckets = self.lock()?;

        buckets
            .get(object.bucket)
            .and_then(|objects| objects.get(object.key))
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                path: path.to_string(),
            })
    }

    async fn create_content(
        &self,
        path: &str,
        content: Vec<u8>,
        _options: &Options,
    ) -> Result<(), BackendError> {
        let object = ObjectPath::object(path)?;
        let mut buckets = self.lock()?;

        buckets
            .entry(object.bucket.to_string())
            .or_default()
            .insert(object.key.to_string(), content);
        Ok(())
    }

    async fn delete_content(&self, path: &str, _options: &Options) -> Result<(), BackendError> {
        let object = ObjectPath::object(path)?;
        let mut buckets = self.lock()?;

        // Deleting a missing object succeeds, as on S3
        if let Some(objects) = buckets.get_mut(object.bucket) {
            objects.remove(object.key);
        }
        Ok(())
    }

    async fn list(&self, directory: &str, _options: &Options) -> Result<Vec<String>, BackendError> {
        let location = ObjectPath::parse(directory)?;
        let prefix = location.directory_prefix();
        let buckets = self.lock()?;

        let objects = buckets
            .get(location.bucket)
            .ok_or_else(|| BackendError::NotFound {
                path: location.bucket.to_string(),
            })?;
        Ok(list_children(&prefix, objects.keys()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_basic_operations() {
        let backend = MemoryBackend::new();
        let path = "test/file.txt";
        let data = b"Hello, World!".to_vec();
        let options = Options::new();

        backend.create_content(path, data.clone(), &options).await.unwrap();
        let retrieved = backend.read_content(path, &options).await.unwrap();
        assert_eq!(data, retrieved);

        backend.delete_content(path, &options).await.unwrap();
        assert!(backend.read_content(path, &options).await.is_err());

        // Second delete is a no-op
        backend.delete_content(path, &options).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_backend_not_found() {
        let backend = MemoryBackend::new();
        let result = backend.read_content("bucket/nonexistent", &Options::new()).await;

        match result {
            Err(BackendError::NotFound { path }) => assert_eq!(path, "bucket/nonexistent"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_memory_backend_list() {
        let backend = MemoryBackend::new();
        let options = Options::new();
        for path in [
            "bucket/subdir/file.txt",
            "bucket/subdir/nested/file2.txt",
            "bucket/root.txt",
            "other/subdir/file3.txt",
        ] {
            backend.create_content(path, Vec::new(), &options).await.unwrap();
        }

        assert_eq!(
            backend.list("bucket/subdir", &options).await.unwrap(),
            vec!["file.txt"]
        );
        assert_eq!(backend.list("bucket", &options).await.unwrap(), vec!["root.txt"]);
        assert!(matches!(
            backend.list("missing/subdir", &options).await,
            Err(BackendError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_backend_utilities() {
        let backend = MemoryBackend::new();
        let options = Options::new();

        assert_eq!(backend.len(), 0);
        assert!(backend.is_empty());

        backend.create_content("b/key1", b"data1".to_vec(), &options).await.unwrap();
        backend.create_content("c/key2", b"data2".to_vec(), &options).await.unwrap();

        assert_eq!(backend.len(), 2);
        assert_eq!(backend.paths(), vec!["b/key1", "c/key2"]);

        backend.clear();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_configure_rejects_options() {
        let backend = MemoryBackend::new();
        assert!(backend.configure(&Options::new()).is_ok());
        assert!(backend.configure(&Options::new().with("region", "x")).is_err());
    }
}
