use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use portrait_storage::{LocalStorage, Storage, StorageBackend, StorageError, StorageResult};

/// Local storage that records calls and can be switched offline.
pub struct RecordingStorage {
    inner: LocalStorage,
    offline: AtomicBool,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub fn new(inner: LocalStorage) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            puts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("bucket offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.puts.lock().unwrap().push(storage_key.to_string());
        self.check_online()?;
        self.inner.put(storage_key, data, content_type).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.deletes.lock().unwrap().push(storage_key.to_string());
        self.check_online()?;
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.check_online()?;
        self.inner.exists(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
