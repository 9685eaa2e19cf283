//! In-memory storage with fault injection and call counters.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use storefront_storage::{
    CompletedPart, MemoryStorage, Storage, StorageBackend, StorageError, StorageResult,
};

pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_part: Option<u32>,
    fail_delete: AtomicBool,
    parts: AtomicUsize,
    completes: AtomicUsize,
    aborts: AtomicUsize,
}

impl Default for FlakyStorage {
    fn default() -> Self {
        FlakyStorage {
            inner: MemoryStorage::new("test-bucket", "http://localhost/objects"),
            fail_part: None,
            fail_delete: AtomicBool::new(false),
            parts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            aborts: AtomicUsize::new(0),
        }
    }
}

impl FlakyStorage {
    /// Fails the transfer of `part_number` with a transport error.
    pub fn failing_part(part_number: u32) -> Self {
        FlakyStorage {
            fail_part: Some(part_number),
            ..Default::default()
        }
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn parts(&self) -> usize {
        self.parts.load(Ordering::SeqCst)
    }

    pub fn completes(&self) -> usize {
        self.completes.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.inner.object(key).await
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.inner.content_type(key).await
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }

    pub async fn pending_uploads(&self) -> usize {
        self.inner.pending_uploads().await
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    fn object_url(&self, key: &str) -> String {
        self.inner.object_url(key)
    }

    async fn create_multipart_upload(&self, key: &str) -> StorageResult<String> {
        self.inner.create_multipart_upload(key).await
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> StorageResult<String> {
        self.parts.fetch_add(1, Ordering::SeqCst);
        if self.fail_part == Some(part_number) {
            return Err(StorageError::UploadFailed("connection reset".to_string()));
        }
        self.inner.upload_part(key, upload_id, part_number, data).await
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        self.completes.fetch_add(1, Ordering::SeqCst);
        self.inner
            .complete_multipart_upload(key, upload_id, parts)
            .await
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_multipart_upload(key, upload_id).await
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        self.inner.put_object(key, data, content_type).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("access denied".to_string()));
        }
        self.inner.delete_object(key).await
    }
}
