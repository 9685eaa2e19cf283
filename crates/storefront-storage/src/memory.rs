use crate::keys::validate_key;
use crate::traits::{CompletedPart, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct PendingUpload {
    key: String,
    parts: BTreeMap<u32, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<String, Bytes>,
    content_types: HashMap<String, String>,
    uploads: HashMap<String, PendingUpload>,
}

/// Process-local object storage
///
/// Implements the same multipart contract as S3 (tags must match on completion,
/// parts are assembled in part-number order) without any network. Used for local
/// development and as the backing store in tests.
#[derive(Debug)]
pub struct MemoryStorage {
    bucket: String,
    base_url: String,
    state: RwLock<State>,
}

impl MemoryStorage {
    /// Create a new MemoryStorage instance
    ///
    /// # Arguments
    /// * `bucket` - Bucket name reported to callers
    /// * `base_url` - Base URL used for object URLs (e.g., "http://localhost:8000/objects")
    pub fn new(bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        MemoryStorage {
            bucket: bucket.into(),
            base_url: base_url.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Stored object bytes, if any
    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.state.read().await.objects.get(key).cloned()
    }

    /// Content type recorded by `put_object`
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.state.read().await.content_types.get(key).cloned()
    }

    /// Keys of all stored objects, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.read().await.objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of multipart uploads neither completed nor aborted
    pub async fn pending_uploads(&self) -> usize {
        self.state.read().await.uploads.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), self.bucket, key)
    }

    async fn create_multipart_upload(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        let upload_id = Uuid::new_v4().to_string();
        self.state.write().await.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> StorageResult<String> {
        let mut state = self.state.write().await;
        let upload = state
            .uploads
            .get_mut(upload_id)
            .filter(|upload| upload.key == key)
            .ok_or_else(|| StorageError::UploadFailed(format!("No such upload: {}", upload_id)))?;

        let e_tag = format!("\"{}\"", Uuid::new_v4().simple());
        upload.parts.insert(part_number, (e_tag.clone(), data));
        Ok(e_tag)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let upload = state
            .uploads
            .get(upload_id)
            .filter(|upload| upload.key == key)
            .ok_or_else(|| StorageError::UploadFailed(format!("No such upload: {}", upload_id)))?;

        if parts.is_empty() {
            return Err(StorageError::UploadFailed(
                "At least one part is required".to_string(),
            ));
        }

        let mut body = BytesMut::new();
        let mut previous = 0;
        for part in parts {
            if part.part_number <= previous {
                return Err(StorageError::UploadFailed(
                    "Parts must be listed in ascending order".to_string(),
                ));
            }
            previous = part.part_number;

            match upload.parts.get(&part.part_number) {
                Some((e_tag, data)) if *e_tag == part.e_tag => body.extend_from_slice(data),
                _ => {
                    return Err(StorageError::UploadFailed(format!(
                        "Invalid part {}",
                        part.part_number
                    )))
                }
            }
        }

        state.uploads.remove(upload_id);
        state.content_types.remove(key);
        state.objects.insert(key.to_string(), body.freeze());
        Ok(())
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> StorageResult<()> {
        self.state.write().await.uploads.remove(upload_id);
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        validate_key(key)?;
        let mut state = self.state.write().await;
        state.objects.insert(key.to_string(), data);
        state
            .content_types
            .insert(key.to_string(), content_type.to_string());
        Ok(self.object_url(key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.objects.remove(key);
        state.content_types.remove(key);
        Ok(())
    }
}
