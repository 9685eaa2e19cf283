//! Chunked upload coordinator
//!
//! Streams a file to object storage as a sequence of fixed-size multipart parts.
//!
//! A [`MultipartUpload`] owns one remote upload from the moment the store issues
//! its id. It moves `NotStarted -> InProgress -> Completed | Aborted` and reaches
//! exactly one terminal call: [`MultipartUpload::complete`] on success, abort on
//! every other path. A failed part, a timeout, an empty upload or a failed
//! completion aborts before the error is returned, and dropping a session that is
//! still in progress (source read error, cancelled request) schedules the abort
//! on the runtime.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use storefront_core::StorageConfig;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::keys::validate_key;
use crate::traits::{CompletedPart, Storage, StorageError, StorageResult};

const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;
const DEFAULT_PART_TIMEOUT: Duration = Duration::from_secs(60);

/// Part size and per-call timeout for chunked uploads
#[derive(Debug, Clone, Copy)]
pub struct UploadSettings {
    /// Size of every part except the last
    pub part_size: usize,
    /// Bound on each remote call (create, part, complete, abort)
    pub part_timeout: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            part_size: DEFAULT_PART_SIZE,
            part_timeout: DEFAULT_PART_TIMEOUT,
        }
    }
}

impl From<&StorageConfig> for UploadSettings {
    fn from(config: &StorageConfig) -> Self {
        UploadSettings {
            part_size: config.part_size_bytes,
            part_timeout: config.part_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    NotStarted,
    InProgress,
    Completed,
    Aborted,
}

/// Progress of one multipart upload
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub bucket: String,
    pub key: String,
    /// Issued by the store when the upload is opened
    pub upload_id: Option<String>,
    /// Accepted parts, in part-number order
    pub parts: Vec<CompletedPart>,
    pub bytes_transferred: u64,
    pub state: UploadState,
}

impl UploadSession {
    fn new(bucket: &str, key: &str) -> Self {
        UploadSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: None,
            parts: Vec::new(),
            bytes_transferred: 0,
            state: UploadState::NotStarted,
        }
    }

    fn next_part_number(&self) -> u32 {
        self.parts.len() as u32 + 1
    }
}

/// An open multipart upload.
pub struct MultipartUpload {
    storage: Arc<dyn Storage>,
    session: UploadSession,
    part_timeout: Duration,
}

impl MultipartUpload {
    /// Open a multipart upload for `key` in the storage's bucket.
    ///
    /// Fails with [`StorageError::StoreUnavailable`] if the store rejects the
    /// request or does not answer in time.
    pub async fn begin(
        storage: Arc<dyn Storage>,
        key: &str,
        part_timeout: Duration,
    ) -> StorageResult<Self> {
        validate_key(key)?;
        let mut session = UploadSession::new(storage.bucket(), key);

        let upload_id =
            match tokio::time::timeout(part_timeout, storage.create_multipart_upload(key)).await {
                Ok(Ok(upload_id)) => upload_id,
                Ok(Err(StorageError::StoreUnavailable(message))) => {
                    return Err(StorageError::StoreUnavailable(message))
                }
                Ok(Err(e)) => return Err(StorageError::StoreUnavailable(e.to_string())),
                Err(_) => {
                    return Err(StorageError::StoreUnavailable(format!(
                        "create multipart upload timed out after {:?}",
                        part_timeout
                    )))
                }
            };

        tracing::info!(
            bucket = %session.bucket,
            key = %key,
            upload_id = %upload_id,
            "Multipart upload started"
        );

        session.upload_id = Some(upload_id);
        session.state = UploadState::InProgress;

        Ok(MultipartUpload {
            storage,
            session,
            part_timeout,
        })
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn state(&self) -> UploadState {
        self.session.state
    }

    /// Upload the next part. Part numbers start at 1 and must increase by one.
    ///
    /// Any failure aborts the upload before the error is returned.
    pub async fn upload_part(&mut self, part_number: u32, data: Bytes) -> StorageResult<String> {
        let upload_id = self.open_upload_id()?;

        let expected = self.session.next_part_number();
        if part_number != expected {
            self.abort_remote().await;
            return Err(StorageError::PartOutOfOrder {
                expected,
                got: part_number,
            });
        }

        let size = data.len() as u64;
        let start = std::time::Instant::now();
        let result = tokio::time::timeout(
            self.part_timeout,
            self.storage
                .upload_part(&self.session.key, &upload_id, part_number, data),
        )
        .await;

        let message = match result {
            Ok(Ok(e_tag)) => {
                self.session.parts.push(CompletedPart {
                    part_number,
                    e_tag: e_tag.clone(),
                });
                self.session.bytes_transferred += size;

                tracing::debug!(
                    key = %self.session.key,
                    part_number,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Part uploaded"
                );
                return Ok(e_tag);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.part_timeout),
        };

        tracing::error!(
            key = %self.session.key,
            upload_id = %upload_id,
            part_number,
            error = %message,
            "Part upload failed, aborting multipart upload"
        );
        self.abort_remote().await;

        Err(StorageError::TransportFailure {
            part_number,
            message,
        })
    }

    /// Finalize the object from the uploaded parts.
    ///
    /// With no parts the upload is aborted and [`StorageError::IncompleteUpload`]
    /// returned. A rejected completion is aborted too.
    pub async fn complete(mut self) -> StorageResult<UploadSession> {
        let upload_id = self.open_upload_id()?;

        if self.session.parts.is_empty() {
            self.abort_remote().await;
            return Err(StorageError::IncompleteUpload(format!(
                "no parts uploaded for {}",
                self.session.key
            )));
        }

        let result = tokio::time::timeout(
            self.part_timeout,
            self.storage.complete_multipart_upload(
                &self.session.key,
                &upload_id,
                &self.session.parts,
            ),
        )
        .await;

        let message = match result {
            Ok(Ok(())) => {
                self.session.state = UploadState::Completed;
                tracing::info!(
                    bucket = %self.session.bucket,
                    key = %self.session.key,
                    parts = self.session.parts.len(),
                    size_bytes = self.session.bytes_transferred,
                    "Multipart upload completed"
                );
                return Ok(self.session.clone());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("complete timed out after {:?}", self.part_timeout),
        };

        tracing::error!(
            key = %self.session.key,
            upload_id = %upload_id,
            error = %message,
            "Completing multipart upload failed, aborting"
        );
        self.abort_remote().await;

        Err(StorageError::UploadFailed(message))
    }

    /// Cancel the upload. A session that already reached a terminal state is
    /// returned unchanged.
    pub async fn abort(mut self) -> UploadSession {
        if self.session.state == UploadState::InProgress {
            self.abort_remote().await;
        }
        self.session.clone()
    }

    fn open_upload_id(&self) -> StorageResult<String> {
        match (&self.session.state, &self.session.upload_id) {
            (UploadState::InProgress, Some(upload_id)) => Ok(upload_id.clone()),
            _ => Err(StorageError::SessionClosed),
        }
    }

    /// Abort on the store and mark the session aborted. Failures are logged; the
    /// caller is already reporting the error that led here.
    async fn abort_remote(&mut self) {
        self.session.state = UploadState::Aborted;
        let Some(upload_id) = self.session.upload_id.as_deref() else {
            return;
        };

        let result = tokio::time::timeout(
            self.part_timeout,
            self.storage
                .abort_multipart_upload(&self.session.key, upload_id),
        )
        .await;

        match result {
            Ok(Ok(())) => tracing::info!(
                key = %self.session.key,
                upload_id = %upload_id,
                parts = self.session.parts.len(),
                "Multipart upload aborted"
            ),
            Ok(Err(e)) => tracing::error!(
                error = %e,
                key = %self.session.key,
                upload_id = %upload_id,
                "Failed to abort multipart upload"
            ),
            Err(_) => tracing::error!(
                key = %self.session.key,
                upload_id = %upload_id,
                "Aborting multipart upload timed out"
            ),
        }
    }
}

impl Drop for MultipartUpload {
    fn drop(&mut self) {
        if self.session.state != UploadState::InProgress {
            return;
        }
        self.session.state = UploadState::Aborted;
        let Some(upload_id) = self.session.upload_id.take() else {
            return;
        };

        let storage = Arc::clone(&self.storage);
        let key = self.session.key.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(key = %key, upload_id = %upload_id, "Multipart upload dropped, aborting");
                handle.spawn(async move {
                    if let Err(e) = storage.abort_multipart_upload(&key, &upload_id).await {
                        tracing::error!(
                            error = %e,
                            key = %key,
                            upload_id = %upload_id,
                            "Failed to abort dropped multipart upload"
                        );
                    }
                });
            }
            Err(_) => tracing::error!(
                key = %key,
                upload_id = %upload_id,
                "Multipart upload dropped outside a runtime, it cannot be aborted"
            ),
        }
    }
}

/// Streams readers to storage through [`MultipartUpload`].
#[derive(Clone)]
pub struct ChunkedUploader {
    storage: Arc<dyn Storage>,
    settings: UploadSettings,
}

impl ChunkedUploader {
    pub fn new(storage: Arc<dyn Storage>, settings: UploadSettings) -> Self {
        ChunkedUploader { storage, settings }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn settings(&self) -> UploadSettings {
        self.settings
    }

    /// Read `reader` to the end in `part_size` chunks, one sequential part per
    /// chunk, and complete the object under `key`.
    ///
    /// An empty source fails with [`StorageError::IncompleteUpload`]; a read error
    /// fails with [`StorageError::SourceRead`]. Both abort the upload.
    pub async fn upload<R>(&self, key: &str, reader: &mut R) -> StorageResult<UploadSession>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let part_size = self.settings.part_size.max(1);
        let mut upload =
            MultipartUpload::begin(Arc::clone(&self.storage), key, self.settings.part_timeout)
                .await?;

        let mut part_number = 1;
        loop {
            let mut chunk = Vec::with_capacity(part_size);
            let read = match (&mut *reader)
                .take(part_size as u64)
                .read_to_end(&mut chunk)
                .await
            {
                Ok(read) => read,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        key = %key,
                        part_number,
                        "Reading upload source failed"
                    );
                    upload.abort().await;
                    return Err(StorageError::SourceRead(e));
                }
            };

            if read == 0 {
                break;
            }
            upload.upload_part(part_number, Bytes::from(chunk)).await?;
            if read < part_size {
                break;
            }
            part_number += 1;
        }

        upload.complete().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use async_trait::async_trait;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create,
        Part(u32, usize),
        Complete(Vec<u32>),
        Abort,
    }

    /// Records every store call; fails or stalls on request.
    #[derive(Default)]
    struct RecordingStorage {
        calls: Mutex<Vec<Call>>,
        fail_create: bool,
        fail_part: Option<u32>,
        stall_part: Option<u32>,
        fail_complete: bool,
    }

    impl RecordingStorage {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, wanted: fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|call| wanted(call)).count()
        }

        fn aborts(&self) -> usize {
            self.count(|call| matches!(call, Call::Abort))
        }

        fn completes(&self) -> usize {
            self.count(|call| matches!(call, Call::Complete(_)))
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Storage for RecordingStorage {
        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }

        fn bucket(&self) -> &str {
            "recording"
        }

        fn object_url(&self, key: &str) -> String {
            format!("memory://recording/{key}")
        }

        async fn create_multipart_upload(&self, _key: &str) -> StorageResult<String> {
            self.record(Call::Create);
            if self.fail_create {
                return Err(StorageError::StoreUnavailable("no credentials".to_string()));
            }
            Ok("upload-1".to_string())
        }

        async fn upload_part(
            &self,
            _key: &str,
            _upload_id: &str,
            part_number: u32,
            data: Bytes,
        ) -> StorageResult<String> {
            self.record(Call::Part(part_number, data.len()));
            if self.stall_part == Some(part_number) {
                std::future::pending::<()>().await;
            }
            if self.fail_part == Some(part_number) {
                return Err(StorageError::UploadFailed("connection reset".to_string()));
            }
            Ok(format!("etag-{part_number}"))
        }

        async fn complete_multipart_upload(
            &self,
            _key: &str,
            _upload_id: &str,
            parts: &[CompletedPart],
        ) -> StorageResult<()> {
            self.record(Call::Complete(
                parts.iter().map(|part| part.part_number).collect(),
            ));
            if self.fail_complete {
                return Err(StorageError::UploadFailed("InvalidPart".to_string()));
            }
            Ok(())
        }

        async fn abort_multipart_upload(&self, _key: &str, _upload_id: &str) -> StorageResult<()> {
            self.record(Call::Abort);
            Ok(())
        }

        async fn put_object(
            &self,
            key: &str,
            _data: Bytes,
            _content_type: &str,
        ) -> StorageResult<String> {
            Ok(self.object_url(key))
        }

        async fn delete_object(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    /// Yields `data`, then fails.
    struct FailingReader {
        data: io::Cursor<Vec<u8>>,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let before = buf.filled().len();
            match Pin::new(&mut self.data).poll_read(cx, buf) {
                Poll::Ready(Ok(())) if buf.filled().len() == before => Poll::Ready(Err(
                    io::Error::new(io::ErrorKind::ConnectionReset, "client went away"),
                )),
                other => other,
            }
        }
    }

    fn settings(part_size: usize) -> UploadSettings {
        UploadSettings {
            part_size,
            part_timeout: Duration::from_secs(5),
        }
    }

    fn uploader(storage: &Arc<RecordingStorage>, part_size: usize) -> ChunkedUploader {
        ChunkedUploader::new(storage.clone(), settings(part_size))
    }

    #[tokio::test]
    async fn test_n_parts_complete_once_without_abort() {
        for parts in 1..=5usize {
            let storage = Arc::new(RecordingStorage::default());
            let data = vec![7u8; parts * 4 - 1];

            let session = uploader(&storage, 4)
                .upload("t.zip", &mut data.as_slice())
                .await
                .unwrap();

            assert_eq!(session.state, UploadState::Completed);
            assert_eq!(session.parts.len(), parts);
            assert_eq!(session.bytes_transferred, data.len() as u64);
            assert_eq!(storage.completes(), 1);
            assert_eq!(storage.aborts(), 0);
            let expected: Vec<u32> = (1..=parts as u32).collect();
            assert_eq!(storage.calls().last(), Some(&Call::Complete(expected)));
        }
    }

    #[tokio::test]
    async fn test_chunks_are_fixed_size_with_short_last_part() {
        let storage = Arc::new(RecordingStorage::default());
        let data = vec![1u8; 10];

        uploader(&storage, 4)
            .upload("t.zip", &mut data.as_slice())
            .await
            .unwrap();

        assert_eq!(
            storage.calls(),
            vec![
                Call::Create,
                Call::Part(1, 4),
                Call::Part(2, 4),
                Call::Part(3, 2),
                Call::Complete(vec![1, 2, 3]),
            ]
        );
    }

    #[tokio::test]
    async fn test_exact_multiple_of_part_size_has_no_empty_part() {
        let storage = Arc::new(RecordingStorage::default());
        let data = vec![1u8; 8];

        uploader(&storage, 4)
            .upload("t.zip", &mut data.as_slice())
            .await
            .unwrap();

        assert!(!storage.calls().contains(&Call::Part(3, 0)));
        assert_eq!(storage.calls().last(), Some(&Call::Complete(vec![1, 2])));
    }

    #[tokio::test]
    async fn test_failure_at_each_part_aborts_exactly_once() {
        let total_parts = 4u32;
        for k in 1..=total_parts {
            let storage = Arc::new(RecordingStorage {
                fail_part: Some(k),
                ..Default::default()
            });
            let data = vec![0u8; (total_parts * 4) as usize];

            let err = uploader(&storage, 4)
                .upload("t.zip", &mut data.as_slice())
                .await
                .unwrap_err();

            match err {
                StorageError::TransportFailure { part_number, .. } => assert_eq!(part_number, k),
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(storage.aborts(), 1, "failure at part {k}");
            assert_eq!(storage.completes(), 0, "failure at part {k}");
            assert!(!storage.calls().contains(&Call::Part(k + 1, 4)));
        }
    }

    #[tokio::test]
    async fn test_empty_source_is_incomplete_and_aborted() {
        let storage = Arc::new(RecordingStorage::default());

        let err = uploader(&storage, 4)
            .upload("t.zip", &mut tokio::io::empty())
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::IncompleteUpload(_)));
        assert_eq!(storage.calls(), vec![Call::Create, Call::Abort]);
    }

    #[tokio::test]
    async fn test_source_read_failure_aborts() {
        let storage = Arc::new(RecordingStorage::default());
        let mut reader = FailingReader {
            data: io::Cursor::new(vec![0u8; 6]),
        };

        let err = uploader(&storage, 4)
            .upload("t.zip", &mut reader)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::SourceRead(_)));
        assert_eq!(storage.aborts(), 1);
        assert_eq!(storage.completes(), 0);
        assert!(storage.calls().contains(&Call::Part(1, 4)));
    }

    #[tokio::test]
    async fn test_rejected_completion_aborts() {
        let storage = Arc::new(RecordingStorage {
            fail_complete: true,
            ..Default::default()
        });
        let data = vec![0u8; 5];

        let err = uploader(&storage, 4)
            .upload("t.zip", &mut data.as_slice())
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert_eq!(storage.completes(), 1);
        assert_eq!(storage.aborts(), 1);
    }

    #[tokio::test]
    async fn test_failed_begin_opens_nothing_to_abort() {
        let storage = Arc::new(RecordingStorage {
            fail_create: true,
            ..Default::default()
        });
        let data = vec![0u8; 5];

        let err = uploader(&storage, 4)
            .upload("t.zip", &mut data.as_slice())
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::StoreUnavailable(_)));
        assert_eq!(storage.calls(), vec![Call::Create]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_part_times_out_and_aborts() {
        let storage = Arc::new(RecordingStorage {
            stall_part: Some(2),
            ..Default::default()
        });
        let data = vec![0u8; 12];

        let err = uploader(&storage, 4)
            .upload("t.zip", &mut data.as_slice())
            .await
            .unwrap_err();

        match err {
            StorageError::TransportFailure {
                part_number,
                message,
            } => {
                assert_eq!(part_number, 2);
                assert!(message.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(storage.aborts(), 1);
        assert_eq!(storage.completes(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_part_aborts() {
        let storage = Arc::new(RecordingStorage::default());
        let mut upload = MultipartUpload::begin(storage.clone(), "t.zip", Duration::from_secs(5))
            .await
            .unwrap();

        upload
            .upload_part(1, Bytes::from_static(b"a"))
            .await
            .unwrap();
        let err = upload
            .upload_part(3, Bytes::from_static(b"c"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::PartOutOfOrder {
                expected: 2,
                got: 3
            }
        ));
        assert_eq!(upload.state(), UploadState::Aborted);
        assert!(matches!(
            upload.upload_part(2, Bytes::from_static(b"b")).await,
            Err(StorageError::SessionClosed)
        ));
        assert!(matches!(
            upload.complete().await,
            Err(StorageError::SessionClosed)
        ));
        assert_eq!(storage.aborts(), 1);
        assert_eq!(storage.completes(), 0);
    }

    #[tokio::test]
    async fn test_explicit_abort_is_terminal() {
        let storage = Arc::new(RecordingStorage::default());
        let upload = MultipartUpload::begin(storage.clone(), "t.zip", Duration::from_secs(5))
            .await
            .unwrap();

        let session = upload.abort().await;

        assert_eq!(session.state, UploadState::Aborted);
        assert_eq!(session.upload_id.as_deref(), Some("upload-1"));
        assert_eq!(storage.aborts(), 1);
    }

    #[tokio::test]
    async fn test_dropped_upload_is_aborted() {
        let storage = Arc::new(RecordingStorage::default());
        let mut upload = MultipartUpload::begin(storage.clone(), "t.zip", Duration::from_secs(5))
            .await
            .unwrap();
        upload
            .upload_part(1, Bytes::from_static(b"a"))
            .await
            .unwrap();

        drop(upload);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(storage.aborts(), 1);
        assert_eq!(storage.completes(), 0);
    }

    #[tokio::test]
    async fn test_completed_upload_is_not_aborted_on_drop() {
        let storage = Arc::new(RecordingStorage::default());
        let mut upload = MultipartUpload::begin(storage.clone(), "t.zip", Duration::from_secs(5))
            .await
            .unwrap();
        upload
            .upload_part(1, Bytes::from_static(b"a"))
            .await
            .unwrap();

        let session = upload.complete().await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.state, UploadState::Completed);
        assert_eq!(storage.aborts(), 0);
        assert_eq!(storage.completes(), 1);
    }

    #[tokio::test]
    async fn test_begin_rejects_invalid_key() {
        let storage = Arc::new(RecordingStorage::default());
        let result = MultipartUpload::begin(storage.clone(), "../t.zip", Duration::from_secs(5)).await;

        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(storage.calls().is_empty());
    }
}
