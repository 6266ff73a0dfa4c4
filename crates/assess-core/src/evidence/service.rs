use std::sync::Arc;

use chrono::Utc;
use mime::Mime;
use tracing::{info, warn};

use super::retry::{run_with_retry, CancelToken, RetryError, RetryPolicy};
use super::sanitize::{blob_path, sanitize_file_name};
use super::store::{
    BackendError, EvidenceFile, EvidenceOwner, EvidenceRepository, EvidenceStore, SessionError,
    SessionGate,
};

/// Pre-network validation ceilings for one evidence upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_files_per_item: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_files_per_item: 5,
        }
    }
}

/// One upload as handed over by the form layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner: EvidenceOwner,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("file is {size} bytes; the limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("item already holds {count} files; the limit is {limit}")]
    TooManyFiles { count: usize, limit: usize },
    #[error("content type '{0}' is not a valid media type")]
    InvalidContentType(String),
    #[error("evidence file not found")]
    NotFound,
    #[error("metadata write failed; the uploaded blob was rolled back")]
    SaveFailed {
        #[source]
        source: BackendError,
        orphan_cleaned: bool,
    },
    #[error("operation cancelled by its owning context")]
    Cancelled,
    #[error("evidence backend unavailable; showing last known state")]
    Unavailable(#[source] BackendError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Reliable upload/download/delete of evidence blobs against an unreliable
/// backend, keeping exactly one metadata row per stored blob.
pub struct EvidenceSyncService<S, R, G> {
    store: Arc<S>,
    metadata: Arc<R>,
    session: Arc<G>,
    limits: UploadLimits,
    retry: RetryPolicy,
    cancel: CancelToken,
}

impl<S, R, G> EvidenceSyncService<S, R, G>
where
    S: EvidenceStore + 'static,
    R: EvidenceRepository + 'static,
    G: SessionGate + 'static,
{
    pub fn new(
        store: Arc<S>,
        metadata: Arc<R>,
        session: Arc<G>,
        limits: UploadLimits,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            metadata,
            session,
            limits,
            retry,
            cancel: CancelToken::new(),
        }
    }

    /// Handle the owning context holds to tear down pending retry timers.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Upload one blob and record its metadata row. `current_count` is the
    /// number of files the owning item already holds (the form has that
    /// listing on screen); both ceilings are checked before any network
    /// call. A metadata failure after the blob landed triggers a
    /// compensating delete so no orphan survives.
    pub async fn upload(
        &self,
        request: UploadRequest,
        current_count: usize,
    ) -> Result<EvidenceFile, EvidenceError> {
        let size = request.bytes.len() as u64;
        if size > self.limits.max_file_bytes {
            return Err(EvidenceError::FileTooLarge {
                size,
                limit: self.limits.max_file_bytes,
            });
        }
        if current_count >= self.limits.max_files_per_item {
            return Err(EvidenceError::TooManyFiles {
                count: current_count,
                limit: self.limits.max_files_per_item,
            });
        }
        let content_type = request
            .content_type
            .parse::<Mime>()
            .map_err(|_| EvidenceError::InvalidContentType(request.content_type.clone()))?;

        let uploaded_at = Utc::now();
        let file_name = sanitize_file_name(&request.file_name);
        let path = blob_path(&request.owner, uploaded_at, &request.file_name);

        self.store
            .put(&path, request.bytes, content_type.as_ref())
            .await?;

        let file = EvidenceFile {
            owner: request.owner,
            path: path.clone(),
            file_name,
            content_type: content_type.to_string(),
            size_bytes: size,
            uploaded_at,
        };

        if let Err(source) = self.metadata.insert(file.clone()).await {
            let orphan_cleaned = match self.store.remove(&path).await {
                Ok(()) => true,
                Err(cleanup) => {
                    warn!(%path, error = %cleanup, "orphan blob left behind after failed metadata write");
                    false
                }
            };
            return Err(EvidenceError::SaveFailed {
                source,
                orphan_cleaned,
            });
        }

        info!(%path, size, "evidence uploaded");
        Ok(file)
    }

    /// Fetch blob bytes, refreshing the session first. A missing blob is a
    /// distinct condition from a transient backend failure.
    pub async fn download(&self, file: &EvidenceFile) -> Result<Vec<u8>, EvidenceError> {
        self.session.ensure_fresh().await?;
        match self.store.fetch(&file.path).await {
            Ok(bytes) => Ok(bytes),
            Err(BackendError::NotFound) => Err(EvidenceError::NotFound),
            Err(other) => Err(other.into()),
        }
    }

    /// Delete blob first, then metadata. A failed blob delete leaves the
    /// metadata row in place so the cleanup can be retried later.
    pub async fn delete(&self, file: &EvidenceFile) -> Result<(), EvidenceError> {
        match self.store.remove(&file.path).await {
            // An already-missing blob is fine; the metadata row is the orphan.
            Ok(()) | Err(BackendError::NotFound) => {}
            Err(other) => return Err(other.into()),
        }
        self.metadata.delete(&file.path).await?;
        info!(path = %file.path, "evidence deleted");
        Ok(())
    }

    /// Metadata listing with bounded retry. Exhausted retries degrade to an
    /// `Unavailable` signal instead of blocking the caller indefinitely.
    pub async fn list_for_owner(
        &self,
        owner: &EvidenceOwner,
    ) -> Result<Vec<EvidenceFile>, EvidenceError> {
        let result = run_with_retry(
            &self.retry,
            &self.cancel,
            BackendError::is_transient,
            || self.metadata.list_for_owner(owner),
        )
        .await;

        match result {
            Ok(files) => Ok(files),
            Err(RetryError::Cancelled) => Err(EvidenceError::Cancelled),
            Err(RetryError::Exhausted(source)) => {
                warn!(error = %source, "evidence listing retries exhausted");
                Err(EvidenceError::Unavailable(source))
            }
            Err(RetryError::Terminal(source)) => Err(source.into()),
        }
    }
}
