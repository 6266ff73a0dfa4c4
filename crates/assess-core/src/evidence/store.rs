use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::AssessmentId;

/// Owning context of an evidence blob: one line item (or impact field) of
/// one assessment cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceOwner {
    pub assessment: AssessmentId,
    pub item: String,
}

/// Metadata row describing one successfully stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFile {
    pub owner: EvidenceOwner,
    pub path: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Backend failure signal shared by the blob and metadata stores. The
/// transient subset is exactly the retriable set: a backend-not-ready code
/// and the 502/503/504 gateway statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("object not found")]
    NotFound,
    #[error("backend not ready")]
    BackendNotReady,
    #[error("backend returned status {0}")]
    Http(u16),
    #[error("row already exists")]
    Conflict,
    #[error("backend failure: {0}")]
    Other(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendNotReady | Self::Http(502 | 503 | 504))
    }
}

/// Blob side of the evidence pipeline. Bytes only; metadata lives in the
/// relational store behind [`EvidenceRepository`].
pub trait EvidenceStore: Send + Sync {
    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    fn fetch(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, BackendError>> + Send;

    fn remove(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;
}

/// Metadata rows; exactly one per stored blob once an upload settles.
pub trait EvidenceRepository: Send + Sync {
    fn insert(
        &self,
        file: EvidenceFile,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    fn delete(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    fn list_for_owner(
        &self,
        owner: &EvidenceOwner,
    ) -> impl std::future::Future<Output = Result<Vec<EvidenceFile>, BackendError>> + Send;
}

/// Session revalidation hook. Downloads must refresh a near-expiry session
/// before touching the network; issuance itself is an external concern.
pub trait SessionGate: Send + Sync {
    fn ensure_fresh(
        &self,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session expired and could not be refreshed: {0}")]
    Refresh(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_documented_signals_are_transient() {
        assert!(BackendError::BackendNotReady.is_transient());
        assert!(BackendError::Http(502).is_transient());
        assert!(BackendError::Http(503).is_transient());
        assert!(BackendError::Http(504).is_transient());

        assert!(!BackendError::Http(500).is_transient());
        assert!(!BackendError::Http(429).is_transient());
        assert!(!BackendError::NotFound.is_transient());
        assert!(!BackendError::Conflict.is_transient());
        assert!(!BackendError::Other("disk full".into()).is_transient());
    }
}
