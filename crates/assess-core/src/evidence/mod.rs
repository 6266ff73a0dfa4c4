//! Resilient synchronization of evidence files against the hosted backend:
//! validation before the network, storage-safe naming, compensating cleanup
//! for partial uploads, and cancellable retry-with-backoff for reads.

pub mod retry;
pub mod sanitize;
pub mod service;
pub mod store;

pub use retry::{run_with_retry, CancelToken, RetryError, RetryPolicy};
pub use sanitize::{blob_path, extension_of, sanitize_file_name};
pub use service::{EvidenceError, EvidenceSyncService, UploadLimits, UploadRequest};
pub use store::{
    BackendError, EvidenceFile, EvidenceOwner, EvidenceRepository, EvidenceStore, SessionError,
    SessionGate,
};
